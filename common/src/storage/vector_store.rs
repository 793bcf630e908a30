use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::info;

use super::vector_index::FlatL2Index;
use crate::error::AppError;

pub const INDEX_FILE_NAME: &str = "index.json";
pub const CHUNKS_FILE_NAME: &str = "docs.jsonl";

/// Chunk texts plus the flat index built over their embeddings, as written by ingestion.
#[derive(Debug, Clone, PartialEq)]
pub struct PersistedKnowledge {
    pub index: FlatL2Index,
    pub chunks: Vec<String>,
}

impl PersistedKnowledge {
    pub fn new(index: FlatL2Index, chunks: Vec<String>) -> Result<Self, AppError> {
        if index.len() != chunks.len() {
            return Err(AppError::Validation(format!(
                "index holds {} vectors but {} chunks were given",
                index.len(),
                chunks.len()
            )));
        }
        Ok(Self { index, chunks })
    }

    pub fn index_path(dir: &Path) -> PathBuf {
        dir.join(INDEX_FILE_NAME)
    }

    pub fn chunks_path(dir: &Path) -> PathBuf {
        dir.join(CHUNKS_FILE_NAME)
    }

    /// Writes `index.json` and `docs.jsonl` into `dir`, creating it when missing.
    pub async fn save(&self, dir: &Path) -> Result<(), AppError> {
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("creating vector store directory {}", dir.display()))?;

        let index_path = Self::index_path(dir);
        let index_body = serde_json::to_vec(&self.index)?;
        tokio::fs::write(&index_path, index_body)
            .await
            .with_context(|| format!("writing vector index {}", index_path.display()))?;

        let mut chunks_body = String::new();
        for chunk in &self.chunks {
            chunks_body.push_str(&serde_json::to_string(chunk)?);
            chunks_body.push('\n');
        }
        let chunks_path = Self::chunks_path(dir);
        tokio::fs::write(&chunks_path, chunks_body)
            .await
            .with_context(|| format!("writing chunk list {}", chunks_path.display()))?;

        info!(
            dir = %dir.display(),
            chunks = self.chunks.len(),
            dimension = self.index.dimension(),
            "vector store persisted"
        );
        Ok(())
    }

    pub async fn load(dir: &Path) -> Result<Self, AppError> {
        let index_path = Self::index_path(dir);
        let raw_index = tokio::fs::read(&index_path)
            .await
            .with_context(|| format!("reading vector index {}", index_path.display()))?;
        let index: FlatL2Index = serde_json::from_slice(&raw_index)?;

        let chunks_path = Self::chunks_path(dir);
        let raw_chunks = tokio::fs::read_to_string(&chunks_path)
            .await
            .with_context(|| format!("reading chunk list {}", chunks_path.display()))?;
        let chunks = raw_chunks
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(serde_json::from_str::<String>)
            .collect::<Result<Vec<_>, _>>()?;

        Self::new(index, chunks)
    }
}
