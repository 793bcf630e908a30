pub mod documents;

use std::path::{Path, PathBuf};

use common::{
    error::AppError,
    storage::{vector_index::FlatL2Index, vector_store::PersistedKnowledge},
    utils::{config::AppConfig, embedding::EmbeddingProvider},
};
use tracing::{info, instrument};

use documents::load_documents;

#[derive(Debug, Clone)]
pub struct IngestionConfig {
    pub documents_dir: PathBuf,
    pub output_dir: PathBuf,
}

impl From<&AppConfig> for IngestionConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            documents_dir: PathBuf::from(&config.documents_dir),
            output_dir: PathBuf::from(&config.vector_store_dir),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestionSummary {
    pub files: usize,
    pub chunks: usize,
    pub dimension: usize,
}

/// Builds the flat index for `chunks` and returns it alongside the chunks, ready to persist.
pub async fn build_knowledge(
    chunks: Vec<String>,
    provider: &EmbeddingProvider,
) -> Result<PersistedKnowledge, AppError> {
    let embeddings = provider.embed_batch(chunks.clone()).await?;
    let mut index = FlatL2Index::new(provider.dimension());
    index.add(embeddings)?;
    PersistedKnowledge::new(index, chunks)
}

/// One-shot ingestion: load, chunk, embed, index and persist.
#[instrument(skip_all, fields(documents_dir = %config.documents_dir.display()))]
pub async fn run_ingestion(
    config: &IngestionConfig,
    provider: &EmbeddingProvider,
) -> Result<IngestionSummary, AppError> {
    let documents = load_documents(&config.documents_dir).await?;
    let files = documents.len();
    let chunks: Vec<String> = documents
        .into_iter()
        .flat_map(|document| document.chunks)
        .collect();

    if chunks.is_empty() {
        return Err(AppError::Validation(format!(
            "no chunks found in {}",
            config.documents_dir.display()
        )));
    }
    info!(files, chunks = chunks.len(), "documents loaded");

    let knowledge = build_knowledge(chunks, provider).await?;
    knowledge.save(&config.output_dir).await?;

    Ok(IngestionSummary {
        files,
        chunks: knowledge.chunks.len(),
        dimension: knowledge.index.dimension(),
    })
}

/// Location of the persisted artifacts for `config`.
pub fn artifact_paths(config: &IngestionConfig) -> (PathBuf, PathBuf) {
    let dir: &Path = &config.output_dir;
    (
        PersistedKnowledge::index_path(dir),
        PersistedKnowledge::chunks_path(dir),
    )
}
