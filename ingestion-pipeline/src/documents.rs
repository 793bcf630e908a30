use std::path::{Path, PathBuf};

use anyhow::Context;
use common::error::AppError;
use futures::future::try_join_all;
use tracing::{debug, warn};

/// A source file and the chunks cut from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedDocument {
    pub path: PathBuf,
    pub chunks: Vec<String>,
}

/// Splits text on blank lines. Pieces are trimmed and empty pieces dropped.
pub fn split_into_chunks(content: &str) -> Vec<String> {
    content
        .replace("\r\n", "\n")
        .split("\n\n")
        .map(str::trim)
        .filter(|piece| !piece.is_empty())
        .map(ToString::to_string)
        .collect()
}

/// Regular files directly inside `dir`, sorted by name. Subdirectories are skipped.
async fn list_files(dir: &Path) -> Result<Vec<PathBuf>, AppError> {
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .with_context(|| format!("reading documents directory {}", dir.display()))?;

    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let file_type = entry.file_type().await?;
        if file_type.is_file() {
            files.push(entry.path());
        } else {
            warn!(path = %entry.path().display(), "skipping non-file entry");
        }
    }
    files.sort();
    Ok(files)
}

async fn load_document(path: PathBuf) -> Result<LoadedDocument, AppError> {
    let content = tokio::fs::read_to_string(&path)
        .await
        .with_context(|| format!("reading document {}", path.display()))?;
    let chunks = split_into_chunks(&content);
    debug!(path = %path.display(), chunks = chunks.len(), "document split");
    Ok(LoadedDocument { path, chunks })
}

/// Reads every file in `dir` as UTF-8 and splits it into chunks, in file-name order.
pub async fn load_documents(dir: &Path) -> Result<Vec<LoadedDocument>, AppError> {
    let files = list_files(dir).await?;
    try_join_all(files.into_iter().map(load_document)).await
}
