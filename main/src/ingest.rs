use std::path::PathBuf;

use clap::Parser;
use common::utils::{
    config::get_config,
    embedding::{EmbeddingBackend, EmbeddingProvider},
};
use ingestion_pipeline::{artifact_paths, run_ingestion, IngestionConfig};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Build the vector store from a directory of text documents.
#[derive(Debug, Parser)]
#[command(name = "ingest", version)]
struct Args {
    /// Directory of documents to index (defaults to `documents_dir` from config)
    #[arg(long)]
    documents_dir: Option<PathBuf>,

    /// Directory the index and chunk list are written to (defaults to `vector_store_dir`)
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Override the configured embedding backend: fastembed, hashed or openai
    #[arg(long)]
    embedding_backend: Option<EmbeddingBackend>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Set up tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .try_init()
        .ok();

    let args = Args::parse();
    let mut config = get_config()?;
    if let Some(backend) = args.embedding_backend {
        config.embedding_backend = backend;
    }

    let mut ingestion_config = IngestionConfig::from(&config);
    if let Some(dir) = args.documents_dir {
        ingestion_config.documents_dir = dir;
    }
    if let Some(dir) = args.output_dir {
        ingestion_config.output_dir = dir;
    }

    let embedding_provider = EmbeddingProvider::from_config(&config, None).await?;
    info!(
        embedding_backend = embedding_provider.backend_label(),
        embedding_dimension = embedding_provider.dimension(),
        "Embedding provider initialized"
    );

    let summary = run_ingestion(&ingestion_config, &embedding_provider).await?;
    let (index_path, chunks_path) = artifact_paths(&ingestion_config);
    info!(
        files = summary.files,
        chunks = summary.chunks,
        dimension = summary.dimension,
        index = %index_path.display(),
        chunk_list = %chunks_path.display(),
        "Ingestion complete"
    );

    Ok(())
}
