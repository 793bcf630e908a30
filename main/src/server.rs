use std::sync::Arc;

use api_router::{api_routes, api_state::ApiState};
use axum::Router;
use common::utils::{
    config::{get_config, AppConfig},
    embedding::EmbeddingProvider,
};
use retrieval_pipeline::AnswerPipeline;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Set up tracing
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .try_init()
        .ok();

    // Get config
    let config = get_config()?;
    if config.openai_key_missing() {
        warn!(
            generation_backend = ?config.generation_backend,
            embedding_backend = ?config.embedding_backend,
            base_url = %config.openai_base_url,
            "OpenAI-compatible backend selected without openai_api_key; requests may be rejected"
        );
    }

    info!("Starting answer pipeline");
    let app = build_app(&config).await?;

    info!("Starting server listening on 0.0.0.0:{}", config.http_port);
    let serve_address = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(serve_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn build_app(config: &AppConfig) -> Result<Router, Box<dyn std::error::Error>> {
    let openai_client = Arc::new(async_openai::Client::with_config(
        async_openai::config::OpenAIConfig::new()
            .with_api_key(&config.openai_api_key)
            .with_api_base(&config.openai_base_url),
    ));

    // Create embedding provider based on config
    let embedding_provider = Arc::new(
        EmbeddingProvider::from_config(config, Some(openai_client.clone())).await?,
    );
    info!(
        embedding_backend = embedding_provider.backend_label(),
        embedding_model = ?embedding_provider.model_code(),
        embedding_dimension = embedding_provider.dimension(),
        "Embedding provider initialized"
    );

    let pipeline = Arc::new(
        AnswerPipeline::from_config(config, embedding_provider, openai_client).await?,
    );
    info!(
        generation_backend = ?config.generation_backend,
        generation_model = %config.generation_model,
        "Answer pipeline ready"
    );

    let api_state = ApiState::new(config, pipeline);

    Ok(Router::new()
        .nest("/api", api_routes())
        .with_state(api_state))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Method, Request, StatusCode},
    };
    use common::utils::{
        config::{GenerationBackend, KnowledgeSource},
        embedding::EmbeddingBackend,
    };
    use ingestion_pipeline::{run_ingestion, IngestionConfig};
    use tower::ServiceExt;

    fn offline_config() -> AppConfig {
        AppConfig {
            openai_api_key: "test-key".into(),
            openai_base_url: "https://example.com".into(),
            http_port: 0,
            embedding_backend: EmbeddingBackend::Hashed,
            generation_backend: GenerationBackend::Extractive,
            ..Default::default()
        }
    }

    async fn ask(app: &Router, question: &str) -> (StatusCode, String) {
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/api/ask")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(format!(r#"{{"question": "{question}"}}"#)))
                    .expect("request"),
            )
            .await
            .expect("router response");
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        (status, String::from_utf8_lossy(&body).into_owned())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn smoke_startup_with_builtin_knowledge() {
        let app = build_app(&offline_config()).await.expect("app");

        let live = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/api/live")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("live response");
        assert_eq!(live.status(), StatusCode::OK);

        let (status, body) = ask(&app, "What are the library timings?").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains(r#""cached":false"#));
        assert!(body.contains("Library Timings"));

        let (status, body) = ask(&app, "WHAT ARE THE LIBRARY TIMINGS?").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains(r#""cached":true"#));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn serves_knowledge_written_by_ingestion() {
        let root = tempfile::tempdir().expect("tempdir");
        let documents_dir = root.path().join("documents");
        let store_dir = root.path().join("vector_store");
        tokio::fs::create_dir_all(&documents_dir)
            .await
            .expect("mkdir");
        tokio::fs::write(
            documents_dir.join("transport.txt"),
            "Transport: University buses run from Gulshan every morning.\n\nCafeteria: open until 6 PM.",
        )
        .await
        .expect("write");

        let config = AppConfig {
            knowledge_source: KnowledgeSource::VectorStore,
            documents_dir: documents_dir.display().to_string(),
            vector_store_dir: store_dir.display().to_string(),
            ..offline_config()
        };
        let provider = EmbeddingProvider::from_config(&config, None)
            .await
            .expect("provider");
        run_ingestion(&IngestionConfig::from(&config), &provider)
            .await
            .expect("ingest");

        let app = build_app(&config).await.expect("app");
        let (status, body) = ask(&app, "When do the university buses run?").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("Transport: University buses"));
        assert!(!body.contains("Library Timings"));
    }

    #[tokio::test]
    async fn missing_vector_store_fails_startup() {
        let root = tempfile::tempdir().expect("tempdir");
        let config = AppConfig {
            knowledge_source: KnowledgeSource::VectorStore,
            vector_store_dir: root.path().join("absent").display().to_string(),
            ..offline_config()
        };
        assert!(build_app(&config).await.is_err());
    }
}
