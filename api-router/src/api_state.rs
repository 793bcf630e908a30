use std::sync::Arc;

use common::{
    storage::{
        query_log::{InMemoryQueryLog, QueryLog},
        response_cache::{InMemoryResponseCache, ResponseCache},
    },
    utils::config::AppConfig,
};
use retrieval_pipeline::AnswerPipeline;

#[derive(Clone)]
pub struct ApiState {
    pub pipeline: Arc<AnswerPipeline>,
    pub cache: Arc<dyn ResponseCache>,
    pub query_log: Arc<dyn QueryLog>,
    pub config: AppConfig,
}

impl ApiState {
    /// State with an in-memory cache bounded by `cache_capacity` and an empty query log.
    pub fn new(config: &AppConfig, pipeline: Arc<AnswerPipeline>) -> Self {
        Self::with_stores(
            config,
            pipeline,
            Arc::new(InMemoryResponseCache::new(config.cache_capacity)),
            Arc::new(InMemoryQueryLog::new()),
        )
    }

    pub fn with_stores(
        config: &AppConfig,
        pipeline: Arc<AnswerPipeline>,
        cache: Arc<dyn ResponseCache>,
        query_log: Arc<dyn QueryLog>,
    ) -> Self {
        Self {
            pipeline,
            cache,
            query_log,
            config: config.clone(),
        }
    }
}
