use std::time::{Duration, Instant};

use axum::{extract::FromRequest, extract::State, Json};
use common::{
    storage::types::{answer_payload::AnswerPayload, query_log_entry::QueryLogEntry},
    utils::fingerprint::question_fingerprint,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{api_state::ApiState, error::ApiError};

pub const DEFAULT_USER_ID: &str = "student";

/// JSON body extractor that reports malformed input as an [`ApiError`].
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    pub question: String,
    /// Absent means the default user; an explicit `null` is kept as no user.
    #[serde(default = "default_user_id")]
    pub user_id: Option<String>,
}

fn default_user_id() -> Option<String> {
    Some(DEFAULT_USER_ID.to_string())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AskResponse {
    pub answer: String,
    pub sources: Vec<String>,
    pub confidence: f64,
    /// Seconds, rounded to three decimals.
    pub response_time: f64,
    pub cached: bool,
    pub retrieved_chunks: Vec<String>,
}

impl AskResponse {
    fn from_payload(payload: AnswerPayload, cached: bool, response_time: f64) -> Self {
        Self {
            answer: payload.answer,
            sources: payload.sources,
            confidence: payload.confidence,
            response_time,
            cached,
            retrieved_chunks: payload.retrieved_chunks,
        }
    }
}

pub fn round_seconds(elapsed: Duration) -> f64 {
    (elapsed.as_secs_f64() * 1000.0).round() / 1000.0
}

pub async fn ask_question(
    State(state): State<ApiState>,
    ApiJson(request): ApiJson<AskRequest>,
) -> Result<Json<AskResponse>, ApiError> {
    let started = Instant::now();
    let cache_key = question_fingerprint(&request.question);

    info!(
        question = %request.question,
        user_id = ?request.user_id,
        %cache_key,
        "Received question"
    );

    if let Some(cached) = state.cache.get(&cache_key).await {
        info!(%cache_key, "Serving answer from cache");
        return Ok(Json(AskResponse::from_payload(
            cached,
            true,
            round_seconds(started.elapsed()),
        )));
    }

    let payload = state
        .pipeline
        .ask(&request.question)
        .await
        .map_err(|err| ApiError::backend(&err, state.config.expose_error_details))?;

    let response_time = round_seconds(started.elapsed());

    state.cache.put(cache_key, payload.clone()).await;
    state
        .query_log
        .append(QueryLogEntry::new(
            request.question,
            request.user_id,
            response_time,
        ))
        .await;

    Ok(Json(AskResponse::from_payload(payload, false, response_time)))
}
