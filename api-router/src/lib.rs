use api_state::ApiState;
use axum::{
    extract::FromRef,
    routing::{get, post},
    Router,
};
use routes::{
    ask::ask_question,
    health::{live, ready},
};
use tower_http::cors::CorsLayer;

pub mod api_state;
pub mod error;
pub mod routes;

/// Router for the question answering API, mounted under `/api`.
///
/// Every origin, method and header is allowed; requests are not authenticated.
pub fn api_routes<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
    ApiState: FromRef<S>,
{
    Router::new()
        .route("/ask", post(ask_question))
        .route("/live", get(live))
        .route("/ready", get(ready))
        .layer(CorsLayer::very_permissive())
}
