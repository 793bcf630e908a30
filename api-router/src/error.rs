use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use common::error::AppError;
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug, Serialize, Clone)]
pub enum ApiError {
    #[error("{0}")]
    InternalError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

impl ApiError {
    /// Maps any pipeline failure to a 500. The error text is passed through to the
    /// client unless `expose_details` is off.
    pub fn backend(err: &AppError, expose_details: bool) -> Self {
        tracing::error!("Backend error: {:?}", err);
        if expose_details {
            Self::InternalError(format!("Backend Error: {err}"))
        } else {
            Self::InternalError("Internal server error".to_string())
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::ValidationError(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            Self::InternalError(message) => (StatusCode::INTERNAL_SERVER_ERROR, message),
            Self::ValidationError(message) => (StatusCode::UNPROCESSABLE_ENTITY, message),
        };

        (status, Json(ErrorResponse { detail })).into_response()
    }
}

#[derive(Serialize, Debug)]
struct ErrorResponse {
    detail: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt::Debug;

    // Helper to check status code
    fn assert_status_code<T: IntoResponse + Debug>(response: T, expected_status: StatusCode) {
        let response = response.into_response();
        assert_eq!(response.status(), expected_status);
    }

    #[test]
    fn backend_errors_carry_the_error_text() {
        let err = AppError::Generation("beam search exploded".to_string());
        let api_error = ApiError::backend(&err, true);
        assert!(matches!(
            &api_error,
            ApiError::InternalError(msg) if msg == "Backend Error: Generation error: beam search exploded"
        ));
        assert_status_code(api_error, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn backend_errors_can_be_sanitized() {
        let err = AppError::InternalError("db password incorrect".to_string());
        let api_error = ApiError::backend(&err, false);
        assert_eq!(api_error.to_string(), "Internal server error");
        assert_status_code(api_error, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn validation_errors_are_unprocessable() {
        let error = ApiError::ValidationError("missing field `question`".to_string());
        assert_eq!(
            error.to_string(),
            "Validation error: missing field `question`"
        );
        assert_status_code(error, StatusCode::UNPROCESSABLE_ENTITY);
    }
}
