//! # Application Error
//!
//! Maps engine errors to structured HTTP responses with proper status
//! codes and error bodies.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use fundi_core::EngineError;

/// Application-level error type that maps to HTTP responses.
#[derive(Error, Debug)]
pub enum AppError {
    /// A domain error surfaced by the settlement engine.
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// The request itself was malformed before it reached the engine.
    #[error("bad request: {0}")]
    BadRequest(String),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::Engine(e) => match e {
                EngineError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
                EngineError::StateConflict(_) => StatusCode::CONFLICT,
                EngineError::NotFound(_) => StatusCode::NOT_FOUND,
                EngineError::UserNotEligible(_) => StatusCode::FORBIDDEN,
                EngineError::Signature(_) => StatusCode::UNAUTHORIZED,
                EngineError::Provider(_) => StatusCode::BAD_GATEWAY,
                EngineError::Consistency(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let body = serde_json::json!({
            "error": {
                "code": status.as_u16(),
                "message": self.to_string(),
            }
        });
        (status, axum::Json(body)).into_response()
    }
}
