//! HTTP mapping of research errors.
//!
//! Every failed request gets a `{error, message}` JSON body.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::error::ResearchError;

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }
}

impl From<ResearchError> for ApiError {
    fn from(error: ResearchError) -> Self {
        let (status, code) = match &error {
            ResearchError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
            ResearchError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            ResearchError::InvalidTransition { .. } => (StatusCode::CONFLICT, "invalid_transition"),
            ResearchError::CapacityExhausted => {
                (StatusCode::SERVICE_UNAVAILABLE, "capacity_exhausted")
            }
            ResearchError::SequenceEvicted { .. } => (StatusCode::GONE, "sequence_evicted"),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        };
        if status.is_server_error() && status != StatusCode::SERVICE_UNAVAILABLE {
            tracing::error!(error = %error, "Request failed");
        }
        Self::new(status, code, error.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            "validation_error",
            rejection.body_text(),
        )
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(json!({ "error": self.code, "message": self.message })),
        )
            .into_response()
    }
}
