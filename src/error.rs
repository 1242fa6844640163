use axum::{http::StatusCode, response::{IntoResponse, Response}, Json};
use serde_json::json;
use thiserror::Error;

use crate::gemini::GeminiError;

#[derive(Debug, Error)]
pub enum TripError {
    #[error("invalid {field}: {message}")]
    Validation { field: String, message: String },
    #[error("generative backend failed: {0}")]
    Upstream(#[from] GeminiError),
    #[error("trip not found: {0}")]
    NotFound(String),
    #[error("trip store is still loading")]
    NotReady,
}

impl TripError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation { field: field.into(), message: message.into() }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "validation",
            Self::Upstream(_) => "upstream",
            Self::NotFound(_) => "not_found",
            Self::NotReady => "not_ready",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation { .. } => StatusCode::BAD_REQUEST,
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::NotReady => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Name of the rejected input field, for validation failures only.
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::Validation { field, .. } => Some(field),
            _ => None,
        }
    }
}

impl IntoResponse for TripError {
    fn into_response(self) -> Response {
        let mut body = json!({ "error": self.kind(), "message": self.to_string() });
        if let Some(field) = self.field() {
            body["field"] = json!(field);
        }
        (self.status(), Json(body)).into_response()
    }
}
