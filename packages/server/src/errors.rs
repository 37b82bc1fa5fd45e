//! Error taxonomy for the persistence gateway.
//!
//! Every handler error is caught per request and rendered as the JSON
//! envelope `{ ok: false, error }` with a matching status; nothing here is
//! allowed to take the process down.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Path traversal denied: {0}")]
    PathTraversal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid rotation: {0} degrees")]
    InvalidRotation(i32),

    #[error("Rotation tool failed: {0}")]
    RotationTool(String),

    #[error("Request body too large")]
    OversizedBody,

    #[error("Malformed request: {0}")]
    MalformedRequest(String),
}

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::PathTraversal(_) => StatusCode::FORBIDDEN,
            GatewayError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            GatewayError::NotFound(_) => StatusCode::NOT_FOUND,
            GatewayError::InvalidRotation(_) => StatusCode::BAD_REQUEST,
            GatewayError::RotationTool(_) => StatusCode::INTERNAL_SERVER_ERROR,
            GatewayError::OversizedBody => StatusCode::PAYLOAD_TOO_LARGE,
            GatewayError::MalformedRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        tracing::warn!(status = %status, error = %self, "request failed");
        let body = serde_json::json!({ "ok": false, "error": self.to_string() });
        (status, Json(body)).into_response()
    }
}
