use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::warn;

use sensepal_common::error::PlacesError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Places(#[from] PlacesError),

    #[error("config error: {0}")]
    Config(String),

    #[error("map unavailable: no places API key configured")]
    MapUnavailable,

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("no place found for: {0}")]
    NotFound(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Places(_) => StatusCode::BAD_GATEWAY,
            AppError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::MapUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
        };
        if status.is_server_error() {
            warn!(error = %self, "request failed");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
