use crate::config::ConfigError;
use crate::telemetry::TelemetryError;
use crate::workflows::leave::LeaveError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

/// Top-level failure of the service binary or of a request outside the leave routes.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("telemetry error: {0}")]
    Telemetry(#[from] TelemetryError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("workflow error: {0}")]
    Workflow(#[from] LeaveError),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Workflow(err) => err.status_code(),
            AppError::Config(_) | AppError::Telemetry(_) | AppError::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
