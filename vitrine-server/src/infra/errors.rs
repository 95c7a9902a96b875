use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

use vitrine_core::storage::KeyError;
use vitrine_core::{MediaError, PipelineError};

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, message)
    }

    pub fn invalid_field(field: &str, err: KeyError) -> Self {
        Self::bad_request(format!("invalid {field}: {err}"))
    }
}

fn status_for(err: &MediaError) -> StatusCode {
    match err {
        MediaError::Format(_)
        | MediaError::UnsupportedMediaType(_)
        | MediaError::Decode(_) => StatusCode::BAD_REQUEST,
        MediaError::Encode { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        MediaError::Upload { .. } => StatusCode::BAD_GATEWAY,
        MediaError::Cancelled(_) => StatusCode::SERVICE_UNAVAILABLE,
        MediaError::Persist(_) | MediaError::Internal(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": {
                "message": self.message,
                "status": self.status.as_u16(),
            }
        }));

        (self.status, body).into_response()
    }
}

impl From<MediaError> for AppError {
    fn from(err: MediaError) -> Self {
        let status = status_for(&err);
        if status.is_server_error() {
            tracing::error!(error = %err, "media operation failed");
        }
        Self::new(status, err.to_string())
    }
}

impl From<PipelineError> for AppError {
    fn from(err: PipelineError) -> Self {
        Self::new(status_for(&err.source), err.to_string())
    }
}
