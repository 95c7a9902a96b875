use thiserror::Error;
use vitrine_model::RenditionKind;

#[derive(Error, Debug)]
pub enum MediaError {
    #[error("Invalid data URI: {0}")]
    Format(String),

    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Failed to encode {kind} rendition: {reason}")]
    Encode { kind: RenditionKind, reason: String },

    #[error("Failed to upload object {key}: {reason}")]
    Upload { key: String, reason: String },

    #[error("Failed to persist media record: {0}")]
    Persist(String),

    #[error("Operation cancelled: {0}")]
    Cancelled(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, MediaError>;
