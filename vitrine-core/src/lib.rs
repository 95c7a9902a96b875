#![allow(missing_docs)]
//! Product media pipeline for the vitrine catalog service.
//!
//! A client submits one image as a `data:` URI. The pipeline decodes it,
//! derives full-size, compressed and thumbnail JPEG renditions, uploads each
//! to object storage under a deterministic key and records the three public
//! URLs as a single media record.

/// Persistence of media records
pub mod database;

/// Error types and error handling utilities
pub mod error;

/// Data URI decoding and rendition derivation
pub mod media;

/// Stage sequencing, cancellation and upload fan-out
pub mod pipeline;

/// Object storage port and adapters
pub mod storage;

#[cfg(feature = "database")]
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

pub use database::MediaStore;
#[cfg(feature = "database")]
pub use database::{PostgresDatabase, PostgresMediaRepository};
pub use error::{MediaError, Result};
pub use pipeline::{
    MediaPipeline, MediaRegistrar, PipelineError, PipelineStage, UploadMode,
};
pub use storage::{
    LocalObjectStore, ObjectAcl, ObjectStore, ObjectStoreError,
    PutObjectRequest, RenditionUploader, UploadedAsset,
};
#[cfg(feature = "s3")]
pub use storage::{S3ObjectStore, S3Options};

pub use vitrine_model as model;
