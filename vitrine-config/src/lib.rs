#![allow(missing_docs)]
//! Configuration for the vitrine service.
//!
//! Values are resolved from `VITRINE_*` environment variables (after an
//! optional `.env` is loaded), then a TOML file, then built-in defaults.

pub mod loader;
pub mod models;
pub mod sources;

pub use loader::{
    ConfigLoad, ConfigLoadError, ConfigLoader, ConfigLoaderOptions,
    ConfigWarning, ConfigWarnings,
};
pub use models::{
    Config, ConfigMetadata, DatabaseConfig, LocalStorageConfig, LogFormat,
    LoggingConfig, PipelineConfig, S3Config, ServerConfig, StorageBackend,
    StorageConfig, UploadMode,
};
pub use sources::{EnvConfig, FileConfig};
