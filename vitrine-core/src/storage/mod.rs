//! Object storage port, adapters and the rendition uploader.

pub mod key;
pub mod local;
#[cfg(feature = "s3")]
pub mod s3;
pub mod upload;

use std::fmt;

use async_trait::async_trait;
use thiserror::Error;

pub use key::{KeyError, object_key, validate_base_name, validate_folder, validate_key};
pub use local::LocalObjectStore;
#[cfg(feature = "s3")]
pub use s3::{S3ObjectStore, S3Options};
pub use upload::{RenditionUploader, UploadedAsset};

/// Renditions never change once written to a key, so CDNs may cache for a year.
pub const IMMUTABLE_CACHE_CONTROL: &str = "max-age=31536000";

/// Canned access policy attached to an uploaded object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectAcl {
    Private,
    PublicRead,
}

impl ObjectAcl {
    pub const fn as_str(self) -> &'static str {
        match self {
            ObjectAcl::Private => "private",
            ObjectAcl::PublicRead => "public-read",
        }
    }
}

impl fmt::Display for ObjectAcl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single object write.
#[derive(Clone, PartialEq, Eq)]
pub struct PutObjectRequest {
    pub bucket: String,
    pub key: String,
    pub body: Vec<u8>,
    pub content_type: String,
    pub cache_control: String,
    pub acl: ObjectAcl,
}

impl fmt::Debug for PutObjectRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PutObjectRequest")
            .field("bucket", &self.bucket)
            .field("key", &self.key)
            .field("body_len", &self.body.len())
            .field("content_type", &self.content_type)
            .field("cache_control", &self.cache_control)
            .field("acl", &self.acl)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ObjectStoreError {
    #[error("invalid object key '{key}': {source}")]
    InvalidKey {
        key: String,
        #[source]
        source: KeyError,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Blob storage that serves written objects at public URLs.
#[async_trait]
pub trait ObjectStore: Send + Sync + fmt::Debug {
    /// Write (or overwrite) one object and return the URL it is served from.
    async fn put(
        &self,
        request: PutObjectRequest,
    ) -> Result<String, ObjectStoreError>;
}

#[cfg(test)]
mockall::mock! {
    pub ObjectStore {}

    #[async_trait]
    impl ObjectStore for ObjectStore {
        async fn put(
            &self,
            request: PutObjectRequest,
        ) -> Result<String, ObjectStoreError>;
    }
}

#[cfg(test)]
impl fmt::Debug for MockObjectStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockObjectStore").finish_non_exhaustive()
    }
}
