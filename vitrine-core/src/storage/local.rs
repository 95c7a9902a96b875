use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tracing::debug;

use super::{
    ObjectStore, ObjectStoreError, PutObjectRequest, validate_base_name,
    validate_key,
};

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Filesystem-backed object store for development and tests.
///
/// Objects live at `{root}/{bucket}/{key}` and are served from
/// `{base_url}/{key}`, e.g. by a static file server pointed at the bucket
/// directory. ACL and cache directives are accepted and ignored.
#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    root: PathBuf,
    base_url: String,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            root: root.into(),
            base_url,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Location of an object on disk.
    pub fn object_path(&self, bucket: &str, key: &str) -> PathBuf {
        self.root.join(bucket).join(key)
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn put(
        &self,
        request: PutObjectRequest,
    ) -> Result<String, ObjectStoreError> {
        let PutObjectRequest {
            bucket, key, body, ..
        } = request;

        validate_base_name(&bucket).map_err(|source| {
            ObjectStoreError::InvalidKey {
                key: bucket.clone(),
                source,
            }
        })?;
        validate_key(&key).map_err(|source| ObjectStoreError::InvalidKey {
            key: key.clone(),
            source,
        })?;

        let path = self.object_path(&bucket, &key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        // Write to a unique sibling, then rename over the destination.
        let temp_path = path.with_extension(format!(
            "tmp.{}.{}",
            std::process::id(),
            TEMP_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));
        if let Err(e) = tokio::fs::write(&temp_path, &body).await {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(e.into());
        }
        if let Err(e) = tokio::fs::rename(&temp_path, &path).await {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        debug!(
            bucket = %bucket,
            key = %key,
            size = body.len(),
            path = %path.display(),
            "stored object on local filesystem"
        );

        Ok(format!("{}/{}", self.base_url, key))
    }
}
