use std::sync::Arc;

use tracing::{info, warn};
use vitrine_model::RenditionKind;

use super::{
    IMMUTABLE_CACHE_CONTROL, ObjectAcl, ObjectStore, PutObjectRequest,
    object_key,
};
use crate::error::{MediaError, Result};
use crate::media::EncodedRendition;

/// Result of one successful rendition upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedAsset {
    pub kind: RenditionKind,
    pub key: String,
    pub url: String,
}

/// Writes encoded renditions to a bucket under their deterministic keys.
///
/// Every object is public-read with a one year cache lifetime. Failures are
/// reported once, tagged with the key, and never retried here.
#[derive(Debug, Clone)]
pub struct RenditionUploader {
    store: Arc<dyn ObjectStore>,
    bucket: String,
}

impl RenditionUploader {
    pub fn new(store: Arc<dyn ObjectStore>, bucket: impl Into<String>) -> Self {
        Self {
            store,
            bucket: bucket.into(),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub async fn upload(
        &self,
        folder: &str,
        base_name: &str,
        rendition: EncodedRendition,
    ) -> Result<UploadedAsset> {
        let kind = rendition.kind;
        let key = object_key(folder, base_name, kind, rendition.content_type);
        let size = rendition.bytes.len();

        let request = PutObjectRequest {
            bucket: self.bucket.clone(),
            key: key.clone(),
            body: rendition.bytes,
            content_type: rendition.content_type.mime().to_string(),
            cache_control: IMMUTABLE_CACHE_CONTROL.to_string(),
            acl: ObjectAcl::PublicRead,
        };

        match self.store.put(request).await {
            Ok(url) => {
                info!(kind = %kind, key = %key, size, url = %url, "uploaded rendition");
                Ok(UploadedAsset { kind, key, url })
            }
            Err(e) => {
                warn!(kind = %kind, key = %key, error = %e, "rendition upload failed");
                Err(MediaError::Upload {
                    key,
                    reason: e.to_string(),
                })
            }
        }
    }
}
