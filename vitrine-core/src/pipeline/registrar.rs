use std::sync::Arc;

use tracing::{info, warn};
use vitrine_model::{MediaDescriptor, MediaInsert};

use crate::database::MediaStore;
use crate::error::{MediaError, Result};

/// Persists the uploaded rendition URLs as one media record.
#[derive(Debug, Clone)]
pub struct MediaRegistrar {
    store: Arc<dyn MediaStore>,
}

impl MediaRegistrar {
    pub fn new(store: Arc<dyn MediaStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn MediaStore> {
        &self.store
    }

    pub async fn register(&self, insert: MediaInsert) -> Result<MediaDescriptor> {
        match self.store.add_media(&insert).await {
            Ok(id) => {
                info!(media_id = id, "registered media record");
                Ok(MediaDescriptor::new(id, insert))
            }
            Err(e) => {
                warn!(error = %e, "failed to register media record");
                Err(match e {
                    MediaError::Persist(reason) => MediaError::Persist(reason),
                    other => MediaError::Persist(other.to_string()),
                })
            }
        }
    }
}
