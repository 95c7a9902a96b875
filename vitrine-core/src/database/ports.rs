use std::fmt;

use async_trait::async_trait;
use vitrine_model::{MediaInsert, MediaRecord};

use crate::error::Result;

/// Durable store of composite media records.
///
/// Identifiers are assigned by the store and are unique and increasing.
#[async_trait]
pub trait MediaStore: Send + Sync + fmt::Debug {
    /// Persist one record and return its new identifier.
    async fn add_media(&self, media: &MediaInsert) -> Result<i64>;

    async fn get_media(&self, id: i64) -> Result<Option<MediaRecord>>;

    /// All records, newest first.
    async fn list_media(&self) -> Result<Vec<MediaRecord>>;

    /// Remove a record. Returns `false` when no record had that id.
    ///
    /// Stored objects are left in place.
    async fn delete_media(&self, id: i64) -> Result<bool>;
}

#[cfg(test)]
mockall::mock! {
    pub MediaStore {}

    #[async_trait]
    impl MediaStore for MediaStore {
        async fn add_media(&self, media: &MediaInsert) -> Result<i64>;
        async fn get_media(&self, id: i64) -> Result<Option<MediaRecord>>;
        async fn list_media(&self) -> Result<Vec<MediaRecord>>;
        async fn delete_media(&self, id: i64) -> Result<bool>;
    }
}

#[cfg(test)]
impl fmt::Debug for MockMediaStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockMediaStore").finish_non_exhaustive()
    }
}
