//! Decode, derive, upload and register: one product image in, one media record out.
//!
//! A run moves through `decoding -> deriving -> uploading(kind) x3 ->
//! registering`. The first failure ends the run and is returned together with
//! the stage it happened in. Uploads that already succeeded are not removed.
//!
//! Cancellation is honoured up to the start of registration. Once the record
//! insert has been issued the run completes.

pub mod registrar;

use std::fmt;
use std::str::FromStr;

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use vitrine_model::{MediaDescriptor, MediaInsert, RenditionKind};

use crate::error::{MediaError, Result};
use crate::media::{EncodedRendition, derive_renditions, image_from_data_uri};
use crate::storage::{RenditionUploader, UploadedAsset};

pub use registrar::MediaRegistrar;

/// Where a pipeline run was when it stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineStage {
    Decoding,
    Deriving,
    Uploading(RenditionKind),
    Registering,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineStage::Decoding => f.write_str("decoding"),
            PipelineStage::Deriving => f.write_str("deriving"),
            PipelineStage::Uploading(kind) => write!(f, "uploading({kind})"),
            PipelineStage::Registering => f.write_str("registering"),
        }
    }
}

#[derive(Debug, Error)]
#[error("{stage} stage failed: {source}")]
pub struct PipelineError {
    pub stage: PipelineStage,
    #[source]
    pub source: MediaError,
}

impl PipelineError {
    pub fn new(stage: PipelineStage, source: MediaError) -> Self {
        Self { stage, source }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self.source, MediaError::Cancelled(_))
    }

    pub fn into_source(self) -> MediaError {
        self.source
    }
}

fn at(stage: PipelineStage) -> impl FnOnce(MediaError) -> PipelineError {
    move |source| PipelineError::new(stage, source)
}

/// How the three rendition uploads are scheduled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UploadMode {
    /// All three in flight at once; the first failure drops the others.
    #[default]
    Concurrent,
    /// One after another in [`RenditionKind::ALL`] order.
    Sequential,
}

impl FromStr for UploadMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "concurrent" => Ok(UploadMode::Concurrent),
            "sequential" => Ok(UploadMode::Sequential),
            other => Err(format!(
                "unknown upload mode '{other}' (expected 'concurrent' or 'sequential')"
            )),
        }
    }
}

async fn run_blocking<T, F>(task: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(task).await.map_err(|e| {
        MediaError::Internal(format!("Failed to join blocking task: {e}"))
    })?
}

fn check_cancelled(
    cancel: &CancellationToken,
    stage: PipelineStage,
) -> std::result::Result<(), PipelineError> {
    if cancel.is_cancelled() {
        return Err(PipelineError::new(
            stage,
            MediaError::Cancelled(format!("cancelled before {stage}")),
        ));
    }
    Ok(())
}

/// The media derivation and upload pipeline.
#[derive(Debug, Clone)]
pub struct MediaPipeline {
    uploader: RenditionUploader,
    registrar: MediaRegistrar,
    mode: UploadMode,
}

impl MediaPipeline {
    pub fn new(uploader: RenditionUploader, registrar: MediaRegistrar) -> Self {
        Self {
            uploader,
            registrar,
            mode: UploadMode::default(),
        }
    }

    pub fn with_upload_mode(mut self, mode: UploadMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn upload_mode(&self) -> UploadMode {
        self.mode
    }

    pub fn registrar(&self) -> &MediaRegistrar {
        &self.registrar
    }

    /// Turn a `data:image/...;base64,...` string into three stored renditions
    /// and a registered media record.
    ///
    /// Objects are written to `{folder}/{base_name}-{og|compressed|thumb}.jpg`.
    /// Callers validate `folder` and `base_name`.
    pub async fn derive_and_upload(
        &self,
        raw_image: String,
        folder: &str,
        base_name: &str,
        cancel: &CancellationToken,
    ) -> std::result::Result<MediaDescriptor, PipelineError> {
        match self.run(raw_image, folder, base_name, cancel).await {
            Ok(descriptor) => {
                info!(
                    media_id = descriptor.id,
                    folder,
                    base_name,
                    "media pipeline completed"
                );
                Ok(descriptor)
            }
            Err(e) => {
                warn!(
                    stage = %e.stage,
                    folder,
                    base_name,
                    error = %e.source,
                    "media pipeline failed"
                );
                Err(e)
            }
        }
    }

    async fn run(
        &self,
        raw_image: String,
        folder: &str,
        base_name: &str,
        cancel: &CancellationToken,
    ) -> std::result::Result<MediaDescriptor, PipelineError> {
        check_cancelled(cancel, PipelineStage::Decoding)?;
        debug!(
            stage = %PipelineStage::Decoding,
            input_len = raw_image.len(),
            "pipeline stage"
        );
        let decoded = run_blocking(move || image_from_data_uri(&raw_image))
            .await
            .map_err(at(PipelineStage::Decoding))?;

        check_cancelled(cancel, PipelineStage::Deriving)?;
        debug!(
            stage = %PipelineStage::Deriving,
            width = decoded.width(),
            height = decoded.height(),
            "pipeline stage"
        );
        let renditions = run_blocking(move || derive_renditions(&decoded))
            .await
            .map_err(at(PipelineStage::Deriving))?;

        debug!(
            mode = ?self.mode,
            total_bytes = renditions.total_bytes(),
            "uploading renditions"
        );
        let (full_size, compressed, thumbnail) = match self.mode {
            UploadMode::Concurrent => {
                futures::try_join!(
                    self.upload(folder, base_name, renditions.full_size, cancel),
                    self.upload(folder, base_name, renditions.compressed, cancel),
                    self.upload(folder, base_name, renditions.thumbnail, cancel),
                )?
            }
            UploadMode::Sequential => {
                let full_size = self
                    .upload(folder, base_name, renditions.full_size, cancel)
                    .await?;
                let compressed = self
                    .upload(folder, base_name, renditions.compressed, cancel)
                    .await?;
                let thumbnail = self
                    .upload(folder, base_name, renditions.thumbnail, cancel)
                    .await?;
                (full_size, compressed, thumbnail)
            }
        };

        check_cancelled(cancel, PipelineStage::Registering)?;
        debug!(stage = %PipelineStage::Registering, "pipeline stage");
        let insert = MediaInsert {
            full_size: full_size.url,
            compressed: compressed.url,
            thumbnail: thumbnail.url,
        };
        self.registrar
            .register(insert)
            .await
            .map_err(at(PipelineStage::Registering))
    }

    async fn upload(
        &self,
        folder: &str,
        base_name: &str,
        rendition: EncodedRendition,
        cancel: &CancellationToken,
    ) -> std::result::Result<UploadedAsset, PipelineError> {
        let stage = PipelineStage::Uploading(rendition.kind);
        check_cancelled(cancel, stage)?;
        debug!(stage = %stage, size = rendition.bytes.len(), "pipeline stage");

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(PipelineError::new(
                stage,
                MediaError::Cancelled(format!("cancelled during {stage}")),
            )),
            result = self.uploader.upload(folder, base_name, rendition) => {
                result.map_err(at(stage))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use async_trait::async_trait;
    use tokio::sync::Notify;

    use super::*;
    use crate::database::MockMediaStore;
    use crate::media::test_support::png_data_uri;
    use crate::storage::{
        LocalObjectStore, MockObjectStore, ObjectStore, ObjectStoreError,
        PutObjectRequest,
    };

    /// Records keys in call order.
    #[derive(Debug, Default)]
    struct RecordingStore {
        keys: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ObjectStore for RecordingStore {
        async fn put(
            &self,
            request: PutObjectRequest,
        ) -> std::result::Result<String, ObjectStoreError> {
            self.keys.lock().unwrap().push(request.key.clone());
            Ok(format!("https://cdn.test/{}", request.key))
        }
    }

    /// Signals when a put starts, then never completes it.
    #[derive(Debug, Default)]
    struct StalledStore {
        started: Arc<Notify>,
    }

    #[async_trait]
    impl ObjectStore for StalledStore {
        async fn put(
            &self,
            _request: PutObjectRequest,
        ) -> std::result::Result<String, ObjectStoreError> {
            self.started.notify_one();
            std::future::pending().await
        }
    }

    fn pipeline(
        objects: Arc<dyn ObjectStore>,
        media: MockMediaStore,
    ) -> MediaPipeline {
        MediaPipeline::new(
            RenditionUploader::new(objects, "catalog"),
            MediaRegistrar::new(Arc::new(media)),
        )
    }

    fn echo_store(times: usize) -> MockObjectStore {
        let mut store = MockObjectStore::new();
        store
            .expect_put()
            .times(times)
            .returning(|req| Ok(format!("https://cdn.test/{}", req.key)));
        store
    }

    #[tokio::test]
    async fn successful_run_returns_store_id_and_uploaded_urls() {
        let mut media = MockMediaStore::new();
        media
            .expect_add_media()
            .withf(|m| {
                m.full_size == "https://cdn.test/products/shirt-42-og.jpg"
                    && m.compressed
                        == "https://cdn.test/products/shirt-42-compressed.jpg"
                    && m.thumbnail == "https://cdn.test/products/shirt-42-thumb.jpg"
            })
            .times(1)
            .returning(|_| Ok(42));

        let descriptor = pipeline(Arc::new(echo_store(3)), media)
            .derive_and_upload(
                png_data_uri(64, 48),
                "products",
                "shirt-42",
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(descriptor.id, 42);
        assert_eq!(
            descriptor.full_size,
            "https://cdn.test/products/shirt-42-og.jpg"
        );
        assert_eq!(
            descriptor.compressed,
            "https://cdn.test/products/shirt-42-compressed.jpg"
        );
        assert_eq!(
            descriptor.thumbnail,
            "https://cdn.test/products/shirt-42-thumb.jpg"
        );
    }

    #[tokio::test]
    async fn failed_upload_never_registers() {
        let mut objects = MockObjectStore::new();
        objects.expect_put().returning(|req| {
            if req.key.ends_with("-compressed.jpg") {
                Err(ObjectStoreError::Backend("connection reset".into()))
            } else {
                Ok(format!("https://cdn.test/{}", req.key))
            }
        });
        let mut media = MockMediaStore::new();
        media.expect_add_media().times(0);

        let err = pipeline(Arc::new(objects), media)
            .derive_and_upload(
                png_data_uri(16, 16),
                "products",
                "shirt-42",
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();

        assert_eq!(
            err.stage,
            PipelineStage::Uploading(RenditionKind::Compressed)
        );
        match err.source {
            MediaError::Upload { key, .. } => {
                assert_eq!(key, "products/shirt-42-compressed.jpg")
            }
            other => panic!("expected Upload error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn failed_registration_after_uploads_reports_registering() {
        let mut media = MockMediaStore::new();
        media
            .expect_add_media()
            .times(1)
            .returning(|_| Err(MediaError::Persist("connection refused".into())));

        let err = pipeline(Arc::new(echo_store(3)), media)
            .derive_and_upload(
                png_data_uri(16, 16),
                "products",
                "shirt-42",
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();

        assert_eq!(err.stage, PipelineStage::Registering);
        assert!(matches!(err.source, MediaError::Persist(_)));
        assert_eq!(
            err.to_string(),
            "registering stage failed: Failed to persist media record: \
             connection refused"
        );
    }

    #[tokio::test]
    async fn sequential_failure_stops_remaining_uploads() {
        let mut objects = MockObjectStore::new();
        objects
            .expect_put()
            .times(1)
            .returning(|_| Err(ObjectStoreError::Backend("denied".into())));
        let mut media = MockMediaStore::new();
        media.expect_add_media().times(0);

        let err = pipeline(Arc::new(objects), media)
            .with_upload_mode(UploadMode::Sequential)
            .derive_and_upload(
                png_data_uri(16, 16),
                "products",
                "shirt-42",
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();

        assert_eq!(err.stage, PipelineStage::Uploading(RenditionKind::FullSize));
        assert_eq!(
            err.to_string(),
            "uploading(full-size) stage failed: Failed to upload object \
             products/shirt-42-og.jpg: storage backend error: denied"
        );
    }

    #[tokio::test]
    async fn sequential_mode_uploads_in_rendition_order() {
        let objects = Arc::new(RecordingStore::default());
        let mut media = MockMediaStore::new();
        media.expect_add_media().times(1).returning(|_| Ok(1));

        pipeline(objects.clone(), media)
            .with_upload_mode(UploadMode::Sequential)
            .derive_and_upload(
                png_data_uri(16, 16),
                "p",
                "a",
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(
            *objects.keys.lock().unwrap(),
            ["p/a-og.jpg", "p/a-compressed.jpg", "p/a-thumb.jpg"]
        );
    }

    #[tokio::test]
    async fn decode_failure_is_reported_at_decoding_stage() {
        let mut media = MockMediaStore::new();
        media.expect_add_media().times(0);

        let err = pipeline(Arc::new(echo_store(0)), media)
            .derive_and_upload(
                "data:image/gif;base64,R0lGODlh".into(),
                "products",
                "shirt-42",
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();

        assert_eq!(err.stage, PipelineStage::Decoding);
        assert!(matches!(err.source, MediaError::UnsupportedMediaType(_)));
    }

    #[tokio::test]
    async fn cancelled_token_stops_before_any_work() {
        let mut media = MockMediaStore::new();
        media.expect_add_media().times(0);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = pipeline(Arc::new(echo_store(0)), media)
            .derive_and_upload(png_data_uri(8, 8), "p", "a", &cancel)
            .await
            .unwrap_err();

        assert_eq!(err.stage, PipelineStage::Decoding);
        assert!(err.is_cancelled());
    }

    #[tokio::test]
    async fn cancellation_during_uploads_aborts_without_registering() {
        let mut media = MockMediaStore::new();
        media.expect_add_media().times(0);

        let objects = StalledStore::default();
        let started = objects.started.clone();
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            started.notified().await;
            trigger.cancel();
        });

        let err = tokio::time::timeout(
            Duration::from_secs(10),
            pipeline(Arc::new(objects), media).derive_and_upload(
                png_data_uri(8, 8),
                "p",
                "a",
                &cancel,
            ),
        )
        .await
        .expect("pipeline should observe cancellation")
        .unwrap_err();

        assert!(err.is_cancelled());
        assert!(matches!(err.stage, PipelineStage::Uploading(_)));
    }

    #[tokio::test]
    async fn repeated_runs_overwrite_the_same_keys() {
        let dir = tempfile::tempdir().unwrap();
        let objects =
            Arc::new(LocalObjectStore::new(dir.path(), "http://cdn.test"));
        let mut media = MockMediaStore::new();
        let mut next_id = 0;
        media.expect_add_media().times(2).returning(move |_| {
            next_id += 1;
            Ok(next_id)
        });
        let pipeline = pipeline(objects, media);

        let first = pipeline
            .derive_and_upload(
                png_data_uri(20, 10),
                "products",
                "shirt-42",
                &CancellationToken::new(),
            )
            .await
            .unwrap();
        let second = pipeline
            .derive_and_upload(
                png_data_uri(20, 10),
                "products",
                "shirt-42",
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!((first.id, second.id), (1, 2));
        assert_eq!(first.full_size, second.full_size);
        assert_eq!(first.compressed, second.compressed);
        assert_eq!(first.thumbnail, second.thumbnail);

        let mut stored: Vec<_> =
            std::fs::read_dir(dir.path().join("catalog").join("products"))
                .unwrap()
                .map(|e| e.unwrap().file_name().into_string().unwrap())
                .collect();
        stored.sort();
        assert_eq!(
            stored,
            [
                "shirt-42-compressed.jpg",
                "shirt-42-og.jpg",
                "shirt-42-thumb.jpg"
            ]
        );
    }

    #[test]
    fn stage_names() {
        assert_eq!(PipelineStage::Decoding.to_string(), "decoding");
        assert_eq!(
            PipelineStage::Uploading(RenditionKind::Thumbnail).to_string(),
            "uploading(thumbnail)"
        );
        assert_eq!(PipelineStage::Registering.to_string(), "registering");
    }

    #[test]
    fn upload_mode_parses_case_insensitively() {
        assert_eq!(
            "Sequential".parse::<UploadMode>(),
            Ok(UploadMode::Sequential)
        );
        assert_eq!(
            " concurrent ".parse::<UploadMode>(),
            Ok(UploadMode::Concurrent)
        );
        assert!("parallel".parse::<UploadMode>().is_err());
    }
}
