use std::{fmt, sync::Arc};

use tokio_util::sync::CancellationToken;
use vitrine_core::{MediaPipeline, MediaStore};

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<MediaPipeline>,
    pub media: Arc<dyn MediaStore>,
    /// Cancelled once the server starts shutting down.
    pub shutdown: CancellationToken,
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState")
            .field("upload_mode", &self.pipeline.upload_mode())
            .field("shutting_down", &self.shutdown.is_cancelled())
            .finish_non_exhaustive()
    }
}

impl AppState {
    pub fn new(
        pipeline: MediaPipeline,
        media: Arc<dyn MediaStore>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            media,
            shutdown,
        }
    }

    /// Token for one pipeline run; cancelled with the server.
    pub fn run_token(&self) -> CancellationToken {
        self.shutdown.child_token()
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }
}
