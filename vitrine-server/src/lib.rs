//! # Vitrine Server
//!
//! HTTP front of the catalog media pipeline. Admin clients post a product
//! image as a `data:` URI and get back the public URLs of its full-size,
//! compressed and thumbnail renditions.

pub mod handlers;
pub mod infra;
pub mod routes;

pub use infra::app_state::AppState;

use std::path::PathBuf;

use axum::{Router, extract::DefaultBodyLimit, routing::get};
use tower::ServiceBuilder;
use tower_http::{
    limit::RequestBodyLimitLayer, services::ServeDir, trace::TraceLayer,
};

/// Directory of locally stored objects and the URL path it is served under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalObjectMount {
    /// Absolute path such as `/media`; `/` serves from the root.
    pub path: String,
    pub dir: PathBuf,
}

/// Build the full application router.
///
/// Request bodies above `max_body_bytes` are rejected with 413 before any
/// decoding happens.
pub fn create_app(
    state: AppState,
    max_body_bytes: usize,
    local_objects: Option<LocalObjectMount>,
) -> Router {
    let mut router = routes::create_api_router()
        .route("/health", get(handlers::health::health_handler));

    if let Some(mount) = local_objects {
        let objects = ServeDir::new(mount.dir);
        router = match mount.path.trim_end_matches('/') {
            "" => router.fallback_service(objects),
            path => router.nest_service(path, objects),
        };
    }

    router
        .layer(DefaultBodyLimit::disable())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(RequestBodyLimitLayer::new(max_body_bytes)),
        )
        .with_state(state)
}
