use axum::{
    Router,
    routing::{get, post},
};

use crate::{AppState, handlers::media};

pub const ADMIN_MEDIA: &str = "/admin/media";
pub const ADMIN_MEDIA_ITEM: &str = "/admin/media/{id}";

/// Create all v1 API routes
pub fn create_v1_router() -> Router<AppState> {
    Router::new()
        .route(
            ADMIN_MEDIA,
            post(media::create_media_handler).get(media::list_media_handler),
        )
        .route(
            ADMIN_MEDIA_ITEM,
            get(media::get_media_handler).delete(media::delete_media_handler),
        )
}
