use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;
use tracing::info;
use vitrine_core::media::OUTPUT_CONTENT_TYPE;
use vitrine_core::model::{MediaDescriptor, MediaRecord, RenditionKind};
use vitrine_core::storage::{
    object_key, validate_base_name, validate_folder, validate_key,
};

use crate::infra::{
    app_state::AppState,
    errors::{AppError, AppResult},
};

/// Body of `POST /api/v1/admin/media`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMediaRequest {
    /// `data:image/{jpeg|png};base64,...`
    pub raw_b64_image: String,
    pub folder: String,
    pub image_name: String,
}

pub async fn create_media_handler(
    State(state): State<AppState>,
    Json(request): Json<CreateMediaRequest>,
) -> AppResult<(StatusCode, Json<MediaDescriptor>)> {
    if state.is_shutting_down() {
        return Err(AppError::unavailable("server is shutting down"));
    }

    let CreateMediaRequest {
        raw_b64_image,
        folder,
        image_name,
    } = request;

    validate_folder(&folder)
        .map_err(|err| AppError::invalid_field("folder", err))?;
    validate_base_name(&image_name)
        .map_err(|err| AppError::invalid_field("imageName", err))?;
    // The joined key has its own length limit.
    for kind in RenditionKind::ALL {
        let key =
            object_key(&folder, &image_name, kind, OUTPUT_CONTENT_TYPE);
        validate_key(&key)
            .map_err(|err| AppError::invalid_field("object key", err))?;
    }

    let cancel = state.run_token();
    let descriptor = state
        .pipeline
        .derive_and_upload(raw_b64_image, &folder, &image_name, &cancel)
        .await?;

    info!(media_id = descriptor.id, %folder, "media created");
    Ok((StatusCode::CREATED, Json(descriptor)))
}

pub async fn list_media_handler(
    State(state): State<AppState>,
) -> AppResult<Json<Vec<MediaRecord>>> {
    let records = state.media.list_media().await?;
    Ok(Json(records))
}

pub async fn get_media_handler(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<MediaRecord>> {
    state
        .media
        .get_media(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found(format!("media {id} not found")))
}

/// Removes the record only; uploaded objects stay where they are.
pub async fn delete_media_handler(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    if state.media.delete_media(id).await? {
        info!(media_id = id, "media record deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::not_found(format!("media {id} not found")))
    }
}
