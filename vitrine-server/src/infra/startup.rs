use std::sync::Arc;

use anyhow::Context;
use tokio_util::sync::CancellationToken;
use tracing::info;
use vitrine_config::{Config, StorageConfig};
use vitrine_core::{
    LocalObjectStore, MediaPipeline, MediaRegistrar, MediaStore, ObjectStore,
    PostgresDatabase, RenditionUploader, S3ObjectStore, S3Options,
};

use crate::LocalObjectMount;
use crate::infra::app_state::AppState;

/// Object store for the configured backend.
pub fn build_object_store(storage: &StorageConfig) -> Arc<dyn ObjectStore> {
    match storage {
        StorageConfig::S3(s3) => {
            info!(
                bucket = %s3.bucket,
                region = %s3.region,
                endpoint = s3.endpoint.as_deref().unwrap_or("aws"),
                "using S3 object storage"
            );
            Arc::new(S3ObjectStore::new(S3Options {
                endpoint: s3.endpoint.clone(),
                region: s3.region.clone(),
                access_key: s3.access_key.clone(),
                secret_key: s3.secret_key.clone(),
                cdn_base_url: s3.cdn_base_url.clone(),
                force_path_style: s3.force_path_style,
            }))
        }
        StorageConfig::Local(local) => {
            info!(
                root = %local.root.display(),
                bucket = %local.bucket,
                "using local object storage"
            );
            Arc::new(LocalObjectStore::new(
                local.root.clone(),
                local.base_url.clone(),
            ))
        }
    }
}

/// Where the local backend's objects are served, so its URLs resolve.
pub fn local_object_mount(
    storage: &StorageConfig,
) -> anyhow::Result<Option<LocalObjectMount>> {
    let StorageConfig::Local(local) = storage else {
        return Ok(None);
    };
    let base_url = url::Url::parse(&local.base_url).with_context(|| {
        format!("invalid local storage base URL {}", local.base_url)
    })?;
    let mount = LocalObjectMount {
        path: base_url.path().to_string(),
        dir: local.root.join(&local.bucket),
    };
    info!(
        path = %mount.path,
        dir = %mount.dir.display(),
        "serving local objects"
    );
    Ok(Some(mount))
}

pub fn build_pipeline(
    config: &Config,
    store: Arc<dyn ObjectStore>,
    media: Arc<dyn MediaStore>,
) -> MediaPipeline {
    MediaPipeline::new(
        RenditionUploader::new(store, config.storage.bucket()),
        MediaRegistrar::new(media),
    )
    .with_upload_mode(config.pipeline.upload_mode)
}

/// Connect to PostgreSQL using the configured URL and pool size.
pub async fn connect_database(
    config: &Config,
) -> anyhow::Result<PostgresDatabase> {
    let url = config.database.url.as_deref().context(
        "no database URL configured; set database.url, VITRINE_DATABASE_URL or DATABASE_URL",
    )?;
    if !(url.starts_with("postgres://") || url.starts_with("postgresql://")) {
        anyhow::bail!(
            "Invalid database URL: must start with postgres:// or postgresql://"
        );
    }

    let database =
        PostgresDatabase::new(url, config.database.max_connections)
            .await
            .context("failed to connect to PostgreSQL")?;
    info!(
        max_connections = config.database.max_connections,
        "connected to PostgreSQL"
    );
    Ok(database)
}

/// Connect, migrate and wire everything the routes need.
pub async fn wire_app_state(
    config: &Config,
    shutdown: CancellationToken,
) -> anyhow::Result<AppState> {
    let database = connect_database(config).await?;
    database
        .migrate()
        .await
        .context("database migration failed")?;

    let media: Arc<dyn MediaStore> =
        Arc::new(database.media_repository().clone());
    let store = build_object_store(&config.storage);
    let pipeline = build_pipeline(config, store, media.clone());
    info!(
        upload_mode = ?pipeline.upload_mode(),
        bucket = %config.storage.bucket(),
        "media pipeline ready"
    );

    Ok(AppState::new(pipeline, media, shutdown))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use vitrine_config::LocalStorageConfig;

    fn local(base_url: &str) -> StorageConfig {
        StorageConfig::Local(LocalStorageConfig {
            root: PathBuf::from("/srv/objects"),
            bucket: "media".into(),
            base_url: base_url.into(),
        })
    }

    #[test]
    fn local_mount_uses_base_url_path_and_bucket_dir() {
        let mount = local_object_mount(&local("http://localhost:8080/media"))
            .unwrap()
            .unwrap();
        assert_eq!(mount.path, "/media");
        assert_eq!(mount.dir, PathBuf::from("/srv/objects/media"));
    }

    #[test]
    fn bare_origin_mounts_at_root() {
        let mount = local_object_mount(&local("http://cdn.local"))
            .unwrap()
            .unwrap();
        assert_eq!(mount.path, "/");
    }
}
