use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use tracing::info;
use vitrine_model::{MediaInsert, MediaRecord};

use super::ports::MediaStore;
use crate::error::{MediaError, Result};

/// Connection pool plus the repositories built on it.
#[derive(Clone)]
pub struct PostgresDatabase {
    pool: PgPool,
    max_connections: u32,
    media: PostgresMediaRepository,
}

impl fmt::Debug for PostgresDatabase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PostgresDatabase")
            .field("pool_size", &self.pool.size())
            .field("idle_connections", &self.pool.num_idle())
            .field("max_connections", &self.max_connections)
            .finish()
    }
}

impl PostgresDatabase {
    pub async fn new(connection_string: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(30))
            .max_lifetime(Duration::from_secs(1800))
            .idle_timeout(Duration::from_secs(600))
            .test_before_acquire(true)
            .connect(connection_string)
            .await
            .map_err(|e| {
                MediaError::Internal(format!("Database connection failed: {e}"))
            })?;

        info!(max_connections, "Database pool initialized");

        Ok(Self::from_pool(pool, max_connections))
    }

    pub fn from_pool(pool: PgPool, max_connections: u32) -> Self {
        let media = PostgresMediaRepository::new(pool.clone());
        Self {
            pool,
            max_connections,
            media,
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn media_repository(&self) -> &PostgresMediaRepository {
        &self.media
    }

    /// Apply pending migrations.
    pub async fn migrate(&self) -> Result<()> {
        crate::MIGRATOR.run(&self.pool).await.map_err(|e| {
            MediaError::Internal(format!("Migration failed: {e}"))
        })?;
        info!("Database migrations applied");
        Ok(())
    }
}

#[derive(Clone, Debug)]
pub struct PostgresMediaRepository {
    pool: PgPool,
}

impl PostgresMediaRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn map_row(row: PgRow) -> Result<MediaRecord> {
        let read = |e: sqlx::Error| {
            MediaError::Internal(format!("Failed to decode media row: {e}"))
        };
        Ok(MediaRecord {
            id: row.try_get("id").map_err(read)?,
            full_size: row.try_get("full_size").map_err(read)?,
            compressed: row.try_get("compressed").map_err(read)?,
            thumbnail: row.try_get("thumbnail").map_err(read)?,
            created_at: row
                .try_get::<DateTime<Utc>, _>("created_at")
                .map_err(read)?,
        })
    }
}

#[async_trait]
impl MediaStore for PostgresMediaRepository {
    async fn add_media(&self, media: &MediaInsert) -> Result<i64> {
        let row = sqlx::query(
            r#"
            INSERT INTO media (full_size, compressed, thumbnail)
            VALUES ($1, $2, $3)
            RETURNING id
            "#,
        )
        .bind(&media.full_size)
        .bind(&media.compressed)
        .bind(&media.thumbnail)
        .fetch_one(self.pool())
        .await
        .map_err(|e| MediaError::Persist(e.to_string()))?;

        row.try_get::<i64, _>("id")
            .map_err(|e| MediaError::Persist(format!("missing id: {e}")))
    }

    async fn get_media(&self, id: i64) -> Result<Option<MediaRecord>> {
        let row = sqlx::query(
            r#"
            SELECT id, full_size, compressed, thumbnail, created_at
            FROM media
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(|e| MediaError::Internal(format!("Failed to load media: {e}")))?;

        row.map(Self::map_row).transpose()
    }

    async fn list_media(&self) -> Result<Vec<MediaRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT id, full_size, compressed, thumbnail, created_at
            FROM media
            ORDER BY id DESC
            "#,
        )
        .fetch_all(self.pool())
        .await
        .map_err(|e| MediaError::Internal(format!("Failed to list media: {e}")))?;

        rows.into_iter().map(Self::map_row).collect()
    }

    async fn delete_media(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM media WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(|e| {
                MediaError::Internal(format!("Failed to delete media: {e}"))
            })?;

        Ok(result.rows_affected() > 0)
    }
}
