//! Persistence of `videos` rows.
//!
//! Both backends share the statements below; only the table DDL differs.
//! The natural key `youtube_id` carries a unique index and the upsert is a
//! single `INSERT ... ON CONFLICT` statement, so concurrent writers for one
//! video cannot create duplicate rows.

/// Implements [`VideoStore`] for a backend struct holding a sqlx `pool`.
/// Only the table DDL differs between backends.
macro_rules! impl_video_store {
    ($store:ty, $create_table:expr) => {
        #[async_trait::async_trait]
        impl $crate::store::VideoStore for $store {
            async fn ping(&self) -> Result<(), $crate::errors::StorageError> {
                $crate::store::timed(sqlx::query("SELECT 1").execute(&self.pool)).await?;
                Ok(())
            }

            #[tracing::instrument(name = "Ensure videos schema", skip(self))]
            async fn ensure_schema(&self) -> Result<(), $crate::errors::StorageError> {
                $crate::store::timed(sqlx::query($create_table).execute(&self.pool)).await?;
                $crate::store::timed(
                    sqlx::query($crate::store::CREATE_UNIQUE_INDEX_SQL).execute(&self.pool),
                )
                .await?;
                Ok(())
            }

            #[tracing::instrument(name = "Upsert video transcript", skip(self, video), fields(youtube_id = %video.youtube_id))]
            async fn upsert_transcript(
                &self,
                video: &$crate::store::VideoUpsert,
            ) -> Result<$crate::store::UpsertOutcome, $crate::errors::StorageError> {
                let new_id = uuid::Uuid::new_v4().to_string();
                let now = chrono::Utc::now();

                let id = $crate::store::timed(
                    sqlx::query_scalar::<_, String>($crate::store::UPSERT_SQL)
                        .bind(&new_id)
                        .bind(&video.youtube_id)
                        .bind(video.title_or_default())
                        .bind(video.url_or_default())
                        .bind(video.channel_or_default())
                        .bind(&video.transcript)
                        .bind(now)
                        .bind($crate::store::SOURCE_TAG)
                        .bind(now)
                        .bind(now)
                        .fetch_one(&self.pool),
                )
                .await?;

                let created = id == new_id;
                tracing::debug!(id = %id, created, "Video row written");
                Ok($crate::store::UpsertOutcome { id, created })
            }

            #[tracing::instrument(name = "List videos query", skip(self))]
            async fn list_recent(
                &self,
                limit: i64,
            ) -> Result<Vec<$crate::store::VideoSummary>, $crate::errors::StorageError> {
                $crate::store::timed(
                    sqlx::query_as::<_, $crate::store::VideoSummary>($crate::store::LIST_SQL)
                        .bind(limit)
                        .fetch_all(&self.pool),
                )
                .await
            }

            #[tracing::instrument(name = "Find video query", skip(self))]
            async fn find(
                &self,
                id: &str,
            ) -> Result<Option<$crate::store::VideoRecord>, $crate::errors::StorageError> {
                $crate::store::timed(
                    sqlx::query_as::<_, $crate::store::VideoRecord>($crate::store::FIND_SQL)
                        .bind(id)
                        .bind(id)
                        .fetch_optional(&self.pool),
                )
                .await
            }
        }
    };
}

mod postgres;
mod sqlite;

pub use postgres::PgVideoStore;
pub use sqlite::SqliteVideoStore;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::errors::StorageError;

/// Provenance tag for rows created by this service.
pub const SOURCE_TAG: &str = "transcript-api";
pub const LIST_LIMIT: i64 = 50;

const QUERY_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct VideoRecord {
    pub id: String,
    pub youtube_id: String,
    pub title: String,
    pub url: String,
    pub channel: String,
    pub transcript: String,
    pub published_at: Option<DateTime<Utc>>,
    pub source: String,
    pub is_processed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// List view: the transcript itself is replaced by its character count.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct VideoSummary {
    pub id: String,
    pub youtube_id: String,
    pub title: String,
    pub channel: String,
    pub source: String,
    pub is_processed: bool,
    pub transcript_length: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct VideoUpsert {
    pub youtube_id: String,
    pub transcript: String,
    pub title: Option<String>,
    pub channel: Option<String>,
    pub url: Option<String>,
}

impl VideoUpsert {
    pub fn title_or_default(&self) -> String {
        self.title
            .clone()
            .unwrap_or_else(|| format!("Video {}", self.youtube_id))
    }

    pub fn url_or_default(&self) -> String {
        self.url.clone().unwrap_or_else(|| watch_url(&self.youtube_id))
    }

    pub fn channel_or_default(&self) -> String {
        self.channel.clone().unwrap_or_else(|| "Unknown".to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpsertOutcome {
    pub id: String,
    /// false when an existing row was overwritten
    pub created: bool,
}

pub fn watch_url(youtube_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={}", youtube_id)
}

#[async_trait]
pub trait VideoStore: Send + Sync {
    /// Live round trip to the database.
    async fn ping(&self) -> Result<(), StorageError>;

    async fn ensure_schema(&self) -> Result<(), StorageError>;

    /// Insert the video or overwrite the transcript of the existing row.
    async fn upsert_transcript(&self, video: &VideoUpsert) -> Result<UpsertOutcome, StorageError>;

    /// Most recently created rows first.
    async fn list_recent(&self, limit: i64) -> Result<Vec<VideoSummary>, StorageError>;

    /// Looks up by `youtube_id` or internal `id`.
    async fn find(&self, id: &str) -> Result<Option<VideoRecord>, StorageError>;
}

/// Picks the backend from the URL scheme.
pub async fn connect(database_url: &str) -> anyhow::Result<Arc<dyn VideoStore>> {
    if database_url.starts_with("sqlite:") {
        Ok(Arc::new(SqliteVideoStore::connect(database_url).await?))
    } else {
        Ok(Arc::new(PgVideoStore::connect_lazy(database_url)?))
    }
}

async fn timed<T, F>(fut: F) -> Result<T, StorageError>
where
    F: Future<Output = Result<T, sqlx::Error>>,
{
    timed_with(QUERY_TIMEOUT, fut).await
}

async fn timed_with<T, F>(limit: Duration, fut: F) -> Result<T, StorageError>
where
    F: Future<Output = Result<T, sqlx::Error>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(res) => res.map_err(StorageError::from),
        Err(_) => Err(StorageError::Timeout(limit)),
    }
}

const CREATE_UNIQUE_INDEX_SQL: &str =
    r#"CREATE UNIQUE INDEX IF NOT EXISTS videos_youtube_id_key ON videos (youtube_id)"#;

const UPSERT_SQL: &str = r#"
    INSERT INTO videos (
        id, youtube_id, title, url, channel, transcript,
        published_at, source, is_processed, created_at, updated_at
    ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, TRUE, $9, $10)
    ON CONFLICT (youtube_id) DO UPDATE
    SET transcript = excluded.transcript,
        is_processed = TRUE,
        updated_at = excluded.updated_at
    RETURNING id
"#;

const LIST_SQL: &str = r#"
    SELECT id, youtube_id, title, channel, source, is_processed,
           CAST(LENGTH(transcript) AS BIGINT) AS transcript_length, created_at
    FROM videos
    ORDER BY created_at DESC
    LIMIT $1
"#;

const FIND_SQL: &str = r#"
    SELECT id, youtube_id, title, url, channel, transcript,
           published_at, source, is_processed, created_at, updated_at
    FROM videos
    WHERE youtube_id = $1 OR id = $2
    LIMIT 1
"#;
