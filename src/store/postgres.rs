use std::time::Duration;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

const CREATE_TABLE_SQL: &str = r#"
    CREATE TABLE IF NOT EXISTS videos (
        id TEXT PRIMARY KEY,
        youtube_id TEXT NOT NULL,
        title TEXT NOT NULL,
        url TEXT NOT NULL,
        channel TEXT NOT NULL,
        transcript TEXT NOT NULL DEFAULT '',
        published_at TIMESTAMPTZ,
        source TEXT NOT NULL,
        is_processed BOOLEAN NOT NULL DEFAULT FALSE,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
"#;

#[derive(Clone, Debug)]
pub struct PgVideoStore {
    pool: PgPool,
}

impl PgVideoStore {
    /// Connections are opened on first use, so a database outage at boot
    /// shows up in the health probe instead of aborting startup.
    pub fn connect_lazy(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(5))
            .connect_lazy(database_url)
            .context("Invalid DATABASE_URL")?;
        Ok(Self { pool })
    }
}

impl_video_store!(PgVideoStore, CREATE_TABLE_SQL);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{VideoStore, VideoUpsert, SOURCE_TAG};
    use uuid::Uuid;

    async fn store() -> PgVideoStore {
        dotenv::dotenv().ok();
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL not set");
        let store = PgVideoStore::connect_lazy(&url).expect("Failed to build pool");
        store.ensure_schema().await.expect("Failed to create schema");
        store
    }

    #[tokio::test]
    #[ignore = "needs a PostgreSQL DATABASE_URL"]
    async fn test_upsert_overwrites_on_postgres() {
        let store = store().await;
        let youtube_id = format!("pg-{}", Uuid::new_v4());

        let first = store
            .upsert_transcript(&VideoUpsert {
                youtube_id: youtube_id.clone(),
                transcript: "first".into(),
                ..Default::default()
            })
            .await
            .unwrap();
        let second = store
            .upsert_transcript(&VideoUpsert {
                youtube_id: youtube_id.clone(),
                transcript: "second".into(),
                ..Default::default()
            })
            .await
            .unwrap();

        assert!(first.created);
        assert!(!second.created);
        assert_eq!(first.id, second.id);

        let record = store.find(&youtube_id).await.unwrap().unwrap();
        assert_eq!(record.transcript, "second");
        assert_eq!(record.source, SOURCE_TAG);
    }

    #[tokio::test]
    #[ignore = "needs a PostgreSQL DATABASE_URL"]
    async fn test_concurrent_upserts_leave_one_row() {
        let store = store().await;
        let youtube_id = format!("pg-race-{}", Uuid::new_v4());

        let mut handles = Vec::new();
        for i in 0..8 {
            let store = store.clone();
            let video = VideoUpsert {
                youtube_id: youtube_id.clone(),
                transcript: format!("attempt {}", i),
                ..Default::default()
            };
            handles.push(tokio::spawn(async move { store.upsert_transcript(&video).await }));
        }

        let mut ids = Vec::new();
        for handle in handles {
            ids.push(handle.await.unwrap().unwrap().id);
        }
        ids.dedup();
        assert_eq!(ids.len(), 1);

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM videos WHERE youtube_id = $1")
            .bind(&youtube_id)
            .fetch_one(&store.pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }
}
