use std::str::FromStr;

use anyhow::Context;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

// DATETIME and BOOLEAN are the declared types sqlx maps onto chrono and bool.
const CREATE_TABLE_SQL: &str = r#"
    CREATE TABLE IF NOT EXISTS videos (
        id TEXT PRIMARY KEY,
        youtube_id TEXT NOT NULL,
        title TEXT NOT NULL,
        url TEXT NOT NULL,
        channel TEXT NOT NULL,
        transcript TEXT NOT NULL DEFAULT '',
        published_at DATETIME,
        source TEXT NOT NULL,
        is_processed BOOLEAN NOT NULL DEFAULT FALSE,
        created_at DATETIME NOT NULL,
        updated_at DATETIME NOT NULL
    )
"#;

/// Local-development backend, also used by the test suite.
#[derive(Clone, Debug)]
pub struct SqliteVideoStore {
    pool: SqlitePool,
}

impl SqliteVideoStore {
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .with_context(|| format!("Invalid SQLite URL '{}'", database_url))?
            .create_if_missing(true);

        // An in-memory database only lives as long as its single connection.
        let max_connections = if database_url.contains(":memory:") { 1 } else { 5 };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .context("Failed to open SQLite database")?;

        Ok(Self { pool })
    }
}

impl_video_store!(SqliteVideoStore, CREATE_TABLE_SQL);
