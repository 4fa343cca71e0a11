//! In-process collaborators for handler and router tests.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::config::Settings;
use crate::errors::{FetchError, StorageError};
use crate::store::{
    SqliteVideoStore, UpsertOutcome, VideoRecord, VideoStore, VideoSummary, VideoUpsert,
};
use crate::transcript::{FetchedTranscript, TranscriptFetcher};
use crate::AppState;

/// Succeeds for every id except the listed ones, answering in the first
/// requested language.
pub struct ScriptedFetcher {
    failing: HashSet<String>,
    calls: Mutex<Vec<(String, Vec<String>)>>,
}

impl ScriptedFetcher {
    pub fn failing_for(ids: &[&str]) -> Self {
        Self {
            failing: ids.iter().map(|id| id.to_string()).collect(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<(String, Vec<String>)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl TranscriptFetcher for ScriptedFetcher {
    async fn fetch(
        &self,
        video_id: &str,
        languages: &[String],
    ) -> Result<FetchedTranscript, FetchError> {
        self.calls
            .lock()
            .unwrap()
            .push((video_id.to_string(), languages.to_vec()));

        if self.failing.contains(video_id) {
            return Err(FetchError::new(format!(
                "Could not retrieve a transcript for the video {}",
                video_id
            )));
        }

        Ok(FetchedTranscript {
            text: format!("transcript of {}", video_id),
            language: languages.first().cloned().unwrap_or_default(),
        })
    }
}

/// SQLite-backed store that counts upserts and can simulate outages.
pub struct SpyStore {
    inner: SqliteVideoStore,
    fail_writes: bool,
    offline: bool,
    upserts: AtomicUsize,
}

impl SpyStore {
    async fn build(fail_writes: bool, offline: bool) -> Self {
        let inner = SqliteVideoStore::connect("sqlite::memory:").await.unwrap();
        inner.ensure_schema().await.unwrap();
        Self {
            inner,
            fail_writes,
            offline,
            upserts: AtomicUsize::new(0),
        }
    }

    pub async fn healthy() -> Self {
        Self::build(false, false).await
    }

    pub async fn failing_writes() -> Self {
        Self::build(true, false).await
    }

    pub async fn offline() -> Self {
        Self::build(true, true).await
    }

    pub fn upsert_calls(&self) -> usize {
        self.upserts.load(Ordering::SeqCst)
    }

    fn outage(&self) -> StorageError {
        StorageError::Sqlx(sqlx::Error::PoolTimedOut)
    }
}

#[async_trait]
impl VideoStore for SpyStore {
    async fn ping(&self) -> Result<(), StorageError> {
        if self.offline {
            return Err(self.outage());
        }
        self.inner.ping().await
    }

    async fn ensure_schema(&self) -> Result<(), StorageError> {
        self.inner.ensure_schema().await
    }

    async fn upsert_transcript(&self, video: &VideoUpsert) -> Result<UpsertOutcome, StorageError> {
        self.upserts.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes {
            return Err(self.outage());
        }
        self.inner.upsert_transcript(video).await
    }

    async fn list_recent(&self, limit: i64) -> Result<Vec<VideoSummary>, StorageError> {
        if self.offline {
            return Err(self.outage());
        }
        self.inner.list_recent(limit).await
    }

    async fn find(&self, id: &str) -> Result<Option<VideoRecord>, StorageError> {
        if self.offline {
            return Err(self.outage());
        }
        self.inner.find(id).await
    }
}

pub fn test_settings(extra: &[(&str, &str)]) -> Settings {
    Settings::from_lookup(|key| {
        if key == "DATABASE_URL" {
            return Some("sqlite::memory:".to_string());
        }
        extra
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.to_string())
    })
    .unwrap()
}

pub fn test_state(
    fetcher: ScriptedFetcher,
    store: SpyStore,
    extra_settings: &[(&str, &str)],
) -> (AppState, Arc<SpyStore>) {
    let store = Arc::new(store);
    let state = AppState {
        store: store.clone(),
        fetcher: Arc::new(fetcher),
        settings: Arc::new(test_settings(extra_settings)),
    };
    (state, store)
}
