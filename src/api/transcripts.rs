use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::store::{watch_url, VideoStore, VideoUpsert};
use crate::transcript::{preferred_languages, TranscriptFetcher};
use crate::AppState;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TranscriptRequest {
    pub video_id: String,
    #[serde(default)]
    pub languages: Option<Vec<String>>,
    pub title: Option<String>,
    pub channel: Option<String>,
    pub url: Option<String>,
}

impl TranscriptRequest {
    pub fn for_video(video_id: impl Into<String>) -> Self {
        Self {
            video_id: video_id.into(),
            ..Default::default()
        }
    }
}

/// Fetch and storage outcomes are reported separately: a transcript can be
/// returned even when it could not be persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TranscriptResponse {
    pub video_id: String,
    pub transcript: String,
    pub language: String,
    pub success: bool,
    pub stored_in_db: bool,
    pub db_record_id: Option<String>,
    pub error: Option<String>,
}

impl TranscriptResponse {
    fn fetch_failed(video_id: String, error: String) -> Self {
        Self {
            video_id,
            transcript: String::new(),
            language: String::new(),
            success: false,
            stored_in_db: false,
            db_record_id: None,
            error: Some(error),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BatchResponse {
    pub results: Vec<TranscriptResponse>,
    pub total: usize,
    pub successful_extractions: usize,
    pub stored_in_database: usize,
}

impl BatchResponse {
    fn from_results(results: Vec<TranscriptResponse>) -> Self {
        Self {
            total: results.len(),
            successful_extractions: results.iter().filter(|r| r.success).count(),
            stored_in_database: results.iter().filter(|r| r.stored_in_db).count(),
            results,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SmokeTestResponse {
    pub test_video_id: String,
    pub result: TranscriptResponse,
    pub proxy_info: ProxyInfo,
    pub database_info: DatabaseInfo,
}

#[derive(Debug, Serialize)]
pub struct ProxyInfo {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub username: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DatabaseInfo {
    pub connected: bool,
    pub transcript_stored: bool,
    pub record_id: Option<String>,
}

/// Fetches one transcript and stores it. Never fails: both error kinds are
/// folded into the response and logged here.
pub async fn process_video(
    fetcher: &dyn TranscriptFetcher,
    store: &dyn VideoStore,
    request: TranscriptRequest,
) -> TranscriptResponse {
    let TranscriptRequest {
        video_id,
        languages,
        title,
        channel,
        url,
    } = request;
    // The stored row, its default url and the echoed id all use the trimmed id.
    let video_id = video_id.trim().to_string();
    let languages = preferred_languages(languages);

    info!(video_id = %video_id, languages = ?languages, "Fetching transcript");

    let fetched = match fetcher.fetch(&video_id, &languages).await {
        Ok(fetched) => fetched,
        Err(e) => {
            warn!(video_id = %video_id, error = %e, "Failed to fetch transcript");
            metrics::counter!("transcript_fetch_total", "outcome" => "failure").increment(1);
            return TranscriptResponse::fetch_failed(video_id, e.to_string());
        }
    };
    metrics::counter!("transcript_fetch_total", "outcome" => "success").increment(1);

    let video = VideoUpsert {
        youtube_id: video_id.clone(),
        transcript: fetched.text,
        title,
        channel,
        url,
    };

    let db_record_id = match store.upsert_transcript(&video).await {
        Ok(outcome) => {
            info!(
                video_id = %video_id,
                record_id = %outcome.id,
                created = outcome.created,
                chars = video.transcript.chars().count(),
                "Transcript stored"
            );
            metrics::counter!("transcript_store_total", "outcome" => "success").increment(1);
            Some(outcome.id)
        }
        Err(e) => {
            error!(video_id = %video_id, error = %e, "Transcript fetched but not stored");
            metrics::counter!("transcript_store_total", "outcome" => "failure").increment(1);
            None
        }
    };

    TranscriptResponse {
        video_id,
        transcript: video.transcript,
        language: fetched.language,
        success: true,
        stored_in_db: db_record_id.is_some(),
        db_record_id,
        error: None,
    }
}

/// Runs each id through [`process_video`] one after another, in input order.
/// The caller waits for the whole list; there is no fan-out.
pub async fn process_batch(
    fetcher: &dyn TranscriptFetcher,
    store: &dyn VideoStore,
    video_ids: Vec<String>,
) -> BatchResponse {
    let mut results = Vec::with_capacity(video_ids.len());
    for video_id in video_ids {
        results.push(process_video(fetcher, store, TranscriptRequest::for_video(video_id)).await);
    }
    BatchResponse::from_results(results)
}

#[tracing::instrument(name = "Get transcript", skip(state, request), fields(video_id = %request.video_id))]
pub async fn get_transcript(
    State(state): State<AppState>,
    Json(request): Json<TranscriptRequest>,
) -> Json<TranscriptResponse> {
    let AppState { store, fetcher, .. } = state;
    Json(process_video(fetcher.as_ref(), store.as_ref(), request).await)
}

#[tracing::instrument(name = "Get batch transcripts", skip(state, video_ids), fields(count = video_ids.len()))]
pub async fn get_batch_transcripts(
    State(state): State<AppState>,
    Json(video_ids): Json<Vec<String>>,
) -> Json<BatchResponse> {
    let AppState { store, fetcher, .. } = state;
    let batch = process_batch(fetcher.as_ref(), store.as_ref(), video_ids).await;

    info!(
        total = batch.total,
        successful_extractions = batch.successful_extractions,
        stored_in_database = batch.stored_in_database,
        "Batch finished"
    );
    Json(batch)
}

/// Runs the whole pipeline against the configured smoke-test video.
#[tracing::instrument(name = "Smoke test", skip(state))]
pub async fn smoke_test(State(state): State<AppState>) -> Json<SmokeTestResponse> {
    let AppState {
        store,
        fetcher,
        settings,
    } = state;
    let video_id = settings.smoke_test_video_id.clone();

    let request = TranscriptRequest {
        video_id: video_id.clone(),
        languages: None,
        title: Some("Transcript API smoke test video".to_string()),
        channel: Some("Smoke Test".to_string()),
        url: Some(watch_url(&video_id)),
    };
    let result = process_video(fetcher.as_ref(), store.as_ref(), request).await;

    let proxy = settings.proxy.as_ref();
    let proxy_info = ProxyInfo {
        host: proxy.map(|p| p.host.clone()),
        port: proxy.map(|p| p.port),
        username: proxy.and_then(|p| p.masked_username()),
    };

    let database_info = DatabaseInfo {
        connected: store.ping().await.is_ok(),
        transcript_stored: result.stored_in_db,
        record_id: result.db_record_id.clone(),
    };

    Json(SmokeTestResponse {
        test_video_id: video_id,
        result,
        proxy_info,
        database_info,
    })
}
