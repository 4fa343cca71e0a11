//! HTTP endpoints.

pub mod common;
pub mod transcripts;
pub mod videos;

use axum::routing::{get, post};
use axum::Router;

use crate::system::{health_check, proxy_check};
use crate::AppState;

/// Builds the application router; metrics and tracing layers are added by `main`.
#[tracing::instrument(name = "create_router", skip(state))]
pub fn create_router(state: AppState) -> Router {
    tracing::info!("Creating API router");

    Router::new()
        .route("/", get(health_check::health_check))
        .route("/transcript", post(transcripts::get_transcript))
        .route("/transcript/batch", post(transcripts::get_batch_transcripts))
        .route("/test", get(transcripts::smoke_test))
        .route("/videos", get(videos::all_videos))
        .route("/videos/:id", get(videos::get_video_by_id))
        .route("/proxy/check", get(proxy_check::proxy_check))
        .with_state(state)
}
