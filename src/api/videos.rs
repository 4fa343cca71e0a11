use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;

use crate::errors::AppError;
use crate::store::{VideoRecord, VideoSummary, LIST_LIMIT};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct VideoList {
    pub videos: Vec<VideoSummary>,
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct VideoEnvelope {
    pub video: VideoRecord,
}

#[tracing::instrument(name = "List videos", skip(state))]
pub async fn all_videos(State(state): State<AppState>) -> Result<Json<VideoList>, AppError> {
    let AppState { store, .. } = state;

    let videos = store.list_recent(LIST_LIMIT).await?;

    Ok(Json(VideoList {
        total: videos.len(),
        videos,
    }))
}

/// `id` may be either the YouTube id or the internal record id.
#[tracing::instrument(name = "Get video", skip(state))]
pub async fn get_video_by_id(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<VideoEnvelope>, AppError> {
    let AppState { store, .. } = state;

    let video = store
        .find(&id)
        .await?
        .ok_or_else(|| AppError::NotFound("Video not found".to_string()))?;

    Ok(Json(VideoEnvelope { video }))
}
