//! Transcript retrieval.
//!
//! The rest of the service only knows the single `fetch` capability below;
//! whatever the upstream library returns is normalised inside the adapter.

mod youtube;

pub use youtube::YoutubeTranscriptFetcher;

use async_trait::async_trait;
use serde::Serialize;

use crate::errors::FetchError;

pub const DEFAULT_LANGUAGE: &str = "en";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FetchedTranscript {
    /// Caption snippets joined with single spaces.
    pub text: String,
    /// Language code of the track that was actually used.
    pub language: String,
}

#[async_trait]
pub trait TranscriptFetcher: Send + Sync {
    async fn fetch(&self, video_id: &str, languages: &[String])
        -> Result<FetchedTranscript, FetchError>;
}

/// Falls back to `["en"]` when the caller sent nothing usable.
pub fn preferred_languages(languages: Option<Vec<String>>) -> Vec<String> {
    let languages: Vec<String> = languages
        .unwrap_or_default()
        .into_iter()
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty())
        .collect();

    if languages.is_empty() {
        vec![DEFAULT_LANGUAGE.to_string()]
    } else {
        languages
    }
}
