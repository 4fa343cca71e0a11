use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info};
use yt_transcript_rs::api::YouTubeTranscriptApi;
use yt_transcript_rs::proxies::{GenericProxyConfig, ProxyConfig};
use yt_transcript_rs::FetchedTranscript as LibraryTranscript;

use super::{FetchedTranscript, TranscriptFetcher};
use crate::config::ProxySettings;
use crate::errors::FetchError;

/// Fetches captions with `yt-transcript-rs`, optionally through an HTTP proxy.
pub struct YoutubeTranscriptFetcher {
    api: YouTubeTranscriptApi,
    timeout: Duration,
}

impl YoutubeTranscriptFetcher {
    pub fn new(proxy: Option<&ProxySettings>, timeout: Duration) -> anyhow::Result<Self> {
        let proxy_config: Option<Box<dyn ProxyConfig + Send + Sync>> = match proxy {
            Some(proxy) => {
                let url = proxy.url()?.to_string();
                info!("Routing transcript requests through proxy {}:{}", proxy.host, proxy.port);
                let config = GenericProxyConfig::new(Some(url.clone()), Some(url))
                    .map_err(|e| anyhow::anyhow!("Invalid proxy configuration: {}", e))?;
                Some(Box::new(config))
            }
            None => None,
        };

        let api = YouTubeTranscriptApi::new(None, proxy_config, None)
            .map_err(|e| anyhow::anyhow!("Failed to create transcript client: {}", e))?;

        Ok(Self { api, timeout })
    }
}

#[async_trait]
impl TranscriptFetcher for YoutubeTranscriptFetcher {
    #[tracing::instrument(name = "fetch_transcript", skip(self))]
    async fn fetch(
        &self,
        video_id: &str,
        languages: &[String],
    ) -> Result<FetchedTranscript, FetchError> {
        if video_id.trim().is_empty() {
            return Err(FetchError::new("video_id must not be empty"));
        }

        let languages: Vec<&str> = languages.iter().map(String::as_str).collect();

        let fetched = within(
            self.timeout,
            video_id,
            self.api.fetch_transcript(video_id, &languages, false),
        )
        .await?;

        let transcript = normalise(fetched);
        debug!(
            chars = transcript.text.chars().count(),
            language = %transcript.language,
            "Fetched transcript"
        );
        Ok(transcript)
    }
}

/// Bounds a library call and folds both its error and a timeout into [`FetchError`].
async fn within<T, E, F>(limit: Duration, video_id: &str, fut: F) -> Result<T, FetchError>
where
    E: std::fmt::Display,
    F: Future<Output = Result<T, E>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(res) => res.map_err(|e| FetchError::new(e.to_string())),
        Err(_) => Err(FetchError::new(format!(
            "Transcript fetch for {} timed out after {:?}",
            video_id, limit
        ))),
    }
}

fn normalise(fetched: LibraryTranscript) -> FetchedTranscript {
    FetchedTranscript {
        text: join_snippets(fetched.snippets.iter().map(|s| s.text.as_str())),
        language: fetched.language_code,
    }
}

fn join_snippets<'a>(texts: impl Iterator<Item = &'a str>) -> String {
    texts.collect::<Vec<_>>().join(" ")
}
