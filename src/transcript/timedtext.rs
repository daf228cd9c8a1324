//! Transcript retrieval through the public `api/timedtext` endpoint.

use super::captions;
use super::{FetchError, FetchResult, TranscriptResult, TranscriptSource};
use crate::config::TranscriptSettings;
use crate::error::Result;
use crate::http::{self, ClientOptions};
use crate::youtube::VideoId;
use async_trait::async_trait;
use tracing::debug;

pub struct TimedTextSource {
    client: reqwest::Client,
    base_url: String,
    languages: Vec<String>,
}

impl TimedTextSource {
    pub fn new(settings: &TranscriptSettings) -> Result<Self> {
        let client = http::create_client(&ClientOptions {
            user_agent: settings.user_agent.clone(),
            timeout: settings.timeout_for("timedtext"),
            accept_invalid_certs: settings.accept_invalid_certs,
        })?;

        Ok(Self {
            client,
            base_url: settings.youtube_base_url.trim_end_matches('/').to_string(),
            languages: settings.languages.clone(),
        })
    }

    async fn fetch_language(&self, video_id: &VideoId, lang: &str) -> FetchResult<String> {
        let url = format!("{}/api/timedtext", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("v", video_id.as_str()), ("lang", lang), ("fmt", "json3")])
            .send()
            .await
            .map_err(|e| http::classify_error(&e))?;
        http::check_status(response.status())?;

        response.text().await.map_err(|e| http::classify_error(&e))
    }
}

#[async_trait]
impl TranscriptSource for TimedTextSource {
    fn name(&self) -> &'static str {
        "timedtext"
    }

    async fn fetch(&self, video_id: &VideoId) -> FetchResult<TranscriptResult> {
        for lang in &self.languages {
            let body = self.fetch_language(video_id, lang).await?;

            // The endpoint answers 200 with an empty body for missing languages.
            if body.trim().is_empty() {
                debug!("timedtext: no {} captions for {}", lang, video_id);
                continue;
            }

            let segments = captions::parse_json3(&body)?;
            if segments.is_empty() {
                continue;
            }
            return Ok(TranscriptResult::from_segments(
                video_id,
                self.name(),
                Some(lang.clone()),
                &segments,
            ));
        }

        Err(FetchError::NoCaptions)
    }
}
