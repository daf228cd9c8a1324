//! Transcript retrieval from caption metadata embedded in the watch page.
//!
//! The watch page carries the same player response the API returns, assigned
//! to `ytInitialPlayerResponse` inside an inline `<script>`.

use super::innertube;
use super::{FetchError, FetchResult, TranscriptResult, TranscriptSource};
use crate::config::TranscriptSettings;
use crate::error::Result;
use crate::http::{self, ClientOptions};
use crate::youtube::VideoId;
use async_trait::async_trait;
use scraper::{Html, Selector};
use serde_json::Value;

const PLAYER_MARKER: &str = "ytInitialPlayerResponse";

pub struct ScrapeSource {
    client: reqwest::Client,
    base_url: String,
    languages: Vec<String>,
}

impl ScrapeSource {
    pub fn new(settings: &TranscriptSettings) -> Result<Self> {
        let client = http::create_client(&ClientOptions {
            user_agent: settings.user_agent.clone(),
            timeout: settings.timeout_for("scrape"),
            accept_invalid_certs: settings.accept_invalid_certs,
        })?;

        Ok(Self {
            client,
            base_url: settings.youtube_base_url.trim_end_matches('/').to_string(),
            languages: settings.languages.clone(),
        })
    }

    async fn watch_page(&self, video_id: &VideoId) -> FetchResult<String> {
        let response = self
            .client
            .get(format!("{}/watch", self.base_url))
            .query(&[("v", video_id.as_str()), ("hl", "en")])
            .send()
            .await
            .map_err(|e| http::classify_error(&e))?;
        http::check_status(response.status())?;
        response.text().await.map_err(|e| http::classify_error(&e))
    }
}

/// Pull the player response object out of a watch page.
fn extract_player_response(html: &str) -> FetchResult<Value> {
    if html.contains("action=\"https://consent.youtube.com/s\"") {
        return Err(FetchError::Blocked("cookie consent page".to_string()));
    }
    if html.contains("g-recaptcha") {
        return Err(FetchError::Blocked("captcha challenge".to_string()));
    }

    let document = Html::parse_document(html);
    let selector = Selector::parse("script")
        .map_err(|e| FetchError::Parse(format!("invalid selector: {:?}", e)))?;

    for script in document.select(&selector) {
        let body: String = script.text().collect();
        let Some(pos) = body.find(PLAYER_MARKER) else {
            continue;
        };
        let after = &body[pos + PLAYER_MARKER.len()..];
        let Some(open) = after.find('{') else {
            continue;
        };
        // Only an assignment counts, not a later reference like `ytInitialPlayerResponse.x`.
        if !after[..open].trim().starts_with('=') {
            continue;
        }
        let Some(object) = balanced_object(&after[open..]) else {
            return Err(FetchError::Parse("unterminated player response".to_string()));
        };
        return serde_json::from_str(object)
            .map_err(|e| FetchError::Parse(format!("player response is not JSON: {}", e)));
    }

    Err(FetchError::Parse(format!("{} not found in watch page", PLAYER_MARKER)))
}

/// Return the prefix of `s` spanning the first balanced `{...}`, ignoring
/// braces inside JSON strings.
fn balanced_object(s: &str) -> Option<&str> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in s.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(&s[..=i]);
                }
            }
            _ => {}
        }
    }
    None
}

#[async_trait]
impl TranscriptSource for ScrapeSource {
    fn name(&self) -> &'static str {
        "scrape"
    }

    async fn fetch(&self, video_id: &VideoId) -> FetchResult<TranscriptResult> {
        let html = self.watch_page(video_id).await?;
        let player = extract_player_response(&html)?;
        innertube::transcript_from_player(&self.client, &player, video_id, &self.languages, self.name())
            .await
    }
}
