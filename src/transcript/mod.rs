//! Transcript acquisition strategies.
//!
//! Every way of obtaining a transcript implements [`TranscriptSource`]. The
//! fallback chain in [`crate::orchestrator`] tries them in priority order:
//!
//! - `cache` - static table of known transcripts, no network
//! - `innertube` - YouTube's player API, the route official clients use
//! - `timedtext` - the public `api/timedtext` caption endpoint
//! - `ytdlp` - subtitles written by the `yt-dlp` tool
//! - `scrape` - caption metadata embedded in the public watch page

mod cache;
pub mod captions;
mod innertube;
mod scrape;
mod timedtext;
mod ytdlp;

pub use cache::TranscriptCache;
pub use captions::{CaptionSegment, CaptionTrack};
pub use innertube::InnertubeSource;
pub use scrape::ScrapeSource;
pub use timedtext::TimedTextSource;
pub use ytdlp::YtDlpSource;

use crate::error::Result;
use crate::youtube::VideoId;
use async_trait::async_trait;
use serde::{Serialize, Serializer};
use std::time::Duration;
use thiserror::Error;

/// A caller's request for a video transcript.
#[derive(Debug, Clone)]
pub struct TranscriptRequest {
    pub video_id: VideoId,
    /// Summary instructions; `None` when the caller gave none or only whitespace.
    pub instructions: Option<String>,
}

impl TranscriptRequest {
    pub fn from_url(url: &str, instructions: Option<String>) -> Result<Self> {
        Ok(Self {
            video_id: VideoId::from_url(url)?,
            instructions: instructions.filter(|i| !i.trim().is_empty()),
        })
    }
}

/// A transcript produced by one strategy.
#[derive(Debug, Clone, Serialize)]
pub struct TranscriptResult {
    pub video_id: VideoId,
    /// Caption segments joined in order with single spaces.
    pub text: String,
    /// Name of the strategy that produced the transcript.
    pub source: String,
    pub success: bool,
    /// Caption language, when the strategy knows it.
    pub language: Option<String>,
}

impl TranscriptResult {
    pub fn from_text(
        video_id: &VideoId,
        source: &str,
        language: Option<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            video_id: video_id.clone(),
            text: text.into(),
            source: source.to_string(),
            success: true,
            language,
        }
    }

    pub fn from_segments(
        video_id: &VideoId,
        source: &str,
        language: Option<String>,
        segments: &[CaptionSegment],
    ) -> Self {
        Self::from_text(video_id, source, language, captions::join_segments(segments))
    }
}

/// Why a single strategy failed to produce a transcript.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FetchError {
    #[error("video is not in the cache")]
    NotCached,

    #[error("no captions available")]
    NoCaptions,

    #[error("video unavailable: {0}")]
    VideoUnavailable(String),

    #[error("rate limited by YouTube")]
    RateLimited,

    #[error("request blocked: {0}")]
    Blocked(String),

    #[error("network failure: {0}")]
    Network(String),

    #[error("TLS/certificate failure: {0}")]
    Tls(String),

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("page structure not recognized: {0}")]
    Parse(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("external tool not found: {0}")]
    ToolNotFound(String),
}

pub type FetchResult<T> = std::result::Result<T, FetchError>;

/// A strategy name paired with the reason it failed.
#[derive(Debug, Clone, PartialEq)]
pub struct StrategyFailure {
    pub strategy: String,
    pub error: FetchError,
}

impl StrategyFailure {
    pub fn new(strategy: impl Into<String>, error: FetchError) -> Self {
        Self {
            strategy: strategy.into(),
            error,
        }
    }
}

impl std::fmt::Display for StrategyFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.strategy, self.error)
    }
}

impl Serialize for StrategyFailure {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;
        let mut state = serializer.serialize_struct("StrategyFailure", 2)?;
        state.serialize_field("strategy", &self.strategy)?;
        state.serialize_field("reason", &self.error.to_string())?;
        state.end()
    }
}

/// One method of transcript acquisition.
#[async_trait]
pub trait TranscriptSource: Send + Sync {
    /// Short stable name used in logs, configuration and failure reports.
    fn name(&self) -> &'static str;

    /// Make exactly one attempt at fetching the transcript.
    async fn fetch(&self, video_id: &VideoId) -> FetchResult<TranscriptResult>;
}
