//! Epochly - YouTube transcripts, summaries and quizzes
//!
//! Fetches the transcript of a YouTube video through an ordered chain of
//! fallback strategies and turns it into summaries and multiple-choice
//! quizzes using a caller-supplied LLM key.
//!
//! # Architecture
//!
//! - `youtube` - Video id extraction from URLs
//! - `transcript` - Transcript strategies and caption decoding
//! - `orchestrator` - The fallback chain over those strategies
//! - `llm` - Chat providers, summaries and quiz generation
//! - `config` - Settings and prompt templates
//! - `cli` - Command line and HTTP API
//!
//! # Example
//!
//! ```rust,no_run
//! use epochly::config::Settings;
//! use epochly::orchestrator::FallbackChain;
//! use epochly::transcript::TranscriptCache;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let cache = Arc::new(TranscriptCache::from_settings(&settings.cache)?);
//!     let chain = FallbackChain::from_settings(&settings, cache)?;
//!
//!     let result = chain.fetch_url("https://youtu.be/dQw4w9WgXcQ").await?;
//!     println!("{} ({} chars via {})", result.video_id, result.text.len(), result.source);
//!
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod http;
pub mod llm;
pub mod orchestrator;
pub mod transcript;
pub mod youtube;

pub use error::{EpochlyError, Result};
