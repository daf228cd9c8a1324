//! Error types for Epochly.

use crate::transcript::StrategyFailure;
use std::time::Duration;
use thiserror::Error;

/// Library-level error type for Epochly operations.
#[derive(Error, Debug)]
pub enum EpochlyError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unsupported API provider: {0}. Currently only Groq is supported.")]
    UnsupportedProvider(String),

    #[error("API Key and Provider are required")]
    MissingCredentials,

    #[error("Transcript unavailable: {}", format_failures(.0))]
    TranscriptUnavailable(Vec<StrategyFailure>),

    #[error("{0} timed out after {1:?}")]
    Timeout(String, Duration),

    #[error("Provider rejected the API key: {0}")]
    Auth(String),

    #[error("Provider rate limit exceeded: {0}")]
    RateLimited(String),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Malformed LLM output: {0}")]
    MalformedLlmOutput(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl EpochlyError {
    /// Stable machine-readable name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            EpochlyError::InvalidInput(_) => "InvalidInput",
            EpochlyError::UnsupportedProvider(_) => "UnsupportedProvider",
            EpochlyError::MissingCredentials => "MissingCredentials",
            EpochlyError::TranscriptUnavailable(_) => "TranscriptUnavailable",
            EpochlyError::Timeout(..) => "Timeout",
            EpochlyError::Auth(_) => "AuthError",
            EpochlyError::RateLimited(_) => "RateLimited",
            EpochlyError::Provider(_) => "ProviderError",
            EpochlyError::MalformedLlmOutput(_) => "MalformedLLMOutput",
            EpochlyError::Config(_) => "ConfigError",
            EpochlyError::Io(_)
            | EpochlyError::Json(_)
            | EpochlyError::TomlParse(_)
            | EpochlyError::Http(_) => "InternalError",
        }
    }
}

fn format_failures(failures: &[StrategyFailure]) -> String {
    if failures.is_empty() {
        return "no strategies were attempted".to_string();
    }
    failures
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Result type alias for Epochly operations.
pub type Result<T> = std::result::Result<T, EpochlyError>;
