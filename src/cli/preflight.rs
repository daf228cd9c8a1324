//! Pre-flight checks before LLM-backed commands.
//!
//! Validates that required configuration is available before fetching a
//! transcript that would otherwise be thrown away when the LLM call fails.
//! Plain transcript fetches need nothing and skip these checks.

use crate::error::{EpochlyError, Result};

/// Requirements for different operations.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// Summaries need an API key.
    Summarize,
    /// Quizzes need an API key.
    Quiz,
}

/// Run pre-flight checks for the given operation.
pub fn check(operation: Operation, api_key: Option<&str>) -> Result<()> {
    match operation {
        Operation::Summarize | Operation::Quiz => check_api_key(api_key),
    }
}

fn check_api_key(api_key: Option<&str>) -> Result<()> {
    match api_key {
        Some(key) if !key.trim().is_empty() => Ok(()),
        Some(_) => Err(EpochlyError::Config(
            "API key is empty. Set it with: export GROQ_API_KEY='gsk_...'".to_string(),
        )),
        None => Err(EpochlyError::Config(
            "No API key. Pass --api-key or set GROQ_API_KEY".to_string(),
        )),
    }
}
