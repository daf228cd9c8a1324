//! Configuration module for Epochly.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{Prompts, QuizPrompts, SummaryPrompts};
pub use settings::{
    CacheSettings, GeneralSettings, GroqSettings, LlmSettings, PromptSettings, SamplingSettings,
    ServerSettings, Settings, TranscriptSettings,
};
