//! Configuration settings for Epochly.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub server: ServerSettings,
    pub transcript: TranscriptSettings,
    pub cache: CacheSettings,
    pub llm: LlmSettings,
    pub prompts: PromptSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

/// Transcript acquisition settings shared by all fallback strategies.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptSettings {
    /// Preferred caption languages, most preferred first.
    pub languages: Vec<String>,
    /// Upper bound for a single strategy attempt, in seconds.
    pub strategy_timeout_secs: u64,
    /// Per-strategy overrides of `strategy_timeout_secs`, keyed by strategy name.
    pub timeouts: HashMap<String, u64>,
    /// Strategies to skip entirely (e.g. "ytdlp" on hosts without yt-dlp).
    pub disabled: Vec<String>,
    /// Skip TLS certificate verification in the alternate fetchers.
    ///
    /// Degraded trust: only meant for hosts behind intercepting proxies.
    pub accept_invalid_certs: bool,
    /// Base URL for youtube.com requests.
    pub youtube_base_url: String,
    /// User agent sent with page and caption requests.
    pub user_agent: String,
    /// Path or name of the yt-dlp executable.
    pub ytdlp_path: String,
}

impl Default for TranscriptSettings {
    fn default() -> Self {
        Self {
            languages: vec!["en".to_string(), "en-US".to_string(), "en-GB".to_string()],
            strategy_timeout_secs: 15,
            timeouts: HashMap::from([("ytdlp".to_string(), 45)]),
            disabled: Vec::new(),
            accept_invalid_certs: false,
            youtube_base_url: "https://www.youtube.com".to_string(),
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36".to_string(),
            ytdlp_path: "yt-dlp".to_string(),
        }
    }
}

impl TranscriptSettings {
    /// Time bound for the named strategy.
    pub fn timeout_for(&self, strategy: &str) -> Duration {
        let secs = self
            .timeouts
            .get(strategy)
            .copied()
            .unwrap_or(self.strategy_timeout_secs);
        Duration::from_secs(secs)
    }

    pub fn is_disabled(&self, strategy: &str) -> bool {
        self.disabled.iter().any(|s| s.eq_ignore_ascii_case(strategy))
    }
}

/// Static transcript cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct CacheSettings {
    /// Optional TOML file with a `[transcripts]` table of video id to text.
    pub path: Option<String>,
    /// Inline video id to transcript entries.
    pub entries: HashMap<String, String>,
}

/// LLM provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    /// Largest quiz a caller may request.
    pub max_questions: usize,
    /// Quiz size when the caller does not specify one.
    pub default_questions: usize,
    pub summary: SamplingSettings,
    pub quiz: SamplingSettings,
    pub groq: GroqSettings,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            max_questions: 20,
            default_questions: 5,
            summary: SamplingSettings {
                temperature: 0.3,
                max_tokens: 1500,
            },
            quiz: SamplingSettings {
                temperature: 0.5,
                max_tokens: 2500,
            },
            groq: GroqSettings::default(),
        }
    }
}

/// Sampling parameters for one kind of completion.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SamplingSettings {
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Groq (OpenAI-compatible) provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GroqSettings {
    pub base_url: String,
    pub model: String,
    /// Upper bound for one completion request, in seconds.
    pub timeout_secs: u64,
}

impl Default for GroqSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.groq.com/openai/v1".to_string(),
            model: "llama3-70b-8192".to_string(),
            timeout_secs: 60,
        }
    }
}

/// Prompt customization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct PromptSettings {
    /// Directory for custom prompts (overrides defaults).
    pub custom_dir: Option<String>,
    /// Custom variables available in all prompts as {{variable_name}}.
    pub variables: HashMap<String, String>,
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        let mut settings: Settings = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content)?
        } else if path.is_some() {
            return Err(crate::error::EpochlyError::Config(format!(
                "Config file not found: {}",
                config_path.display()
            )));
        } else {
            Settings::default()
        };

        settings.apply_env_overrides();
        Ok(settings)
    }

    /// Apply environment overrides supported for deployment compatibility.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(model) = std::env::var("DEFAULT_GROQ_MODEL") {
            if !model.trim().is_empty() {
                self.llm.groq.model = model.trim().to_string();
            }
        }
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::EpochlyError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("epochly")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.server.port, 8000);
        assert_eq!(settings.llm.groq.model, "llama3-70b-8192");
        assert!(!settings.transcript.accept_invalid_certs);
        assert_eq!(settings.transcript.languages[0], "en");
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let settings: Settings = toml::from_str(
            r#"
            [transcript]
            strategy_timeout_secs = 5
            disabled = ["ytdlp"]

            [cache.entries]
            abc123 = "Hello world transcript"
            "#,
        )
        .unwrap();

        assert_eq!(settings.transcript.strategy_timeout_secs, 5);
        assert!(settings.transcript.is_disabled("YTDLP"));
        assert_eq!(settings.server.host, "0.0.0.0");
        assert_eq!(
            settings.cache.entries.get("abc123").map(String::as_str),
            Some("Hello world transcript")
        );
    }

    #[test]
    fn test_timeout_overrides() {
        let mut transcript = TranscriptSettings::default();
        transcript.strategy_timeout_secs = 7;
        transcript.timeouts.insert("scrape".to_string(), 3);

        assert_eq!(transcript.timeout_for("scrape"), Duration::from_secs(3));
        assert_eq!(transcript.timeout_for("innertube"), Duration::from_secs(7));
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut settings = Settings::default();
        settings.server.port = 9100;
        settings.save_to(&path).unwrap();

        let loaded = Settings::load_from(Some(&path)).unwrap();
        assert_eq!(loaded.server.port, 9100);
    }

    #[test]
    fn test_missing_explicit_path_is_error() {
        let path = PathBuf::from("/definitely/not/here/config.toml");
        assert!(Settings::load_from(Some(&path)).is_err());
    }
}
