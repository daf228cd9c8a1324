//! Static table of known transcripts.

use super::{FetchError, FetchResult, TranscriptResult, TranscriptSource};
use crate::config::{CacheSettings, Settings};
use crate::error::{EpochlyError, Result};
use crate::youtube::VideoId;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct CacheFile {
    #[serde(default)]
    transcripts: HashMap<String, String>,
}

/// Read-only lookup of cached transcripts keyed by video id.
///
/// Populated once at start-up from the `[cache]` config section and an
/// optional TOML file; it is never written at runtime.
#[derive(Debug, Clone, Default)]
pub struct TranscriptCache {
    entries: HashMap<String, String>,
}

impl TranscriptCache {
    pub fn from_entries(entries: HashMap<String, String>) -> Self {
        Self { entries }
    }

    /// Build the cache from inline entries plus the configured file.
    ///
    /// Inline entries win over file entries for the same id.
    pub fn from_settings(settings: &CacheSettings) -> Result<Self> {
        let mut entries = HashMap::new();

        if let Some(path) = settings.path.as_deref().map(Settings::expand_path) {
            let content = std::fs::read_to_string(&path).map_err(|e| {
                EpochlyError::Config(format!(
                    "Failed to read transcript cache {}: {}",
                    path.display(),
                    e
                ))
            })?;
            let file: CacheFile = toml::from_str(&content)?;
            debug!("Loaded {} cached transcripts from {}", file.transcripts.len(), path.display());
            entries.extend(file.transcripts);
        }

        entries.extend(
            settings
                .entries
                .iter()
                .map(|(id, text)| (id.clone(), text.clone())),
        );

        Ok(Self { entries })
    }

    pub fn get(&self, video_id: &VideoId) -> Option<&str> {
        self.entries.get(video_id.as_str()).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl TranscriptSource for TranscriptCache {
    fn name(&self) -> &'static str {
        "cache"
    }

    async fn fetch(&self, video_id: &VideoId) -> FetchResult<TranscriptResult> {
        self.get(video_id)
            .map(|text| TranscriptResult::from_text(video_id, self.name(), None, text))
            .ok_or(FetchError::NotCached)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_hit_and_miss() {
        let cache = TranscriptCache::from_entries(HashMap::from([(
            "abc123".to_string(),
            "Hello world transcript".to_string(),
        )]));

        let hit = cache.fetch(&VideoId::new("abc123").unwrap()).await.unwrap();
        assert_eq!(hit.text, "Hello world transcript");
        assert_eq!(hit.source, "cache");

        let miss = cache.fetch(&VideoId::new("zzz999").unwrap()).await;
        assert_eq!(miss.unwrap_err(), FetchError::NotCached);
    }

    #[test]
    fn test_from_settings_merges_file_and_inline() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.toml");
        std::fs::write(
            &path,
            "[transcripts]\nabc123 = \"from file\"\ndef456 = \"only in file\"\n",
        )
        .unwrap();

        let settings = CacheSettings {
            path: Some(path.to_string_lossy().to_string()),
            entries: HashMap::from([("abc123".to_string(), "inline".to_string())]),
        };

        let cache = TranscriptCache::from_settings(&settings).unwrap();
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(&VideoId::new("abc123").unwrap()), Some("inline"));
        assert_eq!(cache.get(&VideoId::new("def456").unwrap()), Some("only in file"));
    }

    #[test]
    fn test_missing_cache_file_is_config_error() {
        let settings = CacheSettings {
            path: Some("/no/such/cache.toml".to_string()),
            entries: HashMap::new(),
        };
        assert!(matches!(
            TranscriptCache::from_settings(&settings),
            Err(EpochlyError::Config(_))
        ));
    }
}
