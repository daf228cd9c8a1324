//! YouTube video identifiers.

use crate::error::{EpochlyError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use url::Url;

/// A validated YouTube video identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VideoId(String);

fn id_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("valid video id regex"))
}

fn bare_id_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9_-]{11}$").expect("valid bare id regex"))
}

impl VideoId {
    /// Wrap an id that is already known to be well-formed.
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        if id_regex().is_match(&id) {
            Ok(Self(id))
        } else {
            Err(EpochlyError::InvalidInput(format!("Invalid YouTube video ID: {}", id)))
        }
    }

    /// Extract the video id from a YouTube URL or a bare 11-character id.
    ///
    /// Handles `watch?v=ID`, `youtu.be/ID`, `embed/ID`, `shorts/ID` and `v/ID`,
    /// with or without scheme, `www.` or `m.` prefixes.
    pub fn from_url(input: &str) -> Result<Self> {
        let input = input.trim();

        if bare_id_regex().is_match(input) {
            return Ok(Self(input.to_string()));
        }

        let with_scheme = if input.starts_with("http://") || input.starts_with("https://") {
            input.to_string()
        } else {
            format!("https://{}", input)
        };

        let invalid = || {
            EpochlyError::InvalidInput(
                "Invalid YouTube URL. Please provide a valid YouTube video URL.".to_string(),
            )
        };

        let url = Url::parse(&with_scheme).map_err(|_| invalid())?;
        let candidate = extract_from_url(&url).ok_or_else(invalid)?;

        if id_regex().is_match(&candidate) {
            Ok(Self(candidate))
        } else {
            Err(invalid())
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Watch page URL for this video on `base` (e.g. `https://www.youtube.com`).
    pub fn watch_url(&self, base: &str) -> String {
        format!("{}/watch?v={}", base.trim_end_matches('/'), self.0)
    }
}

impl std::fmt::Display for VideoId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for VideoId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

fn is_youtube_host(host: &str) -> bool {
    let host = host.to_ascii_lowercase();
    host == "youtube.com"
        || host == "youtu.be"
        || host.ends_with(".youtube.com")
        || host == "youtube-nocookie.com"
        || host.ends_with(".youtube-nocookie.com")
}

fn extract_from_url(url: &Url) -> Option<String> {
    let host = url.host_str()?;
    if !is_youtube_host(host) {
        return None;
    }

    let mut segments = url.path_segments()?.filter(|s| !s.is_empty());

    if host.eq_ignore_ascii_case("youtu.be") {
        return segments.next().map(str::to_string);
    }

    match segments.next()? {
        "watch" => url
            .query_pairs()
            .find(|(k, _)| k == "v")
            .map(|(_, v)| v.trim().to_string())
            .filter(|v| !v.is_empty()),
        "embed" | "shorts" | "v" | "live" => segments.next().map(str::to_string),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supported_shapes_yield_same_id() {
        let shapes = [
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
            "https://youtu.be/dQw4w9WgXcQ",
            "https://www.youtube.com/embed/dQw4w9WgXcQ",
            "https://www.youtube.com/shorts/dQw4w9WgXcQ",
            "https://m.youtube.com/watch?v=dQw4w9WgXcQ&t=42s",
            "youtube.com/watch?feature=share&v=dQw4w9WgXcQ",
            "https://youtu.be/dQw4w9WgXcQ?si=abcdef",
            "dQw4w9WgXcQ",
        ];

        for shape in shapes {
            assert_eq!(
                VideoId::from_url(shape).unwrap().as_str(),
                "dQw4w9WgXcQ",
                "shape: {}",
                shape
            );
        }
    }

    #[test]
    fn test_short_ids_in_urls() {
        for shape in [
            "https://www.youtube.com/watch?v=abc123",
            "https://youtu.be/abc123",
            "https://www.youtube.com/embed/abc123",
        ] {
            assert_eq!(VideoId::from_url(shape).unwrap().as_str(), "abc123");
        }
    }

    #[test]
    fn test_invalid_inputs() {
        assert!(VideoId::from_url("").is_err());
        assert!(VideoId::from_url("not a url").is_err());
        assert!(VideoId::from_url("https://example.com/watch?v=dQw4w9WgXcQ").is_err());
        assert!(VideoId::from_url("https://www.youtube.com/channel/UCxyz").is_err());
        assert!(VideoId::from_url("https://www.youtube.com/watch?v=").is_err());
        assert!(VideoId::from_url("https://www.youtube.com/watch?v=bad%20id").is_err());
    }

    #[test]
    fn test_watch_url() {
        let id = VideoId::new("dQw4w9WgXcQ").unwrap();
        assert_eq!(
            id.watch_url("https://www.youtube.com/"),
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ"
        );
        assert!(VideoId::new("no spaces").is_err());
    }
}
