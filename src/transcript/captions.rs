//! Caption track metadata and caption format decoders.
//!
//! YouTube serves captions in several shapes depending on the endpoint:
//! timedtext XML (`srv1` `<text>` cues or `srv3` `<p>` cues), `json3` event
//! lists, and WebVTT files written by yt-dlp. Every decoder produces the same
//! ordered list of [`CaptionSegment`]s.

use super::{FetchError, FetchResult};
use regex::Regex;
use scraper::Html;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::OnceLock;

/// One timed caption cue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptionSegment {
    pub text: String,
    pub start: f64,
    pub duration: f64,
}

/// A caption track advertised in a player response.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptionTrack {
    pub base_url: String,
    pub language_code: String,
    /// `"asr"` for automatically generated tracks.
    #[serde(default)]
    pub kind: Option<String>,
}

impl CaptionTrack {
    pub fn is_generated(&self) -> bool {
        self.kind.as_deref() == Some("asr")
    }
}

/// Concatenate segments in order, one space between non-empty cues.
pub fn join_segments(segments: &[CaptionSegment]) -> String {
    segments
        .iter()
        .map(|s| s.text.trim())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Collapse runs of whitespace (including caption line breaks) into single spaces.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Decode HTML entities and drop inline markup such as `<font>` or `<s>`.
///
/// Timedtext payloads are frequently double-escaped (`&amp;#39;`), so entity
/// decoding runs a second time when the first pass still leaves an entity.
pub fn decode_markup(raw: &str) -> String {
    let once = fragment_text(raw);
    let text = if once.contains('&') && once.contains(';') {
        fragment_text(&once)
    } else {
        once
    };
    normalize_whitespace(&text)
}

fn fragment_text(raw: &str) -> String {
    Html::parse_fragment(raw).root_element().text().collect::<String>()
}

fn text_cue_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)<text\b([^>]*)>(.*?)</text>").expect("valid regex"))
}

fn p_cue_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)<p\b([^>]*)>(.*?)</p>").expect("valid regex"))
}

fn attr_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"([A-Za-z]+)="([^"]*)""#).expect("valid regex"))
}

fn attr(attrs: &str, name: &str) -> Option<f64> {
    attr_regex()
        .captures_iter(attrs)
        .find(|c| &c[1] == name)
        .and_then(|c| c[2].parse::<f64>().ok())
}

/// Decode a timedtext XML document (`srv1` or `srv3`).
pub fn parse_timedtext_xml(xml: &str) -> FetchResult<Vec<CaptionSegment>> {
    let trimmed = xml.trim_start();
    if !trimmed.starts_with('<') {
        return Err(FetchError::Malformed("caption payload is not XML".to_string()));
    }

    let mut segments = Vec::new();

    // srv1: <text start="1.2" dur="3.4">...</text>, times in seconds
    for caps in text_cue_regex().captures_iter(xml) {
        let text = decode_markup(&caps[2]);
        if text.is_empty() {
            continue;
        }
        segments.push(CaptionSegment {
            text,
            start: attr(&caps[1], "start").unwrap_or(0.0),
            duration: attr(&caps[1], "dur").unwrap_or(0.0),
        });
    }

    // srv3: <p t="1200" d="3400">...</p>, times in milliseconds
    if segments.is_empty() {
        for caps in p_cue_regex().captures_iter(xml) {
            let text = decode_markup(&caps[2]);
            if text.is_empty() {
                continue;
            }
            segments.push(CaptionSegment {
                text,
                start: attr(&caps[1], "t").unwrap_or(0.0) / 1000.0,
                duration: attr(&caps[1], "d").unwrap_or(0.0) / 1000.0,
            });
        }
    }

    if segments.is_empty() && !(xml.contains("<transcript") || xml.contains("<timedtext")) {
        return Err(FetchError::Malformed(
            "caption XML has no transcript root".to_string(),
        ));
    }

    Ok(segments)
}

#[derive(Debug, Deserialize)]
struct Json3 {
    #[serde(default)]
    events: Vec<Json3Event>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Json3Event {
    #[serde(default)]
    t_start_ms: f64,
    #[serde(default)]
    d_duration_ms: f64,
    #[serde(default)]
    segs: Option<Vec<Json3Seg>>,
}

#[derive(Debug, Deserialize)]
struct Json3Seg {
    #[serde(default)]
    utf8: String,
}

/// Decode a timedtext `json3` document.
pub fn parse_json3(json: &str) -> FetchResult<Vec<CaptionSegment>> {
    let doc: Json3 = serde_json::from_str(json)
        .map_err(|e| FetchError::Malformed(format!("invalid json3 captions: {}", e)))?;

    Ok(doc
        .events
        .into_iter()
        .filter_map(|event| {
            let raw: String = event.segs?.into_iter().map(|s| s.utf8).collect();
            let text = normalize_whitespace(&raw);
            if text.is_empty() {
                return None;
            }
            Some(CaptionSegment {
                text,
                start: event.t_start_ms / 1000.0,
                duration: event.d_duration_ms / 1000.0,
            })
        })
        .collect())
}

fn vtt_tag_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<[^>]*>").expect("valid regex"))
}

fn parse_vtt_timestamp(ts: &str) -> Option<f64> {
    let ts = ts.trim();
    let (clock, millis) = ts.split_once('.').unwrap_or((ts, "0"));
    let mut seconds = 0.0;
    for part in clock.split(':') {
        seconds = seconds * 60.0 + part.parse::<f64>().ok()?;
    }
    let millis: f64 = millis.parse().ok()?;
    Some(seconds + millis / 1000.0)
}

/// Decode a WebVTT subtitle file.
///
/// Automatic captions repeat the previous line at the start of each cue as
/// the text scrolls; consecutive duplicate lines are emitted once.
pub fn parse_vtt(vtt: &str) -> Vec<CaptionSegment> {
    let mut segments: Vec<CaptionSegment> = Vec::new();
    let mut last_line = String::new();
    let mut timing: Option<(f64, f64)> = None;

    for line in vtt.lines() {
        let line = line.trim();

        if line.is_empty() {
            timing = None;
            continue;
        }

        if let Some((start, end)) = line.split_once("-->") {
            let end = end.split_whitespace().next().unwrap_or("");
            timing = match (parse_vtt_timestamp(start), parse_vtt_timestamp(end)) {
                (Some(s), Some(e)) => Some((s, (e - s).max(0.0))),
                _ => None,
            };
            continue;
        }

        // Header, metadata and numeric cue identifiers sit outside cue bodies.
        let Some((start, duration)) = timing else {
            continue;
        };

        let stripped = vtt_tag_regex().replace_all(line, "");
        let text = decode_markup(&stripped);
        if text.is_empty() || text == last_line {
            continue;
        }

        last_line = text.clone();
        segments.push(CaptionSegment {
            text,
            start,
            duration,
        });
    }

    segments
}

/// Read caption tracks out of an InnerTube player response.
pub fn tracks_from_player_response(player: &Value) -> FetchResult<Vec<CaptionTrack>> {
    let tracks = player
        .get("captions")
        .and_then(|c| c.get("playerCaptionsTracklistRenderer"))
        .and_then(|r| r.get("captionTracks"))
        .and_then(Value::as_array)
        .ok_or(FetchError::NoCaptions)?;

    let tracks: Vec<CaptionTrack> = tracks
        .iter()
        .filter_map(|t| serde_json::from_value(t.clone()).ok())
        .collect();

    if tracks.is_empty() {
        return Err(FetchError::NoCaptions);
    }
    Ok(tracks)
}

/// Pick the track for the first preferred language that is available.
///
/// For each language, manually created tracks win over generated ones. When no
/// exact language code matches, a second pass matches on the primary subtag
/// (`en` matches `en-GB`).
pub fn select_track<'a>(tracks: &'a [CaptionTrack], languages: &[String]) -> Option<&'a CaptionTrack> {
    let exact = |lang: &str, generated: bool| {
        tracks
            .iter()
            .find(|t| t.language_code.eq_ignore_ascii_case(lang) && t.is_generated() == generated)
    };

    for lang in languages {
        if let Some(track) = exact(lang, false).or_else(|| exact(lang, true)) {
            return Some(track);
        }
    }

    let primary = |code: &str| code.split(['-', '_']).next().unwrap_or(code).to_ascii_lowercase();
    for lang in languages {
        let wanted = primary(lang);
        let mut candidates = tracks.iter().filter(|t| primary(&t.language_code) == wanted);
        let first = candidates.next();
        let manual = first
            .into_iter()
            .chain(candidates)
            .find(|t| !t.is_generated());
        if let Some(track) = manual.or(first) {
            return Some(track);
        }
    }

    None
}

/// Check `playabilityStatus` of a player response.
pub fn check_playability(player: &Value) -> FetchResult<()> {
    let Some(status) = player.get("playabilityStatus") else {
        return Ok(());
    };

    let code = status.get("status").and_then(Value::as_str).unwrap_or("OK");
    let reason = status
        .get("reason")
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_string();

    match code {
        "OK" => Ok(()),
        "LOGIN_REQUIRED" if reason.contains("not a bot") => Err(FetchError::Blocked(reason)),
        "LOGIN_REQUIRED" | "ERROR" | "UNPLAYABLE" | "AGE_CHECK_REQUIRED" => {
            let reason = if reason.is_empty() { code.to_string() } else { reason };
            Err(FetchError::VideoUnavailable(reason))
        }
        other => Err(FetchError::VideoUnavailable(format!("{} {}", other, reason).trim().to_string())),
    }
}
