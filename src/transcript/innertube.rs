//! Transcript retrieval through YouTube's InnerTube player API.

use super::captions::{self, CaptionSegment, CaptionTrack};
use super::{FetchError, FetchResult, TranscriptResult, TranscriptSource};
use crate::config::TranscriptSettings;
use crate::error::Result;
use crate::http::{self, ClientOptions};
use crate::youtube::VideoId;
use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

const ANDROID_CLIENT_VERSION: &str = "20.10.38";

/// Asks the player API for caption tracks, as the Android app does, then
/// downloads the best matching track.
pub struct InnertubeSource {
    client: reqwest::Client,
    base_url: String,
    languages: Vec<String>,
}

impl InnertubeSource {
    pub fn new(settings: &TranscriptSettings) -> Result<Self> {
        // The primary route always verifies certificates.
        let client = http::create_client(&ClientOptions {
            user_agent: settings.user_agent.clone(),
            timeout: settings.timeout_for("innertube"),
            accept_invalid_certs: false,
        })?;

        Ok(Self {
            client,
            base_url: settings.youtube_base_url.trim_end_matches('/').to_string(),
            languages: settings.languages.clone(),
        })
    }

    async fn player_response(&self, video_id: &VideoId) -> FetchResult<Value> {
        let url = format!("{}/youtubei/v1/player?prettyPrint=false", self.base_url);
        let body = serde_json::json!({
            "context": {
                "client": {
                    "clientName": "ANDROID",
                    "clientVersion": ANDROID_CLIENT_VERSION,
                    "hl": "en"
                }
            },
            "videoId": video_id.as_str()
        });

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| http::classify_error(&e))?;
        http::check_status(response.status())?;

        response
            .json::<Value>()
            .await
            .map_err(|e| FetchError::Malformed(format!("invalid player response: {}", e)))
    }
}

/// Download a caption track and decode its timedtext XML.
pub(crate) async fn fetch_track(
    client: &reqwest::Client,
    track: &CaptionTrack,
) -> FetchResult<Vec<CaptionSegment>> {
    if track.base_url.contains("&exp=xpe") {
        return Err(FetchError::Blocked(
            "caption track requires a proof-of-origin token".to_string(),
        ));
    }

    let url = track.base_url.replace("&fmt=srv3", "");
    let response = client
        .get(&url)
        .send()
        .await
        .map_err(|e| http::classify_error(&e))?;
    http::check_status(response.status())?;

    let body = response.text().await.map_err(|e| http::classify_error(&e))?;
    if body.trim().is_empty() {
        return Err(FetchError::NoCaptions);
    }
    captions::parse_timedtext_xml(&body)
}

/// Run the shared tail of the player-response routes: playability, track
/// selection, download.
pub(crate) async fn transcript_from_player(
    client: &reqwest::Client,
    player: &Value,
    video_id: &VideoId,
    languages: &[String],
    source: &str,
) -> FetchResult<TranscriptResult> {
    captions::check_playability(player)?;

    let tracks = captions::tracks_from_player_response(player)?;
    let track = captions::select_track(&tracks, languages).ok_or(FetchError::NoCaptions)?;
    debug!(
        "{}: selected {} track{} for {}",
        source,
        track.language_code,
        if track.is_generated() { " (generated)" } else { "" },
        video_id
    );

    let segments = fetch_track(client, track).await?;
    Ok(TranscriptResult::from_segments(
        video_id,
        source,
        Some(track.language_code.clone()),
        &segments,
    ))
}

#[async_trait]
impl TranscriptSource for InnertubeSource {
    fn name(&self) -> &'static str {
        "innertube"
    }

    async fn fetch(&self, video_id: &VideoId) -> FetchResult<TranscriptResult> {
        let player = self.player_response(video_id).await?;
        transcript_from_player(&self.client, &player, video_id, &self.languages, self.name()).await
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use axum::extract::State;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use std::net::SocketAddr;

    pub(crate) const CAPTION_XML: &str = r#"<?xml version="1.0" encoding="utf-8" ?><transcript><text start="0" dur="1.5">Hello</text><text start="1.5" dur="2">from the &amp;amp; API</text></transcript>"#;

    pub(crate) fn player_json(addr: SocketAddr, caption_path: &str) -> Value {
        serde_json::json!({
            "playabilityStatus": {"status": "OK"},
            "captions": {"playerCaptionsTracklistRenderer": {"captionTracks": [
                {"baseUrl": format!("http://{}/{}?v=x&fmt=srv3", addr, caption_path),
                 "languageCode": "en", "kind": "asr"}
            ]}}
        })
    }

    pub(crate) async fn spawn(router: Router) -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        addr
    }

    fn settings(addr: SocketAddr) -> TranscriptSettings {
        TranscriptSettings {
            youtube_base_url: format!("http://{}", addr),
            ..TranscriptSettings::default()
        }
    }

    async fn player(State(body): State<Value>) -> Json<Value> {
        Json(body)
    }

    async fn captions_ok() -> &'static str {
        CAPTION_XML
    }

    async fn mock_with_player(make: impl FnOnce(SocketAddr) -> Value) -> SocketAddr {
        // Bind first so the player response can point caption URLs at this server.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = Router::new()
            .route("/youtubei/v1/player", post(player))
            .route("/captions", get(captions_ok))
            .with_state(make(addr));
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }

    #[tokio::test]
    async fn test_fetch_selects_track_and_decodes() {
        let addr = mock_with_player(|addr| player_json(addr, "captions")).await;
        let source = InnertubeSource::new(&settings(addr)).unwrap();

        let result = source.fetch(&VideoId::new("abc123").unwrap()).await.unwrap();
        assert_eq!(result.text, "Hello from the & API");
        assert_eq!(result.source, "innertube");
        assert_eq!(result.language.as_deref(), Some("en"));
    }

    #[tokio::test]
    async fn test_unplayable_video() {
        let addr = mock_with_player(|_| {
            serde_json::json!({"playabilityStatus": {"status": "ERROR", "reason": "Video unavailable"}})
        })
        .await;
        let source = InnertubeSource::new(&settings(addr)).unwrap();

        let err = source.fetch(&VideoId::new("abc123").unwrap()).await.unwrap_err();
        assert!(matches!(err, FetchError::VideoUnavailable(_)));
    }

    #[tokio::test]
    async fn test_no_caption_tracks() {
        let addr = mock_with_player(|_| serde_json::json!({"playabilityStatus": {"status": "OK"}})).await;
        let source = InnertubeSource::new(&settings(addr)).unwrap();

        let err = source.fetch(&VideoId::new("abc123").unwrap()).await.unwrap_err();
        assert_eq!(err, FetchError::NoCaptions);
    }

    #[tokio::test]
    async fn test_rate_limited_player() {
        let app = Router::new().route(
            "/youtubei/v1/player",
            post(|| async { StatusCode::TOO_MANY_REQUESTS.into_response() }),
        );
        let addr = spawn(app).await;
        let source = InnertubeSource::new(&settings(addr)).unwrap();

        let err = source.fetch(&VideoId::new("abc123").unwrap()).await.unwrap_err();
        assert_eq!(err, FetchError::RateLimited);
    }

    #[tokio::test]
    async fn test_po_token_track_is_blocked() {
        let client = reqwest::Client::new();
        let track = CaptionTrack {
            base_url: "http://127.0.0.1:9/api/timedtext?v=x&exp=xpe".to_string(),
            language_code: "en".to_string(),
            kind: None,
        };
        assert!(matches!(
            fetch_track(&client, &track).await,
            Err(FetchError::Blocked(_))
        ));
    }
}
