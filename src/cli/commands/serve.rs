//! HTTP API server.
//!
//! Provides the transcript and quiz endpoints consumed by the Epochly frontend.

use crate::cli::Output;
use crate::config::{LlmSettings, Prompts, Settings};
use crate::error::EpochlyError;
use crate::llm::{Credentials, LlmClient, ProviderRegistry, QuizQuestion};
use crate::orchestrator::FallbackChain;
use crate::transcript::{StrategyFailure, TranscriptCache, TranscriptRequest};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, error, info, warn};

const API_KEY_HEADER: &str = "x-api-key";
const API_PROVIDER_HEADER: &str = "x-api-provider";

/// Shared application state, read-only after start-up.
pub struct AppState {
    chain: FallbackChain,
    registry: ProviderRegistry,
    prompts: Arc<Prompts>,
    llm: LlmSettings,
}

impl AppState {
    pub fn new(chain: FallbackChain, registry: ProviderRegistry, prompts: Arc<Prompts>, llm: LlmSettings) -> Self {
        Self {
            chain,
            registry,
            prompts,
            llm,
        }
    }

    pub fn from_settings(settings: &Settings) -> crate::error::Result<Self> {
        let cache = Arc::new(TranscriptCache::from_settings(&settings.cache)?);
        info!("Transcript cache holds {} entries", cache.len());

        let prompts = Prompts::load(
            settings.prompts.custom_dir.as_deref(),
            Some(&settings.prompts.variables),
        )?;

        Ok(Self::new(
            FallbackChain::from_settings(settings, cache)?,
            ProviderRegistry::from_settings(&settings.llm)?,
            Arc::new(prompts),
            settings.llm.clone(),
        ))
    }

    /// Resolve the caller's credentials into an LLM client.
    ///
    /// Runs before any transcript work so a bad provider costs no fetches.
    fn llm_client(&self, headers: &HeaderMap) -> crate::error::Result<LlmClient> {
        let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());
        let credentials = Credentials::new(header(API_KEY_HEADER), header(API_PROVIDER_HEADER))?;
        debug!("API key provided for provider {}", credentials.provider);

        LlmClient::for_credentials(
            &self.registry,
            &credentials,
            self.prompts.clone(),
            self.llm.clone(),
        )
    }
}

/// Build the API router.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/api/transcript", post(transcript))
        .route("/api/youtube/generate-quiz", post(generate_quiz))
        .layer(cors)
        .with_state(state)
}

/// Run the HTTP API server until Ctrl+C.
pub async fn run_serve(host: Option<String>, port: Option<u16>, settings: Settings) -> anyhow::Result<()> {
    let host = host.unwrap_or_else(|| settings.server.host.clone());
    let port = port.unwrap_or(settings.server.port);

    let state = Arc::new(AppState::from_settings(&settings)?);
    let strategies = state.chain.strategy_names().join(" -> ");
    let app = router(state);

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    Output::header("Epochly API Server");
    println!();
    Output::success(&format!("Listening on http://{}", addr));
    println!();
    println!("Endpoints:");
    Output::kv("Welcome", "GET  /");
    Output::kv("Health", "GET  /health");
    Output::kv("Transcript", "POST /api/transcript");
    Output::kv("Quiz", "POST /api/youtube/generate-quiz");
    println!();
    Output::kv("Strategies", &strategies);
    println!();
    Output::info("Press Ctrl+C to stop the server.");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
}

// === Request/Response Types ===

#[derive(Deserialize)]
struct TranscriptBody {
    url: Option<String>,
    #[serde(default)]
    instructions: Option<String>,
}

#[derive(Serialize)]
struct TranscriptResponse {
    success: bool,
    transcript: String,
    summary: Option<String>,
    video_id: String,
    source: String,
}

#[derive(Deserialize)]
struct QuizBody {
    transcript: Option<String>,
    #[serde(rename = "numQuestions", default)]
    num_questions: Option<usize>,
}

#[derive(Serialize)]
struct QuizResponse {
    questions: Vec<QuizQuestion>,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: &'static str,
    detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    reasons: Option<Vec<StrategyFailure>>,
}

/// An [`EpochlyError`] rendered as a JSON error response.
pub struct ApiError(EpochlyError);

impl From<EpochlyError> for ApiError {
    fn from(e: EpochlyError) -> Self {
        Self(e)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(EpochlyError::InvalidInput(rejection.body_text()))
    }
}

/// HTTP status for each error kind.
pub fn status_for(err: &EpochlyError) -> StatusCode {
    match err {
        EpochlyError::InvalidInput(_) | EpochlyError::UnsupportedProvider(_) => StatusCode::BAD_REQUEST,
        EpochlyError::MissingCredentials | EpochlyError::Auth(_) => StatusCode::UNAUTHORIZED,
        EpochlyError::TranscriptUnavailable(_) => StatusCode::NOT_FOUND,
        EpochlyError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
        EpochlyError::Provider(_) | EpochlyError::MalformedLlmOutput(_) => StatusCode::BAD_GATEWAY,
        EpochlyError::Timeout(..) => StatusCode::GATEWAY_TIMEOUT,
        EpochlyError::Config(_)
        | EpochlyError::Io(_)
        | EpochlyError::Json(_)
        | EpochlyError::TomlParse(_)
        | EpochlyError::Http(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        if status.is_server_error() {
            error!("Request failed: {}", self.0);
        } else {
            warn!("Request rejected: {}", self.0);
        }

        let reasons = match &self.0 {
            EpochlyError::TranscriptUnavailable(failures) => Some(failures.clone()),
            _ => None,
        };
        let body = ErrorResponse {
            error: self.0.kind(),
            detail: self.0.to_string(),
            reasons,
        };
        (status, Json(body)).into_response()
    }
}

// === Handlers ===

async fn root() -> impl IntoResponse {
    Json(serde_json::json!({ "message": "Welcome to Epochly Backend API" }))
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn transcript(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Result<Json<TranscriptBody>, JsonRejection>,
) -> Result<Json<TranscriptResponse>, ApiError> {
    let llm = state.llm_client(&headers)?;
    let Json(body) = body?;

    let url = body
        .url
        .filter(|u| !u.trim().is_empty())
        .ok_or_else(|| EpochlyError::InvalidInput("URL is required".to_string()))?;
    let request = TranscriptRequest::from_url(&url, body.instructions)?;

    let result = state.chain.fetch(&request.video_id).await?;

    let summary = match request.instructions.as_deref() {
        Some(instructions) => Some(llm.summarize(&result.text, Some(instructions)).await?.text),
        None => None,
    };

    Ok(Json(TranscriptResponse {
        success: result.success,
        transcript: result.text,
        summary,
        video_id: result.video_id.to_string(),
        source: result.source,
    }))
}

async fn generate_quiz(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Result<Json<QuizBody>, JsonRejection>,
) -> Result<Json<QuizResponse>, ApiError> {
    let llm = state.llm_client(&headers)?;
    let Json(body) = body?;

    let transcript = body
        .transcript
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| EpochlyError::InvalidInput("Transcript is required".to_string()))?;

    let questions = llm.generate_quiz(&transcript, body.num_questions).await?;
    Ok(Json(QuizResponse { questions }))
}
