//! Groq chat completions (OpenAI-compatible wire format).

use super::{ChatProvider, ChatRequest};
use crate::config::GroqSettings;
use crate::error::{EpochlyError, Result};
use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequest,
    CreateChatCompletionRequestArgs,
};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, instrument};

pub struct GroqProvider {
    client: reqwest::Client,
    base_url: String,
    model: String,
    timeout: Duration,
}

/// The slice of a completion response that is read. Groq adds fields
/// (`x_groq`, its own `service_tier` values) that are ignored here.
#[derive(Debug, Deserialize)]
struct CompletionBody {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

impl GroqProvider {
    pub fn new(settings: &GroqSettings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| EpochlyError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            model: settings.model.clone(),
            timeout: Duration::from_secs(settings.timeout_secs),
        })
    }

    fn build_request(&self, request: &ChatRequest) -> Result<CreateChatCompletionRequest> {
        let messages: Vec<ChatCompletionRequestMessage> = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(request.system.clone())
                .build()
                .map_err(|e| EpochlyError::Provider(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(request.user.clone())
                .build()
                .map_err(|e| EpochlyError::Provider(e.to_string()))?
                .into(),
        ];

        CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .temperature(request.sampling.temperature)
            .max_completion_tokens(request.sampling.max_tokens)
            .build()
            .map_err(|e| EpochlyError::Provider(e.to_string()))
    }

    async fn send(&self, api_key: &str, body: &CreateChatCompletionRequest) -> Result<String> {
        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| EpochlyError::Provider(format!("request to Groq failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&text)
                .map(|b| b.error.message)
                .unwrap_or_else(|_| {
                    if text.trim().is_empty() {
                        status.canonical_reason().unwrap_or("Unknown error").to_string()
                    } else {
                        text
                    }
                });
            return Err(match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => EpochlyError::Auth(message),
                StatusCode::TOO_MANY_REQUESTS => EpochlyError::RateLimited(message),
                _ => EpochlyError::Provider(format!("Groq API error {}: {}", status.as_u16(), message)),
            });
        }

        let completion: CompletionBody = response.json().await.map_err(|e| {
            EpochlyError::MalformedLlmOutput(format!("unreadable completion response: {}", e))
        })?;

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| EpochlyError::MalformedLlmOutput("completion has no content".to_string()))
    }
}

#[async_trait]
impl ChatProvider for GroqProvider {
    fn name(&self) -> &'static str {
        "groq"
    }

    #[instrument(skip_all, fields(model = %self.model))]
    async fn complete(&self, api_key: &str, request: &ChatRequest) -> Result<String> {
        let body = self.build_request(request)?;
        debug!("Sending chat completion to Groq");

        tokio::time::timeout(self.timeout, self.send(api_key, &body))
            .await
            .map_err(|_| EpochlyError::Timeout("Groq completion".to_string(), self.timeout))?
    }
}
