//! LLM-backed summaries and quizzes.
//!
//! Providers implement [`ChatProvider`] and are looked up by name in a
//! [`ProviderRegistry`]. Callers bring their own API key on every request;
//! keys live only as long as the [`LlmClient`] built for that request.

mod groq;
mod quiz;

pub use groq::GroqProvider;
pub use quiz::{parse_quiz, QuizQuestion, OPTIONS_PER_QUESTION};

use crate::config::{LlmSettings, Prompts, SamplingSettings};
use crate::error::{EpochlyError, Result};
use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument};

/// A single system + user chat turn.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub system: String,
    pub user: String,
    pub sampling: SamplingSettings,
}

/// A chat completion backend.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    fn name(&self) -> &'static str;

    /// Return the completion text for one chat turn.
    async fn complete(&self, api_key: &str, request: &ChatRequest) -> Result<String>;
}

/// Providers available to callers, keyed by lowercase name.
#[derive(Default, Clone)]
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn ChatProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every provider Epochly ships (currently Groq).
    pub fn from_settings(settings: &LlmSettings) -> Result<Self> {
        let mut registry = Self::new();
        registry.register(Arc::new(GroqProvider::new(&settings.groq)?));
        Ok(registry)
    }

    pub fn register(&mut self, provider: Arc<dyn ChatProvider>) {
        self.providers.insert(provider.name().to_ascii_lowercase(), provider);
    }

    /// Look up a provider by name, ignoring case and surrounding whitespace.
    pub fn get(&self, name: &str) -> Result<Arc<dyn ChatProvider>> {
        self.providers
            .get(&name.trim().to_ascii_lowercase())
            .cloned()
            .ok_or_else(|| EpochlyError::UnsupportedProvider(name.trim().to_string()))
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.providers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

/// Caller-supplied provider name and API key.
#[derive(Clone)]
pub struct Credentials {
    pub api_key: String,
    pub provider: String,
}

impl Credentials {
    /// Both values must be present and non-blank.
    pub fn new(api_key: Option<&str>, provider: Option<&str>) -> Result<Self> {
        let api_key = api_key.map(str::trim).filter(|k| !k.is_empty());
        let provider = provider.map(str::trim).filter(|p| !p.is_empty());
        match (api_key, provider) {
            (Some(api_key), Some(provider)) => Ok(Self {
                api_key: api_key.to_string(),
                provider: provider.to_string(),
            }),
            _ => Err(EpochlyError::MissingCredentials),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &"<redacted>")
            .field("provider", &self.provider)
            .finish()
    }
}

/// A generated summary together with the instructions that produced it.
#[derive(Debug, Clone, Serialize)]
pub struct SummaryResult {
    pub text: String,
    pub instructions: String,
}

/// Check a requested quiz size against the configured bounds.
pub fn question_count(requested: Option<usize>, settings: &LlmSettings) -> Result<usize> {
    let n = requested.unwrap_or(settings.default_questions);
    if n == 0 || n > settings.max_questions {
        return Err(EpochlyError::InvalidInput(format!(
            "numQuestions must be between 1 and {}, got {}",
            settings.max_questions, n
        )));
    }
    Ok(n)
}

/// Prompt rendering plus one provider and key.
pub struct LlmClient {
    provider: Arc<dyn ChatProvider>,
    api_key: String,
    prompts: Arc<Prompts>,
    settings: LlmSettings,
}

impl LlmClient {
    pub fn new(
        provider: Arc<dyn ChatProvider>,
        api_key: impl Into<String>,
        prompts: Arc<Prompts>,
        settings: LlmSettings,
    ) -> Self {
        Self {
            provider,
            api_key: api_key.into(),
            prompts,
            settings,
        }
    }

    /// Resolve the caller's provider and build a client for it.
    pub fn for_credentials(
        registry: &ProviderRegistry,
        credentials: &Credentials,
        prompts: Arc<Prompts>,
        settings: LlmSettings,
    ) -> Result<Self> {
        let provider = registry.get(&credentials.provider)?;
        Ok(Self::new(provider, credentials.api_key.clone(), prompts, settings))
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    /// Summarize a transcript, using the configured default instructions
    /// when none (or only whitespace) are given.
    #[instrument(skip_all, fields(provider = self.provider.name(), chars = transcript.len()))]
    pub async fn summarize(&self, transcript: &str, instructions: Option<&str>) -> Result<SummaryResult> {
        let instructions = instructions
            .map(str::trim)
            .filter(|i| !i.is_empty())
            .unwrap_or(self.prompts.summary.default_instructions.as_str())
            .to_string();

        let mut vars = HashMap::new();
        vars.insert("instructions".to_string(), instructions.clone());
        vars.insert("transcript".to_string(), transcript.to_string());

        let request = ChatRequest {
            system: self.prompts.summary.system.clone(),
            user: self.prompts.render_with_custom(&self.prompts.summary.user, &vars),
            sampling: self.settings.summary,
        };

        let text = self.provider.complete(&self.api_key, &request).await?;
        let text = text.trim();
        if text.is_empty() {
            return Err(EpochlyError::MalformedLlmOutput("empty summary".to_string()));
        }

        info!("Generated summary ({} chars)", text.len());
        Ok(SummaryResult {
            text: text.to_string(),
            instructions,
        })
    }

    /// Generate `num_questions` validated multiple-choice questions.
    #[instrument(skip_all, fields(provider = self.provider.name(), num_questions = ?num_questions))]
    pub async fn generate_quiz(&self, transcript: &str, num_questions: Option<usize>) -> Result<Vec<QuizQuestion>> {
        let n = question_count(num_questions, &self.settings)?;
        if transcript.trim().is_empty() {
            return Err(EpochlyError::InvalidInput("Transcript is required".to_string()));
        }

        let mut vars = HashMap::new();
        vars.insert("num_questions".to_string(), n.to_string());
        vars.insert("transcript".to_string(), transcript.to_string());

        let request = ChatRequest {
            system: self.prompts.quiz.system.clone(),
            user: self.prompts.render_with_custom(&self.prompts.quiz.user, &vars),
            sampling: self.settings.quiz,
        };

        let response = self.provider.complete(&self.api_key, &request).await?;
        let questions = parse_quiz(&response, n)?;

        info!("Generated {} quiz questions", questions.len());
        Ok(questions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Provider returning a canned completion and recording requests.
    struct CannedProvider {
        reply: String,
        requests: Mutex<Vec<ChatRequest>>,
    }

    impl CannedProvider {
        fn new(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: reply.to_string(),
                requests: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl ChatProvider for CannedProvider {
        fn name(&self) -> &'static str {
            "canned"
        }

        async fn complete(&self, _api_key: &str, request: &ChatRequest) -> Result<String> {
            self.requests.lock().unwrap().push(request.clone());
            Ok(self.reply.clone())
        }
    }

    fn client(provider: Arc<CannedProvider>) -> LlmClient {
        LlmClient::new(provider, "key", Arc::new(Prompts::default()), LlmSettings::default())
    }

    fn quiz_reply(n: usize) -> String {
        let questions: Vec<serde_json::Value> = (0..n)
            .map(|i| {
                serde_json::json!({
                    "question": format!("Question {}?", i + 1),
                    "options": ["alpha", "beta", "gamma", "delta"],
                    "correctAnswer": "gamma",
                    "explanation": "It is gamma."
                })
            })
            .collect();
        format!("```json\n{}\n```", serde_json::to_string_pretty(&questions).unwrap())
    }

    #[test]
    fn test_registry_lookup_is_case_insensitive() {
        let registry = ProviderRegistry::from_settings(&LlmSettings::default()).unwrap();
        assert_eq!(registry.get("Groq").unwrap().name(), "groq");
        assert_eq!(registry.get(" GROQ ").unwrap().name(), "groq");
        assert!(matches!(
            registry.get("openai"),
            Err(EpochlyError::UnsupportedProvider(p)) if p == "openai"
        ));
        assert_eq!(registry.names(), vec!["groq"]);
    }

    #[test]
    fn test_credentials_require_both_values() {
        assert!(Credentials::new(Some("k"), Some("groq")).is_ok());
        assert!(matches!(
            Credentials::new(None, Some("groq")),
            Err(EpochlyError::MissingCredentials)
        ));
        assert!(matches!(
            Credentials::new(Some("k"), Some("  ")),
            Err(EpochlyError::MissingCredentials)
        ));

        let creds = Credentials::new(Some("secret-key"), Some("groq")).unwrap();
        assert!(!format!("{:?}", creds).contains("secret-key"));
    }

    #[test]
    fn test_question_count_bounds() {
        let settings = LlmSettings::default();
        assert_eq!(question_count(None, &settings).unwrap(), 5);
        assert_eq!(question_count(Some(3), &settings).unwrap(), 3);
        assert!(matches!(question_count(Some(0), &settings), Err(EpochlyError::InvalidInput(_))));
        assert!(question_count(Some(settings.max_questions + 1), &settings).is_err());
    }

    #[tokio::test]
    async fn test_summarize_uses_default_instructions() {
        let provider = CannedProvider::new("  The summary.  ");
        let llm = client(provider.clone());

        let summary = llm.summarize("the transcript", Some("   ")).await.unwrap();
        assert_eq!(summary.text, "The summary.");
        assert_eq!(summary.instructions, Prompts::default().summary.default_instructions);

        let requests = provider.requests.lock().unwrap();
        assert!(requests[0].user.contains("the transcript"));
        assert!(requests[0].user.contains("Focus on key points"));
        assert_eq!(requests[0].sampling.max_tokens, 1500);
    }

    #[tokio::test]
    async fn test_summarize_with_caller_instructions() {
        let provider = CannedProvider::new("Bullets.");
        let llm = client(provider.clone());

        let summary = llm.summarize("t", Some("Three bullet points")).await.unwrap();
        assert_eq!(summary.instructions, "Three bullet points");
        assert!(provider.requests.lock().unwrap()[0].user.contains("Three bullet points"));
    }

    #[tokio::test]
    async fn test_empty_summary_is_malformed() {
        let llm = client(CannedProvider::new("   "));
        assert!(matches!(
            llm.summarize("t", None).await,
            Err(EpochlyError::MalformedLlmOutput(_))
        ));
    }

    #[tokio::test]
    async fn test_generate_quiz() {
        let provider = CannedProvider::new(&quiz_reply(3));
        let llm = client(provider.clone());

        let questions = llm.generate_quiz("some transcript", Some(3)).await.unwrap();
        assert_eq!(questions.len(), 3);
        for q in &questions {
            assert_eq!(q.options.len(), OPTIONS_PER_QUESTION);
            assert!(q.options.contains(&q.correct_answer));
        }

        let requests = provider.requests.lock().unwrap();
        assert!(requests[0].user.contains("exactly 3 multiple-choice"));
        assert_eq!(requests[0].sampling.max_tokens, 2500);
    }

    #[tokio::test]
    async fn test_generate_quiz_rejects_bad_input_before_calling_provider() {
        let provider = CannedProvider::new(&quiz_reply(5));
        let llm = client(provider.clone());

        assert!(matches!(
            llm.generate_quiz("t", Some(0)).await,
            Err(EpochlyError::InvalidInput(_))
        ));
        assert!(matches!(
            llm.generate_quiz("  ", None).await,
            Err(EpochlyError::InvalidInput(_))
        ));
        assert!(provider.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_generate_quiz_count_mismatch() {
        let llm = client(CannedProvider::new(&quiz_reply(2)));
        assert!(matches!(
            llm.generate_quiz("t", Some(3)).await,
            Err(EpochlyError::MalformedLlmOutput(_))
        ));
    }
}
