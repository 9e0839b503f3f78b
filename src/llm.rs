// 🤖 Text Generators - LLM collaborators behind one trait
// Gemini client, unconfigured stand-in, and a mock for tests

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";

// ============================================================================
// CORE TYPES
// ============================================================================

/// Reply from a text generator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generation {
    pub text: String,
}

impl Generation {
    pub fn new(text: impl Into<String>) -> Self {
        Generation { text: text.into() }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GenerationError {
    /// No usable client; raised only when a generation is attempted
    #[error("{0}")]
    Configuration(String),

    /// The LLM call itself failed; message is kept verbatim
    #[error("{0}")]
    Upstream(String),
}

#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Short name for logs and health output
    fn name(&self) -> &str;

    /// Capability flag: false when every call is bound to fail
    fn is_configured(&self) -> bool {
        true
    }

    async fn generate(&self, prompt: &str) -> Result<Generation, GenerationError>;
}

// ============================================================================
// GEMINI CLIENT
// ============================================================================

pub struct GeminiClient {
    endpoint: String,
    model: String,
    api_key: String,
    http: HttpClient,
}

impl GeminiClient {
    pub fn new(
        endpoint: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        GeminiClient {
            endpoint: endpoint.into(),
            model: model.into(),
            api_key: api_key.into(),
            http: HttpClient::new(),
        }
    }

    fn url(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.endpoint.trim_end_matches('/'),
            self.model
        )
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    fn name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str) -> Result<Generation, GenerationError> {
        let payload = GenerateContentRequest {
            contents: vec![RequestContent {
                parts: vec![RequestPart { text: prompt }],
            }],
        };

        debug!(model = %self.model, prompt_bytes = prompt.len(), "calling generateContent");

        let response = self
            .http
            .post(self.url())
            .header("x-goog-api-key", &self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| GenerationError::Upstream(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| GenerationError::Upstream(e.to_string()))?;

        if !status.is_success() {
            return Err(GenerationError::Upstream(upstream_error_message(
                status.as_u16(),
                &body,
            )));
        }

        let parsed: GenerateContentResponse = serde_json::from_str(&body)
            .map_err(|e| GenerationError::Upstream(format!("unreadable generateContent reply: {}", e)))?;

        parsed.into_generation()
    }
}

#[derive(Debug, Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<RequestContent<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

impl GenerateContentResponse {
    /// Join the text parts of the first candidate
    fn into_generation(self) -> Result<Generation, GenerationError> {
        let block_reason = self.prompt_feedback.and_then(|f| f.block_reason);

        let Some(candidate) = self.candidates.into_iter().next() else {
            let reason = block_reason.unwrap_or_else(|| "no candidates".to_string());
            return Err(GenerationError::Upstream(format!(
                "model returned no text (prompt blocked: {})",
                reason
            )));
        };

        let text: String = candidate
            .content
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if text.is_empty() {
            let reason = candidate.finish_reason.unwrap_or_else(|| "unknown".to_string());
            return Err(GenerationError::Upstream(format!(
                "model returned no text (finish reason: {})",
                reason
            )));
        }

        Ok(Generation { text })
    }
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Prefer the provider's own message; fall back to status and body
fn upstream_error_message(status: u16, body: &str) -> String {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => envelope.error.message,
        Err(_) if body.trim().is_empty() => format!("LLM service returned HTTP {}", status),
        Err(_) => format!("LLM service returned HTTP {}: {}", status, body.trim()),
    }
}

// ============================================================================
// UNCONFIGURED GENERATOR
// ============================================================================

/// Stand-in used when no API key is set. Startup succeeds; every call fails.
#[derive(Debug, Clone)]
pub struct UnconfiguredGenerator {
    reason: String,
}

impl Default for UnconfiguredGenerator {
    fn default() -> Self {
        UnconfiguredGenerator {
            reason: "LLM client is not configured. Set API_KEY (or GENAI_API_KEY) to enable analysis."
                .to_string(),
        }
    }
}

#[async_trait]
impl TextGenerator for UnconfiguredGenerator {
    fn name(&self) -> &str {
        "unconfigured"
    }

    fn is_configured(&self) -> bool {
        false
    }

    async fn generate(&self, _prompt: &str) -> Result<Generation, GenerationError> {
        Err(GenerationError::Configuration(self.reason.clone()))
    }
}

// ============================================================================
// MOCK GENERATOR
// ============================================================================

/// Scripted generator: replays queued replies and records prompts
#[derive(Clone, Default)]
pub struct MockTextGenerator {
    replies: Arc<Mutex<VecDeque<Result<Generation, GenerationError>>>>,
    prompts: Arc<Mutex<Vec<String>>>,
}

impl MockTextGenerator {
    pub fn replying(text: impl Into<String>) -> Self {
        let mock = Self::default();
        mock.push_text(text);
        mock
    }

    pub fn failing(message: impl Into<String>) -> Self {
        let mock = Self::default();
        mock.push_error(GenerationError::Upstream(message.into()));
        mock
    }

    pub fn push_text(&self, text: impl Into<String>) {
        self.replies.lock().push_back(Ok(Generation::new(text)));
    }

    pub fn push_error(&self, error: GenerationError) {
        self.replies.lock().push_back(Err(error));
    }

    /// Prompts received so far, oldest first
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }
}

#[async_trait]
impl TextGenerator for MockTextGenerator {
    fn name(&self) -> &str {
        "mock"
    }

    async fn generate(&self, prompt: &str) -> Result<Generation, GenerationError> {
        self.prompts.lock().push(prompt.to_string());
        self.replies
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(GenerationError::Upstream("no mock reply queued".to_string())))
    }
}
