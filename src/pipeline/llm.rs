//! Inference: send the compiled prompt to a text-generation backend.
//!
//! The pipeline only sees the [`InferenceClient`] trait. Three backends ship
//! with the crate:
//!
//! * [`GeminiClient`]: the Google Generative Language REST endpoint
//!   (`models/{model}:generateContent`), called directly with reqwest.
//! * [`LlmProviderClient`]: any [`edgequake_llm::LLMProvider`] (OpenAI,
//!   Anthropic, Ollama, …).
//! * [`StaticClient`]: a canned response, for offline runs and tests.
//!
//! ## Timeout and retry
//!
//! [`infer`] wraps every attempt in `tokio::time::timeout`. By default it makes
//! exactly one attempt. With `max_retries > 0`, transient failures (transport,
//! timeout, HTTP 429/5xx) are retried with exponential backoff
//! (`retry_backoff_ms * 2^attempt`); permanent ones surface immediately.

use crate::config::GeneratorConfig;
use crate::error::InferenceError;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider};
use serde::Serialize;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{sleep, timeout, Duration};
use tracing::{debug, warn};

/// Default Gemini model.
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";

/// Default Gemini API base URL.
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// One single-turn completion request.
#[derive(Debug, Clone, PartialEq)]
pub struct InferenceRequest {
    pub prompt: String,
    pub temperature: f32,
    pub max_output_tokens: usize,
}

/// A text-generation backend.
#[async_trait]
pub trait InferenceClient: Send + Sync {
    /// Short backend name for logs, e.g. `"gemini"`.
    fn name(&self) -> &str;

    /// Run one completion and return the producer's raw text.
    async fn complete(&self, request: &InferenceRequest) -> Result<String, InferenceError>;
}

/// Call the client with the configured timeout and retry policy.
pub async fn infer(
    client: &dyn InferenceClient,
    request: &InferenceRequest,
    config: &GeneratorConfig,
) -> Result<String, InferenceError> {
    let start = Instant::now();
    let mut attempt: u32 = 0;

    loop {
        if attempt > 0 {
            let backoff = config.retry_backoff_ms * 2u64.pow(attempt - 1);
            warn!(
                "{}: retry {}/{} after {}ms",
                client.name(),
                attempt,
                config.max_retries,
                backoff
            );
            sleep(Duration::from_millis(backoff)).await;
        }

        let result = match timeout(
            Duration::from_secs(config.inference_timeout_secs),
            client.complete(request),
        )
        .await
        {
            Ok(r) => r,
            Err(_) => Err(InferenceError::Timeout {
                secs: config.inference_timeout_secs,
            }),
        };

        match result {
            Ok(text) => {
                debug!(
                    "{}: {} chars in {:?} ({} attempt(s))",
                    client.name(),
                    text.len(),
                    start.elapsed(),
                    attempt + 1
                );
                return Ok(text);
            }
            Err(e) if e.is_transient() && attempt < config.max_retries => {
                warn!("{}: attempt {} failed: {}", client.name(), attempt + 1, e);
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

// ── Gemini REST ──────────────────────────────────────────────────────────

/// Client for the Gemini `generateContent` endpoint.
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self, InferenceError> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| InferenceError::Transport {
                detail: e.to_string(),
            })?;
        Ok(Self {
            http,
            api_key: api_key.into(),
            model: model.into(),
            base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
        })
    }

    /// Point the client at another deployment (proxy, emulator, …).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentBody<'a> {
    contents: [Content<'a>; 1],
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: [Part<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: usize,
}

fn build_body(request: &InferenceRequest) -> GenerateContentBody<'_> {
    GenerateContentBody {
        contents: [Content {
            parts: [Part {
                text: &request.prompt,
            }],
        }],
        generation_config: GenerationConfig {
            temperature: request.temperature,
            max_output_tokens: request.max_output_tokens,
        },
    }
}

/// `candidates[0].content.parts[0].text`, if present and non-empty.
fn extract_candidate_text(body: &Value) -> Option<String> {
    body.pointer("/candidates/0/content/parts/0/text")
        .and_then(Value::as_str)
        .filter(|t| !t.trim().is_empty())
        .map(str::to_string)
}

/// `error.message` from an error body, if present.
fn extract_error_message(body: &str) -> Option<String> {
    serde_json::from_str::<Value>(body)
        .ok()?
        .pointer("/error/message")
        .and_then(Value::as_str)
        .map(str::to_string)
}

#[async_trait]
impl InferenceClient for GeminiClient {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn complete(&self, request: &InferenceRequest) -> Result<String, InferenceError> {
        let response = self
            .http
            .post(self.endpoint())
            .query(&[("key", self.api_key.as_str())])
            .json(&build_body(request))
            .send()
            .await
            .map_err(|e| InferenceError::Transport {
                detail: e.without_url().to_string(),
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| InferenceError::Transport {
            detail: e.without_url().to_string(),
        })?;

        if !status.is_success() {
            return Err(InferenceError::Endpoint {
                status: status.as_u16(),
                message: extract_error_message(&body)
                    .unwrap_or_else(|| "no error details in response".to_string()),
            });
        }

        let json: Value = serde_json::from_str(&body).map_err(|_| InferenceError::EmptyResponse)?;
        extract_candidate_text(&json).ok_or(InferenceError::EmptyResponse)
    }
}

// ── edgequake-llm providers ──────────────────────────────────────────────

/// Adapter over any edgequake-llm chat provider.
pub struct LlmProviderClient {
    provider: Arc<dyn LLMProvider>,
}

impl LlmProviderClient {
    pub fn new(provider: Arc<dyn LLMProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl InferenceClient for LlmProviderClient {
    fn name(&self) -> &str {
        "edgequake-llm"
    }

    async fn complete(&self, request: &InferenceRequest) -> Result<String, InferenceError> {
        let messages = vec![ChatMessage::user_with_images(&request.prompt, vec![])];
        let options = CompletionOptions {
            temperature: Some(request.temperature),
            max_tokens: Some(request.max_output_tokens),
            ..Default::default()
        };

        let response = self
            .provider
            .chat(&messages, Some(&options))
            .await
            .map_err(|e| InferenceError::Provider {
                message: format!("{}", e),
            })?;

        debug!(
            "edgequake-llm: {} input tokens, {} output tokens",
            response.prompt_tokens, response.completion_tokens
        );

        if response.content.trim().is_empty() {
            return Err(InferenceError::EmptyResponse);
        }
        Ok(response.content)
    }
}

// ── Canned responses ─────────────────────────────────────────────────────

/// Returns the same text for every request and counts the calls.
pub struct StaticClient {
    response: String,
    calls: AtomicUsize,
}

impl StaticClient {
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of completions served so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl InferenceClient for StaticClient {
    fn name(&self) -> &str {
        "static"
    }

    async fn complete(&self, _request: &InferenceRequest) -> Result<String, InferenceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.response.clone())
    }
}
