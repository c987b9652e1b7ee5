//! Configuration for quiz generation.
//!
//! Everything that shapes a run except the per-request
//! [`crate::quiz::GenerationSettings`] lives in [`GeneratorConfig`], built
//! via [`GeneratorConfigBuilder`]. The config is a plain value handed to the
//! generator. There is no process-wide state, so concurrent runs with
//! different configs never interfere.

use crate::error::QuizError;
use crate::pipeline::intake::MAX_FILE_BYTES;
use crate::pipeline::llm::InferenceClient;
use crate::progress::ProgressCallback;
use crate::prompts::DEFAULT_MAX_CONTENT_CHARS;
use edgequake_llm::LLMProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// What to do when a generated quiz cannot be stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PersistencePolicy {
    /// Log the failure and report it in
    /// [`crate::generate::GenerationOutput::persistence`]; the quiz is still
    /// returned. (default)
    #[default]
    BestEffort,
    /// Fail the run with [`QuizError::Persistence`].
    Required,
}

/// Configuration for a [`crate::generate::QuizGenerator`].
///
/// # Example
/// ```rust
/// use docquiz::GeneratorConfig;
///
/// let config = GeneratorConfig::builder()
///     .model("gemini-2.0-flash")
///     .inference_timeout_secs(90)
///     .build()
///     .unwrap();
/// assert_eq!(config.max_output_tokens, 4000);
/// ```
#[derive(Clone)]
pub struct GeneratorConfig {
    /// Model identifier. If None, the backend default is used
    /// (`gemini-2.0-flash` for Gemini).
    pub model: Option<String>,

    /// edgequake-llm provider name (e.g. "openai", "anthropic", "ollama").
    pub provider_name: Option<String>,

    /// Pre-constructed inference client. Takes precedence over everything else.
    pub client: Option<Arc<dyn InferenceClient>>,

    /// Pre-constructed edgequake-llm provider. Used when `client` is None.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Gemini API key. Falls back to `GEMINI_API_KEY`.
    pub gemini_api_key: Option<String>,

    /// Gemini API base URL override.
    pub gemini_base_url: Option<String>,

    /// Sampling temperature. Default: 0.7.
    pub temperature: f32,

    /// Output token ceiling per call. Default: 4000.
    ///
    /// Fifteen questions plus a study guide fit comfortably; much lower
    /// values cut the JSON off mid-object and the parser rejects it.
    pub max_output_tokens: usize,

    /// Document characters embedded in the prompt. Default: 8000.
    pub max_content_chars: usize,

    /// Largest accepted document in bytes. Default: 10 MiB.
    pub max_file_bytes: u64,

    /// Upper bound on one inference call in seconds. Default: 60.
    pub inference_timeout_secs: u64,

    /// Extra attempts on transient inference failures. Default: 0 (single attempt).
    pub max_retries: u32,

    /// Initial retry delay in milliseconds, doubled per attempt. Default: 500.
    pub retry_backoff_ms: u64,

    /// Reject answers whose item counts differ from the request. Default: false.
    pub strict_counts: bool,

    /// Behaviour on storage failure. Default: [`PersistencePolicy::BestEffort`].
    pub persistence: PersistencePolicy,

    /// Progress sink invoked for every run, in addition to the per-call sink.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            model: None,
            provider_name: None,
            client: None,
            provider: None,
            gemini_api_key: None,
            gemini_base_url: None,
            temperature: 0.7,
            max_output_tokens: 4000,
            max_content_chars: DEFAULT_MAX_CONTENT_CHARS,
            max_file_bytes: MAX_FILE_BYTES,
            inference_timeout_secs: 60,
            max_retries: 0,
            retry_backoff_ms: 500,
            strict_counts: false,
            persistence: PersistencePolicy::default(),
            progress_callback: None,
        }
    }
}

impl fmt::Debug for GeneratorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeneratorConfig")
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("client", &self.client.as_ref().map(|c| c.name().to_string()))
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("gemini_api_key", &self.gemini_api_key.as_ref().map(|_| "<redacted>"))
            .field("gemini_base_url", &self.gemini_base_url)
            .field("temperature", &self.temperature)
            .field("max_output_tokens", &self.max_output_tokens)
            .field("max_content_chars", &self.max_content_chars)
            .field("max_file_bytes", &self.max_file_bytes)
            .field("inference_timeout_secs", &self.inference_timeout_secs)
            .field("max_retries", &self.max_retries)
            .field("strict_counts", &self.strict_counts)
            .field("persistence", &self.persistence)
            .finish()
    }
}

impl GeneratorConfig {
    pub fn builder() -> GeneratorConfigBuilder {
        GeneratorConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`GeneratorConfig`].
#[derive(Debug)]
pub struct GeneratorConfigBuilder {
    config: GeneratorConfig,
}

impl GeneratorConfigBuilder {
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn client(mut self, client: Arc<dyn InferenceClient>) -> Self {
        self.config.client = Some(client);
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn gemini_api_key(mut self, key: impl Into<String>) -> Self {
        self.config.gemini_api_key = Some(key.into());
        self
    }

    pub fn gemini_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.gemini_base_url = Some(url.into());
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_output_tokens(mut self, n: usize) -> Self {
        self.config.max_output_tokens = n;
        self
    }

    pub fn max_content_chars(mut self, n: usize) -> Self {
        self.config.max_content_chars = n;
        self
    }

    pub fn max_file_bytes(mut self, n: u64) -> Self {
        self.config.max_file_bytes = n;
        self
    }

    pub fn inference_timeout_secs(mut self, secs: u64) -> Self {
        self.config.inference_timeout_secs = secs;
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n.min(10);
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn strict_counts(mut self, v: bool) -> Self {
        self.config.strict_counts = v;
        self
    }

    pub fn persistence(mut self, policy: PersistencePolicy) -> Self {
        self.config.persistence = policy;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<GeneratorConfig, QuizError> {
        let c = &self.config;
        if c.max_output_tokens == 0 {
            return Err(QuizError::InvalidConfig(
                "max_output_tokens must be ≥ 1".into(),
            ));
        }
        if c.max_content_chars == 0 {
            return Err(QuizError::InvalidConfig(
                "max_content_chars must be ≥ 1".into(),
            ));
        }
        if c.inference_timeout_secs == 0 {
            return Err(QuizError::InvalidConfig(
                "inference_timeout_secs must be ≥ 1".into(),
            ));
        }
        Ok(self.config)
    }
}
