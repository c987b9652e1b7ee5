//! Eager (whole-run) generation entry points.
//!
//! [`QuizGenerator::generate`] drives one document through every stage and
//! returns only when the quiz is assembled and, if a store is attached,
//! persisted. Use [`crate::stream::generate_stream`] to observe the run as a
//! stream of events instead of through a [`ProgressSink`].

use crate::config::{GeneratorConfig, PersistencePolicy};
use crate::error::{InferenceError, PersistenceError, QuizError};
use crate::pipeline::intake::{self, Document};
use crate::pipeline::llm::{
    self, GeminiClient, InferenceClient, InferenceRequest, LlmProviderClient, DEFAULT_GEMINI_MODEL,
};
use crate::pipeline::{assemble, extract, parse};
use crate::progress::{NoopProgressSink, ProgressSink, RunProgress, Stage};
use crate::prompts::compile_prompt;
use crate::quiz::{GenerationSettings, QuizPackage};
use crate::store::{QuizId, QuizRecord, QuizStore};
use edgequake_llm::ProviderFactory;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Outcome of the persistence step.
#[derive(Debug)]
pub enum PersistenceStatus {
    /// The record was written to the store.
    Saved,
    /// No store is attached to the generator.
    Disabled,
    /// The store rejected the record. Only reported under
    /// [`PersistencePolicy::BestEffort`].
    Failed(PersistenceError),
}

impl PersistenceStatus {
    pub fn is_saved(&self) -> bool {
        matches!(self, PersistenceStatus::Saved)
    }
}

/// A successful run.
#[derive(Debug)]
pub struct GenerationOutput {
    /// Id the record was (or would have been) stored under.
    pub id: QuizId,
    pub package: QuizPackage,
    pub persistence: PersistenceStatus,
}

/// Runs the document-to-quiz pipeline.
///
/// Cheap to clone: the inference client and store are shared.
///
/// # Example
/// ```rust,no_run
/// use docquiz::{Document, GenerationSettings, GeneratorConfig, NoopProgressSink, QuizGenerator, QuizStore};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let generator = QuizGenerator::new(GeneratorConfig::default())
///     .with_store(QuizStore::open_dir("./quizzes"));
/// let doc = Document::from_path("lecture-notes.txt").await?;
/// let out = generator
///     .generate(doc, &GenerationSettings::default(), &NoopProgressSink)
///     .await?;
/// println!("{} questions saved as {}", out.package.metadata.questions_count.total, out.id);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct QuizGenerator {
    config: GeneratorConfig,
    client: Option<Arc<dyn InferenceClient>>,
    store: Option<QuizStore>,
}

impl QuizGenerator {
    pub fn new(config: GeneratorConfig) -> Self {
        Self {
            client: config.client.clone(),
            config,
            store: None,
        }
    }

    /// Persist every generated quiz into `store`.
    pub fn with_store(mut self, store: QuizStore) -> Self {
        self.store = Some(store);
        self
    }

    /// Use `client` for inference instead of resolving one from the config.
    pub fn with_client(mut self, client: Arc<dyn InferenceClient>) -> Self {
        self.client = Some(client);
        self
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    pub fn store(&self) -> Option<&QuizStore> {
        self.store.as_ref()
    }

    /// Generate a quiz from `document`.
    ///
    /// `progress` receives one event per stage (10, 30, 50, 70, 85, 95, 100);
    /// the config's `progress_callback`, if any, receives the same events.
    /// On failure both are told which stage failed.
    ///
    /// # Errors
    /// The first stage error aborts the run. A storage failure is an error
    /// only under [`PersistencePolicy::Required`].
    pub async fn generate(
        &self,
        document: Document,
        settings: &GenerationSettings,
        progress: &dyn ProgressSink,
    ) -> Result<GenerationOutput, QuizError> {
        let mut sinks: Vec<&dyn ProgressSink> = vec![progress];
        if let Some(ref cb) = self.config.progress_callback {
            sinks.push(cb.as_ref());
        }
        let mut run = RunProgress::new(sinks);

        let start = Instant::now();
        info!("Generating quiz for '{}'", document.name());

        match self.run(&document, settings, &mut run).await {
            Ok(output) => {
                info!(
                    "Quiz {} ready: {} questions in {:?}",
                    output.id,
                    output.package.metadata.questions_count.total,
                    start.elapsed()
                );
                Ok(output)
            }
            Err(e) => {
                warn!("Quiz generation failed during {:?}: {}", run.stage(), e);
                run.fail(&e.to_string());
                Err(e)
            }
        }
    }

    /// Load `path` and generate a quiz from it.
    ///
    /// Read failures, and files over `max_file_bytes`, surface as
    /// [`crate::error::ValidationError`] before any progress event is emitted.
    pub async fn generate_from_path(
        &self,
        path: impl AsRef<Path>,
        settings: &GenerationSettings,
        progress: &dyn ProgressSink,
    ) -> Result<GenerationOutput, QuizError> {
        let document = Document::from_path_with_limit(path, self.config.max_file_bytes).await?;
        self.generate(document, settings, progress).await
    }

    /// Blocking wrapper around [`QuizGenerator::generate`].
    ///
    /// Creates a temporary tokio runtime internally; do not call from within
    /// an async context.
    pub fn generate_sync(
        &self,
        document: Document,
        settings: &GenerationSettings,
    ) -> Result<GenerationOutput, QuizError> {
        tokio::runtime::Runtime::new()
            .map_err(|e| QuizError::Internal(format!("Failed to create tokio runtime: {}", e)))?
            .block_on(self.generate(document, settings, &NoopProgressSink))
    }

    async fn run(
        &self,
        document: &Document,
        settings: &GenerationSettings,
        run: &mut RunProgress<'_>,
    ) -> Result<GenerationOutput, QuizError> {
        // ── Validate ─────────────────────────────────────────────────────
        run.enter(Stage::Validating);
        settings.validate()?;
        intake::validate(Some(document), self.config.max_file_bytes)?;

        // ── Extract ──────────────────────────────────────────────────────
        run.enter(Stage::Extracting);
        let extracted = extract::extract_text(document)?;

        // ── Compile prompt ───────────────────────────────────────────────
        run.enter(Stage::PromptBuilding);
        let prompt = compile_prompt(&extracted.text, settings, self.config.max_content_chars);

        // ── Infer ────────────────────────────────────────────────────────
        run.enter(Stage::Inferring);
        let client = match self.client {
            Some(ref c) => Arc::clone(c),
            None => resolve_client(&self.config)?,
        };
        let request = InferenceRequest {
            prompt: prompt.text,
            temperature: self.config.temperature,
            max_output_tokens: self.config.max_output_tokens,
        };
        let raw = llm::infer(client.as_ref(), &request, &self.config).await?;

        // ── Parse ────────────────────────────────────────────────────────
        run.enter(Stage::Parsing);
        let data = parse::parse_quiz(&raw)?;
        parse::check_counts(&data, settings, self.config.strict_counts)?;

        // ── Assemble ─────────────────────────────────────────────────────
        run.enter(Stage::Assembling);
        let package = assemble::assemble(data, document);

        // ── Persist ──────────────────────────────────────────────────────
        run.enter(Stage::Persisting);
        let id = QuizId::generate();
        let persistence = self.persist(&id, &package).await?;

        run.enter(Stage::Done);
        Ok(GenerationOutput {
            id,
            package,
            persistence,
        })
    }

    async fn persist(
        &self,
        id: &QuizId,
        package: &QuizPackage,
    ) -> Result<PersistenceStatus, QuizError> {
        let Some(ref store) = self.store else {
            return Ok(PersistenceStatus::Disabled);
        };

        let record = QuizRecord::new(id.clone(), package.clone());
        match store.save(&record).await {
            Ok(()) => {
                debug!("Saved quiz {}", id);
                Ok(PersistenceStatus::Saved)
            }
            Err(e) if self.config.persistence == PersistencePolicy::Required => Err(e.into()),
            Err(e) => {
                warn!("Failed to save quiz {}: {}", id, e);
                Ok(PersistenceStatus::Failed(e))
            }
        }
    }
}

/// Resolve the inference client, from most-specific to least-specific.
///
/// 1. **Pre-built client** (`config.client`), used as-is.
/// 2. **Pre-built provider** (`config.provider`), wrapped in [`LlmProviderClient`].
/// 3. **Named provider** (`config.provider_name`) via
///    [`ProviderFactory::create_llm_provider`], which reads that provider's
///    API key from the environment.
/// 4. **Gemini** when `config.gemini_api_key` or `GEMINI_API_KEY` is set.
/// 5. **Auto-detection** via [`ProviderFactory::from_env`].
pub fn resolve_client(config: &GeneratorConfig) -> Result<Arc<dyn InferenceClient>, InferenceError> {
    if let Some(ref client) = config.client {
        return Ok(Arc::clone(client));
    }

    if let Some(ref provider) = config.provider {
        return Ok(Arc::new(LlmProviderClient::new(Arc::clone(provider))));
    }

    if let Some(ref name) = config.provider_name {
        let model = config.model.as_deref().unwrap_or(DEFAULT_GEMINI_MODEL);
        let provider = ProviderFactory::create_llm_provider(name, model).map_err(|e| {
            InferenceError::NotConfigured {
                provider: name.clone(),
                hint: format!("{e}"),
            }
        })?;
        return Ok(Arc::new(LlmProviderClient::new(provider)));
    }

    let api_key = config
        .gemini_api_key
        .clone()
        .or_else(|| std::env::var("GEMINI_API_KEY").ok())
        .filter(|k| !k.is_empty());
    if let Some(key) = api_key {
        let model = config.model.as_deref().unwrap_or(DEFAULT_GEMINI_MODEL);
        let mut client = GeminiClient::new(key, model)?;
        if let Some(ref url) = config.gemini_base_url {
            client = client.with_base_url(url);
        }
        return Ok(Arc::new(client));
    }

    let (provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| InferenceError::NotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No inference backend could be auto-detected from environment.\n\
                Set GEMINI_API_KEY, or OPENAI_API_KEY / ANTHROPIC_API_KEY with --provider.\n\
                Error: {}",
                e
            ),
        })?;
    Ok(Arc::new(LlmProviderClient::new(provider)))
}
