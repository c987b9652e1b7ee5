//! # docquiz
//!
//! Turn a document into a quiz: multiple-choice questions, short-answer
//! questions and a study guide, generated by a text-generation model.
//!
//! ## Pipeline Overview
//!
//! ```text
//! Document
//!  │
//!  ├─ 1. Validate  size ≤ 10 MiB, extension in .pdf/.doc/.docx/.txt   (10%)
//!  ├─ 2. Extract   decode bytes into readable text                      (30%)
//!  ├─ 3. Prompt    embed the first 8000 chars in the quiz prompt         (50%)
//!  ├─ 4. Infer     Gemini / any edgequake-llm provider                   (70%)
//!  ├─ 5. Parse     strip code fences, enforce the quiz schema            (85%)
//!  ├─ 6. Assemble  counts, file facts, timestamp                         (95%)
//!  ├─ 7. Persist   optional QuizStore (memory or JSON files)
//!  └─ 8. Done                                                           (100%)
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use docquiz::{Document, GenerationSettings, GeneratorConfig, ProgressEvent, ProgressSink, QuizGenerator};
//!
//! struct Printer;
//!
//! impl ProgressSink for Printer {
//!     fn on_progress(&self, event: &ProgressEvent) {
//!         eprintln!("[{:>3}%] {}", event.progress, event.step);
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Backend auto-detected from GEMINI_API_KEY, then edgequake-llm's environment scan
//!     let generator = QuizGenerator::new(GeneratorConfig::default());
//!     let doc = Document::from_path("chapter-3.txt").await?;
//!     let out = generator.generate(doc, &GenerationSettings::default(), &Printer).await?;
//!     println!("{}", serde_json::to_string_pretty(&out.package)?);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `docquiz` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! docquiz = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod export;
pub mod generate;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod quiz;
pub mod sample;
pub mod store;
pub mod stream;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{GeneratorConfig, GeneratorConfigBuilder, PersistencePolicy};
pub use error::{
    ErrorKind, ExtractionError, InferenceError, PersistenceError, QuizError, SchemaParseError,
    ValidationError,
};
pub use export::{export_file_name, export_json, export_to_dir};
pub use generate::{resolve_client, GenerationOutput, PersistenceStatus, QuizGenerator};
pub use pipeline::intake::Document;
pub use pipeline::llm::{GeminiClient, InferenceClient, InferenceRequest, LlmProviderClient, StaticClient};
pub use progress::{
    ChannelProgressSink, NoopProgressSink, ProgressCallback, ProgressEvent, ProgressRecorder,
    ProgressSink, Stage,
};
pub use quiz::{
    Analysis, Difficulty, GenerationSettings, McqItem, QuestionsCount, QuizMetadata, QuizPackage,
    QuizResult, ShortAnswerItem, StudyGuide, MCQ_OPTION_COUNT,
};
pub use sample::sample_quiz;
pub use store::{FileStore, KeyValueStore, MemoryStore, QuizId, QuizRecord, QuizStore};
pub use stream::{generate_stream, GenerationHandle, ProgressStream};
