//! Error types for the docquiz library.
//!
//! Every pipeline stage owns one error enum, and [`QuizError`] wraps them so a
//! caller can match on the exact failure or just ask for its [`ErrorKind`]:
//!
//! * [`ValidationError`]: the submitted document (or the settings) were rejected
//!   before any work was done.
//! * [`ExtractionError`]: the bytes could not be turned into readable text.
//! * [`InferenceError`]: the text-generation service could not be reached,
//!   answered with an error, or answered with nothing.
//! * [`SchemaParseError`]: the service answered, but not with a valid quiz.
//! * [`PersistenceError`]: the quiz was generated but could not be stored.
//!
//! Only [`PersistenceError`] may be non-fatal: with the default
//! [`crate::config::PersistencePolicy::BestEffort`] it is reported through
//! [`crate::generate::PersistenceStatus`] instead of failing the run.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the docquiz pipeline.
#[derive(Debug, Error)]
pub enum QuizError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    Inference(#[from] InferenceError),

    #[error(transparent)]
    SchemaParse(#[from] SchemaParseError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Coarse classification of a [`QuizError`], one per pipeline failure family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    Extraction,
    Inference,
    SchemaParse,
    Persistence,
    Config,
    Internal,
}

impl QuizError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            QuizError::Validation(_) => ErrorKind::Validation,
            QuizError::Extraction(_) => ErrorKind::Extraction,
            QuizError::Inference(_) => ErrorKind::Inference,
            QuizError::SchemaParse(_) => ErrorKind::SchemaParse,
            QuizError::Persistence(_) => ErrorKind::Persistence,
            QuizError::InvalidConfig(_) => ErrorKind::Config,
            QuizError::Internal(_) => ErrorKind::Internal,
        }
    }
}

// ── Intake ────────────────────────────────────────────────────────────────

/// The submitted document or generation settings were rejected.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// No document was supplied.
    #[error("No file selected")]
    NoDocument,

    /// The document is larger than the configured ceiling.
    #[error("File '{name}' is {size} bytes, which exceeds the {limit}-byte limit")]
    TooLarge { name: String, size: u64, limit: u64 },

    /// The declared extension is not one of the accepted document types.
    #[error("Invalid file format '{extension}' for '{name}'\nAccepted formats: .pdf, .doc, .docx, .txt")]
    UnsupportedExtension { name: String, extension: String },

    /// Input file was not found at the given path.
    #[error("File not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// Any other I/O failure while loading the document.
    #[error("Failed to read '{path}': {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Generation settings are out of range.
    #[error("Invalid generation settings: {0}")]
    InvalidSettings(String),
}

// ── Extraction ────────────────────────────────────────────────────────────

/// The document bytes could not be turned into usable text.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// Most of the content is not valid text (typically a binary document).
    #[error("Failed to read file content of '{name}': {bad_percent}% of the decoded characters are not text")]
    Undecodable { name: String, bad_percent: u8 },

    /// Decoding succeeded but nothing readable is left.
    #[error("File '{name}' contains no readable text")]
    Empty { name: String },
}

// ── Inference ─────────────────────────────────────────────────────────────

/// The text-generation call failed.
#[derive(Debug, Error)]
pub enum InferenceError {
    /// No client could be built (missing API key, unknown provider, …).
    #[error("Inference provider '{provider}' is not configured.\n{hint}")]
    NotConfigured { provider: String, hint: String },

    /// The request never produced an HTTP response.
    #[error("Failed to reach the inference endpoint: {detail}")]
    Transport { detail: String },

    /// The endpoint answered with a non-success status.
    #[error("Failed to generate quiz: {message} (HTTP {status})")]
    Endpoint { status: u16, message: String },

    /// A provider-level failure reported by an edgequake-llm provider.
    #[error("Failed to generate quiz: {message}")]
    Provider { message: String },

    /// The endpoint answered successfully but without any text.
    #[error("No response received from AI")]
    EmptyResponse,

    /// The call exceeded the configured timeout.
    #[error("Inference call timed out after {secs}s")]
    Timeout { secs: u64 },
}

impl InferenceError {
    /// Whether a retry could plausibly succeed.
    ///
    /// Only network-level failures, timeouts, rate limits and server errors
    /// qualify; client errors and empty answers are permanent.
    pub fn is_transient(&self) -> bool {
        match self {
            InferenceError::Transport { .. } | InferenceError::Timeout { .. } => true,
            InferenceError::Endpoint { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

// ── Parsing ───────────────────────────────────────────────────────────────

/// The producer's answer does not satisfy the quiz contract.
#[derive(Debug, Error)]
pub enum SchemaParseError {
    /// Nothing left after trimming and fence stripping.
    #[error("AI response is empty")]
    Empty,

    /// The text is not syntactically valid JSON.
    #[error("AI response is not valid JSON (line {line}, column {column}): {detail}")]
    NotJson {
        line: usize,
        column: usize,
        detail: String,
    },

    /// Valid JSON, but a field is missing or has the wrong type.
    #[error("AI response does not match the quiz schema: {detail}")]
    Contract { detail: String },

    /// An MCQ does not have exactly four options.
    #[error("MCQ {item} has {found} options; exactly 4 are required")]
    OptionCount { item: usize, found: usize },

    /// An MCQ's correct answer does not index one of its options.
    #[error("MCQ {item} has correctAnswer {index}; it must be between 0 and 3")]
    AnswerOutOfRange { item: usize, index: i64 },

    /// Strict-count mode: the producer returned a different number of items.
    #[error("Expected {expected} {what}, got {found}")]
    CountMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },
}

// ── Persistence ───────────────────────────────────────────────────────────

/// The quiz store could not be read or written.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// The backing store failed an I/O operation.
    #[error("Quiz store I/O failed for '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A record could not be converted to or from JSON.
    #[error("Failed to serialise quiz record '{key}': {source}")]
    Serialization {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// The key cannot be represented by the backend.
    #[error("Invalid store key '{0}'")]
    InvalidKey(String),

    /// The store is unavailable for a backend-specific reason.
    #[error("Quiz store unavailable: {0}")]
    Unavailable(String),
}
