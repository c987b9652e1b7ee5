//! Progress reporting for a generation run.
//!
//! Each pipeline stage emits one [`ProgressEvent`] when it starts. Events for
//! a single run always arrive in the same order with non-decreasing
//! percentages:
//!
//! ```text
//! 10 Validating file... → 30 Extracting content... → 50 Preparing AI prompt...
//!  → 70 Analyzing content with AI... → 85 Processing response...
//!  → 95 Finalizing quiz... → 100 Done
//! ```
//!
//! Inject an [`Arc<dyn ProgressSink>`] via
//! [`crate::config::GeneratorConfigBuilder::progress_callback`] or pass one
//! directly to [`crate::generate::QuizGenerator::generate`].
//!
//! # Example
//!
//! ```rust
//! use docquiz::{ProgressEvent, ProgressSink};
//! use std::sync::atomic::{AtomicU8, Ordering};
//!
//! struct LastPercent(AtomicU8);
//!
//! impl ProgressSink for LastPercent {
//!     fn on_progress(&self, event: &ProgressEvent) {
//!         self.0.store(event.progress, Ordering::SeqCst);
//!         eprintln!("{:>3}% {}", event.progress, event.step);
//!     }
//! }
//! ```

use serde::Serialize;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc::UnboundedSender;

/// One pipeline checkpoint as seen by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressEvent {
    /// Short stage label, e.g. `"Validating file..."`.
    pub step: String,
    /// Percentage in `[0, 100]`.
    pub progress: u8,
    /// Human-readable detail.
    pub message: String,
}

/// Pipeline states, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Stage {
    Idle,
    Validating,
    Extracting,
    PromptBuilding,
    Inferring,
    Parsing,
    Assembling,
    Persisting,
    Done,
}

impl Stage {
    /// `(step, progress, message)` announced when entering this stage.
    ///
    /// `Idle` and `Persisting` are silent.
    pub fn checkpoint(self) -> Option<(&'static str, u8, &'static str)> {
        match self {
            Stage::Idle | Stage::Persisting => None,
            Stage::Validating => Some(("Validating file...", 10, "Starting file validation")),
            Stage::Extracting => Some(("Extracting content...", 30, "Reading file content")),
            Stage::PromptBuilding => Some(("Preparing AI prompt...", 50, "Preparing analysis request")),
            Stage::Inferring => Some(("Analyzing content with AI...", 70, "AI is analyzing your document")),
            Stage::Parsing => Some(("Processing response...", 85, "Finalizing quiz data")),
            Stage::Assembling => Some(("Finalizing quiz...", 95, "Quiz generation complete")),
            Stage::Done => Some(("Done", 100, "Quiz ready!")),
        }
    }

    pub fn event(self) -> Option<ProgressEvent> {
        self.checkpoint().map(|(step, progress, message)| ProgressEvent {
            step: step.to_string(),
            progress,
            message: message.to_string(),
        })
    }
}

/// Receives progress events from the pipeline.
///
/// Methods are called synchronously from the task driving the run, so
/// implementations should return quickly. Both methods default to no-ops.
pub trait ProgressSink: Send + Sync {
    /// Called once per stage transition.
    fn on_progress(&self, event: &ProgressEvent) {
        let _ = event;
    }

    /// Called once if the run fails, with the stage that failed.
    fn on_failure(&self, stage: Stage, error: &str) {
        let _ = (stage, error);
    }
}

/// A no-op sink for callers that don't need progress events.
pub struct NoopProgressSink;

impl ProgressSink for NoopProgressSink {}

/// Convenience alias matching the type stored in [`crate::config::GeneratorConfig`].
pub type ProgressCallback = Arc<dyn ProgressSink>;

/// Collects every event in memory. Handy for tests and batch tooling.
#[derive(Default)]
pub struct ProgressRecorder {
    events: Mutex<Vec<ProgressEvent>>,
    failure: Mutex<Option<(Stage, String)>>,
}

impl ProgressRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    pub fn percentages(&self) -> Vec<u8> {
        self.events().iter().map(|e| e.progress).collect()
    }

    pub fn failure(&self) -> Option<(Stage, String)> {
        self.failure.lock().ok().and_then(|f| f.clone())
    }
}

impl ProgressSink for ProgressRecorder {
    fn on_progress(&self, event: &ProgressEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }

    fn on_failure(&self, stage: Stage, error: &str) {
        if let Ok(mut failure) = self.failure.lock() {
            *failure = Some((stage, error.to_string()));
        }
    }
}

/// Forwards events into an unbounded channel; see [`crate::stream`].
pub struct ChannelProgressSink {
    tx: UnboundedSender<ProgressEvent>,
}

impl ChannelProgressSink {
    pub fn new(tx: UnboundedSender<ProgressEvent>) -> Self {
        Self { tx }
    }
}

impl ProgressSink for ChannelProgressSink {
    fn on_progress(&self, event: &ProgressEvent) {
        // A dropped receiver only means nobody is listening any more.
        let _ = self.tx.send(event.clone());
    }
}

/// Drives the sinks of one run and keeps its state machine honest.
///
/// Stages may only move forward; a transition to an earlier or equal stage is
/// ignored and logged, so a sink never sees a regressing percentage.
pub(crate) struct RunProgress<'a> {
    sinks: Vec<&'a dyn ProgressSink>,
    stage: Stage,
}

impl<'a> RunProgress<'a> {
    pub(crate) fn new(sinks: Vec<&'a dyn ProgressSink>) -> Self {
        Self {
            sinks,
            stage: Stage::Idle,
        }
    }

    pub(crate) fn stage(&self) -> Stage {
        self.stage
    }

    pub(crate) fn enter(&mut self, next: Stage) {
        if next <= self.stage {
            tracing::warn!("Ignoring backwards stage transition {:?} → {:?}", self.stage, next);
            return;
        }
        tracing::debug!("Stage {:?} → {:?}", self.stage, next);
        self.stage = next;
        if let Some(event) = next.event() {
            for sink in &self.sinks {
                sink.on_progress(&event);
            }
        }
    }

    pub(crate) fn fail(&self, error: &str) {
        for sink in &self.sinks {
            sink.on_failure(self.stage, error);
        }
    }
}
