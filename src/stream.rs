//! Streaming generation API: observe a run as a stream of progress events.
//!
//! [`generate_stream`] spawns the run on the current tokio runtime and hands
//! back the events as a `Stream` plus a [`JoinHandle`] for the final result.
//! The stream ends when the run finishes, successfully or not, so a consumer
//! can simply drain it and then await the handle.

use crate::error::QuizError;
use crate::generate::{GenerationOutput, QuizGenerator};
use crate::pipeline::intake::Document;
use crate::progress::{ChannelProgressSink, ProgressEvent};
use crate::quiz::GenerationSettings;
use std::pin::Pin;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_stream::Stream;
use tracing::info;

/// A boxed stream of progress events.
pub type ProgressStream = Pin<Box<dyn Stream<Item = ProgressEvent> + Send>>;

/// Handle resolving to the outcome of a streamed run.
pub type GenerationHandle = JoinHandle<Result<GenerationOutput, QuizError>>;

/// Generate a quiz in a background task, streaming its progress.
///
/// Must be called from within a tokio runtime.
///
/// # Example
/// ```rust,no_run
/// use docquiz::{generate_stream, Document, GenerationSettings, GeneratorConfig, QuizGenerator};
/// use futures::StreamExt;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let generator = QuizGenerator::new(GeneratorConfig::default());
/// let doc = Document::from_bytes("notes.txt", "The mitochondria is ...");
/// let (mut events, handle) = generate_stream(generator, doc, GenerationSettings::default());
/// while let Some(event) = events.next().await {
///     eprintln!("[{:>3}%] {}", event.progress, event.step);
/// }
/// let output = handle.await??;
/// println!("{}", output.id);
/// # Ok(())
/// # }
/// ```
pub fn generate_stream(
    generator: QuizGenerator,
    document: Document,
    settings: GenerationSettings,
) -> (ProgressStream, GenerationHandle) {
    info!("Starting streamed generation for '{}'", document.name());

    let (tx, rx) = mpsc::unbounded_channel();
    let handle = tokio::spawn(async move {
        // The sink owns the only sender; dropping it at the end of the task
        // closes the stream.
        let sink = ChannelProgressSink::new(tx);
        generator.generate(document, &settings, &sink).await
    });

    (Box::pin(UnboundedReceiverStream::new(rx)), handle)
}
