//! Export a generated quiz as a standalone JSON file.

use crate::error::PersistenceError;
use crate::quiz::QuizResult;
use std::path::{Path, PathBuf};
use tracing::info;

/// `<stem>_quiz.json` for a document name, e.g. `biology.txt` → `biology_quiz.json`.
///
/// Directory components are dropped, and only the last extension is removed.
pub fn export_file_name(document_name: &str) -> String {
    let stem = Path::new(document_name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "quiz".to_string());
    format!("{stem}_quiz.json")
}

/// Pretty-printed JSON (two-space indent) of the quiz body.
pub fn export_json(quiz: &QuizResult) -> Result<String, PersistenceError> {
    serde_json::to_string_pretty(quiz).map_err(|e| PersistenceError::Serialization {
        key: "export".to_string(),
        source: e,
    })
}

/// Write the quiz to `dir/<export_file_name>` and return the path.
///
/// Uses atomic write (temp file + rename) so a partially written export is
/// never left behind under the final name.
pub async fn export_to_dir(
    quiz: &QuizResult,
    document_name: &str,
    dir: impl AsRef<Path>,
) -> Result<PathBuf, PersistenceError> {
    let dir = dir.as_ref();
    let path = dir.join(export_file_name(document_name));
    let json = export_json(quiz)?;

    let io_err = |source| PersistenceError::Io {
        path: path.clone(),
        source,
    };

    tokio::fs::create_dir_all(dir).await.map_err(io_err)?;

    let tmp_path = path.with_extension("json.tmp");
    tokio::fs::write(&tmp_path, json.as_bytes())
        .await
        .map_err(io_err)?;
    tokio::fs::rename(&tmp_path, &path).await.map_err(io_err)?;

    info!("Exported quiz to {}", path.display());
    Ok(path)
}
