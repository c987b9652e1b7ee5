//! Intake: load a document and reject anything the pipeline should not touch.
//!
//! Validation is deliberately cheap and runs before extraction or any network
//! call, so an oversized upload or a spreadsheet never costs an API request.

use crate::error::ValidationError;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Upper bound on accepted document size: 10 MiB.
pub const MAX_FILE_BYTES: u64 = 10 * 1024 * 1024;

/// Extensions accepted at intake, lower-case and dot-prefixed.
pub const ALLOWED_EXTENSIONS: [&str; 4] = [".pdf", ".doc", ".docx", ".txt"];

/// A submitted document, owned by one pipeline run.
#[derive(Debug, Clone)]
pub struct Document {
    name: String,
    size_bytes: u64,
    bytes: Vec<u8>,
}

impl Document {
    /// Wrap in-memory bytes under the given file name.
    pub fn from_bytes(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        let bytes = bytes.into();
        Self {
            name: name.into(),
            size_bytes: bytes.len() as u64,
            bytes,
        }
    }

    /// Read a document from disk, refusing files over [`MAX_FILE_BYTES`].
    ///
    /// The file name (not the full path) becomes the document name.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, ValidationError> {
        Self::from_path_with_limit(path, MAX_FILE_BYTES).await
    }

    /// Read a document from disk, refusing files over `max_bytes`.
    ///
    /// The size is taken from file metadata first, so an oversized file is
    /// rejected without being read.
    pub async fn from_path_with_limit(
        path: impl AsRef<Path>,
        max_bytes: u64,
    ) -> Result<Self, ValidationError> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let meta = tokio::fs::metadata(path)
            .await
            .map_err(|e| read_error(path, e))?;
        if meta.len() > max_bytes {
            return Err(ValidationError::TooLarge {
                name,
                size: meta.len(),
                limit: max_bytes,
            });
        }

        let bytes = tokio::fs::read(path).await.map_err(|e| read_error(path, e))?;
        // The file may have grown between the two calls.
        if bytes.len() as u64 > max_bytes {
            return Err(ValidationError::TooLarge {
                name,
                size: bytes.len() as u64,
                limit: max_bytes,
            });
        }

        debug!("Loaded {} ({} bytes)", path.display(), bytes.len());
        Ok(Self::from_bytes(name, bytes))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Declared extension: `.` + the lower-cased text after the last dot.
    ///
    /// A name without any dot yields the whole name, which never matches the
    /// allow-list.
    pub fn declared_extension(&self) -> String {
        let last = self.name.rsplit('.').next().unwrap_or_default();
        format!(".{}", last.to_lowercase())
    }
}

fn read_error(path: &Path, e: std::io::Error) -> ValidationError {
    match e.kind() {
        std::io::ErrorKind::NotFound => ValidationError::FileNotFound {
            path: path.to_path_buf(),
        },
        std::io::ErrorKind::PermissionDenied => ValidationError::PermissionDenied {
            path: path.to_path_buf(),
        },
        _ => ValidationError::Unreadable {
            path: PathBuf::from(path),
            source: e,
        },
    }
}

/// Check a candidate document against the size ceiling and the extension
/// allow-list, in that order.
pub fn validate(candidate: Option<&Document>, max_bytes: u64) -> Result<&Document, ValidationError> {
    let doc = candidate.ok_or(ValidationError::NoDocument)?;

    if doc.size_bytes > max_bytes {
        return Err(ValidationError::TooLarge {
            name: doc.name.clone(),
            size: doc.size_bytes,
            limit: max_bytes,
        });
    }

    let extension = doc.declared_extension();
    if !ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
        return Err(ValidationError::UnsupportedExtension {
            name: doc.name.clone(),
            extension,
        });
    }

    debug!("Validated '{}' ({} bytes, {})", doc.name, doc.size_bytes, extension);
    Ok(doc)
}
