//! Content extraction: decode document bytes as text.
//!
//! Every accepted format is read as UTF-8 text. `.txt` files come through
//! intact; `.pdf`, `.doc` and `.docx` are *not* parsed, so anything but the
//! plainest of those files shows up as mostly undecodable bytes and is
//! rejected here rather than sent to the model as noise.

use crate::error::ExtractionError;
use crate::pipeline::intake::Document;
use tracing::debug;

/// Share of non-text characters (in percent) above which decoding is
/// considered to have failed.
const MAX_BAD_PERCENT: usize = 10;

/// Text extracted from a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedText {
    pub text: String,
    /// Character count of `text`.
    pub chars: usize,
}

/// Decode the document into readable text.
pub fn extract_text(doc: &Document) -> Result<ExtractedText, ExtractionError> {
    let decoded = String::from_utf8_lossy(doc.bytes());

    let total = decoded.chars().count();
    let bad = decoded.chars().filter(|&c| is_garbage(c)).count();
    if total > 0 && bad * 100 > total * MAX_BAD_PERCENT {
        return Err(ExtractionError::Undecodable {
            name: doc.name().to_string(),
            bad_percent: (bad * 100 / total).min(100) as u8,
        });
    }

    let text = remove_invisible_chars(&decoded);
    if text.trim().is_empty() {
        return Err(ExtractionError::Empty {
            name: doc.name().to_string(),
        });
    }

    let chars = text.chars().count();
    debug!("Extracted {} chars from '{}'", chars, doc.name());
    Ok(ExtractedText { text, chars })
}

/// Replacement characters and control characters other than ordinary whitespace.
fn is_garbage(c: char) -> bool {
    c == char::REPLACEMENT_CHARACTER || (c.is_control() && !matches!(c, '\n' | '\r' | '\t' | '\u{0C}'))
}

/// Strip the BOM, zero-width characters and soft hyphens.
fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        [
            '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}',
        ],
        "",
    )
}
