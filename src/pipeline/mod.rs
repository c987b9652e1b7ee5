//! Pipeline stages for document-to-quiz generation.
//!
//! Each submodule implements exactly one step and is independently testable.
//!
//! ## Data Flow
//!
//! ```text
//! intake ──▶ extract ──▶ prompt ──▶ llm ──▶ parse ──▶ assemble ──▶ store
//! (checks)   (text)     (compile)  (infer)  (schema)  (metadata)  (optional)
//! ```
//!
//! 1. [`intake`]:   size and extension checks on the submitted document
//! 2. [`extract`]:  decode the bytes into readable text
//! 3. [`crate::prompts`]: embed the (truncated) text in the quiz prompt
//! 4. [`llm`]:      the only stage with network I/O; timeout and opt-in retry
//! 5. [`parse`]:    strip code fences and enforce the quiz schema
//! 6. [`assemble`]: attach counts, document facts and a timestamp

pub mod assemble;
pub mod extract;
pub mod intake;
pub mod llm;
pub mod parse;
