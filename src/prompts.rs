//! Prompt construction for quiz generation.
//!
//! The whole request is a single instruction string: document excerpt, the
//! exact JSON shape we parse in [`crate::pipeline::parse`], and the
//! per-run requirements. Keeping the schema text next to the requirement list
//! makes it easy to spot when the two drift apart; the tests below pin the
//! pieces the parser depends on.

use crate::quiz::GenerationSettings;
use tracing::debug;

/// Default maximum number of document characters embedded in the prompt.
pub const DEFAULT_MAX_CONTENT_CHARS: usize = 8000;

/// JSON shape the producer must follow. Field names match [`crate::quiz`].
pub const QUIZ_SCHEMA: &str = r#"{
  "analysis": {
    "mainTopics": ["topic1", "topic2", ...],
    "difficultyLevel": "medium",
    "estimatedStudyTime": "2-3 hours"
  },
  "mcqs": [
    {
      "question": "Question text?",
      "options": ["A", "B", "C", "D"],
      "correctAnswer": 0,
      "difficulty": "medium",
      "topic": "topic_name",
      "explanation": "Why this is correct..."
    }
  ],
  "shortAnswerQuestions": [
    {
      "question": "Question text?",
      "difficulty": "medium",
      "topic": "topic_name",
      "keyPoints": ["point1", "point2"]
    }
  ],
  "studyGuide": {
    "summary": "Overview of the document",
    "importantConcepts": ["concept1", "concept2"],
    "suggestedReadings": ["reading1", "reading2"]
  }
}"#;

/// A rendered prompt plus what was cut to fit the budget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledPrompt {
    pub text: String,
    /// Characters of document content embedded.
    pub content_chars: usize,
    /// Whether content beyond the budget was dropped.
    pub truncated: bool,
}

/// First `max_chars` characters of `text` (never splits a code point).
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

/// Render the quiz-generation instruction for one document.
pub fn compile_prompt(content: &str, settings: &GenerationSettings, max_chars: usize) -> CompiledPrompt {
    let excerpt = truncate_chars(content, max_chars);
    let truncated = excerpt.len() < content.len();
    let content_chars = excerpt.chars().count();
    if truncated {
        debug!(
            "Document truncated to {} chars for the prompt ({} bytes dropped)",
            content_chars,
            content.len() - excerpt.len()
        );
    }

    let text = format!(
        "You are an expert quiz generator. Analyze the following document and generate a comprehensive quiz.

Document Content:
{excerpt}

Generate a JSON response with this exact structure (no markdown, just pure JSON):
{QUIZ_SCHEMA}

Requirements:
- Generate {mcqs} MCQs
- Generate {short} short answer questions
- Set difficulty to {difficulty}
- Include explanations: {explanations}
- Ensure all MCQs have exactly 4 options
- Set correctAnswer as index (0-3)
- Return ONLY valid JSON, no additional text",
        mcqs = settings.mcq_count,
        short = settings.short_answer_count,
        difficulty = settings.difficulty,
        explanations = settings.include_explanations,
    );

    CompiledPrompt {
        text,
        content_chars,
        truncated,
    }
}
