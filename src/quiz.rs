//! Quiz data model: generation settings, the parsed quiz, and its packaging.
//!
//! All types serialise with the camelCase field names the prompt asks the
//! producer to emit, so an exported or stored quiz is byte-compatible with the
//! JSON the model returned (minus anything the parser rejected).

use crate::error::ValidationError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of options every multiple-choice item must carry.
pub const MCQ_OPTION_COUNT: usize = 4;

/// Question difficulty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Caller-supplied knobs for one generation run.
///
/// Defaults mirror the upload form: 10 MCQs, 5 short-answer questions,
/// medium difficulty, explanations on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationSettings {
    pub mcq_count: u32,
    pub short_answer_count: u32,
    pub difficulty: Difficulty,
    pub include_explanations: bool,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            mcq_count: 10,
            short_answer_count: 5,
            difficulty: Difficulty::Medium,
            include_explanations: true,
        }
    }
}

impl GenerationSettings {
    pub fn new(
        mcq_count: u32,
        short_answer_count: u32,
        difficulty: Difficulty,
        include_explanations: bool,
    ) -> Self {
        Self {
            mcq_count,
            short_answer_count,
            difficulty,
            include_explanations,
        }
    }

    /// Both counts must be positive.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.mcq_count == 0 {
            return Err(ValidationError::InvalidSettings(
                "mcqCount must be at least 1".into(),
            ));
        }
        if self.short_answer_count == 0 {
            return Err(ValidationError::InvalidSettings(
                "shortAnswerCount must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// A multiple-choice question with exactly four options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct McqItem {
    pub question: String,
    pub options: [String; MCQ_OPTION_COUNT],
    /// Index into `options`, always `< 4`.
    #[serde(rename = "correctAnswer")]
    pub correct_answer: u8,
    pub difficulty: Difficulty,
    pub topic: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

impl McqItem {
    /// Text of the correct option, `None` if `correct_answer` is out of range.
    pub fn correct_option(&self) -> Option<&str> {
        self.options
            .get(usize::from(self.correct_answer))
            .map(String::as_str)
    }
}

/// An open question graded against a list of key points.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShortAnswerItem {
    pub question: String,
    pub difficulty: Difficulty,
    pub topic: String,
    pub key_points: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudyGuide {
    pub summary: String,
    pub important_concepts: Vec<String>,
    pub suggested_readings: Vec<String>,
}

/// The producer's overall reading of the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Analysis {
    pub main_topics: Vec<String>,
    pub difficulty_level: Difficulty,
    pub estimated_study_time: String,
}

/// A fully validated quiz as returned by the parser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizResult {
    pub analysis: Analysis,
    pub mcqs: Vec<McqItem>,
    pub short_answer_questions: Vec<ShortAnswerItem>,
    pub study_guide: StudyGuide,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionsCount {
    pub mcqs: usize,
    pub short_answers: usize,
    pub total: usize,
}

/// Facts about a run derived from its inputs and output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizMetadata {
    pub file_name: String,
    pub file_size: u64,
    pub questions_count: QuestionsCount,
    pub generated_at: DateTime<Utc>,
}

/// The final product of a successful run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizPackage {
    pub data: QuizResult,
    pub metadata: QuizMetadata,
}
