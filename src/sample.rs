//! Placeholder quizzes for offline runs.
//!
//! [`sample_quiz`] builds a deterministic quiz with exactly the requested
//! number of items, so the CLI's `--mock` mode and UI prototypes can exercise
//! the full pipeline (parsing included) without an API key.

use crate::quiz::{
    Analysis, GenerationSettings, McqItem, QuizResult, ShortAnswerItem, StudyGuide,
};

/// A placeholder quiz shaped by `settings`.
///
/// The correct answer rotates through the four options so consumers do not
/// accidentally rely on it always being the first.
pub fn sample_quiz(settings: &GenerationSettings, document_name: &str) -> QuizResult {
    let topic = format!("Sample Topic ({document_name})");

    let mcqs = (0..settings.mcq_count)
        .map(|i| McqItem {
            question: format!("Sample MCQ Question {}?", i + 1),
            options: [
                "Option A".to_string(),
                "Option B".to_string(),
                "Option C".to_string(),
                "Option D".to_string(),
            ],
            correct_answer: (i % 4) as u8,
            difficulty: settings.difficulty,
            topic: topic.clone(),
            explanation: settings
                .include_explanations
                .then(|| "This is the explanation for the correct answer.".to_string()),
        })
        .collect();

    let short_answer_questions = (0..settings.short_answer_count)
        .map(|i| ShortAnswerItem {
            question: format!("Sample Short Answer Question {}?", i + 1),
            difficulty: settings.difficulty,
            topic: topic.clone(),
            key_points: vec!["Point 1".into(), "Point 2".into(), "Point 3".into()],
        })
        .collect();

    QuizResult {
        analysis: Analysis {
            main_topics: vec!["Topic 1".into(), "Topic 2".into(), "Topic 3".into()],
            difficulty_level: settings.difficulty,
            estimated_study_time: "2-3 hours".into(),
        },
        mcqs,
        short_answer_questions,
        study_guide: StudyGuide {
            summary: "This is a mock study guide summary.".into(),
            important_concepts: vec!["Concept 1".into(), "Concept 2".into(), "Concept 3".into()],
            suggested_readings: vec!["Reading 1".into(), "Reading 2".into(), "Reading 3".into()],
        },
    }
}
