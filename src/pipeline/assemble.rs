//! Assembly: attach derived metadata to a parsed quiz.

use crate::pipeline::intake::Document;
use crate::quiz::{QuestionsCount, QuizMetadata, QuizPackage, QuizResult};
use chrono::{DateTime, Utc};

/// Package a parsed quiz with counts and document facts, stamped now.
pub fn assemble(data: QuizResult, doc: &Document) -> QuizPackage {
    assemble_at(data, doc, Utc::now())
}

/// Same as [`assemble`] with an explicit timestamp.
pub fn assemble_at(data: QuizResult, doc: &Document, generated_at: DateTime<Utc>) -> QuizPackage {
    let mcqs = data.mcqs.len();
    let short_answers = data.short_answer_questions.len();

    let metadata = QuizMetadata {
        file_name: doc.name().to_string(),
        file_size: doc.size_bytes(),
        questions_count: QuestionsCount {
            mcqs,
            short_answers,
            total: mcqs + short_answers,
        },
        generated_at,
    };

    QuizPackage { data, metadata }
}
