//! Sanitise and parse the producer's answer into a [`QuizResult`].
//!
//! The model is told to return bare JSON, but some wrap it in a Markdown code
//! fence anyway. Stripping one such wrapper is the only tolerance applied
//! here. Everything else (trailing prose, missing fields, three options
//! instead of four, an answer index of 7) is rejected with a
//! [`SchemaParseError`]. Silently fixing those would hide prompt or model
//! drift.
//!
//! Parsing happens in two steps: serde reads the loosely typed wire shape,
//! then [`validate`] checks the invariants serde cannot express and builds
//! the strongly typed [`QuizResult`].

use crate::error::SchemaParseError;
use crate::quiz::{
    Analysis, Difficulty, GenerationSettings, McqItem, QuizResult, ShortAnswerItem, StudyGuide,
    MCQ_OPTION_COUNT,
};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::error::Category;
use tracing::warn;

// ── Fence stripping ──────────────────────────────────────────────────────

static RE_OPEN_FENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^```[A-Za-z0-9_+.-]*\s*").unwrap());

static RE_CLOSE_FENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*```$").unwrap());

/// Trim, then remove one leading fence (with or without a language tag) and
/// one trailing fence.
///
/// Text that does not start with a fence is only trimmed.
pub fn strip_code_fence(raw: &str) -> String {
    let trimmed = raw.trim();
    if !trimmed.starts_with("```") {
        return trimmed.to_string();
    }
    let without_open = RE_OPEN_FENCE.replace(trimmed, "");
    RE_CLOSE_FENCE.replace(&without_open, "").into_owned()
}

// ── Wire shape ───────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawQuiz {
    analysis: Analysis,
    mcqs: Vec<RawMcq>,
    short_answer_questions: Vec<ShortAnswerItem>,
    study_guide: StudyGuide,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawMcq {
    question: String,
    options: Vec<String>,
    correct_answer: i64,
    difficulty: Difficulty,
    topic: String,
    #[serde(default)]
    explanation: Option<String>,
}

// ── Parsing ──────────────────────────────────────────────────────────────

/// Strip an optional fence and parse the quiz contract.
pub fn parse_quiz(raw: &str) -> Result<QuizResult, SchemaParseError> {
    let body = strip_code_fence(raw);
    if body.is_empty() {
        return Err(SchemaParseError::Empty);
    }

    let quiz: RawQuiz = serde_json::from_str(&body).map_err(|e| match e.classify() {
        Category::Data => SchemaParseError::Contract {
            detail: e.to_string(),
        },
        Category::Syntax | Category::Eof | Category::Io => SchemaParseError::NotJson {
            line: e.line(),
            column: e.column(),
            detail: e.to_string(),
        },
    })?;

    validate(quiz)
}

fn validate(raw: RawQuiz) -> Result<QuizResult, SchemaParseError> {
    let mcqs = raw
        .mcqs
        .into_iter()
        .enumerate()
        .map(|(i, m)| validate_mcq(i + 1, m))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(QuizResult {
        analysis: raw.analysis,
        mcqs,
        short_answer_questions: raw.short_answer_questions,
        study_guide: raw.study_guide,
    })
}

/// `item` is 1-based, for error messages.
fn validate_mcq(item: usize, raw: RawMcq) -> Result<McqItem, SchemaParseError> {
    let found = raw.options.len();
    let options: [String; MCQ_OPTION_COUNT] = raw
        .options
        .try_into()
        .map_err(|_| SchemaParseError::OptionCount { item, found })?;

    if !(0..MCQ_OPTION_COUNT as i64).contains(&raw.correct_answer) {
        return Err(SchemaParseError::AnswerOutOfRange {
            item,
            index: raw.correct_answer,
        });
    }

    Ok(McqItem {
        question: raw.question,
        options,
        correct_answer: raw.correct_answer as u8,
        difficulty: raw.difficulty,
        topic: raw.topic,
        explanation: raw.explanation,
    })
}

/// Compare item counts with what was requested.
///
/// With `strict` the first mismatch is an error; otherwise mismatches are
/// only logged.
pub fn check_counts(
    quiz: &QuizResult,
    settings: &GenerationSettings,
    strict: bool,
) -> Result<(), SchemaParseError> {
    let checks = [
        ("MCQs", settings.mcq_count as usize, quiz.mcqs.len()),
        (
            "short answer questions",
            settings.short_answer_count as usize,
            quiz.short_answer_questions.len(),
        ),
    ];

    for (what, expected, found) in checks {
        if expected == found {
            continue;
        }
        if strict {
            return Err(SchemaParseError::CountMismatch {
                what,
                expected,
                found,
            });
        }
        warn!("Requested {} {}, model returned {}", expected, what, found);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn mcq(options: Value, answer: Value) -> Value {
        json!({
            "question": "Which organelle produces ATP?",
            "options": options,
            "correctAnswer": answer,
            "difficulty": "easy",
            "topic": "cells",
            "explanation": "Mitochondria run oxidative phosphorylation."
        })
    }

    fn quiz_json(mcqs: Vec<Value>) -> String {
        json!({
            "analysis": {
                "mainTopics": ["cells"],
                "difficultyLevel": "easy",
                "estimatedStudyTime": "1 hour"
            },
            "mcqs": mcqs,
            "shortAnswerQuestions": [{
                "question": "Describe the cell membrane.",
                "difficulty": "easy",
                "topic": "cells",
                "keyPoints": ["lipid bilayer", "selective permeability"]
            }],
            "studyGuide": {
                "summary": "Cells are the unit of life.",
                "importantConcepts": ["organelles"],
                "suggestedReadings": ["Campbell Biology ch. 6"]
            }
        })
        .to_string()
    }

    fn four() -> Value {
        json!(["Nucleus", "Mitochondrion", "Ribosome", "Golgi body"])
    }

    #[test]
    fn test_strip_fences_with_language_tag() {
        assert_eq!(strip_code_fence("```json\n{\"a\":1}\n```"), "{\"a\":1}");
    }

    #[test]
    fn test_strip_fences_no_lang() {
        assert_eq!(strip_code_fence("```\n{\"a\":1}\n```"), "{\"a\":1}");
    }

    #[test]
    fn test_strip_fences_single_line() {
        assert_eq!(strip_code_fence("```json {\"a\":1} ```"), "{\"a\":1}");
    }

    #[test]
    fn test_no_fences_passthrough() {
        assert_eq!(strip_code_fence("  {\"a\":1}\n"), "{\"a\":1}");
    }

    #[test]
    fn test_strips_exactly_one_layer() {
        let inner = "```json\n{\"a\":1}\n```";
        let wrapped = format!("```\n{inner}\n```");
        assert_eq!(strip_code_fence(&wrapped), inner);
    }

    #[test]
    fn test_unwrap_recovers_original() {
        let original = quiz_json(vec![mcq(four(), json!(1))]);
        for wrapper in ["```json\n", "```\n", "```JSON  ", "```"] {
            let wrapped = format!("{wrapper}{original}\n```");
            assert_eq!(strip_code_fence(&wrapped), original, "wrapper {wrapper:?}");
        }
    }

    #[test]
    fn test_leading_fence_without_closing_fence() {
        assert_eq!(strip_code_fence("```json\n{\"a\":1}"), "{\"a\":1}");
    }

    #[test]
    fn parses_valid_quiz() {
        let quiz = parse_quiz(&quiz_json(vec![mcq(four(), json!(1))])).unwrap();
        assert_eq!(quiz.mcqs.len(), 1);
        assert_eq!(quiz.mcqs[0].correct_option(), Some("Mitochondrion"));
        assert_eq!(quiz.short_answer_questions[0].key_points.len(), 2);
        assert_eq!(quiz.analysis.difficulty_level, Difficulty::Easy);
    }

    #[test]
    fn fenced_and_bare_parse_identically() {
        let bare = quiz_json(vec![mcq(four(), json!(2))]);
        let fenced = format!("```json\n{bare}\n```");
        assert_eq!(parse_quiz(&bare).unwrap(), parse_quiz(&fenced).unwrap());
    }

    #[test]
    fn explanation_is_optional() {
        let mut item = mcq(four(), json!(0));
        item.as_object_mut().unwrap().remove("explanation");
        let quiz = parse_quiz(&quiz_json(vec![item])).unwrap();
        assert_eq!(quiz.mcqs[0].explanation, None);
    }

    #[test]
    fn rejects_three_options() {
        let raw = quiz_json(vec![mcq(four(), json!(0)), mcq(json!(["a", "b", "c"]), json!(0))]);
        let err = parse_quiz(&raw).unwrap_err();
        assert!(
            matches!(err, SchemaParseError::OptionCount { item: 2, found: 3 }),
            "{err}"
        );
    }

    #[test]
    fn rejects_five_options() {
        let raw = quiz_json(vec![mcq(json!(["a", "b", "c", "d", "e"]), json!(0))]);
        assert!(matches!(
            parse_quiz(&raw),
            Err(SchemaParseError::OptionCount { found: 5, .. })
        ));
    }

    #[test]
    fn rejects_out_of_range_answers() {
        for bad in [4, -1, 99] {
            let raw = quiz_json(vec![mcq(four(), json!(bad))]);
            let err = parse_quiz(&raw).unwrap_err();
            assert!(
                matches!(err, SchemaParseError::AnswerOutOfRange { item: 1, index } if index == bad),
                "{bad}: {err}"
            );
        }
    }

    #[test]
    fn rejects_missing_required_field() {
        let mut value: Value = serde_json::from_str(&quiz_json(vec![])).unwrap();
        value.as_object_mut().unwrap().remove("studyGuide");
        let err = parse_quiz(&value.to_string()).unwrap_err();
        match err {
            SchemaParseError::Contract { detail } => assert!(detail.contains("studyGuide"), "{detail}"),
            other => panic!("expected Contract, got {other:?}"),
        }
    }

    #[test]
    fn rejects_unknown_difficulty() {
        let mut item = mcq(four(), json!(0));
        item["difficulty"] = json!("impossible");
        assert!(matches!(
            parse_quiz(&quiz_json(vec![item])),
            Err(SchemaParseError::Contract { .. })
        ));
    }

    #[test]
    fn rejects_prose_and_truncated_json() {
        assert!(matches!(
            parse_quiz("Here is your quiz: {}"),
            Err(SchemaParseError::NotJson { .. })
        ));

        let full = quiz_json(vec![mcq(four(), json!(0))]);
        let cut = &full[..full.len() / 2];
        assert!(matches!(parse_quiz(cut), Err(SchemaParseError::NotJson { .. })));
    }

    #[test]
    fn rejects_empty_and_fence_only() {
        assert!(matches!(parse_quiz("   "), Err(SchemaParseError::Empty)));
        assert!(matches!(parse_quiz("```json\n```"), Err(SchemaParseError::Empty)));
    }

    #[test]
    fn count_check_strict_and_lenient() {
        let quiz = parse_quiz(&quiz_json(vec![mcq(four(), json!(0))])).unwrap();
        let settings = GenerationSettings::new(3, 1, Difficulty::Easy, true);

        assert!(check_counts(&quiz, &settings, false).is_ok());
        assert!(matches!(
            check_counts(&quiz, &settings, true),
            Err(SchemaParseError::CountMismatch {
                expected: 3,
                found: 1,
                ..
            })
        ));

        let exact = GenerationSettings::new(1, 1, Difficulty::Easy, true);
        assert!(check_counts(&quiz, &exact, true).is_ok());
    }
}
