//! Quiz question schema and validation of model output.

use crate::error::{EpochlyError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Options every question must carry.
pub const OPTIONS_PER_QUESTION: usize = 4;

/// A multiple-choice question.
///
/// `correct_answer` always equals one of `options` once the question has
/// passed [`parse_quiz`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizQuestion {
    pub question: String,
    pub options: Vec<String>,
    #[serde(rename = "correctAnswer")]
    pub correct_answer: String,
    pub explanation: String,
}

fn malformed(msg: impl Into<String>) -> EpochlyError {
    EpochlyError::MalformedLlmOutput(msg.into())
}

/// Strip a surrounding Markdown code fence, with or without a language tag.
fn strip_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string (`json`) on the opening fence line.
    let rest = match rest.find('\n') {
        Some(i) => &rest[i + 1..],
        None => rest,
    };
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

/// Isolate the JSON array in a completion, wrapping a lone object.
fn isolate_array(text: &str) -> Result<String> {
    let body = strip_fences(text);

    // Prefer the bracket that opens an array of objects over one in the preamble.
    let array_start = body
        .match_indices('[')
        .map(|(i, _)| i)
        .find(|&i| body[i + 1..].trim_start().starts_with('{'))
        .or_else(|| body.find('['));

    if let (Some(start), Some(end)) = (array_start, body.rfind(']')) {
        let object_first = body.find('{').is_some_and(|brace| brace < start);
        if start < end && !object_first {
            return Ok(body[start..=end].to_string());
        }
    }

    if let (Some(start), Some(end)) = (body.find('{'), body.rfind('}')) {
        if start < end {
            return Ok(format!("[{}]", &body[start..=end]));
        }
    }

    Err(malformed("response contains no JSON array"))
}

fn validate(index: usize, q: &QuizQuestion) -> Result<()> {
    let n = index + 1;

    if q.question.trim().is_empty() {
        return Err(malformed(format!("question {} has empty text", n)));
    }
    if q.options.len() != OPTIONS_PER_QUESTION {
        return Err(malformed(format!(
            "question {} has {} options, expected {}",
            n,
            q.options.len(),
            OPTIONS_PER_QUESTION
        )));
    }
    if q.options.iter().any(|o| o.trim().is_empty()) {
        return Err(malformed(format!("question {} has a blank option", n)));
    }

    let distinct: HashSet<&str> = q.options.iter().map(|o| o.trim()).collect();
    if distinct.len() != q.options.len() {
        return Err(malformed(format!("question {} has duplicate options", n)));
    }

    if !q.options.iter().any(|o| *o == q.correct_answer) {
        return Err(malformed(format!(
            "question {}: correctAnswer {:?} is not one of its options",
            n, q.correct_answer
        )));
    }

    Ok(())
}

/// Parse and validate a model's quiz completion.
///
/// Fails with `MalformedLlmOutput` unless the completion holds exactly
/// `expected` well-formed questions.
pub fn parse_quiz(response: &str, expected: usize) -> Result<Vec<QuizQuestion>> {
    let array = isolate_array(response)?;

    let questions: Vec<QuizQuestion> = serde_json::from_str(&array)
        .map_err(|e| malformed(format!("quiz JSON does not match the question schema: {}", e)))?;

    if questions.len() != expected {
        return Err(malformed(format!(
            "expected {} questions, got {}",
            expected,
            questions.len()
        )));
    }

    for (i, q) in questions.iter().enumerate() {
        validate(i, q)?;
    }

    Ok(questions)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question_json(q: &str, answer: &str) -> String {
        format!(
            r#"{{"question": "{}", "options": ["Paris", "Rome", "Berlin", "Madrid"], "correctAnswer": "{}", "explanation": "Because."}}"#,
            q, answer
        )
    }

    #[test]
    fn test_parses_fenced_array() {
        let response = format!(
            "Here you go:\n```json\n[{}, {}]\n```",
            question_json("Capital of France?", "Paris"),
            question_json("Capital of Italy?", "Rome")
        );
        let questions = parse_quiz(&response, 2).unwrap();
        assert_eq!(questions.len(), 2);
        assert_eq!(questions[1].correct_answer, "Rome");
        assert!(questions
            .iter()
            .all(|q| q.options.contains(&q.correct_answer)));
    }

    #[test]
    fn test_lone_object_is_wrapped() {
        let response = question_json("Capital of Germany?", "Berlin");
        let questions = parse_quiz(&response, 1).unwrap();
        assert_eq!(questions[0].correct_answer, "Berlin");
    }

    #[test]
    fn test_unknown_fields_are_tolerated() {
        let response = r#"[{"question": "Q?", "options": ["a", "b", "c", "d"], "correctAnswer": "b", "explanation": "e", "difficulty": "easy"}]"#;
        let questions = parse_quiz(response, 1).unwrap();
        assert_eq!(questions[0].correct_answer, "b");
    }

    #[test]
    fn test_answer_must_match_option_exactly() {
        let padded = r#"[{"question": "Q?", "options": ["a", "b", "c", "d"], "correctAnswer": " b ", "explanation": "e"}]"#;
        assert!(matches!(
            parse_quiz(padded, 1),
            Err(EpochlyError::MalformedLlmOutput(_))
        ));

        let padded_option = r#"[{"question": "Q?", "options": [" a", "b", "c", "d"], "correctAnswer": "a", "explanation": "e"}]"#;
        assert!(parse_quiz(padded_option, 1).is_err());

        let exact = r#"[{"question": "Q?", "options": [" a", "b", "c", "d"], "correctAnswer": " a", "explanation": "e"}]"#;
        assert_eq!(parse_quiz(exact, 1).unwrap()[0].correct_answer, " a");
    }

    #[test]
    fn test_bracket_in_preamble_is_skipped() {
        let response = format!(
            "Here are [2] questions: [{}, {}]",
            question_json("Capital of France?", "Paris"),
            question_json("Capital of Spain?", "Madrid")
        );
        let questions = parse_quiz(&response, 2).unwrap();
        assert_eq!(questions[1].correct_answer, "Madrid");
    }

    #[test]
    fn test_wrong_count_is_malformed() {
        let response = format!("[{}]", question_json("Q?", "Paris"));
        assert!(matches!(
            parse_quiz(&response, 3),
            Err(EpochlyError::MalformedLlmOutput(_))
        ));
    }

    #[test]
    fn test_answer_must_be_an_option() {
        let response = format!("[{}]", question_json("Q?", "A"));
        let err = parse_quiz(&response, 1).unwrap_err();
        assert!(err.to_string().contains("not one of its options"));
    }

    #[test]
    fn test_option_rules() {
        let three = r#"[{"question": "Q?", "options": ["a", "b", "c"], "correctAnswer": "a", "explanation": ""}]"#;
        assert!(parse_quiz(three, 1).is_err());

        let dupes = r#"[{"question": "Q?", "options": ["a", "a", "c", "d"], "correctAnswer": "a", "explanation": ""}]"#;
        assert!(parse_quiz(dupes, 1).is_err());

        let blank = r#"[{"question": "Q?", "options": ["a", " ", "c", "d"], "correctAnswer": "a", "explanation": ""}]"#;
        assert!(parse_quiz(blank, 1).is_err());

        let no_text = r#"[{"question": "  ", "options": ["a", "b", "c", "d"], "correctAnswer": "a", "explanation": ""}]"#;
        assert!(parse_quiz(no_text, 1).is_err());
    }

    #[test]
    fn test_missing_field_and_garbage() {
        let missing = r#"[{"question": "Q?", "options": ["a", "b", "c", "d"], "explanation": ""}]"#;
        assert!(parse_quiz(missing, 1).is_err());
        assert!(parse_quiz("I cannot help with that.", 1).is_err());
    }

    #[test]
    fn test_serializes_camel_case_answer() {
        let q = QuizQuestion {
            question: "Q?".to_string(),
            options: vec!["a".into(), "b".into(), "c".into(), "d".into()],
            correct_answer: "c".to_string(),
            explanation: "e".to_string(),
        };
        let json = serde_json::to_value(&q).unwrap();
        assert_eq!(json["correctAnswer"], "c");
    }
}
