use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::db::models::{Question, Test};
use crate::db::types::QuestionType;
use crate::repositories::tests::TestSummaryRow;
use crate::schemas::user::format_primitive;
use crate::services::exam_timing;

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct TestCreate {
    #[validate(length(min = 1, message = "name must not be empty"))]
    pub(crate) name: String,
    #[serde(default)]
    pub(crate) description: Option<String>,
    #[serde(default)]
    pub(crate) duration: Option<String>,
    #[validate(length(min = 1, message = "a test needs at least one question"))]
    #[validate(nested)]
    pub(crate) questions: Vec<QuestionCreate>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub(crate) struct QuestionCreate {
    #[serde(rename = "type")]
    pub(crate) qtype: QuestionType,
    #[validate(length(min = 1, message = "question text must not be empty"))]
    pub(crate) text: String,
    #[serde(default)]
    pub(crate) options: Vec<String>,
    #[serde(alias = "correctAnswer")]
    #[validate(length(min = 1, message = "correct_answer must not be empty"))]
    pub(crate) correct_answer: String,
    #[serde(default)]
    pub(crate) topic: Option<String>,
    #[serde(default = "default_points")]
    #[validate(range(min = 1, message = "points must be at least 1"))]
    pub(crate) points: i32,
}

fn default_points() -> i32 {
    1
}

/// Cross-field checks the derive cannot express: option lists must match
/// the question type and the correct answer must be answerable.
pub(crate) fn validate_questions(questions: &[QuestionCreate]) -> Result<(), String> {
    for (index, question) in questions.iter().enumerate() {
        let ordinal = index + 1;
        match question.qtype {
            QuestionType::Mcq => {
                if question.options.len() < 2 {
                    return Err(format!("question {ordinal} needs at least two options"));
                }
                if !question.options.iter().any(|o| o == &question.correct_answer) {
                    return Err(format!(
                        "question {ordinal}: correct answer is not among the options"
                    ));
                }
            }
            QuestionType::TrueFalse => {
                if question.correct_answer != "True" && question.correct_answer != "False" {
                    return Err(format!("question {ordinal} must answer True or False"));
                }
            }
            QuestionType::Short => {}
        }
    }
    Ok(())
}

#[derive(Debug, Serialize)]
pub(crate) struct TestSummaryResponse {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) description: Option<String>,
    pub(crate) duration: String,
    pub(crate) question_count: i64,
    pub(crate) total_points: i64,
    pub(crate) created_by: String,
    pub(crate) created_at: String,
}

impl TestSummaryResponse {
    pub(crate) fn from_db(row: TestSummaryRow) -> Self {
        let duration = match row.duration.as_deref().filter(|d| !d.trim().is_empty()) {
            Some(label) => label.trim().to_string(),
            None => exam_timing::format_minutes(
                2 * row.mcq_count + row.truefalse_count + 3 * row.short_count,
            ),
        };
        Self {
            id: row.id,
            name: row.name,
            description: row.description,
            duration,
            question_count: row.question_count,
            total_points: row.total_points,
            created_by: row.created_by,
            created_at: format_primitive(row.created_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct QuestionResponse {
    pub(crate) id: String,
    #[serde(rename = "type")]
    pub(crate) qtype: QuestionType,
    pub(crate) text: String,
    pub(crate) options: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) correct_answer: Option<String>,
    pub(crate) topic: Option<String>,
    pub(crate) points: i32,
}

impl QuestionResponse {
    /// `reveal_answers` is false for students taking the test; the correct
    /// answer never leaves the server in that case.
    pub(crate) fn from_db(question: Question, reveal_answers: bool) -> Self {
        Self {
            id: question.id,
            qtype: question.qtype,
            text: question.text,
            options: question.options.0,
            correct_answer: reveal_answers.then_some(question.correct_answer),
            topic: question.topic,
            points: question.points,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct TestDetailResponse {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) description: Option<String>,
    pub(crate) duration: String,
    pub(crate) total_points: i32,
    pub(crate) created_by: String,
    pub(crate) created_at: String,
    pub(crate) questions: Vec<QuestionResponse>,
}

impl TestDetailResponse {
    pub(crate) fn from_db(test: Test, questions: Vec<Question>, reveal_answers: bool) -> Self {
        let duration = exam_timing::display_duration(test.duration.as_deref(), &questions);
        let total_points: i32 = questions.iter().map(|q| q.points).sum();
        Self {
            id: test.id,
            name: test.name,
            description: test.description,
            duration,
            total_points,
            created_by: test.created_by,
            created_at: format_primitive(test.created_at),
            questions: questions
                .into_iter()
                .map(|q| QuestionResponse::from_db(q, reveal_answers))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mcq(correct: &str, options: &[&str]) -> QuestionCreate {
        QuestionCreate {
            qtype: QuestionType::Mcq,
            text: "Q".to_string(),
            options: options.iter().map(|s| s.to_string()).collect(),
            correct_answer: correct.to_string(),
            topic: None,
            points: 1,
        }
    }

    #[test]
    fn mcq_correct_answer_must_be_an_option() {
        assert!(validate_questions(&[mcq("A", &["A", "B"])]).is_ok());
        assert!(validate_questions(&[mcq("C", &["A", "B"])]).is_err());
        assert!(validate_questions(&[mcq("A", &["A"])]).is_err());
    }

    #[test]
    fn truefalse_answer_is_constrained() {
        let question = QuestionCreate {
            qtype: QuestionType::TrueFalse,
            text: "Q".to_string(),
            options: Vec::new(),
            correct_answer: "maybe".to_string(),
            topic: None,
            points: 1,
        };
        assert!(validate_questions(&[question]).is_err());
    }

    #[test]
    fn test_needs_at_least_one_question() {
        let payload = TestCreate {
            name: "Kolokvij".to_string(),
            description: None,
            duration: None,
            questions: Vec::new(),
        };
        assert!(payload.validate().is_err());
    }

    #[test]
    fn payload_accepts_camel_case_aliases() {
        let raw = r#"{"type": "mcq", "text": "Q", "options": ["A", "B"], "correctAnswer": "A"}"#;
        let question: QuestionCreate = serde_json::from_str(raw).expect("parse");
        assert_eq!(question.correct_answer, "A");
        assert_eq!(question.points, 1);
    }

    #[test]
    fn student_view_hides_correct_answer() {
        let question = Question {
            id: "q1".to_string(),
            test_id: "t1".to_string(),
            position: 0,
            text: "Q".to_string(),
            qtype: QuestionType::Mcq,
            options: sqlx::types::Json(vec!["A".to_string(), "B".to_string()]),
            correct_answer: "A".to_string(),
            topic: None,
            points: 1,
        };

        let hidden = QuestionResponse::from_db(question.clone(), false);
        assert!(hidden.correct_answer.is_none());
        let json = serde_json::to_value(&hidden).expect("serialize");
        assert!(json.get("correct_answer").is_none());

        let shown = QuestionResponse::from_db(question, true);
        assert_eq!(shown.correct_answer.as_deref(), Some("A"));
    }
}
