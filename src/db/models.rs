use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use time::PrimitiveDateTime;

use crate::db::types::{AttemptStatus, QuestionType, SessionStatus, UserRole};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct User {
    pub(crate) id: String,
    pub(crate) google_uid: String,
    pub(crate) email: String,
    pub(crate) full_name: String,
    pub(crate) role: UserRole,
    pub(crate) avatar_url: Option<String>,
    pub(crate) is_active: bool,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Student {
    pub(crate) id: String,
    pub(crate) email: String,
    pub(crate) full_name: String,
    pub(crate) jmbag: String,
    pub(crate) year: i32,
    pub(crate) avatar_url: Option<String>,
    pub(crate) user_id: Option<String>,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Test {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) description: Option<String>,
    pub(crate) duration: Option<String>,
    pub(crate) created_by: String,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Question {
    pub(crate) id: String,
    pub(crate) test_id: String,
    pub(crate) position: i32,
    pub(crate) text: String,
    pub(crate) qtype: QuestionType,
    pub(crate) options: Json<Vec<String>>,
    pub(crate) correct_answer: String,
    pub(crate) topic: Option<String>,
    pub(crate) points: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct ExamSession {
    pub(crate) id: String,
    pub(crate) test_id: String,
    pub(crate) student_id: String,
    pub(crate) started_at: PrimitiveDateTime,
    pub(crate) deadline: PrimitiveDateTime,
    pub(crate) status: SessionStatus,
    pub(crate) answers: Json<HashMap<String, String>>,
    pub(crate) submitted_at: Option<PrimitiveDateTime>,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

/// One graded answer inside an attempt's `answers` column.
///
/// `is_correct` stays `None` for short-answer questions awaiting manual
/// review; the absent field is omitted on the wire so "ungraded" never
/// reads as "graded incorrect".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct AnswerRecord {
    pub(crate) question_id: String,
    pub(crate) value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) is_correct: Option<bool>,
    pub(crate) awarded_points: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Attempt {
    pub(crate) id: String,
    pub(crate) test_id: String,
    pub(crate) test_name: String,
    pub(crate) student_id: String,
    pub(crate) student_name: Option<String>,
    pub(crate) student_email: Option<String>,
    pub(crate) submitted_at: PrimitiveDateTime,
    pub(crate) status: AttemptStatus,
    pub(crate) answers: Json<Vec<AnswerRecord>>,
    pub(crate) auto_score: i32,
    pub(crate) manual_score: i32,
    pub(crate) total_score: i32,
    pub(crate) max_score: i32,
    pub(crate) percent: i32,
    pub(crate) auto_submitted: bool,
    pub(crate) created_at: PrimitiveDateTime,
}
