use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use time::PrimitiveDateTime;

use crate::db::models::{AnswerRecord, Attempt, ExamSession};
use crate::db::types::{AttemptStatus, SessionStatus};
use crate::schemas::user::format_primitive;

#[derive(Debug, Deserialize)]
pub(crate) struct StartAttempt {
    #[serde(alias = "testId")]
    pub(crate) test_id: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SaveAnswers {
    pub(crate) answers: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SubmitAttempt {
    /// Final answer list. When omitted, the draft answers saved on the
    /// session are graded instead.
    #[serde(default)]
    pub(crate) answers: Option<Vec<AnswerPayload>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AnswerPayload {
    #[serde(alias = "questionId")]
    pub(crate) question_id: String,
    pub(crate) value: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct SessionResponse {
    pub(crate) id: String,
    pub(crate) test_id: String,
    pub(crate) started_at: String,
    pub(crate) deadline: String,
    pub(crate) remaining_seconds: i64,
    pub(crate) status: SessionStatus,
    pub(crate) answers: HashMap<String, String>,
}

impl SessionResponse {
    pub(crate) fn from_db(session: ExamSession, now: PrimitiveDateTime) -> Self {
        let remaining = (session.deadline - now).whole_seconds().max(0);
        Self {
            id: session.id,
            test_id: session.test_id,
            started_at: format_primitive(session.started_at),
            deadline: format_primitive(session.deadline),
            remaining_seconds: remaining,
            status: session.status,
            answers: session.answers.0,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct AttemptResponse {
    pub(crate) id: String,
    pub(crate) test_id: String,
    pub(crate) test_name: String,
    pub(crate) student_id: String,
    pub(crate) student_name: Option<String>,
    pub(crate) student_email: Option<String>,
    pub(crate) submitted_at: String,
    pub(crate) status: AttemptStatus,
    pub(crate) answers: Vec<AnswerRecord>,
    pub(crate) auto_score: i32,
    pub(crate) manual_score: i32,
    pub(crate) total_score: i32,
    pub(crate) max_score: i32,
    pub(crate) percent: i32,
    pub(crate) auto_submitted: bool,
}

impl AttemptResponse {
    pub(crate) fn from_db(attempt: Attempt) -> Self {
        Self {
            id: attempt.id,
            test_id: attempt.test_id,
            test_name: attempt.test_name,
            student_id: attempt.student_id,
            student_name: attempt.student_name,
            student_email: attempt.student_email,
            submitted_at: format_primitive(attempt.submitted_at),
            status: attempt.status,
            answers: attempt.answers.0,
            auto_score: attempt.auto_score,
            manual_score: attempt.manual_score,
            total_score: attempt.total_score,
            max_score: attempt.max_score,
            percent: attempt.percent,
            auto_submitted: attempt.auto_submitted,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn remaining_seconds_never_negative() {
        let session = ExamSession {
            id: "s1".to_string(),
            test_id: "t1".to_string(),
            student_id: "st1".to_string(),
            started_at: datetime!(2026-01-01 10:00:00),
            deadline: datetime!(2026-01-01 10:30:00),
            status: SessionStatus::Active,
            answers: sqlx::types::Json(HashMap::new()),
            submitted_at: None,
            created_at: datetime!(2026-01-01 10:00:00),
            updated_at: datetime!(2026-01-01 10:00:00),
        };

        let mid = SessionResponse::from_db(session.clone(), datetime!(2026-01-01 10:10:00));
        assert_eq!(mid.remaining_seconds, 1200);

        let late = SessionResponse::from_db(session, datetime!(2026-01-01 11:00:00));
        assert_eq!(late.remaining_seconds, 0);
    }

    #[test]
    fn submit_payload_accepts_camel_case() {
        let raw = r#"{"answers": [{"questionId": "q1", "value": "B"}]}"#;
        let payload: SubmitAttempt = serde_json::from_str(raw).expect("parse");
        let answers = payload.answers.expect("answers present");
        assert_eq!(answers[0].question_id, "q1");
    }
}
