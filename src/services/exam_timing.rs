use time::{Duration, PrimitiveDateTime};

use crate::db::models::Question;
use crate::db::types::QuestionType;

const MCQ_MINUTES: i64 = 2;
const TRUEFALSE_MINUTES: i64 = 1;
const SHORT_MINUTES: i64 = 3;

/// Estimated time to complete the test, in whole minutes.
pub(crate) fn estimate_minutes(questions: &[Question]) -> i64 {
    questions
        .iter()
        .map(|q| match q.qtype {
            QuestionType::Mcq => MCQ_MINUTES,
            QuestionType::TrueFalse => TRUEFALSE_MINUTES,
            QuestionType::Short => SHORT_MINUTES,
        })
        .sum()
}

/// Renders a minute count as a human-readable duration ("1h 30m", "45m").
pub(crate) fn format_minutes(minutes: i64) -> String {
    if minutes <= 0 {
        return "—".to_string();
    }
    let hours = minutes / 60;
    let rest = minutes % 60;
    match (hours, rest) {
        (0, m) => format!("{m}m"),
        (h, 0) => format!("{h}h"),
        (h, m) => format!("{h}h {m}m"),
    }
}

/// The display duration for a test: the stored label when the author set
/// one, otherwise the per-question estimate.
pub(crate) fn display_duration(stored: Option<&str>, questions: &[Question]) -> String {
    match stored {
        Some(label) if !label.trim().is_empty() => label.trim().to_string(),
        _ => format_minutes(estimate_minutes(questions)),
    }
}

/// Session deadline: now plus the estimated duration. Tests with no
/// questions get the minimum one-minute window rather than an already
/// expired session.
pub(crate) fn compute_deadline(now: PrimitiveDateTime, questions: &[Question]) -> PrimitiveDateTime {
    let minutes = estimate_minutes(questions).max(1);
    now + Duration::minutes(minutes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::time::primitive_now_utc;
    use crate::test_support;

    #[test]
    fn estimate_weights_by_question_type() {
        let questions = vec![
            test_support::mcq_question("a", "A", 1),
            test_support::mcq_question("b", "B", 1),
            test_support::mcq_question("c", "C", 1),
            test_support::truefalse_question("d", "True", 1),
            test_support::short_question("e", 1),
            test_support::short_question("f", 1),
        ];
        assert_eq!(estimate_minutes(&questions), 13);
    }

    #[test]
    fn empty_test_estimates_zero() {
        assert_eq!(estimate_minutes(&[]), 0);
    }

    #[test]
    fn formats_hours_and_minutes() {
        assert_eq!(format_minutes(90), "1h 30m");
        assert_eq!(format_minutes(120), "2h");
        assert_eq!(format_minutes(45), "45m");
        assert_eq!(format_minutes(0), "—");
    }

    #[test]
    fn stored_duration_wins_over_estimate() {
        let questions = vec![test_support::mcq_question("a", "A", 1)];
        assert_eq!(display_duration(Some("45 minuta"), &questions), "45 minuta");
        assert_eq!(display_duration(Some("   "), &questions), "2m");
        assert_eq!(display_duration(None, &questions), "2m");
    }

    #[test]
    fn deadline_is_estimate_past_now() {
        let now = primitive_now_utc();
        let questions = vec![
            test_support::mcq_question("a", "A", 1),
            test_support::short_question("b", 1),
        ];
        let deadline = compute_deadline(now, &questions);
        assert_eq!(deadline - now, Duration::minutes(5));
    }

    #[test]
    fn deadline_never_starts_expired() {
        let now = primitive_now_utc();
        let deadline = compute_deadline(now, &[]);
        assert!(deadline > now);
    }
}
