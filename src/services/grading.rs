use std::collections::HashMap;

use crate::db::models::{AnswerRecord, Question};
use crate::db::types::QuestionType;

/// A raw answer as the student submitted it, before grading.
#[derive(Debug, Clone)]
pub(crate) struct SubmittedAnswer {
    pub(crate) question_id: String,
    pub(crate) value: String,
}

#[derive(Debug, Clone)]
pub(crate) struct GradedAttempt {
    pub(crate) answers: Vec<AnswerRecord>,
    pub(crate) auto_score: i32,
    pub(crate) manual_score: i32,
    pub(crate) total_score: i32,
    pub(crate) max_score: i32,
    pub(crate) percent: i32,
}

/// Maximum achievable score: the point sum over every question of the
/// test, answered or not. A skipped question still counts against the
/// maximum.
pub(crate) fn max_score(questions: &[Question]) -> i32 {
    questions.iter().map(|q| q.points).sum()
}

/// Grades a submission against the test's question list.
///
/// Objective types (mcq, truefalse) compare the trimmed submitted value to
/// the trimmed correct answer with exact, case-sensitive equality. Short
/// answers are left ungraded (`is_correct = None`) for manual review.
/// An answer referencing an unknown question id earns zero credit instead
/// of failing the submission.
pub(crate) fn grade(questions: &[Question], answers: &[SubmittedAnswer]) -> GradedAttempt {
    let by_id: HashMap<&str, &Question> =
        questions.iter().map(|q| (q.id.as_str(), q)).collect();

    let mut auto_score = 0;
    let graded: Vec<AnswerRecord> = answers
        .iter()
        .map(|answer| {
            let Some(question) = by_id.get(answer.question_id.as_str()) else {
                return AnswerRecord {
                    question_id: answer.question_id.clone(),
                    value: answer.value.clone(),
                    is_correct: Some(false),
                    awarded_points: 0,
                };
            };

            match question.qtype {
                QuestionType::Mcq | QuestionType::TrueFalse => {
                    let correct = answer.value.trim() == question.correct_answer.trim();
                    let points = if correct { question.points } else { 0 };
                    auto_score += points;
                    AnswerRecord {
                        question_id: answer.question_id.clone(),
                        value: answer.value.clone(),
                        is_correct: Some(correct),
                        awarded_points: points,
                    }
                }
                QuestionType::Short => AnswerRecord {
                    question_id: answer.question_id.clone(),
                    value: answer.value.clone(),
                    is_correct: None,
                    awarded_points: 0,
                },
            }
        })
        .collect();

    let max = max_score(questions);
    // Manual grading is a reserved workflow; the score is always zero today.
    let manual_score = 0;
    let total_score = auto_score + manual_score;
    let percent =
        if max > 0 { ((total_score as f64 / max as f64) * 100.0).round() as i32 } else { 0 };

    GradedAttempt { answers: graded, auto_score, manual_score, total_score, max_score: max, percent }
}
