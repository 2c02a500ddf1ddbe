use std::collections::HashMap;

use sqlx::PgPool;

use crate::db::models::ExamSession;
use crate::db::types::SessionStatus;

pub(crate) const COLUMNS: &str = "\
    id, test_id, student_id, started_at, deadline, status, answers, \
    submitted_at, created_at, updated_at";

pub(crate) async fn find_by_id(
    pool: &PgPool,
    id: &str,
) -> Result<Option<ExamSession>, sqlx::Error> {
    sqlx::query_as::<_, ExamSession>(&format!("SELECT {COLUMNS} FROM exam_sessions WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn find_active(
    executor: impl sqlx::PgExecutor<'_>,
    test_id: &str,
    student_id: &str,
) -> Result<Option<ExamSession>, sqlx::Error> {
    sqlx::query_as::<_, ExamSession>(&format!(
        "SELECT {COLUMNS} FROM exam_sessions \
         WHERE test_id = $1 AND student_id = $2 AND status = $3"
    ))
    .bind(test_id)
    .bind(student_id)
    .bind(SessionStatus::Active)
    .fetch_optional(executor)
    .await
}

pub(crate) struct CreateSession<'a> {
    pub(crate) id: &'a str,
    pub(crate) test_id: &'a str,
    pub(crate) student_id: &'a str,
    pub(crate) started_at: time::PrimitiveDateTime,
    pub(crate) deadline: time::PrimitiveDateTime,
    pub(crate) created_at: time::PrimitiveDateTime,
    pub(crate) updated_at: time::PrimitiveDateTime,
}

/// Inserts a new active session. The partial unique index on
/// (test_id, student_id) WHERE active makes concurrent starts collapse to
/// one row; the loser of the race gets `false` and re-reads the winner's
/// session.
pub(crate) async fn create(
    executor: impl sqlx::PgExecutor<'_>,
    session: CreateSession<'_>,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO exam_sessions (
            id, test_id, student_id, started_at, deadline, status, answers,
            created_at, updated_at
        ) VALUES ($1,$2,$3,$4,$5,$6,'{}'::jsonb,$7,$8)
        ON CONFLICT DO NOTHING",
    )
    .bind(session.id)
    .bind(session.test_id)
    .bind(session.student_id)
    .bind(session.started_at)
    .bind(session.deadline)
    .bind(SessionStatus::Active)
    .bind(session.created_at)
    .bind(session.updated_at)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Overwrites the draft answer map. Only active sessions within their
/// deadline accept saves; a closed or overdue session returns `None`, so a
/// late submission can only grade what was drafted in time.
pub(crate) async fn save_answers(
    pool: &PgPool,
    id: &str,
    answers: &HashMap<String, String>,
    now: time::PrimitiveDateTime,
) -> Result<Option<ExamSession>, sqlx::Error> {
    sqlx::query_as::<_, ExamSession>(&format!(
        "UPDATE exam_sessions SET answers = $1, updated_at = $2 \
         WHERE id = $3 AND status = $4 AND deadline >= $2 RETURNING {COLUMNS}",
    ))
    .bind(sqlx::types::Json(answers))
    .bind(now)
    .bind(id)
    .bind(SessionStatus::Active)
    .fetch_optional(pool)
    .await
}

/// Claims an active session for final submission. Returns `None` when the
/// session was already closed, which makes submission one-shot even under
/// a double-click or a race with the expiry sweeper.
pub(crate) async fn claim_for_submit(
    pool: &PgPool,
    id: &str,
    status: SessionStatus,
    submitted_at: time::PrimitiveDateTime,
) -> Result<Option<ExamSession>, sqlx::Error> {
    sqlx::query_as::<_, ExamSession>(&format!(
        "UPDATE exam_sessions SET status = $1, submitted_at = $2, updated_at = $2 \
         WHERE id = $3 AND status = $4 RETURNING {COLUMNS}",
    ))
    .bind(status)
    .bind(submitted_at)
    .bind(id)
    .bind(SessionStatus::Active)
    .fetch_optional(pool)
    .await
}

/// Lists active sessions whose deadline (plus the grace window) passed.
/// The sweeper records each one's attempt first and only then closes the
/// session with [`claim_for_submit`], so a session stays claimable until
/// its attempt is safely stored.
pub(crate) async fn find_expired(
    pool: &PgPool,
    now: time::PrimitiveDateTime,
    grace_seconds: u64,
    limit: i64,
) -> Result<Vec<ExamSession>, sqlx::Error> {
    sqlx::query_as::<_, ExamSession>(&format!(
        "SELECT {COLUMNS} FROM exam_sessions \
         WHERE status = $1 AND deadline + make_interval(secs => $2) < $3 \
         ORDER BY deadline ASC LIMIT $4",
    ))
    .bind(SessionStatus::Active)
    .bind(grace_seconds as f64)
    .bind(now)
    .bind(limit)
    .fetch_all(pool)
    .await
}
