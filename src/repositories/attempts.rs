use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::db::models::{AnswerRecord, Attempt};
use crate::db::types::AttemptStatus;

const COLUMNS: &str = "\
    id, test_id, test_name, student_id, student_name, student_email, \
    submitted_at, status, answers, auto_score, manual_score, total_score, \
    max_score, percent, auto_submitted, created_at";

pub(crate) struct CreateAttempt<'a> {
    pub(crate) id: &'a str,
    pub(crate) test_id: &'a str,
    pub(crate) test_name: &'a str,
    pub(crate) student_id: &'a str,
    pub(crate) student_name: Option<&'a str>,
    pub(crate) student_email: Option<&'a str>,
    pub(crate) submitted_at: time::PrimitiveDateTime,
    pub(crate) status: AttemptStatus,
    pub(crate) answers: &'a [AnswerRecord],
    pub(crate) auto_score: i32,
    pub(crate) manual_score: i32,
    pub(crate) total_score: i32,
    pub(crate) max_score: i32,
    pub(crate) percent: i32,
    pub(crate) auto_submitted: bool,
    pub(crate) created_at: time::PrimitiveDateTime,
}

/// Records a graded attempt. The unique constraint on (test_id, student_id)
/// plus DO NOTHING makes the insert idempotent: a student gets at most one
/// recorded attempt per test no matter how the submission raced.
pub(crate) async fn create(
    pool: &PgPool,
    params: CreateAttempt<'_>,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO attempts (
            id, test_id, test_name, student_id, student_name, student_email,
            submitted_at, status, answers, auto_score, manual_score,
            total_score, max_score, percent, auto_submitted, created_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15,$16)
        ON CONFLICT (test_id, student_id) DO NOTHING",
    )
    .bind(params.id)
    .bind(params.test_id)
    .bind(params.test_name)
    .bind(params.student_id)
    .bind(params.student_name)
    .bind(params.student_email)
    .bind(params.submitted_at)
    .bind(params.status)
    .bind(sqlx::types::Json(params.answers))
    .bind(params.auto_score)
    .bind(params.manual_score)
    .bind(params.total_score)
    .bind(params.max_score)
    .bind(params.percent)
    .bind(params.auto_submitted)
    .bind(params.created_at)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub(crate) async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<Attempt>, sqlx::Error> {
    sqlx::query_as::<_, Attempt>(&format!("SELECT {COLUMNS} FROM attempts WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn find_by_test_and_student(
    executor: impl sqlx::PgExecutor<'_>,
    test_id: &str,
    student_id: &str,
) -> Result<Option<Attempt>, sqlx::Error> {
    sqlx::query_as::<_, Attempt>(&format!(
        "SELECT {COLUMNS} FROM attempts WHERE test_id = $1 AND student_id = $2"
    ))
    .bind(test_id)
    .bind(student_id)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn list(
    pool: &PgPool,
    test_id: Option<&str>,
    student_id: Option<&str>,
    skip: i64,
    limit: i64,
) -> Result<Vec<Attempt>, sqlx::Error> {
    let mut builder =
        QueryBuilder::<Postgres>::new(format!("SELECT {COLUMNS} FROM attempts WHERE TRUE"));

    if let Some(test_id) = test_id {
        builder.push(" AND test_id = ");
        builder.push_bind(test_id);
    }
    if let Some(student_id) = student_id {
        builder.push(" AND student_id = ");
        builder.push_bind(student_id);
    }

    builder.push(" ORDER BY submitted_at DESC OFFSET ");
    builder.push_bind(skip.max(0));
    builder.push(" LIMIT ");
    builder.push_bind(limit.clamp(1, 1000));

    builder.build_query_as::<Attempt>().fetch_all(pool).await
}
