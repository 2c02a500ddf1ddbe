use sqlx::{FromRow, PgPool};

use crate::db::models::{Question, Test};
use crate::db::types::QuestionType;

const TEST_COLUMNS: &str = "\
    id, name, description, duration, created_by, created_at, updated_at";

const QUESTION_COLUMNS: &str = "\
    id, test_id, position, text, qtype, options, correct_answer, topic, points";

pub(crate) async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<Test>, sqlx::Error> {
    sqlx::query_as::<_, Test>(&format!("SELECT {TEST_COLUMNS} FROM tests WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn questions_for_test(
    executor: impl sqlx::PgExecutor<'_>,
    test_id: &str,
) -> Result<Vec<Question>, sqlx::Error> {
    sqlx::query_as::<_, Question>(&format!(
        "SELECT {QUESTION_COLUMNS} FROM questions WHERE test_id = $1 ORDER BY position ASC"
    ))
    .bind(test_id)
    .fetch_all(executor)
    .await
}

/// One row of the test list: the test plus per-type question counts, so
/// list responses can show a duration estimate without loading questions.
#[derive(Debug, Clone, FromRow)]
pub(crate) struct TestSummaryRow {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) description: Option<String>,
    pub(crate) duration: Option<String>,
    pub(crate) created_by: String,
    pub(crate) created_at: time::PrimitiveDateTime,
    pub(crate) question_count: i64,
    pub(crate) total_points: i64,
    pub(crate) mcq_count: i64,
    pub(crate) truefalse_count: i64,
    pub(crate) short_count: i64,
}

pub(crate) async fn list_summaries(pool: &PgPool) -> Result<Vec<TestSummaryRow>, sqlx::Error> {
    sqlx::query_as::<_, TestSummaryRow>(
        "SELECT t.id, t.name, t.description, t.duration, t.created_by, t.created_at,
            COUNT(q.id) AS question_count,
            COALESCE(SUM(q.points), 0)::BIGINT AS total_points,
            COUNT(q.id) FILTER (WHERE q.qtype = 'mcq') AS mcq_count,
            COUNT(q.id) FILTER (WHERE q.qtype = 'truefalse') AS truefalse_count,
            COUNT(q.id) FILTER (WHERE q.qtype = 'short') AS short_count
         FROM tests t
         LEFT JOIN questions q ON q.test_id = t.id
         GROUP BY t.id
         ORDER BY t.created_at DESC",
    )
    .fetch_all(pool)
    .await
}

pub(crate) struct CreateTest<'a> {
    pub(crate) id: &'a str,
    pub(crate) name: &'a str,
    pub(crate) description: Option<&'a str>,
    pub(crate) duration: Option<&'a str>,
    pub(crate) created_by: &'a str,
    pub(crate) created_at: time::PrimitiveDateTime,
    pub(crate) updated_at: time::PrimitiveDateTime,
}

pub(crate) struct NewQuestion {
    pub(crate) id: String,
    pub(crate) text: String,
    pub(crate) qtype: QuestionType,
    pub(crate) options: Vec<String>,
    pub(crate) correct_answer: String,
    pub(crate) topic: Option<String>,
    pub(crate) points: i32,
}

/// Inserts a test and its question list in one transaction.
pub(crate) async fn create_with_questions(
    pool: &PgPool,
    params: CreateTest<'_>,
    questions: Vec<NewQuestion>,
) -> Result<Test, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let test = sqlx::query_as::<_, Test>(&format!(
        "INSERT INTO tests (id, name, description, duration, created_by, created_at, updated_at)
         VALUES ($1,$2,$3,$4,$5,$6,$7)
         RETURNING {TEST_COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.name)
    .bind(params.description)
    .bind(params.duration)
    .bind(params.created_by)
    .bind(params.created_at)
    .bind(params.updated_at)
    .fetch_one(&mut *tx)
    .await?;

    insert_questions(&mut tx, &test.id, questions).await?;

    tx.commit().await?;
    Ok(test)
}

pub(crate) struct UpdateTest<'a> {
    pub(crate) name: &'a str,
    pub(crate) description: Option<&'a str>,
    pub(crate) duration: Option<&'a str>,
    pub(crate) updated_at: time::PrimitiveDateTime,
}

/// Replaces the test's metadata and its whole question list. Editing
/// individual questions in place is not supported; the frontend always
/// sends the full list.
pub(crate) async fn update_with_questions(
    pool: &PgPool,
    id: &str,
    params: UpdateTest<'_>,
    questions: Vec<NewQuestion>,
) -> Result<Option<Test>, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let Some(test) = sqlx::query_as::<_, Test>(&format!(
        "UPDATE tests SET name = $1, description = $2, duration = $3, updated_at = $4 \
         WHERE id = $5 RETURNING {TEST_COLUMNS}",
    ))
    .bind(params.name)
    .bind(params.description)
    .bind(params.duration)
    .bind(params.updated_at)
    .bind(id)
    .fetch_optional(&mut *tx)
    .await?
    else {
        tx.rollback().await?;
        return Ok(None);
    };

    sqlx::query("DELETE FROM questions WHERE test_id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    insert_questions(&mut tx, id, questions).await?;

    tx.commit().await?;
    Ok(Some(test))
}

async fn insert_questions(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    test_id: &str,
    questions: Vec<NewQuestion>,
) -> Result<(), sqlx::Error> {
    for (position, question) in questions.into_iter().enumerate() {
        sqlx::query(
            "INSERT INTO questions (
                id, test_id, position, text, qtype, options, correct_answer, topic, points
            ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9)",
        )
        .bind(question.id)
        .bind(test_id)
        .bind(position as i32)
        .bind(question.text)
        .bind(question.qtype)
        .bind(sqlx::types::Json(question.options))
        .bind(question.correct_answer)
        .bind(question.topic)
        .bind(question.points)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

/// Deletes the test and its questions. Graded attempts keep their
/// denormalized copy of the test name, so history survives the delete.
pub(crate) async fn delete(pool: &PgPool, id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM tests WHERE id = $1").bind(id).execute(pool).await?;
    Ok(result.rows_affected() > 0)
}
