use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::db::models::Student;

const COLUMNS: &str = "\
    id, email, full_name, jmbag, year, avatar_url, user_id, created_at, updated_at";

pub(crate) async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<Student>, sqlx::Error> {
    sqlx::query_as::<_, Student>(&format!("SELECT {COLUMNS} FROM students WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn find_by_email(
    pool: &PgPool,
    email: &str,
) -> Result<Option<Student>, sqlx::Error> {
    sqlx::query_as::<_, Student>(&format!("SELECT {COLUMNS} FROM students WHERE email = $1"))
        .bind(email)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn find_by_user_id(
    pool: &PgPool,
    user_id: &str,
) -> Result<Option<Student>, sqlx::Error> {
    sqlx::query_as::<_, Student>(&format!("SELECT {COLUMNS} FROM students WHERE user_id = $1"))
        .bind(user_id)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn list(
    pool: &PgPool,
    search: Option<&str>,
    year: Option<i32>,
    skip: i64,
    limit: i64,
) -> Result<Vec<Student>, sqlx::Error> {
    let mut builder =
        QueryBuilder::<Postgres>::new(format!("SELECT {COLUMNS} FROM students WHERE TRUE"));

    if let Some(search) = search.filter(|s| !s.trim().is_empty()) {
        let pattern = format!("%{}%", search.trim());
        builder.push(" AND (full_name ILIKE ");
        builder.push_bind(pattern.clone());
        builder.push(" OR email ILIKE ");
        builder.push_bind(pattern.clone());
        builder.push(" OR jmbag ILIKE ");
        builder.push_bind(pattern);
        builder.push(")");
    }
    if let Some(year) = year {
        builder.push(" AND year = ");
        builder.push_bind(year);
    }

    builder.push(" ORDER BY full_name ASC OFFSET ");
    builder.push_bind(skip.max(0));
    builder.push(" LIMIT ");
    builder.push_bind(limit.clamp(1, 1000));

    builder.build_query_as::<Student>().fetch_all(pool).await
}

pub(crate) struct CreateStudent<'a> {
    pub(crate) id: &'a str,
    pub(crate) email: &'a str,
    pub(crate) full_name: &'a str,
    pub(crate) jmbag: &'a str,
    pub(crate) year: i32,
    pub(crate) avatar_url: Option<&'a str>,
    pub(crate) user_id: Option<&'a str>,
    pub(crate) created_at: time::PrimitiveDateTime,
    pub(crate) updated_at: time::PrimitiveDateTime,
}

pub(crate) async fn create(
    pool: &PgPool,
    params: CreateStudent<'_>,
) -> Result<Student, sqlx::Error> {
    sqlx::query_as::<_, Student>(&format!(
        "INSERT INTO students (
            id, email, full_name, jmbag, year, avatar_url, user_id,
            created_at, updated_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9)
        RETURNING {COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.email)
    .bind(params.full_name)
    .bind(params.jmbag)
    .bind(params.year)
    .bind(params.avatar_url)
    .bind(params.user_id)
    .bind(params.created_at)
    .bind(params.updated_at)
    .fetch_one(pool)
    .await
}

pub(crate) struct UpdateStudent<'a> {
    pub(crate) full_name: &'a str,
    pub(crate) jmbag: &'a str,
    pub(crate) year: i32,
    pub(crate) updated_at: time::PrimitiveDateTime,
}

pub(crate) async fn update(
    pool: &PgPool,
    id: &str,
    params: UpdateStudent<'_>,
) -> Result<Option<Student>, sqlx::Error> {
    sqlx::query_as::<_, Student>(&format!(
        "UPDATE students SET full_name = $1, jmbag = $2, year = $3, updated_at = $4 \
         WHERE id = $5 RETURNING {COLUMNS}",
    ))
    .bind(params.full_name)
    .bind(params.jmbag)
    .bind(params.year)
    .bind(params.updated_at)
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn delete(pool: &PgPool, id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM students WHERE id = $1").bind(id).execute(pool).await?;
    Ok(result.rows_affected() > 0)
}

/// Links an existing roster row to the signed-in account, or reports that
/// no row with that email exists yet.
pub(crate) async fn attach_user(
    pool: &PgPool,
    email: &str,
    user_id: &str,
    updated_at: time::PrimitiveDateTime,
) -> Result<Option<Student>, sqlx::Error> {
    sqlx::query_as::<_, Student>(&format!(
        "UPDATE students SET user_id = $1, updated_at = $2 \
         WHERE email = $3 RETURNING {COLUMNS}",
    ))
    .bind(user_id)
    .bind(updated_at)
    .bind(email)
    .fetch_optional(pool)
    .await
}
