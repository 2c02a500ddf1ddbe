use sqlx::PgPool;

use crate::db::models::User;
use crate::db::types::UserRole;

const COLUMNS: &str = "\
    id, google_uid, email, full_name, role, avatar_url, is_active, \
    created_at, updated_at";

pub(crate) async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!("SELECT {COLUMNS} FROM users WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn find_by_google_uid(
    pool: &PgPool,
    google_uid: &str,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!("SELECT {COLUMNS} FROM users WHERE google_uid = $1"))
        .bind(google_uid)
        .fetch_optional(pool)
        .await
}

pub(crate) struct CreateUser<'a> {
    pub(crate) id: &'a str,
    pub(crate) google_uid: &'a str,
    pub(crate) email: &'a str,
    pub(crate) full_name: &'a str,
    pub(crate) role: UserRole,
    pub(crate) avatar_url: Option<&'a str>,
    pub(crate) created_at: time::PrimitiveDateTime,
    pub(crate) updated_at: time::PrimitiveDateTime,
}

pub(crate) async fn create(pool: &PgPool, params: CreateUser<'_>) -> Result<User, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!(
        "INSERT INTO users (
            id, google_uid, email, full_name, role, avatar_url, is_active,
            created_at, updated_at
        ) VALUES ($1,$2,$3,$4,$5,$6,TRUE,$7,$8)
        RETURNING {COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.google_uid)
    .bind(params.email)
    .bind(params.full_name)
    .bind(params.role)
    .bind(params.avatar_url)
    .bind(params.created_at)
    .bind(params.updated_at)
    .fetch_one(pool)
    .await
}

/// Refreshes the mutable profile fields on every sign-in so renamed
/// accounts and new avatars propagate.
pub(crate) async fn update_profile(
    pool: &PgPool,
    id: &str,
    full_name: &str,
    avatar_url: Option<&str>,
    updated_at: time::PrimitiveDateTime,
) -> Result<User, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!(
        "UPDATE users SET full_name = $1, avatar_url = $2, updated_at = $3 \
         WHERE id = $4 RETURNING {COLUMNS}",
    ))
    .bind(full_name)
    .bind(avatar_url)
    .bind(updated_at)
    .bind(id)
    .fetch_one(pool)
    .await
}
