use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::api::errors::{validation_error, ApiError};
use crate::api::guards::{CurrentProfessor, CurrentUser};
use crate::db::types::UserRole;
use crate::api::pagination::{default_limit, PaginatedResponse};
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::repositories;
use crate::schemas::student::{StudentCreate, StudentResponse, StudentUpdate};

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_students).post(create_student))
        .route("/:student_id", get(get_student).put(update_student).delete(delete_student))
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    #[serde(default)]
    search: Option<String>,
    #[serde(default)]
    year: Option<i32>,
    #[serde(default)]
    skip: i64,
    #[serde(default = "default_limit")]
    limit: i64,
}

async fn list_students(
    State(state): State<AppState>,
    CurrentProfessor(_): CurrentProfessor,
    Query(query): Query<ListQuery>,
) -> Result<Json<PaginatedResponse<StudentResponse>>, ApiError> {
    let students = repositories::students::list(
        state.db(),
        query.search.as_deref(),
        query.year,
        query.skip,
        query.limit,
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to list students"))?;

    Ok(Json(PaginatedResponse {
        items: students.into_iter().map(StudentResponse::from_db).collect(),
        skip: query.skip,
        limit: query.limit,
    }))
}

async fn create_student(
    State(state): State<AppState>,
    CurrentProfessor(_): CurrentProfessor,
    Json(payload): Json<StudentCreate>,
) -> Result<(StatusCode, Json<StudentResponse>), ApiError> {
    payload.validate().map_err(validation_error)?;

    let existing = repositories::students::find_by_email(state.db(), &payload.email)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to check existing student"))?;
    if existing.is_some() {
        return Err(ApiError::Conflict("Student with this email already exists".to_string()));
    }

    let now = primitive_now_utc();
    let student = repositories::students::create(
        state.db(),
        repositories::students::CreateStudent {
            id: &Uuid::new_v4().to_string(),
            email: &payload.email,
            full_name: &payload.full_name,
            jmbag: &payload.jmbag,
            year: payload.year,
            avatar_url: None,
            user_id: None,
            created_at: now,
            updated_at: now,
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create student"))?;

    Ok((StatusCode::CREATED, Json(StudentResponse::from_db(student))))
}

async fn get_student(
    State(state): State<AppState>,
    CurrentProfessor(_): CurrentProfessor,
    Path(student_id): Path<String>,
) -> Result<Json<StudentResponse>, ApiError> {
    let student = repositories::students::find_by_id(state.db(), &student_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load student"))?
        .ok_or_else(|| ApiError::NotFound("Student not found".to_string()))?;

    Ok(Json(StudentResponse::from_db(student)))
}

async fn update_student(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(student_id): Path<String>,
    Json(payload): Json<StudentUpdate>,
) -> Result<Json<StudentResponse>, ApiError> {
    payload.validate().map_err(validation_error)?;

    // Students may edit their own record; professors may edit anyone's.
    if user.role != UserRole::Professor {
        let existing = repositories::students::find_by_id(state.db(), &student_id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to load student"))?
            .ok_or_else(|| ApiError::NotFound("Student not found".to_string()))?;
        if existing.user_id.as_deref() != Some(user.id.as_str()) {
            return Err(ApiError::Forbidden("Not your student record"));
        }
    }

    let student = repositories::students::update(
        state.db(),
        &student_id,
        repositories::students::UpdateStudent {
            full_name: &payload.full_name,
            jmbag: &payload.jmbag,
            year: payload.year,
            updated_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to update student"))?
    .ok_or_else(|| ApiError::NotFound("Student not found".to_string()))?;

    Ok(Json(StudentResponse::from_db(student)))
}

async fn delete_student(
    State(state): State<AppState>,
    CurrentProfessor(_): CurrentProfessor,
    Path(student_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let deleted = repositories::students::delete(state.db(), &student_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to delete student"))?;

    if deleted {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound("Student not found".to_string()))
    }
}
