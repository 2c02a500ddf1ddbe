use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::api::errors::{validation_error, ApiError};
use crate::api::guards::{CurrentProfessor, CurrentUser};
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::{Question, Test};
use crate::db::types::UserRole;
use crate::repositories;
use crate::schemas::test::{
    validate_questions, QuestionCreate, TestCreate, TestDetailResponse, TestSummaryResponse,
};
use crate::services::export;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_tests).post(create_test))
        .route("/:test_id", get(get_test).put(update_test).delete(delete_test))
        .route("/:test_id/export", get(export_test))
}

async fn list_tests(
    State(state): State<AppState>,
    CurrentUser(_): CurrentUser,
) -> Result<Json<Vec<TestSummaryResponse>>, ApiError> {
    let rows = repositories::tests::list_summaries(state.db())
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list tests"))?;

    Ok(Json(rows.into_iter().map(TestSummaryResponse::from_db).collect()))
}

async fn create_test(
    State(state): State<AppState>,
    CurrentProfessor(professor): CurrentProfessor,
    Json(payload): Json<TestCreate>,
) -> Result<(StatusCode, Json<TestDetailResponse>), ApiError> {
    payload.validate().map_err(validation_error)?;
    validate_questions(&payload.questions).map_err(ApiError::BadRequest)?;

    let now = primitive_now_utc();
    let test = repositories::tests::create_with_questions(
        state.db(),
        repositories::tests::CreateTest {
            id: &Uuid::new_v4().to_string(),
            name: &payload.name,
            description: payload.description.as_deref(),
            duration: payload.duration.as_deref(),
            created_by: &professor.id,
            created_at: now,
            updated_at: now,
        },
        to_new_questions(payload.questions),
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create test"))?;

    let questions = repositories::tests::questions_for_test(state.db(), &test.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load questions"))?;

    Ok((StatusCode::CREATED, Json(TestDetailResponse::from_db(test, questions, true))))
}

async fn get_test(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(test_id): Path<String>,
) -> Result<Json<TestDetailResponse>, ApiError> {
    let (test, questions) = load_test(&state, &test_id).await?;
    let reveal = user.role == UserRole::Professor;
    Ok(Json(TestDetailResponse::from_db(test, questions, reveal)))
}

async fn update_test(
    State(state): State<AppState>,
    CurrentProfessor(_): CurrentProfessor,
    Path(test_id): Path<String>,
    Json(payload): Json<TestCreate>,
) -> Result<Json<TestDetailResponse>, ApiError> {
    payload.validate().map_err(validation_error)?;
    validate_questions(&payload.questions).map_err(ApiError::BadRequest)?;

    let test = repositories::tests::update_with_questions(
        state.db(),
        &test_id,
        repositories::tests::UpdateTest {
            name: &payload.name,
            description: payload.description.as_deref(),
            duration: payload.duration.as_deref(),
            updated_at: primitive_now_utc(),
        },
        to_new_questions(payload.questions),
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to update test"))?
    .ok_or_else(|| ApiError::NotFound("Test not found".to_string()))?;

    let questions = repositories::tests::questions_for_test(state.db(), &test.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load questions"))?;

    Ok(Json(TestDetailResponse::from_db(test, questions, true)))
}

async fn delete_test(
    State(state): State<AppState>,
    CurrentProfessor(_): CurrentProfessor,
    Path(test_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let deleted = repositories::tests::delete(state.db(), &test_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to delete test"))?;

    if deleted {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound("Test not found".to_string()))
    }
}

#[derive(Debug, Deserialize)]
struct ExportQuery {
    #[serde(default)]
    #[serde(alias = "includeAnswers")]
    include_answers: bool,
    #[serde(default)]
    course: Option<String>,
    #[serde(default)]
    date: Option<String>,
    #[serde(default)]
    #[serde(alias = "nameLine")]
    name_line: bool,
}

async fn export_test(
    State(state): State<AppState>,
    CurrentProfessor(_): CurrentProfessor,
    Path(test_id): Path<String>,
    Query(query): Query<ExportQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let (test, questions) = load_test(&state, &test_id).await?;

    let options = export::ExportOptions {
        include_answers: query.include_answers,
        course_label: query.course,
        date_label: query.date,
        name_line: query.name_line,
    };
    let filename = export::export_filename(&test.name);
    let body = export::render_test(&test, &questions, &options);

    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{filename}\"")),
        ],
        body,
    ))
}

async fn load_test(state: &AppState, test_id: &str) -> Result<(Test, Vec<Question>), ApiError> {
    let test = repositories::tests::find_by_id(state.db(), test_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load test"))?
        .ok_or_else(|| ApiError::NotFound("Test not found".to_string()))?;

    let questions = repositories::tests::questions_for_test(state.db(), test_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load questions"))?;

    Ok((test, questions))
}

fn to_new_questions(questions: Vec<QuestionCreate>) -> Vec<repositories::tests::NewQuestion> {
    questions
        .into_iter()
        .map(|q| repositories::tests::NewQuestion {
            id: Uuid::new_v4().to_string(),
            text: q.text,
            qtype: q.qtype,
            options: q.options,
            correct_answer: q.correct_answer,
            topic: q.topic,
            points: q.points,
        })
        .collect()
}
