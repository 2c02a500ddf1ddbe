use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::api::errors::ApiError;
use crate::api::guards::{require_student_record, CurrentUser};
use crate::api::pagination::{default_limit, PaginatedResponse};
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::{ExamSession, Student};
use crate::db::types::{AttemptStatus, SessionStatus, UserRole};
use crate::repositories;
use crate::schemas::attempt::{
    AttemptResponse, SaveAnswers, SessionResponse, StartAttempt, SubmitAttempt,
};
use crate::services::{exam_timing, grading};

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_attempts))
        .route("/start", post(start_attempt))
        .route("/:attempt_id", get(get_attempt))
        .route("/sessions/:session_id", get(get_session))
        .route("/sessions/:session_id/answers", post(save_answers))
        .route("/sessions/:session_id/submit", post(submit_attempt))
}

async fn start_attempt(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(payload): Json<StartAttempt>,
) -> Result<Json<SessionResponse>, ApiError> {
    let student = require_student_record(&state, &user).await?;

    let existing =
        repositories::attempts::find_by_test_and_student(state.db(), &payload.test_id, &student.id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to check existing attempt"))?;
    if existing.is_some() {
        return Err(ApiError::Conflict("Test already attempted".to_string()));
    }

    let now = primitive_now_utc();

    // An open session keeps its original deadline; refreshing the page must
    // not restart the clock.
    if let Some(session) =
        repositories::sessions::find_active(state.db(), &payload.test_id, &student.id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to load session"))?
    {
        return Ok(Json(SessionResponse::from_db(session, now)));
    }

    repositories::tests::find_by_id(state.db(), &payload.test_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load test"))?
        .ok_or_else(|| ApiError::NotFound("Test not found".to_string()))?;
    let questions = repositories::tests::questions_for_test(state.db(), &payload.test_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load questions"))?;
    if questions.is_empty() {
        return Err(ApiError::BadRequest("Test has no questions".to_string()));
    }

    let deadline = exam_timing::compute_deadline(now, &questions);
    let created = repositories::sessions::create(
        state.db(),
        repositories::sessions::CreateSession {
            id: &Uuid::new_v4().to_string(),
            test_id: &payload.test_id,
            student_id: &student.id,
            started_at: now,
            deadline,
            created_at: now,
            updated_at: now,
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create session"))?;

    // When two starts race the insert loses to the partial unique index;
    // serve whichever session won.
    if !created {
        tracing::debug!(test_id = %payload.test_id, "Concurrent session start, reusing winner");
    }
    let session = repositories::sessions::find_active(state.db(), &payload.test_id, &student.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load session"))?
        .ok_or_else(|| ApiError::Conflict("Session was closed concurrently".to_string()))?;

    Ok(Json(SessionResponse::from_db(session, now)))
}

async fn get_session(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(session_id): Path<String>,
) -> Result<Json<SessionResponse>, ApiError> {
    let student = require_student_record(&state, &user).await?;
    let session = load_owned_session(&state, &session_id, &student).await?;
    Ok(Json(SessionResponse::from_db(session, primitive_now_utc())))
}

async fn save_answers(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(session_id): Path<String>,
    Json(payload): Json<SaveAnswers>,
) -> Result<Json<SessionResponse>, ApiError> {
    let student = require_student_record(&state, &user).await?;
    load_owned_session(&state, &session_id, &student).await?;

    let now = primitive_now_utc();
    let session =
        repositories::sessions::save_answers(state.db(), &session_id, &payload.answers, now)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to save answers"))?
            .ok_or_else(|| ApiError::Conflict("Session is no longer active".to_string()))?;

    Ok(Json(SessionResponse::from_db(session, now)))
}

async fn submit_attempt(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(session_id): Path<String>,
    Json(payload): Json<SubmitAttempt>,
) -> Result<Json<AttemptResponse>, ApiError> {
    let student = require_student_record(&state, &user).await?;
    let session = load_owned_session(&state, &session_id, &student).await?;

    let now = primitive_now_utc();
    let grace = time::Duration::seconds(state.settings().exam().submit_grace_seconds as i64);
    let late = now > session.deadline + grace;

    if session.status != SessionStatus::Active {
        // Already closed: either a double submit or the expiry sweeper won.
        // Serve the recorded attempt when one exists.
        let attempt = repositories::attempts::find_by_test_and_student(
            state.db(),
            &session.test_id,
            &student.id,
        )
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load attempt"))?;
        return match attempt {
            Some(attempt) => Ok(Json(AttemptResponse::from_db(attempt))),
            None => Err(ApiError::Conflict("Session is no longer active".to_string())),
        };
    }

    // A submission past the grace window keeps only the answers saved
    // before the deadline.
    let answers: Vec<grading::SubmittedAnswer> = match (late, payload.answers) {
        (false, Some(list)) => list
            .into_iter()
            .map(|a| grading::SubmittedAnswer { question_id: a.question_id, value: a.value })
            .collect(),
        _ => draft_answers(&session),
    };

    // The attempt is stored before the session is closed, so a failure here
    // leaves the session active and the submit retryable. The unique
    // constraint keeps the first stored attempt when submissions race.
    let attempt = record_attempt(&state, &session, &student, answers, false, now).await?;

    let status = if late { SessionStatus::Expired } else { SessionStatus::Submitted };
    repositories::sessions::claim_for_submit(state.db(), &session_id, status, now)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to close session"))?;

    Ok(Json(AttemptResponse::from_db(attempt)))
}

/// Grades the answers and records the attempt. The unique constraint keeps
/// the first recorded attempt when submission paths race.
pub(crate) async fn record_attempt(
    state: &AppState,
    session: &ExamSession,
    student: &Student,
    answers: Vec<grading::SubmittedAnswer>,
    auto_submitted: bool,
    now: time::PrimitiveDateTime,
) -> Result<crate::db::models::Attempt, ApiError> {
    let test = repositories::tests::find_by_id(state.db(), &session.test_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load test"))?;
    let test_name = test.as_ref().map(|t| t.name.as_str()).unwrap_or("(deleted test)");
    let questions = repositories::tests::questions_for_test(state.db(), &session.test_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load questions"))?;

    let graded = grading::grade(&questions, &answers);
    let has_pending_manual = graded.answers.iter().any(|a| a.is_correct.is_none());
    let status = if has_pending_manual { AttemptStatus::Submitted } else { AttemptStatus::Graded };

    repositories::attempts::create(
        state.db(),
        repositories::attempts::CreateAttempt {
            id: &Uuid::new_v4().to_string(),
            test_id: &session.test_id,
            test_name,
            student_id: &student.id,
            student_name: Some(&student.full_name),
            student_email: Some(&student.email),
            submitted_at: now,
            status,
            answers: &graded.answers,
            auto_score: graded.auto_score,
            manual_score: graded.manual_score,
            total_score: graded.total_score,
            max_score: graded.max_score,
            percent: graded.percent,
            auto_submitted,
            created_at: now,
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to record attempt"))?;

    repositories::attempts::find_by_test_and_student(state.db(), &session.test_id, &student.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load attempt"))?
        .ok_or_else(|| ApiError::Internal("Recorded attempt disappeared".to_string()))
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    #[serde(default)]
    #[serde(alias = "testId")]
    test_id: Option<String>,
    #[serde(default)]
    #[serde(alias = "studentId")]
    student_id: Option<String>,
    #[serde(default)]
    skip: i64,
    #[serde(default = "default_limit")]
    limit: i64,
}

async fn list_attempts(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<ListQuery>,
) -> Result<Json<PaginatedResponse<AttemptResponse>>, ApiError> {
    // Students see only their own attempts regardless of the filters.
    let student_filter = match user.role {
        UserRole::Professor => query.student_id.clone(),
        UserRole::Student => {
            let student = require_student_record(&state, &user).await?;
            Some(student.id)
        }
    };

    let attempts = repositories::attempts::list(
        state.db(),
        query.test_id.as_deref(),
        student_filter.as_deref(),
        query.skip,
        query.limit,
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to list attempts"))?;

    Ok(Json(PaginatedResponse {
        items: attempts.into_iter().map(AttemptResponse::from_db).collect(),
        skip: query.skip,
        limit: query.limit,
    }))
}

async fn get_attempt(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(attempt_id): Path<String>,
) -> Result<Json<AttemptResponse>, ApiError> {
    let attempt = repositories::attempts::find_by_id(state.db(), &attempt_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load attempt"))?
        .ok_or_else(|| ApiError::NotFound("Attempt not found".to_string()))?;

    if user.role == UserRole::Student {
        let student = require_student_record(&state, &user).await?;
        if attempt.student_id != student.id {
            return Err(ApiError::Forbidden("Not your attempt"));
        }
    }

    Ok(Json(AttemptResponse::from_db(attempt)))
}

async fn load_owned_session(
    state: &AppState,
    session_id: &str,
    student: &Student,
) -> Result<ExamSession, ApiError> {
    let session = repositories::sessions::find_by_id(state.db(), session_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load session"))?
        .ok_or_else(|| ApiError::NotFound("Session not found".to_string()))?;

    if session.student_id != student.id {
        return Err(ApiError::Forbidden("Not your session"));
    }

    Ok(session)
}

fn draft_answers(session: &ExamSession) -> Vec<grading::SubmittedAnswer> {
    session
        .answers
        .0
        .iter()
        .map(|(question_id, value)| grading::SubmittedAnswer {
            question_id: question_id.clone(),
            value: value.clone(),
        })
        .collect()
}
