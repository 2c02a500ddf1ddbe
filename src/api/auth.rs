use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;
use validator::Validate;

use crate::api::errors::{validation_error, ApiError};
use crate::api::guards::CurrentUser;
use crate::core::security;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::User;
use crate::db::types::UserRole;
use crate::repositories;
use crate::schemas::auth::{GoogleLogin, TokenResponse};
use crate::schemas::user::UserResponse;
use crate::services::google_auth::{GoogleAuthError, GoogleProfile};

pub(crate) fn router() -> Router<AppState> {
    Router::new().route("/google", post(google_login)).route("/me", get(me))
}

async fn google_login(
    State(state): State<AppState>,
    Json(payload): Json<GoogleLogin>,
) -> Result<Json<TokenResponse>, ApiError> {
    payload.validate().map_err(validation_error)?;

    let profile = match state.google_auth().verify(&payload.id_token).await {
        Ok(profile) => profile,
        Err(GoogleAuthError::DomainNotAllowed) => {
            return Err(ApiError::Forbidden("Email domain is not allowed"));
        }
        Err(GoogleAuthError::Transport(err)) => {
            return Err(ApiError::internal(err, "Failed to verify Google token"));
        }
        Err(_) => return Err(ApiError::Unauthorized("Invalid Google token")),
    };

    let user = upsert_user(&state, &profile).await?;
    if user.role == UserRole::Student {
        ensure_student_record(&state, &user).await?;
    }

    let access_token = security::create_access_token(&user.id, state.settings(), None)
        .map_err(|e| ApiError::internal(e, "Failed to issue access token"))?;

    Ok(Json(TokenResponse {
        access_token,
        token_type: "bearer".to_string(),
        user: UserResponse::from_db(user),
    }))
}

async fn me(CurrentUser(user): CurrentUser) -> Json<UserResponse> {
    Json(UserResponse::from_db(user))
}

async fn upsert_user(state: &AppState, profile: &GoogleProfile) -> Result<User, ApiError> {
    let now = primitive_now_utc();

    if let Some(existing) = repositories::users::find_by_google_uid(state.db(), &profile.google_uid)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to look up user"))?
    {
        if !existing.is_active {
            return Err(ApiError::Forbidden("Account is disabled"));
        }
        return repositories::users::update_profile(
            state.db(),
            &existing.id,
            &profile.full_name,
            profile.avatar_url.as_deref(),
            now,
        )
        .await
        .map_err(|e| ApiError::internal(e, "Failed to update user profile"));
    }

    repositories::users::create(
        state.db(),
        repositories::users::CreateUser {
            id: &Uuid::new_v4().to_string(),
            google_uid: &profile.google_uid,
            email: &profile.email,
            full_name: &profile.full_name,
            role: profile.role,
            avatar_url: profile.avatar_url.as_deref(),
            created_at: now,
            updated_at: now,
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create user"))
}

/// First student sign-in links the roster row with the matching email, or
/// creates a placeholder row the professor can fill in later.
async fn ensure_student_record(state: &AppState, user: &User) -> Result<(), ApiError> {
    let now = primitive_now_utc();

    let linked = repositories::students::attach_user(state.db(), &user.email, &user.id, now)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to link student record"))?;
    if linked.is_some() {
        return Ok(());
    }

    repositories::students::create(
        state.db(),
        repositories::students::CreateStudent {
            id: &Uuid::new_v4().to_string(),
            email: &user.email,
            full_name: &user.full_name,
            jmbag: "",
            year: 1,
            avatar_url: user.avatar_url.as_deref(),
            user_id: Some(&user.id),
            created_at: now,
            updated_at: now,
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create student record"))?;

    Ok(())
}
