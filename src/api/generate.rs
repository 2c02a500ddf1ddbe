use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Deserialize;
use serde_json::json;

use crate::core::state::AppState;
use crate::db::types::QuestionType;
use crate::services::generation::{GenerationError, GenerationRequest};

const DEFAULT_NUM_QUESTIONS: u32 = 10;

#[derive(Debug, Deserialize)]
pub(crate) struct GenerateRequest {
    #[serde(default)]
    prompt: Option<String>,
    #[serde(default)]
    #[serde(alias = "numQuestions")]
    num_questions: Option<u32>,
    #[serde(default)]
    mix: Vec<QuestionType>,
}

impl GenerateRequest {
    /// `None` when the prompt is missing or blank; the question count
    /// falls back to ten, matching the frontend's default.
    fn into_generation_request(self) -> Option<GenerationRequest> {
        let prompt = self.prompt.filter(|p| !p.trim().is_empty())?;
        Some(GenerationRequest {
            prompt,
            num_questions: self.num_questions.unwrap_or(DEFAULT_NUM_QUESTIONS),
            mix: self.mix,
        })
    }
}

/// Drafts a test from a free-form prompt. The response uses camelCase
/// field names and an `{"error": ...}` failure shape because the frontend
/// consumes this endpoint directly.
pub(crate) async fn generate_test(
    State(state): State<AppState>,
    Json(payload): Json<GenerateRequest>,
) -> impl IntoResponse {
    let Some(request) = payload.into_generation_request() else {
        return (StatusCode::BAD_REQUEST, Json(json!({"error": "Prompt is required"})))
            .into_response();
    };

    match state.generation().generate(&request).await {
        Ok(test) => Json(test).into_response(),
        Err(err) => {
            tracing::error!(error = %err, "Test generation failed");
            let message = match err {
                GenerationError::InvalidOutput(_) => "The model returned an invalid test",
                GenerationError::Transport(_) | GenerationError::UpstreamStatus(_) => {
                    "Failed to reach the generation service"
                }
                GenerationError::EmptyResponse => "The model returned no content",
            };
            (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"error": message}))).into_response()
        }
    }
}
