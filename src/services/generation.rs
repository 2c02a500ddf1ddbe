use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

use crate::core::config::AiSettings;
use crate::db::types::QuestionType;

#[derive(Debug, Error)]
pub(crate) enum GenerationError {
    #[error("model request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("model returned status {0}")]
    UpstreamStatus(u16),
    #[error("model returned no choices")]
    EmptyResponse,
    #[error("model output is not a valid test: {0}")]
    InvalidOutput(String),
}

/// A test produced by the model, ready to be shown to the professor for
/// review. The test and every question carry freshly assigned ids so the
/// frontend can edit them before saving.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GeneratedTest {
    #[serde(default)]
    pub(crate) id: String,
    #[serde(alias = "name")]
    pub(crate) title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) description: Option<String>,
    pub(crate) questions: Vec<GeneratedQuestion>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GeneratedQuestion {
    #[serde(default)]
    pub(crate) id: String,
    #[serde(rename = "type")]
    pub(crate) qtype: QuestionType,
    pub(crate) text: String,
    #[serde(default)]
    pub(crate) options: Vec<String>,
    pub(crate) correct_answer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) topic: Option<String>,
    #[serde(default = "default_points")]
    pub(crate) points: i32,
}

fn default_points() -> i32 {
    1
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

/// What the professor asked the model for.
#[derive(Debug, Clone)]
pub(crate) struct GenerationRequest {
    pub(crate) prompt: String,
    pub(crate) num_questions: u32,
    pub(crate) mix: Vec<QuestionType>,
}

impl GenerationRequest {
    fn user_message(&self) -> String {
        let mut message = self.prompt.clone();
        message.push_str(&format!("\n\nGenerate exactly {} questions.", self.num_questions));
        if !self.mix.is_empty() {
            let tags: Vec<&str> = self
                .mix
                .iter()
                .map(|t| match t {
                    QuestionType::Mcq => "mcq",
                    QuestionType::TrueFalse => "truefalse",
                    QuestionType::Short => "short",
                })
                .collect();
            message.push_str(&format!("\nUse only these question types: {}.", tags.join(", ")));
        }
        message
    }
}

const SYSTEM_PROMPT: &str = "\
You generate academic tests as JSON. Respond with a single JSON object and \
nothing else, using exactly this shape:\n\
{\"title\": string, \"description\": string, \"questions\": [{\"type\": \
\"mcq\" | \"truefalse\" | \"short\", \"text\": string, \"options\": \
[string, ...], \"correctAnswer\": string, \"topic\": string, \"points\": \
integer >= 1}]}\n\
Rules: mcq questions have exactly 4 options and correctAnswer is one of \
them verbatim; truefalse questions have no options and correctAnswer is \
\"True\" or \"False\"; short questions have no options and correctAnswer \
is the model answer. Write the test in the language of the prompt.";

/// Calls an OpenAI-compatible chat completions endpoint to draft a test
/// from a professor's free-form prompt.
#[derive(Debug, Clone)]
pub(crate) struct TestGenerationService {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
}

impl TestGenerationService {
    pub(crate) fn new(ai: &AiSettings) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(ai.ai_request_timeout))
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url: ai.openai_base_url.trim_end_matches('/').to_string(),
            api_key: ai.openai_api_key.clone(),
            model: ai.ai_model.clone(),
            max_tokens: ai.ai_max_tokens,
        }
    }

    pub(crate) async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GeneratedTest, GenerationError> {
        let body = json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "response_format": {"type": "json_object"},
            "messages": [
                {"role": "system", "content": SYSTEM_PROMPT},
                {"role": "user", "content": request.user_message()},
            ],
        });

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(GenerationError::UpstreamStatus(status.as_u16()));
        }

        let completion: ChatCompletion = response.json().await?;
        let content = completion
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or(GenerationError::EmptyResponse)?;

        parse_generated(&content)
    }
}

/// Parses and validates the model's JSON output, assigning fresh test and
/// question ids. Models occasionally wrap JSON in markdown fences; those
/// are stripped before parsing.
pub(crate) fn parse_generated(raw: &str) -> Result<GeneratedTest, GenerationError> {
    let trimmed = strip_fences(raw);
    let mut test: GeneratedTest = serde_json::from_str(trimmed)
        .map_err(|err| GenerationError::InvalidOutput(err.to_string()))?;

    if test.title.trim().is_empty() {
        return Err(GenerationError::InvalidOutput("test title is empty".to_string()));
    }
    if test.questions.is_empty() {
        return Err(GenerationError::InvalidOutput("test has no questions".to_string()));
    }

    for (index, question) in test.questions.iter_mut().enumerate() {
        if question.text.trim().is_empty() {
            return Err(GenerationError::InvalidOutput(format!(
                "question {} has no text",
                index + 1
            )));
        }
        if question.points < 1 {
            return Err(GenerationError::InvalidOutput(format!(
                "question {} has invalid points",
                index + 1
            )));
        }
        match question.qtype {
            QuestionType::Mcq => {
                if question.options.len() < 2 {
                    return Err(GenerationError::InvalidOutput(format!(
                        "question {} needs at least two options",
                        index + 1
                    )));
                }
                if !question.options.iter().any(|o| o == &question.correct_answer) {
                    return Err(GenerationError::InvalidOutput(format!(
                        "question {} correct answer is not among the options",
                        index + 1
                    )));
                }
            }
            QuestionType::TrueFalse => {
                question.options.clear();
                if question.correct_answer != "True" && question.correct_answer != "False" {
                    return Err(GenerationError::InvalidOutput(format!(
                        "question {} must answer True or False",
                        index + 1
                    )));
                }
            }
            QuestionType::Short => {
                question.options.clear();
            }
        }
        question.id = Uuid::new_v4().to_string();
    }
    test.id = Uuid::new_v4().to_string();

    Ok(test)
}

fn strip_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}
