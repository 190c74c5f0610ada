use std::env;
use std::time::Duration;

use async_trait::async_trait;
use quiz_core::model::{
    GenerationSettings, GenerationSettingsDraft, QuestionDraft, SettingsError,
};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::{GenerationRequest, QuestionGenerator};
use crate::error::GenerationError;

/// Environment-sourced generation settings.
#[derive(Clone, Debug, Default)]
pub struct GeminiConfig {
    draft: GenerationSettingsDraft,
}

impl GeminiConfig {
    /// Reads `QUIZ_AI_API_KEY`, `QUIZ_AI_MODEL`, `QUIZ_AI_BASE_URL` and
    /// `QUIZ_AI_TIMEOUT_SECS`.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            draft: GenerationSettingsDraft {
                api_key: env::var("QUIZ_AI_API_KEY").ok(),
                model: env::var("QUIZ_AI_MODEL").ok(),
                base_url: env::var("QUIZ_AI_BASE_URL").ok(),
                timeout_secs: env::var("QUIZ_AI_TIMEOUT_SECS")
                    .ok()
                    .and_then(|raw| raw.trim().parse().ok()),
            },
        }
    }

    #[must_use]
    pub fn from_draft(draft: GenerationSettingsDraft) -> Self {
        Self { draft }
    }

    /// Validated settings, or `None` when no API key is configured.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError` for a malformed base URL or timeout.
    pub fn settings(self) -> Result<Option<GenerationSettings>, SettingsError> {
        match self.draft.validate() {
            Ok(settings) => Ok(Some(settings)),
            Err(SettingsError::MissingApiKey) => Ok(None),
            Err(err) => Err(err),
        }
    }
}

/// `generateContent` client for a Gemini-compatible endpoint.
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    settings: Option<GenerationSettings>,
}

impl GeminiClient {
    /// # Errors
    ///
    /// Returns `SettingsError` if the environment holds malformed settings.
    pub fn from_env() -> Result<Self, SettingsError> {
        Ok(Self::new(GeminiConfig::from_env().settings()?))
    }

    #[must_use]
    pub fn new(settings: Option<GenerationSettings>) -> Self {
        Self {
            client: Client::new(),
            settings,
        }
    }

    #[must_use]
    pub fn enabled(&self) -> bool {
        self.settings.is_some()
    }
}

#[async_trait]
impl QuestionGenerator for GeminiClient {
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<Vec<QuestionDraft>, GenerationError> {
        let settings = self.settings.as_ref().ok_or(GenerationError::Disabled)?;

        let url = format!(
            "{}/models/{}:generateContent",
            settings.base_url(),
            settings.model()
        );

        let response = self
            .client
            .post(url)
            .query(&[("key", settings.api_key())])
            .timeout(Duration::from_secs(settings.timeout_secs()))
            .json(&request_body(request))
            .send()
            .await
            .map_err(|e| GenerationError::Transport(e.without_url().to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| GenerationError::Transport(e.without_url().to_string()))?;

        parse_response(status.as_u16(), status.is_success(), &body)
    }
}

//
// ─── WIRE FORMAT ───────────────────────────────────────────────────────────────
//

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    system_instruction: Content,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
    response_schema: Value,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

fn text_content(text: String) -> Content {
    Content {
        parts: vec![Part { text: Some(text) }],
    }
}

fn system_prompt(request: &GenerationRequest) -> String {
    format!(
        "Create a {difficulty} difficulty, competition-level practice test for the \"{topic}\" \
         event. Generate exactly {count} multiple choice questions, each with exactly four \
         options and one correct answer. Return only a JSON array of objects with keys: \
         question, options, correctAnswerIndex (0-3) and explanation. Keep each explanation \
         short and engaging, at most two sentences.",
        difficulty = request.difficulty().as_str(),
        topic = request.topic(),
        count = request.count(),
    )
}

fn response_schema() -> Value {
    json!({
        "type": "ARRAY",
        "items": {
            "type": "OBJECT",
            "properties": {
                "question": { "type": "STRING" },
                "options": { "type": "ARRAY", "items": { "type": "STRING" } },
                "correctAnswerIndex": { "type": "INTEGER" },
                "explanation": { "type": "STRING" }
            },
            "required": ["question", "options", "correctAnswerIndex", "explanation"]
        }
    })
}

fn request_body(request: &GenerationRequest) -> GenerateRequest {
    GenerateRequest {
        contents: vec![text_content(format!(
            "Generate {} {} questions.",
            request.count(),
            request.topic()
        ))],
        system_instruction: text_content(system_prompt(request)),
        generation_config: GenerationConfig {
            response_mime_type: "application/json",
            response_schema: response_schema(),
        },
    }
}

/// Classify a raw HTTP reply into drafts or a typed failure.
fn parse_response(
    status: u16,
    success: bool,
    body: &str,
) -> Result<Vec<QuestionDraft>, GenerationError> {
    if !success {
        let message = serde_json::from_str::<ErrorEnvelope>(body)
            .ok()
            .and_then(|env| env.error.message)
            .filter(|msg| !msg.trim().is_empty())
            .unwrap_or_else(|| "no error message in response".to_string());
        return Err(GenerationError::Service { status, message });
    }

    let envelope: GenerateResponse = serde_json::from_str(body)
        .map_err(|e| GenerationError::Parse(format!("response is not valid JSON: {e}")))?;

    let text = envelope
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .and_then(|content| content.parts.into_iter().next())
        .and_then(|part| part.text)
        .filter(|text| !text.trim().is_empty())
        .ok_or_else(|| GenerationError::Parse("response has no candidate text".into()))?;

    let payload: Value = serde_json::from_str(text.trim())
        .map_err(|e| GenerationError::Parse(format!("candidate text is not valid JSON: {e}")))?;

    serde_json::from_value(payload).map_err(|e| GenerationError::Schema(e.to_string()))
}
