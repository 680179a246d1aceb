// src/services/advisor.rs
//! Plant-health advice backed by a hosted chat-completion API.
//!
//! `ask` never fails: missing credentials and transport errors come back as
//! short warning strings so the chat can always render something.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use super::credentials::CredentialResolver;

pub const API_KEY_NAME: &str = "GROQ_API_KEY";
pub const MAX_TOKENS: u32 = 500;
pub const TEMPERATURE: f32 = 0.7;
pub const ERROR_DETAIL_LIMIT: usize = 100;

pub const MISSING_KEY_WARNING: &str =
    "⚠️ Error: GROQ_API_KEY not found in environment or hosted secrets.";

pub const SYSTEM_PROMPT: &str = "You are a plant disease expert and agricultural specialist. \
Always respond in English about plant diseases, plant care, gardening, and agriculture topics only.
Provide practical, scientific advice about:
- Plant disease identification and treatment
- Disease prevention methods
- Plant care and maintenance
- Organic and chemical treatment options
- Environmental factors affecting plant health

If asked about non-plant topics, politely redirect to plant-related topics.
Keep responses helpful, accurate, and focused on plant health.";

#[async_trait]
pub trait AdviceService: Send + Sync {
    async fn ask(&self, prompt: &str) -> String;
}

#[derive(Debug, Error)]
pub enum AdvisorError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("API returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("API returned no choices")]
    EmptyResponse,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: [WireMessage<'a>; 2],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Groq (OpenAI-compatible) chat-completion client.
#[derive(Debug, Clone)]
pub struct GroqAdvisor {
    http: reqwest::Client,
    credentials: CredentialResolver,
    base_url: String,
    model: String,
}

impl GroqAdvisor {
    pub fn new(
        credentials: CredentialResolver,
        base_url: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            credentials,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
        }
    }

    async fn complete(&self, api_key: &str, prompt: &str) -> Result<String, AdvisorError> {
        let body = ChatCompletionRequest {
            model: &self.model,
            messages: [
                WireMessage { role: "system", content: SYSTEM_PROMPT },
                WireMessage { role: "user", content: prompt },
            ],
            max_tokens: MAX_TOKENS,
            temperature: TEMPERATURE,
        };

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AdvisorError::Status { status: status.as_u16(), body });
        }

        let parsed: ChatCompletionResponse = response.json().await?;
        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content.unwrap_or_default())
            .ok_or(AdvisorError::EmptyResponse)
    }
}

#[async_trait]
impl AdviceService for GroqAdvisor {
    async fn ask(&self, prompt: &str) -> String {
        let Some(credential) = self.credentials.resolve(API_KEY_NAME) else {
            warn!("no {API_KEY_NAME} configured");
            return MISSING_KEY_WARNING.to_string();
        };

        match self.complete(&credential.value, prompt).await {
            Ok(text) => {
                info!(model = %self.model, chars = text.len(), "advice received");
                text
            }
            Err(e) => {
                warn!(error = %e, "advice request failed");
                connection_warning(&e.to_string())
            }
        }
    }
}

/// Warning shown inline when the advice call fails; detail is capped.
pub fn connection_warning(detail: &str) -> String {
    let truncated: String = detail.chars().take(ERROR_DETAIL_LIMIT).collect();
    format!("⚠️ Error connecting to plant disease expert: {truncated}...")
}
