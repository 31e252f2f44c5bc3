//! Chat-completion capability (OpenAI-compatible endpoint)

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use crate::capability::{Capability, CapabilityError, StateSnapshot};
use crate::config::ModelConfig;

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

/// Delegates the request to a completion model.
///
/// The per-agent instruction becomes the system message; a non-empty state
/// snapshot is appended as a second system message so the model sees what
/// earlier agents in the chain produced.
pub struct ModelCapability {
    http: reqwest::Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
    instruction: Option<String>,
}

impl ModelCapability {
    pub fn new(config: &ModelConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: config.api_key(),
            instruction: None,
        }
    }

    pub fn with_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.instruction = Some(instruction.into());
        self
    }

    fn build_request(&self, request: &str, state: &StateSnapshot) -> ChatRequest {
        let mut messages = Vec::new();
        if let Some(instruction) = &self.instruction {
            messages.push(ChatMessage {
                role: "system",
                content: instruction.clone(),
            });
        }
        if !state.is_empty() {
            messages.push(ChatMessage {
                role: "system",
                content: format!("Session state: {}", json!(state)),
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: request.to_string(),
        });

        ChatRequest {
            model: self.model.clone(),
            messages,
        }
    }
}

#[async_trait]
impl Capability for ModelCapability {
    async fn invoke(&self, request: &str, state: StateSnapshot) -> Result<Value, CapabilityError> {
        let body = self.build_request(request, &state);
        debug!(model = %self.model, "completion request");

        let mut http_request = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .json(&body);
        if let Some(key) = &self.api_key {
            http_request = http_request.bearer_auth(key);
        }

        let response: ChatResponse = http_request
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .ok_or(CapabilityError::MissingField("choices"))?;

        Ok(json!(content))
    }
}
