//! Language-model client
//!
//! `ChatModel` is the seam the translator depends on; `LlmClient` implements it
//! against an OpenAI-compatible `/chat/completions` endpoint.

use crate::config::Settings;
use crate::error::{NlqError, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum LlmError {
    #[error("LLM API returned status {status}: {body}")]
    Http { status: u16, body: String },

    #[error("LLM API call failed: {0}")]
    Transport(String),

    #[error("Failed to parse LLM response: {0}")]
    Decode(String),
}

impl LlmError {
    /// Usage-limit refusal: HTTP 429 or a known quota phrase anywhere in the error.
    pub fn is_quota_exceeded(&self) -> bool {
        if let LlmError::Http { status: 429, .. } = self {
            return true;
        }
        let msg = self.to_string();
        msg.contains("insufficient_quota")
            || msg.contains("You exceeded your current quota")
            || msg.contains("429")
    }
}

#[async_trait]
pub trait ChatModel: Send + Sync {
    /// One system + one user message in, the completion text out.
    async fn complete(&self, system: &str, user: &str) -> std::result::Result<String, LlmError>;
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

#[derive(Clone)]
pub struct LlmClient {
    api_key: String,
    base_url: String,
    model: String,
    client: reqwest::Client,
}

impl LlmClient {
    pub fn new(api_key: String, model: String, base_url: String, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| NlqError::Config(format!("Failed to create HTTP client for LLM: {}", e)))?;

        Ok(Self {
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            client,
        })
    }

    /// `None` when no credential is configured.
    pub fn from_settings(settings: &Settings) -> Result<Option<Self>> {
        match &settings.openai_api_key {
            Some(key) => Ok(Some(Self::new(
                key.clone(),
                settings.openai_model.clone(),
                settings.openai_base_url.clone(),
                settings.llm_timeout,
            )?)),
            None => Ok(None),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl ChatModel for LlmClient {
    async fn complete(&self, system: &str, user: &str) -> std::result::Result<String, LlmError> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": system},
                {"role": "user", "content": user},
            ],
            "temperature": 1,
            "max_completion_tokens": 1024,
            "response_format": {"type": "text"},
        });

        debug!(model = %self.model, system_len = system.len(), query_len = user.len(), "Dispatching LLM request");

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(LlmError::Http {
                status: status.as_u16(),
                body: text,
            });
        }

        let parsed: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Decode(e.to_string()))?;

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::Decode("response contained no choices".to_string()))?;

        Ok(choice.message.content.unwrap_or_default())
    }
}
