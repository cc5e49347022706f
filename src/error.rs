use crate::llm::LlmError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum NlqError {
    /// Malformed caller input; carries the offending field name.
    #[error("Validation error on '{field}': {message}")]
    Validation { field: String, message: String },

    /// The language-model service refused service due to usage limits.
    #[error("LLM quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error("SQL policy violation: {0}")]
    SqlPolicy(String),

    #[error("Translation error: {0}")]
    Translation(String),

    #[error("Execution error: {0}")]
    Execution(String),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl NlqError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        NlqError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, NlqError>;
