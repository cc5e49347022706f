//! Echo endpoint

use super::{validate_length, ApiError};
use serde::{Deserialize, Serialize};

pub const TEXT_MIN_CHARS: usize = 1;
pub const TEXT_MAX_CHARS: usize = 5000;

#[derive(Debug, Clone, Deserialize)]
pub struct QueryRequest {
    pub text: String,
    /// Accepted and ignored.
    #[serde(default)]
    pub metadata: Option<serde_json::Map<String, serde_json::Value>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueryResponse {
    pub received: String,
    pub length: usize,
    pub info: String,
}

/// Echo the submitted text, trimmed, with its character count.
pub fn handle_query(req: QueryRequest) -> Result<QueryResponse, ApiError> {
    validate_length("text", &req.text, TEXT_MIN_CHARS, TEXT_MAX_CHARS)?;
    let received = req.text.trim().to_string();
    Ok(QueryResponse {
        length: received.chars().count(),
        received,
        info: "Message received successfully".to_string(),
    })
}
