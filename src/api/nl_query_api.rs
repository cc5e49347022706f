//! Natural-language query endpoint
//!
//! Sequence: length check -> translate -> SELECT gate -> execute -> respond.

use super::{validate_length, ApiError, AppState};
use crate::error::NlqError;
use crate::execution::ResultSet;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn, Instrument};

pub const QUESTION_MIN_CHARS: usize = 3;
pub const QUESTION_MAX_CHARS: usize = 500;

pub const MOCK_WARNING: &str = "Mock mode enabled: using heuristic translation + sample data";

#[derive(Debug, Clone, Deserialize)]
pub struct NlQueryRequest {
    pub question: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NlQueryResponse {
    pub sql: String,
    pub rows: ResultSet,
    pub mocked: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

pub async fn handle_nl_query(state: &AppState, req: NlQueryRequest) -> Result<NlQueryResponse, ApiError> {
    validate_length("question", &req.question, QUESTION_MIN_CHARS, QUESTION_MAX_CHARS)?;

    let span = tracing::info_span!("nl_query", request_id = %uuid::Uuid::new_v4());
    run_pipeline(state, &req.question).instrument(span).await
}

async fn run_pipeline(state: &AppState, question: &str) -> Result<NlQueryResponse, ApiError> {
    let preview: String = question.chars().take(160).collect();
    info!(question = %preview, "/nl-query received");

    let translation = state.translator.translate(question).await.map_err(|e| match e {
        NlqError::QuotaExceeded(msg) => {
            warn!(error = %msg, "LLM quota exceeded");
            ApiError::ServiceUnavailable(format!("LLM quota exceeded: {}", msg))
        }
        NlqError::SqlPolicy(reason) => {
            warn!(reason = %reason, "Translated SQL rejected by policy");
            ApiError::BadRequest(format!("Generated SQL not allowed: {}", reason))
        }
        other => {
            error!(error = %other, "Translation failed");
            ApiError::Internal(format!("Translation failed: {}", other))
        }
    })?;
    debug!(sql = %translation.sql, heuristic = translation.heuristic, "Translation produced SQL");

    if !translation.sql.is_select() {
        return Err(ApiError::BadRequest(
            "Generated SQL not allowed (must be SELECT)".to_string(),
        ));
    }

    let rows = state.executor.execute(&translation.sql).await.map_err(|e| match e {
        NlqError::SqlPolicy(reason) => ApiError::BadRequest(format!("Safety check failed: {}", reason)),
        NlqError::Execution(msg) => {
            error!(error = %msg, "Execution failed");
            ApiError::Internal(format!("Execution failed: {}", msg))
        }
        other => {
            error!(error = %other, "Execution failed");
            ApiError::Internal(format!("Execution failed: {}", other))
        }
    })?;
    debug!(row_count = rows.len(), "SQL executed");

    let mock_mode = state.settings.mock_mode;
    let mocked = mock_mode || translation.heuristic;
    info!(mocked, "/nl-query success");

    Ok(NlQueryResponse {
        sql: translation.sql.into_string(),
        rows,
        mocked,
        warning: mock_mode.then(|| MOCK_WARNING.to_string()),
    })
}
