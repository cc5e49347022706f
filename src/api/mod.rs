//! HTTP-facing API
//!
//! Framework-free request handling: `route` takes a method, path and body and
//! returns a status plus JSON body. The tokio server in `crate::server` does the
//! socket work; tests call `route` directly.

pub mod nl_query_api;
pub mod query_api;

use crate::config::Settings;
use crate::error::{NlqError, Result};
use crate::execution::QueryExecutor;
use crate::translator::Translator;
use serde_json::json;
use thiserror::Error;
use tracing::warn;

pub use nl_query_api::{handle_nl_query, NlQueryRequest, NlQueryResponse};
pub use query_api::{handle_query, QueryRequest, QueryResponse};

/// Everything a request needs, built once at startup.
pub struct AppState {
    pub settings: Settings,
    pub translator: Translator,
    pub executor: QueryExecutor,
}

impl AppState {
    pub fn new(settings: Settings, translator: Translator, executor: QueryExecutor) -> Self {
        Self {
            settings,
            translator,
            executor,
        }
    }

    pub fn from_settings(settings: Settings) -> Result<Self> {
        let translator = Translator::from_settings(&settings)?;
        let executor = QueryExecutor::from_settings(&settings);
        Ok(Self::new(settings, translator, executor))
    }
}

/// Boundary error: the only place internal error kinds become status codes.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{message}")]
    Validation { field: String, message: String },

    #[error("{0}")]
    BadRequest(String),

    #[error("Not Found")]
    NotFound,

    #[error("Method Not Allowed")]
    MethodNotAllowed,

    #[error("{0}")]
    ServiceUnavailable(String),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> u16 {
        match self {
            ApiError::Validation { .. } => 422,
            ApiError::BadRequest(_) => 400,
            ApiError::NotFound => 404,
            ApiError::MethodNotAllowed => 405,
            ApiError::ServiceUnavailable(_) => 503,
            ApiError::Internal(_) => 500,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            ApiError::Validation { field, message } => json!({
                "detail": [{"loc": ["body", field], "msg": message, "type": "value_error"}]
            }),
            other => json!({ "detail": other.to_string() }),
        }
    }
}

impl From<NlqError> for ApiError {
    fn from(err: NlqError) -> Self {
        match err {
            NlqError::Validation { field, message } => ApiError::Validation { field, message },
            NlqError::Json(e) => ApiError::Validation {
                field: "body".to_string(),
                message: format!("Invalid JSON body: {}", e),
            },
            other => ApiError::Internal(other.to_string()),
        }
    }
}

/// Character-count bounds check on a string field.
pub fn validate_length(field: &str, value: &str, min: usize, max: usize) -> Result<()> {
    let len = value.chars().count();
    if len < min {
        return Err(NlqError::validation(
            field,
            format!("String should have at least {} characters", min),
        ));
    }
    if len > max {
        return Err(NlqError::validation(
            field,
            format!("String should have at most {} characters", max),
        ));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn json(status: u16, value: &serde_json::Value) -> Self {
        Self {
            status,
            body: value.to_string(),
        }
    }

    pub fn no_content() -> Self {
        Self {
            status: 204,
            body: String::new(),
        }
    }

    pub fn from_error(err: &ApiError) -> Self {
        Self::json(err.status(), &err.to_json())
    }

    pub fn json_value(&self) -> Option<serde_json::Value> {
        serde_json::from_str(&self.body).ok()
    }
}

fn to_response<T: serde::Serialize>(result: std::result::Result<T, ApiError>) -> HttpResponse {
    match result.and_then(|value| serde_json::to_value(value).map_err(|e| ApiError::Internal(e.to_string()))) {
        Ok(value) => HttpResponse::json(200, &value),
        Err(err) => {
            if err.status() >= 500 {
                warn!(status = err.status(), error = %err, "Request failed");
            }
            HttpResponse::from_error(&err)
        }
    }
}

fn parse_body<T: serde::de::DeserializeOwned>(body: &str) -> std::result::Result<T, ApiError> {
    serde_json::from_str(body).map_err(|e| ApiError::from(NlqError::Json(e)))
}

/// Dispatch one request. CORS preflight (`OPTIONS`) is answered for any path.
pub async fn route(state: &AppState, method: &str, path: &str, body: &str) -> HttpResponse {
    let path = match path.trim_end_matches('/') {
        "" => "/",
        p => p,
    };

    match (method, path) {
        ("OPTIONS", _) => HttpResponse::no_content(),
        ("GET", "/health") => HttpResponse::json(200, &json!({"status": "ok"})),
        ("GET", "/") => HttpResponse::json(200, &json!({"message": "Backend running"})),
        ("POST", "/query") => to_response(parse_body::<QueryRequest>(body).and_then(handle_query)),
        ("POST", "/nl-query") => match parse_body::<NlQueryRequest>(body) {
            Ok(req) => to_response(handle_nl_query(state, req).await),
            Err(err) => HttpResponse::from_error(&err),
        },
        (_, "/health" | "/" | "/query" | "/nl-query") => HttpResponse::from_error(&ApiError::MethodNotAllowed),
        _ => HttpResponse::from_error(&ApiError::NotFound),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> AppState {
        AppState::from_settings(Settings::default()).unwrap()
    }

    #[tokio::test]
    async fn test_health_and_root() {
        let state = state();
        let resp = route(&state, "GET", "/health", "").await;
        assert_eq!(resp.status, 200);
        assert_eq!(resp.json_value().unwrap(), json!({"status": "ok"}));

        let resp = route(&state, "GET", "/", "").await;
        assert_eq!(resp.status, 200);
        assert_eq!(resp.json_value().unwrap()["message"], "Backend running");
    }

    #[tokio::test]
    async fn test_unknown_path_and_wrong_method() {
        let state = state();
        assert_eq!(route(&state, "GET", "/nope", "").await.status, 404);
        assert_eq!(route(&state, "GET", "/nl-query", "").await.status, 405);
        assert_eq!(route(&state, "OPTIONS", "/nl-query", "").await.status, 204);
    }

    #[tokio::test]
    async fn test_trailing_slash_is_normalised() {
        let resp = route(&state(), "GET", "/health/", "").await;
        assert_eq!(resp.status, 200);
    }

    #[tokio::test]
    async fn test_malformed_json_is_422() {
        let resp = route(&state(), "POST", "/nl-query", "{not json").await;
        assert_eq!(resp.status, 422);
        let body = resp.json_value().unwrap();
        assert_eq!(body["detail"][0]["loc"][1], "body");
    }

    #[test]
    fn test_validate_length_bounds() {
        assert!(validate_length("question", "abc", 3, 500).is_ok());
        assert!(validate_length("question", "ab", 3, 500).is_err());
        assert!(validate_length("question", &"x".repeat(500), 3, 500).is_ok());
        assert!(validate_length("question", &"x".repeat(501), 3, 500).is_err());
        // Characters, not bytes
        assert!(validate_length("question", "äöü", 3, 3).is_ok());
    }
}
