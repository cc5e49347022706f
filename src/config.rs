//! Environment-sourced configuration
//!
//! Every setting is optional and falls back to a default. Settings are built
//! once at process start (`Settings::from_env`) and passed down explicitly.

use crate::error::{NlqError, Result};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_MODEL: &str = "gpt-5";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_GRAMMAR_PATH: &str = "grammars/clickhouse_sql.bnf";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8000";

#[derive(Debug, Clone)]
pub struct Settings {
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub openai_base_url: String,
    pub grammar_path: PathBuf,
    /// Skip real model + database calls when true.
    pub mock_mode: bool,
    pub clickhouse: ClickHouseSettings,
    pub log_level: String,
    pub bind_addr: String,
    pub llm_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct ClickHouseSettings {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub database: Option<String>,
    /// Use TLS (ClickHouse Cloud)
    pub secure: bool,
    pub ca_cert: Option<PathBuf>,
    pub timeout: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            openai_model: DEFAULT_MODEL.to_string(),
            openai_base_url: DEFAULT_BASE_URL.to_string(),
            grammar_path: PathBuf::from(DEFAULT_GRAMMAR_PATH),
            mock_mode: true,
            clickhouse: ClickHouseSettings::default(),
            log_level: "info".to_string(),
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            llm_timeout: Duration::from_secs(60),
        }
    }
}

impl Default for ClickHouseSettings {
    fn default() -> Self {
        Self {
            host: None,
            port: None,
            user: None,
            password: None,
            database: None,
            secure: false,
            ca_cert: None,
            timeout: Duration::from_secs(30),
        }
    }
}

impl Settings {
    /// Load settings from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load settings through an arbitrary key lookup (tests inject a map here).
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Blank values count as unset, so `MOCK_MODE=` keeps the default (on)
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Settings::default();

        // CLICKHOUSE_PORT=0 means "not configured"
        let port = match get("CLICKHOUSE_PORT") {
            Some(raw) => match parse_number::<u16>("CLICKHOUSE_PORT", &raw)? {
                0 => None,
                p => Some(p),
            },
            None => None,
        };

        let llm_timeout = match get("LLM_TIMEOUT_SECS") {
            Some(raw) => Duration::from_secs(parse_number("LLM_TIMEOUT_SECS", &raw)?),
            None => defaults.llm_timeout,
        };
        let db_timeout = match get("DB_TIMEOUT_SECS") {
            Some(raw) => Duration::from_secs(parse_number("DB_TIMEOUT_SECS", &raw)?),
            None => defaults.clickhouse.timeout,
        };

        Ok(Self {
            openai_api_key: get("OPENAI_API_KEY"),
            openai_model: get("OPENAI_MODEL").unwrap_or(defaults.openai_model),
            openai_base_url: get("OPENAI_BASE_URL").unwrap_or(defaults.openai_base_url),
            grammar_path: get("GRAMMAR_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.grammar_path),
            mock_mode: get("MOCK_MODE").map(|v| is_truthy(&v)).unwrap_or(true),
            clickhouse: ClickHouseSettings {
                host: get("CLICKHOUSE_HOST"),
                port,
                user: get("CLICKHOUSE_USER"),
                password: get("CLICKHOUSE_PASSWORD"),
                database: get("CLICKHOUSE_DATABASE"),
                secure: get("CLICKHOUSE_SECURE").map(|v| is_truthy(&v)).unwrap_or(false),
                ca_cert: get("CLICKHOUSE_CA_CERT").map(PathBuf::from),
                timeout: db_timeout,
            },
            log_level: get("LOG_LEVEL")
                .map(|v| v.to_lowercase())
                .unwrap_or(defaults.log_level),
            bind_addr: get("BIND_ADDR").unwrap_or(defaults.bind_addr),
            llm_timeout,
        })
    }

    /// True when questions go to the language model rather than the heuristic matcher.
    pub fn model_enabled(&self) -> bool {
        !self.mock_mode && self.openai_api_key.is_some()
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "1" | "true" | "yes")
}

fn parse_number<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse::<T>()
        .map_err(|_| NlqError::Config(format!("{} must be a non-negative integer, got '{}'", key, raw)))
}
