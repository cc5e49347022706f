//! Translator
//!
//! Two paths, chosen once at construction:
//! - heuristic: the intent matcher, always flagged as heuristic output
//! - model: one chat-completion call whose answer must pass the strict validator
//!
//! On the model path a quota refusal surfaces as `NlqError::QuotaExceeded` and a
//! policy failure as `NlqError::SqlPolicy`. Every other model failure degrades
//! to the heuristic path.

use crate::config::Settings;
use crate::error::{NlqError, Result};
use crate::grammar;
use crate::intent;
use crate::llm::{ChatModel, LlmClient};
use crate::sql::SqlStatement;
use crate::validator::SqlValidator;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

pub const INSTRUCTION: &str = "You are a translator that converts natural language analytics requests into STRICT SQL matching the provided grammar.\n\
Rules:\n\
1. Output ONLY SQL, no commentary.\n\
2. Prefer listing rows (SELECT *) when the user asks to 'find', 'list', 'show' entities.\n\
3. Use aggregates only when user explicitly asks for count/sum/avg/min/max.\n\
4. Preserve safe simplicity: avoid unnecessary columns.\n\
SQL:";

const GRAMMAR_PREAMBLE: &str = "\nYou MUST conform to this restricted SQL grammar (subset shown):\n";
const CONSTRAINTS: &str = "\nConstraints: only SELECT, table default.MOCK_DATA, no other tables, no DDL, no JOIN.";

/// A SQL statement plus whether it came from the heuristic matcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Translation {
    pub sql: SqlStatement,
    pub heuristic: bool,
}

impl Translation {
    fn heuristic(question: &str) -> Self {
        Self {
            sql: intent::translate(question),
            heuristic: true,
        }
    }
}

struct ModelPath {
    client: Arc<dyn ChatModel>,
    system_prompt: String,
    validator: SqlValidator,
}

pub struct Translator {
    model: Option<ModelPath>,
}

/// System instruction: fixed rules, grammar excerpt, table constraints.
pub fn build_system_prompt(grammar_text: &str) -> String {
    format!(
        "{}{}{}{}",
        INSTRUCTION,
        GRAMMAR_PREAMBLE,
        grammar::excerpt(grammar_text),
        CONSTRAINTS
    )
}

impl Translator {
    pub fn heuristic() -> Self {
        Self { model: None }
    }

    pub fn with_model(client: Arc<dyn ChatModel>, grammar_text: &str) -> Self {
        Self {
            model: Some(ModelPath {
                client,
                system_prompt: build_system_prompt(grammar_text),
                validator: SqlValidator::strict(),
            }),
        }
    }

    /// Model path only when mock mode is off and a credential exists. The grammar
    /// file is read here, so a missing file fails at startup.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        if !settings.model_enabled() {
            return Ok(Self::heuristic());
        }
        let client = match LlmClient::from_settings(settings)? {
            Some(client) => client,
            None => return Ok(Self::heuristic()),
        };
        let grammar_text = grammar::load_grammar_text(&settings.grammar_path).map_err(|e| {
            NlqError::Config(format!(
                "Failed to read grammar file {}: {}",
                settings.grammar_path.display(),
                e
            ))
        })?;
        Ok(Self::with_model(Arc::new(client), &grammar_text))
    }

    pub fn uses_model(&self) -> bool {
        self.model.is_some()
    }

    pub async fn translate(&self, question: &str) -> Result<Translation> {
        let model = match &self.model {
            Some(model) => model,
            None => {
                let intent = intent::classify(question);
                debug!(rule = intent.name(), "Heuristic translation");
                return Ok(Translation {
                    sql: intent.to_sql(),
                    heuristic: true,
                });
            }
        };

        debug!(query_preview = %preview(question, 120), "Attempting LLM translation");

        match model.client.complete(&model.system_prompt, question).await {
            Ok(text) => {
                let sql = model.validator.sanitize(&text).map_err(|e| {
                    warn!(error = %e, "Model SQL failed validation");
                    e
                })?;
                Ok(Translation { sql, heuristic: false })
            }
            Err(e) if e.is_quota_exceeded() => Err(NlqError::QuotaExceeded(e.to_string())),
            Err(e) => {
                warn!(error = %e, "LLM path failed; falling back to heuristic");
                Ok(Translation::heuristic(question))
            }
        }
    }
}

fn preview(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
