//! Eval harness
//!
//! Runs JSONL cases (`{"id", "question", "expect_sql_regex"}`) through the
//! request handler in-process. A case passes when the handler answers 200, the
//! SQL matches the expected pattern case-insensitively and `rows` is a list.

use crate::api::{self, AppState};
use crate::error::{NlqError, Result};
use regex::RegexBuilder;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
pub struct EvalCase {
    pub id: String,
    pub question: String,
    pub expect_sql_regex: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CaseStatus {
    Pass,
    Fail,
    Error,
}

#[derive(Debug, Clone, Serialize)]
pub struct CaseResult {
    pub id: String,
    pub status: CaseStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sql: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mocked: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct EvalReport {
    pub generated_at: chrono::DateTime<chrono::Utc>,
    pub summary: Summary,
    pub results: Vec<CaseResult>,
}

impl EvalReport {
    pub fn all_passed(&self) -> bool {
        self.summary.passed == self.summary.total
    }
}

/// Parse JSONL, skipping blank lines.
pub fn parse_cases(text: &str) -> Result<Vec<EvalCase>> {
    text.lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| serde_json::from_str(line).map_err(NlqError::from))
        .collect()
}

pub fn load_cases(path: &Path) -> Result<Vec<EvalCase>> {
    parse_cases(&std::fs::read_to_string(path)?)
}

pub async fn run(state: &AppState, cases: &[EvalCase]) -> Result<EvalReport> {
    let mut results = Vec::with_capacity(cases.len());
    for case in cases {
        results.push(run_case(state, case).await?);
    }
    let passed = results.iter().filter(|r| r.status == CaseStatus::Pass).count();
    Ok(EvalReport {
        generated_at: chrono::Utc::now(),
        summary: Summary {
            total: cases.len(),
            passed,
            failed: cases.len() - passed,
        },
        results,
    })
}

async fn run_case(state: &AppState, case: &EvalCase) -> Result<CaseResult> {
    let pattern = RegexBuilder::new(&case.expect_sql_regex)
        .case_insensitive(true)
        .build()
        .map_err(|e| NlqError::Config(format!("case {}: invalid regex: {}", case.id, e)))?;

    let body = serde_json::json!({ "question": case.question }).to_string();
    let response = api::route(state, "POST", "/nl-query", &body).await;
    if response.status != 200 {
        return Ok(CaseResult {
            id: case.id.clone(),
            status: CaseStatus::Error,
            sql: None,
            rows: None,
            mocked: None,
            detail: Some(response.body),
        });
    }

    let data: serde_json::Value = serde_json::from_str(&response.body)?;
    let sql = data["sql"].as_str().unwrap_or_default().to_string();
    let rows = data.get("rows").cloned();
    let ok = pattern.is_match(&sql) && rows.as_ref().map_or(false, |r| r.is_array());

    Ok(CaseResult {
        id: case.id.clone(),
        status: if ok { CaseStatus::Pass } else { CaseStatus::Fail },
        sql: Some(sql),
        rows,
        mocked: data["mocked"].as_bool(),
        detail: None,
    })
}
