//! SQL Safety Validator
//!
//! Allow-list gate applied before any SQL reaches a real database. There is no
//! SQL parser here: the checks are literal prefix and substring tests, which is
//! also why most forbidden keywords are rejected wherever they appear.

use crate::error::{NlqError, Result};
use crate::sql::{SqlStatement, TABLE_IDENT};

/// Rejected as plain substrings.
pub const FORBIDDEN_KEYWORDS: &[&str] = &[
    "insert", "alter", "drop", "truncate", "optimize", "attach", "detach", "rename", "grant",
    "revoke",
];

/// Rejected only as space-bounded words, so `'%update%'` in a literal is allowed.
pub const SPACE_BOUNDED_KEYWORDS: &[&str] = &["update", "delete"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strictness {
    /// Statement must begin with `select`.
    Standard,
    /// Statement must begin with `select ` (single trailing space). Used for model output.
    Strict,
}

#[derive(Debug, Clone)]
pub struct SqlValidator {
    table_ident: String,
    strictness: Strictness,
}

impl Default for SqlValidator {
    fn default() -> Self {
        Self::new(TABLE_IDENT, Strictness::Standard)
    }
}

impl SqlValidator {
    pub fn new(table_ident: &str, strictness: Strictness) -> Self {
        Self {
            table_ident: table_ident.to_lowercase(),
            strictness,
        }
    }

    pub fn strict() -> Self {
        Self::new(TABLE_IDENT, Strictness::Strict)
    }

    pub fn strictness(&self) -> Strictness {
        self.strictness
    }

    /// Check a statement against the policy. The error carries the reason.
    pub fn check(&self, sql: &str) -> Result<()> {
        let lowered = sql.trim().to_lowercase();

        let has_prefix = match self.strictness {
            Strictness::Standard => lowered.starts_with("select"),
            Strictness::Strict => lowered.starts_with("select "),
        };
        if !has_prefix {
            return Err(violation("Only SELECT statements allowed"));
        }
        if lowered.contains(';') {
            return Err(violation("Semicolons not permitted"));
        }
        if !lowered.contains(&self.table_ident) {
            return Err(violation(format!(
                "Query must reference {}",
                self.table_ident.to_uppercase()
            )));
        }
        if let Some(keyword) = FORBIDDEN_KEYWORDS.iter().find(|k| lowered.contains(*k)) {
            return Err(violation(format!("Disallowed keyword present: {}", keyword)));
        }
        let padded = format!(" {} ", lowered);
        if let Some(keyword) = SPACE_BOUNDED_KEYWORDS
            .iter()
            .find(|k| padded.contains(&format!(" {} ", k)))
        {
            return Err(violation(format!("Disallowed keyword present: {}", keyword)));
        }
        Ok(())
    }

    /// Clean up model output (surrounding whitespace, trailing semicolons) and check it.
    pub fn sanitize(&self, candidate: &str) -> Result<SqlStatement> {
        let cleaned = candidate.trim().trim_end_matches(';').trim_end();
        self.check(cleaned)?;
        Ok(SqlStatement::new(cleaned))
    }
}

fn violation(reason: impl Into<String>) -> NlqError {
    NlqError::SqlPolicy(reason.into())
}
