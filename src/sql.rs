//! SQL statement type and fixed-table constants

use serde::{Deserialize, Serialize};
use std::fmt;

/// The one table every accepted query must reference.
pub const TABLE: &str = "default.MOCK_DATA";

/// Lowercase identifier the validator searches for.
pub const TABLE_IDENT: &str = "mock_data";

/// An immutable SQL string produced by the translator.
///
/// Transformations (trimming, validation) always build a new statement.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SqlStatement(String);

impl SqlStatement {
    pub fn new(sql: impl Into<String>) -> Self {
        Self(sql.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    /// Leading-keyword check used by the request boundary.
    pub fn is_select(&self) -> bool {
        self.0.trim().to_lowercase().starts_with("select")
    }
}

impl fmt::Display for SqlStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SqlStatement {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Render a ClickHouse string literal, escaping backslashes and quotes.
pub fn quote_literal(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');
    for c in value.chars() {
        if c == '\\' || c == '\'' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('\'');
    out
}
