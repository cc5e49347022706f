//! Simulated execution against a fixed in-memory sample
//!
//! Only the leading tokens of the statement are inspected. This is a stand-in
//! for a database, not a SQL interpreter.

use super::{ExecutionEngine, ResultSet, Row};
use crate::error::Result;
use crate::sql::SqlStatement;
use async_trait::async_trait;
use serde_json::{json, Value};

/// Three rows shaped like the fixed table.
pub fn sample_rows() -> ResultSet {
    [
        json!({
            "id": 1,
            "name": "Alice",
            "email": "alice@example.com",
            "age": 34,
            "signup_date": "2025-09-17T10:00:00",
            "country": "US",
            "is_active": true,
            "subscription_plane": "basic",
            "last_login": "2025-09-27T09:00:00",
            "balance": 500
        }),
        json!({
            "id": 2,
            "name": "Bob",
            "email": "bob@example.com",
            "age": 41,
            "signup_date": "2025-09-07T18:30:00",
            "country": "DE",
            "is_active": false,
            "subscription_plane": "pro",
            "last_login": "2025-09-27T05:00:00",
            "balance": 1250
        }),
        json!({
            "id": 3,
            "name": "Cara",
            "email": "cara@example.com",
            "age": 29,
            "signup_date": "2025-09-25T02:15:00",
            "country": "US",
            "is_active": true,
            "subscription_plane": "enterprise",
            "last_login": "2025-09-27T09:30:00",
            "balance": 3000
        }),
    ]
    .into_iter()
    .filter_map(|v| match v {
        Value::Object(map) => Some(map),
        _ => None,
    })
    .collect()
}

pub struct SimulatedEngine;

impl SimulatedEngine {
    /// Canned shapes: count, sum, avg, or the full sample.
    pub fn respond(sql: &str) -> ResultSet {
        let rows = sample_rows();
        let lowered = sql.trim_start().to_lowercase();

        match leading_aggregate(&lowered) {
            Some("count") => vec![single("count", json!(rows.len()))],
            Some("sum") => vec![single("sum", json!(round2(total_balance(&rows))))],
            Some("avg") => {
                let avg = if rows.is_empty() {
                    0.0
                } else {
                    total_balance(&rows) / rows.len() as f64
                };
                vec![single("avg", json!(round2(avg)))]
            }
            _ => rows,
        }
    }
}

/// Function name of the first select item when it is a call, e.g. `count` for
/// `select count(*) ...`. `select country, count(*) ...` yields `None`.
fn leading_aggregate(lowered: &str) -> Option<&str> {
    let mut tokens = lowered.split_whitespace();
    if tokens.next()? != "select" {
        return None;
    }
    let (name, _) = tokens.next()?.split_once('(')?;
    Some(name)
}

#[async_trait]
impl ExecutionEngine for SimulatedEngine {
    fn name(&self) -> &'static str {
        "simulated"
    }

    async fn execute(&self, sql: &SqlStatement) -> Result<ResultSet> {
        Ok(Self::respond(sql.as_str()))
    }
}

fn single(column: &str, value: Value) -> Row {
    let mut row = Row::new();
    row.insert(column.to_string(), value);
    row
}

fn total_balance(rows: &[Row]) -> f64 {
    rows.iter()
        .filter_map(|r| r.get("balance").and_then(Value::as_f64))
        .sum()
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_shape() {
        let rows = SimulatedEngine::respond("SELECT count(*) FROM default.MOCK_DATA");
        assert_eq!(serde_json::to_value(&rows).unwrap(), json!([{"count": 3}]));
    }

    #[test]
    fn test_sum_and_avg_are_rounded() {
        let rows = SimulatedEngine::respond("select sum(balance) FROM default.MOCK_DATA");
        assert_eq!(rows[0]["sum"].as_f64(), Some(4750.0));

        let rows = SimulatedEngine::respond("SELECT avg(age) FROM default.MOCK_DATA");
        assert_eq!(rows[0]["avg"].as_f64(), Some(1583.33));
    }

    #[test]
    fn test_anything_else_returns_full_sample() {
        let rows = SimulatedEngine::respond("SELECT * FROM default.MOCK_DATA WHERE country = 'US'");
        assert_eq!(rows.len(), 3);
        // Grouped counts are not interpreted either
        let rows = SimulatedEngine::respond(
            "SELECT country, count(*) AS cnt FROM default.MOCK_DATA GROUP BY country ORDER BY cnt DESC",
        );
        assert_eq!(rows, sample_rows());
    }

    #[test]
    fn test_leading_aggregate_reads_first_select_item() {
        assert_eq!(leading_aggregate("select count(*) from t"), Some("count"));
        assert_eq!(leading_aggregate("select avg(age) from t"), Some("avg"));
        assert_eq!(leading_aggregate("select country, count(*) as cnt from t"), None);
        assert_eq!(leading_aggregate("select * from t"), None);
        assert_eq!(leading_aggregate("show tables"), None);
    }

    #[test]
    fn test_sample_columns_keep_declared_order() {
        let rows = sample_rows();
        let columns: Vec<&str> = rows[0].keys().map(String::as_str).collect();
        assert_eq!(
            columns,
            [
                "id", "name", "email", "age", "signup_date", "country", "is_active",
                "subscription_plane", "last_login", "balance"
            ]
        );
    }
}
