//! ClickHouse Execution Engine
//!
//! Talks to the ClickHouse HTTP interface: the statement goes in the POST body,
//! credentials in `X-ClickHouse-User` / `X-ClickHouse-Key`, and results come back
//! in `JSONCompact` format (column metadata + positional rows).

use super::{ExecutionEngine, ResultSet, Row};
use crate::config::ClickHouseSettings;
use crate::error::{NlqError, Result};
use crate::sql::SqlStatement;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct CompactResponse {
    meta: Vec<CompactColumn>,
    data: Vec<Vec<serde_json::Value>>,
}

#[derive(Debug, Deserialize)]
struct CompactColumn {
    name: String,
}

pub struct ClickHouseEngine {
    endpoint: String,
    database: String,
    user: String,
    password: String,
    client: Client,
}

impl ClickHouseEngine {
    /// Build a client from settings. Host, port and database are required.
    pub fn connect(settings: &ClickHouseSettings) -> Result<Self> {
        let (host, port, database) = match (&settings.host, settings.port, &settings.database) {
            (Some(host), Some(port), Some(database)) => (host, port, database),
            _ => {
                return Err(NlqError::Execution(
                    "ClickHouse connection settings incomplete".to_string(),
                ))
            }
        };

        let scheme = if settings.secure { "https" } else { "http" };

        let mut builder = Client::builder()
            .timeout(settings.timeout)
            .connect_timeout(Duration::from_secs(10))
            .tcp_keepalive(Duration::from_secs(60));

        if let Some(ca_path) = &settings.ca_cert {
            let pem = std::fs::read(ca_path).map_err(|e| {
                NlqError::Execution(format!("Failed to read CA certificate {}: {}", ca_path.display(), e))
            })?;
            let cert = reqwest::Certificate::from_pem(&pem)
                .map_err(|e| NlqError::Execution(format!("Invalid CA certificate: {}", e)))?;
            builder = builder.add_root_certificate(cert);
        }

        let client = builder
            .build()
            .map_err(|e| NlqError::Execution(format!("Failed to create HTTP client for ClickHouse: {}", e)))?;

        Ok(Self {
            endpoint: format!("{}://{}:{}/", scheme, host, port),
            database: database.clone(),
            user: settings.user.clone().unwrap_or_else(|| "default".to_string()),
            password: settings.password.clone().unwrap_or_default(),
            client,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn post(&self, sql: &str, format: Option<&str>) -> Result<String> {
        let mut params = vec![("database", self.database.as_str())];
        if let Some(format) = format {
            params.push(("default_format", format));
            params.push(("output_format_json_quote_64bit_integers", "0"));
        }

        let response = self
            .client
            .post(&self.endpoint)
            .query(&params)
            .header("X-ClickHouse-User", &self.user)
            .header("X-ClickHouse-Key", &self.password)
            .body(sql.to_string())
            .send()
            .await
            .map_err(|e| NlqError::Execution(format!("Failed to reach ClickHouse: {}", e)))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| NlqError::Execution(format!("Failed to read ClickHouse response: {}", e)))?;

        if !status.is_success() {
            return Err(NlqError::Execution(format!(
                "ClickHouse query failed with status {}: {}",
                status,
                text.trim()
            )));
        }
        Ok(text)
    }

    /// Run a query and return rows keyed by column name, in declared column order.
    pub async fn query(&self, sql: &str) -> Result<ResultSet> {
        let text = self.post(sql, Some("JSONCompact")).await?;
        let parsed: CompactResponse = serde_json::from_str(&text)
            .map_err(|e| NlqError::Execution(format!("Failed to parse ClickHouse response: {}", e)))?;
        Ok(zip_rows(parsed))
    }

    /// Run a statement that returns no rows (DDL, inserts). Not validated: admin use only.
    pub async fn command(&self, sql: &str) -> Result<()> {
        self.post(sql, None).await.map(|_| ())
    }
}

fn zip_rows(response: CompactResponse) -> ResultSet {
    let columns: Vec<String> = response.meta.into_iter().map(|c| c.name).collect();
    response
        .data
        .into_iter()
        .map(|values| columns.iter().cloned().zip(values).collect::<Row>())
        .collect()
}

#[async_trait]
impl ExecutionEngine for ClickHouseEngine {
    fn name(&self) -> &'static str {
        "clickhouse"
    }

    async fn execute(&self, sql: &SqlStatement) -> Result<ResultSet> {
        debug!(endpoint = %self.endpoint, "Executing on ClickHouse");
        self.query(sql.as_str()).await
    }
}
