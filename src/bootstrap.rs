//! Bootstrap the fixed table: create `default.MOCK_DATA` and seed sample rows
//! when it is empty. Runs through the admin `command` path, not the validated
//! query path.

use crate::error::{NlqError, Result};
use crate::execution::ClickHouseEngine;
use crate::sql::TABLE;
use tracing::info;

pub const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS default.MOCK_DATA (
  id UInt32,
  name String,
  email String,
  age Int64,
  signup_date DateTime,
  country String,
  is_active Bool,
  subscription_plane String,
  last_login DateTime,
  balance Int64
) ENGINE = MergeTree ORDER BY id
";

pub const INSERT_SQL: &str = "
INSERT INTO default.MOCK_DATA (id,name,email,age,signup_date,country,is_active,subscription_plane,last_login,balance) VALUES
  (1,'Alice','alice@example.com',34, now()-interval 10 day,'US',1,'basic',       now()-interval 1 hour,   500),
  (2,'Bob','bob@example.com',41,   now()-interval 20 day,'DE',0,'pro',         now()-interval 5 hour,  1250),
  (3,'Cara','cara@example.com',29,  now()-interval  2 day,'US',1,'enterprise',  now()-interval 30 minute,3000),
  (4,'Dan','dan@example.com',50,    now()-interval 40 day,'FR',1,'basic',       now()-interval 2 hour,   150),
  (5,'Eve','eve@example.com',22,    now()-interval  5 day,'IN',1,'pro',         now()-interval 15 minute,850)
";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapOutcome {
    Seeded,
    AlreadyPopulated(u64),
}

/// Create the table if needed and insert the seed rows only into an empty table.
pub async fn run(engine: &ClickHouseEngine) -> Result<BootstrapOutcome> {
    engine.command(SCHEMA_SQL).await?;

    let rows = engine.query(&format!("SELECT count() AS n FROM {}", TABLE)).await?;
    let count = rows
        .first()
        .and_then(|row| row.get("n"))
        .and_then(row_count)
        .ok_or_else(|| NlqError::Execution("Could not read row count from ClickHouse".to_string()))?;

    if count == 0 {
        engine.command(INSERT_SQL).await?;
        info!("Inserted sample rows into {}", TABLE);
        Ok(BootstrapOutcome::Seeded)
    } else {
        info!("Table already has {} rows; skipping insert", count);
        Ok(BootstrapOutcome::AlreadyPopulated(count))
    }
}

// UInt64 may arrive quoted depending on server settings
fn row_count(value: &serde_json::Value) -> Option<u64> {
    value
        .as_u64()
        .or_else(|| value.as_str().and_then(|s| s.parse().ok()))
}
