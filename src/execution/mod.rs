//! Query Executor
//!
//! Produces a result set for a SQL statement, either from canned sample data
//! (simulated mode) or from ClickHouse (real mode). The real path re-checks the
//! statement against the safety validator before any connection is attempted.

pub mod clickhouse;
pub mod sample;

use crate::config::{ClickHouseSettings, Settings};
use crate::error::Result;
use crate::sql::SqlStatement;
use crate::validator::SqlValidator;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::debug;

pub use clickhouse::ClickHouseEngine;
pub use sample::SimulatedEngine;

/// Column name to scalar value, in the order the query declared the columns.
pub type Row = serde_json::Map<String, serde_json::Value>;

pub type ResultSet = Vec<Row>;

#[async_trait]
pub trait ExecutionEngine: Send + Sync {
    /// Engine name (e.g., "simulated", "clickhouse")
    fn name(&self) -> &'static str;

    async fn execute(&self, sql: &SqlStatement) -> Result<ResultSet>;
}

/// Builds the real engine on first use.
pub type EngineFactory = Box<dyn Fn() -> Result<Arc<dyn ExecutionEngine>> + Send + Sync>;

enum Backend {
    Simulated(SimulatedEngine),
    Real {
        validator: SqlValidator,
        factory: EngineFactory,
        engine: OnceCell<Arc<dyn ExecutionEngine>>,
    },
}

pub struct QueryExecutor {
    backend: Backend,
}

impl QueryExecutor {
    pub fn simulated() -> Self {
        Self {
            backend: Backend::Simulated(SimulatedEngine),
        }
    }

    /// Real mode against ClickHouse; the client is created by the first query.
    pub fn clickhouse(settings: ClickHouseSettings) -> Self {
        Self::with_engine_factory(Box::new(move || {
            let engine: Arc<dyn ExecutionEngine> = Arc::new(ClickHouseEngine::connect(&settings)?);
            Ok(engine)
        }))
    }

    pub fn with_engine_factory(factory: EngineFactory) -> Self {
        Self {
            backend: Backend::Real {
                validator: SqlValidator::default(),
                factory,
                engine: OnceCell::new(),
            },
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        if settings.mock_mode {
            Self::simulated()
        } else {
            Self::clickhouse(settings.clickhouse.clone())
        }
    }

    pub fn is_simulated(&self) -> bool {
        matches!(self.backend, Backend::Simulated(_))
    }

    pub async fn execute(&self, sql: &SqlStatement) -> Result<ResultSet> {
        match &self.backend {
            Backend::Simulated(engine) => engine.execute(sql).await,
            Backend::Real {
                validator,
                factory,
                engine,
            } => {
                validator.check(sql.as_str())?;
                // Concurrent first callers share a single construction
                let engine = engine.get_or_try_init(|| async { factory() }).await?;
                let rows = engine.execute(sql).await?;
                debug!(engine = engine.name(), row_count = rows.len(), "SQL executed");
                Ok(rows)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NlqError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct EchoEngine;

    #[async_trait]
    impl ExecutionEngine for EchoEngine {
        fn name(&self) -> &'static str {
            "echo"
        }

        async fn execute(&self, sql: &SqlStatement) -> Result<ResultSet> {
            let mut row = Row::new();
            row.insert("sql".to_string(), serde_json::json!(sql.as_str()));
            Ok(vec![row])
        }
    }

    fn counting_executor(builds: Arc<AtomicUsize>) -> QueryExecutor {
        QueryExecutor::with_engine_factory(Box::new(move || {
            builds.fetch_add(1, Ordering::SeqCst);
            let engine: Arc<dyn ExecutionEngine> = Arc::new(EchoEngine);
            Ok(engine)
        }))
    }

    #[tokio::test]
    async fn test_real_mode_rejects_before_connecting() {
        let builds = Arc::new(AtomicUsize::new(0));
        let executor = counting_executor(builds.clone());

        let err = executor
            .execute(&SqlStatement::new("DROP TABLE default.MOCK_DATA"))
            .await
            .unwrap_err();
        assert!(matches!(err, NlqError::SqlPolicy(_)));
        assert_eq!(builds.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_real_mode_builds_engine_once() {
        let builds = Arc::new(AtomicUsize::new(0));
        let executor = Arc::new(counting_executor(builds.clone()));
        let sql = SqlStatement::new("SELECT count(*) FROM default.MOCK_DATA");

        let mut handles = Vec::new();
        for _ in 0..8 {
            let executor = executor.clone();
            let sql = sql.clone();
            handles.push(tokio::spawn(async move { executor.execute(&sql).await }));
        }
        for handle in handles {
            let rows = handle.await.unwrap().unwrap();
            assert_eq!(rows[0]["sql"], "SELECT count(*) FROM default.MOCK_DATA");
        }
        assert_eq!(builds.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_incomplete_clickhouse_settings_fail_as_execution_error() {
        let executor = QueryExecutor::clickhouse(ClickHouseSettings::default());
        assert!(!executor.is_simulated());
        let err = executor
            .execute(&SqlStatement::new("SELECT count(*) FROM default.MOCK_DATA"))
            .await
            .unwrap_err();
        assert!(matches!(err, NlqError::Execution(_)));
    }

    #[test]
    fn test_from_settings_follows_mock_mode() {
        assert!(QueryExecutor::from_settings(&Settings::default()).is_simulated());
        let settings = Settings {
            mock_mode: false,
            ..Settings::default()
        };
        assert!(!QueryExecutor::from_settings(&settings).is_simulated());
    }
}
