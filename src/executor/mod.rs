//! Execution boundary for validated SQL.

mod sqlite;

pub use sqlite::SqliteExecutor;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

/// Errors reported by an execution backend.
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Execution task failed: {0}")]
    Task(String),
}

/// Rows returned by a query, keyed by column name.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResult {
    pub rows: Vec<Map<String, Value>>,
    pub row_count: usize,
    pub field_names: Vec<String>,
}

/// Runs one statement against a data store. No retries.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    async fn execute(&self, sql: &str) -> Result<QueryResult, ExecutionError>;
}
