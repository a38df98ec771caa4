//! SQLite execution backend.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags};
use serde_json::{Map, Number, Value};
use tracing::info;

use super::{ExecutionError, QueryExecutor, QueryResult};

/// Executes queries against a SQLite file opened read-only.
pub struct SqliteExecutor {
    conn: Arc<Mutex<Connection>>,
    path: PathBuf,
}

impl SqliteExecutor {
    /// Open `db_path` read-only. The file must already exist.
    pub fn open(db_path: &Path) -> Result<Self, ExecutionError> {
        let conn = Connection::open_with_flags(
            db_path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| ExecutionError::Database(e.to_string()))?;

        // Wait out writers from other processes instead of failing immediately
        conn.busy_timeout(Duration::from_secs(5))
            .map_err(|e| ExecutionError::Database(e.to_string()))?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path: db_path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl QueryExecutor for SqliteExecutor {
    async fn execute(&self, sql: &str) -> Result<QueryResult, ExecutionError> {
        let conn = Arc::clone(&self.conn);
        let sql = sql.to_string();
        let started = Instant::now();

        let result = tokio::task::spawn_blocking(move || {
            let conn = conn
                .lock()
                .map_err(|e| ExecutionError::Database(e.to_string()))?;
            run_query(&conn, &sql).map_err(|e| ExecutionError::Database(e.to_string()))
        })
        .await
        .map_err(|e| ExecutionError::Task(e.to_string()))??;

        info!(
            rows = result.row_count,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Query executed"
        );
        Ok(result)
    }
}

fn run_query(conn: &Connection, sql: &str) -> rusqlite::Result<QueryResult> {
    let mut stmt = conn.prepare(sql)?;
    let field_names: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

    let mut rows = Vec::new();
    let mut cursor = stmt.query([])?;
    while let Some(row) = cursor.next()? {
        let mut record = Map::with_capacity(field_names.len());
        for (idx, name) in field_names.iter().enumerate() {
            record.insert(name.clone(), to_json(row.get_ref(idx)?));
        }
        rows.push(record);
    }

    Ok(QueryResult {
        row_count: rows.len(),
        rows,
        field_names,
    })
}

fn to_json(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => Number::from_f64(f).map_or(Value::Null, Value::Number),
        ValueRef::Text(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => Value::String(hex::encode(bytes)),
    }
}
