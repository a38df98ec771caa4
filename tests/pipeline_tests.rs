//! Question pipeline: generation, policy gate and execution.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::Connection;
use serde_json::{Map, Value};

use nlsql::context::SchemaContextStore;
use nlsql::executor::{ExecutionError, QueryExecutor, QueryResult, SqliteExecutor};
use nlsql::generator::{QueryGenerator, NO_EXPLANATION};
use nlsql::llm::{LlmError, TextGenerator};
use nlsql::services::{QueryError, QueryService};
use nlsql::validator;

/// Replies with a fixed text and records the prompts it was given.
struct ScriptedModel {
    reply: String,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedModel {
    fn new(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: reply.to_string(),
            prompts: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl TextGenerator for ScriptedModel {
    async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok(self.reply.clone())
    }
}

struct UnreachableModel;

#[async_trait]
impl TextGenerator for UnreachableModel {
    async fn complete(&self, _prompt: &str) -> Result<String, LlmError> {
        Err(LlmError::Connection("connection refused".to_string()))
    }
}

/// Counts calls and returns one canned row.
#[derive(Default)]
struct CountingExecutor {
    calls: AtomicUsize,
}

#[async_trait]
impl QueryExecutor for CountingExecutor {
    async fn execute(&self, _sql: &str) -> Result<QueryResult, ExecutionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut row = Map::new();
        row.insert("total".to_string(), Value::from(42));
        Ok(QueryResult {
            rows: vec![row],
            row_count: 1,
            field_names: vec!["total".to_string()],
        })
    }
}

fn service(
    model: Arc<dyn TextGenerator>,
    executor: Arc<dyn QueryExecutor>,
    context: &str,
) -> QueryService {
    QueryService::new(
        QueryGenerator::new(model),
        executor,
        SchemaContextStore::new(context),
    )
}

#[tokio::test]
async fn test_answer_runs_generated_sql() {
    let model = ScriptedModel::new(
        "SQL:\n```sql\nSELECT SUM(total_amount) AS total FROM tbl_orders WHERE payment_status = 'paid'\n```\n\nEXPLANATION:\nSums paid order totals.",
    );
    let executor = Arc::new(CountingExecutor::default());
    let service = service(model.clone(), executor.clone(), "## Table: tbl_orders");

    let answer = service.answer("  What is our total revenue?  ").await.unwrap();

    assert_eq!(answer.question, "What is our total revenue?");
    assert_eq!(
        answer.generated.sql,
        "SELECT SUM(total_amount) AS total FROM tbl_orders WHERE payment_status = 'paid'"
    );
    assert_eq!(answer.generated.explanation, "Sums paid order totals.");
    assert_eq!(answer.result.row_count, 1);
    assert_eq!(executor.calls.load(Ordering::SeqCst), 1);

    let prompts = model.prompts.lock().unwrap();
    assert!(prompts[0].contains("## Table: tbl_orders"));
    assert!(prompts[0].contains("USER QUESTION: \"What is our total revenue?\""));
}

#[tokio::test]
async fn test_reply_without_explanation() {
    let model = ScriptedModel::new("SQL:\n```sql\nSELECT COUNT(*) FROM tbl_users\n```");
    let executor = Arc::new(CountingExecutor::default());
    let service = service(model, executor, "");

    let answer = service.answer("How many users?").await.unwrap();
    assert_eq!(answer.generated.sql, "SELECT COUNT(*) FROM tbl_users");
    assert_eq!(answer.generated.explanation, NO_EXPLANATION);
}

#[tokio::test]
async fn test_drop_table_rejected_before_execution() {
    let reply = "SQL:\nDROP TABLE tbl_users;\n\nEXPLANATION:\nRemoves the users table.";

    // Generation alone accepts the reply; the policy gate does not.
    let generated = QueryGenerator::new(ScriptedModel::new(reply))
        .generate("delete all users", "")
        .await
        .unwrap();
    assert_eq!(generated.sql, "DROP TABLE tbl_users;");
    assert!(validator::validate(&generated.sql).is_err());

    let executor = Arc::new(CountingExecutor::default());
    let service = service(ScriptedModel::new(reply), executor.clone(), "");
    let err = service.answer("delete all users").await.unwrap_err();

    match err {
        QueryError::Rejected {
            sql,
            explanation,
            rejection,
        } => {
            assert_eq!(sql, "DROP TABLE tbl_users;");
            assert_eq!(explanation, "Removes the users table.");
            assert_eq!(rejection.reason, validator::REJECTION_REASON);
        }
        other => panic!("expected rejection, got {other:?}"),
    }
    assert_eq!(executor.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_blank_question_never_reaches_backends() {
    let model = ScriptedModel::new("SQL: SELECT 1");
    let executor = Arc::new(CountingExecutor::default());
    let service = service(model.clone(), executor.clone(), "");

    assert!(matches!(
        service.answer("   ").await,
        Err(QueryError::EmptyQuestion)
    ));
    assert!(model.prompts.lock().unwrap().is_empty());
    assert_eq!(executor.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_generation_failure() {
    let executor = Arc::new(CountingExecutor::default());
    let service = service(Arc::new(UnreachableModel), executor.clone(), "");

    let err = service.answer("top products").await.unwrap_err();
    assert!(matches!(err, QueryError::Generation(_)));
    assert_eq!(executor.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_answer_against_sqlite() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("dashboarddb.sqlite");
    {
        let conn = Connection::open(&db).unwrap();
        conn.execute_batch(
            r#"
            CREATE TABLE tbl_products (id INTEGER PRIMARY KEY, name TEXT, isHot INTEGER);
            INSERT INTO tbl_products VALUES (1, 'Lamp', 1), (2, 'Desk', 0), (3, 'Chair', 1);
        "#,
        )
        .unwrap();
    }

    let model = ScriptedModel::new(
        "SQL: SELECT id, name FROM tbl_products WHERE isHot = 1 ORDER BY id\nEXPLANATION: Hot products.",
    );
    let executor = Arc::new(SqliteExecutor::open(&db).unwrap());
    let service = service(model, executor, "");

    let answer = service.answer("Which products are hot?").await.unwrap();
    assert_eq!(answer.result.field_names, vec!["id", "name"]);
    assert_eq!(answer.result.row_count, 2);
    assert_eq!(answer.result.rows[1]["name"], "Chair");
}

#[tokio::test]
async fn test_execution_failure() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("empty.sqlite");
    Connection::open(&db)
        .unwrap()
        .execute_batch("CREATE TABLE t (id INTEGER);")
        .unwrap();

    let model = ScriptedModel::new("SELECT * FROM missing_table");
    let executor = Arc::new(SqliteExecutor::open(&db).unwrap());
    let service = service(model, executor, "");

    let err = service.answer("anything").await.unwrap_err();
    assert!(matches!(err, QueryError::Execution(_)));
}
