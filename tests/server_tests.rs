//! HTTP routes exercised in-process.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{Map, Value};
use tower::ServiceExt;

use nlsql::context::{ContextFiles, ContextTemplate, SchemaContextStore};
use nlsql::executor::{ExecutionError, QueryExecutor, QueryResult};
use nlsql::generator::QueryGenerator;
use nlsql::llm::{LlmError, TextGenerator};
use nlsql::server::{create_router, AppState};
use nlsql::services::{QueryService, UploadService};

const BOUNDARY: &str = "nlsql-test-boundary";

struct FixedReply(&'static str);

#[async_trait]
impl TextGenerator for FixedReply {
    async fn complete(&self, _prompt: &str) -> Result<String, LlmError> {
        Ok(self.0.to_string())
    }
}

/// Never answers within the request timeout.
struct StalledModel;

#[async_trait]
impl TextGenerator for StalledModel {
    async fn complete(&self, _prompt: &str) -> Result<String, LlmError> {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Ok("SQL: SELECT 1".to_string())
    }
}

#[derive(Default)]
struct OneRow {
    calls: AtomicUsize,
}

#[async_trait]
impl QueryExecutor for OneRow {
    async fn execute(&self, sql: &str) -> Result<QueryResult, ExecutionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if sql.contains("missing") {
            return Err(ExecutionError::Database("no such table: missing".to_string()));
        }
        let mut row = Map::new();
        row.insert("name".to_string(), Value::from("Lamp"));
        Ok(QueryResult {
            rows: vec![row],
            row_count: 1,
            field_names: vec!["name".to_string()],
        })
    }
}

fn app(dir: &Path, reply: &'static str, executor: Arc<OneRow>) -> Router {
    app_with(dir, Arc::new(FixedReply(reply)), executor, Duration::from_secs(30))
}

fn app_with(
    dir: &Path,
    model: Arc<dyn TextGenerator>,
    executor: Arc<OneRow>,
    request_timeout: Duration,
) -> Router {
    let context = SchemaContextStore::default();
    let files = ContextFiles::new(dir.join("schema-context.md"), dir.join("schema.json"));
    let state = AppState {
        queries: QueryService::new(QueryGenerator::new(model), executor, context.clone()),
        uploads: UploadService::new(files, context.clone(), ContextTemplate::default()),
        context,
        request_timeout,
    };
    create_router(state)
}

fn query_request(body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/query")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn upload_request(field: &str, filename: &str, content: &str) -> Request<Body> {
    let body = format!(
        "--{BOUNDARY}\r\n\
         Content-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\n\
         Content-Type: application/octet-stream\r\n\r\n\
         {content}\r\n\
         --{BOUNDARY}--\r\n"
    );
    Request::builder()
        .method("POST")
        .uri("/api/schema/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_query_success_shape() {
    let dir = tempfile::tempdir().unwrap();
    let reply = "SQL:\nSELECT name FROM tbl_products\nEXPLANATION:\nProduct names.";
    let app = app(dir.path(), reply, Arc::new(OneRow::default()));

    let response = app
        .oneshot(query_request(r#"{"userQuery": "List products"}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["userQuery"], "List products");
    assert_eq!(body["generatedSQL"], "SELECT name FROM tbl_products");
    assert_eq!(body["explanation"], "Product names.");
    assert_eq!(body["rawLLMResponse"], reply);
    assert_eq!(body["data"][0]["name"], "Lamp");
    assert_eq!(body["rowCount"], 1);
    assert_eq!(body["fields"], serde_json::json!(["name"]));
}

#[tokio::test]
async fn test_query_required() {
    let dir = tempfile::tempdir().unwrap();
    let executor = Arc::new(OneRow::default());

    for body in [r#"{}"#, r#"{"userQuery": "  "}"#] {
        let app = app(dir.path(), "SQL: SELECT 1", executor.clone());
        let response = app.oneshot(query_request(body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"], "Query is required");
    }
    assert_eq!(executor.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_rejected_sql_is_a_client_error() {
    let dir = tempfile::tempdir().unwrap();
    let executor = Arc::new(OneRow::default());
    let app = app(
        dir.path(),
        "SQL: DROP TABLE tbl_users\nEXPLANATION: Drops users.",
        executor.clone(),
    );

    let response = app
        .oneshot(query_request(r#"{"userQuery": "remove users"}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = json_body(response).await;
    assert_eq!(body["error"], "Only SELECT queries are allowed");
    assert_eq!(body["generatedSQL"], "DROP TABLE tbl_users");
    assert_eq!(body["explanation"], "Drops users.");
    assert_eq!(executor.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_execution_failure_is_a_server_error() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(dir.path(), "SELECT * FROM missing", Arc::new(OneRow::default()));

    let response = app
        .oneshot(query_request(r#"{"userQuery": "broken"}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body = json_body(response).await;
    assert_eq!(body["error"], "Query execution failed");
    assert!(body["details"].as_str().unwrap().contains("no such table"));
}

#[tokio::test]
async fn test_upload_then_read_context() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(dir.path(), "SQL: SELECT 1", Arc::new(OneRow::default()));

    let ddl = "CREATE TABLE orders (id int primary key, total_amount decimal(10,2), payment_status varchar(20) default 'pending');";
    let response = app
        .clone()
        .oneshot(upload_request("schema", "orders.sql", ddl))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Schema uploaded and processed successfully");
    assert_eq!(body["tablesFound"], 1);
    assert_eq!(body["tables"], serde_json::json!(["orders"]));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/schema/context")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let context = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(context.contains("- payment_status (varchar(20)) [DEFAULT: pending]"));
    assert!(dir.path().join("schema-context.md").exists());
}

#[tokio::test]
async fn test_upload_errors() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(dir.path(), "SQL: SELECT 1", Arc::new(OneRow::default()));

    let response = app
        .clone()
        .oneshot(upload_request("other", "orders.sql", "CREATE TABLE t (id int);"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"], "No file uploaded");

    let response = app
        .oneshot(upload_request("schema", "schema.xlsx", "binary"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["error"], "Failed to process schema");
    assert!(body["details"].as_str().unwrap().contains("schema.xlsx"));
}

#[tokio::test]
async fn test_slow_generation_times_out() {
    let dir = tempfile::tempdir().unwrap();
    let executor = Arc::new(OneRow::default());
    let app = app_with(
        dir.path(),
        Arc::new(StalledModel),
        executor.clone(),
        Duration::from_millis(50),
    );

    let response = app
        .oneshot(query_request(r#"{"userQuery": "List products"}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);
    assert_eq!(executor.calls.load(Ordering::SeqCst), 0);
}
