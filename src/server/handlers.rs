//! Request handlers.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Multipart, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use tracing::{error, warn};

use super::AppState;
use crate::services::{QueryError, UploadError};

/// Multipart field carrying the schema file.
const SCHEMA_FIELD: &str = "schema";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
    #[serde(default)]
    user_query: Option<String>,
}

fn error_response(status: StatusCode, error: &str, details: impl ToString) -> Response {
    (
        status,
        Json(json!({ "error": error, "details": details.to_string() })),
    )
        .into_response()
}

/// POST /api/query
pub async fn query(
    State(state): State<AppState>,
    body: Result<Json<QueryRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match body {
        Ok(body) => body,
        Err(rejection) => {
            return error_response(StatusCode::BAD_REQUEST, "Invalid request body", rejection.body_text());
        }
    };
    let question = request.user_query.unwrap_or_default();

    match state.queries.answer(&question).await {
        Ok(answer) => Json(json!({
            "success": true,
            "userQuery": answer.question,
            "generatedSQL": answer.generated.sql,
            "explanation": answer.generated.explanation,
            "rawLLMResponse": answer.generated.raw_response,
            "data": answer.result.rows,
            "rowCount": answer.result.row_count,
            "fields": answer.result.field_names,
        }))
        .into_response(),
        Err(QueryError::EmptyQuestion) => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Query is required" })),
        )
            .into_response(),
        Err(QueryError::Rejected {
            sql, explanation, ..
        }) => (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": "Only SELECT queries are allowed",
                "generatedSQL": sql,
                "explanation": explanation,
            })),
        )
            .into_response(),
        Err(e) => {
            error!("Query failed: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Query execution failed", e)
        }
    }
}

/// POST /api/schema/upload
pub async fn upload_schema(State(state): State<AppState>, mut multipart: Multipart) -> Response {
    let mut upload = None;
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                return error_response(StatusCode::BAD_REQUEST, "Failed to process schema", e.body_text());
            }
        };
        if field.name() != Some(SCHEMA_FIELD) {
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        match field.bytes().await {
            Ok(bytes) => {
                upload = Some((filename, bytes));
                break;
            }
            Err(e) => {
                return error_response(StatusCode::BAD_REQUEST, "Failed to process schema", e.body_text());
            }
        }
    }

    let Some((filename, bytes)) = upload else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "No file uploaded" })),
        )
            .into_response();
    };

    let uploads = state.uploads.clone();
    let outcome = tokio::task::spawn_blocking(move || uploads.upload(&bytes, &filename)).await;

    match outcome {
        Ok(Ok(summary)) => Json(json!({
            "success": true,
            "message": "Schema uploaded and processed successfully",
            "tablesFound": summary.tables_found,
            "tables": summary.tables,
            "path": summary.path,
        }))
        .into_response(),
        Ok(Err(UploadError::Ingest(e))) => {
            warn!("Rejected schema upload: {}", e);
            error_response(StatusCode::BAD_REQUEST, "Failed to process schema", e)
        }
        Ok(Err(e)) => {
            error!("Schema upload failed: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to process schema", e)
        }
        Err(e) => {
            error!("Schema upload task failed: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to process schema", e)
        }
    }
}

/// GET /api/schema/context
pub async fn schema_context(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        state.context.get().to_string(),
    )
}
