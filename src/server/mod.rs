//! HTTP API for schema upload and question answering.
//!
//! Routes:
//! - `POST /api/query` answers a natural-language question
//! - `POST /api/schema/upload` replaces the schema context from a file
//! - `GET /api/schema/context` returns the current context

mod handlers;
mod routes;

pub use routes::create_router;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use crate::config::Settings;
use crate::context::SchemaContextStore;
use crate::executor::SqliteExecutor;
use crate::generator::QueryGenerator;
use crate::llm::LlmClient;
use crate::services::{QueryService, UploadService};

/// Shared state for the web server.
#[derive(Clone)]
pub struct AppState {
    pub queries: QueryService,
    pub uploads: UploadService,
    pub context: SchemaContextStore,
    pub request_timeout: Duration,
}

impl AppState {
    pub fn new(settings: &Settings) -> anyhow::Result<Self> {
        settings.ensure_directories()?;
        let files = settings.context_files();
        let context = SchemaContextStore::new(files.load_context()?);

        let llm = Arc::new(LlmClient::new(settings.llm.clone())?);
        let generator = match &settings.llm.sql_prompt {
            Some(prompt) => QueryGenerator::with_prompt(llm, prompt.clone()),
            None => QueryGenerator::new(llm),
        };
        let executor = Arc::new(SqliteExecutor::open(&settings.database_path())?);

        Ok(Self {
            queries: QueryService::new(generator, executor, context.clone()),
            uploads: UploadService::new(files, context.clone(), settings.context.clone()),
            context,
            request_timeout: Duration::from_secs(settings.request_timeout),
        })
    }
}

/// Start the web server.
pub async fn serve(settings: &Settings, host: &str, port: u16) -> anyhow::Result<()> {
    let state = AppState::new(settings)?;
    if state.context.is_empty() {
        tracing::warn!("No schema context loaded; upload one via POST /api/schema/upload");
    }
    let app = create_router(state);

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    tracing::info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
