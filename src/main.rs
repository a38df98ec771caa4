use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use nlsql::config::{load_settings, Settings};
use nlsql::context::SchemaContextStore;
use nlsql::llm::LlmClient;
use nlsql::server::{self, AppState};
use nlsql::services::{QueryError, UploadService};

#[derive(Parser)]
#[command(name = "nlsql")]
#[command(about = "Ask questions about a database in plain language")]
#[command(version)]
struct Cli {
    /// Data directory for the persisted schema context
    #[arg(long, global = true, env = "NLSQL_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// SQLite database queried by generated SQL
    #[arg(long, global = true, env = "NLSQL_DATABASE")]
    database: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API
    Serve {
        /// Address to bind
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Ingest a schema file (.sql, .html, .htm or .json) and replace the context
    Ingest {
        /// Schema file to ingest
        file: PathBuf,
    },
    /// Re-render the context from the last ingested schema
    Render,
    /// Answer one question and print the result
    Ask {
        /// The question in natural language
        question: String,
    },
    /// List models offered by the configured LLM provider
    Models,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("nlsql=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("nlsql=info"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut settings = load_settings().await;
    if let Some(data_dir) = cli.data_dir {
        settings.data_dir = data_dir;
    }
    if let Some(database) = cli.database {
        settings.database = database;
    }

    match cli.command {
        Commands::Serve { host, port } => {
            let host = host.unwrap_or_else(|| settings.host.clone());
            let port = port.unwrap_or(settings.port);
            server::serve(&settings, &host, port).await
        }
        Commands::Ingest { file } => ingest(&settings, &file),
        Commands::Render => render(&settings),
        Commands::Ask { question } => ask(&settings, &question).await,
        Commands::Models => models(&settings).await,
    }
}

fn upload_service(settings: &Settings) -> UploadService {
    UploadService::new(
        settings.context_files(),
        SchemaContextStore::default(),
        settings.context.clone(),
    )
}

fn ingest(settings: &Settings, file: &Path) -> Result<()> {
    let bytes = std::fs::read(file).with_context(|| format!("reading {}", file.display()))?;
    let filename = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let summary = upload_service(settings).upload(&bytes, &filename)?;
    println!(
        "Ingested {} table(s) into {}",
        summary.tables_found,
        summary.path.display()
    );
    for table in &summary.tables {
        println!("  {}", table);
    }
    Ok(())
}

fn render(settings: &Settings) -> Result<()> {
    let summary = upload_service(settings).rerender()?;
    println!(
        "Rendered {} table(s) into {}",
        summary.tables_found,
        summary.path.display()
    );
    Ok(())
}

async fn ask(settings: &Settings, question: &str) -> Result<()> {
    let state = AppState::new(settings)?;

    match state.queries.answer(question).await {
        Ok(answer) => {
            println!("SQL:\n{}\n", answer.generated.sql);
            println!("EXPLANATION:\n{}\n", answer.generated.explanation);
            println!("{}", serde_json::to_string_pretty(&answer.result)?);
            Ok(())
        }
        Err(QueryError::Rejected {
            sql,
            explanation,
            rejection,
        }) => {
            eprintln!("SQL:\n{}\n", sql);
            eprintln!("EXPLANATION:\n{}\n", explanation);
            Err(rejection.into())
        }
        Err(e) => Err(e.into()),
    }
}

async fn models(settings: &Settings) -> Result<()> {
    let client = LlmClient::new(settings.llm.clone())?;
    println!(
        "{:?} at {}",
        client.config().provider,
        client.config().effective_endpoint()
    );
    for model in client.list_models().await? {
        println!("  {}", model);
    }
    Ok(())
}
