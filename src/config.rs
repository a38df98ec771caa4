//! Configuration management for nlsql using the prefer crate.

use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::context::{ContextFiles, ContextTemplate};
use crate::llm::LlmConfig;

/// File name of the rendered context inside the data directory.
pub const CONTEXT_FILENAME: &str = "schema-context.md";
/// File name of the normalized schema inside the data directory.
pub const SCHEMA_FILENAME: &str = "schema.json";

/// Application settings.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Base data directory.
    pub data_dir: PathBuf,
    /// Database queried by generated SQL; relative paths resolve against `data_dir`.
    pub database: PathBuf,
    /// Address the web server binds to.
    pub host: String,
    /// Port the web server listens on.
    pub port: u16,
    /// Request timeout in seconds for the HTTP API.
    pub request_timeout: u64,
    /// LLM configuration for SQL generation.
    pub llm: LlmConfig,
    /// Static sections of the rendered context.
    pub context: ContextTemplate,
}

impl Default for Settings {
    fn default() -> Self {
        // Default to ~/.local/share/nlsql (or the platform equivalent)
        let data_dir = dirs::data_dir()
            .unwrap_or_else(|| dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
            .join("nlsql");

        Self {
            data_dir,
            database: PathBuf::from("nlsql.db"),
            host: "127.0.0.1".to_string(),
            port: 3000,
            request_timeout: 180,
            llm: LlmConfig::default(),
            context: ContextTemplate::default(),
        }
    }
}

impl Settings {
    /// Create settings with a custom data directory.
    pub fn with_data_dir(data_dir: PathBuf) -> Self {
        Self {
            data_dir,
            ..Default::default()
        }
    }

    /// Get the full path to the database.
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(&self.database)
    }

    /// Where the rendered context and normalized schema are kept.
    pub fn context_files(&self) -> ContextFiles {
        ContextFiles::new(
            self.data_dir.join(CONTEXT_FILENAME),
            self.data_dir.join(SCHEMA_FILENAME),
        )
    }

    /// Ensure all directories exist.
    pub fn ensure_directories(&self) -> std::io::Result<()> {
        fs::create_dir_all(&self.data_dir)
    }
}

/// Configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Data directory for persisted context files.
    #[serde(default)]
    pub data_dir: Option<String>,
    /// Database path.
    #[serde(default)]
    pub database: Option<String>,
    /// Server bind address.
    #[serde(default)]
    pub host: Option<String>,
    /// Server port.
    #[serde(default)]
    pub port: Option<u16>,
    /// Request timeout in seconds.
    #[serde(default)]
    pub request_timeout: Option<u64>,
    /// LLM configuration for SQL generation.
    #[serde(default)]
    pub llm: LlmConfig,
    /// Context template overrides.
    #[serde(default)]
    pub context: ContextTemplate,
}

impl Config {
    /// Load configuration using prefer crate.
    /// Automatically discovers nlsql config files in standard locations.
    pub async fn load() -> Self {
        match prefer::load("nlsql").await {
            Ok(pref_config) => {
                let data_dir: Option<String> = pref_config.get("data_dir").await.ok();
                let database: Option<String> = pref_config.get("database").await.ok();
                let host: Option<String> = pref_config.get("host").await.ok();
                let port: Option<u16> = pref_config.get("port").await.ok();
                let request_timeout: Option<u64> = pref_config.get("request_timeout").await.ok();
                let llm: LlmConfig = pref_config.get("llm").await.unwrap_or_default();
                let context: ContextTemplate =
                    pref_config.get("context").await.unwrap_or_default();

                Config {
                    data_dir,
                    database,
                    host,
                    port,
                    request_timeout,
                    llm,
                    context,
                }
            }
            Err(_) => {
                // No config file found, use defaults
                Self::default()
            }
        }
    }

    /// Apply configuration to settings.
    pub fn apply_to_settings(&self, settings: &mut Settings) {
        if let Some(ref data_dir) = self.data_dir {
            settings.data_dir = expand(data_dir);
        }
        if let Some(ref database) = self.database {
            settings.database = expand(database);
        }
        if let Some(ref host) = self.host {
            settings.host = host.clone();
        }
        if let Some(port) = self.port {
            settings.port = port;
        }
        if let Some(timeout) = self.request_timeout {
            settings.request_timeout = timeout;
        }
        settings.llm = self.llm.clone();
        settings.context = self.context.clone();
    }
}

/// Expand `~` and environment variables in a configured path.
pub fn expand(path: &str) -> PathBuf {
    match shellexpand::full(path) {
        Ok(expanded) => PathBuf::from(expanded.as_ref()),
        Err(_) => PathBuf::from(shellexpand::tilde(path).as_ref()),
    }
}

/// Load settings from configuration (async version).
pub async fn load_settings() -> Settings {
    let config = Config::load().await;
    let mut settings = Settings::default();
    config.apply_to_settings(&mut settings);
    settings
}
