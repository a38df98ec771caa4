//! Durable copies of the rendered context and the normalized schema.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, info};

use crate::schema::NormalizedSchema;

/// Errors that can occur while persisting or loading context files.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Locations of the persisted context artifacts.
#[derive(Debug, Clone)]
pub struct ContextFiles {
    context_path: PathBuf,
    schema_path: PathBuf,
}

impl ContextFiles {
    pub fn new(context_path: PathBuf, schema_path: PathBuf) -> Self {
        Self {
            context_path,
            schema_path,
        }
    }

    pub fn context_path(&self) -> &Path {
        &self.context_path
    }

    pub fn schema_path(&self) -> &Path {
        &self.schema_path
    }

    /// Read the last rendered context; empty when nothing was uploaded yet.
    pub fn load_context(&self) -> Result<String, PersistError> {
        match fs::read_to_string(&self.context_path) {
            Ok(text) => {
                info!(path = %self.context_path.display(), "Loaded schema context");
                Ok(text)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.context_path.display(), "No schema context yet");
                Ok(String::new())
            }
            Err(e) => Err(io_error(&self.context_path, e)),
        }
    }

    /// Read the last normalized schema, if any.
    pub fn load_schema(&self) -> Result<Option<NormalizedSchema>, PersistError> {
        match fs::read_to_string(&self.schema_path) {
            Ok(text) => Ok(Some(serde_json::from_str(&text)?)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_error(&self.schema_path, e)),
        }
    }

    /// Overwrite both artifacts. Each file is replaced atomically.
    pub fn save(&self, context: &str, schema: &NormalizedSchema) -> Result<(), PersistError> {
        let schema_json = serde_json::to_string_pretty(schema)?;
        write_atomic(&self.schema_path, schema_json.as_bytes())?;
        write_atomic(&self.context_path, context.as_bytes())?;
        info!(path = %self.context_path.display(), "Saved schema context");
        Ok(())
    }
}

fn io_error(path: &Path, source: io::Error) -> PersistError {
    PersistError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Write to a sibling temp file, then rename over `path`.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), PersistError> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir).map_err(|e| io_error(dir, e))?;

    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| io_error(dir, e))?;
    tmp.write_all(bytes).map_err(|e| io_error(path, e))?;
    tmp.persist(path).map_err(|e| io_error(path, e.error))?;
    Ok(())
}
