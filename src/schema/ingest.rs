//! Format dispatch for schema ingestion.

use std::fmt;
use std::path::Path;

use thiserror::Error;
use tracing::info;

use super::{ddl, declaration, markup, NormalizedSchema};

/// Errors that can occur while ingesting a schema upload.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("Malformed input: {0}")]
    MalformedInput(String),
}

/// Recognized schema description formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaFormat {
    /// `CREATE TABLE` dump, e.g. from `mysqldump`.
    Ddl,
    /// HTML documentation export with one anchored section per table.
    TabularMarkup,
    /// JSON document already shaped like [`NormalizedSchema`].
    StructuredDeclaration,
}

impl SchemaFormat {
    /// Pick a format from an uploaded file name's extension.
    pub fn from_filename(filename: &str) -> Result<Self, IngestError> {
        let ext = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        match ext.as_deref() {
            Some("sql") => Ok(Self::Ddl),
            Some("html") | Some("htm") => Ok(Self::TabularMarkup),
            Some("json") => Ok(Self::StructuredDeclaration),
            _ => Err(IngestError::UnsupportedFormat(filename.to_string())),
        }
    }
}

impl fmt::Display for SchemaFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Ddl => "ddl",
            Self::TabularMarkup => "tabular-markup",
            Self::StructuredDeclaration => "structured-declaration",
        };
        f.write_str(name)
    }
}

/// Parse `content` with the given format's parser and normalize the result.
///
/// Individual bad records are skipped by the parsers; only a document that cannot
/// be read at all fails.
pub fn ingest(content: &str, format: SchemaFormat) -> Result<NormalizedSchema, IngestError> {
    let schema = match format {
        SchemaFormat::Ddl => ddl::parse(content),
        SchemaFormat::TabularMarkup => markup::parse(content),
        SchemaFormat::StructuredDeclaration => declaration::parse(content)?,
    };

    let schema = schema.normalize();
    info!(
        format = %format,
        tables = schema.tables.len(),
        "Ingested schema"
    );
    Ok(schema)
}

/// Decode an uploaded payload and dispatch on its file name.
pub fn ingest_bytes(bytes: &[u8], filename: &str) -> Result<NormalizedSchema, IngestError> {
    let format = SchemaFormat::from_filename(filename)?;
    let content = std::str::from_utf8(bytes)
        .map_err(|e| IngestError::MalformedInput(format!("{} is not valid UTF-8: {}", filename, e)))?;
    ingest(content, format)
}
