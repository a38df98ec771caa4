//! Schema upload: ingest, render, persist, publish.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::context::{self, ContextFiles, ContextTemplate, PersistError, SchemaContextStore};
use crate::schema::{self, IngestError, NormalizedSchema};

#[derive(Debug, Error)]
pub enum UploadError {
    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error("Failed to save schema context: {0}")]
    Persist(#[from] PersistError),

    #[error("No schema has been uploaded yet")]
    NothingToRender,
}

/// Outcome of a successful upload or re-render.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadSummary {
    pub tables_found: usize,
    pub tables: Vec<String>,
    pub path: PathBuf,
}

/// Replaces the schema context from uploaded schema files.
#[derive(Clone)]
pub struct UploadService {
    files: ContextFiles,
    store: SchemaContextStore,
    template: Arc<ContextTemplate>,
    // Serializes save and replace so disk and memory agree on the last writer.
    publish_lock: Arc<Mutex<()>>,
}

impl UploadService {
    pub fn new(files: ContextFiles, store: SchemaContextStore, template: ContextTemplate) -> Self {
        Self {
            files,
            store,
            template: Arc::new(template),
            publish_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Ingest an uploaded file and make its context current.
    ///
    /// On any error the previous context stays in place.
    pub fn upload(&self, bytes: &[u8], filename: &str) -> Result<UploadSummary, UploadError> {
        let schema = schema::ingest_bytes(bytes, filename)?;
        let summary = self.publish(&schema)?;
        info!(file = filename, tables = summary.tables_found, "Schema context replaced");
        Ok(summary)
    }

    /// Render the last persisted schema again, e.g. after a template change.
    pub fn rerender(&self) -> Result<UploadSummary, UploadError> {
        let schema = self
            .files
            .load_schema()?
            .ok_or(UploadError::NothingToRender)?;
        self.publish(&schema)
    }

    fn publish(&self, schema: &NormalizedSchema) -> Result<UploadSummary, UploadError> {
        let rendered = context::render(schema, &self.template);
        {
            let _guard = self.publish_lock.lock().unwrap_or_else(|e| e.into_inner());
            self.files.save(&rendered, schema)?;
            self.store.replace(rendered);
        }

        Ok(UploadSummary {
            tables_found: schema.tables.len(),
            tables: schema.table_names(),
            path: self.files.context_path().to_path_buf(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn service(dir: &Path) -> (UploadService, SchemaContextStore) {
        let store = SchemaContextStore::default();
        let files = ContextFiles::new(dir.join("schema-context.md"), dir.join("schema.json"));
        (
            UploadService::new(files, store.clone(), ContextTemplate::default()),
            store,
        )
    }

    #[test]
    fn test_upload_publishes_context() {
        let dir = tempfile::tempdir().unwrap();
        let (service, store) = service(dir.path());

        let ddl = b"CREATE TABLE users (id int NOT NULL AUTO_INCREMENT, PRIMARY KEY (id)) ENGINE=InnoDB;";
        let summary = service.upload(ddl, "dump.sql").unwrap();

        assert_eq!(summary.tables_found, 1);
        assert_eq!(summary.tables, ["users"]);
        assert!(store.get().contains("## Table: users"));
        let on_disk = std::fs::read_to_string(dir.path().join("schema-context.md")).unwrap();
        assert_eq!(on_disk, &*store.get());
    }

    #[test]
    fn test_rejected_upload_keeps_previous_context() {
        let dir = tempfile::tempdir().unwrap();
        let (service, store) = service(dir.path());
        service
            .upload(b"CREATE TABLE a (id int);", "a.sql")
            .unwrap();
        let before = store.get();

        let err = service.upload(b"name,type", "schema.csv").unwrap_err();
        assert!(matches!(err, UploadError::Ingest(IngestError::UnsupportedFormat(_))));
        let err = service.upload(b"{not json", "schema.json").unwrap_err();
        assert!(matches!(err, UploadError::Ingest(IngestError::MalformedInput(_))));

        assert_eq!(store.get(), before);
    }

    #[test]
    fn test_rerender_uses_persisted_schema() {
        let dir = tempfile::tempdir().unwrap();
        let (service, _) = service(dir.path());
        assert!(matches!(
            service.rerender().unwrap_err(),
            UploadError::NothingToRender
        ));

        service
            .upload(b"CREATE TABLE a (id int);", "a.sql")
            .unwrap();
        let (fresh, store) = self::service(dir.path());
        let summary = fresh.rerender().unwrap();
        assert_eq!(summary.tables, ["a"]);
        assert!(store.get().contains("## Table: a"));
    }

    #[test]
    fn test_concurrent_uploads_leave_disk_and_memory_in_sync() {
        let dir = tempfile::tempdir().unwrap();
        let (service, store) = service(dir.path());

        let workers: Vec<_> = (0..8)
            .map(|i| {
                let service = service.clone();
                std::thread::spawn(move || {
                    let ddl = format!("CREATE TABLE t{i} (id int);");
                    for _ in 0..10 {
                        service.upload(ddl.as_bytes(), "dump.sql").unwrap();
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }

        let on_disk = std::fs::read_to_string(dir.path().join("schema-context.md")).unwrap();
        assert_eq!(on_disk, &*store.get());

        let files = ContextFiles::new(
            dir.path().join("schema-context.md"),
            dir.path().join("schema.json"),
        );
        let persisted = files.load_schema().unwrap().unwrap();
        let table = &persisted.tables[0].name;
        assert!(store.get().contains(&format!("## Table: {table}\n")));
    }
}
