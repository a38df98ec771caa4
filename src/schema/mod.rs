//! Canonical schema model and ingestion of raw schema descriptions.
//!
//! Three source formats are supported:
//! - structured DDL dumps (`.sql`)
//! - tabular HTML documentation exports (`.html`, `.htm`)
//! - pre-structured JSON declarations (`.json`)
//!
//! Every format produces a [`NormalizedSchema`] which is then passed through
//! [`NormalizedSchema::normalize`] so constraint references always resolve.

mod ddl;
mod declaration;
mod ingest;
mod markup;

pub use ingest::{ingest, ingest_bytes, IngestError, SchemaFormat};

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Canonical output of schema ingestion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedSchema {
    #[serde(default)]
    pub tables: Vec<Table>,
}

/// A single table with its columns and key constraints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    #[serde(default)]
    pub columns: Vec<Column>,
    #[serde(default)]
    pub constraints: Constraints,
}

/// A column definition. `type` is kept verbatim from the source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    pub name: String,
    #[serde(rename = "type", default)]
    pub column_type: String,
    #[serde(default = "default_nullable")]
    pub nullable: bool,
    #[serde(default)]
    pub auto_increment: bool,
    #[serde(default)]
    pub default_value: Option<String>,
    #[serde(default)]
    pub generated: bool,
}

fn default_nullable() -> bool {
    true
}

/// Key constraints of a table, as ordered sets of column names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Constraints {
    #[serde(default)]
    pub primary_keys: Vec<String>,
    #[serde(default)]
    pub unique_keys: Vec<String>,
    #[serde(default)]
    pub indexes: Vec<String>,
}

impl Column {
    /// Create a nullable column with no flags set.
    pub fn new(name: impl Into<String>, column_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            column_type: column_type.into(),
            nullable: true,
            auto_increment: false,
            default_value: None,
            generated: false,
        }
    }
}

impl Table {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            constraints: Constraints::default(),
        }
    }

    /// Look up a column by exact name.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn is_primary_key(&self, column: &str) -> bool {
        self.constraints.primary_keys.iter().any(|c| c == column)
    }

    pub fn is_unique(&self, column: &str) -> bool {
        self.constraints.unique_keys.iter().any(|c| c == column)
    }

    /// Drop duplicate columns and constraint references to unknown columns.
    fn normalize(&mut self) {
        let mut seen = HashSet::new();
        let table_name = self.name.clone();
        self.columns.retain(|col| {
            let keep = seen.insert(col.name.clone());
            if !keep {
                warn!(table = %table_name, column = %col.name, "Dropping duplicate column");
            }
            keep
        });

        let known: HashSet<&str> = self.columns.iter().map(|c| c.name.as_str()).collect();
        for (kind, names) in [
            ("primary key", &mut self.constraints.primary_keys),
            ("unique key", &mut self.constraints.unique_keys),
            ("index", &mut self.constraints.indexes),
        ] {
            let mut listed = HashSet::new();
            names.retain(|name| {
                if !known.contains(name.as_str()) {
                    warn!(table = %table_name, column = %name, "Dropping {} on unknown column", kind);
                    return false;
                }
                listed.insert(name.clone())
            });
        }
    }
}

impl NormalizedSchema {
    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name == name)
    }

    pub fn table_names(&self) -> Vec<String> {
        self.tables.iter().map(|t| t.name.clone()).collect()
    }

    /// Enforce the model invariants in place.
    ///
    /// Tables with empty names and repeated table names are dropped (first one wins),
    /// then each table drops repeated columns and dangling constraint references.
    pub fn normalize(mut self) -> Self {
        let mut seen = HashSet::new();
        self.tables.retain(|table| {
            if table.name.trim().is_empty() {
                warn!("Dropping table with empty name");
                return false;
            }
            let keep = seen.insert(table.name.clone());
            if !keep {
                warn!(table = %table.name, "Dropping duplicate table");
            }
            keep
        });

        for table in &mut self.tables {
            table.normalize();
        }
        self
    }
}
