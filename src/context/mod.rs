//! Schema context: the text document that grounds query generation.
//!
//! - `render` turns a normalized schema into the document
//! - `template` holds the static, deployment-specific sections
//! - `store` keeps the current document for concurrent readers
//! - `persist` writes it to disk so it survives restarts

mod persist;
mod render;
mod store;
mod template;

pub use persist::{ContextFiles, PersistError};
pub use render::{render, render_at, GENERATED_LINE_PREFIX};
pub use store::SchemaContextStore;
pub use template::{ContextTemplate, DEFAULT_QUERY_PATTERNS, DEFAULT_RELATIONSHIP_RULES};
