//! Service layer for nlsql business logic.
//!
//! This module contains domain logic separated from transport concerns.
//! Services can be used by the CLI, the web server, or other interfaces.

pub mod query;
pub mod upload;

pub use query::{QueryAnswer, QueryError, QueryService};
pub use upload::{UploadError, UploadService, UploadSummary};
