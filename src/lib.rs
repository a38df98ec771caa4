//! nlsql: schema ingestion and natural-language questions answered with read-only SQL.
//!
//! The pipeline has two halves. Uploading a schema description ingests it into a
//! [`schema::NormalizedSchema`], renders a text context from it and makes that
//! context current. Asking a question sends the context and the question to a
//! text-generation backend, checks the returned SQL against the read-only policy
//! and runs it through a [`executor::QueryExecutor`].

pub mod config;
pub mod context;
pub mod executor;
pub mod generator;
pub mod llm;
pub mod schema;
pub mod server;
pub mod services;
pub mod validator;
