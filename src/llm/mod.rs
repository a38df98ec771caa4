//! Text-generation backends.

mod client;

pub use client::{LlmClient, LlmConfig, LlmProvider, DEFAULT_API_KEY_ENV};

use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur during LLM operations.
#[derive(Debug, Error)]
pub enum LlmError {
    /// HTTP client could not be built
    #[error("Client error: {0}")]
    Client(String),
    /// Failed to connect to LLM service
    #[error("Connection error: {0}")]
    Connection(String),
    /// Request exceeded the configured timeout
    #[error("Request timed out")]
    Timeout,
    /// API returned an error
    #[error("API error: {0}")]
    Api(String),
    /// Failed to parse response
    #[error("Parse error: {0}")]
    Parse(String),
    /// API key environment variable not set
    #[error("API key not set (expected in ${0})")]
    MissingApiKey(String),
}

/// A service that completes a prompt with generated text.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, LlmError>;
}
