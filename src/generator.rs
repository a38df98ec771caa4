//! Natural-language question to SQL, via a text-generation backend.
//!
//! The backend is asked for a reply with a `SQL:` section followed by an
//! `EXPLANATION:` section. Parsing is lenient: a reply without the labels is
//! treated as bare SQL. Nothing here checks whether the statement is safe to run.

use std::sync::{Arc, LazyLock};

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::llm::{LlmError, TextGenerator};

/// Explanation used when the reply carries no `EXPLANATION:` section.
pub const NO_EXPLANATION: &str = "No explanation provided";

/// Default prompt for SQL generation. Uses `{context}` and `{question}`.
pub const DEFAULT_SQL_PROMPT: &str = r#"You are an SQL expert. Generate a single read-only SELECT query that answers the user's question.

{context}

USER QUESTION: "{question}"

INSTRUCTIONS:
1. Generate ONLY one valid SELECT query for the database described above
2. Use proper JOINs based on the schema relationships above
3. Return your response in this EXACT format:

SQL:
[your SQL query here]

EXPLANATION:
[brief explanation of what the query does]

Generate the query now:"#;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{(context|question)\}").expect("valid regex"));

static SQL_SECTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)\bSQL:\s*(.*?)\s*(?:EXPLANATION:|\z)").expect("valid regex")
});

static EXPLANATION_SECTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)\bEXPLANATION:\s*(.*?)\s*(?:\bSQL:|\z)").expect("valid regex")
});

static CODE_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)```(?:sql)?").expect("valid regex"));

/// Errors from the generation step.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("Failed to generate SQL: {0}")]
    Backend(#[from] LlmError),

    #[error("Failed to generate SQL: backend returned an empty reply")]
    EmptyResponse,
}

/// A candidate statement and what the backend said about it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedQuery {
    pub sql: String,
    pub explanation: String,
    pub raw_response: String,
}

/// Turns questions into candidate SQL using a [`TextGenerator`].
#[derive(Clone)]
pub struct QueryGenerator {
    backend: Arc<dyn TextGenerator>,
    prompt_template: String,
}

impl QueryGenerator {
    pub fn new(backend: Arc<dyn TextGenerator>) -> Self {
        Self::with_prompt(backend, DEFAULT_SQL_PROMPT)
    }

    pub fn with_prompt(backend: Arc<dyn TextGenerator>, prompt_template: impl Into<String>) -> Self {
        Self {
            backend,
            prompt_template: prompt_template.into(),
        }
    }

    /// Ask the backend for SQL answering `question` against `context`.
    pub async fn generate(
        &self,
        question: &str,
        context: &str,
    ) -> Result<GeneratedQuery, GenerationError> {
        if context.is_empty() {
            warn!("Generating without a schema context; upload a schema first");
        }

        let prompt = render_prompt(&self.prompt_template, question, context);
        let raw = self.backend.complete(&prompt).await?;
        if raw.trim().is_empty() {
            return Err(GenerationError::EmptyResponse);
        }

        let generated = parse_reply(&raw);
        debug!(sql = %generated.sql, "Parsed generation reply");
        Ok(generated)
    }
}

/// Build the prompt with the default template.
pub fn build_prompt(question: &str, context: &str) -> String {
    render_prompt(DEFAULT_SQL_PROMPT, question, context)
}

/// Substitute placeholders in one pass so neither value is re-expanded.
fn render_prompt(template: &str, question: &str, context: &str) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &Captures| match &caps[1] {
            "context" => context.to_string(),
            _ => question.to_string(),
        })
        .into_owned()
}

/// Split a raw reply into SQL and explanation.
pub fn parse_reply(raw: &str) -> GeneratedQuery {
    let sql = match extract_sql_section(raw) {
        Some(section) => strip_code_fences(section),
        None => raw.trim().to_string(),
    };
    let explanation = extract_explanation_section(raw)
        .map(str::to_string)
        .unwrap_or_else(|| NO_EXPLANATION.to_string());

    GeneratedQuery {
        sql,
        explanation,
        raw_response: raw.to_string(),
    }
}

/// Text after `SQL:` up to `EXPLANATION:` or the end.
pub fn extract_sql_section(raw: &str) -> Option<&str> {
    SQL_SECTION
        .captures(raw)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

/// Text after `EXPLANATION:` up to a later `SQL:` or the end.
pub fn extract_explanation_section(raw: &str) -> Option<&str> {
    EXPLANATION_SECTION
        .captures(raw)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

/// Remove markdown code fences and surrounding whitespace.
pub fn strip_code_fences(sql: &str) -> String {
    CODE_FENCE.replace_all(sql, "").trim().to_string()
}
