//! Question answering: generate, validate, execute.

use std::sync::Arc;

use thiserror::Error;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::context::SchemaContextStore;
use crate::executor::{ExecutionError, QueryExecutor, QueryResult};
use crate::generator::{GeneratedQuery, GenerationError, QueryGenerator};
use crate::validator::{self, PolicyRejection};

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("Query is required")]
    EmptyQuestion,

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error("{rejection}")]
    Rejected {
        sql: String,
        explanation: String,
        #[source]
        rejection: PolicyRejection,
    },

    #[error(transparent)]
    Execution(#[from] ExecutionError),
}

/// A question together with the SQL that answered it and the rows it returned.
#[derive(Debug, Clone)]
pub struct QueryAnswer {
    pub question: String,
    pub generated: GeneratedQuery,
    pub result: QueryResult,
}

/// Runs the question pipeline against the current schema context.
#[derive(Clone)]
pub struct QueryService {
    generator: QueryGenerator,
    executor: Arc<dyn QueryExecutor>,
    store: SchemaContextStore,
}

impl QueryService {
    pub fn new(
        generator: QueryGenerator,
        executor: Arc<dyn QueryExecutor>,
        store: SchemaContextStore,
    ) -> Self {
        Self {
            generator,
            executor,
            store,
        }
    }

    /// Answer one question. The executor is only reached for statements the
    /// policy accepts.
    pub async fn answer(&self, question: &str) -> Result<QueryAnswer, QueryError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(QueryError::EmptyQuestion);
        }

        let request_id = Uuid::new_v4();
        self.run(question)
            .instrument(info_span!("query", %request_id))
            .await
    }

    async fn run(&self, question: &str) -> Result<QueryAnswer, QueryError> {
        info!(question, "Answering question");

        let context = self.store.get();
        let generated = self.generator.generate(question, &context).await?;
        info!(sql = %generated.sql, explanation = %generated.explanation, "Generated SQL");

        if let Err(rejection) = validator::validate(&generated.sql) {
            warn!(sql = %generated.sql, reason = rejection.reason, "Rejected generated SQL");
            return Err(QueryError::Rejected {
                sql: generated.sql,
                explanation: generated.explanation,
                rejection,
            });
        }

        let result = self.executor.execute(&generated.sql).await?;
        info!(rows = result.row_count, "Question answered");

        Ok(QueryAnswer {
            question: question.to_string(),
            generated,
            result,
        })
    }
}
