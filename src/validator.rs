//! Read-only policy gate for generated SQL.
//!
//! This is a prefix check: the statement must start with the `SELECT` keyword.
//! It does not parse SQL, so a statement such as `SELECT 1; DROP TABLE t` passes.
//! Run generated queries with a read-only database role or connection.

use thiserror::Error;

/// Reason attached to every rejection.
pub const REJECTION_REASON: &str = "write or non-select statement";

/// A statement the policy refuses to execute.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Only SELECT queries are allowed ({reason})")]
pub struct PolicyRejection {
    pub reason: &'static str,
}

/// Accept only statements that begin with the `SELECT` keyword.
pub fn validate(sql: &str) -> Result<(), PolicyRejection> {
    if starts_with_select(sql) {
        Ok(())
    } else {
        Err(PolicyRejection {
            reason: REJECTION_REASON,
        })
    }
}

fn starts_with_select(sql: &str) -> bool {
    let text = sql.trim_start();
    let Some(head) = text.get(..6) else {
        return false;
    };
    if !head.eq_ignore_ascii_case("select") {
        return false;
    }
    // `SELECTED`, `select_all` and the like are identifiers, not the keyword.
    !text[6..]
        .chars()
        .next()
        .is_some_and(|c| c.is_alphanumeric() || c == '_')
}
