//! SQL debug logging via `tracing`.
//!
//! Events are emitted at DEBUG on target `pgrecord.sql` right before a
//! statement is handed to the driver. Install any `tracing` subscriber to see
//! them; the library never installs one.

use crate::stmt::Statement;

/// The kind of statement being issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    Select,
    Insert,
    Update,
    Delete,
}

fn truncate_sql_bytes(sql: &str, max_bytes: usize) -> &str {
    if sql.len() <= max_bytes {
        return sql;
    }
    let mut end = max_bytes;
    while end > 0 && !sql.is_char_boundary(end) {
        end -= 1;
    }
    &sql[..end]
}

pub(crate) fn truncate_sql(sql: &str, max_sql_length: Option<usize>) -> String {
    match max_sql_length {
        Some(max) if sql.len() > max => format!("{}...", truncate_sql_bytes(sql, max)),
        _ => sql.to_string(),
    }
}

pub(crate) fn log_statement(kind: StatementKind, stmt: &Statement, max_sql_length: Option<usize>) {
    if !tracing::enabled!(target: "pgrecord.sql", tracing::Level::DEBUG) {
        return;
    }
    tracing::debug!(
        target: "pgrecord.sql",
        kind = ?kind,
        param_count = stmt.args.len(),
        sql = %truncate_sql(&stmt.sql, max_sql_length),
        "executing statement"
    );
}
