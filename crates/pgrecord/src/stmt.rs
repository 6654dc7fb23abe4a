//! Parameterized SQL statements and the free-standing row builders.
//!
//! [`Statement`] keeps the SQL text and its arguments together. Placeholders
//! are only ever emitted through [`Statement::push_bind`], which appends the
//! argument and writes `$n` in the same call, so the n-th placeholder always
//! refers to the n-th argument.
//!
//! The `*_row_sql` builders work from plain column→value maps without a table
//! descriptor. Column names are sorted before they are emitted so the same map
//! always produces byte-identical SQL.

use crate::error::{OrmError, OrmResult};
use crate::ident::{IntoIdent, sanitize_identifier};
use crate::value::Value;
use std::collections::BTreeMap;
use std::fmt::Write;
use tokio_postgres::types::ToSql;

/// SQL text plus its positional arguments.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub args: Vec<Value>,
}

impl Statement {
    /// Start a statement with an initial SQL fragment.
    pub fn new(initial_sql: impl Into<String>) -> Self {
        Self {
            sql: initial_sql.into(),
            args: Vec::new(),
        }
    }

    /// Append raw SQL (no parameters).
    pub fn push(&mut self, sql: &str) -> &mut Self {
        self.sql.push_str(sql);
        self
    }

    /// Append a `$n` placeholder and bind its value.
    pub fn push_bind(&mut self, value: impl Into<Value>) -> &mut Self {
        self.args.push(value.into());
        // Writing to a String cannot fail.
        let _ = write!(self.sql, "${}", self.args.len());
        self
    }

    /// Arguments as references for the driver.
    pub fn params(&self) -> Vec<&(dyn ToSql + Sync)> {
        self.args.iter().map(|v| v as &(dyn ToSql + Sync)).collect()
    }
}

fn sorted<K, V>(values: impl IntoIterator<Item = (K, V)>) -> BTreeMap<String, Value>
where
    K: Into<String>,
    V: Into<Value>,
{
    values
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

fn push_where(stmt: &mut Statement, where_values: BTreeMap<String, Value>) {
    stmt.push(" where ");
    for (i, (column, value)) in where_values.into_iter().enumerate() {
        if i > 0 {
            stmt.push(" and ");
        }
        stmt.push(&sanitize_identifier(&column));
        if value.is_null() {
            stmt.push(" is null");
        } else {
            stmt.push(" = ").push_bind(value);
        }
    }
}

/// Build `insert into <table> (<sorted columns>) values ($1, ...)`.
///
/// An empty map inserts `default values`. A non-empty `returning` list adds a
/// RETURNING clause, with each column rendered like the inserted ones.
pub fn insert_row_sql<K, V>(
    table: impl IntoIdent,
    values: impl IntoIterator<Item = (K, V)>,
    returning: &[&str],
) -> OrmResult<Statement>
where
    K: Into<String>,
    V: Into<Value>,
{
    let table = table.into_ident()?;
    let values = sorted(values);

    let mut stmt = Statement::new(format!("insert into {}", table.to_sql()));
    if values.is_empty() {
        stmt.push(" default values");
    } else {
        let columns = values
            .keys()
            .map(|k| sanitize_identifier(k))
            .collect::<Vec<_>>()
            .join(", ");
        stmt.push(" (").push(&columns).push(") values (");
        for (i, value) in values.into_values().enumerate() {
            if i > 0 {
                stmt.push(", ");
            }
            stmt.push_bind(value);
        }
        stmt.push(")");
    }

    if !returning.is_empty() {
        let columns = returning
            .iter()
            .map(|c| sanitize_identifier(c))
            .collect::<Vec<_>>()
            .join(", ");
        stmt.push(" returning ").push(&columns);
    }
    Ok(stmt)
}

/// Build `update <table> set a = $1, ... where k = $n and ...`.
///
/// SET columns are sorted, then WHERE columns are sorted. A NULL in the WHERE
/// map is matched with `is null`. Both maps must be non-empty.
pub fn update_row_sql<K, V, WK, WV>(
    table: impl IntoIdent,
    values: impl IntoIterator<Item = (K, V)>,
    where_values: impl IntoIterator<Item = (WK, WV)>,
) -> OrmResult<Statement>
where
    K: Into<String>,
    V: Into<Value>,
    WK: Into<String>,
    WV: Into<Value>,
{
    let table = table.into_ident()?;
    let values = sorted(values);
    let where_values = sorted(where_values);
    if values.is_empty() {
        return Err(OrmError::precondition("update requires at least one column to set"));
    }
    if where_values.is_empty() {
        return Err(OrmError::precondition("update requires a where clause"));
    }

    let mut stmt = Statement::new(format!("update {} set ", table.to_sql()));
    for (i, (column, value)) in values.into_iter().enumerate() {
        if i > 0 {
            stmt.push(", ");
        }
        stmt.push(&sanitize_identifier(&column)).push(" = ").push_bind(value);
    }
    push_where(&mut stmt, where_values);
    Ok(stmt)
}

/// Build `delete from <table> where k = $1 and ...`. The map must be non-empty.
pub fn delete_row_sql<K, V>(
    table: impl IntoIdent,
    where_values: impl IntoIterator<Item = (K, V)>,
) -> OrmResult<Statement>
where
    K: Into<String>,
    V: Into<Value>,
{
    let table = table.into_ident()?;
    let where_values = sorted(where_values);
    if where_values.is_empty() {
        return Err(OrmError::precondition("delete requires a where clause"));
    }

    let mut stmt = Statement::new(format!("delete from {}", table.to_sql()));
    push_where(&mut stmt, where_values);
    Ok(stmt)
}
