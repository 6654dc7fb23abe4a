//! Result-shape helpers.
//!
//! Every "exactly one row" check in the crate goes through [`expect_one`] or
//! [`expect_affected_one`], so zero rows is always [`OrmError::NotFound`] and
//! more than one is always [`OrmError::TooManyRows`].

use crate::client::GenericClient;
use crate::config::DEFAULT_MAX_SQL_LENGTH;
use crate::error::{OrmError, OrmResult};
use crate::ident::IntoIdent;
use crate::row::FromRow;
use crate::stmt::{Statement, delete_row_sql, insert_row_sql, update_row_sql};
use crate::trace::{StatementKind, log_statement};
use crate::value::Value;
use tokio_postgres::Row;
use tokio_postgres::types::ToSql;

/// Require exactly one element.
pub fn expect_one<T>(rows: Vec<T>) -> OrmResult<T> {
    let got = rows.len();
    let mut iter = rows.into_iter();
    match (iter.next(), got) {
        (Some(row), 1) => Ok(row),
        (None, _) => Err(OrmError::not_found("expected 1 row, got 0")),
        (Some(_), got) => Err(OrmError::too_many_rows(1, got)),
    }
}

/// Require that a statement affected exactly one row.
pub fn expect_affected_one(affected: u64) -> OrmResult<()> {
    match affected {
        0 => Err(OrmError::not_found("expected 1 affected row, got 0")),
        1 => Ok(()),
        got => Err(OrmError::too_many_rows(
            1,
            usize::try_from(got).unwrap_or(usize::MAX),
        )),
    }
}

/// Run a query that must return exactly one row.
pub async fn select_row<C: GenericClient>(
    conn: &C,
    sql: &str,
    params: &[&(dyn ToSql + Sync)],
) -> OrmResult<Row> {
    expect_one(conn.query(sql, params).await?)
}

/// Run a query returning zero or more rows.
pub async fn select_all<C: GenericClient>(
    conn: &C,
    sql: &str,
    params: &[&(dyn ToSql + Sync)],
) -> OrmResult<Vec<Row>> {
    conn.query(sql, params).await
}

/// Run a query that must return exactly one row and map it.
pub async fn select_row_as<T: FromRow, C: GenericClient>(
    conn: &C,
    sql: &str,
    params: &[&(dyn ToSql + Sync)],
) -> OrmResult<T> {
    T::from_row(&select_row(conn, sql, params).await?)
}

/// Run a query and map every row.
pub async fn select_all_as<T: FromRow, C: GenericClient>(
    conn: &C,
    sql: &str,
    params: &[&(dyn ToSql + Sync)],
) -> OrmResult<Vec<T>> {
    conn.query(sql, params)
        .await?
        .iter()
        .map(T::from_row)
        .collect()
}

/// Execute a statement that must affect exactly one row.
pub async fn exec_one<C: GenericClient>(
    conn: &C,
    sql: &str,
    params: &[&(dyn ToSql + Sync)],
) -> OrmResult<()> {
    expect_affected_one(conn.execute(sql, params).await?)
}

async fn exec_statement<C: GenericClient>(
    conn: &C,
    kind: StatementKind,
    stmt: Statement,
) -> OrmResult<()> {
    log_statement(kind, &stmt, Some(DEFAULT_MAX_SQL_LENGTH));
    exec_one(conn, &stmt.sql, &stmt.params()).await
}

/// Insert one row built by [`insert_row_sql`].
pub async fn insert_row<C, K, V>(
    conn: &C,
    table: impl IntoIdent,
    values: impl IntoIterator<Item = (K, V)>,
) -> OrmResult<()>
where
    C: GenericClient,
    K: Into<String>,
    V: Into<Value>,
{
    let stmt = insert_row_sql(table, values, &[])?;
    exec_statement(conn, StatementKind::Insert, stmt).await
}

/// Insert one row and return the `returning` columns of the new row.
pub async fn insert_row_returning<C, K, V>(
    conn: &C,
    table: impl IntoIdent,
    values: impl IntoIterator<Item = (K, V)>,
    returning: &[&str],
) -> OrmResult<Row>
where
    C: GenericClient,
    K: Into<String>,
    V: Into<Value>,
{
    let stmt = insert_row_sql(table, values, returning)?;
    log_statement(StatementKind::Insert, &stmt, Some(DEFAULT_MAX_SQL_LENGTH));
    select_row(conn, &stmt.sql, &stmt.params()).await
}

/// Update exactly one row built by [`update_row_sql`].
pub async fn update_row<C, K, V, WK, WV>(
    conn: &C,
    table: impl IntoIdent,
    values: impl IntoIterator<Item = (K, V)>,
    where_values: impl IntoIterator<Item = (WK, WV)>,
) -> OrmResult<()>
where
    C: GenericClient,
    K: Into<String>,
    V: Into<Value>,
    WK: Into<String>,
    WV: Into<Value>,
{
    let stmt = update_row_sql(table, values, where_values)?;
    exec_statement(conn, StatementKind::Update, stmt).await
}

/// Delete exactly one row built by [`delete_row_sql`].
pub async fn delete_row<C, K, V>(
    conn: &C,
    table: impl IntoIdent,
    where_values: impl IntoIterator<Item = (K, V)>,
) -> OrmResult<()>
where
    C: GenericClient,
    K: Into<String>,
    V: Into<Value>,
{
    let stmt = delete_row_sql(table, where_values)?;
    exec_statement(conn, StatementKind::Delete, stmt).await
}
