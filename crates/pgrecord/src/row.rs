//! Row mapping traits and utilities

use crate::error::{OrmError, OrmResult};
use crate::value::Value;
use tokio_postgres::Row;

/// Trait for converting a database row into a Rust struct.
///
/// Implement it for hand-written result types used with
/// [`select_row_as`](crate::query::select_row_as) and
/// [`select_all_as`](crate::query::select_all_as).
///
/// # Example
///
/// ```ignore
/// use pgrecord::{FromRow, OrmResult, RowExt};
///
/// struct WidgetName {
///     id: i32,
///     name: String,
/// }
///
/// impl FromRow for WidgetName {
///     fn from_row(row: &tokio_postgres::Row) -> OrmResult<Self> {
///         Ok(Self {
///             id: row.try_get_column("id")?,
///             name: row.try_get_column("name")?,
///         })
///     }
/// }
/// ```
pub trait FromRow: Sized {
    /// Convert a database row into Self
    fn from_row(row: &Row) -> OrmResult<Self>;
}

/// Extension trait for Row to provide typed access
pub trait RowExt {
    /// Try to get a column value, returning OrmError::Decode on failure
    fn try_get_column<T>(&self, column: &str) -> OrmResult<T>
    where
        T: for<'a> tokio_postgres::types::FromSql<'a>;

    /// Decode every column positionally into dynamic values.
    fn values(&self) -> OrmResult<Vec<Value>>;
}

impl RowExt for Row {
    fn try_get_column<T>(&self, column: &str) -> OrmResult<T>
    where
        T: for<'a> tokio_postgres::types::FromSql<'a>,
    {
        self.try_get(column)
            .map_err(|e| OrmError::decode(column, e.to_string()))
    }

    fn values(&self) -> OrmResult<Vec<Value>> {
        self.columns()
            .iter()
            .enumerate()
            .map(|(i, col)| {
                self.try_get::<_, Value>(i)
                    .map_err(|e| OrmError::decode(col.name(), e.to_string()))
            })
            .collect()
    }
}

impl FromRow for Vec<Value> {
    fn from_row(row: &Row) -> OrmResult<Self> {
        row.values()
    }
}
