//! Table-scoped record hooks.

use crate::client::GenericClient;
use crate::error::{OrmError, OrmResult};
use crate::record::Record;
use crate::table::Table;
use crate::validation::ValidationErrors;
use std::future::Future;

/// Strategy object consulted by [`Record::save`] and [`Record::delete`].
///
/// One instance is stored on the [`Table`] and shared by every record of that
/// table. All methods have pass-through defaults.
///
/// # Example
///
/// ```ignore
/// use pgrecord::{GenericClient, OrmResult, Record, RecordHooks, Table, ValidationCode, ValidationErrors};
///
/// struct WidgetHooks;
///
/// impl RecordHooks for WidgetHooks {
///     async fn normalize<C: GenericClient>(
///         &self,
///         _conn: &C,
///         _table: &Table<Self>,
///         record: &mut Record<Self>,
///     ) -> OrmResult<()> {
///         if let Some(name) = record.get("name")?.as_str() {
///             let trimmed = name.trim().to_string();
///             record.set("name", trimmed)?;
///         }
///         Ok(())
///     }
///
///     async fn validate<C: GenericClient>(
///         &self,
///         _conn: &C,
///         _table: &Table<Self>,
///         record: &Record<Self>,
///     ) -> OrmResult<ValidationErrors> {
///         let mut errors = ValidationErrors::new();
///         if record.get("name")?.as_str().is_none_or(str::is_empty) {
///             errors.add("name", ValidationCode::Required, "can't be blank");
///         }
///         Ok(errors)
///     }
/// }
/// ```
pub trait RecordHooks: Send + Sync + Sized + 'static {
    /// Adjust the record in place before validation. An error aborts the save;
    /// mutations made before the error are kept.
    fn normalize<C: GenericClient>(
        &self,
        conn: &C,
        table: &Table<Self>,
        record: &mut Record<Self>,
    ) -> impl Future<Output = OrmResult<()>> + Send {
        let _ = (conn, table, record);
        async { Ok(()) }
    }

    /// Check the record. A non-empty result aborts the save with
    /// [`OrmError::Validation`].
    fn validate<C: GenericClient>(
        &self,
        conn: &C,
        table: &Table<Self>,
        record: &Record<Self>,
    ) -> impl Future<Output = OrmResult<ValidationErrors>> + Send {
        let _ = (conn, table, record);
        async { Ok(ValidationErrors::new()) }
    }

    /// Translate a driver error raised by a save or delete statement, e.g. a
    /// unique violation into a validation error.
    fn map_db_error(&self, err: OrmError) -> OrmError {
        err
    }
}

/// Hooks that do nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHooks;

impl RecordHooks for NoHooks {}
