//! # pgrecord
//!
//! Dynamic table/record data mapping for Postgres over `tokio-postgres`.
//!
//! ## Features
//!
//! - **Runtime tables**: describe a table by hand or load it from the catalog,
//!   then finalize it once into an immutable, shareable [`Table`]
//! - **Dirty tracking**: a [`Record`] only writes the columns you assigned
//! - **Insert or update**: decided by whether the record was ever loaded or saved
//! - **Hooks**: table-scoped normalize/validate/error-mapping via [`RecordHooks`]
//! - **Free-standing builders**: deterministic INSERT/UPDATE/DELETE from plain maps
//! - **Transaction-friendly**: pass a transaction anywhere a [`GenericClient`] is expected
//!
//! ## Tables and records
//!
//! ```ignore
//! use pgrecord::Table;
//!
//! let widgets = Table::load(&client, None, "widgets").await?;
//!
//! let mut widget = widgets.new_record();
//! widget.set("name", "sprocket")?;
//! widget.save(&client).await?; // insert into "widgets" ("name") values ($1) returning "id", "name"
//!
//! let id = widget.get("id")?.clone();
//! let mut again = widgets.find_by_primary_key(&client, [id]).await?;
//! again.set("name", "cog")?;
//! again.save(&client).await?; // update "widgets" set "name" = $1 where "id" = $2 returning ...
//! ```
//!
//! ## Free-standing builders
//!
//! ```ignore
//! use pgrecord::{Value, insert_row, update_row};
//!
//! insert_row(&client, "audit_log", [("actor", Value::from("alice")), ("action", "login".into())]).await?;
//! update_row(&client, "widgets", [("name", "cog")], [("id", 7i32)]).await?;
//! ```

pub mod catalog;
pub mod client;
pub mod config;
pub mod error;
pub mod hooks;
pub mod ident;
pub mod query;
pub mod record;
pub mod row;
pub mod stmt;
pub mod table;
mod trace;
pub mod validation;
pub mod value;

pub use client::GenericClient;
pub use config::{DEFAULT_MAX_SQL_LENGTH, EmptyUpdatePolicy, TableConfig};
pub use error::{OrmError, OrmResult};
pub use hooks::{NoHooks, RecordHooks};
pub use ident::{Ident, IntoIdent, quote_identifier, sanitize_identifier};
pub use query::{
    delete_row, exec_one, expect_affected_one, expect_one, insert_row, insert_row_returning,
    select_all, select_all_as, select_row, select_row_as, update_row,
};
pub use record::Record;
pub use row::{FromRow, RowExt};
pub use stmt::{Statement, delete_row_sql, insert_row_sql, update_row_sql};
pub use table::{Column, Table, TableDef};
pub use trace::StatementKind;
pub use validation::{ValidationCode, ValidationError, ValidationErrors};
pub use value::Value;
