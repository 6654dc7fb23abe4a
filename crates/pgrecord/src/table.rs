//! Runtime table descriptors.
//!
//! A [`TableDef`] is the mutable description of a table: its name, its columns
//! (declared by hand or loaded from the catalog), hooks and configuration.
//! [`TableDef::finalize`] consumes it and produces an immutable [`Table`] with
//! every derived SQL fragment computed once. Because `finalize` takes the
//! definition by value, a table cannot be used before it is finalized, cannot
//! be finalized twice, and cannot change afterwards.
//!
//! ```ignore
//! use pgrecord::{Column, TableDef};
//! use tokio_postgres::types::Type;
//!
//! let widgets = TableDef::new("widgets")
//!     .column(Column::new("id").typed(Type::INT4).not_null().primary_key())
//!     .column(Column::new("name").typed(Type::TEXT).not_null())
//!     .finalize()?;
//!
//! let mut widget = widgets.new_record();
//! widget.set("name", "sprocket")?;
//! widget.save(&client).await?;
//! ```

use crate::catalog;
use crate::client::GenericClient;
use crate::config::TableConfig;
use crate::error::{OrmError, OrmResult};
use crate::hooks::{NoHooks, RecordHooks};
use crate::ident::quote_identifier;
use crate::query::expect_one;
use crate::record::Record;
use crate::row::RowExt;
use crate::stmt::Statement;
use crate::trace::{StatementKind, log_statement};
use crate::value::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio_postgres::Row;
use tokio_postgres::types::Type;

/// Metadata for one column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    name: String,
    quoted_name: String,
    type_oid: u32,
    not_null: bool,
    primary_key: bool,
    textual: bool,
}

impl Column {
    /// A nullable, non-key column of unknown type.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            quoted_name: quote_identifier(&name),
            name,
            type_oid: Type::UNKNOWN.oid(),
            not_null: false,
            primary_key: false,
            textual: false,
        }
    }

    /// Set the column type.
    pub fn typed(self, ty: Type) -> Self {
        self.type_oid(ty.oid())
    }

    /// Set the column type by oid.
    pub fn type_oid(mut self, oid: u32) -> Self {
        self.type_oid = oid;
        self
    }

    pub fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    /// Mark a non-built-in type whose values travel as text (enums, `citext`).
    pub fn textual(mut self) -> Self {
        self.textual = true;
        self
    }

    /// Unqualified catalog name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Quoted, escaped identifier.
    pub fn quoted_name(&self) -> &str {
        &self.quoted_name
    }

    pub fn oid(&self) -> u32 {
        self.type_oid
    }

    /// The built-in type for this column's oid, if it is one.
    pub fn pg_type(&self) -> Option<Type> {
        Type::from_oid(self.type_oid)
    }

    pub fn is_not_null(&self) -> bool {
        self.not_null
    }

    pub fn is_primary_key(&self) -> bool {
        self.primary_key
    }

    pub fn is_textual(&self) -> bool {
        self.textual
    }

    /// Whether [`Value`] can carry this column both ways.
    ///
    /// Columns declared without a type are accepted and left to the server.
    pub fn is_supported(&self) -> bool {
        self.textual
            || self.type_oid == Type::UNKNOWN.oid()
            || self.pg_type().is_some_and(|ty| Value::supports(&ty))
    }
}

/// A table definition that can still change.
pub struct TableDef<H = NoHooks> {
    schema: Option<String>,
    name: String,
    columns: Vec<Column>,
    config: TableConfig,
    hooks: H,
}

impl TableDef<NoHooks> {
    /// Define a table resolved through the search path.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            schema: None,
            name: name.into(),
            columns: Vec::new(),
            config: TableConfig::default(),
            hooks: NoHooks,
        }
    }

    /// Define a schema-qualified table.
    pub fn with_schema(schema: impl Into<String>, name: impl Into<String>) -> Self {
        let mut def = Self::new(name);
        def.schema = Some(schema.into());
        def
    }
}

impl<H: RecordHooks> TableDef<H> {
    /// Append a column. Columns must be given in physical order.
    pub fn column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Replace the configuration.
    pub fn config(mut self, config: TableConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the hooks.
    pub fn hooks<H2: RecordHooks>(self, hooks: H2) -> TableDef<H2> {
        TableDef {
            schema: self.schema,
            name: self.name,
            columns: self.columns,
            config: self.config,
            hooks,
        }
    }

    /// Replace the columns with the table's catalog metadata.
    pub async fn load_columns<C: GenericClient>(&mut self, conn: &C) -> OrmResult<()> {
        self.columns = catalog::load_columns(conn, self.schema.as_deref(), &self.name).await?;
        Ok(())
    }

    /// Compute every derived query fragment and freeze the table.
    pub fn finalize(self) -> OrmResult<Arc<Table<H>>> {
        if self.columns.is_empty() {
            return Err(OrmError::precondition(format!(
                "table {} has no columns",
                self.name
            )));
        }

        if let Some(column) = self.columns.iter().find(|c| !c.is_supported()) {
            let ty = column
                .pg_type()
                .map_or_else(|| format!("oid {}", column.type_oid), |ty| ty.to_string());
            return Err(OrmError::precondition(format!(
                "table {} column {} has unsupported type {}",
                self.name, column.name, ty
            )));
        }

        let mut index = HashMap::with_capacity(self.columns.len());
        for (i, column) in self.columns.iter().enumerate() {
            if index.insert(column.name.clone(), i).is_some() {
                return Err(OrmError::precondition(format!(
                    "table {} has duplicate column {}",
                    self.name, column.name
                )));
            }
        }

        let quoted_bare_name = quote_identifier(&self.name);
        let quoted_name = match &self.schema {
            Some(schema) => format!("{}.{}", quote_identifier(schema), quoted_bare_name),
            None => quoted_bare_name.clone(),
        };

        let primary_key = self
            .columns
            .iter()
            .enumerate()
            .filter(|(_, c)| c.primary_key)
            .map(|(i, _)| i)
            .collect::<Vec<_>>();

        let column_list = self
            .columns
            .iter()
            .map(|c| c.quoted_name.as_str())
            .collect::<Vec<_>>()
            .join(", ");

        let select_query = format!("select {column_list} from {quoted_name}");
        let primary_key_predicate = primary_key
            .iter()
            .enumerate()
            .map(|(n, &i)| format!("{} = ${}", self.columns[i].quoted_name, n + 1))
            .collect::<Vec<_>>()
            .join(" and ");
        let find_query = format!("{select_query} where {primary_key_predicate}");

        Ok(Arc::new(Table {
            schema: self.schema,
            name: self.name,
            columns: self.columns,
            config: self.config,
            hooks: self.hooks,
            quoted_name,
            quoted_bare_name,
            primary_key,
            index,
            select_query,
            primary_key_predicate,
            find_query,
            returning: column_list,
        }))
    }
}

/// A finalized, immutable table descriptor.
///
/// Shared by every [`Record`] created from it and safe to use from many tasks.
pub struct Table<H = NoHooks> {
    schema: Option<String>,
    name: String,
    columns: Vec<Column>,
    config: TableConfig,
    hooks: H,

    quoted_name: String,
    quoted_bare_name: String,
    primary_key: Vec<usize>,
    index: HashMap<String, usize>,
    select_query: String,
    primary_key_predicate: String,
    find_query: String,
    returning: String,
}

impl Table<NoHooks> {
    /// Load a table's columns from the catalog and finalize it.
    pub async fn load<C: GenericClient>(
        conn: &C,
        schema: Option<&str>,
        name: &str,
    ) -> OrmResult<Arc<Self>> {
        Self::load_with_hooks(conn, schema, name, NoHooks).await
    }
}

impl<H: RecordHooks> Table<H> {
    /// [`Table::load`] for a table with hooks.
    pub async fn load_with_hooks<C: GenericClient>(
        conn: &C,
        schema: Option<&str>,
        name: &str,
        hooks: H,
    ) -> OrmResult<Arc<Self>> {
        let def = match schema {
            Some(schema) => TableDef::with_schema(schema, name),
            None => TableDef::new(name),
        };
        let mut def = def.hooks(hooks);
        def.load_columns(conn).await?;
        def.finalize()
    }

    pub fn schema(&self) -> Option<&str> {
        self.schema.as_deref()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Quoted, schema-qualified when a schema was given.
    pub fn quoted_name(&self) -> &str {
        &self.quoted_name
    }

    /// Quoted table name without schema.
    pub fn quoted_bare_name(&self) -> &str {
        &self.quoted_bare_name
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.column_index(name).map(|i| &self.columns[i])
    }

    /// Position of `name` in the column list.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// Positions of the primary-key columns, in column order.
    pub fn primary_key_indexes(&self) -> &[usize] {
        &self.primary_key
    }

    pub fn has_primary_key(&self) -> bool {
        !self.primary_key.is_empty()
    }

    /// `"k1" = $1 and "k2" = $2 ...`
    pub fn primary_key_predicate(&self) -> &str {
        &self.primary_key_predicate
    }

    /// `select <all columns> from <table>`
    pub fn select_query(&self) -> &str {
        &self.select_query
    }

    /// [`select_query`](Self::select_query) filtered by the primary key.
    pub fn find_by_primary_key_query(&self) -> &str {
        &self.find_query
    }

    /// Every column, quoted, in column order.
    pub fn returning_clause(&self) -> &str {
        &self.returning
    }

    pub fn config(&self) -> &TableConfig {
        &self.config
    }

    pub fn hooks(&self) -> &H {
        &self.hooks
    }

    pub(crate) fn log(&self, kind: StatementKind, stmt: &Statement) {
        if self.config.log_sql {
            log_statement(kind, stmt, self.config.max_sql_length);
        }
    }

    pub(crate) fn require_primary_key(&self) -> OrmResult<()> {
        if self.has_primary_key() {
            Ok(())
        } else {
            Err(OrmError::precondition(format!(
                "table {} has no primary key",
                self.quoted_name
            )))
        }
    }

    /// An empty record: every attribute `Null`, nothing assigned, not persisted.
    pub fn new_record(self: &Arc<Self>) -> Record<H> {
        Record::new(Arc::clone(self))
    }

    /// Hydrate a persisted record from values in column order.
    pub fn record_from_values(self: &Arc<Self>, values: Vec<Value>) -> OrmResult<Record<H>> {
        self.check_width(values.len())?;
        Ok(Record::loaded(Arc::clone(self), values))
    }

    /// Hydrate a persisted record from a row selected with this table's columns.
    pub fn row_to_record(self: &Arc<Self>, row: &Row) -> OrmResult<Record<H>> {
        self.record_from_values(row.values()?)
    }

    pub(crate) fn check_width(&self, got: usize) -> OrmResult<()> {
        if got == self.columns.len() {
            Ok(())
        } else {
            Err(OrmError::precondition(format!(
                "table {} has {} columns, got {} values",
                self.quoted_name,
                self.columns.len(),
                got
            )))
        }
    }

    /// The select-by-primary-key statement for `key`, in primary-key column order.
    pub fn find_by_primary_key_statement<V: Into<Value>>(
        &self,
        key: impl IntoIterator<Item = V>,
    ) -> OrmResult<Statement> {
        self.require_primary_key()?;
        let args = key.into_iter().map(Into::into).collect::<Vec<Value>>();
        if args.len() != self.primary_key.len() {
            return Err(OrmError::precondition(format!(
                "table {} has {} primary key column(s), got {} value(s)",
                self.quoted_name,
                self.primary_key.len(),
                args.len()
            )));
        }
        Ok(Statement {
            sql: self.find_query.clone(),
            args,
        })
    }

    /// Select exactly one record by primary key.
    pub async fn find_by_primary_key<C, V>(
        self: &Arc<Self>,
        conn: &C,
        key: impl IntoIterator<Item = V>,
    ) -> OrmResult<Record<H>>
    where
        C: GenericClient,
        V: Into<Value>,
    {
        let stmt = self.find_by_primary_key_statement(key)?;
        self.log(StatementKind::Select, &stmt);
        let rows = conn.query(&stmt.sql, &stmt.params()).await?;
        self.row_to_record(&expect_one(rows)?)
    }

    /// Select records with `suffix` (e.g. `where "name" = $1 order by "id"`)
    /// appended to [`select_query`](Self::select_query). No rows is not an error.
    pub async fn select_records<C: GenericClient>(
        self: &Arc<Self>,
        conn: &C,
        suffix: &str,
        params: &[Value],
    ) -> OrmResult<Vec<Record<H>>> {
        let mut stmt = Statement::new(self.select_query.clone());
        if !suffix.is_empty() {
            stmt.push(" ").push(suffix);
        }
        stmt.args = params.to_vec();
        self.log(StatementKind::Select, &stmt);

        let rows = conn.query(&stmt.sql, &stmt.params()).await?;
        rows.iter().map(|row| self.row_to_record(row)).collect()
    }
}

impl<H> fmt::Debug for Table<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Table")
            .field("name", &self.quoted_name)
            .field("columns", &self.columns)
            .field("primary_key", &self.primary_key)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
