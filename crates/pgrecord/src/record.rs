//! Dynamically typed rows bound to a [`Table`].
//!
//! A [`Record`] holds one [`Value`] per column in column order, a flag per
//! column telling whether it was assigned since the last load or save, and a
//! snapshot of the values last read from the database. The snapshot's presence
//! alone decides whether [`Record::save`] inserts or updates: a record hydrated
//! from a row updates even when every value is `Null`.

use crate::client::GenericClient;
use crate::config::EmptyUpdatePolicy;
use crate::error::{OrmError, OrmResult};
use crate::hooks::{NoHooks, RecordHooks};
use crate::query::{expect_affected_one, expect_one};
use crate::row::RowExt;
use crate::stmt::Statement;
use crate::table::Table;
use crate::trace::StatementKind;
use crate::value::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// One row of a [`Table`].
///
/// A record is owned by one caller at a time; `save` and the setters take
/// `&mut self`, so concurrent mutation is ruled out by the borrow checker.
pub struct Record<H = NoHooks> {
    table: Arc<Table<H>>,
    attributes: Vec<Value>,
    assigned: Vec<bool>,
    original: Option<Vec<Value>>,
}

impl<H: RecordHooks> Record<H> {
    pub(crate) fn new(table: Arc<Table<H>>) -> Self {
        let width = table.columns().len();
        Self {
            table,
            attributes: vec![Value::Null; width],
            assigned: vec![false; width],
            original: None,
        }
    }

    pub(crate) fn loaded(table: Arc<Table<H>>, values: Vec<Value>) -> Self {
        let width = values.len();
        Self {
            table,
            attributes: values.clone(),
            assigned: vec![false; width],
            original: Some(values),
        }
    }

    pub fn table(&self) -> &Arc<Table<H>> {
        &self.table
    }

    fn index_of(&self, name: &str) -> OrmResult<usize> {
        self.table
            .column_index(name)
            .ok_or_else(|| OrmError::UnknownAttribute(name.to_string()))
    }

    /// Current value of column `name`.
    pub fn get(&self, name: &str) -> OrmResult<&Value> {
        let i = self.index_of(name)?;
        Ok(&self.attributes[i])
    }

    /// Current value of the column at position `index`.
    pub fn get_at(&self, index: usize) -> Option<&Value> {
        self.attributes.get(index)
    }

    /// Assign column `name` and mark it for the next save.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> OrmResult<()> {
        let i = self.index_of(name)?;
        self.assign(i, value.into());
        Ok(())
    }

    /// Assign the column at position `index`.
    pub fn set_at(&mut self, index: usize, value: impl Into<Value>) -> OrmResult<()> {
        if index >= self.attributes.len() {
            return Err(OrmError::precondition(format!(
                "column index {index} out of range for table {}",
                self.table.quoted_name()
            )));
        }
        self.assign(index, value.into());
        Ok(())
    }

    fn assign(&mut self, index: usize, value: Value) {
        self.attributes[index] = value;
        self.assigned[index] = true;
    }

    /// Assign several columns at once.
    ///
    /// Fails with [`OrmError::UnknownAttribute`] on the first unknown key, in
    /// which case nothing is assigned.
    pub fn set_many<K, V>(&mut self, values: impl IntoIterator<Item = (K, V)>) -> OrmResult<()>
    where
        K: AsRef<str>,
        V: Into<Value>,
    {
        let resolved = values
            .into_iter()
            .map(|(k, v)| Ok((self.index_of(k.as_ref())?, v.into())))
            .collect::<OrmResult<Vec<_>>>()?;
        for (i, value) in resolved {
            self.assign(i, value);
        }
        Ok(())
    }

    /// Assign the known columns among `values` and return the keys that were
    /// skipped because the table has no such column.
    pub fn set_many_lenient<K, V>(&mut self, values: impl IntoIterator<Item = (K, V)>) -> Vec<String>
    where
        K: AsRef<str>,
        V: Into<Value>,
    {
        let mut ignored = Vec::new();
        for (k, v) in values {
            match self.table.column_index(k.as_ref()) {
                Some(i) => self.assign(i, v.into()),
                None => ignored.push(k.as_ref().to_string()),
            }
        }
        ignored
    }

    /// Every column's current value by name, assigned or not.
    pub fn attributes(&self) -> BTreeMap<String, Value> {
        self.table
            .columns()
            .iter()
            .zip(&self.attributes)
            .map(|(c, v)| (c.name().to_string(), v.clone()))
            .collect()
    }

    /// Current values in column order.
    pub fn values(&self) -> &[Value] {
        &self.attributes
    }

    pub fn is_assigned(&self, name: &str) -> OrmResult<bool> {
        let i = self.index_of(name)?;
        Ok(self.assigned[i])
    }

    /// Names of the assigned columns, in column order.
    pub fn assigned_columns(&self) -> Vec<&str> {
        self.assigned_indexes()
            .map(|i| self.table.columns()[i].name())
            .collect()
    }

    fn assigned_indexes(&self) -> impl Iterator<Item = usize> + '_ {
        self.assigned
            .iter()
            .enumerate()
            .filter(|(_, a)| **a)
            .map(|(i, _)| i)
    }

    /// Whether the record has never been read from or written to the database.
    pub fn is_new(&self) -> bool {
        self.original.is_none()
    }

    /// Value of `name` as last read from the database.
    pub fn original(&self, name: &str) -> OrmResult<Option<&Value>> {
        let i = self.index_of(name)?;
        Ok(self.original.as_ref().map(|o| &o[i]))
    }

    /// Current primary-key values, in primary-key order.
    pub fn primary_key_values(&self) -> Vec<Value> {
        self.table
            .primary_key_indexes()
            .iter()
            .map(|&i| self.attributes[i].clone())
            .collect()
    }

    fn persisted_key(&self) -> OrmResult<&[Value]> {
        self.table.require_primary_key()?;
        self.original.as_deref().ok_or_else(|| {
            OrmError::precondition(format!(
                "record of {} has not been saved",
                self.table.quoted_name()
            ))
        })
    }

    /// `insert into T (<assigned>) values (...) returning <all columns>`.
    ///
    /// Columns are listed in column order. With nothing assigned the row is
    /// inserted with `default values`.
    pub fn insert_statement(&self) -> Statement {
        let table = &self.table;
        let mut stmt = Statement::new(format!("insert into {}", table.quoted_name()));

        let assigned = self.assigned_indexes().collect::<Vec<_>>();
        if assigned.is_empty() {
            stmt.push(" default values");
        } else {
            let columns = assigned
                .iter()
                .map(|&i| table.columns()[i].quoted_name())
                .collect::<Vec<_>>()
                .join(", ");
            stmt.push(" (").push(&columns).push(") values (");
            for (n, &i) in assigned.iter().enumerate() {
                if n > 0 {
                    stmt.push(", ");
                }
                stmt.push_bind(self.attributes[i].clone());
            }
            stmt.push(")");
        }

        stmt.push(" returning ").push(table.returning_clause());
        stmt
    }

    fn update_targets(&self) -> Vec<usize> {
        let include_key = self.table.config().update_primary_key;
        self.assigned_indexes()
            .filter(|&i| include_key || !self.table.columns()[i].is_primary_key())
            .collect()
    }

    /// `update T set <assigned> where <key> returning <all columns>`.
    ///
    /// The key is matched against the values last read from the database, so
    /// assigning a new key value moves the row. Fails with
    /// [`OrmError::Precondition`] for a new record, a table without a primary
    /// key, or when nothing would be set.
    pub fn update_statement(&self) -> OrmResult<Statement> {
        let key = self.persisted_key()?;
        let table = &self.table;
        let targets = self.update_targets();
        if targets.is_empty() {
            let reason = if self.assigned_indexes().next().is_some() {
                "only primary-key columns are assigned and primary-key updates are disabled"
            } else {
                "no assigned columns"
            };
            return Err(OrmError::precondition(format!(
                "update of {} has {reason}",
                table.quoted_name()
            )));
        }

        let mut stmt = Statement::new(format!("update {} set ", table.quoted_name()));
        for (n, &i) in targets.iter().enumerate() {
            if n > 0 {
                stmt.push(", ");
            }
            stmt.push(table.columns()[i].quoted_name())
                .push(" = ")
                .push_bind(self.attributes[i].clone());
        }

        stmt.push(" where ");
        for (n, &i) in table.primary_key_indexes().iter().enumerate() {
            if n > 0 {
                stmt.push(" and ");
            }
            stmt.push(table.columns()[i].quoted_name())
                .push(" = ")
                .push_bind(key[i].clone());
        }

        stmt.push(" returning ").push(table.returning_clause());
        Ok(stmt)
    }

    /// `delete from T where <key>`, keyed like [`update_statement`](Self::update_statement).
    pub fn delete_statement(&self) -> OrmResult<Statement> {
        let key = self.persisted_key()?;
        let table = &self.table;
        Ok(Statement {
            sql: format!(
                "delete from {} where {}",
                table.quoted_name(),
                table.primary_key_predicate()
            ),
            args: table
                .primary_key_indexes()
                .iter()
                .map(|&i| key[i].clone())
                .collect(),
        })
    }

    fn map_db_error(&self, err: OrmError) -> OrmError {
        match err {
            OrmError::Query(_) => self.table.hooks().map_db_error(err),
            other => other,
        }
    }

    /// Insert or update the record.
    ///
    /// Runs the table's hooks, issues one row-returning statement and, on
    /// success, reloads every attribute from the returned row, refreshes the
    /// snapshot and clears the assigned flags. On failure the record is left
    /// as it was, except for changes made by `normalize`.
    pub async fn save<C: GenericClient>(&mut self, conn: &C) -> OrmResult<()> {
        let table = Arc::clone(&self.table);
        let hooks = table.hooks();

        hooks.normalize(conn, &table, self).await?;
        let errors = hooks.validate(conn, &table, self).await?;
        if !errors.is_empty() {
            return Err(OrmError::Validation(errors));
        }

        let (kind, stmt) = if self.is_new() {
            (StatementKind::Insert, self.insert_statement())
        } else {
            // Noop covers an untouched record only, not a filtered-out key.
            if self.assigned_indexes().next().is_none()
                && table.config().empty_update == EmptyUpdatePolicy::Noop
            {
                return Ok(());
            }
            (StatementKind::Update, self.update_statement()?)
        };

        table.log(kind, &stmt);
        let rows = conn
            .query(&stmt.sql, &stmt.params())
            .await
            .map_err(|e| self.map_db_error(e))?;
        self.reload(expect_one(rows)?.values()?)
    }

    /// Take the values returned by a write as the new persisted state.
    fn reload(&mut self, values: Vec<Value>) -> OrmResult<()> {
        self.table.check_width(values.len())?;
        self.attributes.clone_from(&values);
        self.original = Some(values);
        self.assigned.fill(false);
        Ok(())
    }

    /// Delete the persisted row. The record itself is not changed.
    pub async fn delete<C: GenericClient>(&self, conn: &C) -> OrmResult<()> {
        let stmt = self.delete_statement()?;
        self.table.log(StatementKind::Delete, &stmt);
        let affected = conn
            .execute(&stmt.sql, &stmt.params())
            .await
            .map_err(|e| self.map_db_error(e))?;
        expect_affected_one(affected)
    }
}

impl<H> Clone for Record<H> {
    fn clone(&self) -> Self {
        Self {
            table: Arc::clone(&self.table),
            attributes: self.attributes.clone(),
            assigned: self.assigned.clone(),
            original: self.original.clone(),
        }
    }
}

impl<H> fmt::Debug for Record<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Record")
            .field("table", &self.table)
            .field("attributes", &self.attributes)
            .field("assigned", &self.assigned)
            .field("persisted", &self.original.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests;
