use super::*;
use crate::config::TableConfig;
use crate::table::{Column, TableDef};
use crate::validation::{ValidationCode, ValidationErrors};
use std::collections::HashMap;
use std::sync::Mutex;
use tokio_postgres::Row;
use tokio_postgres::types::{ToSql, Type};

fn widgets() -> Arc<Table> {
    widgets_with(TableConfig::default())
}

fn widgets_with(config: TableConfig) -> Arc<Table> {
    TableDef::new("widgets")
        .column(Column::new("id").typed(Type::INT4).not_null().primary_key())
        .column(Column::new("name").typed(Type::TEXT).not_null())
        .config(config)
        .finalize()
        .unwrap()
}

fn loaded(table: &Arc<Table>, id: i32, name: &str) -> Record {
    table
        .record_from_values(vec![Value::Int4(id), Value::from(name)])
        .unwrap()
}

/// A client whose every call fails, recording the SQL it was given.
#[derive(Default)]
struct Offline {
    calls: Mutex<Vec<String>>,
}

impl Offline {
    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl GenericClient for Offline {
    async fn query(&self, sql: &str, _params: &[&(dyn ToSql + Sync)]) -> OrmResult<Vec<Row>> {
        self.calls.lock().unwrap().push(sql.to_string());
        Err(OrmError::Other("offline".into()))
    }

    async fn execute(&self, sql: &str, _params: &[&(dyn ToSql + Sync)]) -> OrmResult<u64> {
        self.calls.lock().unwrap().push(sql.to_string());
        Err(OrmError::Other("offline".into()))
    }
}

#[test]
fn set_marks_assigned_and_get_reads_back() {
    let table = widgets();
    let mut record = table.new_record();
    record.set("name", "sprocket").unwrap();

    assert_eq!(record.get("name").unwrap(), &Value::from("sprocket"));
    assert!(record.is_assigned("name").unwrap());
    assert!(!record.is_assigned("id").unwrap());
    assert_eq!(record.assigned_columns(), vec!["name"]);
}

#[test]
fn unknown_attribute_is_reported() {
    let table = widgets();
    let mut record = table.new_record();
    assert!(record.set("colour", "red").unwrap_err().is_unknown_attribute());
    assert!(record.get("colour").unwrap_err().is_unknown_attribute());
    assert!(record.is_assigned("colour").unwrap_err().is_unknown_attribute());
}

#[test]
fn positional_access() {
    let table = widgets();
    let mut record = table.new_record();
    record.set_at(1, "gear").unwrap();
    assert_eq!(record.get_at(1), Some(&Value::from("gear")));
    assert_eq!(record.get_at(2), None);
    assert!(record.set_at(2, 1i32).unwrap_err().is_precondition());
}

#[test]
fn set_many_is_atomic() {
    let table = widgets();
    let mut record = table.new_record();

    let err = record
        .set_many([("name", Value::from("gear")), ("colour", Value::from("red"))])
        .unwrap_err();
    assert!(matches!(err, OrmError::UnknownAttribute(ref key) if key == "colour"));
    assert_eq!(record.get("name").unwrap(), &Value::Null);
    assert!(record.assigned_columns().is_empty());

    record
        .set_many([("name", Value::from("gear")), ("id", Value::Int4(3))])
        .unwrap();
    assert_eq!(record.assigned_columns(), vec!["id", "name"]);
}

#[test]
fn set_many_lenient_skips_unknown_keys() {
    let table = widgets();
    let mut record = table.new_record();

    let mut values = HashMap::new();
    values.insert("name".to_string(), Value::from("gear"));
    values.insert("colour".to_string(), Value::from("red"));

    let ignored = record.set_many_lenient(values);
    assert_eq!(ignored, vec!["colour".to_string()]);
    assert_eq!(record.get("name").unwrap(), &Value::from("gear"));
}

#[test]
fn attributes_include_unassigned_columns() {
    let table = widgets();
    let mut record = table.new_record();
    record.set("name", "gear").unwrap();

    let attrs = record.attributes();
    assert_eq!(attrs.len(), 2);
    assert_eq!(attrs["id"], Value::Null);
    assert_eq!(attrs["name"], Value::from("gear"));
    assert_eq!(
        serde_json::to_string(&attrs).unwrap(),
        r#"{"id":null,"name":"gear"}"#
    );
}

#[test]
fn insert_lists_exactly_the_assigned_columns() {
    let table = widgets();
    let mut record = table.new_record();
    record.set("name", "sprocket").unwrap();

    let stmt = record.insert_statement();
    assert_eq!(
        stmt.sql,
        r#"insert into "widgets" ("name") values ($1) returning "id", "name""#
    );
    assert_eq!(stmt.args, vec![Value::from("sprocket")]);
}

#[test]
fn insert_uses_column_order_for_placeholders() {
    let table = widgets();
    let mut record = table.new_record();
    record.set("name", "sprocket").unwrap();
    record.set("id", 42i32).unwrap();

    let stmt = record.insert_statement();
    assert_eq!(
        stmt.sql,
        r#"insert into "widgets" ("id", "name") values ($1, $2) returning "id", "name""#
    );
    assert_eq!(stmt.args, vec![Value::Int4(42), Value::from("sprocket")]);
}

#[test]
fn insert_with_nothing_assigned_uses_defaults() {
    let table = widgets();
    let stmt = table.new_record().insert_statement();
    assert_eq!(
        stmt.sql,
        r#"insert into "widgets" default values returning "id", "name""#
    );
    assert!(stmt.args.is_empty());
}

#[test]
fn hydrated_record_updates_even_when_all_null() {
    let table = widgets();
    let mut record = table
        .record_from_values(vec![Value::Null, Value::Null])
        .unwrap();
    assert!(!record.is_new());

    record.set("name", "gear").unwrap();
    let stmt = record.update_statement().unwrap();
    assert!(stmt.sql.starts_with(r#"update "widgets" set"#));
}

#[test]
fn update_sets_assigned_columns_and_keys_on_snapshot() {
    let table = widgets();
    let mut record = loaded(&table, 7, "gear");
    record.set("name", "cog").unwrap();

    let stmt = record.update_statement().unwrap();
    assert_eq!(
        stmt.sql,
        r#"update "widgets" set "name" = $1 where "id" = $2 returning "id", "name""#
    );
    assert_eq!(stmt.args, vec![Value::from("cog"), Value::Int4(7)]);
}

#[test]
fn update_of_primary_key_renames_the_row() {
    let table = widgets();
    let mut record = loaded(&table, 7, "gear");
    record.set("id", 8i32).unwrap();

    let stmt = record.update_statement().unwrap();
    assert_eq!(
        stmt.sql,
        r#"update "widgets" set "id" = $1 where "id" = $2 returning "id", "name""#
    );
    assert_eq!(stmt.args, vec![Value::Int4(8), Value::Int4(7)]);
    assert_eq!(record.primary_key_values(), vec![Value::Int4(8)]);
    assert_eq!(record.original("id").unwrap(), Some(&Value::Int4(7)));
}

#[test]
fn update_can_skip_primary_key_columns() {
    let table = widgets_with(TableConfig::new().update_primary_key(false));
    let mut record = loaded(&table, 7, "gear");
    record.set("id", 8i32).unwrap();
    assert!(record.update_statement().unwrap_err().is_precondition());

    record.set("name", "cog").unwrap();
    let stmt = record.update_statement().unwrap();
    assert_eq!(
        stmt.sql,
        r#"update "widgets" set "name" = $1 where "id" = $2 returning "id", "name""#
    );
}

#[test]
fn placeholders_match_arguments() {
    let table = TableDef::new("line_items")
        .column(Column::new("order_id").primary_key())
        .column(Column::new("qty"))
        .column(Column::new("note"))
        .column(Column::new("line_no").primary_key())
        .finalize()
        .unwrap();
    let mut record = table
        .record_from_values(vec![
            Value::Int8(10),
            Value::Int4(1),
            Value::Null,
            Value::Int2(2),
        ])
        .unwrap();
    record.set("note", "rush").unwrap();
    record.set("qty", 5i32).unwrap();

    let stmt = record.update_statement().unwrap();
    assert_eq!(
        stmt.sql,
        concat!(
            r#"update "line_items" set "qty" = $1, "note" = $2"#,
            r#" where "order_id" = $3 and "line_no" = $4"#,
            r#" returning "order_id", "qty", "note", "line_no""#
        )
    );
    assert_eq!(
        stmt.args,
        vec![
            Value::Int4(5),
            Value::from("rush"),
            Value::Int8(10),
            Value::Int2(2),
        ]
    );
    for n in 1..=stmt.args.len() {
        assert!(stmt.sql.contains(&format!("${n}")));
    }
    assert!(!stmt.sql.contains(&format!("${}", stmt.args.len() + 1)));
}

#[test]
fn delete_statement_uses_cached_predicate() {
    let table = widgets();
    let record = loaded(&table, 7, "gear");
    let stmt = record.delete_statement().unwrap();
    assert_eq!(stmt.sql, r#"delete from "widgets" where "id" = $1"#);
    assert_eq!(stmt.args, vec![Value::Int4(7)]);

    assert!(table.new_record().delete_statement().unwrap_err().is_precondition());
}

#[tokio::test]
async fn second_save_without_changes_is_rejected() {
    let table = widgets();
    let mut record = table.new_record();
    record.set("name", "sprocket").unwrap();
    assert_eq!(
        record.insert_statement().sql,
        r#"insert into "widgets" ("name") values ($1) returning "id", "name""#
    );

    // The state a successful insert leaves behind.
    let mut record = loaded(&table, 1, "sprocket");
    let conn = Offline::default();
    let err = record.save(&conn).await.unwrap_err();
    assert!(err.is_precondition());
    assert!(conn.calls().is_empty());
}

#[tokio::test]
async fn empty_update_can_be_a_noop() {
    let table = widgets_with(TableConfig::new().empty_update(EmptyUpdatePolicy::Noop));
    let mut record = loaded(&table, 1, "sprocket");
    let conn = Offline::default();
    record.save(&conn).await.unwrap();
    assert!(conn.calls().is_empty());
}

#[tokio::test]
async fn failed_save_leaves_record_unchanged() {
    let table = widgets();
    let mut record = loaded(&table, 1, "sprocket");
    record.set("name", "cog").unwrap();

    let conn = Offline::default();
    let err = record.save(&conn).await.unwrap_err();
    assert!(matches!(err, OrmError::Other(_)));
    assert_eq!(conn.calls().len(), 1);
    assert!(conn.calls()[0].starts_with(r#"update "widgets""#));

    assert_eq!(record.get("name").unwrap(), &Value::from("cog"));
    assert!(record.is_assigned("name").unwrap());
    assert_eq!(record.original("name").unwrap(), Some(&Value::from("sprocket")));
}

#[tokio::test]
async fn delete_of_new_record_is_rejected() {
    let table = widgets();
    let conn = Offline::default();
    let err = table.new_record().delete(&conn).await.unwrap_err();
    assert!(err.is_precondition());
    assert!(conn.calls().is_empty());
}

#[tokio::test]
async fn find_surfaces_driver_errors() {
    let table = widgets();
    let conn = Offline::default();
    let err = table.find_by_primary_key(&conn, [1i32]).await.unwrap_err();
    assert!(matches!(err, OrmError::Other(_)));
    assert_eq!(conn.calls(), vec![table.find_by_primary_key_query().to_string()]);
}

struct Trimmed;

impl RecordHooks for Trimmed {
    async fn normalize<C: GenericClient>(
        &self,
        _conn: &C,
        _table: &Table<Self>,
        record: &mut Record<Self>,
    ) -> OrmResult<()> {
        let trimmed = record.get("name")?.as_str().map(|s| s.trim().to_string());
        if let Some(name) = trimmed {
            record.set("name", name)?;
        }
        Ok(())
    }

    async fn validate<C: GenericClient>(
        &self,
        _conn: &C,
        _table: &Table<Self>,
        record: &Record<Self>,
    ) -> OrmResult<ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if record.get("name")?.as_str().is_none_or(str::is_empty) {
            errors.add("name", ValidationCode::Required, "can't be blank");
        }
        Ok(errors)
    }

    fn map_db_error(&self, _err: OrmError) -> OrmError {
        OrmError::Other("mapped".into())
    }
}

fn trimmed_widgets() -> Arc<Table<Trimmed>> {
    TableDef::new("widgets")
        .column(Column::new("id").typed(Type::INT4).primary_key())
        .column(Column::new("name").typed(Type::TEXT))
        .hooks(Trimmed)
        .finalize()
        .unwrap()
}

#[tokio::test]
async fn validation_failure_aborts_before_the_database() {
    let table = trimmed_widgets();
    let mut record = table.new_record();
    record.set("name", "   ").unwrap();

    let conn = Offline::default();
    let err = record.save(&conn).await.unwrap_err();
    let detail = err.validation_errors().unwrap();
    assert_eq!(detail.on("name")[0].code, ValidationCode::Required);
    assert!(conn.calls().is_empty());

    // normalize ran before validation failed
    assert_eq!(record.get("name").unwrap(), &Value::from(""));
    assert!(record.is_new());
}

#[tokio::test]
async fn normalized_values_reach_the_statement() {
    let table = trimmed_widgets();
    let mut record = table.new_record();
    record.set("name", "  gear ").unwrap();

    let conn = Offline::default();
    let err = record.save(&conn).await.unwrap_err();
    // Only driver errors go through map_db_error.
    assert!(matches!(err, OrmError::Other(ref m) if m == "offline"));
    assert_eq!(record.insert_statement().args, vec![Value::from("gear")]);
}

/// A client whose queries match no rows and whose statements affect a fixed
/// number of rows.
struct NoMatch {
    affected: u64,
    calls: Mutex<Vec<String>>,
}

impl NoMatch {
    fn affecting(affected: u64) -> Self {
        Self {
            affected,
            calls: Mutex::new(Vec::new()),
        }
    }
}

impl GenericClient for NoMatch {
    async fn query(&self, sql: &str, _params: &[&(dyn ToSql + Sync)]) -> OrmResult<Vec<Row>> {
        self.calls.lock().unwrap().push(sql.to_string());
        Ok(Vec::new())
    }

    async fn execute(&self, sql: &str, _params: &[&(dyn ToSql + Sync)]) -> OrmResult<u64> {
        self.calls.lock().unwrap().push(sql.to_string());
        Ok(self.affected)
    }
}

#[test]
fn reload_takes_returned_row_as_persisted_state() {
    let table = widgets();
    let mut record = table.new_record();
    record.set("name", "sprocket").unwrap();

    record
        .reload(vec![Value::Int4(41), Value::from("sprocket")])
        .unwrap();
    assert!(!record.is_new());
    assert!(record.assigned_columns().is_empty());
    assert_eq!(record.get("id").unwrap(), &Value::Int4(41));
    assert_eq!(record.original("id").unwrap(), Some(&Value::Int4(41)));

    // Unassigned columns follow the database too (defaults, triggers).
    record.set("name", "cog").unwrap();
    record
        .reload(vec![Value::Int4(41), Value::from("COG")])
        .unwrap();
    assert_eq!(record.get("name").unwrap(), &Value::from("COG"));
    assert_eq!(record.original("name").unwrap(), Some(&Value::from("COG")));
    assert!(!record.is_assigned("name").unwrap());
}

#[test]
fn reload_rejects_a_row_of_the_wrong_width() {
    let table = widgets();
    let mut record = table.new_record();
    record.set("name", "sprocket").unwrap();

    let err = record.reload(vec![Value::Int4(41)]).unwrap_err();
    assert!(err.is_precondition());
    assert!(record.is_new());
    assert_eq!(record.assigned_columns(), vec!["name"]);
}

#[tokio::test]
async fn noop_policy_still_rejects_a_filtered_out_key() {
    let table = widgets_with(
        TableConfig::new()
            .empty_update(EmptyUpdatePolicy::Noop)
            .update_primary_key(false),
    );
    let mut record = loaded(&table, 7, "gear");
    record.set("id", 8i32).unwrap();

    let conn = Offline::default();
    let err = record.save(&conn).await.unwrap_err();
    assert!(err.is_precondition());
    assert!(err.to_string().contains("primary-key updates are disabled"));
    assert!(conn.calls().is_empty());
    assert_eq!(record.assigned_columns(), vec!["id"]);
    assert_eq!(record.original("id").unwrap(), Some(&Value::Int4(7)));
}

#[tokio::test]
async fn saving_a_stale_record_is_not_found() {
    let table = widgets();
    let mut record = loaded(&table, 7, "gear");
    record.set("name", "cog").unwrap();

    let conn = NoMatch::affecting(0);
    let err = record.save(&conn).await.unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(conn.calls.lock().unwrap().len(), 1);
    assert!(record.is_assigned("name").unwrap());
    assert_eq!(record.original("name").unwrap(), Some(&Value::from("gear")));
}

#[tokio::test]
async fn find_with_no_match_is_not_found() {
    let table = widgets();
    let conn = NoMatch::affecting(0);
    let err = table.find_by_primary_key(&conn, [7i32]).await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn delete_follows_affected_row_policy() {
    let table = widgets();
    let record = loaded(&table, 7, "gear");

    record.delete(&NoMatch::affecting(1)).await.unwrap();
    assert!(
        record
            .delete(&NoMatch::affecting(0))
            .await
            .unwrap_err()
            .is_not_found()
    );
    let err = record.delete(&NoMatch::affecting(2)).await.unwrap_err();
    assert!(matches!(err, OrmError::TooManyRows { expected: 1, got: 2 }));
    assert!(!record.is_new());
}
