//! Column metadata from the Postgres system catalogs.

use crate::client::GenericClient;
use crate::error::{OrmError, OrmResult};
use crate::row::RowExt;
use crate::table::Column;

const VISIBLE_TABLE_OID_SQL: &str = r#"
select c.oid
from pg_catalog.pg_class c
  join pg_catalog.pg_namespace n on n.oid = c.relnamespace
where c.relname = $1
  and pg_catalog.pg_table_is_visible(c.oid)
limit 1
"#;

const SCHEMA_TABLE_OID_SQL: &str = r#"
select c.oid
from pg_catalog.pg_class c
  join pg_catalog.pg_namespace n on n.oid = c.relnamespace
where c.relname = $1
  and n.nspname = $2
limit 1
"#;

const COLUMNS_SQL: &str = r#"
select a.attname,
  case when t.typtype = 'd' then t.typbasetype else a.atttypid end as typid,
  (t.typtype = 'e' or t.typname = 'citext') as istextual,
  a.attnotnull,
  coalesce((
    select true
    from pg_catalog.pg_index i
    where i.indrelid = a.attrelid
      and i.indisprimary
      and a.attnum = any(i.indkey)
  ), false) as isprimary
from pg_catalog.pg_attribute a
  join pg_catalog.pg_type t on t.oid = a.atttypid
where a.attrelid = $1
  and a.attnum > 0
  and not a.attisdropped
order by a.attnum
"#;

/// Resolve the oid of `table`.
///
/// Without a schema the relation visible on the search path wins.
pub async fn table_oid<C: GenericClient>(
    conn: &C,
    schema: Option<&str>,
    table: &str,
) -> OrmResult<u32> {
    let rows = match schema {
        Some(schema) => conn.query(SCHEMA_TABLE_OID_SQL, &[&table, &schema]).await?,
        None => conn.query(VISIBLE_TABLE_OID_SQL, &[&table]).await?,
    };

    let qualified = match schema {
        Some(schema) => format!("{schema}.{table}"),
        None => table.to_string(),
    };
    let row = rows
        .first()
        .ok_or_else(|| OrmError::not_found(format!("table {qualified} does not exist")))?;
    row.try_get_column::<u32>("oid")
}

/// Load the user columns of `table` in physical order.
///
/// Domain columns report their base type. Enum and `citext` columns are
/// marked [`textual`](Column::textual).
pub async fn load_columns<C: GenericClient>(
    conn: &C,
    schema: Option<&str>,
    table: &str,
) -> OrmResult<Vec<Column>> {
    let oid = table_oid(conn, schema, table).await?;
    let rows = conn.query(COLUMNS_SQL, &[&oid]).await?;

    let mut columns = Vec::with_capacity(rows.len());
    for row in rows {
        let name: String = row.try_get_column("attname")?;
        let type_oid: u32 = row.try_get_column("typid")?;
        let textual: bool = row.try_get_column("istextual")?;
        let not_null: bool = row.try_get_column("attnotnull")?;
        let primary_key: bool = row.try_get_column("isprimary")?;

        let mut column = Column::new(name).type_oid(type_oid);
        if not_null {
            column = column.not_null();
        }
        if primary_key {
            column = column.primary_key();
        }
        if textual {
            column = column.textual();
        }
        columns.push(column);
    }

    tracing::debug!(
        target: "pgrecord.catalog",
        table,
        schema = schema.unwrap_or("-"),
        oid,
        column_count = columns.len(),
        "loaded table columns"
    );
    Ok(columns)
}
