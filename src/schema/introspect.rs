//! Read the live SQLite schema back into a [`Catalog`].

use diesel::prelude::*;
use diesel::sql_types::{Integer, Nullable, Text};
use diesel::SqliteConnection;
use tracing::debug;

use super::{Catalog, Column, ForeignKey, Index, ReferentialAction, Table};
use crate::error::{Error, Result};

/// Bookkeeping table maintained by the migration runner.
pub const MIGRATIONS_TABLE: &str = "__diesel_schema_migrations";

#[derive(QueryableByName)]
struct TableName {
    #[diesel(sql_type = Text)]
    name: String,
}

#[derive(QueryableByName)]
struct ColumnInfo {
    #[diesel(sql_type = Text)]
    name: String,
    #[diesel(sql_type = Text)]
    column_type: String,
    #[diesel(sql_type = Integer)]
    not_null: i32,
    #[diesel(sql_type = Nullable<Text>)]
    default_value: Option<String>,
    #[diesel(sql_type = Integer)]
    pk: i32,
}

#[derive(QueryableByName)]
struct IndexInfo {
    #[diesel(sql_type = Text)]
    name: String,
    #[diesel(sql_type = Integer)]
    is_unique: i32,
    #[diesel(sql_type = Text)]
    origin: String,
}

#[derive(QueryableByName)]
struct IndexColumn {
    #[diesel(sql_type = Nullable<Text>)]
    name: Option<String>,
}

#[derive(QueryableByName)]
struct ForeignKeyInfo {
    #[diesel(sql_type = Text)]
    ref_table: String,
    #[diesel(sql_type = Text)]
    from_column: String,
    #[diesel(sql_type = Nullable<Text>)]
    to_column: Option<String>,
    #[diesel(sql_type = Text)]
    on_delete: String,
}

/// Names of user tables, excluding SQLite internals and the migration
/// bookkeeping table, in creation order.
///
/// # Errors
/// Returns an error if `sqlite_master` cannot be read.
pub fn table_names(conn: &mut SqliteConnection) -> Result<Vec<String>> {
    let rows: Vec<TableName> = diesel::sql_query(
        "SELECT name FROM sqlite_master \
         WHERE type = 'table' AND name NOT LIKE 'sqlite_%' AND name != ? \
         ORDER BY rowid",
    )
    .bind::<Text, _>(MIGRATIONS_TABLE)
    .load(conn)?;
    Ok(rows.into_iter().map(|r| r.name).collect())
}

/// Introspect every user table of the connected database.
///
/// # Errors
/// Returns an error if a pragma query fails or reports an unknown
/// referential action.
pub fn live_catalog(conn: &mut SqliteConnection) -> Result<Catalog> {
    let mut tables = Vec::new();
    for name in table_names(conn)? {
        tables.push(read_table(conn, &name)?);
    }
    debug!(tables = tables.len(), "introspected live schema");
    Ok(Catalog::new(dependency_order(tables)))
}

fn read_table(conn: &mut SqliteConnection, name: &str) -> Result<Table> {
    let columns: Vec<ColumnInfo> = diesel::sql_query(
        "SELECT name, type AS column_type, \"notnull\" AS not_null, \
         dflt_value AS default_value, pk \
         FROM pragma_table_info(?) ORDER BY cid",
    )
    .bind::<Text, _>(name)
    .load(conn)?;

    let mut table = Table::new(name);
    table.columns = columns
        .into_iter()
        .map(|c| Column {
            name: c.name,
            sql_type: c.column_type,
            nullable: c.not_null == 0,
            primary_key: c.pk > 0,
            default: c.default_value,
        })
        .collect();

    let indexes: Vec<IndexInfo> = diesel::sql_query(
        "SELECT name, \"unique\" AS is_unique, origin \
         FROM pragma_index_list(?) ORDER BY seq",
    )
    .bind::<Text, _>(name)
    .load(conn)?;

    // Only explicitly created indexes; constraint-backed autoindexes are
    // implied by the column definitions.
    for info in indexes.into_iter().filter(|i| i.origin == "c") {
        let columns: Vec<IndexColumn> =
            diesel::sql_query("SELECT name FROM pragma_index_info(?) ORDER BY seqno")
                .bind::<Text, _>(&info.name)
                .load(conn)?;
        table.indexes.push(Index {
            name: info.name,
            columns: columns.into_iter().filter_map(|c| c.name).collect(),
            unique: info.is_unique != 0,
        });
    }
    table.indexes.reverse();

    let foreign_keys: Vec<ForeignKeyInfo> = diesel::sql_query(
        "SELECT \"table\" AS ref_table, \"from\" AS from_column, \
         \"to\" AS to_column, on_delete \
         FROM pragma_foreign_key_list(?) ORDER BY id DESC, seq",
    )
    .bind::<Text, _>(name)
    .load(conn)?;

    for fk in foreign_keys {
        let on_delete = ReferentialAction::from_sql(&fk.on_delete).ok_or_else(|| {
            Error::Parse(format!(
                "unknown ON DELETE action '{}' on {name}.{}",
                fk.on_delete, fk.from_column
            ))
        })?;
        table.foreign_keys.push(ForeignKey {
            column: fk.from_column,
            references_table: fk.ref_table,
            references_column: fk.to_column.unwrap_or_else(|| "id".to_string()),
            on_delete,
        });
    }

    Ok(table)
}

/// Stable topological order: a table follows every table it references.
///
/// Tables in a reference cycle keep their relative order.
fn dependency_order(mut pending: Vec<Table>) -> Vec<Table> {
    let mut ordered: Vec<Table> = Vec::with_capacity(pending.len());
    while !pending.is_empty() {
        let ready = pending.iter().position(|table| {
            table.foreign_keys.iter().all(|fk| {
                fk.references_table == table.name
                    || !pending.iter().any(|p| p.name == fk.references_table)
            })
        });
        // A cycle leaves nothing ready; take the first table as is.
        let next = pending.remove(ready.unwrap_or(0));
        ordered.push(next);
    }
    ordered
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(name: &str, references: &[&str]) -> Table {
        references.iter().fold(
            Table::new(name).column(Column::primary_key("id")),
            |t, r| t.foreign_key(&format!("{r}_id"), r, ReferentialAction::Cascade),
        )
    }

    #[test]
    fn dependency_order_moves_children_after_parents() {
        let ordered = dependency_order(vec![
            table("orders", &["assets", "users"]),
            table("users", &[]),
            table("assets", &[]),
        ]);
        let names: Vec<_> = ordered.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, ["users", "assets", "orders"]);
    }

    #[test]
    fn dependency_order_ignores_self_references() {
        let ordered = dependency_order(vec![table("nodes", &["nodes"]), table("roots", &[])]);
        let names: Vec<_> = ordered.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, ["nodes", "roots"]);
    }
}
