//! Structural comparison of two catalogs.

use std::fmt;

use super::{Catalog, Column, ForeignKey, Index, Table};

/// One difference between a target catalog and a live one, phrased as the
/// change that moves the live schema toward the target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaChange {
    AddTable(Table),
    DropTable(Table),
    AddColumn {
        table: String,
        column: Column,
    },
    DropColumn {
        table: String,
        column: Column,
    },
    AlterColumn {
        table: String,
        from: Column,
        to: Column,
    },
    AddIndex {
        table: String,
        index: Index,
    },
    DropIndex {
        table: String,
        index: Index,
    },
    AlterForeignKeys {
        table: String,
        from: Vec<ForeignKey>,
        to: Vec<ForeignKey>,
    },
}

impl SchemaChange {
    /// Name of the table the change applies to.
    #[must_use]
    pub fn table(&self) -> &str {
        match self {
            Self::AddTable(t) | Self::DropTable(t) => &t.name,
            Self::AddColumn { table, .. }
            | Self::DropColumn { table, .. }
            | Self::AlterColumn { table, .. }
            | Self::AddIndex { table, .. }
            | Self::DropIndex { table, .. }
            | Self::AlterForeignKeys { table, .. } => table,
        }
    }
}

fn describe(column: &Column) -> String {
    let mut text = column.sql_type.clone();
    text.push_str(if column.nullable { " NULL" } else { " NOT NULL" });
    if let Some(default) = &column.default {
        text.push_str(" DEFAULT ");
        text.push_str(default);
    }
    text
}

impl fmt::Display for SchemaChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AddTable(t) => write!(f, "+ table {}", t.name),
            Self::DropTable(t) => write!(f, "- table {}", t.name),
            Self::AddColumn { table, column } => {
                write!(f, "+ column {table}.{} {}", column.name, describe(column))
            }
            Self::DropColumn { table, column } => write!(f, "- column {table}.{}", column.name),
            Self::AlterColumn { table, from, to } => write!(
                f,
                "~ column {table}.{}: {} -> {}",
                to.name,
                describe(from),
                describe(to)
            ),
            Self::AddIndex { table, index } => write!(
                f,
                "+ {}index {} on {table} ({})",
                if index.unique { "unique " } else { "" },
                index.name,
                index.columns.join(", ")
            ),
            Self::DropIndex { table, index } => write!(f, "- index {} on {table}", index.name),
            Self::AlterForeignKeys { table, to, .. } => {
                let keys: Vec<String> = to
                    .iter()
                    .map(|fk| {
                        format!(
                            "{} -> {}.{} ({})",
                            fk.column, fk.references_table, fk.references_column, fk.on_delete
                        )
                    })
                    .collect();
                write!(f, "~ foreign keys {table}: [{}]", keys.join(", "))
            }
        }
    }
}

/// Declared types compare case-insensitively with whitespace collapsed.
fn normalize_type(sql_type: &str) -> String {
    sql_type
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .replace(" (", "(")
        .to_ascii_uppercase()
}

fn columns_match(a: &Column, b: &Column) -> bool {
    a.name == b.name
        && normalize_type(&a.sql_type) == normalize_type(&b.sql_type)
        && a.nullable == b.nullable
        && a.primary_key == b.primary_key
        && a.default.as_deref().map(str::trim) == b.default.as_deref().map(str::trim)
}

fn sorted_keys(keys: &[ForeignKey]) -> Vec<ForeignKey> {
    let mut keys = keys.to_vec();
    keys.sort_by(|a, b| a.column.cmp(&b.column));
    keys
}

/// Changes that turn `live` into `target`. Empty means no drift.
#[must_use]
pub fn diff(target: &Catalog, live: &Catalog) -> Vec<SchemaChange> {
    let mut changes = Vec::new();

    for table in &target.tables {
        match live.table(&table.name) {
            None => changes.push(SchemaChange::AddTable(table.clone())),
            Some(existing) => diff_table(table, existing, &mut changes),
        }
    }

    for table in live.tables.iter().rev() {
        if target.table(&table.name).is_none() {
            changes.push(SchemaChange::DropTable(table.clone()));
        }
    }

    changes
}

fn diff_table(target: &Table, live: &Table, changes: &mut Vec<SchemaChange>) {
    let name = &target.name;

    for column in &target.columns {
        match live.get_column(&column.name) {
            None => changes.push(SchemaChange::AddColumn {
                table: name.clone(),
                column: column.clone(),
            }),
            Some(existing) if !columns_match(column, existing) => {
                changes.push(SchemaChange::AlterColumn {
                    table: name.clone(),
                    from: existing.clone(),
                    to: column.clone(),
                });
            }
            Some(_) => {}
        }
    }
    for column in &live.columns {
        if target.get_column(&column.name).is_none() {
            changes.push(SchemaChange::DropColumn {
                table: name.clone(),
                column: column.clone(),
            });
        }
    }

    let target_keys = sorted_keys(&target.foreign_keys);
    let live_keys = sorted_keys(&live.foreign_keys);
    if target_keys != live_keys {
        changes.push(SchemaChange::AlterForeignKeys {
            table: name.clone(),
            from: live_keys,
            to: target_keys,
        });
    }

    for index in &live.indexes {
        if target.get_index(&index.name) != Some(index) {
            changes.push(SchemaChange::DropIndex {
                table: name.clone(),
                index: index.clone(),
            });
        }
    }
    for index in &target.indexes {
        if live.get_index(&index.name) != Some(index) {
            changes.push(SchemaChange::AddIndex {
                table: name.clone(),
                index: index.clone(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{catalog, ReferentialAction};

    fn assets() -> Table {
        Table::new("assets")
            .column(Column::primary_key("id"))
            .column(Column::new("symbol", "VARCHAR").not_null())
            .unique_index("ix_assets_symbol", &["symbol"])
    }

    #[test]
    fn identical_catalogs_have_no_changes() {
        assert!(diff(&catalog(), &catalog()).is_empty());
    }

    #[test]
    fn type_comparison_ignores_case_and_spacing() {
        let mut live = assets();
        live.columns[1].sql_type = "varchar".into();
        let target = Catalog::new(vec![assets()]);
        assert!(diff(&target, &Catalog::new(vec![live])).is_empty());

        let a = Column::new("n", "VARCHAR (50)");
        let b = Column::new("n", "varchar(50)");
        assert!(columns_match(&a, &b));
    }

    #[test]
    fn column_order_is_ignored() {
        let mut live = assets();
        live.columns.reverse();
        let target = Catalog::new(vec![assets()]);
        assert!(diff(&target, &Catalog::new(vec![live])).is_empty());
    }

    #[test]
    fn missing_table_is_added_and_extra_table_dropped() {
        let target = Catalog::new(vec![assets()]);
        let live = Catalog::new(vec![Table::new("legacy").column(Column::primary_key("id"))]);
        let changes = diff(&target, &live);
        assert_eq!(changes.len(), 2);
        assert!(matches!(&changes[0], SchemaChange::AddTable(t) if t.name == "assets"));
        assert!(matches!(&changes[1], SchemaChange::DropTable(t) if t.name == "legacy"));
    }

    #[test]
    fn nullability_change_is_an_alteration() {
        let mut live = assets();
        live.columns[1].nullable = true;
        let changes = diff(&Catalog::new(vec![assets()]), &Catalog::new(vec![live]));
        assert_eq!(changes.len(), 1);
        match &changes[0] {
            SchemaChange::AlterColumn { from, to, .. } => {
                assert!(from.nullable);
                assert!(!to.nullable);
            }
            other => panic!("unexpected change {other}"),
        }
    }

    #[test]
    fn changed_index_is_dropped_then_added() {
        let mut live = assets();
        live.indexes[0].unique = false;
        let changes = diff(&Catalog::new(vec![assets()]), &Catalog::new(vec![live]));
        assert_eq!(changes.len(), 2);
        assert!(matches!(&changes[0], SchemaChange::DropIndex { index, .. } if !index.unique));
        assert!(matches!(&changes[1], SchemaChange::AddIndex { index, .. } if index.unique));
    }

    #[test]
    fn on_delete_change_is_detected() {
        let target = Table::new("bars")
            .column(Column::primary_key("id"))
            .column(Column::new("asset_id", "INTEGER"))
            .foreign_key("asset_id", "assets", ReferentialAction::Cascade);
        let mut live = target.clone();
        live.foreign_keys[0].on_delete = ReferentialAction::NoAction;

        let changes = diff(&Catalog::new(vec![target]), &Catalog::new(vec![live]));
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].table(), "bars");
        assert!(changes[0].to_string().contains("CASCADE"));
    }
}
