//! Declarative schema model.
//!
//! A [`Catalog`] describes tables, columns, indexes and foreign keys as plain
//! values. The canonical catalog lives in [`definition`]; the live database is
//! read back into the same shape by [`introspect`] and compared by [`diff`].

pub mod definition;
pub mod diff;
pub mod introspect;

use std::fmt;

use diesel::connection::SimpleConnection;
use diesel::SqliteConnection;

use crate::error::Result;

pub use definition::catalog;
pub use diff::{diff, SchemaChange};
pub use introspect::live_catalog;

/// What happens to referencing rows when the referenced row is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReferentialAction {
    #[default]
    NoAction,
    Restrict,
    Cascade,
    SetNull,
    SetDefault,
}

impl ReferentialAction {
    /// SQL keyword form, as reported by `pragma_foreign_key_list`.
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::NoAction => "NO ACTION",
            Self::Restrict => "RESTRICT",
            Self::Cascade => "CASCADE",
            Self::SetNull => "SET NULL",
            Self::SetDefault => "SET DEFAULT",
        }
    }

    /// Parse the keyword form. Unknown text maps to `None`.
    #[must_use]
    pub fn from_sql(text: &str) -> Option<Self> {
        match text.trim().to_ascii_uppercase().as_str() {
            "NO ACTION" => Some(Self::NoAction),
            "RESTRICT" => Some(Self::Restrict),
            "CASCADE" => Some(Self::Cascade),
            "SET NULL" => Some(Self::SetNull),
            "SET DEFAULT" => Some(Self::SetDefault),
            _ => None,
        }
    }
}

impl fmt::Display for ReferentialAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// A single column definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    /// Declared SQL type, e.g. `VARCHAR(50)`.
    pub sql_type: String,
    pub nullable: bool,
    pub primary_key: bool,
    /// Default expression exactly as written in the DDL.
    pub default: Option<String>,
}

impl Column {
    /// A nullable column of the given declared type.
    pub fn new(name: impl Into<String>, sql_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sql_type: sql_type.into(),
            nullable: true,
            primary_key: false,
            default: None,
        }
    }

    /// `INTEGER PRIMARY KEY NOT NULL`, aliasing the SQLite rowid.
    pub fn primary_key(name: impl Into<String>) -> Self {
        Self {
            nullable: false,
            primary_key: true,
            ..Self::new(name, "INTEGER")
        }
    }

    #[must_use]
    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    #[must_use]
    pub fn default_expr(mut self, expr: impl Into<String>) -> Self {
        self.default = Some(expr.into());
        self
    }

    /// Column definition as it appears inside `CREATE TABLE`.
    #[must_use]
    pub fn to_sql(&self) -> String {
        let mut sql = format!("{} {}", self.name, self.sql_type);
        if self.primary_key {
            sql.push_str(" PRIMARY KEY");
        }
        if !self.nullable {
            sql.push_str(" NOT NULL");
        }
        if let Some(default) = &self.default {
            sql.push_str(" DEFAULT ");
            sql.push_str(default);
        }
        sql
    }
}

/// A named index over one or more columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Index {
    pub name: String,
    pub columns: Vec<String>,
    pub unique: bool,
}

impl Index {
    /// `CREATE [UNIQUE] INDEX` statement for this index on `table`.
    #[must_use]
    pub fn create_sql(&self, table: &str) -> String {
        format!(
            "CREATE {}INDEX {} ON {} ({});",
            if self.unique { "UNIQUE " } else { "" },
            self.name,
            table,
            self.columns.join(", ")
        )
    }

    #[must_use]
    pub fn drop_sql(&self) -> String {
        format!("DROP INDEX {};", self.name)
    }
}

/// A single-column foreign key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKey {
    pub column: String,
    pub references_table: String,
    pub references_column: String,
    pub on_delete: ReferentialAction,
}

impl ForeignKey {
    #[must_use]
    pub fn to_sql(&self) -> String {
        let mut sql = format!(
            "FOREIGN KEY ({}) REFERENCES {} ({})",
            self.column, self.references_table, self.references_column
        );
        if self.on_delete != ReferentialAction::NoAction {
            sql.push_str(" ON DELETE ");
            sql.push_str(self.on_delete.as_sql());
        }
        sql
    }
}

/// A table with its columns, indexes and foreign keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub name: String,
    pub columns: Vec<Column>,
    pub indexes: Vec<Index>,
    pub foreign_keys: Vec<ForeignKey>,
}

impl Table {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            indexes: Vec::new(),
            foreign_keys: Vec::new(),
        }
    }

    #[must_use]
    pub fn column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }

    #[must_use]
    pub fn index(mut self, name: &str, columns: &[&str]) -> Self {
        self.indexes.push(Index {
            name: name.to_string(),
            columns: columns.iter().map(|c| (*c).to_string()).collect(),
            unique: false,
        });
        self
    }

    #[must_use]
    pub fn unique_index(mut self, name: &str, columns: &[&str]) -> Self {
        self.indexes.push(Index {
            name: name.to_string(),
            columns: columns.iter().map(|c| (*c).to_string()).collect(),
            unique: true,
        });
        self
    }

    #[must_use]
    pub fn foreign_key(
        mut self,
        column: &str,
        references_table: &str,
        on_delete: ReferentialAction,
    ) -> Self {
        self.foreign_keys.push(ForeignKey {
            column: column.to_string(),
            references_table: references_table.to_string(),
            references_column: "id".to_string(),
            on_delete,
        });
        self
    }

    pub fn get_column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn get_index(&self, name: &str) -> Option<&Index> {
        self.indexes.iter().find(|i| i.name == name)
    }

    /// `CREATE TABLE` statement under an arbitrary name.
    ///
    /// Used directly for declarative builds and with a scratch name for table
    /// rebuilds.
    #[must_use]
    pub fn create_sql_as(&self, name: &str) -> String {
        let mut lines: Vec<String> = self.columns.iter().map(Column::to_sql).collect();
        lines.extend(self.foreign_keys.iter().map(ForeignKey::to_sql));
        format!("CREATE TABLE {name} (\n    {}\n);", lines.join(",\n    "))
    }

    #[must_use]
    pub fn create_sql(&self) -> String {
        self.create_sql_as(&self.name)
    }

    #[must_use]
    pub fn drop_sql(&self) -> String {
        format!("DROP TABLE {};", self.name)
    }
}

/// An ordered set of tables.
///
/// Order matters only for rendering: referenced tables come before the tables
/// that reference them.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Catalog {
    pub tables: Vec<Table>,
}

impl Catalog {
    #[must_use]
    pub fn new(tables: Vec<Table>) -> Self {
        Self { tables }
    }

    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name == name)
    }

    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.iter().map(|t| t.name.as_str())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Full declarative DDL: every table followed by its indexes.
    #[must_use]
    pub fn create_statements(&self) -> Vec<String> {
        let mut statements = Vec::new();
        for table in &self.tables {
            statements.push(table.create_sql());
            statements.extend(table.indexes.iter().map(|i| i.create_sql(&table.name)));
        }
        statements
    }

    /// DDL script, one blank line between tables.
    #[must_use]
    pub fn to_sql(&self) -> String {
        let mut script = String::new();
        for (n, statement) in self.create_statements().iter().enumerate() {
            if n > 0 && statement.starts_with("CREATE TABLE") {
                script.push('\n');
            }
            script.push_str(statement);
            script.push('\n');
        }
        script
    }

    /// Build every table and index directly, bypassing the migration chain.
    ///
    /// # Errors
    /// Returns an error if any statement fails, e.g. a table already exists.
    pub fn create_all(&self, conn: &mut SqliteConnection) -> Result<()> {
        conn.batch_execute(&self.to_sql())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        Table::new("bars")
            .column(Column::primary_key("id"))
            .column(Column::new("asset_id", "INTEGER").not_null())
            .column(Column::new("source", "VARCHAR").not_null().default_expr("'binance'"))
            .column(Column::new("note", "TEXT"))
            .foreign_key("asset_id", "assets", ReferentialAction::Cascade)
            .unique_index("uq_bars_asset_source", &["asset_id", "source"])
    }

    #[test]
    fn renders_create_table() {
        let sql = sample().create_sql();
        assert_eq!(
            sql,
            "CREATE TABLE bars (\n    \
             id INTEGER PRIMARY KEY NOT NULL,\n    \
             asset_id INTEGER NOT NULL,\n    \
             source VARCHAR NOT NULL DEFAULT 'binance',\n    \
             note TEXT,\n    \
             FOREIGN KEY (asset_id) REFERENCES assets (id) ON DELETE CASCADE\n);"
        );
    }

    #[test]
    fn renders_unique_index() {
        let table = sample();
        assert_eq!(
            table.indexes[0].create_sql(&table.name),
            "CREATE UNIQUE INDEX uq_bars_asset_source ON bars (asset_id, source);"
        );
    }

    #[test]
    fn no_action_is_left_implicit() {
        let fk = ForeignKey {
            column: "user_id".into(),
            references_table: "users".into(),
            references_column: "id".into(),
            on_delete: ReferentialAction::NoAction,
        };
        assert_eq!(fk.to_sql(), "FOREIGN KEY (user_id) REFERENCES users (id)");
    }

    #[test]
    fn referential_action_parses_pragma_output() {
        assert_eq!(
            ReferentialAction::from_sql("SET NULL"),
            Some(ReferentialAction::SetNull)
        );
        assert_eq!(
            ReferentialAction::from_sql("cascade"),
            Some(ReferentialAction::Cascade)
        );
        assert_eq!(ReferentialAction::from_sql("explode"), None);
    }
}
