//! Turn a schema diff into a new migration unit.
//!
//! SQLite can add tables, indexes and simple columns in place. Anything else
//! (dropping or altering a column, changing foreign keys, adding a column
//! that needs a non-constant default) rebuilds the table: create a scratch
//! copy with the new definition, copy the shared columns, drop the original
//! and rename the copy into place.

use std::collections::BTreeSet;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;

use super::chain::Revision;
use crate::error::{Error, Result};
use crate::schema::{Catalog, Column, SchemaChange, Table};

/// SQL for both directions of a generated revision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedRevision {
    pub up: String,
    pub down: String,
    /// False when the scripts manage their own transaction, which a table
    /// rebuild needs so foreign key enforcement can be switched off.
    pub run_in_transaction: bool,
}

/// A revision written to disk by [`write_revision`].
#[derive(Debug, Clone)]
pub struct GeneratedRevision {
    pub revision: Revision,
    pub path: PathBuf,
}

fn addable_in_place(column: &Column) -> bool {
    let constant_default = column
        .default
        .as_deref()
        .map_or(true, |d| !d.contains('(') && !d.to_ascii_uppercase().contains("CURRENT_"));
    !column.primary_key && constant_default && (column.nullable || column.default.is_some())
}

fn needs_rebuild(change: &SchemaChange) -> bool {
    match change {
        SchemaChange::DropColumn { .. }
        | SchemaChange::AlterColumn { .. }
        | SchemaChange::AlterForeignKeys { .. } => true,
        SchemaChange::AddColumn { column, .. } => !addable_in_place(column),
        SchemaChange::AddTable(_)
        | SchemaChange::DropTable(_)
        | SchemaChange::AddIndex { .. }
        | SchemaChange::DropIndex { .. } => false,
    }
}

fn create_with_indexes(table: &Table) -> String {
    let mut statements = vec![table.create_sql()];
    statements.extend(table.indexes.iter().map(|i| i.create_sql(&table.name)));
    statements.join("\n")
}

/// Rebuild `from` into the shape of `to`, keeping the rows of every column
/// the two share.
fn rebuild_sql(from: &Table, to: &Table) -> String {
    let scratch = format!("_new_{}", to.name);
    let shared: Vec<&str> = to
        .columns
        .iter()
        .filter(|c| from.get_column(&c.name).is_some())
        .map(|c| c.name.as_str())
        .collect();

    let mut statements = vec![to.create_sql_as(&scratch)];
    if !shared.is_empty() {
        let columns = shared.join(", ");
        statements.push(format!(
            "INSERT INTO {scratch} ({columns}) SELECT {columns} FROM {};",
            from.name
        ));
    }
    statements.push(format!("DROP TABLE {};", from.name));
    statements.push(format!("ALTER TABLE {scratch} RENAME TO {};", to.name));
    statements.extend(to.indexes.iter().map(|i| i.create_sql(&to.name)));
    statements.join("\n")
}

/// Render `changes`, computed as `diff(target, live)`, into up and down SQL.
#[must_use]
pub fn render(changes: &[SchemaChange], target: &Catalog, live: &Catalog) -> RenderedRevision {
    let rebuilds: BTreeSet<&str> = changes
        .iter()
        .filter(|c| needs_rebuild(c))
        .map(SchemaChange::table)
        .collect();

    let mut up = Vec::new();
    let mut down = Vec::new();
    let mut rebuilt = BTreeSet::new();

    for change in changes {
        let name = change.table();
        if rebuilds.contains(name) {
            if let (Some(to), Some(from)) = (target.table(name), live.table(name)) {
                if rebuilt.insert(name) {
                    up.push(rebuild_sql(from, to));
                    down.push(rebuild_sql(to, from));
                }
            }
            continue;
        }

        match change {
            SchemaChange::AddTable(table) => {
                up.push(create_with_indexes(table));
                down.push(table.drop_sql());
            }
            SchemaChange::DropTable(table) => {
                up.push(table.drop_sql());
                down.push(create_with_indexes(table));
            }
            SchemaChange::AddColumn { table, column } => {
                up.push(format!("ALTER TABLE {table} ADD COLUMN {};", column.to_sql()));
                down.push(format!("ALTER TABLE {table} DROP COLUMN {};", column.name));
            }
            SchemaChange::AddIndex { table, index } => {
                up.push(index.create_sql(table));
                down.push(index.drop_sql());
            }
            SchemaChange::DropIndex { table, index } => {
                up.push(index.drop_sql());
                down.push(index.create_sql(table));
            }
            // Rebuilt above.
            SchemaChange::DropColumn { .. }
            | SchemaChange::AlterColumn { .. }
            | SchemaChange::AlterForeignKeys { .. } => {}
        }
    }
    down.reverse();

    let run_in_transaction = rebuilds.is_empty();
    let wrap = |statements: Vec<String>| {
        let body = statements.join("\n\n");
        if run_in_transaction {
            format!("{body}\n")
        } else {
            format!("PRAGMA foreign_keys = OFF;\nBEGIN;\n\n{body}\n\nCOMMIT;\nPRAGMA foreign_keys = ON;\n")
        }
    };

    RenderedRevision {
        up: wrap(up),
        down: wrap(down),
        run_in_transaction,
    }
}

/// Directory-name form of a revision message.
#[must_use]
pub fn slug(message: &str) -> String {
    let mut slug = String::new();
    let mut gap = false;
    for c in message.chars() {
        if c.is_ascii_alphanumeric() {
            if gap && !slug.is_empty() {
                slug.push('_');
            }
            slug.push(c.to_ascii_lowercase());
            gap = false;
        } else {
            gap = true;
        }
    }
    slug.truncate(48);
    let slug = slug.trim_end_matches('_');
    if slug.is_empty() {
        "revision".to_string()
    } else {
        slug.to_string()
    }
}

fn toml_string(value: &str) -> String {
    toml::Value::String(value.to_string()).to_string()
}

fn write_unit(
    path: &Path,
    message: &str,
    id: &str,
    head: &Revision,
    rendered: &RenderedRevision,
) -> std::io::Result<()> {
    let header = format!("-- {message}\n-- revision {id}, follows {}\n\n", head.id);
    fs::write(path.join("up.sql"), format!("{header}{}", rendered.up))?;
    fs::write(path.join("down.sql"), format!("{header}{}", rendered.down))?;
    if !rendered.run_in_transaction {
        fs::write(path.join("metadata.toml"), "run_in_transaction = false\n")?;
    }
    Ok(())
}

/// Write a migration unit under `dir` and append it to `manifest` as the
/// new head, succeeding `head`.
///
/// The unit is named `<YYYY-MM-DD-HHMMSS>_<slug>` after `now`, so its id is
/// the same timestamp without separators.
///
/// # Errors
/// Returns [`Error::Migration`] if the message spans lines, the id does not
/// sort after `head` or the unit already exists, and [`Error::Io`] if a file
/// cannot be written. Nothing is left on disk after an error.
pub fn write_revision(
    dir: &Path,
    manifest: &Path,
    message: &str,
    head: &Revision,
    rendered: &RenderedRevision,
    now: NaiveDateTime,
) -> Result<GeneratedRevision> {
    if message.chars().any(char::is_control) {
        return Err(Error::Migration(
            "revision message must be a single line without control characters".into(),
        ));
    }

    let id = now.format("%Y%m%d%H%M%S").to_string();
    if id <= head.id {
        return Err(Error::Migration(format!(
            "new revision {id} does not sort after head {}",
            head.id
        )));
    }

    let path = dir.join(format!("{}_{}", now.format("%Y-%m-%d-%H%M%S"), slug(message)));
    if path.exists() {
        return Err(Error::Migration(format!(
            "migration unit {} already exists",
            path.display()
        )));
    }

    // Fails before anything is written when the manifest is missing.
    let mut file = OpenOptions::new().append(true).open(manifest)?;
    fs::create_dir_all(&path)?;

    let written = write_unit(&path, message, &id, head, rendered).and_then(|()| {
        write!(
            file,
            "\n[[revision]]\nid = {}\nmessage = {}\ndown_revisions = [{}]\n",
            toml_string(&id),
            toml_string(message),
            toml_string(&head.id)
        )
    });
    if let Err(err) = written {
        let _ = fs::remove_dir_all(&path);
        return Err(err.into());
    }

    Ok(GeneratedRevision {
        revision: Revision {
            id,
            message: message.to_string(),
            down_revisions: vec![head.id.clone()],
        },
        path,
    })
}
