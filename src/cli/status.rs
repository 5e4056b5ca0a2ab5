//! Handler for the `status` command.

use tabled::Tabled;

use crate::cli::output;
use crate::config::Settings;
use crate::db::{self, count_rows};
use crate::error::Result;
use crate::migration::Migrator;
use crate::schema::introspect::table_names;

#[derive(Tabled)]
struct TableRow {
    #[tabled(rename = "Table")]
    name: String,
    #[tabled(rename = "Rows")]
    rows: i64,
}

/// Execute the status command.
pub fn execute(settings: &Settings) -> Result<()> {
    let migrator = Migrator::new(db::connect(&settings.database_url)?)?;
    let current = migrator.current()?;

    let mut rows = Vec::new();
    {
        let mut conn = migrator.pool().get()?;
        for name in table_names(&mut conn)? {
            let count = count_rows(&mut conn, &name)?;
            rows.push(TableRow { name, rows: count });
        }
    }

    output::header();
    output::section("Database");
    output::key_value("URL", &settings.database_url);
    output::key_value("Revision", current.as_deref().unwrap_or("base"));
    if !migrator.is_at_head()? {
        output::warn(&format!(
            "Not at head {}; run {}",
            migrator.chain().head().id,
            output::highlight("tradedb upgrade")
        ));
    }

    output::section("Tables");
    if rows.is_empty() {
        output::note("No tables yet.");
    } else {
        output::table(rows);
    }
    println!();
    Ok(())
}
