//! Handler for `tradedb check`.

use crate::cli::output;
use crate::config::Settings;
use crate::db;
use crate::error::Result;
use crate::migration::Migrator;
use crate::schema::{catalog, diff, live_catalog};

/// Execute `tradedb check`, returning whether the database is clean.
///
/// Clean means every revision is applied and the live schema matches the
/// declarative model.
pub fn execute(settings: &Settings) -> Result<bool> {
    let migrator = Migrator::new(db::connect(&settings.database_url)?)?;
    let pending = migrator.pending()?;
    let live = {
        let mut conn = migrator.pool().get()?;
        live_catalog(&mut conn)?
    };
    let changes = diff(&catalog(), &live);

    output::header();
    output::section("Migrations");
    output::key_value("Database", &settings.database_url);
    output::key_value(
        "Current",
        migrator.current()?.unwrap_or_else(|| "base".into()),
    );
    output::key_value("Head", &migrator.chain().head().id);
    if pending.is_empty() {
        output::ok("All revisions applied");
    } else {
        for revision in &pending {
            output::warn(&format!("pending {} {}", revision.id, revision.message));
        }
    }

    output::section("Schema");
    if changes.is_empty() {
        output::ok("Live schema matches the model");
    } else {
        for change in &changes {
            output::warn(&change.to_string());
        }
    }
    println!();

    Ok(pending.is_empty() && changes.is_empty())
}
