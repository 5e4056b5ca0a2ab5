//! Handler for `tradedb generate`.

use chrono::Local;

use crate::cli::output;
use crate::cli::GenerateArgs;
use crate::config::Settings;
use crate::db;
use crate::error::Result;
use crate::migration::Migrator;
use crate::schema::catalog;

/// Execute `tradedb generate`.
pub fn execute(settings: &Settings, args: &GenerateArgs) -> Result<()> {
    let migrator = Migrator::new(db::connect(&settings.database_url)?)?;
    let generated = migrator.generate(
        &catalog(),
        &args.migrations_dir,
        &args.manifest,
        &args.message,
        Local::now().naive_local(),
    )?;

    match generated {
        Some(generated) => {
            output::ok(&format!(
                "Generated revision {}",
                output::highlight(&generated.revision.id)
            ));
            output::key_value("Path", generated.path.display());
            output::key_value("Follows", generated.revision.down_revisions.join(", "));
            output::note("Rebuild tradedb to embed the new migration.");
        }
        None => output::ok("No schema changes detected"),
    }
    Ok(())
}
