//! Handler for `tradedb create`.

use std::fs;
use std::path::Path;

use tracing::info;

use crate::cli::output;
use crate::config::Settings;
use crate::db;
use crate::error::Result;

/// Execute `tradedb create`.
///
/// Creates the parent directory of a file database and opens it, which makes
/// SQLite create the file. Tables are left to `upgrade`.
pub fn execute(settings: &Settings) -> Result<()> {
    let url = &settings.database_url;
    if let Some(path) = url.sqlite_path().filter(|_| !url.is_memory()) {
        if let Some(parent) = Path::new(path).parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
    }

    let pool = db::connect(url)?;
    drop(pool.get()?);
    info!(database = %url, "database ready");

    output::ok(&format!("Database ready at {url}"));
    output::note(&format!(
        "Run {} to create the tables.",
        output::highlight("tradedb upgrade")
    ));
    Ok(())
}
