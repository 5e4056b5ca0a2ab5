//! Handlers for `upgrade`, `downgrade`, `current` and `history`.

use tabled::Tabled;

use crate::cli::output;
use crate::cli::{DowngradeArgs, UpgradeArgs};
use crate::config::Settings;
use crate::db;
use crate::error::Result;
use crate::migration::{DowngradeTarget, Migrator, UpgradeTarget};

#[derive(Tabled)]
struct HistoryRow {
    #[tabled(rename = "Revision")]
    revision: String,
    #[tabled(rename = "Follows")]
    follows: String,
    #[tabled(rename = "Applied")]
    applied: &'static str,
    #[tabled(rename = "Message")]
    message: String,
}

fn migrator(settings: &Settings) -> Result<Migrator> {
    Migrator::new(db::connect(&settings.database_url)?)
}

/// Execute `tradedb upgrade`.
pub fn upgrade(settings: &Settings, args: &UpgradeArgs) -> Result<()> {
    let target = args.to.parse::<UpgradeTarget>()?;
    let migrator = migrator(settings)?;
    let applied = migrator.upgrade(&target)?;

    if applied.is_empty() {
        output::ok("Already up to date");
        return Ok(());
    }
    for id in &applied {
        let message = migrator.chain().get(id).map_or("", |r| r.message.as_str());
        output::ok(&format!("{} {message}", output::highlight(id)));
    }
    output::note(&format!("Applied {} revision(s)", applied.len()));
    Ok(())
}

/// Execute `tradedb downgrade`.
pub fn downgrade(settings: &Settings, args: &DowngradeArgs) -> Result<()> {
    let target = args.target.parse::<DowngradeTarget>()?;
    let migrator = migrator(settings)?;
    let reverted = migrator.downgrade(&target)?;

    if reverted.is_empty() {
        output::ok(&format!("Nothing to revert for {target}"));
        return Ok(());
    }
    for id in &reverted {
        let message = migrator.chain().get(id).map_or("", |r| r.message.as_str());
        output::ok(&format!("reverted {} {message}", output::highlight(id)));
    }
    output::note(&format!("Reverted {} revision(s)", reverted.len()));
    Ok(())
}

/// Execute `tradedb current`.
pub fn current(settings: &Settings) -> Result<()> {
    let migrator = migrator(settings)?;
    let head = &migrator.chain().head().id;
    match migrator.current()? {
        Some(id) if &id == head => output::note(&format!("{id} (head)")),
        Some(id) => output::note(&id),
        None => output::note("base"),
    }
    Ok(())
}

/// Execute `tradedb history`.
pub fn history(settings: &Settings) -> Result<()> {
    let migrator = migrator(settings)?;
    let rows: Vec<HistoryRow> = migrator
        .history()?
        .into_iter()
        .map(|entry| {
            let mut revision = entry.revision.id.clone();
            if entry.is_head {
                revision.push_str(" (head)");
            }
            if entry.is_current {
                revision.push_str(" (current)");
            }
            let follows = if entry.revision.down_revisions.is_empty() {
                "base".to_string()
            } else {
                entry.revision.down_revisions.join(", ")
            };
            HistoryRow {
                revision,
                follows,
                applied: if entry.applied { "yes" } else { "no" },
                message: entry.revision.message,
            }
        })
        .collect();

    output::header();
    output::section("Revisions");
    output::table(rows);
    Ok(())
}
