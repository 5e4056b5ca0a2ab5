//! Schema migrations.
//!
//! `diesel_migrations` applies the embedded units and records each applied
//! version in `__diesel_schema_migrations`. The [`Chain`] read from
//! `revisions.toml` adds the graph on top: predecessors, merge points and
//! a single head, validated before anything runs.

pub mod chain;
pub mod generate;

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use chrono::NaiveDateTime;
use diesel::migration::{Migration, MigrationSource};
use diesel::sqlite::Sqlite;
use diesel::SqliteConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use tracing::{debug, info};

use crate::db::DbPool;
use crate::error::{ChainError, Error, Result};
use crate::schema::{diff, live_catalog, Catalog};

pub use chain::{Chain, Revision};
pub use generate::{GeneratedRevision, RenderedRevision};

/// Embedded database migrations compiled from the migrations/ directory.
pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// How far `upgrade` goes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum UpgradeTarget {
    #[default]
    Head,
    Revision(String),
}

impl FromStr for UpgradeTarget {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "" => Err(Error::Parse("empty upgrade target".into())),
            "head" | "heads" => Ok(Self::Head),
            id => Ok(Self::Revision(id.to_string())),
        }
    }
}

/// How far `downgrade` goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DowngradeTarget {
    /// Revert everything.
    Base,
    /// Revert the newest `n` applied revisions.
    Steps(usize),
    /// Revert everything that does not lead up to this revision.
    Revision(String),
}

impl Default for DowngradeTarget {
    fn default() -> Self {
        Self::Steps(1)
    }
}

impl FromStr for DowngradeTarget {
    type Err = Error;

    /// `base`, `-N` for N steps, or a revision id.
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s == "base" {
            return Ok(Self::Base);
        }
        if let Some(steps) = s.strip_prefix('-') {
            return steps
                .parse::<usize>()
                .ok()
                .filter(|&n| n > 0)
                .map(Self::Steps)
                .ok_or_else(|| Error::Parse(format!("invalid step count '{s}'")));
        }
        if s.is_empty() {
            return Err(Error::Parse("empty downgrade target".into()));
        }
        Ok(Self::Revision(s.to_string()))
    }
}

impl fmt::Display for DowngradeTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Base => f.write_str("base"),
            Self::Steps(n) => write!(f, "-{n}"),
            Self::Revision(id) => f.write_str(id),
        }
    }
}

/// One line of `history`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub revision: Revision,
    pub applied: bool,
    pub is_head: bool,
    pub is_current: bool,
}

fn harness_error(err: Box<dyn std::error::Error + Send + Sync>) -> Error {
    Error::Migration(err.to_string())
}

fn units() -> Result<Vec<Box<dyn Migration<Sqlite>>>> {
    MigrationSource::<Sqlite>::migrations(&MIGRATIONS).map_err(harness_error)
}

fn unit_version(unit: &dyn Migration<Sqlite>) -> String {
    unit.name().version().to_string()
}

/// Applies and reverts the embedded revisions against one database.
pub struct Migrator {
    pool: DbPool,
    chain: Chain,
}

impl Migrator {
    /// Validate the embedded chain against the embedded units.
    ///
    /// # Errors
    /// Returns a [`ChainError`] if the manifest is inconsistent with itself
    /// or with the migration units.
    pub fn new(pool: DbPool) -> Result<Self> {
        let chain = Chain::embedded()?;
        let versions: Vec<String> = units()?.iter().map(|u| unit_version(u.as_ref())).collect();
        chain.verify_units(versions.iter().map(String::as_str))?;
        debug!(revisions = chain.len(), head = %chain.head().id, "loaded revision chain");
        Ok(Self { pool, chain })
    }

    #[must_use]
    pub fn chain(&self) -> &Chain {
        &self.chain
    }

    #[must_use]
    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    fn applied_on(&self, conn: &mut SqliteConnection) -> Result<Vec<String>> {
        let mut applied: Vec<String> = conn
            .applied_migrations()
            .map_err(harness_error)?
            .iter()
            .map(ToString::to_string)
            .collect();
        applied.sort();
        if let Some(unknown) = applied.iter().find(|id| !self.chain.contains(id)) {
            return Err(ChainError::UnknownApplied(unknown.clone()).into());
        }
        Ok(applied)
    }

    /// Applied revision ids, oldest first.
    ///
    /// # Errors
    /// Returns [`ChainError::UnknownApplied`] if the database records a
    /// revision the chain does not know.
    pub fn applied(&self) -> Result<Vec<String>> {
        let mut conn = self.pool.get()?;
        self.applied_on(&mut conn)
    }

    /// The newest applied revision, `None` at base.
    ///
    /// # Errors
    /// See [`Migrator::applied`].
    pub fn current(&self) -> Result<Option<String>> {
        Ok(self.applied()?.pop())
    }

    /// Revisions not yet applied, in application order.
    ///
    /// # Errors
    /// See [`Migrator::applied`].
    pub fn pending(&self) -> Result<Vec<Revision>> {
        let applied = self.applied()?;
        Ok(self
            .chain
            .iter()
            .filter(|r| !applied.contains(&r.id))
            .cloned()
            .collect())
    }

    /// Whether every revision is applied.
    ///
    /// # Errors
    /// See [`Migrator::applied`].
    pub fn is_at_head(&self) -> Result<bool> {
        Ok(self.pending()?.is_empty())
    }

    /// Apply pending revisions up to `target`, returning the ids applied.
    ///
    /// Nothing is applied when the target is already reached.
    ///
    /// # Errors
    /// Returns [`Error::UnknownRevision`] for a target outside the chain and
    /// [`Error::Migration`] if a unit fails. Units applied before the
    /// failure stay applied.
    pub fn upgrade(&self, target: &UpgradeTarget) -> Result<Vec<String>> {
        let wanted = match target {
            UpgradeTarget::Head => self.chain.iter().map(|r| r.id.clone()).collect(),
            UpgradeTarget::Revision(id) => {
                if !self.chain.contains(id) {
                    return Err(Error::UnknownRevision(id.clone()));
                }
                self.chain.ancestors(id)
            }
        };

        let mut conn = self.pool.get()?;
        let applied = self.applied_on(&mut conn)?;
        let units = units()?;
        let mut done = Vec::new();

        for revision in self.chain.iter() {
            if !wanted.contains(&revision.id) || applied.contains(&revision.id) {
                continue;
            }
            let unit = find_unit(&units, &revision.id)?;
            conn.run_migration(unit).map_err(harness_error)?;
            info!(revision = %revision.id, summary = %revision.message, "applied migration");
            done.push(revision.id.clone());
        }

        if done.is_empty() {
            info!(to = ?target, "already up to date");
        }
        Ok(done)
    }

    /// Revert applied revisions, newest first, returning the ids reverted.
    ///
    /// # Errors
    /// Returns [`Error::DowngradePastBase`] when asked to revert more
    /// revisions than are applied, [`Error::UnknownRevision`] for a target
    /// that is not applied, and [`Error::Migration`] if a unit fails.
    pub fn downgrade(&self, target: &DowngradeTarget) -> Result<Vec<String>> {
        let mut conn = self.pool.get()?;
        let applied = self.applied_on(&mut conn)?;

        let revert: Vec<String> = match target {
            DowngradeTarget::Base => applied.iter().rev().cloned().collect(),
            DowngradeTarget::Steps(n) => {
                if *n > applied.len() {
                    return Err(Error::DowngradePastBase {
                        requested: *n,
                        applied: applied.len(),
                    });
                }
                applied.iter().rev().take(*n).cloned().collect()
            }
            DowngradeTarget::Revision(id) => {
                if !applied.contains(id) {
                    return Err(Error::UnknownRevision(id.clone()));
                }
                let keep = self.chain.ancestors(id);
                applied
                    .iter()
                    .rev()
                    .filter(|a| !keep.contains(*a))
                    .cloned()
                    .collect()
            }
        };

        let units = units()?;
        for id in &revert {
            let unit = find_unit(&units, id)?;
            conn.revert_migration(unit).map_err(harness_error)?;
            let summary = self.chain.get(id).map_or("", |r| r.message.as_str());
            info!(revision = %id, summary, "reverted migration");
        }
        Ok(revert)
    }

    /// Every revision, newest first, with its state in this database.
    ///
    /// # Errors
    /// See [`Migrator::applied`].
    pub fn history(&self) -> Result<Vec<HistoryEntry>> {
        let applied = self.applied()?;
        let current = applied.last().cloned();
        let head = &self.chain.head().id;
        Ok(self
            .chain
            .iter()
            .rev()
            .map(|r| HistoryEntry {
                applied: applied.contains(&r.id),
                is_head: &r.id == head,
                is_current: current.as_ref() == Some(&r.id),
                revision: r.clone(),
            })
            .collect())
    }

    /// Write a new revision that moves the database at head to `target`.
    ///
    /// Returns `None`, writing nothing, when the live schema already matches.
    /// The new unit takes effect once the binary is rebuilt.
    ///
    /// # Errors
    /// Returns [`Error::NotAtHead`] unless every revision is applied, and
    /// any error from [`generate::write_revision`].
    pub fn generate(
        &self,
        target: &Catalog,
        dir: &Path,
        manifest: &Path,
        message: &str,
        now: NaiveDateTime,
    ) -> Result<Option<GeneratedRevision>> {
        let mut conn = self.pool.get()?;
        let applied = self.applied_on(&mut conn)?;
        let head = self.chain.head();
        if applied.len() != self.chain.len() {
            return Err(Error::NotAtHead {
                current: applied.last().cloned().unwrap_or_else(|| "base".into()),
                head: head.id.clone(),
            });
        }

        let live = live_catalog(&mut conn)?;
        let changes = diff(target, &live);
        if changes.is_empty() {
            info!("no schema changes detected");
            return Ok(None);
        }
        for change in &changes {
            debug!(%change, "detected schema change");
        }

        let rendered = generate::render(&changes, target, &live);
        let generated = generate::write_revision(dir, manifest, message, head, &rendered, now)?;
        info!(
            revision = %generated.revision.id,
            path = %generated.path.display(),
            changes = changes.len(),
            "generated migration"
        );
        Ok(Some(generated))
    }
}

fn find_unit<'a>(
    units: &'a [Box<dyn Migration<Sqlite>>],
    id: &str,
) -> Result<&'a dyn Migration<Sqlite>> {
    units
        .iter()
        .find(|u| unit_version(u.as_ref()) == id)
        .map(|u| u.as_ref())
        .ok_or_else(|| ChainError::RevisionWithoutUnit(id.to_string()).into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn downgrade_target_parses() {
        assert_eq!("base".parse::<DowngradeTarget>().unwrap(), DowngradeTarget::Base);
        assert_eq!("-2".parse::<DowngradeTarget>().unwrap(), DowngradeTarget::Steps(2));
        assert_eq!(
            "20250701000000".parse::<DowngradeTarget>().unwrap(),
            DowngradeTarget::Revision("20250701000000".into())
        );
        assert!("-0".parse::<DowngradeTarget>().is_err());
        assert!("-x".parse::<DowngradeTarget>().is_err());
        assert_eq!(DowngradeTarget::default().to_string(), "-1");
    }

    #[test]
    fn upgrade_target_parses() {
        assert_eq!("head".parse::<UpgradeTarget>().unwrap(), UpgradeTarget::Head);
        assert_eq!(
            "20250705000000".parse::<UpgradeTarget>().unwrap(),
            UpgradeTarget::Revision("20250705000000".into())
        );
    }

    #[test]
    fn embedded_units_match_manifest() {
        let versions: Vec<String> = units()
            .unwrap()
            .iter()
            .map(|u| unit_version(u.as_ref()))
            .collect();
        Chain::embedded()
            .unwrap()
            .verify_units(versions.iter().map(String::as_str))
            .unwrap();
    }
}
