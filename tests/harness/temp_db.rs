#![allow(dead_code)]

use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tradedb::db::{create_pool, DbPool, Repository};
use tradedb::migration::{Migrator, UpgradeTarget};
use tradedb::schema::{live_catalog, Catalog};

/// Temporary file-backed SQLite database for integration tests.
pub struct TempDb {
    dir: TempDir,
    path: PathBuf,
    pool: DbPool,
}

impl TempDb {
    /// An empty database at base.
    pub fn empty() -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("trade.db");
        let pool = create_pool(path.to_str().expect("utf-8 temp path")).expect("create sqlite pool");
        Self { dir, path, pool }
    }

    /// A database upgraded to head.
    pub fn migrated() -> Self {
        let db = Self::empty();
        db.migrator()
            .upgrade(&UpgradeTarget::Head)
            .expect("upgrade to head");
        db
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    /// `sqlite://` URL for passing to the binary.
    pub fn url(&self) -> String {
        format!("sqlite:///{}", self.path.display())
    }

    pub fn migrator(&self) -> Migrator {
        Migrator::new(self.pool.clone()).expect("load migrator")
    }

    pub fn repository(&self) -> Repository {
        Repository::new(self.pool.clone())
    }

    pub fn live(&self) -> Catalog {
        let mut conn = self.pool.get().expect("get sqlite connection");
        live_catalog(&mut conn).expect("introspect live schema")
    }
}
