//! Database layer using Diesel ORM.
//!
//! Connections come from an r2d2 pool. Every new connection enforces foreign
//! keys and waits on a locked database instead of failing immediately.

pub mod model;
pub mod repository;
pub mod schema;

use std::time::Duration;

use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, CustomizeConnection, Pool};
use diesel::sql_types::BigInt;
use diesel::SqliteConnection;
use tracing::debug;

use crate::config::DatabaseUrl;
use crate::error::{Error, Result};

pub use repository::Repository;

/// Database connection pool type alias.
pub type DbPool = Pool<ConnectionManager<SqliteConnection>>;

const MEMORY: &str = ":memory:";
const BUSY_TIMEOUT_MS: u32 = 5000;

/// Applies connection pragmas as the pool opens each connection.
#[derive(Debug, Clone, Copy)]
struct SqlitePragmas;

impl CustomizeConnection<SqliteConnection, diesel::r2d2::Error> for SqlitePragmas {
    fn on_acquire(
        &self,
        conn: &mut SqliteConnection,
    ) -> std::result::Result<(), diesel::r2d2::Error> {
        conn.batch_execute(&format!(
            "PRAGMA foreign_keys = ON; PRAGMA busy_timeout = {BUSY_TIMEOUT_MS};"
        ))
        .map_err(diesel::r2d2::Error::QueryError)
    }
}

/// Create a connection pool for a SQLite path, or `:memory:`.
///
/// An in-memory database lives only as long as its connection, so it gets a
/// pool of exactly one.
///
/// # Errors
/// Returns an error if the pool cannot open its first connection.
pub fn create_pool(path: &str) -> Result<DbPool> {
    let max_size = if path == MEMORY { 1 } else { 5 };
    let manager = ConnectionManager::<SqliteConnection>::new(path);
    let pool = Pool::builder()
        .max_size(max_size)
        .connection_timeout(Duration::from_secs(10))
        .connection_customizer(Box::new(SqlitePragmas))
        .build(manager)
        .map_err(|e| Error::Connection(e.to_string()))?;
    debug!(path, max_size, "created sqlite pool");
    Ok(pool)
}

/// Create a pool for a resolved connection string.
///
/// # Errors
/// Returns [`Error::UnsupportedBackend`] for PostgreSQL URLs, otherwise any
/// error from [`create_pool`].
pub fn connect(url: &DatabaseUrl) -> Result<DbPool> {
    match url.sqlite_path() {
        Some(path) => create_pool(path),
        None => Err(Error::UnsupportedBackend(url.to_string())),
    }
}

#[derive(QueryableByName)]
struct RowCount {
    #[diesel(sql_type = BigInt)]
    count: i64,
}

/// Number of rows in `table`.
///
/// # Errors
/// Returns an error if the table does not exist.
pub fn count_rows(conn: &mut SqliteConnection, table: &str) -> Result<i64> {
    let quoted = table.replace('"', "\"\"");
    let rows: Vec<RowCount> =
        diesel::sql_query(format!("SELECT COUNT(*) AS count FROM \"{quoted}\""))
            .load(conn)?;
    Ok(rows.first().map_or(0, |r| r.count))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(QueryableByName)]
    struct ForeignKeys {
        #[diesel(sql_type = BigInt)]
        foreign_keys: i64,
    }

    #[derive(QueryableByName)]
    struct BusyTimeout {
        #[diesel(sql_type = BigInt)]
        timeout: i64,
    }

    #[test]
    fn memory_pool_holds_one_connection() {
        let pool = create_pool(MEMORY).unwrap();
        assert_eq!(pool.max_size(), 1);
    }

    #[test]
    fn file_pool_holds_five_connections() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pool.db");
        let pool = create_pool(path.to_str().unwrap()).unwrap();
        assert_eq!(pool.max_size(), 5);
    }

    #[test]
    fn connections_enforce_foreign_keys() {
        let pool = create_pool(MEMORY).unwrap();
        let mut conn = pool.get().unwrap();
        let fk: Vec<ForeignKeys> = diesel::sql_query("PRAGMA foreign_keys")
            .load(&mut conn)
            .unwrap();
        assert_eq!(fk[0].foreign_keys, 1);
        let busy: Vec<BusyTimeout> = diesel::sql_query("PRAGMA busy_timeout")
            .load(&mut conn)
            .unwrap();
        assert_eq!(busy[0].timeout, i64::from(BUSY_TIMEOUT_MS));
    }

    #[test]
    fn postgres_url_is_unsupported() {
        let url: DatabaseUrl = "postgresql://u:p@localhost/app".parse().unwrap();
        assert!(matches!(connect(&url), Err(Error::UnsupportedBackend(_))));
    }

    #[test]
    fn count_rows_counts() {
        let pool = create_pool(MEMORY).unwrap();
        let mut conn = pool.get().unwrap();
        conn.batch_execute("CREATE TABLE t (id INTEGER); INSERT INTO t VALUES (1), (2);")
            .unwrap();
        assert_eq!(count_rows(&mut conn, "t").unwrap(), 2);
        assert!(count_rows(&mut conn, "missing").is_err());
    }
}
