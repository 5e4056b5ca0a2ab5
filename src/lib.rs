//! tradedb - Relational schema and migrations for a trading-data store.
//!
//! The store holds users, tradable assets, OHLCV price bars, strategies,
//! signals, simulated orders, backtest results, technical indicators and
//! target labels in SQLite, accessed through Diesel.
//!
//! # Modules
//!
//! - [`schema`] - Declarative catalog, live introspection and schema diff
//! - [`migration`] - Revision chain, upgrade/downgrade and revision generation
//! - [`db`] - Connection pool, Diesel table definitions, rows and repository
//! - [`domain`] - Enumerations stored as text columns
//! - [`config`] - Database URL and logging resolution from env and dotenv files
//! - [`error`] - Error types for the crate
//! - [`cli`] - The `tradedb` command line
//!
//! # Example
//!
//! ```no_run
//! use tradedb::db::create_pool;
//! use tradedb::migration::{Migrator, UpgradeTarget};
//!
//! let pool = create_pool("ai_trader.db")?;
//! let migrator = Migrator::new(pool)?;
//! migrator.upgrade(&UpgradeTarget::Head)?;
//! # Ok::<(), tradedb::error::Error>(())
//! ```

pub mod cli;
pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod migration;
pub mod schema;
