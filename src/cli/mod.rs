//! Command-line interface definitions.

pub mod check;
pub mod create;
pub mod generate;
pub mod migrate;
pub mod output;
pub mod schema;
pub mod status;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::{ConfigSources, LogFormat, LoggingConfig, Settings};
use crate::error::Result;

/// tradedb - Schema and migration tooling for the trading-data store.
#[derive(Parser, Debug)]
#[command(name = "tradedb")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Flags accepted by every command.
#[derive(Args, Debug)]
pub struct GlobalArgs {
    /// Database URL, overriding DATABASE_URL and the env files
    #[arg(long, global = true, value_name = "URL")]
    pub database_url: Option<String>,

    /// Log level or filter directive (e.g. debug, tradedb=trace)
    #[arg(long, global = true, value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// Base dotenv file
    #[arg(long, global = true, default_value = ".env")]
    pub env_file: PathBuf,

    /// Local dotenv file, overriding the base file
    #[arg(long, global = true, default_value = ".env.local")]
    pub env_local_file: PathBuf,
}

impl GlobalArgs {
    /// Resolve settings from the environment, then apply flag overrides.
    ///
    /// # Errors
    /// Returns a configuration error for an unreadable env file or an invalid
    /// value from any layer.
    pub fn settings(&self) -> Result<Settings> {
        let sources = ConfigSources {
            env_file: self.env_file.clone(),
            env_local_file: self.env_local_file.clone(),
        };
        let mut settings = Settings::load(&sources)?;
        if let Some(url) = &self.database_url {
            settings = settings.with_database_url(url)?;
        }
        if let Some(level) = &self.log_level {
            settings.logging.level = LoggingConfig::parse_level(level)?;
        }
        if self.json_logs {
            settings.logging.format = LogFormat::Json;
        }
        Ok(settings)
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Apply pending migrations
    Upgrade(UpgradeArgs),

    /// Revert applied migrations
    Downgrade(DowngradeArgs),

    /// Write a new migration from the difference between model and database
    Generate(GenerateArgs),

    /// List every revision and whether it is applied
    History,

    /// Show the current revision
    Current,

    /// Report pending migrations and schema drift (exit 1 on drift)
    Check,

    /// Show tables and row counts
    Status,

    /// Prepare the database location and open the database
    Create,

    /// Print the declarative schema as SQL
    Schema,
}

/// Arguments for `tradedb upgrade`.
#[derive(Args, Debug)]
pub struct UpgradeArgs {
    /// Revision to upgrade to
    #[arg(long, default_value = "head", value_name = "REVISION")]
    pub to: String,
}

/// Arguments for `tradedb downgrade`.
#[derive(Args, Debug)]
pub struct DowngradeArgs {
    /// `-N` steps, `base`, or a revision id
    #[arg(default_value = "-1", allow_hyphen_values = true)]
    pub target: String,
}

/// Arguments for `tradedb generate`.
#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Short description of the change
    pub message: String,

    /// Directory holding the migration units
    #[arg(long, default_value = "migrations")]
    pub migrations_dir: PathBuf,

    /// Revision manifest to extend
    #[arg(long, default_value = "revisions.toml")]
    pub manifest: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn downgrade_accepts_negative_steps() {
        let cli = Cli::try_parse_from(["tradedb", "downgrade", "-2"]).unwrap();
        match cli.command {
            Commands::Downgrade(args) => assert_eq!(args.target, "-2"),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn downgrade_defaults_to_one_step() {
        let cli = Cli::try_parse_from(["tradedb", "downgrade"]).unwrap();
        match cli.command {
            Commands::Downgrade(args) => assert_eq!(args.target, "-1"),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn global_flags_follow_the_subcommand() {
        let cli = Cli::try_parse_from([
            "tradedb",
            "current",
            "--database-url",
            "sqlite::memory:",
            "--json-logs",
        ])
        .unwrap();
        assert_eq!(cli.global.database_url.as_deref(), Some("sqlite::memory:"));
        assert!(cli.global.json_logs);
        assert_eq!(cli.global.env_file, PathBuf::from(".env"));
    }
}
