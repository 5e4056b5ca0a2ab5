use std::process::ExitCode;

use clap::Parser;
use tracing::warn;

use tradedb::cli::{self, output, Cli, Commands};
use tradedb::config::{UrlOrigin, DEFAULT_DATABASE_URL};
use tradedb::error::Result;

fn run(cli: Cli) -> Result<ExitCode> {
    if let Commands::Schema = cli.command {
        cli::schema::execute();
        return Ok(ExitCode::SUCCESS);
    }

    let settings = cli.global.settings()?;
    settings.logging.init();
    settings.log_sources();
    if settings.database_url_origin == UrlOrigin::Default {
        warn!(
            url = DEFAULT_DATABASE_URL,
            "DATABASE_URL not set, falling back to the local SQLite file"
        );
    }

    match &cli.command {
        Commands::Upgrade(args) => cli::migrate::upgrade(&settings, args)?,
        Commands::Downgrade(args) => cli::migrate::downgrade(&settings, args)?,
        Commands::Generate(args) => cli::generate::execute(&settings, args)?,
        Commands::History => cli::migrate::history(&settings)?,
        Commands::Current => cli::migrate::current(&settings)?,
        Commands::Check => {
            if !cli::check::execute(&settings)? {
                return Ok(ExitCode::FAILURE);
            }
        }
        Commands::Status => cli::status::execute(&settings)?,
        Commands::Create => cli::create::execute(&settings)?,
        Commands::Schema => cli::schema::execute(),
    }
    Ok(ExitCode::SUCCESS)
}

fn main() -> ExitCode {
    match run(Cli::parse()) {
        Ok(code) => code,
        Err(e) => {
            output::error(&e.to_string());
            ExitCode::FAILURE
        }
    }
}
