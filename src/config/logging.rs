//! Logging configuration and initialization.

use std::fmt;
use std::str::FromStr;

use tracing_subscriber::{fmt as subscriber, EnvFilter};

use crate::error::ConfigError;

/// Output format of the tracing subscriber.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::InvalidValue {
                field: "LOG_FORMAT",
                reason: format!("expected 'pretty' or 'json', got '{other}'"),
            }),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pretty => "pretty",
            Self::Json => "json",
        })
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    /// A level name or an `EnvFilter` directive such as `tradedb=debug`.
    pub level: String,
    pub format: LogFormat,
}

impl LoggingConfig {
    /// Validate a `LOG_LEVEL` value and normalize it to a filter directive.
    ///
    /// Python-style names are accepted: `WARNING` maps to `warn` and
    /// `CRITICAL` to `error`.
    ///
    /// # Errors
    /// Returns [`ConfigError::InvalidValue`] for anything that is neither a
    /// level nor a `target=level` directive list.
    pub fn parse_level(value: &str) -> Result<String, ConfigError> {
        let trimmed = value.trim();
        let lowered = trimmed.to_ascii_lowercase();
        let normalized = match lowered.as_str() {
            "warning" => "warn",
            "critical" | "fatal" => "error",
            other => other,
        };
        if normalized.parse::<tracing::Level>().is_ok() || normalized == "off" {
            return Ok(normalized.to_string());
        }
        if trimmed.contains('=') && EnvFilter::try_new(trimmed).is_ok() {
            return Ok(trimmed.to_string());
        }
        Err(ConfigError::InvalidValue {
            field: "LOG_LEVEL",
            reason: format!("'{trimmed}' is not a log level or filter directive"),
        })
    }

    /// Initialize the tracing subscriber with this logging configuration.
    ///
    /// `RUST_LOG` takes precedence over the configured level. Events go to
    /// stderr so command output on stdout stays clean.
    pub fn init(&self) {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.level));

        match self.format {
            LogFormat::Json => {
                subscriber()
                    .json()
                    .with_env_filter(filter)
                    .with_writer(std::io::stderr)
                    .init();
            }
            LogFormat::Pretty => {
                subscriber()
                    .with_env_filter(filter)
                    .with_writer(std::io::stderr)
                    .init();
            }
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: LogFormat::Pretty,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_names_are_case_insensitive() {
        assert_eq!(LoggingConfig::parse_level("DEBUG").unwrap(), "debug");
        assert_eq!(LoggingConfig::parse_level(" info ").unwrap(), "info");
    }

    #[test]
    fn python_level_names_are_mapped() {
        assert_eq!(LoggingConfig::parse_level("WARNING").unwrap(), "warn");
        assert_eq!(LoggingConfig::parse_level("CRITICAL").unwrap(), "error");
    }

    #[test]
    fn directives_are_kept_verbatim() {
        assert_eq!(
            LoggingConfig::parse_level("tradedb=debug,diesel=warn").unwrap(),
            "tradedb=debug,diesel=warn"
        );
    }

    #[test]
    fn nonsense_level_is_rejected() {
        assert!(matches!(
            LoggingConfig::parse_level("loud"),
            Err(ConfigError::InvalidValue {
                field: "LOG_LEVEL",
                ..
            })
        ));
    }

    #[test]
    fn format_parses() {
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("pretty".parse::<LogFormat>().unwrap(), LogFormat::Pretty);
        assert!("xml".parse::<LogFormat>().is_err());
    }
}
