use std::collections::HashMap;
use std::fs;

use tempfile::TempDir;
use tradedb::config::{ConfigSources, DatabaseUrl, LogFormat, Settings, UrlOrigin};
use tradedb::error::{ConfigError, Error};

fn env_dir(base: Option<&str>, local: Option<&str>) -> TempDir {
    let dir = tempfile::tempdir().expect("create temp dir");
    if let Some(contents) = base {
        fs::write(dir.path().join(".env"), contents).expect("write .env");
    }
    if let Some(contents) = local {
        fs::write(dir.path().join(".env.local"), contents).expect("write .env.local");
    }
    dir
}

fn resolve(dir: &TempDir, env: &[(&str, &str)]) -> Result<Settings, Error> {
    let env: HashMap<String, String> = env
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect();
    Settings::resolve(&ConfigSources::in_dir(dir.path()), |key| env.get(key).cloned())
}

#[test]
fn defaults_to_local_sqlite_file() {
    let dir = env_dir(None, None);
    let settings = resolve(&dir, &[]).unwrap();

    assert_eq!(settings.database_url_origin, UrlOrigin::Default);
    assert_eq!(settings.database_url.sqlite_path(), Some("./ai_trader.db"));
    assert_eq!(settings.logging.level, "info");
    assert_eq!(settings.logging.format, LogFormat::Pretty);
}

#[test]
fn env_file_beats_default() {
    let dir = env_dir(Some("DATABASE_URL=sqlite://base.db\n"), None);
    let settings = resolve(&dir, &[]).unwrap();

    assert_eq!(settings.database_url_origin, UrlOrigin::DatabaseUrl);
    assert_eq!(settings.database_url.sqlite_path(), Some("base.db"));
}

#[test]
fn local_file_beats_env_file() {
    let dir = env_dir(
        Some("DATABASE_URL=sqlite://base.db\nLOG_LEVEL=debug\n"),
        Some("DATABASE_URL=sqlite://local.db\n"),
    );
    let settings = resolve(&dir, &[]).unwrap();

    assert_eq!(settings.database_url.sqlite_path(), Some("local.db"));
    assert_eq!(settings.logging.level, "debug");
}

#[test]
fn process_environment_beats_both_files() {
    let dir = env_dir(
        Some("DATABASE_URL=sqlite://base.db\n"),
        Some("DATABASE_URL=sqlite://local.db\nLOG_FORMAT=json\n"),
    );
    let settings = resolve(&dir, &[("DATABASE_URL", "sqlite::memory:")]).unwrap();

    assert!(settings.database_url.is_memory());
    assert_eq!(settings.logging.format, LogFormat::Json);
}

#[test]
fn database_url_beats_postgres_components() {
    let dir = env_dir(
        Some("POSTGRES_SERVER=db\nPOSTGRES_USER=u\nPOSTGRES_PASSWORD=p\nPOSTGRES_DB=d\n"),
        None,
    );
    let settings = resolve(&dir, &[("DATABASE_URL", "sqlite://x.db")]).unwrap();
    assert_eq!(settings.database_url_origin, UrlOrigin::DatabaseUrl);

    let settings = resolve(&dir, &[]).unwrap();
    assert_eq!(settings.database_url_origin, UrlOrigin::PostgresComponents);
    assert!(matches!(settings.database_url, DatabaseUrl::Postgres(_)));
    assert_eq!(settings.database_url.to_string(), "postgresql://u:***@db:5432/d");
}

#[test]
fn partial_postgres_components_fall_back_to_sqlite() {
    let dir = env_dir(Some("POSTGRES_SERVER=db\nPOSTGRES_USER=u\n"), None);
    let settings = resolve(&dir, &[]).unwrap();
    assert_eq!(settings.database_url_origin, UrlOrigin::Default);
}

#[test]
fn unsupported_scheme_is_invalid() {
    let dir = env_dir(None, None);
    let err = resolve(&dir, &[("DATABASE_URL", "mysql://root@localhost/db")]).unwrap_err();
    assert!(matches!(
        err,
        Error::Config(ConfigError::InvalidValue {
            field: "DATABASE_URL",
            ..
        })
    ));
}

#[test]
fn invalid_log_level_in_file_is_reported() {
    let dir = env_dir(None, Some("LOG_LEVEL=chatty\n"));
    let err = resolve(&dir, &[]).unwrap_err();
    assert!(matches!(
        err,
        Error::Config(ConfigError::InvalidValue {
            field: "LOG_LEVEL",
            ..
        })
    ));
}

#[test]
fn malformed_env_file_is_reported() {
    let dir = env_dir(Some("DATABASE_URL=\"unterminated\n"), None);
    let err = resolve(&dir, &[]).unwrap_err();
    assert!(matches!(err, Error::Config(ConfigError::EnvFile { .. })));
}

#[test]
fn flag_override_replaces_resolved_url() {
    let dir = env_dir(Some("DATABASE_URL=sqlite://base.db\n"), None);
    let settings = resolve(&dir, &[])
        .unwrap()
        .with_database_url("sqlite://flag.db")
        .unwrap();
    assert_eq!(settings.database_url.sqlite_path(), Some("flag.db"));
}

#[test]
fn env_files_read_are_recorded() {
    let dir = env_dir(Some("DATABASE_URL=sqlite://base.db\nLOG_LEVEL=debug\n"), None);
    let settings = resolve(&dir, &[]).unwrap();

    assert_eq!(settings.env_files(), [(dir.path().join(".env"), 2)]);
}
