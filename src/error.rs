use thiserror::Error;

/// Configuration-related errors with structured variants.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("failed to read env file {path}: {reason}")]
    EnvFile { path: String, reason: String },
}

/// Inconsistencies in the revision graph of the migration chain.
///
/// Any of these is fatal: the chain must be repaired by hand before a
/// migration may run.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChainError {
    #[error("failed to parse revision manifest: {0}")]
    Manifest(String),

    #[error("revision manifest lists no revisions")]
    Empty,

    #[error("revision {0} is declared more than once")]
    Duplicate(String),

    #[error("revision {revision} names unknown predecessor {predecessor}")]
    MissingPredecessor {
        revision: String,
        predecessor: String,
    },

    #[error("revision {revision} does not sort after its predecessor {predecessor}")]
    PredecessorOrder {
        revision: String,
        predecessor: String,
    },

    #[error("chain has more than one root: {}", .0.join(", "))]
    MultipleRoots(Vec<String>),

    #[error(
        "revisions {} all descend from {predecessor} and never merge; heads: {}",
        .children.join(", "),
        .heads.join(", ")
    )]
    Divergent {
        predecessor: String,
        children: Vec<String>,
        heads: Vec<String>,
    },

    #[error("migration unit {0} has no entry in the revision manifest")]
    UnitWithoutRevision(String),

    #[error("revision {0} has no migration unit")]
    RevisionWithoutUnit(String),

    #[error("database records applied revision {0} which is not part of the chain")]
    UnknownApplied(String),
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Chain(#[from] ChainError),

    #[error("uniqueness constraint violated: {0}")]
    UniqueViolation(String),

    #[error("foreign key constraint violated: {0}")]
    ForeignKeyViolation(String),

    #[error("database is at {current}, expected head {head}; run upgrade first")]
    NotAtHead { current: String, head: String },

    #[error("cannot downgrade {requested} revision(s): only {applied} applied")]
    DowngradePastBase { requested: usize, applied: usize },

    #[error("unknown revision: {0}")]
    UnknownRevision(String),

    #[error("unsupported database backend: {0}")]
    UnsupportedBackend(String),

    #[error("migration error: {0}")]
    Migration(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("parse error: {0}")]
    Parse(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<diesel::result::Error> for Error {
    fn from(err: diesel::result::Error) -> Self {
        use diesel::result::{DatabaseErrorKind, Error as DieselError};

        match err {
            DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
                Error::UniqueViolation(info.message().to_string())
            }
            DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, info) => {
                Error::ForeignKeyViolation(info.message().to_string())
            }
            other => Error::Database(other.to_string()),
        }
    }
}

impl From<diesel::r2d2::PoolError> for Error {
    fn from(err: diesel::r2d2::PoolError) -> Self {
        Error::Connection(err.to_string())
    }
}
