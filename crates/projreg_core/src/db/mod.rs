//! Registry database bootstrap.
//!
//! # Responsibility
//! - Open the registry's SQLite database and bring its schema up to date.
//! - Report which step of bootstrap failed: open, migration, or version check.
//!
//! # Invariants
//! - Schema version lives in `PRAGMA user_version`.
//! - No corpus row is read or written before migrations succeed.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;

pub use open::{open_db, open_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

/// Registry database failure.
#[derive(Debug)]
pub enum DbError {
    /// Statement-level failure on an open, migrated connection.
    Sqlite(rusqlite::Error),
    /// The database could not be opened at all.
    Open {
        target: String,
        source: rusqlite::Error,
    },
    /// A migration script failed; the whole batch was rolled back.
    Migration {
        version: u32,
        source: rusqlite::Error,
    },
    /// The file was written by a newer registry build.
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "registry database error: {err}"),
            Self::Open { target, source } => {
                write!(f, "cannot open registry database `{target}`: {source}")
            }
            Self::Migration { version, source } => {
                write!(f, "registry schema migration {version} failed: {source}")
            }
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "registry schema version {db_version} is newer than supported {latest_supported}; upgrade projreg"
            ),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::Open { source, .. } | Self::Migration { source, .. } => Some(source),
            Self::UnsupportedSchemaVersion { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
