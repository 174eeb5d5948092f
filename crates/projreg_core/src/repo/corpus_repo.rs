//! Project store contract and SQLite implementation.
//!
//! # Responsibility
//! - Return a cycle's corpus in stable insertion order.
//! - Record newly accepted projects and surface title conflicts semantically.
//!
//! # Invariants
//! - `(cycle, title)` is unique; conflicts map to `RepoError::DuplicateTitle`.
//! - Read paths reject invalid persisted rows instead of masking them.

use crate::db::migrations::{current_user_version, latest_version};
use crate::db::DbError;
use crate::model::corpus_entry::{
    CorpusEntry, CorpusEntryId, CycleId, EntryValidationError, NewCorpusEntry,
};
use log::{debug, warn};
use rusqlite::{params, Connection, ErrorCode, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

const CORPUS_SELECT_SQL: &str = "SELECT
    uuid,
    title,
    description,
    cycle,
    max_similarity_score
FROM corpus_entries";

pub type RepoResult<T> = Result<T, RepoError>;

/// Project store error for corpus reads and writes.
#[derive(Debug)]
pub enum RepoError {
    Validation(EntryValidationError),
    Db(DbError),
    /// Another entry with the same title already exists in the cycle.
    DuplicateTitle {
        title: String,
        cycle: CycleId,
    },
    InvalidData(String),
    /// Connection was handed over before migrations reached this binary's version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::DuplicateTitle { title, cycle } => {
                write!(f, "project title `{title}` already exists in cycle {cycle}")
            }
            Self::InvalidData(message) => {
                write!(f, "invalid persisted corpus data: {message}")
            }
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "connection schema version {actual_version} does not match expected {expected_version}"
            ),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<EntryValidationError> for RepoError {
    fn from(value: EntryValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Cycle-scoped corpus storage consumed by the duplicate check.
pub trait ProjectStore {
    /// Returns every entry of `cycle`, oldest first.
    fn fetch_cycle_corpus(&self, cycle: CycleId) -> RepoResult<Vec<CorpusEntry>>;
    /// Records a new entry; fails with `DuplicateTitle` on a `(cycle, title)` clash.
    fn insert_corpus_entry(&self, entry: &NewCorpusEntry) -> RepoResult<CorpusEntry>;
    /// Looks up one entry by exact title within a cycle.
    fn get_corpus_entry(&self, cycle: CycleId, title: &str) -> RepoResult<Option<CorpusEntry>>;
}

impl<S: ProjectStore + ?Sized> ProjectStore for &S {
    fn fetch_cycle_corpus(&self, cycle: CycleId) -> RepoResult<Vec<CorpusEntry>> {
        (**self).fetch_cycle_corpus(cycle)
    }

    fn insert_corpus_entry(&self, entry: &NewCorpusEntry) -> RepoResult<CorpusEntry> {
        (**self).insert_corpus_entry(entry)
    }

    fn get_corpus_entry(&self, cycle: CycleId, title: &str) -> RepoResult<Option<CorpusEntry>> {
        (**self).get_corpus_entry(cycle, title)
    }
}

/// SQLite-backed project store.
pub struct SqliteProjectStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteProjectStore<'conn> {
    /// Constructs a store from a migrated connection.
    ///
    /// # Errors
    /// - `UninitializedConnection` when `user_version` differs from the latest migration.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        let expected_version = latest_version();
        let actual_version = current_user_version(conn)?;
        if actual_version != expected_version {
            return Err(RepoError::UninitializedConnection {
                expected_version,
                actual_version,
            });
        }
        Ok(Self { conn })
    }

    fn load_required_entry(&self, id: CorpusEntryId) -> RepoResult<CorpusEntry> {
        let mut stmt = self
            .conn
            .prepare(&format!("{CORPUS_SELECT_SQL} WHERE uuid = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        match rows.next()? {
            Some(row) => parse_entry_row(row),
            None => Err(RepoError::InvalidData(format!(
                "inserted corpus entry {id} missing on read-back"
            ))),
        }
    }
}

impl ProjectStore for SqliteProjectStore<'_> {
    fn fetch_cycle_corpus(&self, cycle: CycleId) -> RepoResult<Vec<CorpusEntry>> {
        let mut stmt = self.conn.prepare(&format!(
            "{CORPUS_SELECT_SQL}
             WHERE cycle = ?1
             ORDER BY rowid ASC;"
        ))?;
        let mut rows = stmt.query([cycle])?;
        let mut entries = Vec::new();
        while let Some(row) = rows.next()? {
            entries.push(parse_entry_row(row)?);
        }

        debug!(
            "event=corpus_fetch module=repo status=ok cycle={cycle} count={}",
            entries.len()
        );
        Ok(entries)
    }

    fn insert_corpus_entry(&self, entry: &NewCorpusEntry) -> RepoResult<CorpusEntry> {
        entry.validate()?;

        let id = Uuid::new_v4();
        let inserted = self.conn.execute(
            "INSERT INTO corpus_entries (
                uuid,
                title,
                description,
                cycle,
                max_similarity_score
            ) VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                id.to_string(),
                entry.title.as_str(),
                entry.description.as_str(),
                entry.cycle,
                entry.max_similarity_score,
            ],
        );

        if let Err(err) = inserted {
            if is_unique_violation(&err) {
                warn!(
                    "event=corpus_insert module=repo status=conflict cycle={} error_code=duplicate_title",
                    entry.cycle
                );
                return Err(RepoError::DuplicateTitle {
                    title: entry.title.clone(),
                    cycle: entry.cycle,
                });
            }
            return Err(err.into());
        }

        self.load_required_entry(id)
    }

    fn get_corpus_entry(&self, cycle: CycleId, title: &str) -> RepoResult<Option<CorpusEntry>> {
        let mut stmt = self.conn.prepare(&format!(
            "{CORPUS_SELECT_SQL}
             WHERE cycle = ?1
               AND title = ?2;"
        ))?;
        let mut rows = stmt.query(params![cycle, title])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_entry_row(row)?));
        }
        Ok(None)
    }
}

fn parse_entry_row(row: &Row<'_>) -> RepoResult<CorpusEntry> {
    let uuid_text: String = row.get("uuid")?;
    let id = Uuid::parse_str(&uuid_text).map_err(|_| {
        RepoError::InvalidData(format!(
            "invalid uuid value `{uuid_text}` in corpus_entries.uuid"
        ))
    })?;

    let max_similarity_score: Option<f64> = row.get("max_similarity_score")?;
    if let Some(score) = max_similarity_score {
        if !(0.0..=1.0).contains(&score) {
            return Err(RepoError::InvalidData(format!(
                "score `{score}` out of range in corpus_entries.max_similarity_score"
            )));
        }
    }

    let title: String = row.get("title")?;
    let description: String = row.get("description")?;
    if title.trim().is_empty() || description.trim().is_empty() {
        return Err(RepoError::InvalidData(format!(
            "empty text field in corpus entry {id}"
        )));
    }

    Ok(CorpusEntry {
        id,
        title,
        description,
        cycle: row.get("cycle")?,
        max_similarity_score,
    })
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(failure, _) => {
            failure.code == ErrorCode::ConstraintViolation
                && failure.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
        }
        _ => false,
    }
}
