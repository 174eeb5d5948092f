//! Submission and corpus entry records.
//!
//! # Responsibility
//! - Model the transient `SubmissionCandidate` and the stored `CorpusEntry`.
//! - Provide the shared non-empty text validation used before any store access.
//!
//! # Invariants
//! - `title` and `description` are non-empty after trimming whitespace.
//! - `max_similarity_score`, when set, lies in `[0.0, 1.0]`.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Submission cycle identifier: a year bucket such as `2025`.
pub type CycleId = i32;

/// Stable identifier assigned by the store to each accepted project.
pub type CorpusEntryId = Uuid;

/// Validation failure for project text fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryValidationError {
    EmptyTitle,
    EmptyDescription,
    ScoreOutOfRange,
}

impl Display for EntryValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyTitle => write!(f, "title must be non-empty"),
            Self::EmptyDescription => write!(f, "description must be non-empty"),
            Self::ScoreOutOfRange => write!(f, "max similarity score must be within [0, 1]"),
        }
    }
}

impl Error for EntryValidationError {}

/// Incoming project to be checked against the current cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionCandidate {
    pub title: String,
    pub description: String,
}

impl SubmissionCandidate {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
        }
    }

    /// Rejects empty or whitespace-only fields.
    pub fn validate(&self) -> Result<(), EntryValidationError> {
        validate_text_fields(&self.title, &self.description)
    }

    /// Text fed to the similarity engine for this candidate.
    pub fn document_text(&self) -> String {
        document_text(&self.title, &self.description)
    }
}

/// Previously accepted project for one submission cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorpusEntry {
    pub id: CorpusEntryId,
    pub title: String,
    pub description: String,
    pub cycle: CycleId,
    /// Highest score this project reached against its cycle when accepted.
    pub max_similarity_score: Option<f64>,
}

impl CorpusEntry {
    pub fn document_text(&self) -> String {
        document_text(&self.title, &self.description)
    }
}

/// Insert command for a newly accepted project.
#[derive(Debug, Clone, PartialEq)]
pub struct NewCorpusEntry {
    pub title: String,
    pub description: String,
    pub cycle: CycleId,
    pub max_similarity_score: Option<f64>,
}

impl NewCorpusEntry {
    /// Builds an insert command from an accepted candidate.
    pub fn from_candidate(
        candidate: &SubmissionCandidate,
        cycle: CycleId,
        max_similarity_score: Option<f64>,
    ) -> Self {
        Self {
            title: candidate.title.clone(),
            description: candidate.description.clone(),
            cycle,
            max_similarity_score,
        }
    }

    pub fn validate(&self) -> Result<(), EntryValidationError> {
        validate_text_fields(&self.title, &self.description)?;
        match self.max_similarity_score {
            Some(score) if !(0.0..=1.0).contains(&score) => {
                Err(EntryValidationError::ScoreOutOfRange)
            }
            _ => Ok(()),
        }
    }
}

fn validate_text_fields(title: &str, description: &str) -> Result<(), EntryValidationError> {
    if title.trim().is_empty() {
        return Err(EntryValidationError::EmptyTitle);
    }
    if description.trim().is_empty() {
        return Err(EntryValidationError::EmptyDescription);
    }
    Ok(())
}

fn document_text(title: &str, description: &str) -> String {
    format!("{title} {description}")
}
