//! Core domain logic for the project registry.
//! This crate owns the duplicate-check policy for project submissions.

pub mod config;
pub mod cycle;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod similarity;

pub use config::{ConfigError, CoreConfig};
pub use cycle::{resolve_cycle, Clock, CyclePolicy, CyclePolicyError, FixedClock, SystemClock};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::corpus_entry::{
    CorpusEntry, CorpusEntryId, CycleId, EntryValidationError, NewCorpusEntry,
    SubmissionCandidate,
};
pub use repo::corpus_repo::{ProjectStore, RepoError, RepoResult, SqliteProjectStore};
pub use service::duplicate_check_service::{
    classify, CheckError, Decision, DuplicateCheckOutcome, DuplicateCheckService, ScoredTitle,
    DUPLICATE_THRESHOLD,
};
pub use similarity::{score, SimilarityError, SimilarityResult, SimilarityScore};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
