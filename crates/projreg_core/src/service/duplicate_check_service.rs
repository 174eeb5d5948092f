//! Duplicate-check use-case service.
//!
//! # Responsibility
//! - Decide whether a submission is first of its cycle, a near-duplicate, or novel.
//! - Record accepted submissions in the resolved cycle.
//!
//! # Invariants
//! - Candidate validation happens before any store access.
//! - The store is written only for `FirstOfCycle` and `Accepted` outcomes.
//! - A near-duplicate is a successful check, never an error.
//! - Corpus fetch and insert are not atomic; concurrent near-identical
//!   submissions for one cycle can both be accepted.

use crate::cycle::{resolve_cycle, Clock, CyclePolicy, SystemClock};
use crate::model::corpus_entry::{
    CorpusEntry, CycleId, EntryValidationError, NewCorpusEntry, SubmissionCandidate,
};
use crate::repo::corpus_repo::{ProjectStore, RepoError};
use crate::similarity::{self, SimilarityError};
use log::{error, info, warn};
use serde::{Serialize, Serializer};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

/// Scores strictly above this value mark a near-duplicate.
pub const DUPLICATE_THRESHOLD: f64 = 0.5;

/// Corpus project title paired with its score against the candidate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredTitle {
    pub title: String,
    /// Raw cosine score; serialized with two decimal places.
    #[serde(rename = "similarity_score", serialize_with = "serialize_two_decimals")]
    pub score: f64,
}

impl ScoredTitle {
    pub fn new(title: impl Into<String>, score: f64) -> Self {
        Self {
            title: title.into(),
            score,
        }
    }
}

fn two_decimals(score: f64) -> String {
    format!("{score:.2}")
}

fn serialize_two_decimals<S: Serializer>(score: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&two_decimals(*score))
}

/// Result of one duplicate check.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DuplicateCheckOutcome {
    /// Cycle had no entries; the candidate was recorded.
    FirstOfCycle { cycle: CycleId, entry: CorpusEntry },
    /// Entries scoring above the threshold, in corpus order. Nothing recorded.
    NearDuplicateFound {
        cycle: CycleId,
        matches: Vec<ScoredTitle>,
    },
    /// No entry above the threshold; the candidate was recorded.
    Accepted {
        cycle: CycleId,
        entry: CorpusEntry,
        all_scores: Vec<ScoredTitle>,
    },
}

impl DuplicateCheckOutcome {
    pub fn cycle(&self) -> CycleId {
        match self {
            Self::FirstOfCycle { cycle, .. }
            | Self::NearDuplicateFound { cycle, .. }
            | Self::Accepted { cycle, .. } => *cycle,
        }
    }

    /// Entry created by this check, if any.
    pub fn recorded_entry(&self) -> Option<&CorpusEntry> {
        match self {
            Self::FirstOfCycle { entry, .. } | Self::Accepted { entry, .. } => Some(entry),
            Self::NearDuplicateFound { .. } => None,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Self::FirstOfCycle { .. } => "first_of_cycle",
            Self::NearDuplicateFound { .. } => "near_duplicate_found",
            Self::Accepted { .. } => "accepted",
        }
    }
}

/// Threshold decision over scored corpus titles.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// Only the entries above the threshold, in input order.
    NearDuplicate(Vec<ScoredTitle>),
    /// Every entry, in input order.
    Novel(Vec<ScoredTitle>),
}

/// Partitions scored titles by `DUPLICATE_THRESHOLD` (exclusive).
pub fn classify(scored: Vec<ScoredTitle>) -> Decision {
    let matches = scored
        .iter()
        .filter(|item| item.score > DUPLICATE_THRESHOLD)
        .cloned()
        .collect::<Vec<_>>();

    if matches.is_empty() {
        Decision::Novel(scored)
    } else {
        Decision::NearDuplicate(matches)
    }
}

/// Service error for the duplicate check.
#[derive(Debug)]
pub enum CheckError {
    /// Candidate title or description is empty.
    InvalidInput(EntryValidationError),
    /// Similarity engine rejected its input text.
    InvalidText(SimilarityError),
    /// Corpus could not be read; no decision was made.
    CorpusFetch(RepoError),
    /// Decision was made but recording the candidate failed; safe to retry.
    Persistence(RepoError),
    /// The store already holds this title in the cycle.
    DuplicateTitle { title: String, cycle: CycleId },
}

impl CheckError {
    /// Whether the caller supplied unusable text.
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, Self::InvalidInput(_) | Self::InvalidText(_))
    }
}

impl Display for CheckError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidInput(err) => write!(f, "invalid submission: {err}"),
            Self::InvalidText(err) => write!(f, "invalid submission: {err}"),
            Self::CorpusFetch(err) => write!(f, "failed to load cycle corpus: {err}"),
            Self::Persistence(err) => write!(f, "failed to record project: {err}"),
            Self::DuplicateTitle { title, cycle } => {
                write!(f, "project title `{title}` already exists in cycle {cycle}")
            }
        }
    }
}

impl Error for CheckError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidInput(err) => Some(err),
            Self::InvalidText(err) => Some(err),
            Self::CorpusFetch(err) | Self::Persistence(err) => Some(err),
            Self::DuplicateTitle { .. } => None,
        }
    }
}

impl From<EntryValidationError> for CheckError {
    fn from(value: EntryValidationError) -> Self {
        Self::InvalidInput(value)
    }
}

impl From<SimilarityError> for CheckError {
    fn from(value: SimilarityError) -> Self {
        Self::InvalidText(value)
    }
}

/// Duplicate-check orchestrator over a project store.
pub struct DuplicateCheckService<S: ProjectStore, C: Clock = SystemClock> {
    store: S,
    policy: CyclePolicy,
    clock: C,
}

impl<S: ProjectStore> DuplicateCheckService<S> {
    /// Creates a service resolving cycles from the local wall clock.
    pub fn new(store: S, policy: CyclePolicy) -> Self {
        Self::with_clock(store, policy, SystemClock)
    }
}

impl<S: ProjectStore, C: Clock> DuplicateCheckService<S, C> {
    /// Creates a service with an explicit date source.
    pub fn with_clock(store: S, policy: CyclePolicy, clock: C) -> Self {
        Self {
            store,
            policy,
            clock,
        }
    }

    /// Cycle new submissions are attributed to right now.
    pub fn current_cycle(&self) -> CycleId {
        resolve_cycle(&self.clock.today(), &self.policy)
    }

    /// Lists accepted projects of one cycle.
    pub fn cycle_corpus(&self, cycle: CycleId) -> Result<Vec<CorpusEntry>, CheckError> {
        self.store
            .fetch_cycle_corpus(cycle)
            .map_err(CheckError::CorpusFetch)
    }

    /// Checks `candidate` against the current cycle and records it when novel.
    ///
    /// # Errors
    /// - `InvalidInput` / `InvalidText` for blank text, before any store access.
    /// - `CorpusFetch` when the cycle corpus cannot be read.
    /// - `Persistence` or `DuplicateTitle` when recording an accepted candidate fails.
    pub fn check_similarity(
        &self,
        candidate: &SubmissionCandidate,
    ) -> Result<DuplicateCheckOutcome, CheckError> {
        let started_at = Instant::now();
        candidate.validate()?;

        let cycle = self.current_cycle();
        let corpus = self.cycle_corpus(cycle).map_err(|err| {
            error!(
                "event=duplicate_check module=service status=error cycle={cycle} error_code=corpus_fetch_failed error={err}"
            );
            err
        })?;

        let outcome = if corpus.is_empty() {
            let entry = self.record(NewCorpusEntry::from_candidate(candidate, cycle, None))?;
            DuplicateCheckOutcome::FirstOfCycle { cycle, entry }
        } else {
            let texts = corpus
                .iter()
                .map(CorpusEntry::document_text)
                .collect::<Vec<_>>();
            let scores = similarity::score(&candidate.document_text(), texts.as_slice())?;
            let scored = scores
                .iter()
                .map(|item| ScoredTitle::new(corpus[item.corpus_index].title.clone(), item.score))
                .collect::<Vec<_>>();

            match classify(scored) {
                Decision::NearDuplicate(matches) => {
                    DuplicateCheckOutcome::NearDuplicateFound { cycle, matches }
                }
                Decision::Novel(all_scores) => {
                    let max_score = all_scores.iter().map(|item| item.score).reduce(f64::max);
                    let entry =
                        self.record(NewCorpusEntry::from_candidate(candidate, cycle, max_score))?;
                    DuplicateCheckOutcome::Accepted {
                        cycle,
                        entry,
                        all_scores,
                    }
                }
            }
        };

        info!(
            "event=duplicate_check module=service status=ok cycle={cycle} corpus_size={} outcome={} title_len={} duration_ms={}",
            corpus.len(),
            outcome.label(),
            candidate.title.chars().count(),
            started_at.elapsed().as_millis()
        );
        Ok(outcome)
    }

    fn record(&self, entry: NewCorpusEntry) -> Result<CorpusEntry, CheckError> {
        self.store.insert_corpus_entry(&entry).map_err(|err| match err {
            RepoError::DuplicateTitle { title, cycle } => {
                warn!(
                    "event=duplicate_check module=service status=conflict cycle={cycle} error_code=duplicate_title"
                );
                CheckError::DuplicateTitle { title, cycle }
            }
            other => {
                error!(
                    "event=duplicate_check module=service status=error cycle={} error_code=persist_failed error={other}",
                    entry.cycle
                );
                CheckError::Persistence(other)
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{classify, two_decimals, Decision, ScoredTitle, DUPLICATE_THRESHOLD};

    #[test]
    fn score_at_threshold_is_not_a_duplicate() {
        let scored = vec![
            ScoredTitle::new("Campus Map", DUPLICATE_THRESHOLD),
            ScoredTitle::new("Bus Tracker", 0.1),
        ];
        assert_eq!(classify(scored.clone()), Decision::Novel(scored));
    }

    #[test]
    fn score_just_above_threshold_is_a_duplicate() {
        let scored = vec![
            ScoredTitle::new("Campus Map", 0.2),
            ScoredTitle::new("Bus Tracker", 0.50001),
        ];
        assert_eq!(
            classify(scored),
            Decision::NearDuplicate(vec![ScoredTitle::new("Bus Tracker", 0.50001)])
        );
    }

    #[test]
    fn every_match_above_threshold_is_kept_in_order() {
        let scored = vec![
            ScoredTitle::new("A", 0.9),
            ScoredTitle::new("B", 0.3),
            ScoredTitle::new("C", 0.7),
        ];
        let Decision::NearDuplicate(matches) = classify(scored) else {
            panic!("expected near-duplicate decision");
        };
        let titles = matches
            .iter()
            .map(|item| item.title.as_str())
            .collect::<Vec<_>>();
        assert_eq!(titles, vec!["A", "C"]);
    }

    #[test]
    fn scores_are_rendered_with_two_decimals() {
        assert_eq!(two_decimals(0.58312), "0.58");
        assert_eq!(two_decimals(0.5), "0.50");
        assert_eq!(two_decimals(1.0), "1.00");
    }
}
