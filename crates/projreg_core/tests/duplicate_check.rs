use chrono::NaiveDate;
use projreg_core::db::{open_db_in_memory, DbError};
use projreg_core::{
    CheckError, CorpusEntry, CycleId, CyclePolicy, DuplicateCheckOutcome, DuplicateCheckService,
    EntryValidationError, FixedClock, NewCorpusEntry, ProjectStore, RepoError, RepoResult,
    SimilarityError, SqliteProjectStore, SubmissionCandidate,
};
use std::cell::Cell;

fn november_2024() -> FixedClock {
    FixedClock(NaiveDate::from_ymd_opt(2024, 11, 5).unwrap())
}

fn seed(store: &SqliteProjectStore<'_>, title: &str, description: &str, cycle: CycleId) {
    store
        .insert_corpus_entry(&NewCorpusEntry {
            title: title.to_string(),
            description: description.to_string(),
            cycle,
            max_similarity_score: None,
        })
        .unwrap();
}

/// Store double recording calls and optionally failing reads or writes.
struct ScriptedStore {
    corpus: Vec<CorpusEntry>,
    fetch_error: Option<fn(CycleId) -> RepoError>,
    insert_error: Option<fn(&NewCorpusEntry) -> RepoError>,
    fetches: Cell<usize>,
    inserts: Cell<usize>,
}

impl ScriptedStore {
    fn new(corpus: Vec<CorpusEntry>) -> Self {
        Self {
            corpus,
            fetch_error: None,
            insert_error: None,
            fetches: Cell::new(0),
            inserts: Cell::new(0),
        }
    }
}

impl ProjectStore for ScriptedStore {
    fn fetch_cycle_corpus(&self, cycle: CycleId) -> RepoResult<Vec<CorpusEntry>> {
        self.fetches.set(self.fetches.get() + 1);
        if let Some(make_error) = self.fetch_error {
            return Err(make_error(cycle));
        }
        Ok(self
            .corpus
            .iter()
            .filter(|entry| entry.cycle == cycle)
            .cloned()
            .collect())
    }

    fn insert_corpus_entry(&self, entry: &NewCorpusEntry) -> RepoResult<CorpusEntry> {
        self.inserts.set(self.inserts.get() + 1);
        if let Some(make_error) = self.insert_error {
            return Err(make_error(entry));
        }
        Ok(CorpusEntry {
            id: uuid_for(self.inserts.get()),
            title: entry.title.clone(),
            description: entry.description.clone(),
            cycle: entry.cycle,
            max_similarity_score: entry.max_similarity_score,
        })
    }

    fn get_corpus_entry(&self, cycle: CycleId, title: &str) -> RepoResult<Option<CorpusEntry>> {
        Ok(self
            .corpus
            .iter()
            .find(|entry| entry.cycle == cycle && entry.title == title)
            .cloned())
    }
}

/// Serves a corpus read taken before other submissions landed, while writes
/// go to the live store.
struct StaleSnapshotStore<'a, 'conn> {
    snapshot: Vec<CorpusEntry>,
    live: &'a SqliteProjectStore<'conn>,
}

impl ProjectStore for StaleSnapshotStore<'_, '_> {
    fn fetch_cycle_corpus(&self, _cycle: CycleId) -> RepoResult<Vec<CorpusEntry>> {
        Ok(self.snapshot.clone())
    }

    fn insert_corpus_entry(&self, entry: &NewCorpusEntry) -> RepoResult<CorpusEntry> {
        self.live.insert_corpus_entry(entry)
    }

    fn get_corpus_entry(&self, cycle: CycleId, title: &str) -> RepoResult<Option<CorpusEntry>> {
        self.live.get_corpus_entry(cycle, title)
    }
}

fn uuid_for(seq: usize) -> projreg_core::CorpusEntryId {
    projreg_core::CorpusEntryId::from_u128(seq as u128)
}

fn disk_full(_: &NewCorpusEntry) -> RepoError {
    RepoError::Db(DbError::Sqlite(rusqlite::Error::SqliteFailure(
        rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_FULL),
        None,
    )))
}

fn locked_database(_: CycleId) -> RepoError {
    RepoError::InvalidData("corpus table unreadable".to_string())
}

fn read_back_mismatch(_: &NewCorpusEntry) -> RepoError {
    RepoError::InvalidData("read-back mismatch".to_string())
}

fn title_taken(entry: &NewCorpusEntry) -> RepoError {
    RepoError::DuplicateTitle {
        title: entry.title.clone(),
        cycle: entry.cycle,
    }
}

fn corpus_entry(title: &str, description: &str, cycle: CycleId) -> CorpusEntry {
    CorpusEntry {
        id: uuid_for(1000),
        title: title.to_string(),
        description: description.to_string(),
        cycle,
        max_similarity_score: None,
    }
}

#[test]
fn empty_cycle_records_first_submission() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteProjectStore::try_new(&conn).unwrap();
    seed(&store, "AI Tutor", "helps students learn", 2024);
    let service = DuplicateCheckService::with_clock(&store, CyclePolicy::default(), november_2024());

    let outcome = service
        .check_similarity(&SubmissionCandidate::new("AI Tutor", "helps students learn"))
        .unwrap();

    let DuplicateCheckOutcome::FirstOfCycle { cycle, entry } = outcome else {
        panic!("expected first-of-cycle outcome");
    };
    assert_eq!(cycle, 2025);
    assert_eq!(entry.title, "AI Tutor");
    assert_eq!(entry.cycle, 2025);
    assert_eq!(entry.max_similarity_score, None);

    let stored = store.get_corpus_entry(2025, "AI Tutor").unwrap().unwrap();
    assert_eq!(stored, entry);
}

#[test]
fn high_overlap_submission_is_reported_and_not_recorded() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteProjectStore::try_new(&conn).unwrap();
    seed(&store, "AI Tutor", "helps students learn", 2025);
    let service = DuplicateCheckService::with_clock(&store, CyclePolicy::default(), november_2024());

    let outcome = service
        .check_similarity(&SubmissionCandidate::new(
            "AI Tutoring System",
            "helps students learn",
        ))
        .unwrap();

    let DuplicateCheckOutcome::NearDuplicateFound { cycle, matches } = &outcome else {
        panic!("expected near-duplicate outcome, got {outcome:?}");
    };
    assert_eq!(*cycle, 2025);
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].title, "AI Tutor");
    assert!(matches[0].score > 0.5 && matches[0].score < 0.9);
    assert!(outcome.recorded_entry().is_none());

    let titles = store
        .fetch_cycle_corpus(2025)
        .unwrap()
        .into_iter()
        .map(|entry| entry.title)
        .collect::<Vec<_>>();
    assert_eq!(titles, vec!["AI Tutor"]);
}

#[test]
fn novel_submission_is_accepted_with_all_scores_in_corpus_order() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteProjectStore::try_new(&conn).unwrap();
    seed(&store, "Campus Bus Tracker", "live map of shuttle buses", 2025);
    seed(&store, "Library Seat Booking", "reserve study seats online", 2025);
    let service = DuplicateCheckService::with_clock(&store, CyclePolicy::default(), november_2024());

    let outcome = service
        .check_similarity(&SubmissionCandidate::new(
            "Plant Disease Detector",
            "classify leaf photos for farmers",
        ))
        .unwrap();

    let DuplicateCheckOutcome::Accepted {
        cycle,
        entry,
        all_scores,
    } = outcome
    else {
        panic!("expected accepted outcome");
    };
    assert_eq!(cycle, 2025);
    let titles = all_scores
        .iter()
        .map(|item| item.title.as_str())
        .collect::<Vec<_>>();
    assert_eq!(titles, vec!["Campus Bus Tracker", "Library Seat Booking"]);
    assert!(all_scores.iter().all(|item| item.score <= 0.5));
    assert_eq!(entry.max_similarity_score, Some(0.0));

    assert_eq!(store.fetch_cycle_corpus(2025).unwrap().len(), 3);
}

#[test]
fn accepted_entry_records_highest_score() {
    let store = ScriptedStore::new(vec![
        corpus_entry("Campus Bus Tracker", "live map of shuttle buses", 2025),
        corpus_entry("Smart Parking", "find free parking around campus", 2025),
    ]);
    let service = DuplicateCheckService::with_clock(&store, CyclePolicy::default(), november_2024());

    let outcome = service
        .check_similarity(&SubmissionCandidate::new(
            "Campus Food Finder",
            "menus of dining halls on a map",
        ))
        .unwrap();

    let DuplicateCheckOutcome::Accepted {
        entry, all_scores, ..
    } = outcome
    else {
        panic!("expected accepted outcome");
    };
    let highest = all_scores
        .iter()
        .map(|item| item.score)
        .fold(0.0_f64, f64::max);
    assert!(highest > 0.0);
    assert_eq!(entry.max_similarity_score, Some(highest));
}

#[test]
fn outcome_serializes_scores_with_two_decimals() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteProjectStore::try_new(&conn).unwrap();
    seed(&store, "AI Tutor", "helps students learn", 2025);
    let service = DuplicateCheckService::with_clock(&store, CyclePolicy::default(), november_2024());

    let outcome = service
        .check_similarity(&SubmissionCandidate::new(
            "AI Tutoring System",
            "helps students learn",
        ))
        .unwrap();
    let json = serde_json::to_value(&outcome).unwrap();

    assert_eq!(json["status"], "near_duplicate_found");
    assert_eq!(json["cycle"], 2025);
    let rendered = json["matches"][0]["similarity_score"].as_str().unwrap();
    assert_eq!(rendered.len(), 4);
    assert!(rendered.starts_with("0."));
}

#[test]
fn empty_description_fails_before_store_access() {
    let store = ScriptedStore::new(Vec::new());
    let service = DuplicateCheckService::with_clock(&store, CyclePolicy::default(), november_2024());

    let err = service
        .check_similarity(&SubmissionCandidate::new("AI Tutor", ""))
        .unwrap_err();

    assert!(matches!(
        err,
        CheckError::InvalidInput(EntryValidationError::EmptyDescription)
    ));
    assert!(err.is_invalid_input());
    assert_eq!(store.fetches.get(), 0);
    assert_eq!(store.inserts.get(), 0);
}

#[test]
fn failed_write_on_accept_is_a_persistence_error() {
    let mut store = ScriptedStore::new(vec![corpus_entry(
        "Campus Bus Tracker",
        "live map of shuttle buses",
        2025,
    )]);
    store.insert_error = Some(disk_full);
    let service = DuplicateCheckService::with_clock(&store, CyclePolicy::default(), november_2024());

    let err = service
        .check_similarity(&SubmissionCandidate::new(
            "Plant Disease Detector",
            "classify leaf photos for farmers",
        ))
        .unwrap_err();

    assert!(matches!(err, CheckError::Persistence(RepoError::Db(_))));
    assert!(!err.is_invalid_input());
    assert_eq!(store.inserts.get(), 1);
}

#[test]
fn failed_write_on_first_of_cycle_is_a_persistence_error() {
    let mut store = ScriptedStore::new(Vec::new());
    store.insert_error = Some(read_back_mismatch);
    let service = DuplicateCheckService::with_clock(&store, CyclePolicy::default(), november_2024());

    let err = service
        .check_similarity(&SubmissionCandidate::new("AI Tutor", "helps students learn"))
        .unwrap_err();
    assert!(matches!(err, CheckError::Persistence(_)));
}

#[test]
fn title_conflict_at_insert_is_surfaced_as_duplicate_title() {
    let mut store = ScriptedStore::new(Vec::new());
    store.insert_error = Some(title_taken);
    let service = DuplicateCheckService::with_clock(&store, CyclePolicy::default(), november_2024());

    let err = service
        .check_similarity(&SubmissionCandidate::new("AI Tutor", "helps students learn"))
        .unwrap_err();
    assert!(matches!(
        err,
        CheckError::DuplicateTitle { ref title, cycle: 2025 } if title == "AI Tutor"
    ));
}

#[test]
fn near_duplicate_does_not_touch_the_store_write_path() {
    let store = ScriptedStore::new(vec![corpus_entry("AI Tutor", "helps students learn", 2025)]);
    let service = DuplicateCheckService::with_clock(&store, CyclePolicy::default(), november_2024());

    let outcome = service
        .check_similarity(&SubmissionCandidate::new("AI Tutor", "helps students learn"))
        .unwrap();
    assert!(matches!(outcome, DuplicateCheckOutcome::NearDuplicateFound { .. }));
    assert_eq!(store.inserts.get(), 0);
}

#[test]
fn rollover_policy_controls_the_cycle_used() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteProjectStore::try_new(&conn).unwrap();
    seed(&store, "AI Tutor", "helps students learn", 2025);
    let policy: CyclePolicy = "12".parse().unwrap();
    let service = DuplicateCheckService::with_clock(&store, policy, november_2024());

    assert_eq!(service.current_cycle(), 2024);
    let outcome = service
        .check_similarity(&SubmissionCandidate::new("AI Tutor", "helps students learn"))
        .unwrap();
    assert!(matches!(
        outcome,
        DuplicateCheckOutcome::FirstOfCycle { cycle: 2024, .. }
    ));
}

#[test]
fn stale_corpus_snapshot_lets_near_identical_submissions_both_pass() {
    // Fetch and insert are not atomic: a check that read the corpus before
    // another submission landed accepts its own near-identical project.
    let conn = open_db_in_memory().unwrap();
    let store = SqliteProjectStore::try_new(&conn).unwrap();
    let snapshot = store.fetch_cycle_corpus(2025).unwrap();
    assert!(snapshot.is_empty());

    let first = DuplicateCheckService::with_clock(&store, CyclePolicy::default(), november_2024())
        .check_similarity(&SubmissionCandidate::new("AI Tutor", "helps students learn"))
        .unwrap();

    let stale = StaleSnapshotStore {
        snapshot,
        live: &store,
    };
    let second = DuplicateCheckService::with_clock(&stale, CyclePolicy::default(), november_2024())
        .check_similarity(&SubmissionCandidate::new(
            "AI Tutoring System",
            "helps students learn",
        ))
        .unwrap();

    assert!(matches!(first, DuplicateCheckOutcome::FirstOfCycle { .. }));
    assert!(matches!(second, DuplicateCheckOutcome::FirstOfCycle { .. }));

    let titles = store
        .fetch_cycle_corpus(2025)
        .unwrap()
        .into_iter()
        .map(|entry| entry.title)
        .collect::<Vec<_>>();
    assert_eq!(titles, vec!["AI Tutor", "AI Tutoring System"]);

    // A fresh read of the same corpus does flag the pair.
    let recheck = DuplicateCheckService::with_clock(&store, CyclePolicy::default(), november_2024())
        .check_similarity(&SubmissionCandidate::new(
            "AI Tutoring Platform",
            "helps students learn",
        ))
        .unwrap();
    assert!(matches!(
        recheck,
        DuplicateCheckOutcome::NearDuplicateFound { .. }
    ));
}

#[test]
fn blank_corpus_text_from_store_propagates_engine_error() {
    let store = ScriptedStore::new(vec![corpus_entry(" ", " ", 2025)]);
    let service = DuplicateCheckService::with_clock(&store, CyclePolicy::default(), november_2024());

    let err = service
        .check_similarity(&SubmissionCandidate::new("AI Tutor", "helps students learn"))
        .unwrap_err();

    assert!(matches!(
        err,
        CheckError::InvalidText(SimilarityError::EmptyText {
            corpus_index: Some(0)
        })
    ));
    assert!(err.is_invalid_input());
    assert_eq!(store.fetches.get(), 1);
    assert_eq!(store.inserts.get(), 0);
}

#[test]
fn failed_corpus_read_is_reported_and_writes_nothing() {
    let mut store = ScriptedStore::new(Vec::new());
    store.fetch_error = Some(locked_database);
    let service = DuplicateCheckService::with_clock(&store, CyclePolicy::default(), november_2024());

    let err = service
        .check_similarity(&SubmissionCandidate::new("AI Tutor", "helps students learn"))
        .unwrap_err();

    assert!(matches!(
        err,
        CheckError::CorpusFetch(RepoError::InvalidData(_))
    ));
    assert!(!err.is_invalid_input());
    assert_eq!(store.fetches.get(), 1);
    assert_eq!(store.inserts.get(), 0);

    let list_err = service.cycle_corpus(2025).unwrap_err();
    assert!(matches!(list_err, CheckError::CorpusFetch(_)));
}
