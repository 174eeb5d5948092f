//! Domain model for project submissions and per-cycle corpus records.
//!
//! # Responsibility
//! - Define the plain values exchanged between store, engine and service.
//! - Keep store row representations out of the duplicate-check logic.
//!
//! # Invariants
//! - Titles are unique within one cycle (enforced by the store).
//! - Persisted entries are never mutated by the duplicate check.

pub mod corpus_entry;
