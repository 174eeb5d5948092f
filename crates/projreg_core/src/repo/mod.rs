//! Project store contracts and persistence implementations.
//!
//! # Responsibility
//! - Define the cycle-scoped corpus contract the duplicate check depends on.
//! - Isolate SQLite query details from the orchestration layer.
//!
//! # Invariants
//! - Store writes validate entries before SQL mutations.
//! - Title uniqueness per cycle is enforced here, never by callers.

pub mod corpus_repo;
