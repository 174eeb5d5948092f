//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate cycle resolution, store access and similarity scoring.
//! - Keep CLI and other drivers decoupled from storage details.

pub mod duplicate_check_service;
