//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the meeting storage contract the scheduling service depends on.
//! - Isolate SQLite query details from scheduling orchestration.
//!
//! # Invariants
//! - Repository writes must enforce `Meeting::validate()` before persistence.
//! - Repository APIs return semantic errors (`NotFound`) in addition to DB
//!   transport errors.

pub mod meeting_repo;
