//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts, one trait per aggregate.
//! - Isolate SQLite query details from service/business orchestration.
//!
//! # Invariants
//! - Write paths call the record's `validate()` before SQL mutations.
//! - Read paths reject invalid persisted state instead of masking it.
//! - Repository APIs return semantic errors (`NotFound`, `Conflict`) in
//!   addition to DB transport errors.

pub mod error;
pub mod exercise_repo;
pub mod goal_repo;
pub mod integrity;
pub mod profile_repo;
pub mod routine_repo;
mod sql;
pub mod template_repo;
pub mod workout_repo;

pub use error::{RepoError, RepoResult};
