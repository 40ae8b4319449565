//! Fitness domain model.
//!
//! # Responsibility
//! - Define canonical records for workouts, exercises, sets, templates,
//!   routines, goals, profile and body-weight history.
//! - Own record-level validation rules shared by every write path.
//!
//! # Invariants
//! - Every persisted record except the profile singleton has a stable UUID.
//! - Timestamps are Unix epoch milliseconds.
//! - Weights are stored in kilograms regardless of the display unit.

pub mod exercise;
pub mod goal;
pub mod profile;
pub mod routine;
pub mod template;
pub mod validation;
pub mod workout;
