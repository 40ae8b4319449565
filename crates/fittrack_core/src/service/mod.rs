//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Keep UI/FFI layers decoupled from storage details.
//!
//! # Invariants
//! - Services take explicit timestamps so callers own the clock.
//! - Each service maps repository misses into its own `*NotFound` errors.

pub mod exercise_service;
pub mod goal_service;
pub mod profile_service;
pub mod routine_service;
pub mod set_entry;
pub mod template_service;
pub mod workout_service;
