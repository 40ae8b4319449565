//! Core domain logic for FitTrack.
//! This crate is the single source of truth for training data invariants.

pub mod analytics;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod time;

pub use analytics::{AnalyticsService, DashboardSummary, Significance, TrendDirection};
pub use config::{ConfigError, CoreConfig};
pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use logging::{default_log_level, init_logging, init_logging_from_config, logging_status};
pub use model::exercise::{Equipment, Exercise, ExerciseCategory, ExerciseId, MuscleGroup};
pub use model::goal::{Goal, GoalId, GoalStatus, GoalType};
pub use model::profile::{UserProfile, WeightEntry, WeightUnit};
pub use model::template::{TemplateExercise, TemplateId, WorkoutTemplate};
pub use model::validation::ModelValidationError;
pub use model::workout::{
    ExerciseInstance, ExerciseSet, InstanceId, SetId, SetType, Workout, WorkoutId, WorkoutTotals,
};
pub use repo::{RepoError, RepoResult};
pub use service::workout_service::{LogSetRequest, WorkoutService, WorkoutServiceError};
pub use time::{now_epoch_ms, LocalCalendar, WeekStart};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
