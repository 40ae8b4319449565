//! User goals with progress tracking.
//!
//! # Invariants
//! - `PersonalRecord` goals always carry an `exercise_id`.
//! - A goal whose `target_value` is below `start_value` progresses downward
//!   (for example a body-weight loss goal).
//! - `completed_at` is set exactly when `status == Completed`.

use super::exercise::ExerciseId;
use super::validation::{require_text, ModelValidationError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type GoalId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalType {
    /// Heaviest completed working set on one exercise, in kg.
    PersonalRecord,
    /// Latest logged body weight, in kg.
    BodyWeight,
    /// Workouts finished in the current week.
    Consistency,
    /// Training volume in the current week, in kg.
    Volume,
}

impl GoalType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PersonalRecord => "personal_record",
            Self::BodyWeight => "body_weight",
            Self::Consistency => "consistency",
            Self::Volume => "volume",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "personal_record" => Some(Self::PersonalRecord),
            "body_weight" => Some(Self::BodyWeight),
            "consistency" => Some(Self::Consistency),
            "volume" => Some(Self::Volume),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalStatus {
    Active,
    Completed,
    Abandoned,
}

impl GoalStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Abandoned => "abandoned",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "active" => Some(Self::Active),
            "completed" => Some(Self::Completed),
            "abandoned" => Some(Self::Abandoned),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    pub id: GoalId,
    pub title: String,
    pub goal_type: GoalType,
    pub exercise_id: Option<ExerciseId>,
    /// Value when the goal was created; anchors progress.
    pub start_value: f64,
    pub target_value: f64,
    pub current_value: f64,
    pub deadline: Option<i64>,
    pub status: GoalStatus,
    pub created_at: i64,
    pub completed_at: Option<i64>,
}

impl Goal {
    pub fn new(
        title: impl Into<String>,
        goal_type: GoalType,
        start_value: f64,
        target_value: f64,
        created_at: i64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into().trim().to_string(),
            goal_type,
            exercise_id: None,
            start_value,
            target_value,
            current_value: start_value,
            deadline: None,
            status: GoalStatus::Active,
            created_at,
            completed_at: None,
        }
    }

    pub fn validate(&self) -> Result<(), ModelValidationError> {
        require_text("goal title", &self.title)?;
        if self.goal_type == GoalType::PersonalRecord && self.exercise_id.is_none() {
            return Err(ModelValidationError::MissingExercise);
        }
        for (field, value) in [
            ("start_value", self.start_value),
            ("target_value", self.target_value),
            ("current_value", self.current_value),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ModelValidationError::OutOfRange {
                    field,
                    value,
                    min: 0.0,
                    max: f64::MAX,
                });
            }
        }
        Ok(())
    }

    pub fn is_decreasing(&self) -> bool {
        self.target_value < self.start_value
    }

    pub fn is_reached(&self) -> bool {
        if self.is_decreasing() {
            self.current_value <= self.target_value
        } else {
            self.current_value >= self.target_value
        }
    }

    /// Progress from `start_value` toward `target_value`, clamped to 0..=100.
    pub fn progress_percent(&self) -> f64 {
        let span = self.target_value - self.start_value;
        if span.abs() < f64::EPSILON {
            return if self.is_reached() { 100.0 } else { 0.0 };
        }
        ((self.current_value - self.start_value) / span * 100.0).clamp(0.0, 100.0)
    }

    /// Records a new measurement; completes the goal when the target is reached.
    ///
    /// Returns `true` when this call transitioned the goal to `Completed`.
    pub fn record_progress(&mut self, value: f64, at: i64) -> bool {
        if self.status != GoalStatus::Active {
            return false;
        }
        self.current_value = value;
        if self.is_reached() {
            self.status = GoalStatus::Completed;
            self.completed_at = Some(at);
            return true;
        }
        false
    }

    pub fn abandon(&mut self) {
        self.status = GoalStatus::Abandoned;
        self.completed_at = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn increasing_goal_progress_is_clamped() {
        let mut goal = Goal::new("Bench 100", GoalType::Volume, 60.0, 100.0, 0);
        goal.current_value = 80.0;
        assert!((goal.progress_percent() - 50.0).abs() < 1e-9);
        goal.current_value = 40.0;
        assert_eq!(goal.progress_percent(), 0.0);
        goal.current_value = 120.0;
        assert_eq!(goal.progress_percent(), 100.0);
    }

    #[test]
    fn weight_loss_goal_progresses_downward() {
        let mut goal = Goal::new("Cut", GoalType::BodyWeight, 90.0, 80.0, 0);
        assert!(goal.is_decreasing());
        assert!(!goal.record_progress(85.0, 10));
        assert!((goal.progress_percent() - 50.0).abs() < 1e-9);
        assert!(goal.record_progress(79.5, 20));
        assert_eq!(goal.status, GoalStatus::Completed);
        assert_eq!(goal.completed_at, Some(20));
    }

    #[test]
    fn personal_record_goal_requires_exercise() {
        let goal = Goal::new("Squat 140", GoalType::PersonalRecord, 100.0, 140.0, 0);
        assert_eq!(goal.validate().unwrap_err(), ModelValidationError::MissingExercise);
    }

    #[test]
    fn inactive_goals_ignore_progress() {
        let mut goal = Goal::new("3x week", GoalType::Consistency, 0.0, 3.0, 0);
        goal.abandon();
        assert!(!goal.record_progress(5.0, 1));
        assert_eq!(goal.current_value, 0.0);
    }
}
