//! Reusable workout plans.
//!
//! # Invariants
//! - `name` is non-blank.
//! - Every `TemplateExercise` has a unique `position` and targets of at least
//!   one set and one rep.

use super::exercise::ExerciseId;
use super::validation::{require_range, require_text, ModelValidationError};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

pub type TemplateId = Uuid;

/// Named plan of exercises with target sets and reps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutTemplate {
    pub id: TemplateId,
    pub name: String,
    pub description: Option<String>,
    /// Ordered by `position` ascending.
    pub exercises: Vec<TemplateExercise>,
    pub times_used: u32,
    pub last_used_at: Option<i64>,
    pub created_at: i64,
}

/// One planned exercise inside a template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateExercise {
    pub exercise_id: ExerciseId,
    pub position: u32,
    pub target_sets: u32,
    pub target_reps: u32,
    pub target_weight_kg: Option<f64>,
    pub rest_seconds: Option<u32>,
}

impl WorkoutTemplate {
    pub fn new(name: impl Into<String>, created_at: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into().trim().to_string(),
            description: None,
            exercises: Vec::new(),
            times_used: 0,
            last_used_at: None,
            created_at,
        }
    }

    /// Appends an exercise at the next free position.
    pub fn push_exercise(
        &mut self,
        exercise_id: ExerciseId,
        target_sets: u32,
        target_reps: u32,
        target_weight_kg: Option<f64>,
    ) {
        let position = self
            .exercises
            .iter()
            .map(|row| row.position + 1)
            .max()
            .unwrap_or(0);
        self.exercises.push(TemplateExercise {
            exercise_id,
            position,
            target_sets,
            target_reps,
            target_weight_kg,
            rest_seconds: None,
        });
    }

    pub fn validate(&self) -> Result<(), ModelValidationError> {
        require_text("template name", &self.name)?;
        let mut seen = HashSet::new();
        for row in &self.exercises {
            if !seen.insert(row.position) {
                return Err(ModelValidationError::DuplicatePosition(row.position));
            }
            require_range("target_sets", f64::from(row.target_sets), 1.0, 100.0)?;
            require_range("target_reps", f64::from(row.target_reps), 1.0, 1_000.0)?;
            if let Some(weight) = row.target_weight_kg {
                require_range("target_weight_kg", weight, 0.0, 2_000.0)?;
            }
        }
        Ok(())
    }

    /// Sum of planned sets across all exercises.
    pub fn planned_set_count(&self) -> u32 {
        self.exercises.iter().map(|row| row.target_sets).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_exercise_assigns_sequential_positions() {
        let mut template = WorkoutTemplate::new("Legs", 0);
        template.push_exercise(Uuid::new_v4(), 3, 5, Some(100.0));
        template.push_exercise(Uuid::new_v4(), 4, 10, None);
        let positions: Vec<u32> = template.exercises.iter().map(|row| row.position).collect();
        assert_eq!(positions, vec![0, 1]);
        assert_eq!(template.planned_set_count(), 7);
        assert!(template.validate().is_ok());
    }

    #[test]
    fn validation_rejects_zero_targets_and_duplicate_positions() {
        let mut template = WorkoutTemplate::new("Pull", 0);
        template.push_exercise(Uuid::new_v4(), 0, 5, None);
        assert!(template.validate().is_err());

        template.exercises[0].target_sets = 3;
        template.push_exercise(Uuid::new_v4(), 3, 5, None);
        template.exercises[1].position = 0;
        assert_eq!(
            template.validate().unwrap_err(),
            ModelValidationError::DuplicatePosition(0)
        );
    }
}
