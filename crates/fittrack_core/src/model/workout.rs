//! Workout session, exercise instance and set records.
//!
//! # Responsibility
//! - Define the logged-session hierarchy: `Workout` → `ExerciseInstance` →
//!   `ExerciseSet`.
//! - Provide per-set derived metrics (volume, estimated one-rep max).
//! - Compute workout aggregates from its sets.
//!
//! # Invariants
//! - `set_number` is 1-based and contiguous within one instance.
//! - `position` is 0-based and contiguous within one workout.
//! - Only completed, non-warmup sets contribute to aggregates and records.

use super::exercise::ExerciseId;
use super::template::TemplateId;
use super::validation::{require_range, require_text, ModelValidationError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type WorkoutId = Uuid;
pub type InstanceId = Uuid;
pub type SetId = Uuid;

const MAX_WEIGHT_KG: f64 = 2_000.0;
const MAX_REPS: u32 = 1_000;

/// One logged training session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workout {
    pub id: WorkoutId,
    pub name: String,
    pub started_at: i64,
    /// `None` while the session is in progress.
    pub ended_at: Option<i64>,
    pub notes: Option<String>,
    /// Sum of `weight_kg * reps` over counted sets. Written on finish.
    pub total_volume: f64,
    pub total_sets: u32,
    pub total_reps: u32,
    pub template_id: Option<TemplateId>,
}

impl Workout {
    pub fn new(name: impl Into<String>, started_at: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into().trim().to_string(),
            started_at,
            ended_at: None,
            notes: None,
            total_volume: 0.0,
            total_sets: 0,
            total_reps: 0,
            template_id: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.ended_at.is_none()
    }

    pub fn duration_ms(&self) -> Option<i64> {
        self.ended_at.map(|end| end - self.started_at)
    }

    pub fn validate(&self) -> Result<(), ModelValidationError> {
        require_text("workout name", &self.name)?;
        if let Some(ended_at) = self.ended_at {
            if ended_at < self.started_at {
                return Err(ModelValidationError::EndBeforeStart {
                    started_at: self.started_at,
                    ended_at,
                });
            }
        }
        Ok(())
    }

    pub fn apply_totals(&mut self, totals: WorkoutTotals) {
        self.total_volume = totals.volume;
        self.total_sets = totals.sets;
        self.total_reps = totals.reps;
    }

    pub fn totals(&self) -> WorkoutTotals {
        WorkoutTotals {
            volume: self.total_volume,
            sets: self.total_sets,
            reps: self.total_reps,
        }
    }
}

/// One exercise performed inside a workout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExerciseInstance {
    pub id: InstanceId,
    pub workout_id: WorkoutId,
    pub exercise_id: ExerciseId,
    pub position: u32,
    pub notes: Option<String>,
}

impl ExerciseInstance {
    pub fn new(workout_id: WorkoutId, exercise_id: ExerciseId, position: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            workout_id,
            exercise_id,
            position,
            notes: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SetType {
    Warmup,
    Working,
    Drop,
    Failure,
}

impl SetType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Warmup => "warmup",
            Self::Working => "working",
            Self::Drop => "drop",
            Self::Failure => "failure",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "warmup" => Some(Self::Warmup),
            "working" => Some(Self::Working),
            "drop" => Some(Self::Drop),
            "failure" => Some(Self::Failure),
            _ => None,
        }
    }
}

/// One logged set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseSet {
    pub id: SetId,
    pub instance_id: InstanceId,
    pub set_number: u32,
    pub weight_kg: f64,
    pub reps: u32,
    /// Rate of perceived exertion, 1.0..=10.0.
    pub rpe: Option<f64>,
    pub set_type: SetType,
    pub is_completed: bool,
    pub completed_at: Option<i64>,
}

impl ExerciseSet {
    /// Creates a planned (not yet completed) working set.
    pub fn planned(instance_id: InstanceId, set_number: u32, weight_kg: f64, reps: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            instance_id,
            set_number,
            weight_kg,
            reps,
            rpe: None,
            set_type: SetType::Working,
            is_completed: false,
            completed_at: None,
        }
    }

    pub fn validate(&self) -> Result<(), ModelValidationError> {
        require_range("weight_kg", self.weight_kg, 0.0, MAX_WEIGHT_KG)?;
        require_range("reps", f64::from(self.reps), 0.0, f64::from(MAX_REPS))?;
        if let Some(rpe) = self.rpe {
            require_range("rpe", rpe, 1.0, 10.0)?;
        }
        if self.set_number == 0 {
            return Err(ModelValidationError::OutOfRange {
                field: "set_number",
                value: 0.0,
                min: 1.0,
                max: f64::from(u32::MAX),
            });
        }
        Ok(())
    }

    pub fn complete(&mut self, at: i64) {
        self.is_completed = true;
        self.completed_at = Some(at);
    }

    pub fn volume(&self) -> f64 {
        self.weight_kg * f64::from(self.reps)
    }

    /// Epley estimate of the one-rep max for this set.
    pub fn estimated_one_rep_max(&self) -> f64 {
        match self.reps {
            0 => 0.0,
            1 => self.weight_kg,
            reps => self.weight_kg * (1.0 + f64::from(reps) / 30.0),
        }
    }

    /// Whether this set contributes to volume, totals and personal records.
    pub fn counts_toward_totals(&self) -> bool {
        self.is_completed && self.set_type != SetType::Warmup
    }
}

/// Aggregates derived from the counted sets of a workout.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct WorkoutTotals {
    pub volume: f64,
    pub sets: u32,
    pub reps: u32,
}

impl WorkoutTotals {
    pub fn from_sets<'a>(sets: impl IntoIterator<Item = &'a ExerciseSet>) -> Self {
        sets.into_iter()
            .filter(|set| set.counts_toward_totals())
            .fold(Self::default(), |acc, set| Self {
                volume: acc.volume + set.volume(),
                sets: acc.sets + 1,
                reps: acc.reps + set.reps,
            })
    }

    /// Compares totals with a small tolerance on floating volume.
    pub fn matches(&self, other: &Self) -> bool {
        self.sets == other.sets
            && self.reps == other.reps
            && (self.volume - other.volume).abs() < 0.01
    }
}
