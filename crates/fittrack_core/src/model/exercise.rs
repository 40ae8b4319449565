//! Exercise catalog model.
//!
//! # Responsibility
//! - Describe one catalog entry (name, category, muscle groups, equipment).
//! - Provide stable text codes used by storage and FFI payloads.
//!
//! # Invariants
//! - `name` is non-blank and unique case-insensitively across the catalog.
//! - Exercises referenced by history are archived, never hard-deleted.

use super::validation::{require_text, ModelValidationError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type ExerciseId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExerciseCategory {
    Strength,
    Cardio,
    Flexibility,
    Bodyweight,
}

impl ExerciseCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Strength => "strength",
            Self::Cardio => "cardio",
            Self::Flexibility => "flexibility",
            Self::Bodyweight => "bodyweight",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "strength" => Some(Self::Strength),
            "cardio" => Some(Self::Cardio),
            "flexibility" => Some(Self::Flexibility),
            "bodyweight" => Some(Self::Bodyweight),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MuscleGroup {
    Chest,
    Back,
    Shoulders,
    Biceps,
    Triceps,
    Forearms,
    Core,
    Quads,
    Hamstrings,
    Glutes,
    Calves,
    FullBody,
    Cardio,
}

impl MuscleGroup {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Chest => "chest",
            Self::Back => "back",
            Self::Shoulders => "shoulders",
            Self::Biceps => "biceps",
            Self::Triceps => "triceps",
            Self::Forearms => "forearms",
            Self::Core => "core",
            Self::Quads => "quads",
            Self::Hamstrings => "hamstrings",
            Self::Glutes => "glutes",
            Self::Calves => "calves",
            Self::FullBody => "full_body",
            Self::Cardio => "cardio",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "chest" => Some(Self::Chest),
            "back" => Some(Self::Back),
            "shoulders" => Some(Self::Shoulders),
            "biceps" => Some(Self::Biceps),
            "triceps" => Some(Self::Triceps),
            "forearms" => Some(Self::Forearms),
            "core" => Some(Self::Core),
            "quads" => Some(Self::Quads),
            "hamstrings" => Some(Self::Hamstrings),
            "glutes" => Some(Self::Glutes),
            "calves" => Some(Self::Calves),
            "full_body" => Some(Self::FullBody),
            "cardio" => Some(Self::Cardio),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Equipment {
    Barbell,
    Dumbbell,
    Machine,
    Cable,
    Kettlebell,
    Bodyweight,
    Band,
    Other,
}

impl Equipment {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Barbell => "barbell",
            Self::Dumbbell => "dumbbell",
            Self::Machine => "machine",
            Self::Cable => "cable",
            Self::Kettlebell => "kettlebell",
            Self::Bodyweight => "bodyweight",
            Self::Band => "band",
            Self::Other => "other",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "barbell" => Some(Self::Barbell),
            "dumbbell" => Some(Self::Dumbbell),
            "machine" => Some(Self::Machine),
            "cable" => Some(Self::Cable),
            "kettlebell" => Some(Self::Kettlebell),
            "bodyweight" => Some(Self::Bodyweight),
            "band" => Some(Self::Band),
            "other" => Some(Self::Other),
            _ => None,
        }
    }
}

/// Catalog entry that workouts and templates reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exercise {
    pub id: ExerciseId,
    pub name: String,
    pub category: ExerciseCategory,
    /// Primary muscle groups, deduplicated and sorted.
    pub muscle_groups: Vec<MuscleGroup>,
    pub equipment: Equipment,
    /// `true` for user-created entries, `false` for the built-in catalog.
    pub is_custom: bool,
    /// Hidden from pickers but still resolvable from history.
    pub is_archived: bool,
}

impl Exercise {
    /// Creates a custom exercise with a generated ID.
    pub fn new(
        name: impl Into<String>,
        category: ExerciseCategory,
        muscle_groups: Vec<MuscleGroup>,
        equipment: Equipment,
    ) -> Self {
        let mut muscle_groups = muscle_groups;
        muscle_groups.sort();
        muscle_groups.dedup();
        Self {
            id: Uuid::new_v4(),
            name: name.into().trim().to_string(),
            category,
            muscle_groups,
            equipment,
            is_custom: true,
            is_archived: false,
        }
    }

    pub fn validate(&self) -> Result<(), ModelValidationError> {
        require_text("exercise name", &self.name)
    }

    pub fn targets(&self, group: MuscleGroup) -> bool {
        self.muscle_groups.contains(&group)
    }
}

/// Encodes muscle groups into the comma-separated storage form.
pub fn encode_muscle_groups(groups: &[MuscleGroup]) -> String {
    groups
        .iter()
        .map(|group| group.as_str())
        .collect::<Vec<_>>()
        .join(",")
}

/// Decodes the comma-separated storage form. Returns the first unknown code on
/// failure.
pub fn decode_muscle_groups(value: &str) -> Result<Vec<MuscleGroup>, String> {
    let mut groups = Vec::new();
    for code in value.split(',').map(str::trim).filter(|code| !code.is_empty()) {
        groups.push(MuscleGroup::parse(code).ok_or_else(|| code.to_string())?);
    }
    Ok(groups)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_exercise_sorts_and_dedups_muscle_groups() {
        let exercise = Exercise::new(
            "  Bench Press ",
            ExerciseCategory::Strength,
            vec![MuscleGroup::Triceps, MuscleGroup::Chest, MuscleGroup::Triceps],
            Equipment::Barbell,
        );
        assert_eq!(exercise.name, "Bench Press");
        assert_eq!(
            exercise.muscle_groups,
            vec![MuscleGroup::Chest, MuscleGroup::Triceps]
        );
        assert!(exercise.is_custom);
    }

    #[test]
    fn muscle_group_codes_survive_storage_encoding() {
        let encoded = encode_muscle_groups(&[MuscleGroup::FullBody, MuscleGroup::Core]);
        assert_eq!(encoded, "full_body,core");
        assert_eq!(
            decode_muscle_groups(&encoded).unwrap(),
            vec![MuscleGroup::FullBody, MuscleGroup::Core]
        );
        assert_eq!(decode_muscle_groups("").unwrap(), Vec::new());
        assert_eq!(decode_muscle_groups("chest,wings").unwrap_err(), "wings");
    }

    #[test]
    fn blank_name_fails_validation() {
        let exercise = Exercise::new(" ", ExerciseCategory::Cardio, vec![], Equipment::Other);
        assert_eq!(
            exercise.validate().unwrap_err(),
            ModelValidationError::BlankField("exercise name")
        );
    }
}
