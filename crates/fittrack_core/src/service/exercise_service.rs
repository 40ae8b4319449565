//! Exercise catalog use-cases.
//!
//! # Responsibility
//! - Create custom exercises with case-insensitive unique names.
//! - Search and archive catalog entries.
//! - Seed the built-in catalog into an empty database.
//!
//! # Invariants
//! - Seeding runs only when the catalog table is empty.
//! - Built-in entries are stored with `is_custom = false`.

use crate::model::exercise::{
    Equipment, Equipment as Eqp, Exercise, ExerciseCategory, ExerciseCategory as Cat, ExerciseId,
    MuscleGroup, MuscleGroup as Mg,
};
use crate::repo::exercise_repo::{ExerciseListQuery, ExerciseRepository};
use crate::repo::RepoError;
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Built-in catalog entries: name, category, muscle groups, equipment.
const DEFAULT_CATALOG: &[(&str, ExerciseCategory, &[MuscleGroup], Equipment)] = &[
    ("Barbell Bench Press", Cat::Strength, &[Mg::Chest, Mg::Triceps, Mg::Shoulders], Eqp::Barbell),
    ("Incline Dumbbell Press", Cat::Strength, &[Mg::Chest, Mg::Shoulders], Eqp::Dumbbell),
    ("Push-Up", Cat::Bodyweight, &[Mg::Chest, Mg::Triceps], Eqp::Bodyweight),
    ("Barbell Back Squat", Cat::Strength, &[Mg::Quads, Mg::Glutes], Eqp::Barbell),
    ("Front Squat", Cat::Strength, &[Mg::Quads, Mg::Core], Eqp::Barbell),
    ("Leg Press", Cat::Strength, &[Mg::Quads, Mg::Glutes], Eqp::Machine),
    ("Deadlift", Cat::Strength, &[Mg::Back, Mg::Hamstrings, Mg::Glutes], Eqp::Barbell),
    ("Romanian Deadlift", Cat::Strength, &[Mg::Hamstrings, Mg::Glutes], Eqp::Barbell),
    ("Overhead Press", Cat::Strength, &[Mg::Shoulders, Mg::Triceps], Eqp::Barbell),
    ("Lateral Raise", Cat::Strength, &[Mg::Shoulders], Eqp::Dumbbell),
    ("Pull-Up", Cat::Bodyweight, &[Mg::Back, Mg::Biceps], Eqp::Bodyweight),
    ("Barbell Row", Cat::Strength, &[Mg::Back, Mg::Biceps], Eqp::Barbell),
    ("Lat Pulldown", Cat::Strength, &[Mg::Back, Mg::Biceps], Eqp::Cable),
    ("Seated Cable Row", Cat::Strength, &[Mg::Back], Eqp::Cable),
    ("Barbell Curl", Cat::Strength, &[Mg::Biceps, Mg::Forearms], Eqp::Barbell),
    ("Triceps Pushdown", Cat::Strength, &[Mg::Triceps], Eqp::Cable),
    ("Standing Calf Raise", Cat::Strength, &[Mg::Calves], Eqp::Machine),
    ("Plank", Cat::Bodyweight, &[Mg::Core], Eqp::Bodyweight),
    ("Kettlebell Swing", Cat::Strength, &[Mg::Glutes, Mg::Hamstrings, Mg::FullBody], Eqp::Kettlebell),
    ("Running", Cat::Cardio, &[Mg::Cardio], Eqp::Other),
    ("Rowing Machine", Cat::Cardio, &[Mg::Cardio, Mg::FullBody], Eqp::Machine),
    ("Hamstring Stretch", Cat::Flexibility, &[Mg::Hamstrings], Eqp::Bodyweight),
];

/// Service error for exercise catalog use-cases.
#[derive(Debug)]
pub enum ExerciseServiceError {
    ExerciseNotFound(ExerciseId),
    /// Another exercise already uses this name (case-insensitive).
    DuplicateName(String),
    Repo(RepoError),
}

impl Display for ExerciseServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ExerciseNotFound(id) => write!(f, "exercise not found: {id}"),
            Self::DuplicateName(name) => write!(f, "exercise `{name}` already exists"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ExerciseServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for ExerciseServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound { id, .. } => Self::ExerciseNotFound(id),
            other => Self::Repo(other),
        }
    }
}

/// Exercise service facade over a catalog repository.
pub struct ExerciseService<R: ExerciseRepository> {
    repo: R,
}

impl<R: ExerciseRepository> ExerciseService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Creates a custom exercise. Names are trimmed and must be unique.
    pub fn create_exercise(
        &self,
        name: &str,
        category: ExerciseCategory,
        muscle_groups: Vec<MuscleGroup>,
        equipment: Equipment,
    ) -> Result<Exercise, ExerciseServiceError> {
        let exercise = Exercise::new(name, category, muscle_groups, equipment);
        if self.repo.find_by_name(&exercise.name)?.is_some() {
            return Err(ExerciseServiceError::DuplicateName(exercise.name));
        }
        self.repo.create_exercise(&exercise).map_err(|err| match err {
            RepoError::Conflict(_) => ExerciseServiceError::DuplicateName(exercise.name.clone()),
            other => other.into(),
        })?;
        Ok(exercise)
    }

    pub fn get_exercise(&self, id: ExerciseId) -> Result<Exercise, ExerciseServiceError> {
        self.repo
            .get_exercise(id)?
            .ok_or(ExerciseServiceError::ExerciseNotFound(id))
    }

    pub fn find_by_name(&self, name: &str) -> Result<Option<Exercise>, ExerciseServiceError> {
        Ok(self.repo.find_by_name(name)?)
    }

    pub fn list_exercises(
        &self,
        query: &ExerciseListQuery,
    ) -> Result<Vec<Exercise>, ExerciseServiceError> {
        Ok(self.repo.list_exercises(query)?)
    }

    /// Case-insensitive substring search over active exercises.
    pub fn search(&self, text: &str) -> Result<Vec<Exercise>, ExerciseServiceError> {
        self.list_exercises(&ExerciseListQuery {
            name_contains: Some(text.to_string()),
            ..ExerciseListQuery::default()
        })
    }

    /// Hides an exercise from pickers. Logged history keeps referencing it.
    pub fn archive_exercise(&self, id: ExerciseId) -> Result<(), ExerciseServiceError> {
        Ok(self.repo.archive_exercise(id)?)
    }

    /// Seeds the built-in catalog when no exercises exist yet.
    ///
    /// Returns the number of inserted entries (0 when already seeded).
    pub fn ensure_default_catalog(&self) -> Result<u32, ExerciseServiceError> {
        if self.repo.count_exercises()? > 0 {
            return Ok(0);
        }

        let mut inserted = 0;
        for (name, category, groups, equipment) in DEFAULT_CATALOG {
            let mut exercise = Exercise::new(*name, *category, groups.to_vec(), *equipment);
            exercise.is_custom = false;
            self.repo.create_exercise(&exercise)?;
            inserted += 1;
        }
        info!("event=catalog_seed module=service status=ok inserted={inserted}");
        Ok(inserted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn default_catalog_names_are_unique_case_insensitively() {
        let mut seen = HashSet::new();
        for (name, ..) in DEFAULT_CATALOG {
            assert!(seen.insert(name.to_ascii_lowercase()), "duplicate {name}");
        }
    }

    #[test]
    fn default_catalog_entries_target_at_least_one_group() {
        assert!(DEFAULT_CATALOG.iter().all(|(_, _, groups, _)| !groups.is_empty()));
    }
}
