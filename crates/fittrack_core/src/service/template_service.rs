//! Workout template use-cases and the portable template document.
//!
//! # Responsibility
//! - CRUD over templates with exercise existence checks.
//! - Capture a logged workout as a template.
//! - Export/import templates as JSON keyed by exercise name so documents
//!   move between installations.
//!
//! # Invariants
//! - Imported templates always receive fresh IDs and zero usage.
//! - Unknown exercise names on import become custom exercises.
//! - An import writes its new exercises and the template together or
//!   leaves the store untouched.
//! - Documents carry `format = "fittrack.template"` and `version = 1`.

use crate::model::exercise::{Equipment, Exercise, ExerciseCategory, ExerciseId, MuscleGroup};
use crate::model::template::{TemplateId, WorkoutTemplate};
use crate::model::validation::ModelValidationError;
use crate::model::workout::{SetType, WorkoutId};
use crate::repo::exercise_repo::ExerciseRepository;
use crate::repo::template_repo::TemplateRepository;
use crate::repo::workout_repo::WorkoutRepository;
use crate::repo::RepoError;
use log::info;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub const TEMPLATE_DOCUMENT_FORMAT: &str = "fittrack.template";
pub const TEMPLATE_DOCUMENT_VERSION: u32 = 1;

#[derive(Debug)]
pub enum TemplateServiceError {
    TemplateNotFound(TemplateId),
    WorkoutNotFound(WorkoutId),
    ExerciseNotFound(ExerciseId),
    /// JSON could not be parsed or has the wrong `format`.
    InvalidDocument(String),
    UnsupportedVersion(u32),
    Validation(ModelValidationError),
    Repo(RepoError),
}

impl Display for TemplateServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TemplateNotFound(id) => write!(f, "template not found: {id}"),
            Self::WorkoutNotFound(id) => write!(f, "workout not found: {id}"),
            Self::ExerciseNotFound(id) => write!(f, "exercise not found: {id}"),
            Self::InvalidDocument(details) => write!(f, "invalid template document: {details}"),
            Self::UnsupportedVersion(version) => {
                write!(f, "unsupported template document version {version}")
            }
            Self::Validation(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for TemplateServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for TemplateServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound {
                entity: "template",
                id,
            } => Self::TemplateNotFound(id),
            RepoError::NotFound {
                entity: "workout",
                id,
            } => Self::WorkoutNotFound(id),
            RepoError::Validation(err) => Self::Validation(err),
            other => Self::Repo(other),
        }
    }
}

impl From<ModelValidationError> for TemplateServiceError {
    fn from(value: ModelValidationError) -> Self {
        Self::Validation(value)
    }
}

/// Portable template document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateDocument {
    pub format: String,
    pub version: u32,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub exercises: Vec<TemplateDocumentExercise>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateDocumentExercise {
    pub exercise: String,
    #[serde(default = "default_category")]
    pub category: ExerciseCategory,
    #[serde(default)]
    pub muscle_groups: Vec<MuscleGroup>,
    #[serde(default = "default_equipment")]
    pub equipment: Equipment,
    pub sets: u32,
    pub reps: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight_kg: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rest_seconds: Option<u32>,
}

fn default_category() -> ExerciseCategory {
    ExerciseCategory::Strength
}

fn default_equipment() -> Equipment {
    Equipment::Other
}

/// One template row for create/update input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TemplateExerciseInput {
    pub exercise_id: ExerciseId,
    pub target_sets: u32,
    pub target_reps: u32,
    pub target_weight_kg: Option<f64>,
}

/// Template service facade over template and exercise repositories.
pub struct TemplateService<T: TemplateRepository, E: ExerciseRepository> {
    templates: T,
    exercises: E,
}

impl<T: TemplateRepository, E: ExerciseRepository> TemplateService<T, E> {
    pub fn new(templates: T, exercises: E) -> Self {
        Self {
            templates,
            exercises,
        }
    }

    pub fn create_template(
        &self,
        name: &str,
        description: Option<&str>,
        rows: &[TemplateExerciseInput],
        created_at: i64,
    ) -> Result<WorkoutTemplate, TemplateServiceError> {
        let mut template = WorkoutTemplate::new(name, created_at);
        template.description = normalize_description(description);
        self.fill_rows(&mut template, rows)?;
        self.templates.create_template(&template)?;
        Ok(template)
    }

    /// Replaces name, description and exercise rows of a template.
    pub fn update_template(
        &self,
        id: TemplateId,
        name: &str,
        description: Option<&str>,
        rows: &[TemplateExerciseInput],
    ) -> Result<WorkoutTemplate, TemplateServiceError> {
        let mut template = self.get_template(id)?;
        template.name = name.trim().to_string();
        template.description = normalize_description(description);
        template.exercises.clear();
        self.fill_rows(&mut template, rows)?;
        self.templates.update_template(&template)?;
        Ok(template)
    }

    pub fn get_template(&self, id: TemplateId) -> Result<WorkoutTemplate, TemplateServiceError> {
        self.templates
            .get_template(id)?
            .ok_or(TemplateServiceError::TemplateNotFound(id))
    }

    pub fn list_templates(&self) -> Result<Vec<WorkoutTemplate>, TemplateServiceError> {
        Ok(self.templates.list_templates()?)
    }

    pub fn delete_template(&self, id: TemplateId) -> Result<(), TemplateServiceError> {
        Ok(self.templates.delete_template(id)?)
    }

    /// Captures the exercises of a logged workout as a new template.
    ///
    /// Targets come from non-warmup sets: set count, highest reps and
    /// heaviest load per exercise.
    pub fn save_workout_as_template<W: WorkoutRepository>(
        &self,
        workouts: &W,
        workout_id: WorkoutId,
        name: &str,
        created_at: i64,
    ) -> Result<WorkoutTemplate, TemplateServiceError> {
        if workouts.get_workout(workout_id)?.is_none() {
            return Err(TemplateServiceError::WorkoutNotFound(workout_id));
        }

        let mut template = WorkoutTemplate::new(name, created_at);
        for instance in workouts.list_instances(workout_id)? {
            let sets: Vec<_> = workouts
                .list_sets(instance.id)?
                .into_iter()
                .filter(|set| set.set_type != SetType::Warmup)
                .collect();
            let target_sets = u32::try_from(sets.len()).unwrap_or(u32::MAX).max(1);
            let target_reps = sets.iter().map(|set| set.reps).max().unwrap_or(1).max(1);
            let heaviest = sets.iter().map(|set| set.weight_kg).fold(0.0, f64::max);
            template.push_exercise(
                instance.exercise_id,
                target_sets,
                target_reps,
                (heaviest > 0.0).then_some(heaviest),
            );
        }

        self.templates.create_template(&template)?;
        info!(
            "event=template_capture module=service status=ok template_id={} exercises={}",
            template.id,
            template.exercises.len()
        );
        Ok(template)
    }

    /// Serializes a template into the portable JSON document.
    pub fn export_json(&self, id: TemplateId) -> Result<String, TemplateServiceError> {
        let template = self.get_template(id)?;
        let mut rows = template.exercises.clone();
        rows.sort_by_key(|row| row.position);

        let mut exercises = Vec::with_capacity(rows.len());
        for row in rows {
            let exercise = self
                .exercises
                .get_exercise(row.exercise_id)?
                .ok_or(TemplateServiceError::ExerciseNotFound(row.exercise_id))?;
            exercises.push(TemplateDocumentExercise {
                exercise: exercise.name,
                category: exercise.category,
                muscle_groups: exercise.muscle_groups,
                equipment: exercise.equipment,
                sets: row.target_sets,
                reps: row.target_reps,
                weight_kg: row.target_weight_kg,
                rest_seconds: row.rest_seconds,
            });
        }

        let document = TemplateDocument {
            format: TEMPLATE_DOCUMENT_FORMAT.to_string(),
            version: TEMPLATE_DOCUMENT_VERSION,
            name: template.name,
            description: template.description,
            exercises,
        };
        serde_json::to_string_pretty(&document)
            .map_err(|err| TemplateServiceError::InvalidDocument(err.to_string()))
    }

    /// Creates a new template from a portable JSON document.
    pub fn import_json(
        &self,
        json: &str,
        created_at: i64,
    ) -> Result<WorkoutTemplate, TemplateServiceError> {
        let document: TemplateDocument = serde_json::from_str(json)
            .map_err(|err| TemplateServiceError::InvalidDocument(err.to_string()))?;
        if document.format != TEMPLATE_DOCUMENT_FORMAT {
            return Err(TemplateServiceError::InvalidDocument(format!(
                "unexpected format `{}`",
                document.format
            )));
        }
        if document.version != TEMPLATE_DOCUMENT_VERSION {
            return Err(TemplateServiceError::UnsupportedVersion(document.version));
        }

        let mut template = WorkoutTemplate::new(document.name, created_at);
        template.description = normalize_description(document.description.as_deref());

        // Resolve and validate every row before the first write.
        let mut new_exercises: Vec<Exercise> = Vec::new();
        for row in document.exercises {
            let exercise_id = match self.exercises.find_by_name(&row.exercise)? {
                Some(existing) => existing.id,
                None => {
                    let name = row.exercise.trim();
                    let pending_id = new_exercises
                        .iter()
                        .find(|pending| pending.name.eq_ignore_ascii_case(name))
                        .map(|pending| pending.id);
                    match pending_id {
                        Some(id) => id,
                        None => {
                            let exercise = Exercise::new(
                                row.exercise,
                                row.category,
                                row.muscle_groups,
                                row.equipment,
                            );
                            exercise.validate()?;
                            let id = exercise.id;
                            new_exercises.push(exercise);
                            id
                        }
                    }
                }
            };
            template.push_exercise(exercise_id, row.sets, row.reps, row.weight_kg);
            if let Some(last) = template.exercises.last_mut() {
                last.rest_seconds = row.rest_seconds;
            }
        }
        template.validate()?;

        self.templates.atomically(|| {
            for exercise in &new_exercises {
                self.exercises.create_exercise(exercise)?;
            }
            self.templates.create_template(&template)?;
            Ok::<_, TemplateServiceError>(())
        })?;
        info!(
            "event=template_import module=service status=ok template_id={} created_exercises={}",
            template.id,
            new_exercises.len()
        );
        Ok(template)
    }

    fn fill_rows(
        &self,
        template: &mut WorkoutTemplate,
        rows: &[TemplateExerciseInput],
    ) -> Result<(), TemplateServiceError> {
        for row in rows {
            if self.exercises.get_exercise(row.exercise_id)?.is_none() {
                return Err(TemplateServiceError::ExerciseNotFound(row.exercise_id));
            }
            template.push_exercise(
                row.exercise_id,
                row.target_sets,
                row.target_reps,
                row.target_weight_kg,
            );
        }
        Ok(())
    }
}

fn normalize_description(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_defaults_fill_optional_exercise_fields() {
        let json = r#"{
            "format": "fittrack.template",
            "version": 1,
            "name": "Push",
            "exercises": [{ "exercise": "Dips", "sets": 3, "reps": 8 }]
        }"#;
        let document: TemplateDocument = serde_json::from_str(json).unwrap();
        let row = &document.exercises[0];
        assert_eq!(row.category, ExerciseCategory::Strength);
        assert_eq!(row.equipment, Equipment::Other);
        assert!(row.muscle_groups.is_empty());
        assert_eq!(row.weight_kg, None);
    }

    #[test]
    fn blank_descriptions_are_dropped() {
        assert_eq!(normalize_description(Some("   ")), None);
        assert_eq!(normalize_description(Some(" Legs ")), Some("Legs".to_string()));
    }
}
