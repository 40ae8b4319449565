//! Weekly routine scheduling use-cases.

use crate::model::routine::{RoutineDay, RoutineId, WorkoutRoutine};
use crate::model::template::{TemplateId, WorkoutTemplate};
use crate::model::validation::ModelValidationError;
use crate::repo::routine_repo::RoutineRepository;
use crate::repo::template_repo::TemplateRepository;
use crate::repo::RepoError;
use chrono::NaiveDate;
use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug)]
pub enum RoutineServiceError {
    RoutineNotFound(RoutineId),
    TemplateNotFound(TemplateId),
    Validation(ModelValidationError),
    Repo(RepoError),
}

impl Display for RoutineServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RoutineNotFound(id) => write!(f, "routine not found: {id}"),
            Self::TemplateNotFound(id) => write!(f, "template not found: {id}"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for RoutineServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for RoutineServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound {
                entity: "routine",
                id,
            } => Self::RoutineNotFound(id),
            RepoError::Validation(err) => Self::Validation(err),
            other => Self::Repo(other),
        }
    }
}

impl From<ModelValidationError> for RoutineServiceError {
    fn from(value: ModelValidationError) -> Self {
        Self::Validation(value)
    }
}

pub struct RoutineService<R: RoutineRepository, T: TemplateRepository> {
    routines: R,
    templates: T,
}

impl<R: RoutineRepository, T: TemplateRepository> RoutineService<R, T> {
    pub fn new(routines: R, templates: T) -> Self {
        Self {
            routines,
            templates,
        }
    }

    /// Creates a routine from `(iso_weekday, template_id)` pairs.
    pub fn create_routine(
        &self,
        name: &str,
        days: &[(u8, TemplateId)],
        activate: bool,
    ) -> Result<WorkoutRoutine, RoutineServiceError> {
        let mut routine = WorkoutRoutine::new(name);
        routine.is_active = activate;
        for (weekday, template_id) in days {
            if self.templates.get_template(*template_id)?.is_none() {
                return Err(RoutineServiceError::TemplateNotFound(*template_id));
            }
            routine.days.push(RoutineDay {
                weekday: *weekday,
                template_id: *template_id,
            });
        }
        routine.days.sort_by_key(|day| day.weekday);
        routine.validate()?;
        self.routines.create_routine(&routine)?;
        Ok(routine)
    }

    pub fn list_routines(&self) -> Result<Vec<WorkoutRoutine>, RoutineServiceError> {
        Ok(self.routines.list_routines()?)
    }

    pub fn delete_routine(&self, id: RoutineId) -> Result<(), RoutineServiceError> {
        Ok(self.routines.delete_routine(id)?)
    }

    /// Makes `id` the only active routine.
    pub fn activate(&self, id: RoutineId) -> Result<WorkoutRoutine, RoutineServiceError> {
        self.routines.set_active(id)?;
        self.routines
            .get_routine(id)?
            .ok_or(RoutineServiceError::RoutineNotFound(id))
    }

    /// Template the active routine schedules on `date`, if any.
    pub fn template_for_date(
        &self,
        date: NaiveDate,
    ) -> Result<Option<WorkoutTemplate>, RoutineServiceError> {
        let Some(routine) = self.routines.active_routine()? else {
            return Ok(None);
        };
        match routine.template_for(date) {
            Some(template_id) => Ok(self.templates.get_template(template_id)?),
            None => Ok(None),
        }
    }
}
