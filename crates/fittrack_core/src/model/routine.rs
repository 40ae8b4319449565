//! Weekly routines mapping weekdays to templates.
//!
//! # Invariants
//! - `weekday` uses ISO numbering: 1 = Monday .. 7 = Sunday.
//! - A weekday appears at most once per routine.
//! - At most one routine is active at a time (enforced by the repository).

use super::template::TemplateId;
use super::validation::{require_text, ModelValidationError};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

pub type RoutineId = Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutineDay {
    pub weekday: u8,
    pub template_id: TemplateId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkoutRoutine {
    pub id: RoutineId,
    pub name: String,
    pub is_active: bool,
    /// Sorted by weekday ascending.
    pub days: Vec<RoutineDay>,
}

impl WorkoutRoutine {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into().trim().to_string(),
            is_active: false,
            days: Vec::new(),
        }
    }

    pub fn validate(&self) -> Result<(), ModelValidationError> {
        require_text("routine name", &self.name)?;
        let mut seen = HashSet::new();
        for day in &self.days {
            if !(1..=7).contains(&day.weekday) {
                return Err(ModelValidationError::OutOfRange {
                    field: "weekday",
                    value: f64::from(day.weekday),
                    min: 1.0,
                    max: 7.0,
                });
            }
            if !seen.insert(day.weekday) {
                return Err(ModelValidationError::DuplicateWeekday(day.weekday));
            }
        }
        Ok(())
    }

    /// Template scheduled on the weekday of `date`, if any.
    pub fn template_for(&self, date: NaiveDate) -> Option<TemplateId> {
        let weekday = date.weekday().number_from_monday() as u8;
        self.days
            .iter()
            .find(|day| day.weekday == weekday)
            .map(|day| day.template_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_for_uses_iso_weekday() {
        let monday_template = Uuid::new_v4();
        let mut routine = WorkoutRoutine::new("PPL");
        routine.days.push(RoutineDay {
            weekday: 1,
            template_id: monday_template,
        });
        let monday = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let tuesday = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        assert_eq!(routine.template_for(monday), Some(monday_template));
        assert_eq!(routine.template_for(tuesday), None);
    }

    #[test]
    fn duplicate_and_invalid_weekdays_are_rejected() {
        let mut routine = WorkoutRoutine::new("Split");
        routine.days.push(RoutineDay {
            weekday: 8,
            template_id: Uuid::new_v4(),
        });
        assert!(routine.validate().is_err());
        routine.days[0].weekday = 3;
        routine.days.push(RoutineDay {
            weekday: 3,
            template_id: Uuid::new_v4(),
        });
        assert_eq!(
            routine.validate().unwrap_err(),
            ModelValidationError::DuplicateWeekday(3)
        );
    }
}
