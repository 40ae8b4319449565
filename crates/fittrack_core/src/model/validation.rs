//! Record-level validation errors.

use std::error::Error;
use std::fmt::{Display, Formatter};

/// Validation failure for any domain record.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelValidationError {
    /// A required text field is blank after trim.
    BlankField(&'static str),
    /// `ended_at` is earlier than `started_at`.
    EndBeforeStart { started_at: i64, ended_at: i64 },
    /// A numeric field is outside its accepted range.
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
    /// Personal-record goals must reference an exercise.
    MissingExercise,
    /// The same weekday appears twice in one routine.
    DuplicateWeekday(u8),
    /// Two template rows share one position.
    DuplicatePosition(u32),
}

impl Display for ModelValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankField(field) => write!(f, "{field} must not be blank"),
            Self::EndBeforeStart {
                started_at,
                ended_at,
            } => write!(
                f,
                "ended_at ({ended_at}) must be greater than or equal to started_at ({started_at})"
            ),
            Self::OutOfRange {
                field,
                value,
                min,
                max,
            } => write!(f, "{field} value {value} is outside {min}..={max}"),
            Self::MissingExercise => write!(f, "personal record goals require an exercise"),
            Self::DuplicateWeekday(day) => write!(f, "weekday {day} is scheduled twice"),
            Self::DuplicatePosition(position) => {
                write!(f, "template position {position} is used twice")
            }
        }
    }
}

impl Error for ModelValidationError {}

pub(crate) fn require_text(field: &'static str, value: &str) -> Result<(), ModelValidationError> {
    if value.trim().is_empty() {
        return Err(ModelValidationError::BlankField(field));
    }
    Ok(())
}

pub(crate) fn require_range(
    field: &'static str,
    value: f64,
    min: f64,
    max: f64,
) -> Result<(), ModelValidationError> {
    if !value.is_finite() || value < min || value > max {
        return Err(ModelValidationError::OutOfRange {
            field,
            value,
            min,
            max,
        });
    }
    Ok(())
}
