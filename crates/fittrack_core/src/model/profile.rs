//! User profile singleton and body-weight history.

use super::validation::{require_range, ModelValidationError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type WeightEntryId = Uuid;

const LB_PER_KG: f64 = 2.204_62;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightUnit {
    Kg,
    Lb,
}

impl WeightUnit {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Kg => "kg",
            Self::Lb => "lb",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "kg" | "kgs" => Some(Self::Kg),
            "lb" | "lbs" => Some(Self::Lb),
            _ => None,
        }
    }

    /// Converts a value expressed in this unit to kilograms.
    pub fn to_kg(self, value: f64) -> f64 {
        match self {
            Self::Kg => value,
            Self::Lb => value / LB_PER_KG,
        }
    }

    /// Converts kilograms to this unit.
    pub fn from_kg(self, kg: f64) -> f64 {
        match self {
            Self::Kg => kg,
            Self::Lb => kg * LB_PER_KG,
        }
    }
}

/// Single-row user profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub display_name: String,
    pub height_cm: Option<f64>,
    pub birth_year: Option<i32>,
    /// Display unit; storage is always kilograms.
    pub weight_unit: WeightUnit,
    pub weekly_workout_target: u32,
}

impl Default for UserProfile {
    fn default() -> Self {
        Self {
            display_name: String::new(),
            height_cm: None,
            birth_year: None,
            weight_unit: WeightUnit::Kg,
            weekly_workout_target: 3,
        }
    }
}

impl UserProfile {
    pub fn validate(&self) -> Result<(), ModelValidationError> {
        if let Some(height) = self.height_cm {
            require_range("height_cm", height, 50.0, 300.0)?;
        }
        if let Some(year) = self.birth_year {
            require_range("birth_year", f64::from(year), 1900.0, 2100.0)?;
        }
        require_range(
            "weekly_workout_target",
            f64::from(self.weekly_workout_target),
            1.0,
            14.0,
        )?;
        Ok(())
    }

    /// Body-mass index for the given weight, when height is known.
    pub fn bmi(&self, weight_kg: f64) -> Option<f64> {
        let height_m = self.height_cm? / 100.0;
        Some(weight_kg / (height_m * height_m))
    }
}

/// One body-weight measurement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightEntry {
    pub id: WeightEntryId,
    pub weight_kg: f64,
    pub recorded_at: i64,
    pub note: Option<String>,
}

impl WeightEntry {
    pub fn new(weight_kg: f64, recorded_at: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            weight_kg,
            recorded_at,
            note: None,
        }
    }

    pub fn validate(&self) -> Result<(), ModelValidationError> {
        if self.weight_kg <= 0.0 {
            return Err(ModelValidationError::OutOfRange {
                field: "weight_kg",
                value: self.weight_kg,
                min: f64::MIN_POSITIVE,
                max: 700.0,
            });
        }
        require_range("weight_kg", self.weight_kg, 0.0, 700.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pound_conversion_is_symmetric() {
        let kg = WeightUnit::Lb.to_kg(225.0);
        assert!((WeightUnit::Lb.from_kg(kg) - 225.0).abs() < 1e-9);
        assert_eq!(WeightUnit::Kg.to_kg(80.0), 80.0);
        assert_eq!(WeightUnit::parse(" LBS "), Some(WeightUnit::Lb));
    }

    #[test]
    fn bmi_requires_height() {
        let mut profile = UserProfile::default();
        assert_eq!(profile.bmi(80.0), None);
        profile.height_cm = Some(200.0);
        assert!((profile.bmi(80.0).unwrap() - 20.0).abs() < 1e-9);
    }

    #[test]
    fn weight_entry_must_be_positive() {
        assert!(WeightEntry::new(0.0, 0).validate().is_err());
        assert!(WeightEntry::new(72.5, 0).validate().is_ok());
    }
}
