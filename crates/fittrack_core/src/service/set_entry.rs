//! Free-text set entry parsing for quick logging.
//!
//! Accepted shapes (case-insensitive, whitespace tolerant):
//! - `100x5`, `100 x 5`, `100*5`, `100×5`
//! - `100 kg x 5`, `225lb x 3`, `225 lbs x 3`
//! - any of the above followed by `@8` or `@ 8.5` (RPE)
//! - `12 reps`, `12 rep @7` (bodyweight, no load)

use crate::model::profile::WeightUnit;
use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};

static WEIGHTED_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^\s*(?P<weight>\d+(?:[.,]\d+)?)\s*(?P<unit>kgs?|lbs?)?\s*[x×*]\s*(?P<reps>\d+)\s*(?:reps?)?\s*(?:@\s*(?P<rpe>\d+(?:[.,]\d+)?))?\s*$",
    )
    .expect("valid weighted set regex")
});
static REPS_ONLY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*(?P<reps>\d+)\s*reps?\s*(?:@\s*(?P<rpe>\d+(?:[.,]\d+)?))?\s*$")
        .expect("valid reps-only regex")
});

/// Parsed quick-log input with the load already normalized to kilograms.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SetEntry {
    pub weight_kg: f64,
    pub reps: u32,
    pub rpe: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetEntryError {
    /// Input does not match any accepted shape.
    Unrecognized(String),
    /// A numeric part overflowed or failed to parse.
    InvalidNumber(String),
}

impl Display for SetEntryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unrecognized(input) => {
                write!(f, "unrecognized set entry `{input}`; try `100x5` or `12 reps`")
            }
            Self::InvalidNumber(value) => write!(f, "invalid number `{value}` in set entry"),
        }
    }
}

impl Error for SetEntryError {}

/// Parses one free-text set. Loads without a unit use `default_unit`.
pub fn parse_set_entry(input: &str, default_unit: WeightUnit) -> Result<SetEntry, SetEntryError> {
    if let Some(caps) = WEIGHTED_RE.captures(input) {
        let weight = parse_decimal(&caps["weight"])?;
        let unit = caps
            .name("unit")
            .and_then(|unit| WeightUnit::parse(unit.as_str()))
            .unwrap_or(default_unit);
        return Ok(SetEntry {
            weight_kg: round_kg(unit.to_kg(weight)),
            reps: parse_reps(&caps["reps"])?,
            rpe: caps.name("rpe").map(|rpe| parse_decimal(rpe.as_str())).transpose()?,
        });
    }

    if let Some(caps) = REPS_ONLY_RE.captures(input) {
        return Ok(SetEntry {
            weight_kg: 0.0,
            reps: parse_reps(&caps["reps"])?,
            rpe: caps.name("rpe").map(|rpe| parse_decimal(rpe.as_str())).transpose()?,
        });
    }

    Err(SetEntryError::Unrecognized(input.trim().to_string()))
}

fn parse_decimal(value: &str) -> Result<f64, SetEntryError> {
    value
        .replace(',', ".")
        .parse::<f64>()
        .map_err(|_| SetEntryError::InvalidNumber(value.to_string()))
}

fn parse_reps(value: &str) -> Result<u32, SetEntryError> {
    value
        .parse::<u32>()
        .map_err(|_| SetEntryError::InvalidNumber(value.to_string()))
}

// Pound conversions are kept to two decimals.
fn round_kg(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(input: &str) -> SetEntry {
        parse_set_entry(input, WeightUnit::Kg).unwrap()
    }

    #[test]
    fn compact_weight_by_reps() {
        let entry = parse("100x5");
        assert_eq!(entry.weight_kg, 100.0);
        assert_eq!(entry.reps, 5);
        assert_eq!(entry.rpe, None);
    }

    #[test]
    fn explicit_unit_and_rpe() {
        let entry = parse("100 kg x 5 @8");
        assert_eq!(entry.weight_kg, 100.0);
        assert_eq!(entry.reps, 5);
        assert_eq!(entry.rpe, Some(8.0));

        let entry = parse("62,5KG * 8 @ 7.5");
        assert_eq!(entry.weight_kg, 62.5);
        assert_eq!(entry.rpe, Some(7.5));
    }

    #[test]
    fn pounds_are_converted() {
        let entry = parse("225lb x 3");
        assert_eq!(entry.weight_kg, 102.06);
        assert_eq!(entry.reps, 3);
    }

    #[test]
    fn default_unit_applies_without_suffix() {
        let entry = parse_set_entry("135x10", WeightUnit::Lb).unwrap();
        assert_eq!(entry.weight_kg, 61.24);
    }

    #[test]
    fn reps_only_is_bodyweight() {
        let entry = parse("12 reps");
        assert_eq!(entry.weight_kg, 0.0);
        assert_eq!(entry.reps, 12);
        assert_eq!(parse("1 rep @9").rpe, Some(9.0));
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(matches!(
            parse_set_entry("heavy", WeightUnit::Kg),
            Err(SetEntryError::Unrecognized(_))
        ));
        assert!(matches!(
            parse_set_entry("100x99999999999", WeightUnit::Kg),
            Err(SetEntryError::InvalidNumber(_))
        ));
    }
}
