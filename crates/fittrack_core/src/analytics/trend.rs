//! Trend direction and improvement significance heuristics.
//!
//! The significance label is a threshold heuristic over improvement size and
//! sample count. It is not a statistical test.

use crate::model::profile::WeightEntry;
use serde::{Deserialize, Serialize};

/// Relative change (percent) beyond which a series counts as moving.
pub const TREND_THRESHOLD_PERCENT: f64 = 5.0;
/// Absolute body-weight change (kg) beyond which weight counts as moving.
pub const WEIGHT_TREND_THRESHOLD_KG: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Up,
    Down,
    Stable,
}

impl TrendDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
            Self::Stable => "stable",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Significance {
    NotSignificant,
    Marginal,
    Significant,
    HighlySignificant,
}

impl Significance {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotSignificant => "not_significant",
            Self::Marginal => "marginal",
            Self::Significant => "significant",
            Self::HighlySignificant => "highly_significant",
        }
    }
}

/// Percent change from `previous` to `current`.
///
/// A zero baseline yields `100` for any positive current value and `0`
/// otherwise.
pub fn percentage_change(previous: f64, current: f64) -> f64 {
    if previous == 0.0 {
        return if current > 0.0 { 100.0 } else { 0.0 };
    }
    (current - previous) / previous * 100.0
}

pub fn classify_trend(change_percent: f64) -> TrendDirection {
    if change_percent > TREND_THRESHOLD_PERCENT {
        TrendDirection::Up
    } else if change_percent < -TREND_THRESHOLD_PERCENT {
        TrendDirection::Down
    } else {
        TrendDirection::Stable
    }
}

pub fn classify_weight_trend(delta_kg: f64) -> TrendDirection {
    if delta_kg > WEIGHT_TREND_THRESHOLD_KG {
        TrendDirection::Up
    } else if delta_kg < -WEIGHT_TREND_THRESHOLD_KG {
        TrendDirection::Down
    } else {
        TrendDirection::Stable
    }
}

/// Buckets an improvement into one of four labels by size and sample count.
pub fn assess_significance(improvement_percent: f64, sample_size: usize) -> Significance {
    let magnitude = improvement_percent.abs();
    if magnitude >= 10.0 && sample_size >= 10 {
        Significance::HighlySignificant
    } else if magnitude >= 5.0 && sample_size >= 6 {
        Significance::Significant
    } else if magnitude >= 2.0 && sample_size >= 3 {
        Significance::Marginal
    } else {
        Significance::NotSignificant
    }
}

/// Newest minus oldest weight over entries in any order; 0 for fewer than two.
pub fn weight_change(entries: &[WeightEntry]) -> f64 {
    let oldest = entries.iter().min_by_key(|entry| entry.recorded_at);
    let newest = entries.iter().max_by_key(|entry| entry.recorded_at);
    match (oldest, newest) {
        (Some(oldest), Some(newest)) if entries.len() >= 2 => newest.weight_kg - oldest.weight_kg,
        _ => 0.0,
    }
}
