//! Training analytics.
//!
//! # Responsibility
//! - Pure calculations over logged data: streaks, trends, significance
//!   labels, personal records, weekly volume and month calendars.
//! - `AnalyticsService` loads repository data and assembles the dashboard.
//!
//! # Invariants
//! - Only finished workouts and completed non-warmup sets are counted.
//! - Calendar grouping uses local dates derived from the configured offset.

pub mod calendar;
pub mod dashboard;
pub mod records;
pub mod streak;
pub mod trend;
pub mod volume;

pub use calendar::{month_calendar, CalendarDay, CalendarMonth};
pub use dashboard::{AnalyticsError, AnalyticsService, DashboardSummary, RecordHighlight};
pub use records::{personal_records, PersonalRecord};
pub use streak::{calculate_daily_streak, calculate_weekly_streak, StreakSummary};
pub use trend::{
    assess_significance, classify_trend, classify_weight_trend, percentage_change, weight_change,
    Significance, TrendDirection,
};
pub use volume::{volume_trend, weekly_volume, VolumeTrend, WeekVolume};

/// Converts a collection length to a `u32` count, saturating at `u32::MAX`.
pub(crate) fn saturating_count(len: usize) -> u32 {
    u32::try_from(len).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::saturating_count;

    #[test]
    fn counts_saturate_instead_of_wrapping() {
        assert_eq!(saturating_count(0), 0);
        assert_eq!(saturating_count(42), 42);
        assert_eq!(saturating_count(u32::MAX as usize), u32::MAX);
        if let Some(beyond) = (u32::MAX as usize).checked_add(1) {
            assert_eq!(saturating_count(beyond), u32::MAX);
        }
    }
}
