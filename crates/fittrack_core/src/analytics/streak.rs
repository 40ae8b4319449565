//! Daily and weekly workout streaks.
//!
//! # Invariants
//! - Input dates may repeat and arrive unordered; they are de-duplicated.
//! - Dates after `today` are ignored.
//! - The current streak survives a rest day today: counting starts from
//!   yesterday (or last week) when today (this week) has no workout.

use crate::time::{week_start_date, WeekStart};
use chrono::{Duration, NaiveDate};
use serde::Serialize;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct StreakSummary {
    pub current: u32,
    pub longest: u32,
}

/// Streak of consecutive days with at least one workout.
pub fn calculate_daily_streak(dates: &[NaiveDate], today: NaiveDate) -> StreakSummary {
    let days: BTreeSet<NaiveDate> = dates.iter().copied().filter(|day| *day <= today).collect();
    streak_over(&days, today, Duration::days(1))
}

/// Streak of consecutive weeks with at least one workout.
pub fn calculate_weekly_streak(
    dates: &[NaiveDate],
    today: NaiveDate,
    week_start: WeekStart,
) -> StreakSummary {
    let weeks: BTreeSet<NaiveDate> = dates
        .iter()
        .copied()
        .filter(|day| *day <= today)
        .map(|day| week_start_date(day, week_start))
        .collect();
    streak_over(&weeks, week_start_date(today, week_start), Duration::days(7))
}

fn streak_over(periods: &BTreeSet<NaiveDate>, current: NaiveDate, step: Duration) -> StreakSummary {
    let mut longest = 0;
    let mut run = 0;
    let mut previous: Option<NaiveDate> = None;
    for period in periods {
        run = match previous {
            Some(prev) if *period - prev == step => run + 1,
            _ => 1,
        };
        longest = longest.max(run);
        previous = Some(*period);
    }

    let mut cursor = if periods.contains(&current) {
        current
    } else {
        current - step
    };
    let mut streak = 0;
    while periods.contains(&cursor) {
        streak += 1;
        cursor = cursor - step;
    }

    StreakSummary {
        current: streak,
        longest,
    }
}
