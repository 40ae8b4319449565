//! Month calendar view of finished workouts.

use super::saturating_count;
use crate::model::workout::Workout;
use crate::time::{days_in_month, local_date};
use chrono::{Datelike, NaiveDate};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalendarDay {
    pub date: NaiveDate,
    pub workout_count: u32,
    pub total_volume: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalendarMonth {
    pub year: i32,
    pub month: u32,
    /// One entry per day of the month, in order.
    pub days: Vec<CalendarDay>,
    pub total_workouts: u32,
    pub total_volume: f64,
    pub active_days: u32,
}

/// Builds the month grid. Returns `None` for an invalid year/month.
pub fn month_calendar(
    workouts: &[Workout],
    year: i32,
    month: u32,
    utc_offset_minutes: i32,
) -> Option<CalendarMonth> {
    let length = days_in_month(year, month)?;
    let mut days = Vec::with_capacity(length as usize);
    for day in 1..=length {
        days.push(CalendarDay {
            date: NaiveDate::from_ymd_opt(year, month, day)?,
            workout_count: 0,
            total_volume: 0.0,
        });
    }

    for workout in workouts.iter().filter(|workout| !workout.is_active()) {
        let date = local_date(workout.started_at, utc_offset_minutes);
        if date.year() != year || date.month() != month {
            continue;
        }
        if let Some(day) = days.get_mut(date.day0() as usize) {
            day.workout_count += 1;
            day.total_volume += workout.total_volume;
        }
    }

    let total_workouts = days.iter().map(|day| day.workout_count).sum();
    let total_volume = days.iter().map(|day| day.total_volume).sum();
    let active_days = saturating_count(days.iter().filter(|day| day.workout_count > 0).count());
    Some(CalendarMonth {
        year,
        month,
        days,
        total_workouts,
        total_volume,
        active_days,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::day_start_epoch_ms;

    fn finished_at(epoch_ms: i64, volume: f64) -> Workout {
        let mut workout = Workout::new("Session", epoch_ms);
        workout.ended_at = Some(epoch_ms + 1);
        workout.total_volume = volume;
        workout
    }

    #[test]
    fn invalid_month_is_rejected() {
        assert!(month_calendar(&[], 2024, 0, 0).is_none());
        assert!(month_calendar(&[], 2024, 13, 0).is_none());
    }

    #[test]
    fn days_cover_the_whole_month() {
        let month = month_calendar(&[], 2024, 2, 0).unwrap();
        assert_eq!(month.days.len(), 29);
        assert_eq!(month.days[28].date, NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
        assert_eq!(month.total_workouts, 0);
    }

    #[test]
    fn workouts_land_on_local_dates() {
        let march_1 = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        // 23:30 UTC on Feb 29 is Mar 1 at UTC+1.
        let late = day_start_epoch_ms(march_1, 0) - 30 * 60_000;
        let workouts = vec![
            finished_at(late, 500.0),
            finished_at(day_start_epoch_ms(march_1, 60) + 3_600_000, 250.0),
        ];

        let march = month_calendar(&workouts, 2024, 3, 60).unwrap();
        assert_eq!(march.days[0].workout_count, 2);
        assert_eq!(march.days[0].total_volume, 750.0);
        assert_eq!(march.active_days, 1);

        let utc = month_calendar(&workouts, 2024, 3, 0).unwrap();
        assert_eq!(utc.total_workouts, 1);
    }
}
