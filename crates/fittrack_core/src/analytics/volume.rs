//! Weekly training volume and its trend.

use super::trend::{assess_significance, classify_trend, percentage_change, Significance, TrendDirection};
use crate::model::workout::Workout;
use crate::time::LocalCalendar;
use chrono::{Duration, NaiveDate};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeekVolume {
    /// First local date of the week.
    pub week_start: NaiveDate,
    pub volume: f64,
    pub workouts: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VolumeTrend {
    pub latest_volume: f64,
    pub previous_volume: f64,
    pub change_percent: f64,
    pub direction: TrendDirection,
    pub significance: Significance,
}

/// Volume of the last `weeks` weeks ending with the week of `today`,
/// oldest first. Unfinished workouts are skipped.
pub fn weekly_volume(
    workouts: &[Workout],
    weeks: u32,
    today: NaiveDate,
    calendar: LocalCalendar,
) -> Vec<WeekVolume> {
    let current_week = calendar.week_of(today);
    let mut buckets: Vec<WeekVolume> = (0..weeks)
        .rev()
        .map(|back| WeekVolume {
            week_start: current_week - Duration::weeks(i64::from(back)),
            volume: 0.0,
            workouts: 0,
        })
        .collect();

    for workout in workouts.iter().filter(|workout| !workout.is_active()) {
        let week = calendar.week_of(calendar.date_of(workout.started_at));
        if let Some(bucket) = buckets.iter_mut().find(|bucket| bucket.week_start == week) {
            bucket.volume += workout.total_volume;
            bucket.workouts += 1;
        }
    }
    buckets
}

/// Compares the latest complete week with the week before it.
///
/// `weeks` is oldest first and ends with the in-progress week, so the
/// compared pair is the second- and third-to-last entries.
pub fn volume_trend(weeks: &[WeekVolume]) -> VolumeTrend {
    let len = weeks.len();
    let latest = len.checked_sub(2).and_then(|index| weeks.get(index));
    let previous = len.checked_sub(3).and_then(|index| weeks.get(index));

    let latest_volume = latest.map_or(0.0, |week| week.volume);
    let previous_volume = previous.map_or(0.0, |week| week.volume);
    let samples = latest.map_or(0, |week| week.workouts) + previous.map_or(0, |week| week.workouts);
    let change_percent = percentage_change(previous_volume, latest_volume);

    VolumeTrend {
        latest_volume,
        previous_volume,
        change_percent,
        direction: classify_trend(change_percent),
        significance: assess_significance(change_percent, samples as usize),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::{day_start_epoch_ms, WeekStart};

    fn finished(date: NaiveDate, volume: f64) -> Workout {
        let start = day_start_epoch_ms(date, 0) + 3_600_000;
        let mut workout = Workout::new("Session", start);
        workout.ended_at = Some(start + 3_600_000);
        workout.total_volume = volume;
        workout
    }

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, d).unwrap()
    }

    #[test]
    fn weekly_buckets_end_with_current_week() {
        let calendar = LocalCalendar::new(0, WeekStart::Monday);
        let workouts = vec![
            finished(date(5, 6), 1000.0),
            finished(date(5, 8), 500.0),
            finished(date(5, 14), 2000.0),
            finished(date(3, 1), 9999.0),
        ];
        let weeks = weekly_volume(&workouts, 3, date(5, 15), calendar);
        assert_eq!(weeks.len(), 3);
        assert_eq!(weeks[0].week_start, date(4, 29));
        assert_eq!(weeks[0].workouts, 0);
        assert_eq!(weeks[1].volume, 1500.0);
        assert_eq!(weeks[1].workouts, 2);
        assert_eq!(weeks[2].week_start, date(5, 13));
        assert_eq!(weeks[2].volume, 2000.0);
    }

    #[test]
    fn active_workouts_do_not_count() {
        let calendar = LocalCalendar::default();
        let mut active = finished(date(5, 14), 700.0);
        active.ended_at = None;
        let weeks = weekly_volume(&[active], 1, date(5, 15), calendar);
        assert_eq!(weeks[0].workouts, 0);
    }

    #[test]
    fn trend_compares_complete_weeks() {
        let week = |volume: f64, workouts: u32| WeekVolume {
            week_start: date(1, 1),
            volume,
            workouts,
        };
        let trend = volume_trend(&[week(1000.0, 4), week(1200.0, 6), week(50.0, 1)]);
        assert_eq!(trend.latest_volume, 1200.0);
        assert_eq!(trend.previous_volume, 1000.0);
        assert!((trend.change_percent - 20.0).abs() < 1e-9);
        assert_eq!(trend.direction, TrendDirection::Up);
        assert_eq!(trend.significance, Significance::HighlySignificant);

        let empty = volume_trend(&[]);
        assert_eq!(empty.change_percent, 0.0);
        assert_eq!(empty.direction, TrendDirection::Stable);
    }
}
