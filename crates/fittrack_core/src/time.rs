//! Clock and calendar helpers.
//!
//! Storage keeps UTC epoch milliseconds; calendar math (streaks, weeks,
//! month views) happens on local dates derived with a fixed UTC offset.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

const MS_PER_MINUTE: i64 = 60_000;

/// First day of the week used by weekly aggregations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeekStart {
    #[default]
    Monday,
    Sunday,
}

impl WeekStart {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Monday => "monday",
            Self::Sunday => "sunday",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "monday" | "mon" => Some(Self::Monday),
            "sunday" | "sun" => Some(Self::Sunday),
            _ => None,
        }
    }
}

/// Current wall-clock time in epoch milliseconds.
pub fn now_epoch_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Local calendar date of `epoch_ms` shifted by `utc_offset_minutes`.
pub fn local_date(epoch_ms: i64, utc_offset_minutes: i32) -> NaiveDate {
    let shifted = epoch_ms.saturating_add(i64::from(utc_offset_minutes) * MS_PER_MINUTE);
    DateTime::<Utc>::from_timestamp_millis(shifted)
        .unwrap_or_default()
        .date_naive()
}

/// Epoch milliseconds of local midnight at the start of `date`.
pub fn day_start_epoch_ms(date: NaiveDate, utc_offset_minutes: i32) -> i64 {
    date.and_time(NaiveTime::MIN).and_utc().timestamp_millis()
        - i64::from(utc_offset_minutes) * MS_PER_MINUTE
}

/// First date of the week containing `date`.
pub fn week_start_date(date: NaiveDate, week_start: WeekStart) -> NaiveDate {
    let offset = match week_start {
        WeekStart::Monday => date.weekday().num_days_from_monday(),
        WeekStart::Sunday => date.weekday().num_days_from_sunday(),
    };
    date - Duration::days(i64::from(offset))
}

/// Number of days in the given month, or `None` for an invalid month.
pub fn days_in_month(year: i32, month: u32) -> Option<u32> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    u32::try_from((next - first).num_days()).ok()
}

/// Local calendar settings shared by services and analytics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LocalCalendar {
    pub utc_offset_minutes: i32,
    pub week_start: WeekStart,
}

impl LocalCalendar {
    pub fn new(utc_offset_minutes: i32, week_start: WeekStart) -> Self {
        Self {
            utc_offset_minutes,
            week_start,
        }
    }

    pub fn date_of(&self, epoch_ms: i64) -> NaiveDate {
        local_date(epoch_ms, self.utc_offset_minutes)
    }

    pub fn day_start(&self, date: NaiveDate) -> i64 {
        day_start_epoch_ms(date, self.utc_offset_minutes)
    }

    pub fn week_of(&self, date: NaiveDate) -> NaiveDate {
        week_start_date(date, self.week_start)
    }

    /// Epoch ms of the start of the local week containing `epoch_ms`.
    pub fn week_start_ms(&self, epoch_ms: i64) -> i64 {
        self.day_start(self.week_of(self.date_of(epoch_ms)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn local_date_applies_offset() {
        // 2024-01-01T23:30:00Z
        let ms = 1_704_151_800_000;
        assert_eq!(local_date(ms, 0), date(2024, 1, 1));
        assert_eq!(local_date(ms, 60), date(2024, 1, 2));
        assert_eq!(local_date(ms, -24 * 60), date(2023, 12, 31));
    }

    #[test]
    fn day_start_round_trips_through_local_date() {
        let day = date(2024, 3, 10);
        for offset in [-300, 0, 330] {
            let start = day_start_epoch_ms(day, offset);
            assert_eq!(local_date(start, offset), day);
            assert_eq!(local_date(start - 1, offset), date(2024, 3, 9));
        }
    }

    #[test]
    fn week_start_respects_configuration() {
        // 2024-01-03 is a Wednesday.
        let wednesday = date(2024, 1, 3);
        assert_eq!(week_start_date(wednesday, WeekStart::Monday), date(2024, 1, 1));
        assert_eq!(week_start_date(wednesday, WeekStart::Sunday), date(2023, 12, 31));
    }

    #[test]
    fn calendar_week_start_ms_uses_local_midnight() {
        let calendar = LocalCalendar::new(120, WeekStart::Monday);
        // Thursday 2024-01-04 10:00 local.
        let thursday = day_start_epoch_ms(date(2024, 1, 4), 120) + 10 * 3_600_000;
        assert_eq!(
            calendar.week_start_ms(thursday),
            day_start_epoch_ms(date(2024, 1, 1), 120)
        );
    }

    #[test]
    fn month_lengths() {
        assert_eq!(days_in_month(2024, 2), Some(29));
        assert_eq!(days_in_month(2023, 2), Some(28));
        assert_eq!(days_in_month(2023, 12), Some(31));
        assert_eq!(days_in_month(2023, 13), None);
    }
}
