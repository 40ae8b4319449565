//! Dashboard assembly over repositories.

use super::calendar::{month_calendar, CalendarMonth};
use super::records::{personal_records, PersonalRecord};
use super::saturating_count;
use super::streak::{calculate_daily_streak, calculate_weekly_streak, StreakSummary};
use super::trend::{classify_weight_trend, weight_change, Significance, TrendDirection};
use super::volume::{volume_trend, weekly_volume, WeekVolume};
use crate::model::exercise::ExerciseId;
use crate::model::goal::{Goal, GoalStatus};
use crate::model::workout::Workout;
use crate::repo::exercise_repo::ExerciseRepository;
use crate::repo::goal_repo::GoalRepository;
use crate::repo::profile_repo::ProfileRepository;
use crate::repo::workout_repo::{WorkoutListQuery, WorkoutRepository};
use crate::repo::RepoError;
use crate::time::LocalCalendar;
use serde::Serialize;
use std::cmp::Ordering;
use std::error::Error;
use std::fmt::{Display, Formatter};

const RECENT_RECORD_LIMIT: usize = 5;
const WEIGHT_TREND_WINDOW_MS: i64 = 30 * 24 * 60 * 60 * 1000;
const VOLUME_WEEKS: u32 = 3;

#[derive(Debug)]
pub enum AnalyticsError {
    Repo(RepoError),
}

impl Display for AnalyticsError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for AnalyticsError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
        }
    }
}

impl From<RepoError> for AnalyticsError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

/// Personal record labelled with its exercise name.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordHighlight {
    pub exercise_id: ExerciseId,
    pub exercise_name: String,
    pub record: PersonalRecord,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSummary {
    pub total_workouts: u32,
    pub workouts_this_week: u32,
    pub weekly_target: u32,
    pub daily_streak: StreakSummary,
    pub weekly_streak: StreakSummary,
    pub volume_this_week: f64,
    pub volume_trend: TrendDirection,
    pub volume_change_percent: f64,
    pub significance: Significance,
    /// Top records by estimated one-rep max.
    pub recent_records: Vec<RecordHighlight>,
    pub latest_weight_kg: Option<f64>,
    pub weight_trend: TrendDirection,
    pub active_goals: Vec<Goal>,
}

pub struct AnalyticsService<W, E, P, G>
where
    W: WorkoutRepository,
    E: ExerciseRepository,
    P: ProfileRepository,
    G: GoalRepository,
{
    workouts: W,
    exercises: E,
    profile: P,
    goals: G,
    calendar: LocalCalendar,
}

impl<W, E, P, G> AnalyticsService<W, E, P, G>
where
    W: WorkoutRepository,
    E: ExerciseRepository,
    P: ProfileRepository,
    G: GoalRepository,
{
    pub fn new(workouts: W, exercises: E, profile: P, goals: G, calendar: LocalCalendar) -> Self {
        Self {
            workouts,
            exercises,
            profile,
            goals,
            calendar,
        }
    }

    pub fn dashboard(&self, now: i64) -> Result<DashboardSummary, AnalyticsError> {
        let finished = self.finished_workouts()?;
        let today = self.calendar.date_of(now);
        let dates: Vec<_> = finished
            .iter()
            .map(|workout| self.calendar.date_of(workout.started_at))
            .collect();

        let weeks = weekly_volume(&finished, VOLUME_WEEKS, today, self.calendar);
        let this_week = weeks.last();
        let trend = volume_trend(&weeks);

        let recent_weights = self
            .profile
            .list_weight_entries(Some(now - WEIGHT_TREND_WINDOW_MS), None)?;

        Ok(DashboardSummary {
            total_workouts: saturating_count(finished.len()),
            workouts_this_week: this_week.map_or(0, |week| week.workouts),
            weekly_target: self.profile.get_profile()?.weekly_workout_target,
            daily_streak: calculate_daily_streak(&dates, today),
            weekly_streak: calculate_weekly_streak(&dates, today, self.calendar.week_start),
            volume_this_week: this_week.map_or(0.0, |week| week.volume),
            volume_trend: trend.direction,
            volume_change_percent: trend.change_percent,
            significance: trend.significance,
            recent_records: self.top_records(RECENT_RECORD_LIMIT)?,
            latest_weight_kg: self
                .profile
                .latest_weight_entry()?
                .map(|entry| entry.weight_kg),
            weight_trend: classify_weight_trend(weight_change(&recent_weights)),
            active_goals: self.goals.list_goals(Some(GoalStatus::Active))?,
        })
    }

    pub fn month_calendar(
        &self,
        year: i32,
        month: u32,
    ) -> Result<Option<CalendarMonth>, AnalyticsError> {
        let finished = self.finished_workouts()?;
        Ok(month_calendar(
            &finished,
            year,
            month,
            self.calendar.utc_offset_minutes,
        ))
    }

    pub fn weekly_volume(&self, weeks: u32, now: i64) -> Result<Vec<WeekVolume>, AnalyticsError> {
        let finished = self.finished_workouts()?;
        Ok(weekly_volume(
            &finished,
            weeks,
            self.calendar.date_of(now),
            self.calendar,
        ))
    }

    pub fn personal_records(&self) -> Result<Vec<PersonalRecord>, AnalyticsError> {
        Ok(personal_records(&self.workouts.logged_sets(None, None)?))
    }

    fn top_records(&self, limit: usize) -> Result<Vec<RecordHighlight>, AnalyticsError> {
        let mut records = self.personal_records()?;
        records.sort_by(|a, b| {
            b.best_estimated_one_rep_max
                .partial_cmp(&a.best_estimated_one_rep_max)
                .unwrap_or(Ordering::Equal)
        });
        records.truncate(limit);

        let mut highlights = Vec::with_capacity(records.len());
        for record in records {
            let exercise_name = self
                .exercises
                .get_exercise(record.exercise_id)?
                .map(|exercise| exercise.name)
                .unwrap_or_default();
            highlights.push(RecordHighlight {
                exercise_id: record.exercise_id,
                exercise_name,
                record,
            });
        }
        Ok(highlights)
    }

    fn finished_workouts(&self) -> Result<Vec<Workout>, RepoError> {
        self.workouts.list_workouts(&WorkoutListQuery {
            finished_only: true,
            ..WorkoutListQuery::default()
        })
    }
}
