//! Goal tracking use-cases.
//!
//! # Responsibility
//! - Create, list, abandon and delete goals.
//! - Recompute `current_value` of active goals from logged data.
//! - Complete goals when their target is reached.
//!
//! # Invariants
//! - Only `Active` goals receive progress updates.
//! - Personal-record progress never decreases.
//! - Consistency and volume goals measure the current local week.

use crate::model::exercise::ExerciseId;
use crate::model::goal::{Goal, GoalId, GoalStatus, GoalType};
use crate::model::validation::ModelValidationError;
use crate::model::workout::Workout;
use crate::repo::goal_repo::GoalRepository;
use crate::repo::profile_repo::ProfileRepository;
use crate::repo::workout_repo::{WorkoutListQuery, WorkoutRepository};
use crate::repo::RepoError;
use crate::time::LocalCalendar;
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug)]
pub enum GoalServiceError {
    GoalNotFound(GoalId),
    /// Goal is no longer active.
    NotActive(GoalId),
    Validation(ModelValidationError),
    Repo(RepoError),
}

impl Display for GoalServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::GoalNotFound(id) => write!(f, "goal not found: {id}"),
            Self::NotActive(id) => write!(f, "goal is not active: {id}"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for GoalServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for GoalServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound { entity: "goal", id } => Self::GoalNotFound(id),
            RepoError::Validation(err) => Self::Validation(err),
            other => Self::Repo(other),
        }
    }
}

impl From<ModelValidationError> for GoalServiceError {
    fn from(value: ModelValidationError) -> Self {
        Self::Validation(value)
    }
}

/// Input for creating a goal.
#[derive(Debug, Clone, PartialEq)]
pub struct NewGoal {
    pub title: String,
    pub goal_type: GoalType,
    pub exercise_id: Option<ExerciseId>,
    pub start_value: f64,
    pub target_value: f64,
    pub deadline: Option<i64>,
}

/// Goal service facade over a goal repository.
pub struct GoalService<R: GoalRepository> {
    repo: R,
}

impl<R: GoalRepository> GoalService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn create_goal(&self, input: NewGoal, created_at: i64) -> Result<Goal, GoalServiceError> {
        let mut goal = Goal::new(
            input.title,
            input.goal_type,
            input.start_value,
            input.target_value,
            created_at,
        );
        goal.exercise_id = input.exercise_id;
        goal.deadline = input.deadline;
        goal.validate()?;
        self.repo.create_goal(&goal)?;
        Ok(goal)
    }

    pub fn get_goal(&self, id: GoalId) -> Result<Goal, GoalServiceError> {
        self.repo
            .get_goal(id)?
            .ok_or(GoalServiceError::GoalNotFound(id))
    }

    pub fn list_goals(&self, status: Option<GoalStatus>) -> Result<Vec<Goal>, GoalServiceError> {
        Ok(self.repo.list_goals(status)?)
    }

    pub fn abandon_goal(&self, id: GoalId) -> Result<Goal, GoalServiceError> {
        let mut goal = self.get_goal(id)?;
        if goal.status != GoalStatus::Active {
            return Err(GoalServiceError::NotActive(id));
        }
        goal.abandon();
        self.repo.update_goal(&goal)?;
        Ok(goal)
    }

    pub fn delete_goal(&self, id: GoalId) -> Result<(), GoalServiceError> {
        Ok(self.repo.delete_goal(id)?)
    }

    /// Raises active personal-record goals of `exercise_id` to `best_weight_kg`.
    ///
    /// Returns the goals that completed with this update.
    pub fn apply_personal_records(
        &self,
        exercise_id: ExerciseId,
        best_weight_kg: f64,
        at: i64,
    ) -> Result<Vec<Goal>, GoalServiceError> {
        let mut completed = Vec::new();
        for mut goal in self.repo.active_goals_for_exercise(exercise_id)? {
            if best_weight_kg <= goal.current_value {
                continue;
            }
            let reached = goal.record_progress(best_weight_kg, at);
            self.repo.update_goal(&goal)?;
            if reached {
                info!("event=goal_complete module=service status=ok goal_id={}", goal.id);
                completed.push(goal);
            }
        }
        Ok(completed)
    }

    /// Recomputes progress of every active goal from logged data.
    ///
    /// Returns the refreshed active and newly completed goals.
    pub fn refresh_progress<W: WorkoutRepository, P: ProfileRepository>(
        &self,
        workouts: &W,
        profile: &P,
        calendar: LocalCalendar,
        now: i64,
    ) -> Result<Vec<Goal>, GoalServiceError> {
        let week_start = calendar.week_start_ms(now);
        let mut refreshed = Vec::new();

        for mut goal in self.repo.list_goals(Some(GoalStatus::Active))? {
            let measured = match goal.goal_type {
                GoalType::PersonalRecord => match goal.exercise_id {
                    Some(exercise_id) => workouts
                        .logged_sets(Some(exercise_id), None)?
                        .iter()
                        .filter(|logged| logged.set.counts_toward_totals())
                        .map(|logged| logged.set.weight_kg)
                        .fold(None, |best: Option<f64>, weight| {
                            Some(best.map_or(weight, |best| best.max(weight)))
                        })
                        .map(|best| best.max(goal.current_value)),
                    None => None,
                },
                GoalType::BodyWeight => profile.latest_weight_entry()?.map(|entry| entry.weight_kg),
                GoalType::Consistency => {
                    let week = finished_since(workouts, week_start)?;
                    Some(week.len() as f64)
                }
                GoalType::Volume => {
                    let week = finished_since(workouts, week_start)?;
                    Some(week.iter().map(|workout| workout.total_volume).sum())
                }
            };

            if let Some(value) = measured {
                goal.record_progress(value, now);
                self.repo.update_goal(&goal)?;
            }
            refreshed.push(goal);
        }
        Ok(refreshed)
    }
}

fn finished_since<W: WorkoutRepository>(
    workouts: &W,
    since: i64,
) -> Result<Vec<Workout>, RepoError> {
    workouts.list_workouts(&WorkoutListQuery {
        since: Some(since),
        finished_only: true,
        ..WorkoutListQuery::default()
    })
}
