//! Workout session use-cases.
//!
//! # Responsibility
//! - Start sessions (blank or from a template) and enforce a single active one.
//! - Add exercises and log, complete, edit and delete sets.
//! - Finish sessions: persist aggregates, detect new records, feed PR goals.
//!
//! # Invariants
//! - At most one workout has `ended_at = NULL`.
//! - Stored aggregates of a finished workout always equal the sum over its
//!   completed non-warmup sets; set edits after finish recompute them.
//! - Goal updates never fail a finish; they are logged and skipped.

use super::goal_service::GoalService;
use super::set_entry::{parse_set_entry, SetEntryError};
use crate::model::exercise::{Exercise, ExerciseId};
use crate::model::goal::Goal;
use crate::model::profile::WeightUnit;
use crate::model::template::TemplateId;
use crate::model::validation::ModelValidationError;
use crate::model::workout::{
    ExerciseInstance, ExerciseSet, InstanceId, SetId, SetType, Workout, WorkoutId, WorkoutTotals,
};
use crate::repo::exercise_repo::ExerciseRepository;
use crate::repo::goal_repo::GoalRepository;
use crate::repo::template_repo::TemplateRepository;
use crate::repo::workout_repo::{WorkoutListQuery, WorkoutRepository};
use crate::repo::RepoError;
use log::{info, warn};
use serde::Serialize;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug)]
pub enum WorkoutServiceError {
    WorkoutNotFound(WorkoutId),
    InstanceNotFound(InstanceId),
    SetNotFound(SetId),
    ExerciseNotFound(ExerciseId),
    TemplateNotFound(TemplateId),
    /// Another session is still in progress.
    AlreadyActive(WorkoutId),
    AlreadyFinished(WorkoutId),
    InvalidEntry(SetEntryError),
    Validation(ModelValidationError),
    Repo(RepoError),
    /// Internal consistency mismatch between write and read-back.
    InconsistentState(&'static str),
}

impl Display for WorkoutServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::WorkoutNotFound(id) => write!(f, "workout not found: {id}"),
            Self::InstanceNotFound(id) => write!(f, "exercise instance not found: {id}"),
            Self::SetNotFound(id) => write!(f, "set not found: {id}"),
            Self::ExerciseNotFound(id) => write!(f, "exercise not found: {id}"),
            Self::TemplateNotFound(id) => write!(f, "template not found: {id}"),
            Self::AlreadyActive(id) => write!(f, "workout {id} is already in progress"),
            Self::AlreadyFinished(id) => write!(f, "workout {id} is already finished"),
            Self::InvalidEntry(err) => write!(f, "{err}"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::InconsistentState(details) => write!(f, "inconsistent workout state: {details}"),
        }
    }
}

impl Error for WorkoutServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidEntry(err) => Some(err),
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for WorkoutServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound { entity, id } => match entity {
                "workout" => Self::WorkoutNotFound(id),
                "exercise instance" => Self::InstanceNotFound(id),
                "exercise set" => Self::SetNotFound(id),
                "exercise" => Self::ExerciseNotFound(id),
                "template" => Self::TemplateNotFound(id),
                _ => Self::Repo(RepoError::NotFound { entity, id }),
            },
            RepoError::Validation(err) => Self::Validation(err),
            other => Self::Repo(other),
        }
    }
}

impl From<SetEntryError> for WorkoutServiceError {
    fn from(value: SetEntryError) -> Self {
        Self::InvalidEntry(value)
    }
}

impl From<ModelValidationError> for WorkoutServiceError {
    fn from(value: ModelValidationError) -> Self {
        Self::Validation(value)
    }
}

pub type WorkoutServiceResult<T> = Result<T, WorkoutServiceError>;

/// Input for logging one performed set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogSetRequest {
    pub weight_kg: f64,
    pub reps: u32,
    pub rpe: Option<f64>,
    pub set_type: SetType,
}

impl LogSetRequest {
    pub fn working(weight_kg: f64, reps: u32) -> Self {
        Self {
            weight_kg,
            reps,
            rpe: None,
            set_type: SetType::Working,
        }
    }
}

/// One exercise of a workout with its catalog entry and sets.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstanceDetail {
    pub instance: ExerciseInstance,
    pub exercise: Exercise,
    pub sets: Vec<ExerciseSet>,
}

/// Full read model of one workout.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkoutDetail {
    pub workout: Workout,
    pub exercises: Vec<InstanceDetail>,
    /// Aggregates over the current sets, also for in-progress workouts.
    pub live_totals: WorkoutTotals,
}

/// Heaviest-weight record beaten by a finished workout.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewRecord {
    pub exercise_id: ExerciseId,
    pub exercise_name: String,
    pub weight_kg: f64,
    /// `None` when the exercise had no prior completed working set.
    pub previous_best_kg: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FinishedWorkout {
    pub workout: Workout,
    pub new_records: Vec<NewRecord>,
    pub completed_goals: Vec<Goal>,
}

/// Workout service facade over workout and exercise repositories.
pub struct WorkoutService<W: WorkoutRepository, E: ExerciseRepository> {
    workouts: W,
    exercises: E,
}

impl<W: WorkoutRepository, E: ExerciseRepository> WorkoutService<W, E> {
    pub fn new(workouts: W, exercises: E) -> Self {
        Self {
            workouts,
            exercises,
        }
    }

    pub fn active_workout(&self) -> WorkoutServiceResult<Option<Workout>> {
        Ok(self.workouts.active_workout()?)
    }

    pub fn list_workouts(&self, query: &WorkoutListQuery) -> WorkoutServiceResult<Vec<Workout>> {
        Ok(self.workouts.list_workouts(query)?)
    }

    /// Starts an empty session. Fails when another session is in progress.
    pub fn start_workout(&self, name: &str, started_at: i64) -> WorkoutServiceResult<Workout> {
        self.ensure_no_active()?;
        let workout = Workout::new(name, started_at);
        self.workouts.create_workout(&workout)?;
        info!(
            "event=workout_start module=service status=ok workout_id={}",
            workout.id
        );
        Ok(workout)
    }

    /// Starts a session pre-filled with the template's exercises and planned
    /// sets, then records the template as used. Either all of it is stored
    /// or none of it.
    pub fn start_from_template<T: TemplateRepository>(
        &self,
        templates: &T,
        template_id: TemplateId,
        started_at: i64,
    ) -> WorkoutServiceResult<WorkoutDetail> {
        self.ensure_no_active()?;
        let template = templates
            .get_template(template_id)?
            .ok_or(WorkoutServiceError::TemplateNotFound(template_id))?;

        let mut workout = Workout::new(template.name.as_str(), started_at);
        workout.template_id = Some(template.id);

        let mut rows = template.exercises.clone();
        rows.sort_by_key(|row| row.position);
        self.workouts.atomically(|| {
            self.workouts.create_workout(&workout)?;
            for (position, row) in rows.iter().enumerate() {
                let position = u32::try_from(position)
                    .map_err(|_| WorkoutServiceError::InconsistentState("template too large"))?;
                let instance = ExerciseInstance::new(workout.id, row.exercise_id, position);
                self.workouts.add_instance(&instance)?;
                for set_number in 1..=row.target_sets {
                    let set = ExerciseSet::planned(
                        instance.id,
                        set_number,
                        row.target_weight_kg.unwrap_or(0.0),
                        row.target_reps,
                    );
                    self.workouts.add_set(&set)?;
                }
            }
            templates.mark_used(template.id, started_at)?;
            Ok::<_, WorkoutServiceError>(())
        })?;

        info!(
            "event=workout_start module=service status=ok workout_id={} from_template=true",
            workout.id
        );
        self.workout_detail(workout.id)
    }

    /// Appends an exercise at the next position of the workout.
    pub fn add_exercise(
        &self,
        workout_id: WorkoutId,
        exercise_id: ExerciseId,
    ) -> WorkoutServiceResult<ExerciseInstance> {
        self.require_workout(workout_id)?;
        if self.exercises.get_exercise(exercise_id)?.is_none() {
            return Err(WorkoutServiceError::ExerciseNotFound(exercise_id));
        }
        let position = self.workouts.next_position(workout_id)?;
        let instance = ExerciseInstance::new(workout_id, exercise_id, position);
        self.workouts.add_instance(&instance)?;
        Ok(instance)
    }

    /// Removes an exercise with its sets; later positions shift down.
    pub fn remove_exercise(&self, instance_id: InstanceId) -> WorkoutServiceResult<()> {
        let instance = self.require_instance(instance_id)?;
        self.workouts.delete_instance(instance_id)?;
        self.refresh_totals_if_finished(instance.workout_id)
    }

    /// Logs a performed set as the next set of the instance, completed at `at`.
    pub fn log_set(
        &self,
        instance_id: InstanceId,
        request: LogSetRequest,
        at: i64,
    ) -> WorkoutServiceResult<ExerciseSet> {
        let instance = self.require_instance(instance_id)?;
        let set_number = self.workouts.next_set_number(instance_id)?;
        let mut set = ExerciseSet::planned(instance_id, set_number, request.weight_kg, request.reps);
        set.rpe = request.rpe;
        set.set_type = request.set_type;
        set.complete(at);
        set.validate()?;

        self.workouts.add_set(&set)?;
        self.refresh_totals_if_finished(instance.workout_id)?;
        Ok(set)
    }

    /// Parses free text such as `100x5` or `225lb x 3 @8` and logs it.
    pub fn quick_log_set(
        &self,
        instance_id: InstanceId,
        text: &str,
        default_unit: WeightUnit,
        at: i64,
    ) -> WorkoutServiceResult<ExerciseSet> {
        let entry = parse_set_entry(text, default_unit)?;
        self.log_set(
            instance_id,
            LogSetRequest {
                weight_kg: entry.weight_kg,
                reps: entry.reps,
                rpe: entry.rpe,
                set_type: SetType::Working,
            },
            at,
        )
    }

    pub fn complete_set(&self, set_id: SetId, at: i64) -> WorkoutServiceResult<ExerciseSet> {
        let mut set = self
            .workouts
            .get_set(set_id)?
            .ok_or(WorkoutServiceError::SetNotFound(set_id))?;
        if set.is_completed {
            return Ok(set);
        }
        set.complete(at);
        self.workouts.update_set(&set)?;
        self.refresh_totals_for_instance(set.instance_id)?;
        Ok(set)
    }

    /// Updates load, reps, RPE, type and completion of an existing set.
    ///
    /// Instance and set number are kept from the stored row.
    pub fn update_set(&self, set: &ExerciseSet) -> WorkoutServiceResult<ExerciseSet> {
        let stored = self
            .workouts
            .get_set(set.id)?
            .ok_or(WorkoutServiceError::SetNotFound(set.id))?;
        let updated = ExerciseSet {
            instance_id: stored.instance_id,
            set_number: stored.set_number,
            ..set.clone()
        };
        updated.validate()?;
        self.workouts.update_set(&updated)?;
        self.refresh_totals_for_instance(updated.instance_id)?;
        Ok(updated)
    }

    /// Deletes a set; remaining sets of the instance are re-numbered `1..n`.
    pub fn delete_set(&self, set_id: SetId) -> WorkoutServiceResult<()> {
        let set = self
            .workouts
            .get_set(set_id)?
            .ok_or(WorkoutServiceError::SetNotFound(set_id))?;
        self.workouts.delete_set(set_id)?;
        self.refresh_totals_for_instance(set.instance_id)
    }

    /// Ends a session, stores its aggregates and updates PR goals.
    pub fn finish_workout<G: GoalRepository>(
        &self,
        workout_id: WorkoutId,
        ended_at: i64,
        goals: &GoalService<G>,
    ) -> WorkoutServiceResult<FinishedWorkout> {
        let mut workout = self.require_workout(workout_id)?;
        if !workout.is_active() {
            return Err(WorkoutServiceError::AlreadyFinished(workout_id));
        }

        let sets = self.workouts.list_workout_sets(workout_id)?;
        workout.ended_at = Some(ended_at);
        workout.apply_totals(WorkoutTotals::from_sets(&sets));
        workout.validate()?;
        self.workouts.update_workout(&workout)?;

        let bests = self.session_bests(workout_id)?;
        let mut new_records = Vec::new();
        let mut completed_goals = Vec::new();
        for (exercise_id, best_weight) in bests {
            let previous_best = self
                .workouts
                .logged_sets(Some(exercise_id), None)?
                .into_iter()
                .filter(|logged| logged.workout_id != workout_id)
                .filter(|logged| logged.set.counts_toward_totals())
                .map(|logged| logged.set.weight_kg)
                .fold(None, |best: Option<f64>, weight| {
                    Some(best.map_or(weight, |best| best.max(weight)))
                });

            if best_weight > 0.0 && previous_best.map_or(true, |previous| best_weight > previous) {
                let exercise_name = self
                    .exercises
                    .get_exercise(exercise_id)?
                    .map(|exercise| exercise.name)
                    .unwrap_or_default();
                new_records.push(NewRecord {
                    exercise_id,
                    exercise_name,
                    weight_kg: best_weight,
                    previous_best_kg: previous_best,
                });
            }

            match goals.apply_personal_records(exercise_id, best_weight, ended_at) {
                Ok(mut completed) => completed_goals.append(&mut completed),
                Err(err) => warn!(
                    "event=goal_update module=service status=error workout_id={workout_id} exercise_id={exercise_id} error={err}"
                ),
            }
        }

        info!(
            "event=workout_finish module=service status=ok workout_id={workout_id} sets={} records={}",
            workout.total_sets,
            new_records.len()
        );
        Ok(FinishedWorkout {
            workout,
            new_records,
            completed_goals,
        })
    }

    /// Deletes a workout with all its exercises and sets.
    pub fn discard_workout(&self, workout_id: WorkoutId) -> WorkoutServiceResult<()> {
        self.workouts.delete_workout(workout_id)?;
        info!("event=workout_discard module=service status=ok workout_id={workout_id}");
        Ok(())
    }

    pub fn workout_detail(&self, workout_id: WorkoutId) -> WorkoutServiceResult<WorkoutDetail> {
        let workout = self.require_workout(workout_id)?;
        let mut exercises = Vec::new();
        let mut all_sets = Vec::new();
        for instance in self.workouts.list_instances(workout_id)? {
            let exercise = self
                .exercises
                .get_exercise(instance.exercise_id)?
                .ok_or(WorkoutServiceError::InconsistentState(
                    "instance references a missing exercise",
                ))?;
            let sets = self.workouts.list_sets(instance.id)?;
            all_sets.extend(sets.iter().cloned());
            exercises.push(InstanceDetail {
                instance,
                exercise,
                sets,
            });
        }
        Ok(WorkoutDetail {
            workout,
            exercises,
            live_totals: WorkoutTotals::from_sets(&all_sets),
        })
    }

    fn ensure_no_active(&self) -> WorkoutServiceResult<()> {
        match self.workouts.active_workout()? {
            Some(active) => Err(WorkoutServiceError::AlreadyActive(active.id)),
            None => Ok(()),
        }
    }

    fn require_workout(&self, workout_id: WorkoutId) -> WorkoutServiceResult<Workout> {
        self.workouts
            .get_workout(workout_id)?
            .ok_or(WorkoutServiceError::WorkoutNotFound(workout_id))
    }

    fn require_instance(&self, instance_id: InstanceId) -> WorkoutServiceResult<ExerciseInstance> {
        self.workouts
            .get_instance(instance_id)?
            .ok_or(WorkoutServiceError::InstanceNotFound(instance_id))
    }

    /// Heaviest counted weight per exercise within one workout.
    fn session_bests(&self, workout_id: WorkoutId) -> WorkoutServiceResult<BTreeMap<ExerciseId, f64>> {
        let mut bests: BTreeMap<ExerciseId, f64> = BTreeMap::new();
        for instance in self.workouts.list_instances(workout_id)? {
            for set in self.workouts.list_sets(instance.id)? {
                if !set.counts_toward_totals() {
                    continue;
                }
                let best = bests.entry(instance.exercise_id).or_insert(set.weight_kg);
                *best = best.max(set.weight_kg);
            }
        }
        Ok(bests)
    }

    fn refresh_totals_for_instance(&self, instance_id: InstanceId) -> WorkoutServiceResult<()> {
        let instance = self.require_instance(instance_id)?;
        self.refresh_totals_if_finished(instance.workout_id)
    }

    fn refresh_totals_if_finished(&self, workout_id: WorkoutId) -> WorkoutServiceResult<()> {
        let mut workout = self.require_workout(workout_id)?;
        if workout.is_active() {
            return Ok(());
        }
        let totals = WorkoutTotals::from_sets(&self.workouts.list_workout_sets(workout_id)?);
        if !workout.totals().matches(&totals) {
            workout.apply_totals(totals);
            self.workouts.update_workout(&workout)?;
        }
        Ok(())
    }
}
