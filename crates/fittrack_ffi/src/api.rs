//! FFI use-case API for Flutter-facing calls.
//!
//! # Responsibility
//! - Expose stable, use-case-level functions to Dart via FRB.
//! - Flatten core records into view structs (IDs and enums as strings).
//!
//! # Invariants
//! - Exported functions must not panic across FFI boundary.
//! - Every response carries `ok` and a human-readable `message`; payload
//!   fields are empty or `None` when `ok == false`.
//! - Configuration is resolved once per process from `FITTRACK_*` variables;
//!   an invalid value fails every database call with `ok == false`.

use fittrack_core::db::open_db;
use fittrack_core::repo::exercise_repo::SqliteExerciseRepository;
use fittrack_core::repo::goal_repo::SqliteGoalRepository;
use fittrack_core::repo::integrity::{self, IntegrityIssue};
use fittrack_core::repo::profile_repo::SqliteProfileRepository;
use fittrack_core::repo::template_repo::SqliteTemplateRepository;
use fittrack_core::repo::workout_repo::{SqliteWorkoutRepository, WorkoutRepository};
use fittrack_core::service::exercise_service::ExerciseService;
use fittrack_core::service::goal_service::{GoalService, NewGoal};
use fittrack_core::service::profile_service::ProfileService;
use fittrack_core::service::template_service::TemplateService;
use fittrack_core::service::workout_service::{FinishedWorkout, WorkoutDetail};
use fittrack_core::{
    core_version as core_version_inner, init_logging as init_logging_inner, now_epoch_ms,
    ping as ping_inner, AnalyticsService, ConfigError, CoreConfig, DashboardSummary, Exercise,
    Goal, GoalType, LogSetRequest, SetType, WeightEntry, WeightUnit, WorkoutService,
};
use log::error;
use rusqlite::Connection;
use std::error::Error;
use std::sync::{Mutex, OnceLock};
use uuid::Uuid;

const WEIGHT_HISTORY_DEFAULT_LIMIT: u32 = 30;
const WEIGHT_HISTORY_LIMIT_MAX: u32 = 365;
const WEIGHT_TREND_WINDOW: u32 = 7;

static CONFIG: OnceLock<Result<CoreConfig, ConfigError>> = OnceLock::new();
static CATALOG_SEEDED: Mutex<bool> = Mutex::new(false);

type FfiResult<T> = Result<T, Box<dyn Error>>;

/// Minimal health-check API for FRB smoke integration.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Expose core crate version through FFI.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// Input semantics:
/// - `level`: one of `trace|debug|info|warn|error` (case-insensitive).
/// - `log_dir`: absolute directory path where rolling logs are written.
///
/// # FFI contract
/// - Safe to call repeatedly with the same `level + log_dir` (idempotent).
/// - Never panics; returns empty string on success and error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err,
    }
}

/// One logged set.
#[derive(Debug, Clone, PartialEq)]
pub struct SetView {
    pub set_id: String,
    pub set_number: u32,
    pub weight_kg: f64,
    pub reps: u32,
    pub rpe: Option<f64>,
    /// `warmup|working|drop|failure`.
    pub set_type: String,
    pub is_completed: bool,
}

/// One exercise inside a workout, with its sets.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkoutExerciseView {
    pub instance_id: String,
    pub exercise_id: String,
    pub exercise_name: String,
    pub sets: Vec<SetView>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WorkoutView {
    pub workout_id: String,
    pub name: String,
    pub started_at: i64,
    pub ended_at: Option<i64>,
    /// Live totals for active workouts, stored totals once finished.
    pub total_volume: f64,
    pub total_sets: u32,
    pub total_reps: u32,
    pub exercises: Vec<WorkoutExerciseView>,
}

/// Response envelope for calls that return a workout.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkoutResponse {
    pub ok: bool,
    pub message: String,
    pub workout: Option<WorkoutView>,
}

impl WorkoutResponse {
    fn from_result(op: &str, success: &str, result: FfiResult<Option<WorkoutDetail>>) -> Self {
        match result {
            Ok(detail) => Self {
                ok: true,
                message: success.to_string(),
                workout: detail.map(to_workout_view),
            },
            Err(err) => Self {
                ok: false,
                message: format!("{op} failed: {err}"),
                workout: None,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewRecordView {
    pub exercise_name: String,
    pub weight_kg: f64,
    pub previous_best_kg: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FinishWorkoutResponse {
    pub ok: bool,
    pub message: String,
    pub workout: Option<WorkoutView>,
    pub new_records: Vec<NewRecordView>,
    /// Titles of goals completed by this session.
    pub completed_goals: Vec<String>,
}

/// Generic action response envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionResponse {
    pub ok: bool,
    /// ID of the created or affected record, when any.
    pub id: Option<String>,
    pub message: String,
}

impl ActionResponse {
    fn from_result(op: &str, success: &str, result: FfiResult<Option<Uuid>>) -> Self {
        match result {
            Ok(id) => Self {
                ok: true,
                id: id.map(|id| id.to_string()),
                message: success.to_string(),
            },
            Err(err) => Self {
                ok: false,
                id: None,
                message: format!("{op} failed: {err}"),
            },
        }
    }
}

/// Response carrying a text document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextResponse {
    pub ok: bool,
    pub message: String,
    pub text: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GoalView {
    pub goal_id: String,
    pub title: String,
    /// `personal_record|body_weight|consistency|volume`.
    pub goal_type: String,
    /// `active|completed|abandoned`.
    pub status: String,
    pub current_value: f64,
    pub target_value: f64,
    pub progress_percent: f64,
    pub deadline: Option<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GoalListResponse {
    pub ok: bool,
    pub message: String,
    pub goals: Vec<GoalView>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordView {
    pub exercise_name: String,
    pub heaviest_weight_kg: f64,
    pub best_estimated_one_rep_max: f64,
    pub achieved_at: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardView {
    pub total_workouts: u32,
    pub workouts_this_week: u32,
    pub weekly_target: u32,
    pub current_daily_streak: u32,
    pub longest_daily_streak: u32,
    pub current_weekly_streak: u32,
    pub volume_this_week: f64,
    /// `up|down|stable`.
    pub volume_trend: String,
    pub volume_change_percent: f64,
    /// `not_significant|marginal|significant|highly_significant`.
    pub significance: String,
    pub records: Vec<RecordView>,
    pub latest_weight_kg: Option<f64>,
    pub weight_trend: String,
    pub active_goals: Vec<GoalView>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardResponse {
    pub ok: bool,
    pub message: String,
    pub dashboard: Option<DashboardView>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CalendarDayView {
    /// ISO date `YYYY-MM-DD`.
    pub date: String,
    pub workout_count: u32,
    pub total_volume: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CalendarResponse {
    pub ok: bool,
    pub message: String,
    pub days: Vec<CalendarDayView>,
    pub total_workouts: u32,
    pub total_volume: f64,
    pub active_days: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WeightEntryView {
    pub entry_id: String,
    pub weight_kg: f64,
    pub recorded_at: i64,
    pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WeightHistoryResponse {
    pub ok: bool,
    pub message: String,
    pub entries: Vec<WeightEntryView>,
    /// Trend over the latest entries: `up|down|stable`.
    pub trend: String,
    pub change_kg: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TemplateView {
    pub template_id: String,
    pub name: String,
    pub description: Option<String>,
    pub exercise_count: u32,
    pub planned_sets: u32,
    pub times_used: u32,
    pub last_used_at: Option<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TemplateListResponse {
    pub ok: bool,
    pub message: String,
    pub templates: Vec<TemplateView>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExerciseView {
    pub exercise_id: String,
    pub name: String,
    pub category: String,
    /// Comma-separated muscle groups.
    pub muscle_groups: String,
    pub equipment: String,
    pub is_custom: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExerciseListResponse {
    pub ok: bool,
    pub message: String,
    pub items: Vec<ExerciseView>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntegrityIssueView {
    /// `orphan_set|orphan_instance|set_number_gap|instance_position_gap|
    /// aggregate_mismatch|invalid_time_range`.
    pub kind: String,
    pub subject_id: String,
    pub repairable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntegrityResponse {
    pub ok: bool,
    pub message: String,
    pub issues: Vec<IntegrityIssueView>,
    /// Rows changed by a repair; 0 for a check.
    pub changes: u32,
}

/// Returns the in-progress workout, if any.
#[flutter_rust_bridge::frb(sync)]
pub fn workout_active() -> WorkoutResponse {
    let result = with_session(|session| {
        let service = session.workouts()?;
        match service.active_workout()? {
            Some(workout) => Ok(Some(service.workout_detail(workout.id)?)),
            None => Ok(None),
        }
    });
    WorkoutResponse::from_result("workout_active", "Active workout loaded.", result)
}

/// Starts an empty workout now.
///
/// # FFI contract
/// - Fails when another workout is still in progress.
#[flutter_rust_bridge::frb(sync)]
pub fn workout_start(name: String) -> WorkoutResponse {
    let result = with_session(|session| {
        let service = session.workouts()?;
        let workout = service.start_workout(name.trim(), now_epoch_ms())?;
        Ok(Some(service.workout_detail(workout.id)?))
    });
    WorkoutResponse::from_result("workout_start", "Workout started.", result)
}

/// Starts a workout pre-filled with a template's planned sets.
#[flutter_rust_bridge::frb(sync)]
pub fn workout_start_from_template(template_id: String) -> WorkoutResponse {
    let result = with_session(|session| {
        let template_id = parse_id("template_id", &template_id)?;
        let templates = SqliteTemplateRepository::try_new(&session.conn)?;
        let detail =
            session
                .workouts()?
                .start_from_template(&templates, template_id, now_epoch_ms())?;
        Ok(Some(detail))
    });
    WorkoutResponse::from_result("workout_start_from_template", "Workout started.", result)
}

#[flutter_rust_bridge::frb(sync)]
pub fn workout_add_exercise(workout_id: String, exercise_id: String) -> WorkoutResponse {
    let result = with_session(|session| {
        let workout_id = parse_id("workout_id", &workout_id)?;
        let exercise_id = parse_id("exercise_id", &exercise_id)?;
        let service = session.workouts()?;
        service.add_exercise(workout_id, exercise_id)?;
        Ok(Some(service.workout_detail(workout_id)?))
    });
    WorkoutResponse::from_result("workout_add_exercise", "Exercise added.", result)
}

/// Logs a completed set on an exercise instance.
///
/// Input semantics:
/// - `weight_kg` is always kilograms.
/// - `set_type`: `warmup|working|drop|failure`; `None` means `working`.
#[flutter_rust_bridge::frb(sync)]
pub fn workout_log_set(
    instance_id: String,
    weight_kg: f64,
    reps: u32,
    rpe: Option<f64>,
    set_type: Option<String>,
) -> WorkoutResponse {
    let result = with_session(|session| {
        let instance_id = parse_id("instance_id", &instance_id)?;
        let set_type = match set_type.as_deref().map(str::trim) {
            None | Some("") => SetType::Working,
            Some(raw) => SetType::parse(raw).ok_or_else(|| format!("unknown set_type `{raw}`"))?,
        };
        let service = session.workouts()?;
        let request = LogSetRequest {
            weight_kg,
            reps,
            rpe,
            set_type,
        };
        service.log_set(instance_id, request, now_epoch_ms())?;
        session.detail_of_instance(&service, instance_id)
    });
    WorkoutResponse::from_result("workout_log_set", "Set logged.", result)
}

/// Logs a set from free text such as `100x5`, `225 lb x 3 @8` or `12 reps`.
///
/// Loads without a unit use the profile's display unit.
#[flutter_rust_bridge::frb(sync)]
pub fn workout_quick_log_set(instance_id: String, text: String) -> WorkoutResponse {
    let result = with_session(|session| {
        let instance_id = parse_id("instance_id", &instance_id)?;
        let unit = session.profile()?.get_profile()?.weight_unit;
        let service = session.workouts()?;
        service.quick_log_set(instance_id, &text, unit, now_epoch_ms())?;
        session.detail_of_instance(&service, instance_id)
    });
    WorkoutResponse::from_result("workout_quick_log_set", "Set logged.", result)
}

/// Deletes a set; the remaining sets are re-numbered.
#[flutter_rust_bridge::frb(sync)]
pub fn workout_delete_set(workout_id: String, set_id: String) -> WorkoutResponse {
    let result = with_session(|session| {
        let workout_id = parse_id("workout_id", &workout_id)?;
        let set_id = parse_id("set_id", &set_id)?;
        let service = session.workouts()?;
        service.delete_set(set_id)?;
        Ok(Some(service.workout_detail(workout_id)?))
    });
    WorkoutResponse::from_result("workout_delete_set", "Set deleted.", result)
}

/// Finishes a workout now, reporting new records and completed goals.
#[flutter_rust_bridge::frb(sync)]
pub fn workout_finish(workout_id: String) -> FinishWorkoutResponse {
    let result = with_session(|session| {
        let workout_id = parse_id("workout_id", &workout_id)?;
        let service = session.workouts()?;
        let goals = GoalService::new(SqliteGoalRepository::try_new(&session.conn)?);
        let finished = service.finish_workout(workout_id, now_epoch_ms(), &goals)?;
        let detail = service.workout_detail(workout_id)?;
        Ok((finished, detail))
    });
    match result {
        Ok((finished, detail)) => finish_response(finished, detail),
        Err(err) => FinishWorkoutResponse {
            ok: false,
            message: format!("workout_finish failed: {err}"),
            workout: None,
            new_records: Vec::new(),
            completed_goals: Vec::new(),
        },
    }
}

/// Deletes a workout with all its exercises and sets.
#[flutter_rust_bridge::frb(sync)]
pub fn workout_discard(workout_id: String) -> ActionResponse {
    let result = with_session(|session| {
        let workout_id = parse_id("workout_id", &workout_id)?;
        session.workouts()?.discard_workout(workout_id)?;
        Ok(Some(workout_id))
    });
    ActionResponse::from_result("workout_discard", "Workout discarded.", result)
}

#[flutter_rust_bridge::frb(sync)]
pub fn workout_detail(workout_id: String) -> WorkoutResponse {
    let result = with_session(|session| {
        let workout_id = parse_id("workout_id", &workout_id)?;
        Ok(Some(session.workouts()?.workout_detail(workout_id)?))
    });
    WorkoutResponse::from_result("workout_detail", "Workout loaded.", result)
}

/// Loads the home dashboard as of now.
#[flutter_rust_bridge::frb(sync)]
pub fn dashboard_load() -> DashboardResponse {
    match with_session(|session| Ok(session.analytics()?.dashboard(now_epoch_ms())?)) {
        Ok(summary) => DashboardResponse {
            ok: true,
            message: "Dashboard loaded.".to_string(),
            dashboard: Some(to_dashboard_view(summary)),
        },
        Err(err) => DashboardResponse {
            ok: false,
            message: format!("dashboard_load failed: {err}"),
            dashboard: None,
        },
    }
}

/// Month grid of finished workouts; `month` is 1-based.
#[flutter_rust_bridge::frb(sync)]
pub fn calendar_month(year: i32, month: u32) -> CalendarResponse {
    let result = with_session(|session| {
        session
            .analytics()?
            .month_calendar(year, month)?
            .ok_or_else(|| format!("invalid month {year}-{month}").into())
    });
    match result {
        Ok(calendar) => CalendarResponse {
            ok: true,
            message: format!("{} workout(s) this month.", calendar.total_workouts),
            days: calendar
                .days
                .into_iter()
                .map(|day| CalendarDayView {
                    date: day.date.format("%Y-%m-%d").to_string(),
                    workout_count: day.workout_count,
                    total_volume: day.total_volume,
                })
                .collect(),
            total_workouts: calendar.total_workouts,
            total_volume: calendar.total_volume,
            active_days: calendar.active_days,
        },
        Err(err) => CalendarResponse {
            ok: false,
            message: format!("calendar_month failed: {err}"),
            days: Vec::new(),
            total_workouts: 0,
            total_volume: 0.0,
            active_days: 0,
        },
    }
}

/// Records body weight now.
///
/// Input semantics:
/// - `unit`: `kg|lb`; the value is stored in kilograms.
#[flutter_rust_bridge::frb(sync)]
pub fn weight_log(weight: f64, unit: String, note: Option<String>) -> ActionResponse {
    let result = with_session(|session| {
        let unit = WeightUnit::parse(&unit).ok_or_else(|| format!("unknown unit `{unit}`"))?;
        let entry =
            session
                .profile()?
                .log_weight(unit.to_kg(weight), now_epoch_ms(), note.as_deref())?;
        Ok(Some(entry.id))
    });
    ActionResponse::from_result("weight_log", "Weight logged.", result)
}

/// Newest entries first, plus the short-term trend.
#[flutter_rust_bridge::frb(sync)]
pub fn weight_history(limit: Option<u32>) -> WeightHistoryResponse {
    let limit = normalize_weight_limit(limit);
    let result = with_session(|session| {
        let profile = session.profile()?;
        Ok((profile.weight_history(Some(limit))?, profile.weight_trend(WEIGHT_TREND_WINDOW)?))
    });
    match result {
        Ok((entries, trend)) => WeightHistoryResponse {
            ok: true,
            message: format!("{} entr(ies).", entries.len()),
            entries: entries.into_iter().map(to_weight_entry_view).collect(),
            trend: trend.direction.as_str().to_string(),
            change_kg: trend.change_kg,
        },
        Err(err) => WeightHistoryResponse {
            ok: false,
            message: format!("weight_history failed: {err}"),
            entries: Vec::new(),
            trend: String::new(),
            change_kg: 0.0,
        },
    }
}

/// Creates a goal.
///
/// Input semantics:
/// - `goal_type`: `personal_record|body_weight|consistency|volume`.
/// - `exercise_id` is required for `personal_record`.
#[flutter_rust_bridge::frb(sync)]
pub fn goal_create(
    title: String,
    goal_type: String,
    exercise_id: Option<String>,
    start_value: f64,
    target_value: f64,
    deadline: Option<i64>,
) -> ActionResponse {
    let result = with_session(|session| {
        let goal_type = GoalType::parse(goal_type.trim())
            .ok_or_else(|| format!("unknown goal_type `{goal_type}`"))?;
        let exercise_id = exercise_id
            .as_deref()
            .map(|raw| parse_id("exercise_id", raw))
            .transpose()?;
        let goals = GoalService::new(SqliteGoalRepository::try_new(&session.conn)?);
        let goal = goals.create_goal(
            NewGoal {
                title,
                goal_type,
                exercise_id,
                start_value,
                target_value,
                deadline,
            },
            now_epoch_ms(),
        )?;
        Ok(Some(goal.id))
    });
    ActionResponse::from_result("goal_create", "Goal created.", result)
}

/// Refreshes progress of active goals, then lists every goal newest first.
#[flutter_rust_bridge::frb(sync)]
pub fn goals_list() -> GoalListResponse {
    let result = with_session(|session| {
        let goals = GoalService::new(SqliteGoalRepository::try_new(&session.conn)?);
        goals.refresh_progress(
            &SqliteWorkoutRepository::try_new(&session.conn)?,
            &SqliteProfileRepository::try_new(&session.conn)?,
            session.config.calendar(),
            now_epoch_ms(),
        )?;
        Ok(goals.list_goals(None)?)
    });
    match result {
        Ok(goals) => GoalListResponse {
            ok: true,
            message: format!("{} goal(s).", goals.len()),
            goals: goals.iter().map(to_goal_view).collect(),
        },
        Err(err) => GoalListResponse {
            ok: false,
            message: format!("goals_list failed: {err}"),
            goals: Vec::new(),
        },
    }
}

#[flutter_rust_bridge::frb(sync)]
pub fn template_list() -> TemplateListResponse {
    match with_session(|session| Ok(session.templates()?.list_templates()?)) {
        Ok(templates) => TemplateListResponse {
            ok: true,
            message: format!("{} template(s).", templates.len()),
            templates: templates
                .into_iter()
                .map(|template| TemplateView {
                    template_id: template.id.to_string(),
                    exercise_count: u32::try_from(template.exercises.len()).unwrap_or(u32::MAX),
                    planned_sets: template.planned_set_count(),
                    name: template.name,
                    description: template.description,
                    times_used: template.times_used,
                    last_used_at: template.last_used_at,
                })
                .collect(),
        },
        Err(err) => TemplateListResponse {
            ok: false,
            message: format!("template_list failed: {err}"),
            templates: Vec::new(),
        },
    }
}

/// Serializes a template into the portable JSON document.
#[flutter_rust_bridge::frb(sync)]
pub fn template_export(template_id: String) -> TextResponse {
    let result = with_session(|session| {
        let template_id = parse_id("template_id", &template_id)?;
        Ok(session.templates()?.export_json(template_id)?)
    });
    match result {
        Ok(json) => TextResponse {
            ok: true,
            message: "Template exported.".to_string(),
            text: Some(json),
        },
        Err(err) => TextResponse {
            ok: false,
            message: format!("template_export failed: {err}"),
            text: None,
        },
    }
}

/// Imports a template document; unknown exercises are created as custom.
#[flutter_rust_bridge::frb(sync)]
pub fn template_import(json: String) -> ActionResponse {
    let result = with_session(|session| {
        let template = session.templates()?.import_json(&json, now_epoch_ms())?;
        Ok(Some(template.id))
    });
    ActionResponse::from_result("template_import", "Template imported.", result)
}

/// Case-insensitive name search; blank text lists the whole catalog.
#[flutter_rust_bridge::frb(sync)]
pub fn exercise_search(text: String) -> ExerciseListResponse {
    let result = with_session(|session| {
        let service = ExerciseService::new(SqliteExerciseRepository::try_new(&session.conn)?);
        Ok(service.search(text.trim())?)
    });
    match result {
        Ok(exercises) => {
            let message = if exercises.is_empty() {
                "No results.".to_string()
            } else {
                format!("Found {} result(s).", exercises.len())
            };
            ExerciseListResponse {
                ok: true,
                message,
                items: exercises.into_iter().map(to_exercise_view).collect(),
            }
        }
        Err(err) => ExerciseListResponse {
            ok: false,
            message: format!("exercise_search failed: {err}"),
            items: Vec::new(),
        },
    }
}

/// Scans workout history for structural problems without changing it.
#[flutter_rust_bridge::frb(sync)]
pub fn integrity_check() -> IntegrityResponse {
    match with_session(|session| Ok(integrity::validate(&session.conn)?)) {
        Ok(report) => IntegrityResponse {
            ok: true,
            message: if report.is_clean() {
                "No issues found.".to_string()
            } else {
                format!(
                    "{} issue(s), {} repairable.",
                    report.issues.len(),
                    report.repairable_count()
                )
            },
            issues: report.issues.iter().map(to_issue_view).collect(),
            changes: 0,
        },
        Err(err) => integrity_failure("integrity_check", err),
    }
}

/// Repairs every repairable issue, then reports what remains.
#[flutter_rust_bridge::frb(sync)]
pub fn integrity_repair() -> IntegrityResponse {
    let result = with_session(|session| {
        let summary = integrity::repair(&session.conn)?;
        let remaining = integrity::validate(&session.conn)?;
        Ok((summary, remaining))
    });
    match result {
        Ok((summary, remaining)) => IntegrityResponse {
            ok: true,
            message: format!(
                "{} change(s), {} issue(s) left.",
                summary.total_changes(),
                remaining.issues.len()
            ),
            issues: remaining.issues.iter().map(to_issue_view).collect(),
            changes: summary.total_changes(),
        },
        Err(err) => integrity_failure("integrity_repair", err),
    }
}

/// One open connection plus the process configuration.
struct Session {
    conn: Connection,
    config: &'static CoreConfig,
}

impl Session {
    fn workouts(
        &self,
    ) -> FfiResult<WorkoutService<SqliteWorkoutRepository<'_>, SqliteExerciseRepository<'_>>> {
        Ok(WorkoutService::new(
            SqliteWorkoutRepository::try_new(&self.conn)?,
            SqliteExerciseRepository::try_new(&self.conn)?,
        ))
    }

    fn profile(&self) -> FfiResult<ProfileService<SqliteProfileRepository<'_>>> {
        Ok(ProfileService::new(SqliteProfileRepository::try_new(
            &self.conn,
        )?))
    }

    fn templates(
        &self,
    ) -> FfiResult<TemplateService<SqliteTemplateRepository<'_>, SqliteExerciseRepository<'_>>>
    {
        Ok(TemplateService::new(
            SqliteTemplateRepository::try_new(&self.conn)?,
            SqliteExerciseRepository::try_new(&self.conn)?,
        ))
    }

    fn analytics(
        &self,
    ) -> FfiResult<
        AnalyticsService<
            SqliteWorkoutRepository<'_>,
            SqliteExerciseRepository<'_>,
            SqliteProfileRepository<'_>,
            SqliteGoalRepository<'_>,
        >,
    > {
        Ok(AnalyticsService::new(
            SqliteWorkoutRepository::try_new(&self.conn)?,
            SqliteExerciseRepository::try_new(&self.conn)?,
            SqliteProfileRepository::try_new(&self.conn)?,
            SqliteGoalRepository::try_new(&self.conn)?,
            self.config.calendar(),
        ))
    }

    fn detail_of_instance(
        &self,
        service: &WorkoutService<SqliteWorkoutRepository<'_>, SqliteExerciseRepository<'_>>,
        instance_id: Uuid,
    ) -> FfiResult<Option<WorkoutDetail>> {
        let instance = SqliteWorkoutRepository::try_new(&self.conn)?
            .get_instance(instance_id)?
            .ok_or_else(|| format!("exercise instance not found: {instance_id}"))?;
        Ok(Some(service.workout_detail(instance.workout_id)?))
    }
}

fn resolve_config() -> FfiResult<&'static CoreConfig> {
    CONFIG
        .get_or_init(|| load_config(|name| std::env::var(name).ok()))
        .as_ref()
        .map_err(|err| err.clone().into())
}

fn load_config(lookup: impl Fn(&str) -> Option<String>) -> Result<CoreConfig, ConfigError> {
    CoreConfig::from_lookup(lookup).map_err(|err| {
        error!("event=config_load module=ffi status=error error={err}");
        err
    })
}

fn with_session<T>(f: impl FnOnce(&Session) -> FfiResult<T>) -> FfiResult<T> {
    let config = resolve_config()?;
    let conn = open_db(&config.db_path)?;
    ensure_catalog(&conn)?;
    f(&Session { conn, config })
}

/// Seeds the built-in exercise catalog once per process.
fn ensure_catalog(conn: &Connection) -> FfiResult<()> {
    let mut seeded = CATALOG_SEEDED
        .lock()
        .map_err(|_| "catalog seed lock poisoned".to_string())?;
    if !*seeded {
        ExerciseService::new(SqliteExerciseRepository::try_new(conn)?).ensure_default_catalog()?;
        *seeded = true;
    }
    Ok(())
}

fn parse_id(field: &str, raw: &str) -> FfiResult<Uuid> {
    Uuid::parse_str(raw.trim()).map_err(|_| format!("invalid {field} `{raw}`").into())
}

fn normalize_weight_limit(limit: Option<u32>) -> u32 {
    match limit {
        Some(0) | None => WEIGHT_HISTORY_DEFAULT_LIMIT,
        Some(value) => value.min(WEIGHT_HISTORY_LIMIT_MAX),
    }
}

fn to_workout_view(detail: WorkoutDetail) -> WorkoutView {
    let totals = if detail.workout.is_active() {
        detail.live_totals
    } else {
        detail.workout.totals()
    };
    WorkoutView {
        workout_id: detail.workout.id.to_string(),
        name: detail.workout.name,
        started_at: detail.workout.started_at,
        ended_at: detail.workout.ended_at,
        total_volume: totals.volume,
        total_sets: totals.sets,
        total_reps: totals.reps,
        exercises: detail
            .exercises
            .into_iter()
            .map(|row| WorkoutExerciseView {
                instance_id: row.instance.id.to_string(),
                exercise_id: row.exercise.id.to_string(),
                exercise_name: row.exercise.name,
                sets: row
                    .sets
                    .into_iter()
                    .map(|set| SetView {
                        set_id: set.id.to_string(),
                        set_number: set.set_number,
                        weight_kg: set.weight_kg,
                        reps: set.reps,
                        rpe: set.rpe,
                        set_type: set.set_type.as_str().to_string(),
                        is_completed: set.is_completed,
                    })
                    .collect(),
            })
            .collect(),
    }
}

fn finish_response(finished: FinishedWorkout, detail: WorkoutDetail) -> FinishWorkoutResponse {
    let message = match finished.new_records.len() {
        0 => "Workout finished.".to_string(),
        count => format!("Workout finished with {count} new record(s)."),
    };
    FinishWorkoutResponse {
        ok: true,
        message,
        workout: Some(to_workout_view(detail)),
        new_records: finished
            .new_records
            .into_iter()
            .map(|record| NewRecordView {
                exercise_name: record.exercise_name,
                weight_kg: record.weight_kg,
                previous_best_kg: record.previous_best_kg,
            })
            .collect(),
        completed_goals: finished
            .completed_goals
            .into_iter()
            .map(|goal| goal.title)
            .collect(),
    }
}

fn to_goal_view(goal: &Goal) -> GoalView {
    GoalView {
        goal_id: goal.id.to_string(),
        title: goal.title.clone(),
        goal_type: goal.goal_type.as_str().to_string(),
        status: goal.status.as_str().to_string(),
        current_value: goal.current_value,
        target_value: goal.target_value,
        progress_percent: goal.progress_percent(),
        deadline: goal.deadline,
    }
}

fn to_dashboard_view(summary: DashboardSummary) -> DashboardView {
    DashboardView {
        total_workouts: summary.total_workouts,
        workouts_this_week: summary.workouts_this_week,
        weekly_target: summary.weekly_target,
        current_daily_streak: summary.daily_streak.current,
        longest_daily_streak: summary.daily_streak.longest,
        current_weekly_streak: summary.weekly_streak.current,
        volume_this_week: summary.volume_this_week,
        volume_trend: summary.volume_trend.as_str().to_string(),
        volume_change_percent: summary.volume_change_percent,
        significance: summary.significance.as_str().to_string(),
        records: summary
            .recent_records
            .into_iter()
            .map(|highlight| RecordView {
                exercise_name: highlight.exercise_name,
                heaviest_weight_kg: highlight.record.heaviest_weight_kg,
                best_estimated_one_rep_max: highlight.record.best_estimated_one_rep_max,
                achieved_at: highlight.record.achieved_at,
            })
            .collect(),
        latest_weight_kg: summary.latest_weight_kg,
        weight_trend: summary.weight_trend.as_str().to_string(),
        active_goals: summary.active_goals.iter().map(to_goal_view).collect(),
    }
}

fn to_weight_entry_view(entry: WeightEntry) -> WeightEntryView {
    WeightEntryView {
        entry_id: entry.id.to_string(),
        weight_kg: entry.weight_kg,
        recorded_at: entry.recorded_at,
        note: entry.note,
    }
}

fn to_exercise_view(exercise: Exercise) -> ExerciseView {
    ExerciseView {
        exercise_id: exercise.id.to_string(),
        category: exercise.category.as_str().to_string(),
        muscle_groups: exercise
            .muscle_groups
            .iter()
            .map(|group| group.as_str())
            .collect::<Vec<_>>()
            .join(","),
        equipment: exercise.equipment.as_str().to_string(),
        is_custom: exercise.is_custom,
        name: exercise.name,
    }
}

fn to_issue_view(issue: &IntegrityIssue) -> IntegrityIssueView {
    let (kind, subject_id) = match issue {
        IntegrityIssue::OrphanSet { set_id } => ("orphan_set", set_id),
        IntegrityIssue::OrphanInstance { instance_id } => ("orphan_instance", instance_id),
        IntegrityIssue::SetNumberGap { instance_id, .. } => ("set_number_gap", instance_id),
        IntegrityIssue::InstancePositionGap { workout_id, .. } => {
            ("instance_position_gap", workout_id)
        }
        IntegrityIssue::AggregateMismatch { workout_id, .. } => ("aggregate_mismatch", workout_id),
        IntegrityIssue::InvalidTimeRange { workout_id } => ("invalid_time_range", workout_id),
    };
    IntegrityIssueView {
        kind: kind.to_string(),
        subject_id: subject_id.to_string(),
        repairable: issue.is_repairable(),
    }
}

fn integrity_failure(op: &str, err: Box<dyn Error>) -> IntegrityResponse {
    IntegrityResponse {
        ok: false,
        message: format!("{op} failed: {err}"),
        issues: Vec::new(),
        changes: 0,
    }
}

#[cfg(test)]
mod tests {
    use super::{
        calendar_month, core_version, dashboard_load, exercise_search, goal_create, goals_list,
        init_logging, integrity_check, load_config, normalize_weight_limit, ping, template_export,
        template_import, template_list, weight_history, weight_log, workout_active,
        workout_add_exercise, workout_delete_set, workout_detail, workout_discard,
        workout_finish, workout_log_set, workout_quick_log_set, workout_start,
    };
    use fittrack_core::config::{ENV_DB_PATH, ENV_WEEK_START};
    use fittrack_core::WeightUnit;
    use std::time::{SystemTime, UNIX_EPOCH};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }

    #[test]
    fn init_logging_rejects_empty_log_dir() {
        let error = init_logging("info".to_string(), String::new());
        assert!(!error.is_empty());
    }

    #[test]
    fn init_logging_rejects_unsupported_level() {
        let error = init_logging("verbose".to_string(), "tmp/logs".to_string());
        assert!(!error.is_empty());
    }

    #[test]
    fn invalid_config_value_is_reported_not_replaced() {
        let err = load_config(|name| (name == ENV_WEEK_START).then(|| "someday".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains(ENV_WEEK_START));

        let config =
            load_config(|name| (name == ENV_DB_PATH).then(|| "/tmp/fit.db".to_string())).unwrap();
        assert_eq!(config.db_path.to_string_lossy(), "/tmp/fit.db");
    }

    #[test]
    fn weight_limit_is_clamped() {
        assert_eq!(normalize_weight_limit(None), 30);
        assert_eq!(normalize_weight_limit(Some(0)), 30);
        assert_eq!(normalize_weight_limit(Some(5)), 5);
        assert_eq!(normalize_weight_limit(Some(10_000)), 365);
    }

    #[test]
    fn exercise_search_sees_seeded_catalog() {
        let response = exercise_search("squat".to_string());
        assert!(response.ok, "{}", response.message);
        assert!(response
            .items
            .iter()
            .any(|item| item.name == "Front Squat" && !item.is_custom));
    }

    #[test]
    fn workout_session_round_trip() {
        let active = workout_active();
        assert!(active.ok, "{}", active.message);
        if let Some(leftover) = active.workout {
            assert!(workout_discard(leftover.workout_id).ok);
        }

        let started = workout_start(unique_token("session"));
        assert!(started.ok, "{}", started.message);
        let workout_id = started.workout.expect("started workout").workout_id;

        let deadlift = exercise_search("Romanian Deadlift".to_string());
        let exercise_id = deadlift.items[0].exercise_id.clone();
        let added = workout_add_exercise(workout_id.clone(), exercise_id);
        assert!(added.ok, "{}", added.message);
        let instance_id = added.workout.expect("workout").exercises[0]
            .instance_id
            .clone();

        let logged = workout_log_set(instance_id.clone(), 100.0, 8, None, None);
        assert!(logged.ok, "{}", logged.message);
        let quick = workout_quick_log_set(instance_id.clone(), "105 kg x 6 @8".to_string());
        assert!(quick.ok, "{}", quick.message);
        let bad = workout_log_set(instance_id, 100.0, 5, None, Some("heavy".to_string()));
        assert!(!bad.ok);
        assert!(bad.message.contains("set_type"));

        let view = quick.workout.expect("workout");
        assert_eq!(view.total_sets, 2);
        let first_set = view.exercises[0].sets[0].set_id.clone();
        let after_delete = workout_delete_set(workout_id.clone(), first_set);
        assert!(after_delete.ok, "{}", after_delete.message);
        let sets = &after_delete.workout.expect("workout").exercises[0].sets;
        assert_eq!(sets.len(), 1);
        assert_eq!(sets[0].set_number, 1);
        assert_eq!(sets[0].weight_kg, 105.0);

        let finished = workout_finish(workout_id.clone());
        assert!(finished.ok, "{}", finished.message);
        let workout = finished.workout.expect("finished workout");
        assert!(workout.ended_at.is_some());
        assert_eq!(workout.total_volume, 630.0);

        let again = workout_finish(workout_id.clone());
        assert!(!again.ok);
        assert!(workout_detail(workout_id).ok);
    }

    #[test]
    fn invalid_ids_are_reported_not_panicked() {
        let response = workout_detail("not-a-uuid".to_string());
        assert!(!response.ok);
        assert!(response.message.contains("workout_id"));
    }

    #[test]
    fn weight_log_converts_pounds_and_lists_entry() {
        let logged = weight_log(176.0, "lb".to_string(), Some(unique_token("w")));
        assert!(logged.ok, "{}", logged.message);
        let id = logged.id.expect("entry id");

        let history = weight_history(Some(365));
        assert!(history.ok, "{}", history.message);
        let entry = history
            .entries
            .iter()
            .find(|entry| entry.entry_id == id)
            .expect("logged entry listed");
        assert!((entry.weight_kg - WeightUnit::Lb.to_kg(176.0)).abs() < 1e-9);

        assert!(!weight_log(80.0, "stone".to_string(), None).ok);
    }

    #[test]
    fn goals_are_created_and_listed() {
        let title = unique_token("goal");
        let created = goal_create(title.clone(), "volume".to_string(), None, 0.0, 1e9, None);
        assert!(created.ok, "{}", created.message);

        let listed = goals_list();
        assert!(listed.ok, "{}", listed.message);
        assert!(listed.goals.iter().any(|goal| goal.title == title));

        let rejected = goal_create("x".to_string(), "speed".to_string(), None, 0.0, 1.0, None);
        assert!(!rejected.ok);
    }

    #[test]
    fn template_import_then_export() {
        let name = unique_token("template");
        let json = format!(
            r#"{{"format":"fittrack.template","version":1,"name":"{name}",
                "exercises":[{{"exercise":"Deadlift","sets":3,"reps":5,"weight_kg":140.0}}]}}"#
        );
        let imported = template_import(json);
        assert!(imported.ok, "{}", imported.message);
        let template_id = imported.id.expect("template id");

        let listed = template_list();
        let view = listed
            .templates
            .iter()
            .find(|template| template.template_id == template_id)
            .expect("imported template listed");
        assert_eq!(view.planned_sets, 3);

        let exported = template_export(template_id);
        assert!(exported.ok, "{}", exported.message);
        assert!(exported.text.expect("json").contains(&name));
    }

    #[test]
    fn read_only_views_load() {
        assert!(dashboard_load().ok);
        assert!(integrity_check().ok);
        let may = calendar_month(2024, 5);
        assert!(may.ok, "{}", may.message);
        assert_eq!(may.days.len(), 31);
        assert!(!calendar_month(2024, 13).ok);
    }

    fn unique_token(prefix: &str) -> String {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("time went backwards")
            .as_nanos();
        format!("{prefix}-{nanos}")
    }
}
