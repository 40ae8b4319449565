//! Command-line front end for FitTrack core.
//!
//! # Responsibility
//! - Drive core services against a local database without the Flutter shell.
//! - Print deterministic `key=value` lines suitable for scripting.
//!
//! # Invariants
//! - Flags override `FITTRACK_*` environment configuration.
//! - Failures go to stderr and exit with a non-zero status.

use chrono::DateTime;
use clap::{Parser, Subcommand};
use fittrack_core::db::open_db;
use fittrack_core::repo::exercise_repo::SqliteExerciseRepository;
use fittrack_core::repo::goal_repo::SqliteGoalRepository;
use fittrack_core::repo::integrity;
use fittrack_core::repo::profile_repo::SqliteProfileRepository;
use fittrack_core::repo::template_repo::SqliteTemplateRepository;
use fittrack_core::repo::workout_repo::SqliteWorkoutRepository;
use fittrack_core::service::exercise_service::ExerciseService;
use fittrack_core::service::goal_service::GoalService;
use fittrack_core::service::profile_service::ProfileService;
use fittrack_core::service::template_service::TemplateService;
use fittrack_core::service::workout_service::WorkoutDetail;
use fittrack_core::{
    core_version, init_logging_from_config, now_epoch_ms, ping, AnalyticsService, CoreConfig,
    WeightUnit, WorkoutService,
};
use log::info;
use rusqlite::Connection;
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;
use uuid::Uuid;

type CliResult<T> = Result<T, Box<dyn Error>>;

#[derive(Parser)]
#[command(name = "fittrack", version, about = "FitTrack workout log")]
struct Cli {
    /// SQLite database file
    #[arg(long, global = true, env = "FITTRACK_DB_PATH")]
    db: Option<PathBuf>,

    /// trace|debug|info|warn|error
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Absolute directory for rolling log files
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Verify core linkage
    Ping,
    /// List or search the exercise catalog
    Exercises {
        #[arg(long)]
        search: Option<String>,
    },
    #[command(subcommand)]
    Workout(WorkoutCommand),
    #[command(subcommand)]
    Weight(WeightCommand),
    /// Summary of streaks, volume, records and goals
    Dashboard,
    /// Per-day workout counts for one month
    Calendar { year: i32, month: u32 },
    #[command(subcommand)]
    Template(TemplateCommand),
    #[command(subcommand)]
    Integrity(IntegrityCommand),
}

#[derive(Subcommand)]
enum WorkoutCommand {
    /// Start an empty workout, or one planned from a template
    Start {
        name: String,
        #[arg(long)]
        template: Option<Uuid>,
    },
    /// Add an exercise (by catalog name) to a workout
    Add { workout_id: Uuid, exercise: String },
    /// Log a set from text such as `100x5` or `225 lb x 3 @8`
    Set { instance_id: Uuid, entry: String },
    Finish { workout_id: Uuid },
    /// Show a workout; defaults to the active one
    Show { workout_id: Option<Uuid> },
}

#[derive(Subcommand)]
enum WeightCommand {
    Log {
        weight: f64,
        #[arg(long, default_value = "kg")]
        unit: String,
        #[arg(long)]
        note: Option<String>,
    },
    History {
        #[arg(long, default_value_t = 10)]
        limit: u32,
    },
}

#[derive(Subcommand)]
enum TemplateCommand {
    /// Print a template as JSON
    Export { template_id: Uuid },
    /// Import a template JSON file
    Import { path: PathBuf },
}

#[derive(Subcommand)]
enum IntegrityCommand {
    Check,
    Repair,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> CliResult<()> {
    let mut config = CoreConfig::from_env()?;
    if let Some(db) = cli.db {
        config.db_path = db;
    }
    if let Some(level) = cli.log_level {
        config.log_level = level;
    }
    if let Some(dir) = cli.log_dir {
        config.log_dir = Some(dir);
    }
    init_logging_from_config(&config)?;

    if let Command::Ping = cli.command {
        println!("ping={}", ping());
        println!("version={}", core_version());
        return Ok(());
    }

    let conn = open_db(&config.db_path)?;
    let seeded = exercise_service(&conn)?.ensure_default_catalog()?;
    if seeded > 0 {
        info!("event=cli_catalog_seed module=cli status=ok inserted={seeded}");
    }

    match cli.command {
        Command::Ping => {}
        Command::Exercises { search } => {
            let exercises = exercise_service(&conn)?.search(search.as_deref().unwrap_or(""))?;
            for exercise in exercises {
                println!(
                    "exercise id={} name={:?} category={} custom={}",
                    exercise.id,
                    exercise.name,
                    exercise.category.as_str(),
                    exercise.is_custom
                );
            }
        }
        Command::Workout(command) => run_workout(&conn, command)?,
        Command::Weight(command) => run_weight(&conn, command)?,
        Command::Dashboard => {
            let summary = analytics(&conn, &config)?.dashboard(now_epoch_ms())?;
            println!("total_workouts={}", summary.total_workouts);
            println!(
                "this_week={}/{}",
                summary.workouts_this_week, summary.weekly_target
            );
            println!(
                "daily_streak={} longest={}",
                summary.daily_streak.current, summary.daily_streak.longest
            );
            println!(
                "weekly_streak={} longest={}",
                summary.weekly_streak.current, summary.weekly_streak.longest
            );
            println!("volume_this_week={:.1}", summary.volume_this_week);
            println!(
                "volume_trend={} change_percent={:.1} significance={}",
                summary.volume_trend.as_str(),
                summary.volume_change_percent,
                summary.significance.as_str()
            );
            for highlight in &summary.recent_records {
                println!(
                    "record exercise={:?} heaviest_kg={:.1} e1rm_kg={:.1}",
                    highlight.exercise_name,
                    highlight.record.heaviest_weight_kg,
                    highlight.record.best_estimated_one_rep_max
                );
            }
            if let Some(weight) = summary.latest_weight_kg {
                println!(
                    "weight_kg={weight:.1} trend={}",
                    summary.weight_trend.as_str()
                );
            }
            for goal in &summary.active_goals {
                println!(
                    "goal title={:?} progress_percent={:.0}",
                    goal.title,
                    goal.progress_percent()
                );
            }
        }
        Command::Calendar { year, month } => {
            let calendar = analytics(&conn, &config)?
                .month_calendar(year, month)?
                .ok_or_else(|| format!("invalid month {year}-{month}"))?;
            for day in calendar.days.iter().filter(|day| day.workout_count > 0) {
                println!(
                    "day={} workouts={} volume={:.1}",
                    day.date, day.workout_count, day.total_volume
                );
            }
            println!(
                "total_workouts={} active_days={} total_volume={:.1}",
                calendar.total_workouts, calendar.active_days, calendar.total_volume
            );
        }
        Command::Template(TemplateCommand::Export { template_id }) => {
            println!("{}", template_service(&conn)?.export_json(template_id)?);
        }
        Command::Template(TemplateCommand::Import { path }) => {
            let json = std::fs::read_to_string(&path)?;
            let template = template_service(&conn)?.import_json(&json, now_epoch_ms())?;
            println!("template id={} name={:?}", template.id, template.name);
        }
        Command::Integrity(IntegrityCommand::Check) => {
            let report = integrity::validate(&conn)?;
            for issue in &report.issues {
                println!("issue {}", serde_issue(issue)?);
            }
            println!(
                "issues={} repairable={}",
                report.issues.len(),
                report.repairable_count()
            );
        }
        Command::Integrity(IntegrityCommand::Repair) => {
            let summary = integrity::repair(&conn)?;
            println!(
                "orphan_instances_removed={} orphan_sets_removed={} sets_renumbered={} \
                 instances_renumbered={} workouts_recomputed={}",
                summary.orphan_instances_removed,
                summary.orphan_sets_removed,
                summary.sets_renumbered,
                summary.instances_renumbered,
                summary.workouts_recomputed
            );
        }
    }
    Ok(())
}

fn run_workout(conn: &Connection, command: WorkoutCommand) -> CliResult<()> {
    let service = WorkoutService::new(
        SqliteWorkoutRepository::try_new(conn)?,
        SqliteExerciseRepository::try_new(conn)?,
    );
    let now = now_epoch_ms();
    match command {
        WorkoutCommand::Start { name, template } => {
            let detail = match template {
                Some(template_id) => {
                    let templates = SqliteTemplateRepository::try_new(conn)?;
                    service.start_from_template(&templates, template_id, now)?
                }
                None => {
                    let workout = service.start_workout(&name, now)?;
                    service.workout_detail(workout.id)?
                }
            };
            print_workout(&detail);
        }
        WorkoutCommand::Add {
            workout_id,
            exercise,
        } => {
            let found = exercise_service(conn)?
                .find_by_name(&exercise)?
                .ok_or_else(|| format!("no exercise named `{exercise}`"))?;
            let instance = service.add_exercise(workout_id, found.id)?;
            println!("instance id={} position={}", instance.id, instance.position);
        }
        WorkoutCommand::Set { instance_id, entry } => {
            let unit = ProfileService::new(SqliteProfileRepository::try_new(conn)?)
                .get_profile()?
                .weight_unit;
            let set = service.quick_log_set(instance_id, &entry, unit, now)?;
            println!(
                "set id={} number={} weight_kg={:.2} reps={} type={}",
                set.id,
                set.set_number,
                set.weight_kg,
                set.reps,
                set.set_type.as_str()
            );
        }
        WorkoutCommand::Finish { workout_id } => {
            let goals = GoalService::new(SqliteGoalRepository::try_new(conn)?);
            let finished = service.finish_workout(workout_id, now, &goals)?;
            println!(
                "finished id={} volume={:.1} sets={} reps={}",
                finished.workout.id,
                finished.workout.total_volume,
                finished.workout.total_sets,
                finished.workout.total_reps
            );
            for record in &finished.new_records {
                println!(
                    "new_record exercise={:?} weight_kg={:.1}",
                    record.exercise_name, record.weight_kg
                );
            }
            for goal in &finished.completed_goals {
                println!("goal_completed title={:?}", goal.title);
            }
        }
        WorkoutCommand::Show { workout_id } => {
            let workout_id = match workout_id {
                Some(id) => id,
                None => service
                    .active_workout()?
                    .ok_or("no active workout")?
                    .id,
            };
            print_workout(&service.workout_detail(workout_id)?);
        }
    }
    Ok(())
}

fn run_weight(conn: &Connection, command: WeightCommand) -> CliResult<()> {
    let service = ProfileService::new(SqliteProfileRepository::try_new(conn)?);
    match command {
        WeightCommand::Log { weight, unit, note } => {
            let unit = WeightUnit::parse(&unit).ok_or_else(|| format!("unknown unit `{unit}`"))?;
            let entry = service.log_weight(unit.to_kg(weight), now_epoch_ms(), note.as_deref())?;
            println!("weight id={} weight_kg={:.2}", entry.id, entry.weight_kg);
        }
        WeightCommand::History { limit } => {
            for entry in service.weight_history(Some(limit))? {
                println!(
                    "weight at={} weight_kg={:.2} note={:?}",
                    format_timestamp(entry.recorded_at),
                    entry.weight_kg,
                    entry.note.unwrap_or_default()
                );
            }
            let trend = service.weight_trend(7)?;
            println!(
                "trend={} change_kg={:.2}",
                trend.direction.as_str(),
                trend.change_kg
            );
        }
    }
    Ok(())
}

fn print_workout(detail: &WorkoutDetail) {
    let workout = &detail.workout;
    let totals = if workout.is_active() {
        detail.live_totals
    } else {
        workout.totals()
    };
    println!(
        "workout id={} name={:?} started={} active={} volume={:.1} sets={} reps={}",
        workout.id,
        workout.name,
        format_timestamp(workout.started_at),
        workout.is_active(),
        totals.volume,
        totals.sets,
        totals.reps
    );
    for row in &detail.exercises {
        println!(
            "  exercise instance={} name={:?}",
            row.instance.id, row.exercise.name
        );
        for set in &row.sets {
            println!(
                "    set {} {:.2}kg x {} {} done={}",
                set.set_number,
                set.weight_kg,
                set.reps,
                set.set_type.as_str(),
                set.is_completed
            );
        }
    }
}

fn format_timestamp(epoch_ms: i64) -> String {
    DateTime::from_timestamp_millis(epoch_ms)
        .map(|at| at.format("%Y-%m-%dT%H:%M:%SZ").to_string())
        .unwrap_or_else(|| epoch_ms.to_string())
}

fn serde_issue(issue: &integrity::IntegrityIssue) -> CliResult<String> {
    Ok(serde_json::to_string(issue)?)
}

fn exercise_service(conn: &Connection) -> CliResult<ExerciseService<SqliteExerciseRepository<'_>>> {
    Ok(ExerciseService::new(SqliteExerciseRepository::try_new(
        conn,
    )?))
}

fn template_service(
    conn: &Connection,
) -> CliResult<TemplateService<SqliteTemplateRepository<'_>, SqliteExerciseRepository<'_>>> {
    Ok(TemplateService::new(
        SqliteTemplateRepository::try_new(conn)?,
        SqliteExerciseRepository::try_new(conn)?,
    ))
}

fn analytics<'conn>(
    conn: &'conn Connection,
    config: &CoreConfig,
) -> CliResult<
    AnalyticsService<
        SqliteWorkoutRepository<'conn>,
        SqliteExerciseRepository<'conn>,
        SqliteProfileRepository<'conn>,
        SqliteGoalRepository<'conn>,
    >,
> {
    Ok(AnalyticsService::new(
        SqliteWorkoutRepository::try_new(conn)?,
        SqliteExerciseRepository::try_new(conn)?,
        SqliteProfileRepository::try_new(conn)?,
        SqliteGoalRepository::try_new(conn)?,
        config.calendar(),
    ))
}
