use chrono::NaiveDate;
use fittrack_core::analytics::Significance;
use fittrack_core::db::open_db_in_memory;
use fittrack_core::repo::exercise_repo::{ExerciseRepository, SqliteExerciseRepository};
use fittrack_core::repo::goal_repo::SqliteGoalRepository;
use fittrack_core::repo::profile_repo::{ProfileRepository, SqliteProfileRepository};
use fittrack_core::repo::workout_repo::SqliteWorkoutRepository;
use fittrack_core::service::goal_service::{GoalService, NewGoal};
use fittrack_core::service::workout_service::{LogSetRequest, WorkoutService};
use fittrack_core::{
    AnalyticsService, Equipment, Exercise, ExerciseCategory, ExerciseId, GoalType,
    LocalCalendar, MuscleGroup, TrendDirection, WeekStart, WeightEntry,
};
use rusqlite::Connection;

const HOUR_MS: i64 = 3_600_000;
const DAY_MS: i64 = 24 * HOUR_MS;
/// Monday 2024-05-13 00:00 UTC.
const MAY_13: i64 = 1_715_558_400_000;
/// Wednesday 2024-05-15 12:00 UTC.
const NOW: i64 = MAY_13 + 2 * DAY_MS + 12 * HOUR_MS;

struct Fixture {
    bench: ExerciseId,
    squat: ExerciseId,
}

fn seed_exercise(conn: &Connection, name: &str) -> ExerciseId {
    let exercise = Exercise::new(
        name,
        ExerciseCategory::Strength,
        vec![MuscleGroup::Quads],
        Equipment::Barbell,
    );
    SqliteExerciseRepository::try_new(conn)
        .unwrap()
        .create_exercise(&exercise)
        .unwrap();
    exercise.id
}

fn log_session(conn: &Connection, started_at: i64, exercise: ExerciseId, sets: &[(f64, u32)]) {
    let workouts = WorkoutService::new(
        SqliteWorkoutRepository::try_new(conn).unwrap(),
        SqliteExerciseRepository::try_new(conn).unwrap(),
    );
    let goals = GoalService::new(SqliteGoalRepository::try_new(conn).unwrap());
    let workout = workouts.start_workout("Session", started_at).unwrap();
    let instance = workouts.add_exercise(workout.id, exercise).unwrap();
    for (index, (weight, reps)) in sets.iter().enumerate() {
        workouts
            .log_set(
                instance.id,
                LogSetRequest::working(*weight, *reps),
                started_at + index as i64 * 60_000,
            )
            .unwrap();
    }
    workouts
        .finish_workout(workout.id, started_at + HOUR_MS, &goals)
        .unwrap();
}

/// Five sessions over three weeks plus body-weight entries.
fn seed_history(conn: &Connection) -> Fixture {
    let bench = seed_exercise(conn, "Bench");
    let squat = seed_exercise(conn, "Squat");

    log_session(conn, MAY_13 - 13 * DAY_MS + 10 * HOUR_MS, bench, &[(100.0, 5)]);
    log_session(conn, MAY_13 - 6 * DAY_MS + 10 * HOUR_MS, bench, &[(100.0, 5), (100.0, 5)]);
    log_session(conn, MAY_13 + 10 * HOUR_MS, bench, &[(105.0, 3)]);
    log_session(conn, MAY_13 + DAY_MS + 10 * HOUR_MS, squat, &[(140.0, 5)]);
    log_session(conn, MAY_13 + 2 * DAY_MS + 9 * HOUR_MS, squat, &[(100.0, 5)]);

    let profile = SqliteProfileRepository::try_new(conn).unwrap();
    for (days_before, weight) in [(35, 90.0), (14, 84.0), (1, 83.0)] {
        profile
            .add_weight_entry(&WeightEntry::new(weight, NOW - days_before * DAY_MS))
            .unwrap();
    }

    Fixture { bench, squat }
}

fn analytics(
    conn: &Connection,
) -> AnalyticsService<
    SqliteWorkoutRepository<'_>,
    SqliteExerciseRepository<'_>,
    SqliteProfileRepository<'_>,
    SqliteGoalRepository<'_>,
> {
    AnalyticsService::new(
        SqliteWorkoutRepository::try_new(conn).unwrap(),
        SqliteExerciseRepository::try_new(conn).unwrap(),
        SqliteProfileRepository::try_new(conn).unwrap(),
        SqliteGoalRepository::try_new(conn).unwrap(),
        LocalCalendar::new(0, WeekStart::Monday),
    )
}

#[test]
fn empty_database_dashboard_is_zeroed() {
    let conn = open_db_in_memory().unwrap();
    let summary = analytics(&conn).dashboard(NOW).unwrap();

    assert_eq!(summary.total_workouts, 0);
    assert_eq!(summary.daily_streak.current, 0);
    assert_eq!(summary.weekly_streak.longest, 0);
    assert_eq!(summary.volume_trend, TrendDirection::Stable);
    assert_eq!(summary.significance, Significance::NotSignificant);
    assert!(summary.recent_records.is_empty());
    assert_eq!(summary.latest_weight_kg, None);
    assert_eq!(summary.weekly_target, 3);
}

#[test]
fn dashboard_summarizes_history() {
    let conn = open_db_in_memory().unwrap();
    let fixture = seed_history(&conn);
    GoalService::new(SqliteGoalRepository::try_new(&conn).unwrap())
        .create_goal(
            NewGoal {
                title: "Squat 150".to_string(),
                goal_type: GoalType::PersonalRecord,
                exercise_id: Some(fixture.squat),
                start_value: 140.0,
                target_value: 150.0,
                deadline: None,
            },
            NOW,
        )
        .unwrap();

    let summary = analytics(&conn).dashboard(NOW).unwrap();

    assert_eq!(summary.total_workouts, 5);
    assert_eq!(summary.workouts_this_week, 3);
    assert_eq!(summary.volume_this_week, 1_515.0);
    assert_eq!(summary.daily_streak.current, 3);
    assert_eq!(summary.daily_streak.longest, 3);
    assert_eq!(summary.weekly_streak.current, 3);

    // Last complete week (1000) against the one before (500).
    assert_eq!(summary.volume_trend, TrendDirection::Up);
    assert_eq!(summary.volume_change_percent, 100.0);
    assert_eq!(summary.significance, Significance::NotSignificant);

    let names: Vec<&str> = summary
        .recent_records
        .iter()
        .map(|highlight| highlight.exercise_name.as_str())
        .collect();
    assert_eq!(names, vec!["Squat", "Bench"]);
    assert_eq!(summary.recent_records[1].record.heaviest_weight_kg, 105.0);

    assert_eq!(summary.latest_weight_kg, Some(83.0));
    assert_eq!(summary.weight_trend, TrendDirection::Down);
    assert_eq!(summary.active_goals.len(), 1);
}

#[test]
fn weekly_volume_is_oldest_first() {
    let conn = open_db_in_memory().unwrap();
    seed_history(&conn);

    let weeks = analytics(&conn).weekly_volume(4, NOW).unwrap();
    let volumes: Vec<f64> = weeks.iter().map(|week| week.volume).collect();
    assert_eq!(volumes, vec![0.0, 500.0, 1_000.0, 1_515.0]);
    assert_eq!(weeks[3].week_start, NaiveDate::from_ymd_opt(2024, 5, 13).unwrap());
}

#[test]
fn month_calendar_marks_training_days() {
    let conn = open_db_in_memory().unwrap();
    seed_history(&conn);
    let service = analytics(&conn);

    let may = service.month_calendar(2024, 5).unwrap().unwrap();
    assert_eq!(may.days.len(), 31);
    assert_eq!(may.active_days, 4);
    assert_eq!(may.total_workouts, 4);
    assert_eq!(may.total_volume, 2_515.0);
    assert_eq!(may.days[6].workout_count, 1);

    assert!(service.month_calendar(2024, 13).unwrap().is_none());
}

#[test]
fn personal_records_cover_every_trained_exercise() {
    let conn = open_db_in_memory().unwrap();
    let fixture = seed_history(&conn);

    let records = analytics(&conn).personal_records().unwrap();
    assert_eq!(records.len(), 2);
    let bench = records
        .iter()
        .find(|record| record.exercise_id == fixture.bench)
        .unwrap();
    assert_eq!(bench.heaviest_weight_kg, 105.0);
    assert_eq!(bench.most_reps, 5);
    assert_eq!(bench.best_set_volume, 500.0);
    // 100 x 5 beats 105 x 3 on estimated one-rep max.
    assert!((bench.best_estimated_one_rep_max - 100.0 * (1.0 + 5.0 / 30.0)).abs() < 1e-9);
}
