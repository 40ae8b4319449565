use fittrack_core::db::migrations::{current_user_version, latest_version, pending_steps};
use fittrack_core::db::{open_db, open_db_in_memory, table_exists, DbError};
use rusqlite::Connection;

const WORKOUT_LOG_SCHEMA: &str = include_str!("../src/db/migrations/0001_init.sql");

#[test]
fn fresh_database_has_every_table() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(current_user_version(&conn).unwrap(), latest_version());
    assert!(pending_steps(&conn).unwrap().is_empty());
    for table in [
        "exercises",
        "workout_templates",
        "template_exercises",
        "workouts",
        "exercise_instances",
        "exercise_sets",
        "goals",
        "user_profile",
        "weight_history",
        "workout_routines",
        "routine_days",
    ] {
        assert!(table_exists(&conn, table).unwrap(), "missing table {table}");
    }
}

#[test]
fn instances_must_reference_existing_workouts() {
    let conn = open_db_in_memory().unwrap();
    let enabled: i64 = conn
        .query_row("PRAGMA foreign_keys;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(enabled, 1);

    let err = conn
        .execute(
            "INSERT INTO exercise_instances (id, workout_id, exercise_id, position)
             VALUES ('i', 'missing-workout', 'missing-exercise', 0);",
            [],
        )
        .unwrap_err();
    assert!(err.to_string().contains("FOREIGN KEY"));
}

#[test]
fn version_one_database_is_upgraded_in_place() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("v1.sqlite3");

    let legacy = Connection::open(&path).unwrap();
    legacy.execute_batch(WORKOUT_LOG_SCHEMA).unwrap();
    legacy.pragma_update(None, "user_version", 1).unwrap();
    legacy
        .execute(
            "INSERT INTO weight_history (id, weight_kg, recorded_at) VALUES ('w1', 80.0, 1);",
            [],
        )
        .unwrap();

    let pending: Vec<&str> = pending_steps(&legacy)
        .unwrap()
        .iter()
        .map(|step| step.name)
        .collect();
    assert_eq!(pending, vec!["weekly_routines"]);
    assert!(!table_exists(&legacy, "workout_routines").unwrap());
    drop(legacy);

    let upgraded = open_db(&path).unwrap();
    assert_eq!(current_user_version(&upgraded).unwrap(), latest_version());
    assert!(table_exists(&upgraded, "routine_days").unwrap());
    let rows: i64 = upgraded
        .query_row("SELECT COUNT(*) FROM weight_history;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(rows, 1);
}

#[test]
fn reopening_keeps_data_and_version() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("fittrack.sqlite3");

    open_db(&path)
        .unwrap()
        .execute(
            "INSERT INTO weight_history (id, weight_kg, recorded_at) VALUES ('w1', 80.0, 1);",
            [],
        )
        .unwrap();

    let reopened = open_db(&path).unwrap();
    assert_eq!(current_user_version(&reopened).unwrap(), latest_version());
    let rows: i64 = reopened
        .query_row("SELECT COUNT(*) FROM weight_history;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(rows, 1);
}

#[test]
fn newer_schema_is_refused() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.sqlite3");

    Connection::open(&path)
        .unwrap()
        .pragma_update(None, "user_version", 999)
        .unwrap();

    match open_db(&path).unwrap_err() {
        DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        } => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}
