use fittrack_core::db::open_db_in_memory;
use fittrack_core::repo::integrity::{repair, validate, IntegrityIssue};
use rusqlite::{params, Connection};
use uuid::Uuid;

const T0: i64 = 1_714_000_000_000;

fn insert_exercise(conn: &Connection) -> Uuid {
    let id = Uuid::new_v4();
    conn.execute(
        "INSERT INTO exercises (id, name, category, equipment) VALUES (?1, ?2, 'strength', 'barbell');",
        params![id.to_string(), format!("Lift {id}")],
    )
    .unwrap();
    id
}

fn insert_workout(conn: &Connection, started_at: i64, ended_at: Option<i64>) -> Uuid {
    let id = Uuid::new_v4();
    conn.execute(
        "INSERT INTO workouts (id, name, started_at, ended_at) VALUES (?1, 'Session', ?2, ?3);",
        params![id.to_string(), started_at, ended_at],
    )
    .unwrap();
    id
}

fn insert_instance(conn: &Connection, workout_id: Uuid, exercise_id: Uuid, position: u32) -> Uuid {
    let id = Uuid::new_v4();
    conn.execute(
        "INSERT INTO exercise_instances (id, workout_id, exercise_id, position) VALUES (?1, ?2, ?3, ?4);",
        params![id.to_string(), workout_id.to_string(), exercise_id.to_string(), position],
    )
    .unwrap();
    id
}

fn insert_set(conn: &Connection, instance_id: Uuid, set_number: u32, weight: f64, reps: u32) -> Uuid {
    let id = Uuid::new_v4();
    conn.execute(
        "INSERT INTO exercise_sets (id, instance_id, set_number, weight_kg, reps, is_completed, completed_at)
         VALUES (?1, ?2, ?3, ?4, ?5, 1, ?6);",
        params![id.to_string(), instance_id.to_string(), set_number, weight, reps, T0],
    )
    .unwrap();
    id
}

fn set_numbers(conn: &Connection, instance_id: Uuid) -> Vec<u32> {
    let mut stmt = conn
        .prepare("SELECT set_number FROM exercise_sets WHERE instance_id = ?1 ORDER BY set_number;")
        .unwrap();
    stmt.query_map([instance_id.to_string()], |row| row.get(0))
        .unwrap()
        .collect::<Result<Vec<u32>, _>>()
        .unwrap()
}

#[test]
fn clean_database_has_no_issues() {
    let conn = open_db_in_memory().unwrap();
    let exercise = insert_exercise(&conn);
    let workout = insert_workout(&conn, T0, None);
    let instance = insert_instance(&conn, workout, exercise, 0);
    insert_set(&conn, instance, 1, 100.0, 5);
    insert_set(&conn, instance, 2, 100.0, 5);

    let report = validate(&conn).unwrap();
    assert!(report.is_clean(), "unexpected issues: {:?}", report.issues);
}

#[test]
fn detects_set_gaps_and_repair_renumbers_in_order() {
    let conn = open_db_in_memory().unwrap();
    let exercise = insert_exercise(&conn);
    let workout = insert_workout(&conn, T0, None);
    let instance = insert_instance(&conn, workout, exercise, 0);
    let first = insert_set(&conn, instance, 1, 60.0, 5);
    let third = insert_set(&conn, instance, 3, 70.0, 5);
    let seventh = insert_set(&conn, instance, 7, 80.0, 5);

    let report = validate(&conn).unwrap();
    assert_eq!(
        report.issues,
        vec![IntegrityIssue::SetNumberGap {
            instance_id: instance,
            expected: 2,
            found: 3,
        }]
    );

    let summary = repair(&conn).unwrap();
    assert_eq!(summary.sets_renumbered, 2);
    assert_eq!(set_numbers(&conn, instance), vec![1, 2, 3]);

    let number_of = |id: Uuid| -> u32 {
        conn.query_row(
            "SELECT set_number FROM exercise_sets WHERE id = ?1;",
            [id.to_string()],
            |row| row.get(0),
        )
        .unwrap()
    };
    assert_eq!(number_of(first), 1);
    assert_eq!(number_of(third), 2);
    assert_eq!(number_of(seventh), 3);
    assert!(validate(&conn).unwrap().is_clean());
}

#[test]
fn detects_position_gaps() {
    let conn = open_db_in_memory().unwrap();
    let exercise = insert_exercise(&conn);
    let workout = insert_workout(&conn, T0, None);
    insert_instance(&conn, workout, exercise, 1);
    insert_instance(&conn, workout, exercise, 2);

    let report = validate(&conn).unwrap();
    assert_eq!(
        report.issues,
        vec![IntegrityIssue::InstancePositionGap {
            workout_id: workout,
            expected: 0,
            found: 1,
        }]
    );

    let summary = repair(&conn).unwrap();
    assert_eq!(summary.instances_renumbered, 2);
    assert!(validate(&conn).unwrap().is_clean());
}

#[test]
fn removes_orphan_rows() {
    let conn = open_db_in_memory().unwrap();
    let exercise = insert_exercise(&conn);
    conn.execute_batch("PRAGMA foreign_keys = OFF;").unwrap();
    let orphan_instance = insert_instance(&conn, Uuid::new_v4(), exercise, 0);
    insert_set(&conn, orphan_instance, 1, 50.0, 10);
    let orphan_set = insert_set(&conn, Uuid::new_v4(), 1, 40.0, 8);
    conn.execute_batch("PRAGMA foreign_keys = ON;").unwrap();

    let report = validate(&conn).unwrap();
    assert!(report
        .issues
        .contains(&IntegrityIssue::OrphanInstance {
            instance_id: orphan_instance
        }));
    assert!(report
        .issues
        .contains(&IntegrityIssue::OrphanSet { set_id: orphan_set }));

    let summary = repair(&conn).unwrap();
    assert_eq!(summary.orphan_instances_removed, 1);
    assert_eq!(summary.orphan_sets_removed, 1);

    let remaining: i64 = conn
        .query_row("SELECT COUNT(*) FROM exercise_sets;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(remaining, 0);
    assert!(validate(&conn).unwrap().is_clean());
}

#[test]
fn stale_aggregates_are_recomputed() {
    let conn = open_db_in_memory().unwrap();
    let exercise = insert_exercise(&conn);
    let workout = insert_workout(&conn, T0, Some(T0 + 3_600_000));
    let instance = insert_instance(&conn, workout, exercise, 0);
    insert_set(&conn, instance, 1, 100.0, 5);
    insert_set(&conn, instance, 2, 100.0, 5);
    conn.execute(
        "UPDATE exercise_sets SET set_type = 'warmup' WHERE set_number = 1;",
        [],
    )
    .unwrap();

    let report = validate(&conn).unwrap();
    assert_eq!(report.issues.len(), 1);
    match &report.issues[0] {
        IntegrityIssue::AggregateMismatch { actual, .. } => {
            assert_eq!(actual.sets, 1);
            assert_eq!(actual.reps, 5);
            assert_eq!(actual.volume, 500.0);
        }
        other => panic!("unexpected issue: {other:?}"),
    }

    let summary = repair(&conn).unwrap();
    assert_eq!(summary.workouts_recomputed, 1);
    let (volume, sets): (f64, u32) = conn
        .query_row(
            "SELECT total_volume, total_sets FROM workouts WHERE id = ?1;",
            [workout.to_string()],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .unwrap();
    assert_eq!(volume, 500.0);
    assert_eq!(sets, 1);
}

#[test]
fn reversed_time_range_is_reported_but_not_repaired() {
    let conn = open_db_in_memory().unwrap();
    let workout = insert_workout(&conn, T0, Some(T0 - 1));

    let report = validate(&conn).unwrap();
    assert_eq!(
        report.issues,
        vec![IntegrityIssue::InvalidTimeRange { workout_id: workout }]
    );
    assert_eq!(report.repairable_count(), 0);

    let summary = repair(&conn).unwrap();
    assert_eq!(summary.total_changes(), 0);
    assert_eq!(validate(&conn).unwrap().issues.len(), 1);
}
