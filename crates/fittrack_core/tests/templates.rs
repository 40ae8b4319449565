use fittrack_core::db::open_db_in_memory;
use fittrack_core::repo::exercise_repo::{ExerciseRepository, SqliteExerciseRepository};
use fittrack_core::repo::goal_repo::SqliteGoalRepository;
use fittrack_core::repo::template_repo::SqliteTemplateRepository;
use fittrack_core::repo::workout_repo::SqliteWorkoutRepository;
use fittrack_core::service::goal_service::GoalService;
use fittrack_core::service::template_service::{
    TemplateExerciseInput, TemplateService, TemplateServiceError,
};
use fittrack_core::service::workout_service::{LogSetRequest, WorkoutService};
use fittrack_core::{Equipment, Exercise, ExerciseCategory, MuscleGroup, SetType};
use rusqlite::Connection;

const T0: i64 = 1_714_000_000_000;

fn service(
    conn: &Connection,
) -> TemplateService<SqliteTemplateRepository<'_>, SqliteExerciseRepository<'_>> {
    TemplateService::new(
        SqliteTemplateRepository::try_new(conn).unwrap(),
        SqliteExerciseRepository::try_new(conn).unwrap(),
    )
}

fn seed_exercise(conn: &Connection, name: &str) -> Exercise {
    let exercise = Exercise::new(
        name,
        ExerciseCategory::Strength,
        vec![MuscleGroup::Back],
        Equipment::Barbell,
    );
    SqliteExerciseRepository::try_new(conn)
        .unwrap()
        .create_exercise(&exercise)
        .unwrap();
    exercise
}

fn row(exercise: &Exercise, sets: u32, reps: u32, weight: Option<f64>) -> TemplateExerciseInput {
    TemplateExerciseInput {
        exercise_id: exercise.id,
        target_sets: sets,
        target_reps: reps,
        target_weight_kg: weight,
    }
}

#[test]
fn create_update_and_delete_template() {
    let conn = open_db_in_memory().unwrap();
    let row_ex = seed_exercise(&conn, "Barbell Row");
    let pull = seed_exercise(&conn, "Pull-Up");
    let service = service(&conn);

    let created = service
        .create_template(
            " Pull A ",
            Some("  "),
            &[row(&row_ex, 4, 8, Some(70.0)), row(&pull, 3, 10, None)],
            T0,
        )
        .unwrap();
    assert_eq!(created.name, "Pull A");
    assert_eq!(created.description, None);

    let loaded = service.get_template(created.id).unwrap();
    assert_eq!(loaded.exercises.len(), 2);
    assert_eq!(loaded.exercises[1].exercise_id, pull.id);
    assert_eq!(loaded.exercises[1].position, 1);

    let updated = service
        .update_template(created.id, "Pull B", Some("heavier"), &[row(&pull, 5, 5, Some(10.0))])
        .unwrap();
    assert_eq!(updated.exercises.len(), 1);
    let reloaded = service.get_template(created.id).unwrap();
    assert_eq!(reloaded.name, "Pull B");
    assert_eq!(reloaded.description.as_deref(), Some("heavier"));
    assert_eq!(reloaded.exercises[0].target_sets, 5);

    service.delete_template(created.id).unwrap();
    assert!(matches!(
        service.get_template(created.id),
        Err(TemplateServiceError::TemplateNotFound(_))
    ));
}

#[test]
fn template_rows_must_reference_known_exercises() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let ghost = Exercise::new("Ghost", ExerciseCategory::Strength, vec![], Equipment::Other);

    let err = service
        .create_template("Broken", None, &[row(&ghost, 3, 5, None)], T0)
        .unwrap_err();
    assert!(matches!(err, TemplateServiceError::ExerciseNotFound(id) if id == ghost.id));
    assert!(service.list_templates().unwrap().is_empty());
}

#[test]
fn invalid_targets_are_rejected() {
    let conn = open_db_in_memory().unwrap();
    let bench = seed_exercise(&conn, "Bench");
    let service = service(&conn);

    let err = service
        .create_template("Zero sets", None, &[row(&bench, 0, 5, None)], T0)
        .unwrap_err();
    assert!(matches!(err, TemplateServiceError::Validation(_)));
}

#[test]
fn logged_workout_can_be_saved_as_template() {
    let conn = open_db_in_memory().unwrap();
    let squat = seed_exercise(&conn, "Squat");
    let workouts = WorkoutService::new(
        SqliteWorkoutRepository::try_new(&conn).unwrap(),
        SqliteExerciseRepository::try_new(&conn).unwrap(),
    );
    let goals = GoalService::new(SqliteGoalRepository::try_new(&conn).unwrap());

    let workout = workouts.start_workout("Leg day", T0).unwrap();
    let instance = workouts.add_exercise(workout.id, squat.id).unwrap();
    workouts
        .log_set(
            instance.id,
            LogSetRequest {
                set_type: SetType::Warmup,
                ..LogSetRequest::working(60.0, 12)
            },
            T0 + 1,
        )
        .unwrap();
    workouts
        .log_set(instance.id, LogSetRequest::working(120.0, 5), T0 + 2)
        .unwrap();
    workouts
        .log_set(instance.id, LogSetRequest::working(110.0, 8), T0 + 3)
        .unwrap();
    workouts.finish_workout(workout.id, T0 + 100, &goals).unwrap();

    let service = service(&conn);
    let template = service
        .save_workout_as_template(
            &SqliteWorkoutRepository::try_new(&conn).unwrap(),
            workout.id,
            "Legs from log",
            T0 + 200,
        )
        .unwrap();

    assert_eq!(template.exercises.len(), 1);
    let planned = &template.exercises[0];
    assert_eq!(planned.exercise_id, squat.id);
    assert_eq!(planned.target_sets, 2);
    assert_eq!(planned.target_reps, 8);
    assert_eq!(planned.target_weight_kg, Some(120.0));
}

#[test]
fn json_export_then_import_into_fresh_database() {
    let source = open_db_in_memory().unwrap();
    let deadlift = seed_exercise(&source, "Deadlift");
    let exported = {
        let service = service(&source);
        let template = service
            .create_template(
                "Pull heavy",
                Some("Top set then backoffs"),
                &[row(&deadlift, 3, 3, Some(180.0))],
                T0,
            )
            .unwrap();
        service.export_json(template.id).unwrap()
    };
    assert!(exported.contains("\"format\": \"fittrack.template\""));
    assert!(exported.contains("\"exercise\": \"Deadlift\""));

    let target = open_db_in_memory().unwrap();
    let service = service(&target);
    let imported = service.import_json(&exported, T0 + 1).unwrap();
    assert_eq!(imported.name, "Pull heavy");
    assert_eq!(imported.description.as_deref(), Some("Top set then backoffs"));
    assert_eq!(imported.exercises[0].target_weight_kg, Some(180.0));

    let created = SqliteExerciseRepository::try_new(&target)
        .unwrap()
        .find_by_name("deadlift")
        .unwrap()
        .unwrap();
    assert!(created.is_custom);
    assert_eq!(imported.exercises[0].exercise_id, created.id);
}

#[test]
fn import_reuses_existing_exercises_by_name() {
    let conn = open_db_in_memory().unwrap();
    let existing = seed_exercise(&conn, "Pull-Up");
    let service = service(&conn);

    let json = r#"{
        "format": "fittrack.template",
        "version": 1,
        "name": "Pull",
        "exercises": [{ "exercise": "pull-up", "sets": 3, "reps": 8 }]
    }"#;
    let imported = service.import_json(json, T0).unwrap();
    assert_eq!(imported.exercises[0].exercise_id, existing.id);
}

#[test]
fn import_rejects_bad_documents_without_side_effects() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);

    assert!(matches!(
        service.import_json("not json", T0),
        Err(TemplateServiceError::InvalidDocument(_))
    ));

    let wrong_version = r#"{"format":"fittrack.template","version":9,"name":"X","exercises":[]}"#;
    assert!(matches!(
        service.import_json(wrong_version, T0),
        Err(TemplateServiceError::UnsupportedVersion(9))
    ));

    let bad_targets = r#"{
        "format": "fittrack.template",
        "version": 1,
        "name": "Bad",
        "exercises": [{ "exercise": "Brand New Lift", "sets": 0, "reps": 5 }]
    }"#;
    assert!(matches!(
        service.import_json(bad_targets, T0),
        Err(TemplateServiceError::Validation(_))
    ));
    assert!(SqliteExerciseRepository::try_new(&conn)
        .unwrap()
        .find_by_name("Brand New Lift")
        .unwrap()
        .is_none());
}

#[test]
fn import_with_blank_exercise_name_creates_nothing() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);

    let json = r#"{
        "format": "fittrack.template",
        "version": 1,
        "name": "Conditioning",
        "exercises": [
            { "exercise": "Sled Push", "sets": 3, "reps": 1 },
            { "exercise": "   ", "sets": 3, "reps": 10 }
        ]
    }"#;
    assert!(matches!(
        service.import_json(json, T0),
        Err(TemplateServiceError::Validation(_))
    ));
    assert!(SqliteExerciseRepository::try_new(&conn)
        .unwrap()
        .find_by_name("Sled Push")
        .unwrap()
        .is_none());
    assert!(service.list_templates().unwrap().is_empty());
}

#[test]
fn import_creates_a_repeated_new_exercise_once() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);

    let json = r#"{
        "format": "fittrack.template",
        "version": 1,
        "name": "Sleds",
        "exercises": [
            { "exercise": "Sled Push", "sets": 3, "reps": 1 },
            { "exercise": "sled push", "sets": 2, "reps": 1 }
        ]
    }"#;
    let imported = service.import_json(json, T0).unwrap();
    assert_eq!(
        imported.exercises[0].exercise_id,
        imported.exercises[1].exercise_id
    );
    let stored = SqliteExerciseRepository::try_new(&conn)
        .unwrap()
        .find_by_name("Sled Push")
        .unwrap()
        .unwrap();
    assert_eq!(stored.id, imported.exercises[0].exercise_id);
}

#[test]
fn failed_template_write_rolls_back_imported_exercises() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    conn.execute_batch("DROP TABLE template_exercises;").unwrap();

    let json = r#"{
        "format": "fittrack.template",
        "version": 1,
        "name": "Carries",
        "exercises": [{ "exercise": "Farmer Carry", "sets": 3, "reps": 1 }]
    }"#;
    assert!(matches!(
        service.import_json(json, T0),
        Err(TemplateServiceError::Repo(_))
    ));
    assert!(SqliteExerciseRepository::try_new(&conn)
        .unwrap()
        .find_by_name("Farmer Carry")
        .unwrap()
        .is_none());
    assert!(conn.is_autocommit());
}
