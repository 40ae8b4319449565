use fittrack_core::db::open_db_in_memory;
use fittrack_core::repo::exercise_repo::{ExerciseListQuery, SqliteExerciseRepository};
use fittrack_core::service::exercise_service::{ExerciseService, ExerciseServiceError};
use fittrack_core::{Equipment, ExerciseCategory, MuscleGroup};
use rusqlite::Connection;

fn service(conn: &Connection) -> ExerciseService<SqliteExerciseRepository<'_>> {
    ExerciseService::new(SqliteExerciseRepository::try_new(conn).unwrap())
}

#[test]
fn default_catalog_is_seeded_once() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);

    let inserted = service.ensure_default_catalog().unwrap();
    assert!(inserted > 0);
    assert_eq!(service.ensure_default_catalog().unwrap(), 0);

    let all = service.list_exercises(&ExerciseListQuery::default()).unwrap();
    assert_eq!(all.len() as u32, inserted);
    assert!(all.iter().all(|exercise| !exercise.is_custom));
}

#[test]
fn search_and_filters_narrow_the_catalog() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    service.ensure_default_catalog().unwrap();

    let squats: Vec<String> = service
        .search("SQUAT")
        .unwrap()
        .into_iter()
        .map(|exercise| exercise.name)
        .collect();
    assert_eq!(squats, vec!["Barbell Back Squat", "Front Squat"]);

    let calves = service
        .list_exercises(&ExerciseListQuery {
            muscle_group: Some(MuscleGroup::Calves),
            ..ExerciseListQuery::default()
        })
        .unwrap();
    assert_eq!(calves.len(), 1);
    assert_eq!(calves[0].name, "Standing Calf Raise");

    let cardio = service
        .list_exercises(&ExerciseListQuery {
            category: Some(ExerciseCategory::Cardio),
            ..ExerciseListQuery::default()
        })
        .unwrap();
    assert!(cardio
        .iter()
        .all(|exercise| exercise.category == ExerciseCategory::Cardio));
    assert_eq!(cardio.len(), 2);
}

#[test]
fn custom_names_must_be_unique_ignoring_case() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    service.ensure_default_catalog().unwrap();

    let custom = service
        .create_exercise(
            "  Zercher Squat ",
            ExerciseCategory::Strength,
            vec![MuscleGroup::Quads, MuscleGroup::Core, MuscleGroup::Quads],
            Equipment::Barbell,
        )
        .unwrap();
    assert_eq!(custom.name, "Zercher Squat");
    assert!(custom.is_custom);
    assert_eq!(custom.muscle_groups, vec![MuscleGroup::Core, MuscleGroup::Quads]);

    match service.create_exercise(
        "deadlift",
        ExerciseCategory::Strength,
        vec![MuscleGroup::Back],
        Equipment::Barbell,
    ) {
        Err(ExerciseServiceError::DuplicateName(name)) => assert_eq!(name, "deadlift"),
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn archived_exercises_leave_pickers_but_stay_resolvable() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let sled = service
        .create_exercise(
            "Sled Push",
            ExerciseCategory::Strength,
            vec![MuscleGroup::Quads],
            Equipment::Other,
        )
        .unwrap();

    service.archive_exercise(sled.id).unwrap();

    assert!(service.search("sled").unwrap().is_empty());
    let archived = service.get_exercise(sled.id).unwrap();
    assert!(archived.is_archived);
    let with_archived = service
        .list_exercises(&ExerciseListQuery {
            include_archived: true,
            ..ExerciseListQuery::default()
        })
        .unwrap();
    assert_eq!(with_archived.len(), 1);
}

#[test]
fn missing_exercise_is_reported() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let id = uuid::Uuid::new_v4();
    assert!(matches!(
        service.get_exercise(id),
        Err(ExerciseServiceError::ExerciseNotFound(missing)) if missing == id
    ));
    assert!(matches!(
        service.archive_exercise(id),
        Err(ExerciseServiceError::ExerciseNotFound(_))
    ));
}
