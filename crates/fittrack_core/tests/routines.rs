use chrono::NaiveDate;
use fittrack_core::db::open_db_in_memory;
use fittrack_core::repo::routine_repo::SqliteRoutineRepository;
use fittrack_core::repo::template_repo::{SqliteTemplateRepository, TemplateRepository};
use fittrack_core::service::routine_service::{RoutineService, RoutineServiceError};
use fittrack_core::WorkoutTemplate;
use rusqlite::Connection;

const T0: i64 = 1_714_000_000_000;

fn service(
    conn: &Connection,
) -> RoutineService<SqliteRoutineRepository<'_>, SqliteTemplateRepository<'_>> {
    RoutineService::new(
        SqliteRoutineRepository::try_new(conn).unwrap(),
        SqliteTemplateRepository::try_new(conn).unwrap(),
    )
}

fn seed_template(conn: &Connection, name: &str) -> WorkoutTemplate {
    let template = WorkoutTemplate::new(name, T0);
    SqliteTemplateRepository::try_new(conn)
        .unwrap()
        .create_template(&template)
        .unwrap();
    template
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[test]
fn active_routine_schedules_templates_by_weekday() {
    let conn = open_db_in_memory().unwrap();
    let push = seed_template(&conn, "Push");
    let pull = seed_template(&conn, "Pull");
    let service = service(&conn);

    let routine = service
        .create_routine("PPL", &[(3, pull.id), (1, push.id)], true)
        .unwrap();
    assert_eq!(routine.days[0].weekday, 1);

    // 2024-05-13 is a Monday.
    let monday = service.template_for_date(date(2024, 5, 13)).unwrap().unwrap();
    assert_eq!(monday.id, push.id);
    let wednesday = service.template_for_date(date(2024, 5, 15)).unwrap().unwrap();
    assert_eq!(wednesday.name, "Pull");
    assert!(service.template_for_date(date(2024, 5, 14)).unwrap().is_none());
}

#[test]
fn only_one_routine_stays_active() {
    let conn = open_db_in_memory().unwrap();
    let a = seed_template(&conn, "A");
    let b = seed_template(&conn, "B");
    let service = service(&conn);

    let first = service.create_routine("First", &[(1, a.id)], true).unwrap();
    let second = service.create_routine("Second", &[(1, b.id)], true).unwrap();

    let active: Vec<_> = service
        .list_routines()
        .unwrap()
        .into_iter()
        .filter(|routine| routine.is_active)
        .map(|routine| routine.id)
        .collect();
    assert_eq!(active, vec![second.id]);

    let reactivated = service.activate(first.id).unwrap();
    assert!(reactivated.is_active);
    let monday = service.template_for_date(date(2024, 5, 13)).unwrap().unwrap();
    assert_eq!(monday.id, a.id);
}

#[test]
fn no_active_routine_means_no_schedule() {
    let conn = open_db_in_memory().unwrap();
    let a = seed_template(&conn, "A");
    let service = service(&conn);
    service.create_routine("Draft", &[(1, a.id)], false).unwrap();
    assert!(service.template_for_date(date(2024, 5, 13)).unwrap().is_none());
}

#[test]
fn invalid_routines_are_rejected() {
    let conn = open_db_in_memory().unwrap();
    let a = seed_template(&conn, "A");
    let service = service(&conn);

    assert!(matches!(
        service.create_routine("Bad day", &[(8, a.id)], false),
        Err(RoutineServiceError::Validation(_))
    ));
    assert!(matches!(
        service.create_routine("Twice", &[(2, a.id), (2, a.id)], false),
        Err(RoutineServiceError::Validation(_))
    ));
    let ghost = uuid::Uuid::new_v4();
    assert!(matches!(
        service.create_routine("Ghost", &[(2, ghost)], false),
        Err(RoutineServiceError::TemplateNotFound(id)) if id == ghost
    ));
    assert!(service.list_routines().unwrap().is_empty());
}

#[test]
fn activating_or_deleting_missing_routine_fails() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let missing = uuid::Uuid::new_v4();
    assert!(matches!(
        service.activate(missing),
        Err(RoutineServiceError::RoutineNotFound(_))
    ));
    assert!(matches!(
        service.delete_routine(missing),
        Err(RoutineServiceError::RoutineNotFound(_))
    ));
}
