//! Weekly routine repository.
//!
//! # Invariants
//! - At most one routine has `is_active = 1`.
//! - A routine and its day rows are written in one transaction.

use super::error::{RepoError, RepoResult};
use super::sql::{bool_column, bool_to_int, ensure_tables, uuid_column, WriteScope};
use crate::model::routine::{RoutineDay, RoutineId, WorkoutRoutine};
use rusqlite::{params, Connection, Row};

const ROUTINE_SELECT_SQL: &str = "SELECT id, name, is_active FROM workout_routines";

pub trait RoutineRepository {
    fn create_routine(&self, routine: &WorkoutRoutine) -> RepoResult<RoutineId>;
    fn get_routine(&self, id: RoutineId) -> RepoResult<Option<WorkoutRoutine>>;
    fn list_routines(&self) -> RepoResult<Vec<WorkoutRoutine>>;
    fn delete_routine(&self, id: RoutineId) -> RepoResult<()>;
    /// Marks `id` active and every other routine inactive.
    fn set_active(&self, id: RoutineId) -> RepoResult<()>;
    fn active_routine(&self) -> RepoResult<Option<WorkoutRoutine>>;
}

pub struct SqliteRoutineRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteRoutineRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_tables(conn, &["workout_routines", "routine_days"])?;
        Ok(Self { conn })
    }

    fn query_routines(&self, sql: &str) -> RepoResult<Vec<WorkoutRoutine>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query([])?;
        let mut routines = Vec::new();
        while let Some(row) = rows.next()? {
            let mut routine = parse_routine_row(row)?;
            routine.days = load_days(self.conn, routine.id)?;
            routines.push(routine);
        }
        Ok(routines)
    }
}

impl RoutineRepository for SqliteRoutineRepository<'_> {
    fn create_routine(&self, routine: &WorkoutRoutine) -> RepoResult<RoutineId> {
        routine.validate()?;

        let tx = WriteScope::begin(self.conn)?;
        if routine.is_active {
            tx.execute("UPDATE workout_routines SET is_active = 0;", [])?;
        }
        tx.execute(
            "INSERT INTO workout_routines (id, name, is_active) VALUES (?1, ?2, ?3);",
            params![
                routine.id.to_string(),
                routine.name.trim(),
                bool_to_int(routine.is_active),
            ],
        )?;
        for day in &routine.days {
            tx.execute(
                "INSERT INTO routine_days (routine_id, weekday, template_id)
                 VALUES (?1, ?2, ?3);",
                params![
                    routine.id.to_string(),
                    day.weekday,
                    day.template_id.to_string()
                ],
            )
            .map_err(|err| {
                RepoError::from_write(err, || {
                    format!("routine day references unknown template {}", day.template_id)
                })
            })?;
        }
        tx.commit()?;
        Ok(routine.id)
    }

    fn get_routine(&self, id: RoutineId) -> RepoResult<Option<WorkoutRoutine>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{ROUTINE_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            let mut routine = parse_routine_row(row)?;
            routine.days = load_days(self.conn, routine.id)?;
            return Ok(Some(routine));
        }
        Ok(None)
    }

    fn list_routines(&self) -> RepoResult<Vec<WorkoutRoutine>> {
        self.query_routines(&format!(
            "{ROUTINE_SELECT_SQL} ORDER BY name COLLATE NOCASE ASC, id ASC;"
        ))
    }

    fn delete_routine(&self, id: RoutineId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "DELETE FROM workout_routines WHERE id = ?1;",
            [id.to_string()],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("routine", id));
        }
        Ok(())
    }

    fn set_active(&self, id: RoutineId) -> RepoResult<()> {
        let tx = WriteScope::begin(self.conn)?;
        let exists: i64 = tx.query_row(
            "SELECT COUNT(*) FROM workout_routines WHERE id = ?1;",
            [id.to_string()],
            |row| row.get(0),
        )?;
        if exists == 0 {
            return Err(RepoError::not_found("routine", id));
        }
        tx.execute(
            "UPDATE workout_routines SET is_active = CASE WHEN id = ?1 THEN 1 ELSE 0 END;",
            [id.to_string()],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn active_routine(&self) -> RepoResult<Option<WorkoutRoutine>> {
        Ok(self
            .query_routines(&format!(
                "{ROUTINE_SELECT_SQL} WHERE is_active = 1 ORDER BY id ASC LIMIT 1;"
            ))?
            .into_iter()
            .next())
    }
}

fn load_days(conn: &Connection, routine_id: RoutineId) -> RepoResult<Vec<RoutineDay>> {
    let mut stmt = conn.prepare(
        "SELECT weekday, template_id
         FROM routine_days
         WHERE routine_id = ?1
         ORDER BY weekday ASC;",
    )?;
    let mut rows = stmt.query([routine_id.to_string()])?;
    let mut days = Vec::new();
    while let Some(row) = rows.next()? {
        let weekday: i64 = row.get("weekday")?;
        let weekday = u8::try_from(weekday).map_err(|_| {
            RepoError::InvalidData(format!("invalid weekday `{weekday}` in routine_days"))
        })?;
        days.push(RoutineDay {
            weekday,
            template_id: uuid_column(row, "template_id")?,
        });
    }
    Ok(days)
}

fn parse_routine_row(row: &Row<'_>) -> RepoResult<WorkoutRoutine> {
    Ok(WorkoutRoutine {
        id: uuid_column(row, "id")?,
        name: row.get("name")?,
        is_active: bool_column(row, "is_active")?,
        days: Vec::new(),
    })
}
