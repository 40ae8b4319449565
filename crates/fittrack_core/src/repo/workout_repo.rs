//! Workout/instance/set repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist the logged-session hierarchy.
//! - Keep set numbering and instance positions contiguous on delete.
//! - Serve history queries used by analytics and goal tracking.
//!
//! # Invariants
//! - Workout lists are ordered `started_at DESC, id ASC`.
//! - Instances are ordered by `position`, sets by `set_number`.
//! - Deleting a set or instance re-numbers its siblings in the same
//!   transaction.

use super::error::{RepoError, RepoResult};
use super::integrity::{renumber_positions, renumber_sets};
use super::sql::{
    bool_column, bool_to_int, code_column, ensure_tables, optional_uuid_column, run_atomically,
    u32_column, uuid_column, WriteScope,
};
use crate::model::exercise::ExerciseId;
use crate::model::workout::{
    ExerciseInstance, ExerciseSet, InstanceId, SetId, SetType, Workout, WorkoutId,
};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};

const WORKOUT_SELECT_SQL: &str = "SELECT
    id,
    name,
    started_at,
    ended_at,
    notes,
    total_volume,
    total_sets,
    total_reps,
    template_id
FROM workouts";

const SET_COLUMNS_SQL: &str = "s.id AS id,
    s.instance_id AS instance_id,
    s.set_number AS set_number,
    s.weight_kg AS weight_kg,
    s.reps AS reps,
    s.rpe AS rpe,
    s.set_type AS set_type,
    s.is_completed AS is_completed,
    s.completed_at AS completed_at";

/// Query options for listing workouts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkoutListQuery {
    /// Inclusive lower bound on `started_at`.
    pub since: Option<i64>,
    /// Exclusive upper bound on `started_at`.
    pub until: Option<i64>,
    /// Exclude in-progress workouts.
    pub finished_only: bool,
    pub limit: Option<u32>,
    pub offset: u32,
}

/// A completed set joined with the context analytics needs.
#[derive(Debug, Clone, PartialEq)]
pub struct LoggedSet {
    pub exercise_id: ExerciseId,
    pub workout_id: WorkoutId,
    pub workout_started_at: i64,
    pub set: ExerciseSet,
}

/// Repository interface for workout history.
pub trait WorkoutRepository {
    fn create_workout(&self, workout: &Workout) -> RepoResult<WorkoutId>;
    fn update_workout(&self, workout: &Workout) -> RepoResult<()>;
    fn get_workout(&self, id: WorkoutId) -> RepoResult<Option<Workout>>;
    /// Deletes a workout and, by cascade, its instances and sets.
    fn delete_workout(&self, id: WorkoutId) -> RepoResult<()>;
    fn list_workouts(&self, query: &WorkoutListQuery) -> RepoResult<Vec<Workout>>;
    /// Most recently started workout without `ended_at`.
    fn active_workout(&self) -> RepoResult<Option<Workout>>;

    fn add_instance(&self, instance: &ExerciseInstance) -> RepoResult<InstanceId>;
    fn get_instance(&self, id: InstanceId) -> RepoResult<Option<ExerciseInstance>>;
    /// Deletes an instance with its sets and closes the position gap.
    fn delete_instance(&self, id: InstanceId) -> RepoResult<()>;
    fn list_instances(&self, workout_id: WorkoutId) -> RepoResult<Vec<ExerciseInstance>>;
    fn next_position(&self, workout_id: WorkoutId) -> RepoResult<u32>;

    fn add_set(&self, set: &ExerciseSet) -> RepoResult<SetId>;
    fn update_set(&self, set: &ExerciseSet) -> RepoResult<()>;
    fn get_set(&self, id: SetId) -> RepoResult<Option<ExerciseSet>>;
    /// Deletes a set and re-numbers the remaining sets `1..n`.
    fn delete_set(&self, id: SetId) -> RepoResult<()>;
    fn list_sets(&self, instance_id: InstanceId) -> RepoResult<Vec<ExerciseSet>>;
    fn list_workout_sets(&self, workout_id: WorkoutId) -> RepoResult<Vec<ExerciseSet>>;
    fn next_set_number(&self, instance_id: InstanceId) -> RepoResult<u32>;

    /// Completed sets of finished workouts, optionally filtered.
    fn logged_sets(
        &self,
        exercise_id: Option<ExerciseId>,
        since: Option<i64>,
    ) -> RepoResult<Vec<LoggedSet>>;

    /// Runs `work` as one write; repository calls on the same connection
    /// inside it are committed together or not at all.
    fn atomically<R, E: From<RepoError>>(&self, work: impl FnOnce() -> Result<R, E>) -> Result<R, E>;
}

/// SQLite-backed workout repository.
pub struct SqliteWorkoutRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteWorkoutRepository<'conn> {
    /// Constructs a repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_tables(conn, &["workouts", "exercise_instances", "exercise_sets"])?;
        Ok(Self { conn })
    }
}

impl WorkoutRepository for SqliteWorkoutRepository<'_> {
    fn create_workout(&self, workout: &Workout) -> RepoResult<WorkoutId> {
        workout.validate()?;

        self.conn.execute(
            "INSERT INTO workouts (
                id,
                name,
                started_at,
                ended_at,
                notes,
                total_volume,
                total_sets,
                total_reps,
                template_id
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9);",
            params![
                workout.id.to_string(),
                workout.name.as_str(),
                workout.started_at,
                workout.ended_at,
                workout.notes.as_deref(),
                workout.total_volume,
                workout.total_sets,
                workout.total_reps,
                workout.template_id.map(|id| id.to_string()),
            ],
        )?;

        Ok(workout.id)
    }

    fn update_workout(&self, workout: &Workout) -> RepoResult<()> {
        workout.validate()?;

        let changed = self.conn.execute(
            "UPDATE workouts
             SET
                name = ?2,
                started_at = ?3,
                ended_at = ?4,
                notes = ?5,
                total_volume = ?6,
                total_sets = ?7,
                total_reps = ?8,
                template_id = ?9,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1;",
            params![
                workout.id.to_string(),
                workout.name.as_str(),
                workout.started_at,
                workout.ended_at,
                workout.notes.as_deref(),
                workout.total_volume,
                workout.total_sets,
                workout.total_reps,
                workout.template_id.map(|id| id.to_string()),
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::not_found("workout", workout.id));
        }
        Ok(())
    }

    fn get_workout(&self, id: WorkoutId) -> RepoResult<Option<Workout>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{WORKOUT_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_workout_row(row)?));
        }
        Ok(None)
    }

    fn delete_workout(&self, id: WorkoutId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM workouts WHERE id = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::not_found("workout", id));
        }
        Ok(())
    }

    fn list_workouts(&self, query: &WorkoutListQuery) -> RepoResult<Vec<Workout>> {
        let mut sql = format!("{WORKOUT_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if query.finished_only {
            sql.push_str(" AND ended_at IS NOT NULL");
        }
        if let Some(since) = query.since {
            sql.push_str(" AND started_at >= ?");
            bind_values.push(Value::Integer(since));
        }
        if let Some(until) = query.until {
            sql.push_str(" AND started_at < ?");
            bind_values.push(Value::Integer(until));
        }

        sql.push_str(" ORDER BY started_at DESC, id ASC");

        if let Some(limit) = query.limit {
            sql.push_str(" LIMIT ?");
            bind_values.push(Value::Integer(i64::from(limit)));
            if query.offset > 0 {
                sql.push_str(" OFFSET ?");
                bind_values.push(Value::Integer(i64::from(query.offset)));
            }
        } else if query.offset > 0 {
            sql.push_str(" LIMIT -1 OFFSET ?");
            bind_values.push(Value::Integer(i64::from(query.offset)));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut workouts = Vec::new();
        while let Some(row) = rows.next()? {
            workouts.push(parse_workout_row(row)?);
        }
        Ok(workouts)
    }

    fn active_workout(&self) -> RepoResult<Option<Workout>> {
        let mut stmt = self.conn.prepare(&format!(
            "{WORKOUT_SELECT_SQL}
             WHERE ended_at IS NULL
             ORDER BY started_at DESC, id ASC
             LIMIT 1;"
        ))?;
        let mut rows = stmt.query([])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_workout_row(row)?));
        }
        Ok(None)
    }

    fn add_instance(&self, instance: &ExerciseInstance) -> RepoResult<InstanceId> {
        self.conn
            .execute(
                "INSERT INTO exercise_instances (
                    id,
                    workout_id,
                    exercise_id,
                    position,
                    notes
                ) VALUES (?1, ?2, ?3, ?4, ?5);",
                params![
                    instance.id.to_string(),
                    instance.workout_id.to_string(),
                    instance.exercise_id.to_string(),
                    instance.position,
                    instance.notes.as_deref(),
                ],
            )
            .map_err(|err| {
                RepoError::from_write(err, || {
                    format!(
                        "workout {} or exercise {} does not exist",
                        instance.workout_id, instance.exercise_id
                    )
                })
            })?;
        Ok(instance.id)
    }

    fn get_instance(&self, id: InstanceId) -> RepoResult<Option<ExerciseInstance>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, workout_id, exercise_id, position, notes
             FROM exercise_instances
             WHERE id = ?1;",
        )?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_instance_row(row)?));
        }
        Ok(None)
    }

    fn delete_instance(&self, id: InstanceId) -> RepoResult<()> {
        let instance = self
            .get_instance(id)?
            .ok_or_else(|| RepoError::not_found("exercise instance", id))?;

        let tx = WriteScope::begin(self.conn)?;
        tx.execute(
            "DELETE FROM exercise_instances WHERE id = ?1;",
            [id.to_string()],
        )?;
        renumber_positions(&tx, instance.workout_id)?;
        tx.commit()?;
        Ok(())
    }

    fn list_instances(&self, workout_id: WorkoutId) -> RepoResult<Vec<ExerciseInstance>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, workout_id, exercise_id, position, notes
             FROM exercise_instances
             WHERE workout_id = ?1
             ORDER BY position ASC, id ASC;",
        )?;
        let mut rows = stmt.query([workout_id.to_string()])?;
        let mut instances = Vec::new();
        while let Some(row) = rows.next()? {
            instances.push(parse_instance_row(row)?);
        }
        Ok(instances)
    }

    fn next_position(&self, workout_id: WorkoutId) -> RepoResult<u32> {
        let next: i64 = self.conn.query_row(
            "SELECT COALESCE(MAX(position) + 1, 0)
             FROM exercise_instances
             WHERE workout_id = ?1;",
            [workout_id.to_string()],
            |row| row.get(0),
        )?;
        u32::try_from(next).map_err(|_| RepoError::InvalidData(format!("invalid position {next}")))
    }

    fn add_set(&self, set: &ExerciseSet) -> RepoResult<SetId> {
        set.validate()?;

        self.conn
            .execute(
                "INSERT INTO exercise_sets (
                    id,
                    instance_id,
                    set_number,
                    weight_kg,
                    reps,
                    rpe,
                    set_type,
                    is_completed,
                    completed_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9);",
                params![
                    set.id.to_string(),
                    set.instance_id.to_string(),
                    set.set_number,
                    set.weight_kg,
                    set.reps,
                    set.rpe,
                    set.set_type.as_str(),
                    bool_to_int(set.is_completed),
                    set.completed_at,
                ],
            )
            .map_err(|err| {
                RepoError::from_write(err, || {
                    format!("exercise instance {} does not exist", set.instance_id)
                })
            })?;
        Ok(set.id)
    }

    fn update_set(&self, set: &ExerciseSet) -> RepoResult<()> {
        set.validate()?;

        let changed = self.conn.execute(
            "UPDATE exercise_sets
             SET
                set_number = ?2,
                weight_kg = ?3,
                reps = ?4,
                rpe = ?5,
                set_type = ?6,
                is_completed = ?7,
                completed_at = ?8
             WHERE id = ?1;",
            params![
                set.id.to_string(),
                set.set_number,
                set.weight_kg,
                set.reps,
                set.rpe,
                set.set_type.as_str(),
                bool_to_int(set.is_completed),
                set.completed_at,
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("exercise set", set.id));
        }
        Ok(())
    }

    fn get_set(&self, id: SetId) -> RepoResult<Option<ExerciseSet>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {SET_COLUMNS_SQL}
             FROM exercise_sets s
             WHERE s.id = ?1;"
        ))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_set_row(row)?));
        }
        Ok(None)
    }

    fn delete_set(&self, id: SetId) -> RepoResult<()> {
        let set = self
            .get_set(id)?
            .ok_or_else(|| RepoError::not_found("exercise set", id))?;

        let tx = WriteScope::begin(self.conn)?;
        tx.execute("DELETE FROM exercise_sets WHERE id = ?1;", [id.to_string()])?;
        renumber_sets(&tx, set.instance_id)?;
        tx.commit()?;
        Ok(())
    }

    fn list_sets(&self, instance_id: InstanceId) -> RepoResult<Vec<ExerciseSet>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {SET_COLUMNS_SQL}
             FROM exercise_sets s
             WHERE s.instance_id = ?1
             ORDER BY s.set_number ASC, s.id ASC;"
        ))?;
        let mut rows = stmt.query([instance_id.to_string()])?;
        let mut sets = Vec::new();
        while let Some(row) = rows.next()? {
            sets.push(parse_set_row(row)?);
        }
        Ok(sets)
    }

    fn list_workout_sets(&self, workout_id: WorkoutId) -> RepoResult<Vec<ExerciseSet>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {SET_COLUMNS_SQL}
             FROM exercise_sets s
             INNER JOIN exercise_instances i ON i.id = s.instance_id
             WHERE i.workout_id = ?1
             ORDER BY i.position ASC, s.set_number ASC, s.id ASC;"
        ))?;
        let mut rows = stmt.query([workout_id.to_string()])?;
        let mut sets = Vec::new();
        while let Some(row) = rows.next()? {
            sets.push(parse_set_row(row)?);
        }
        Ok(sets)
    }

    fn next_set_number(&self, instance_id: InstanceId) -> RepoResult<u32> {
        let next: i64 = self.conn.query_row(
            "SELECT COALESCE(MAX(set_number), 0) + 1
             FROM exercise_sets
             WHERE instance_id = ?1;",
            [instance_id.to_string()],
            |row| row.get(0),
        )?;
        u32::try_from(next)
            .map_err(|_| RepoError::InvalidData(format!("invalid set number {next}")))
    }

    fn logged_sets(
        &self,
        exercise_id: Option<ExerciseId>,
        since: Option<i64>,
    ) -> RepoResult<Vec<LoggedSet>> {
        let mut sql = format!(
            "SELECT
                {SET_COLUMNS_SQL},
                i.exercise_id AS exercise_id,
                w.id AS workout_id,
                w.started_at AS workout_started_at
             FROM exercise_sets s
             INNER JOIN exercise_instances i ON i.id = s.instance_id
             INNER JOIN workouts w ON w.id = i.workout_id
             WHERE s.is_completed = 1
               AND w.ended_at IS NOT NULL"
        );
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(exercise_id) = exercise_id {
            sql.push_str(" AND i.exercise_id = ?");
            bind_values.push(Value::Text(exercise_id.to_string()));
        }
        if let Some(since) = since {
            sql.push_str(" AND w.started_at >= ?");
            bind_values.push(Value::Integer(since));
        }
        sql.push_str(" ORDER BY w.started_at ASC, i.position ASC, s.set_number ASC");

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut logged = Vec::new();
        while let Some(row) = rows.next()? {
            logged.push(LoggedSet {
                exercise_id: uuid_column(row, "exercise_id")?,
                workout_id: uuid_column(row, "workout_id")?,
                workout_started_at: row.get("workout_started_at")?,
                set: parse_set_row(row)?,
            });
        }
        Ok(logged)
    }

    fn atomically<R, E: From<RepoError>>(&self, work: impl FnOnce() -> Result<R, E>) -> Result<R, E> {
        run_atomically(self.conn, work)
    }
}

// Not validated on read: the integrity checker must be able to load and report
// rows with a broken time range.
fn parse_workout_row(row: &Row<'_>) -> RepoResult<Workout> {
    Ok(Workout {
        id: uuid_column(row, "id")?,
        name: row.get("name")?,
        started_at: row.get("started_at")?,
        ended_at: row.get("ended_at")?,
        notes: row.get("notes")?,
        total_volume: row.get("total_volume")?,
        total_sets: u32_column(row, "total_sets")?,
        total_reps: u32_column(row, "total_reps")?,
        template_id: optional_uuid_column(row, "template_id")?,
    })
}

fn parse_instance_row(row: &Row<'_>) -> RepoResult<ExerciseInstance> {
    Ok(ExerciseInstance {
        id: uuid_column(row, "id")?,
        workout_id: uuid_column(row, "workout_id")?,
        exercise_id: uuid_column(row, "exercise_id")?,
        position: u32_column(row, "position")?,
        notes: row.get("notes")?,
    })
}

fn parse_set_row(row: &Row<'_>) -> RepoResult<ExerciseSet> {
    Ok(ExerciseSet {
        id: uuid_column(row, "id")?,
        instance_id: uuid_column(row, "instance_id")?,
        set_number: u32_column(row, "set_number")?,
        weight_kg: row.get("weight_kg")?,
        reps: u32_column(row, "reps")?,
        rpe: row.get("rpe")?,
        set_type: code_column(row, "set_type", SetType::parse)?,
        is_completed: bool_column(row, "is_completed")?,
        completed_at: row.get("completed_at")?,
    })
}
