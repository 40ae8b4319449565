//! Exercise catalog repository contracts and SQLite implementation.
//!
//! # Invariants
//! - Names are unique case-insensitively (`idx_exercises_name`).
//! - Archived exercises are hidden from lists unless explicitly requested.
//! - Listing is deterministic: `name COLLATE NOCASE ASC, id ASC`.

use super::error::{RepoError, RepoResult};
use super::sql::{bool_column, bool_to_int, code_column, ensure_tables, uuid_column};
use crate::model::exercise::{
    decode_muscle_groups, encode_muscle_groups, Equipment, Exercise, ExerciseCategory,
    ExerciseId, MuscleGroup,
};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};

const EXERCISE_SELECT_SQL: &str = "SELECT
    id,
    name,
    category,
    muscle_groups,
    equipment,
    is_custom,
    is_archived
FROM exercises";

/// Query options for listing exercises.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExerciseListQuery {
    pub category: Option<ExerciseCategory>,
    pub muscle_group: Option<MuscleGroup>,
    /// Case-insensitive substring match on name.
    pub name_contains: Option<String>,
    pub include_archived: bool,
}

/// Repository interface for the exercise catalog.
pub trait ExerciseRepository {
    fn create_exercise(&self, exercise: &Exercise) -> RepoResult<ExerciseId>;
    fn update_exercise(&self, exercise: &Exercise) -> RepoResult<()>;
    fn get_exercise(&self, id: ExerciseId) -> RepoResult<Option<Exercise>>;
    /// Case-insensitive exact name lookup, archived rows included.
    fn find_by_name(&self, name: &str) -> RepoResult<Option<Exercise>>;
    fn list_exercises(&self, query: &ExerciseListQuery) -> RepoResult<Vec<Exercise>>;
    fn archive_exercise(&self, id: ExerciseId) -> RepoResult<()>;
    fn count_exercises(&self) -> RepoResult<u32>;
}

/// SQLite-backed exercise repository.
pub struct SqliteExerciseRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteExerciseRepository<'conn> {
    /// Constructs a repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_tables(conn, &["exercises"])?;
        Ok(Self { conn })
    }
}

impl ExerciseRepository for SqliteExerciseRepository<'_> {
    fn create_exercise(&self, exercise: &Exercise) -> RepoResult<ExerciseId> {
        exercise.validate()?;

        self.conn
            .execute(
                "INSERT INTO exercises (
                    id,
                    name,
                    category,
                    muscle_groups,
                    equipment,
                    is_custom,
                    is_archived
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
                params![
                    exercise.id.to_string(),
                    exercise.name.trim(),
                    exercise.category.as_str(),
                    encode_muscle_groups(&exercise.muscle_groups),
                    exercise.equipment.as_str(),
                    bool_to_int(exercise.is_custom),
                    bool_to_int(exercise.is_archived),
                ],
            )
            .map_err(|err| {
                RepoError::from_write(err, || {
                    format!("exercise `{}` already exists", exercise.name.trim())
                })
            })?;

        Ok(exercise.id)
    }

    fn update_exercise(&self, exercise: &Exercise) -> RepoResult<()> {
        exercise.validate()?;

        let changed = self
            .conn
            .execute(
                "UPDATE exercises
                 SET
                    name = ?2,
                    category = ?3,
                    muscle_groups = ?4,
                    equipment = ?5,
                    is_custom = ?6,
                    is_archived = ?7,
                    updated_at = (strftime('%s', 'now') * 1000)
                 WHERE id = ?1;",
                params![
                    exercise.id.to_string(),
                    exercise.name.trim(),
                    exercise.category.as_str(),
                    encode_muscle_groups(&exercise.muscle_groups),
                    exercise.equipment.as_str(),
                    bool_to_int(exercise.is_custom),
                    bool_to_int(exercise.is_archived),
                ],
            )
            .map_err(|err| {
                RepoError::from_write(err, || {
                    format!("exercise `{}` already exists", exercise.name.trim())
                })
            })?;

        if changed == 0 {
            return Err(RepoError::not_found("exercise", exercise.id));
        }
        Ok(())
    }

    fn get_exercise(&self, id: ExerciseId) -> RepoResult<Option<Exercise>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{EXERCISE_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_exercise_row(row)?));
        }
        Ok(None)
    }

    fn find_by_name(&self, name: &str) -> RepoResult<Option<Exercise>> {
        let mut stmt = self.conn.prepare(&format!(
            "{EXERCISE_SELECT_SQL} WHERE name = ?1 COLLATE NOCASE;"
        ))?;
        let mut rows = stmt.query([name.trim()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_exercise_row(row)?));
        }
        Ok(None)
    }

    fn list_exercises(&self, query: &ExerciseListQuery) -> RepoResult<Vec<Exercise>> {
        let mut sql = format!("{EXERCISE_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if !query.include_archived {
            sql.push_str(" AND is_archived = 0");
        }
        if let Some(category) = query.category {
            sql.push_str(" AND category = ?");
            bind_values.push(Value::Text(category.as_str().to_string()));
        }
        if let Some(group) = query.muscle_group {
            sql.push_str(" AND instr(',' || muscle_groups || ',', ?) > 0");
            bind_values.push(Value::Text(format!(",{},", group.as_str())));
        }
        if let Some(needle) = query
            .name_contains
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
        {
            sql.push_str(" AND instr(lower(name), lower(?)) > 0");
            bind_values.push(Value::Text(needle.to_string()));
        }

        sql.push_str(" ORDER BY name COLLATE NOCASE ASC, id ASC");

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut exercises = Vec::new();
        while let Some(row) = rows.next()? {
            exercises.push(parse_exercise_row(row)?);
        }
        Ok(exercises)
    }

    fn archive_exercise(&self, id: ExerciseId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE exercises
             SET
                is_archived = 1,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1;",
            [id.to_string()],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("exercise", id));
        }
        Ok(())
    }

    fn count_exercises(&self) -> RepoResult<u32> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM exercises;", [], |row| row.get(0))?;
        Ok(u32::try_from(count).unwrap_or(u32::MAX))
    }
}

fn parse_exercise_row(row: &Row<'_>) -> RepoResult<Exercise> {
    let muscle_text: String = row.get("muscle_groups")?;
    let muscle_groups = decode_muscle_groups(&muscle_text).map_err(|code| {
        RepoError::InvalidData(format!(
            "invalid muscle group `{code}` in exercises.muscle_groups"
        ))
    })?;

    let exercise = Exercise {
        id: uuid_column(row, "id")?,
        name: row.get("name")?,
        category: code_column(row, "category", ExerciseCategory::parse)?,
        muscle_groups,
        equipment: code_column(row, "equipment", Equipment::parse)?,
        is_custom: bool_column(row, "is_custom")?,
        is_archived: bool_column(row, "is_archived")?,
    };
    exercise.validate()?;
    Ok(exercise)
}
