//! Workout template repository contracts and SQLite implementation.
//!
//! # Invariants
//! - A template and its exercise rows are written in one transaction, or
//!   inside the caller's scope opened with `atomically`.
//! - Updates replace the whole exercise list.
//! - Templates are listed by `name COLLATE NOCASE ASC, id ASC`.

use super::error::{RepoError, RepoResult};
use super::sql::{ensure_tables, run_atomically, u32_column, uuid_column, WriteScope};
use crate::model::template::{TemplateExercise, TemplateId, WorkoutTemplate};
use rusqlite::{params, Connection, Row};

const TEMPLATE_SELECT_SQL: &str = "SELECT
    id,
    name,
    description,
    times_used,
    last_used_at,
    created_at
FROM workout_templates";

/// Repository interface for workout templates.
pub trait TemplateRepository {
    fn create_template(&self, template: &WorkoutTemplate) -> RepoResult<TemplateId>;
    /// Replaces name, description and the full exercise list.
    fn update_template(&self, template: &WorkoutTemplate) -> RepoResult<()>;
    fn get_template(&self, id: TemplateId) -> RepoResult<Option<WorkoutTemplate>>;
    fn list_templates(&self) -> RepoResult<Vec<WorkoutTemplate>>;
    fn delete_template(&self, id: TemplateId) -> RepoResult<()>;
    /// Increments `times_used` and sets `last_used_at`.
    fn mark_used(&self, id: TemplateId, at: i64) -> RepoResult<()>;
    /// Runs `work` as one write; repository calls on the same connection
    /// inside it are committed together or not at all.
    fn atomically<R, E: From<RepoError>>(&self, work: impl FnOnce() -> Result<R, E>) -> Result<R, E>;
}

/// SQLite-backed template repository.
pub struct SqliteTemplateRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteTemplateRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_tables(conn, &["workout_templates", "template_exercises"])?;
        Ok(Self { conn })
    }
}

impl TemplateRepository for SqliteTemplateRepository<'_> {
    fn create_template(&self, template: &WorkoutTemplate) -> RepoResult<TemplateId> {
        template.validate()?;

        let tx = WriteScope::begin(self.conn)?;
        tx.execute(
            "INSERT INTO workout_templates (
                id,
                name,
                description,
                times_used,
                last_used_at,
                created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                template.id.to_string(),
                template.name.trim(),
                template.description.as_deref(),
                template.times_used,
                template.last_used_at,
                template.created_at,
            ],
        )?;
        insert_exercise_rows(&tx, template)?;
        tx.commit()?;

        Ok(template.id)
    }

    fn update_template(&self, template: &WorkoutTemplate) -> RepoResult<()> {
        template.validate()?;

        let tx = WriteScope::begin(self.conn)?;
        let changed = tx.execute(
            "UPDATE workout_templates
             SET
                name = ?2,
                description = ?3,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1;",
            params![
                template.id.to_string(),
                template.name.trim(),
                template.description.as_deref(),
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("template", template.id));
        }

        tx.execute(
            "DELETE FROM template_exercises WHERE template_id = ?1;",
            [template.id.to_string()],
        )?;
        insert_exercise_rows(&tx, template)?;
        tx.commit()?;
        Ok(())
    }

    fn get_template(&self, id: TemplateId) -> RepoResult<Option<WorkoutTemplate>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{TEMPLATE_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            let mut template = parse_template_row(row)?;
            template.exercises = load_exercise_rows(self.conn, template.id)?;
            return Ok(Some(template));
        }
        Ok(None)
    }

    fn list_templates(&self) -> RepoResult<Vec<WorkoutTemplate>> {
        let mut stmt = self.conn.prepare(&format!(
            "{TEMPLATE_SELECT_SQL} ORDER BY name COLLATE NOCASE ASC, id ASC;"
        ))?;
        let mut rows = stmt.query([])?;
        let mut templates = Vec::new();
        while let Some(row) = rows.next()? {
            let mut template = parse_template_row(row)?;
            template.exercises = load_exercise_rows(self.conn, template.id)?;
            templates.push(template);
        }
        Ok(templates)
    }

    fn delete_template(&self, id: TemplateId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "DELETE FROM workout_templates WHERE id = ?1;",
            [id.to_string()],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("template", id));
        }
        Ok(())
    }

    fn mark_used(&self, id: TemplateId, at: i64) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE workout_templates
             SET
                times_used = times_used + 1,
                last_used_at = ?2
             WHERE id = ?1;",
            params![id.to_string(), at],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("template", id));
        }
        Ok(())
    }

    fn atomically<R, E: From<RepoError>>(&self, work: impl FnOnce() -> Result<R, E>) -> Result<R, E> {
        run_atomically(self.conn, work)
    }
}

fn insert_exercise_rows(tx: &Connection, template: &WorkoutTemplate) -> RepoResult<()> {
    for row in &template.exercises {
        tx.execute(
            "INSERT INTO template_exercises (
                template_id,
                exercise_id,
                position,
                target_sets,
                target_reps,
                target_weight_kg,
                rest_seconds
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
            params![
                template.id.to_string(),
                row.exercise_id.to_string(),
                row.position,
                row.target_sets,
                row.target_reps,
                row.target_weight_kg,
                row.rest_seconds,
            ],
        )
        .map_err(|err| {
            RepoError::from_write(err, || {
                format!("template references unknown exercise {}", row.exercise_id)
            })
        })?;
    }
    Ok(())
}

fn load_exercise_rows(conn: &Connection, template_id: TemplateId) -> RepoResult<Vec<TemplateExercise>> {
    let mut stmt = conn.prepare(
        "SELECT
            exercise_id,
            position,
            target_sets,
            target_reps,
            target_weight_kg,
            rest_seconds
         FROM template_exercises
         WHERE template_id = ?1
         ORDER BY position ASC;",
    )?;
    let mut rows = stmt.query([template_id.to_string()])?;
    let mut exercises = Vec::new();
    while let Some(row) = rows.next()? {
        let rest_seconds = match row.get::<_, Option<i64>>("rest_seconds")? {
            Some(value) => Some(u32::try_from(value).map_err(|_| {
                RepoError::InvalidData(format!(
                    "invalid rest `{value}` in template_exercises.rest_seconds"
                ))
            })?),
            None => None,
        };
        exercises.push(TemplateExercise {
            exercise_id: uuid_column(row, "exercise_id")?,
            position: u32_column(row, "position")?,
            target_sets: u32_column(row, "target_sets")?,
            target_reps: u32_column(row, "target_reps")?,
            target_weight_kg: row.get("target_weight_kg")?,
            rest_seconds,
        });
    }
    Ok(exercises)
}

fn parse_template_row(row: &Row<'_>) -> RepoResult<WorkoutTemplate> {
    Ok(WorkoutTemplate {
        id: uuid_column(row, "id")?,
        name: row.get("name")?,
        description: row.get("description")?,
        exercises: Vec::new(),
        times_used: u32_column(row, "times_used")?,
        last_used_at: row.get("last_used_at")?,
        created_at: row.get("created_at")?,
    })
}
