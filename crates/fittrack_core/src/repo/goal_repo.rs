//! Goal repository contracts and SQLite implementation.

use super::error::{RepoError, RepoResult};
use super::sql::{code_column, ensure_tables, optional_uuid_column, uuid_column};
use crate::model::exercise::ExerciseId;
use crate::model::goal::{Goal, GoalId, GoalStatus, GoalType};
use rusqlite::{params, Connection, Row};

const GOAL_SELECT_SQL: &str = "SELECT
    id,
    title,
    goal_type,
    exercise_id,
    start_value,
    target_value,
    current_value,
    deadline,
    status,
    created_at,
    completed_at
FROM goals";

/// Repository interface for goals.
pub trait GoalRepository {
    fn create_goal(&self, goal: &Goal) -> RepoResult<GoalId>;
    fn update_goal(&self, goal: &Goal) -> RepoResult<()>;
    fn get_goal(&self, id: GoalId) -> RepoResult<Option<Goal>>;
    /// Lists goals, newest first, optionally filtered by status.
    fn list_goals(&self, status: Option<GoalStatus>) -> RepoResult<Vec<Goal>>;
    fn delete_goal(&self, id: GoalId) -> RepoResult<()>;
    /// Active personal-record goals bound to one exercise.
    fn active_goals_for_exercise(&self, exercise_id: ExerciseId) -> RepoResult<Vec<Goal>>;
}

pub struct SqliteGoalRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteGoalRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_tables(conn, &["goals"])?;
        Ok(Self { conn })
    }

    fn query_goals(&self, sql: &str, bind: &[&dyn rusqlite::ToSql]) -> RepoResult<Vec<Goal>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query(bind)?;
        let mut goals = Vec::new();
        while let Some(row) = rows.next()? {
            goals.push(parse_goal_row(row)?);
        }
        Ok(goals)
    }
}

impl GoalRepository for SqliteGoalRepository<'_> {
    fn create_goal(&self, goal: &Goal) -> RepoResult<GoalId> {
        goal.validate()?;

        self.conn
            .execute(
                "INSERT INTO goals (
                    id,
                    title,
                    goal_type,
                    exercise_id,
                    start_value,
                    target_value,
                    current_value,
                    deadline,
                    status,
                    created_at,
                    completed_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11);",
                params![
                    goal.id.to_string(),
                    goal.title.as_str(),
                    goal.goal_type.as_str(),
                    goal.exercise_id.map(|id| id.to_string()),
                    goal.start_value,
                    goal.target_value,
                    goal.current_value,
                    goal.deadline,
                    goal.status.as_str(),
                    goal.created_at,
                    goal.completed_at,
                ],
            )
            .map_err(|err| {
                RepoError::from_write(err, || "goal references an unknown exercise".to_string())
            })?;
        Ok(goal.id)
    }

    fn update_goal(&self, goal: &Goal) -> RepoResult<()> {
        goal.validate()?;

        let changed = self.conn.execute(
            "UPDATE goals
             SET
                title = ?2,
                goal_type = ?3,
                exercise_id = ?4,
                start_value = ?5,
                target_value = ?6,
                current_value = ?7,
                deadline = ?8,
                status = ?9,
                completed_at = ?10
             WHERE id = ?1;",
            params![
                goal.id.to_string(),
                goal.title.as_str(),
                goal.goal_type.as_str(),
                goal.exercise_id.map(|id| id.to_string()),
                goal.start_value,
                goal.target_value,
                goal.current_value,
                goal.deadline,
                goal.status.as_str(),
                goal.completed_at,
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("goal", goal.id));
        }
        Ok(())
    }

    fn get_goal(&self, id: GoalId) -> RepoResult<Option<Goal>> {
        let goals = self.query_goals(
            &format!("{GOAL_SELECT_SQL} WHERE id = ?1;"),
            &[&id.to_string()],
        )?;
        Ok(goals.into_iter().next())
    }

    fn list_goals(&self, status: Option<GoalStatus>) -> RepoResult<Vec<Goal>> {
        match status {
            Some(status) => self.query_goals(
                &format!("{GOAL_SELECT_SQL} WHERE status = ?1 ORDER BY created_at DESC, id ASC;"),
                &[&status.as_str()],
            ),
            None => self.query_goals(
                &format!("{GOAL_SELECT_SQL} ORDER BY created_at DESC, id ASC;"),
                &[],
            ),
        }
    }

    fn delete_goal(&self, id: GoalId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM goals WHERE id = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::not_found("goal", id));
        }
        Ok(())
    }

    fn active_goals_for_exercise(&self, exercise_id: ExerciseId) -> RepoResult<Vec<Goal>> {
        self.query_goals(
            &format!(
                "{GOAL_SELECT_SQL}
                 WHERE exercise_id = ?1
                   AND goal_type = 'personal_record'
                   AND status = 'active'
                 ORDER BY created_at ASC, id ASC;"
            ),
            &[&exercise_id.to_string()],
        )
    }
}

fn parse_goal_row(row: &Row<'_>) -> RepoResult<Goal> {
    let goal = Goal {
        id: uuid_column(row, "id")?,
        title: row.get("title")?,
        goal_type: code_column(row, "goal_type", GoalType::parse)?,
        exercise_id: optional_uuid_column(row, "exercise_id")?,
        start_value: row.get("start_value")?,
        target_value: row.get("target_value")?,
        current_value: row.get("current_value")?,
        deadline: row.get("deadline")?,
        status: code_column(row, "status", GoalStatus::parse)?,
        created_at: row.get("created_at")?,
        completed_at: row.get("completed_at")?,
    };
    goal.validate()?;
    Ok(goal)
}
