//! User profile and body-weight history persistence.
//!
//! # Invariants
//! - The profile is a single row with `id = 1`; reads fall back to defaults.
//! - Weight entries are listed newest first (`recorded_at DESC, id ASC`).

use super::error::{RepoError, RepoResult};
use super::sql::{code_column, ensure_tables, u32_column, uuid_column};
use crate::model::profile::{UserProfile, WeightEntry, WeightEntryId, WeightUnit};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};

const WEIGHT_SELECT_SQL: &str = "SELECT
    id,
    weight_kg,
    recorded_at,
    note
FROM weight_history";

/// Repository interface for the profile and weight log.
pub trait ProfileRepository {
    /// Returns the stored profile or `UserProfile::default()` when unset.
    fn get_profile(&self) -> RepoResult<UserProfile>;
    fn save_profile(&self, profile: &UserProfile) -> RepoResult<()>;
    fn add_weight_entry(&self, entry: &WeightEntry) -> RepoResult<WeightEntryId>;
    /// Newest entries first. `since` bounds `recorded_at` inclusively.
    fn list_weight_entries(&self, since: Option<i64>, limit: Option<u32>)
        -> RepoResult<Vec<WeightEntry>>;
    fn latest_weight_entry(&self) -> RepoResult<Option<WeightEntry>>;
    fn delete_weight_entry(&self, id: WeightEntryId) -> RepoResult<()>;
}

pub struct SqliteProfileRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteProfileRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_tables(conn, &["user_profile", "weight_history"])?;
        Ok(Self { conn })
    }
}

impl ProfileRepository for SqliteProfileRepository<'_> {
    fn get_profile(&self) -> RepoResult<UserProfile> {
        let mut stmt = self.conn.prepare(
            "SELECT
                display_name,
                height_cm,
                birth_year,
                weight_unit,
                weekly_workout_target
             FROM user_profile
             WHERE id = 1;",
        )?;
        let mut rows = stmt.query([])?;
        match rows.next()? {
            Some(row) => parse_profile_row(row),
            None => Ok(UserProfile::default()),
        }
    }

    fn save_profile(&self, profile: &UserProfile) -> RepoResult<()> {
        profile.validate()?;

        self.conn.execute(
            "INSERT INTO user_profile (
                id,
                display_name,
                height_cm,
                birth_year,
                weight_unit,
                weekly_workout_target
            ) VALUES (1, ?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(id) DO UPDATE SET
                display_name = excluded.display_name,
                height_cm = excluded.height_cm,
                birth_year = excluded.birth_year,
                weight_unit = excluded.weight_unit,
                weekly_workout_target = excluded.weekly_workout_target,
                updated_at = (strftime('%s', 'now') * 1000);",
            params![
                profile.display_name.trim(),
                profile.height_cm,
                profile.birth_year,
                profile.weight_unit.as_str(),
                profile.weekly_workout_target,
            ],
        )?;
        Ok(())
    }

    fn add_weight_entry(&self, entry: &WeightEntry) -> RepoResult<WeightEntryId> {
        entry.validate()?;

        self.conn
            .execute(
                "INSERT INTO weight_history (id, weight_kg, recorded_at, note)
                 VALUES (?1, ?2, ?3, ?4);",
                params![
                    entry.id.to_string(),
                    entry.weight_kg,
                    entry.recorded_at,
                    entry.note.as_deref(),
                ],
            )
            .map_err(|err| {
                RepoError::from_write(err, || format!("weight entry {} already exists", entry.id))
            })?;
        Ok(entry.id)
    }

    fn list_weight_entries(
        &self,
        since: Option<i64>,
        limit: Option<u32>,
    ) -> RepoResult<Vec<WeightEntry>> {
        let mut sql = format!("{WEIGHT_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(since) = since {
            sql.push_str(" AND recorded_at >= ?");
            bind_values.push(Value::Integer(since));
        }
        sql.push_str(" ORDER BY recorded_at DESC, id ASC");
        if let Some(limit) = limit {
            sql.push_str(" LIMIT ?");
            bind_values.push(Value::Integer(i64::from(limit)));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut entries = Vec::new();
        while let Some(row) = rows.next()? {
            entries.push(parse_weight_row(row)?);
        }
        Ok(entries)
    }

    fn latest_weight_entry(&self) -> RepoResult<Option<WeightEntry>> {
        Ok(self.list_weight_entries(None, Some(1))?.into_iter().next())
    }

    fn delete_weight_entry(&self, id: WeightEntryId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM weight_history WHERE id = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::not_found("weight entry", id));
        }
        Ok(())
    }
}

fn parse_profile_row(row: &Row<'_>) -> RepoResult<UserProfile> {
    let profile = UserProfile {
        display_name: row.get("display_name")?,
        height_cm: row.get("height_cm")?,
        birth_year: row.get("birth_year")?,
        weight_unit: code_column(row, "weight_unit", WeightUnit::parse)?,
        weekly_workout_target: u32_column(row, "weekly_workout_target")?,
    };
    profile.validate()?;
    Ok(profile)
}

fn parse_weight_row(row: &Row<'_>) -> RepoResult<WeightEntry> {
    let entry = WeightEntry {
        id: uuid_column(row, "id")?,
        weight_kg: row.get("weight_kg")?,
        recorded_at: row.get("recorded_at")?,
        note: row.get("note")?,
    };
    entry.validate()?;
    Ok(entry)
}
