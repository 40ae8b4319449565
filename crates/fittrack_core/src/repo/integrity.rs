//! Workout data-integrity validator and repairer.
//!
//! # Responsibility
//! - Detect structural drift in logged history: orphan rows, non-contiguous
//!   set numbers or instance positions, stale workout aggregates, reversed
//!   time ranges.
//! - Repair everything except time ranges in a single transaction.
//! - Provide the re-numbering primitives used by the delete paths.
//!
//! # Invariants
//! - After `repair`, `validate` reports only `InvalidTimeRange` issues.
//! - Re-numbering keeps the relative order `(set_number, id)` /
//!   `(position, id)`.

use super::error::RepoResult;
use super::sql::{parse_uuid, WriteScope};
use crate::model::workout::{InstanceId, SetId, WorkoutId, WorkoutTotals};
use log::info;
use rusqlite::{params, Connection};
use serde::Serialize;
use std::time::Instant;

/// One detected integrity problem.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IntegrityIssue {
    /// Set whose instance no longer exists.
    OrphanSet { set_id: SetId },
    /// Instance whose workout no longer exists.
    OrphanInstance { instance_id: InstanceId },
    /// Set numbers of one instance are not exactly `1..=n`.
    SetNumberGap {
        instance_id: InstanceId,
        expected: u32,
        found: u32,
    },
    /// Instance positions of one workout are not exactly `0..n`.
    InstancePositionGap {
        workout_id: WorkoutId,
        expected: u32,
        found: u32,
    },
    /// Stored totals of a finished workout differ from its sets.
    AggregateMismatch {
        workout_id: WorkoutId,
        stored: WorkoutTotals,
        actual: WorkoutTotals,
    },
    /// `ended_at` is earlier than `started_at`. Reported, never auto-fixed.
    InvalidTimeRange { workout_id: WorkoutId },
}

impl IntegrityIssue {
    pub fn is_repairable(&self) -> bool {
        !matches!(self, Self::InvalidTimeRange { .. })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IntegrityReport {
    pub issues: Vec<IntegrityIssue>,
}

impl IntegrityReport {
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn repairable_count(&self) -> usize {
        self.issues.iter().filter(|issue| issue.is_repairable()).count()
    }
}

/// Row counts touched by `repair`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RepairSummary {
    pub orphan_instances_removed: u32,
    pub orphan_sets_removed: u32,
    pub sets_renumbered: u32,
    pub instances_renumbered: u32,
    pub workouts_recomputed: u32,
}

impl RepairSummary {
    pub fn total_changes(&self) -> u32 {
        self.orphan_instances_removed
            + self.orphan_sets_removed
            + self.sets_renumbered
            + self.instances_renumbered
            + self.workouts_recomputed
    }
}

/// Scans the whole workout history and reports every issue found.
pub fn validate(conn: &Connection) -> RepoResult<IntegrityReport> {
    let started_at = Instant::now();
    let mut issues = Vec::new();

    for set_id in orphan_set_ids(conn)? {
        issues.push(IntegrityIssue::OrphanSet { set_id });
    }
    for instance_id in orphan_instance_ids(conn)? {
        issues.push(IntegrityIssue::OrphanInstance { instance_id });
    }

    for (instance_id, numbers) in grouped_sequence(
        conn,
        "SELECT instance_id, set_number FROM exercise_sets
         ORDER BY instance_id, set_number, id;",
        "exercise_sets.instance_id",
    )? {
        if let Some((expected, found)) = first_gap(&numbers, 1) {
            issues.push(IntegrityIssue::SetNumberGap {
                instance_id,
                expected,
                found,
            });
        }
    }

    for (workout_id, positions) in grouped_sequence(
        conn,
        "SELECT workout_id, position FROM exercise_instances
         ORDER BY workout_id, position, id;",
        "exercise_instances.workout_id",
    )? {
        if let Some((expected, found)) = first_gap(&positions, 0) {
            issues.push(IntegrityIssue::InstancePositionGap {
                workout_id,
                expected,
                found,
            });
        }
    }

    for (workout_id, stored) in finished_workout_totals(conn)? {
        let actual = recompute_totals(conn, workout_id)?;
        if !stored.matches(&actual) {
            issues.push(IntegrityIssue::AggregateMismatch {
                workout_id,
                stored,
                actual,
            });
        }
    }

    for workout_id in reversed_workout_ids(conn)? {
        issues.push(IntegrityIssue::InvalidTimeRange { workout_id });
    }

    info!(
        "event=integrity_validate module=repo status=ok issues={} duration_ms={}",
        issues.len(),
        started_at.elapsed().as_millis()
    );
    Ok(IntegrityReport { issues })
}

/// Repairs every repairable issue in one immediate transaction.
pub fn repair(conn: &Connection) -> RepoResult<RepairSummary> {
    let started_at = Instant::now();
    let tx = WriteScope::begin(conn)?;
    let mut summary = RepairSummary::default();

    for instance_id in orphan_instance_ids(&tx)? {
        tx.execute(
            "DELETE FROM exercise_sets WHERE instance_id = ?1;",
            [instance_id.to_string()],
        )?;
        tx.execute(
            "DELETE FROM exercise_instances WHERE id = ?1;",
            [instance_id.to_string()],
        )?;
        summary.orphan_instances_removed += 1;
    }
    for set_id in orphan_set_ids(&tx)? {
        tx.execute("DELETE FROM exercise_sets WHERE id = ?1;", [set_id.to_string()])?;
        summary.orphan_sets_removed += 1;
    }

    for instance_id in distinct_ids(&tx, "SELECT DISTINCT instance_id FROM exercise_sets;")? {
        summary.sets_renumbered += renumber_sets(&tx, instance_id)?;
    }
    for workout_id in distinct_ids(&tx, "SELECT DISTINCT workout_id FROM exercise_instances;")? {
        summary.instances_renumbered += renumber_positions(&tx, workout_id)?;
    }

    for (workout_id, stored) in finished_workout_totals(&tx)? {
        let actual = recompute_totals(&tx, workout_id)?;
        if !stored.matches(&actual) {
            tx.execute(
                "UPDATE workouts
                 SET
                    total_volume = ?2,
                    total_sets = ?3,
                    total_reps = ?4,
                    updated_at = (strftime('%s', 'now') * 1000)
                 WHERE id = ?1;",
                params![workout_id.to_string(), actual.volume, actual.sets, actual.reps],
            )?;
            summary.workouts_recomputed += 1;
        }
    }

    tx.commit()?;
    info!(
        "event=integrity_repair module=repo status=ok changes={} duration_ms={}",
        summary.total_changes(),
        started_at.elapsed().as_millis()
    );
    Ok(summary)
}

/// Rewrites set numbers of one instance to `1..=n`. Returns rows changed.
pub fn renumber_sets(conn: &Connection, instance_id: InstanceId) -> RepoResult<u32> {
    let ids = ordered_ids(
        conn,
        "SELECT id, set_number FROM exercise_sets
         WHERE instance_id = ?1
         ORDER BY set_number ASC, id ASC;",
        instance_id,
    )?;
    let mut changed = 0;
    for (index, (id, current)) in ids.into_iter().enumerate() {
        let expected = index as i64 + 1;
        if current != expected {
            conn.execute(
                "UPDATE exercise_sets SET set_number = ?2 WHERE id = ?1;",
                params![id, expected],
            )?;
            changed += 1;
        }
    }
    Ok(changed)
}

/// Rewrites instance positions of one workout to `0..n`. Returns rows changed.
pub fn renumber_positions(conn: &Connection, workout_id: WorkoutId) -> RepoResult<u32> {
    let ids = ordered_ids(
        conn,
        "SELECT id, position FROM exercise_instances
         WHERE workout_id = ?1
         ORDER BY position ASC, id ASC;",
        workout_id,
    )?;
    let mut changed = 0;
    for (index, (id, current)) in ids.into_iter().enumerate() {
        let expected = index as i64;
        if current != expected {
            conn.execute(
                "UPDATE exercise_instances SET position = ?2 WHERE id = ?1;",
                params![id, expected],
            )?;
            changed += 1;
        }
    }
    Ok(changed)
}

/// Totals derived from the completed, non-warmup sets of one workout.
pub fn recompute_totals(conn: &Connection, workout_id: WorkoutId) -> RepoResult<WorkoutTotals> {
    let (volume, sets, reps): (f64, i64, i64) = conn.query_row(
        "SELECT
            COALESCE(SUM(s.weight_kg * s.reps), 0.0),
            COUNT(s.id),
            COALESCE(SUM(s.reps), 0)
         FROM exercise_sets s
         INNER JOIN exercise_instances i ON i.id = s.instance_id
         WHERE i.workout_id = ?1
           AND s.is_completed = 1
           AND s.set_type != 'warmup';",
        [workout_id.to_string()],
        |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
    )?;
    Ok(WorkoutTotals {
        volume,
        sets: u32::try_from(sets).unwrap_or(u32::MAX),
        reps: u32::try_from(reps).unwrap_or(u32::MAX),
    })
}

/// Returns the first `(expected, found)` mismatch against `start, start+1, ..`.
fn first_gap(values: &[u32], start: u32) -> Option<(u32, u32)> {
    values
        .iter()
        .zip(start..)
        .find(|(found, expected)| **found != *expected)
        .map(|(found, expected)| (expected, *found))
}

fn orphan_set_ids(conn: &Connection) -> RepoResult<Vec<SetId>> {
    distinct_ids(
        conn,
        "SELECT s.id
         FROM exercise_sets s
         LEFT JOIN exercise_instances i ON i.id = s.instance_id
         WHERE i.id IS NULL
         ORDER BY s.id;",
    )
}

fn orphan_instance_ids(conn: &Connection) -> RepoResult<Vec<InstanceId>> {
    distinct_ids(
        conn,
        "SELECT i.id
         FROM exercise_instances i
         LEFT JOIN workouts w ON w.id = i.workout_id
         WHERE w.id IS NULL
         ORDER BY i.id;",
    )
}

fn reversed_workout_ids(conn: &Connection) -> RepoResult<Vec<WorkoutId>> {
    distinct_ids(
        conn,
        "SELECT id FROM workouts
         WHERE ended_at IS NOT NULL AND ended_at < started_at
         ORDER BY started_at;",
    )
}

fn distinct_ids(conn: &Connection, sql: &str) -> RepoResult<Vec<uuid::Uuid>> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query([])?;
    let mut ids = Vec::new();
    while let Some(row) = rows.next()? {
        let text: String = row.get(0)?;
        ids.push(parse_uuid(&text, "integrity scan id")?);
    }
    Ok(ids)
}

fn ordered_ids(conn: &Connection, sql: &str, parent: uuid::Uuid) -> RepoResult<Vec<(String, i64)>> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query([parent.to_string()])?;
    let mut ids = Vec::new();
    while let Some(row) = rows.next()? {
        ids.push((row.get(0)?, row.get(1)?));
    }
    Ok(ids)
}

fn grouped_sequence(
    conn: &Connection,
    sql: &str,
    column: &'static str,
) -> RepoResult<Vec<(uuid::Uuid, Vec<u32>)>> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query([])?;
    let mut groups: Vec<(uuid::Uuid, Vec<u32>)> = Vec::new();
    while let Some(row) = rows.next()? {
        let parent_text: String = row.get(0)?;
        let value: i64 = row.get(1)?;
        let parent = parse_uuid(&parent_text, column)?;
        // Negative numbers can never match the expected sequence.
        let value = u32::try_from(value).unwrap_or(u32::MAX);
        match groups.last_mut() {
            Some((last, values)) if *last == parent => values.push(value),
            _ => groups.push((parent, vec![value])),
        }
    }
    Ok(groups)
}

fn finished_workout_totals(conn: &Connection) -> RepoResult<Vec<(WorkoutId, WorkoutTotals)>> {
    let mut stmt = conn.prepare(
        "SELECT id, total_volume, total_sets, total_reps
         FROM workouts
         WHERE ended_at IS NOT NULL
         ORDER BY started_at, id;",
    )?;
    let mut rows = stmt.query([])?;
    let mut totals = Vec::new();
    while let Some(row) = rows.next()? {
        let id_text: String = row.get(0)?;
        let sets: i64 = row.get(2)?;
        let reps: i64 = row.get(3)?;
        totals.push((
            parse_uuid(&id_text, "workouts.id")?,
            WorkoutTotals {
                volume: row.get(1)?,
                sets: u32::try_from(sets).unwrap_or(u32::MAX),
                reps: u32::try_from(reps).unwrap_or(u32::MAX),
            },
        ));
    }
    Ok(totals)
}
