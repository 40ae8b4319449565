//! Schema migration registry for the FitTrack database.
//!
//! # Responsibility
//! - Declare the ordered list of schema steps shipped with this binary.
//! - Bring a connection up to the newest step inside one transaction.
//!
//! # Invariants
//! - Step versions start at 1 and increase by exactly one.
//! - `PRAGMA user_version` always equals the last applied step.

use crate::db::{DbError, DbResult};
use log::{debug, info};
use rusqlite::{Connection, TransactionBehavior};

/// One schema step.
#[derive(Debug, Clone, Copy)]
pub struct SchemaStep {
    pub version: u32,
    pub name: &'static str,
    sql: &'static str,
}

const STEPS: &[SchemaStep] = &[
    SchemaStep {
        version: 1,
        name: "workout_log",
        sql: include_str!("0001_init.sql"),
    },
    SchemaStep {
        version: 2,
        name: "weekly_routines",
        sql: include_str!("0002_routines.sql"),
    },
];

/// Newest schema version this binary can write.
pub fn latest_version() -> u32 {
    STEPS.last().map_or(0, |step| step.version)
}

/// Reads the schema version stored in `PRAGMA user_version`.
pub fn current_user_version(conn: &Connection) -> DbResult<u32> {
    Ok(conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?)
}

/// Steps not yet applied to `conn`, oldest first.
///
/// # Errors
/// - `UnsupportedSchemaVersion` when the database is newer than this binary.
pub fn pending_steps(conn: &Connection) -> DbResult<Vec<SchemaStep>> {
    let db_version = current_user_version(conn)?;
    let latest = latest_version();
    if db_version > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported: latest,
        });
    }
    Ok(STEPS
        .iter()
        .filter(|step| step.version > db_version)
        .copied()
        .collect())
}

/// Applies every pending step; no-op on an up-to-date database.
///
/// Pending steps are re-read under an immediate write lock, so two
/// connections racing on a fresh file apply each step once.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<()> {
    if pending_steps(conn)?.is_empty() {
        return Ok(());
    }

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let from_version = current_user_version(&tx)?;
    let pending = pending_steps(&tx)?;
    for step in &pending {
        tx.execute_batch(step.sql)?;
        tx.pragma_update(None, "user_version", step.version)?;
        debug!(
            "event=db_migrate_step module=db status=ok version={} name={}",
            step.version, step.name
        );
    }
    tx.commit()?;

    if !pending.is_empty() {
        info!(
            "event=db_migrate module=db status=ok from_version={from_version} to_version={} steps={}",
            latest_version(),
            pending.len()
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::STEPS;

    #[test]
    fn step_versions_are_contiguous() {
        for (index, step) in STEPS.iter().enumerate() {
            assert_eq!(step.version as usize, index + 1, "{}", step.name);
        }
    }
}
