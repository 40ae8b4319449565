//! Row decoding and schema-check helpers shared by SQLite repositories.

use super::error::{RepoError, RepoResult};
use crate::db::table_exists;
use rusqlite::{Connection, Row};
use std::ops::Deref;
use uuid::Uuid;

/// Immediate write transaction that joins an enclosing one when open.
///
/// A scope opened on a connection already inside a transaction neither
/// commits nor rolls back; the outer owner decides. An owned scope rolls
/// back on drop unless committed.
pub(crate) struct WriteScope<'conn> {
    conn: &'conn Connection,
    owned: bool,
    finished: bool,
}

impl<'conn> WriteScope<'conn> {
    pub(crate) fn begin(conn: &'conn Connection) -> RepoResult<Self> {
        let owned = conn.is_autocommit();
        if owned {
            conn.execute_batch("BEGIN IMMEDIATE;")?;
        }
        Ok(Self {
            conn,
            owned,
            finished: false,
        })
    }

    pub(crate) fn commit(mut self) -> RepoResult<()> {
        self.finished = true;
        if self.owned {
            self.conn.execute_batch("COMMIT;")?;
        }
        Ok(())
    }
}

impl Deref for WriteScope<'_> {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        self.conn
    }
}

impl Drop for WriteScope<'_> {
    fn drop(&mut self) {
        if self.owned && !self.finished {
            let _ = self.conn.execute_batch("ROLLBACK;");
        }
    }
}

/// Runs `work` inside one write scope on `conn`; every repository call made
/// on the same connection inside `work` joins it.
pub(crate) fn run_atomically<R, E: From<RepoError>>(
    conn: &Connection,
    work: impl FnOnce() -> Result<R, E>,
) -> Result<R, E> {
    let scope = WriteScope::begin(conn)?;
    let value = work()?;
    scope.commit()?;
    Ok(value)
}

pub(crate) fn ensure_tables(conn: &Connection, tables: &[&'static str]) -> RepoResult<()> {
    for table in tables {
        if !table_exists(conn, table)? {
            return Err(RepoError::MissingRequiredTable(*table));
        }
    }
    Ok(())
}

pub(crate) fn parse_uuid(value: &str, column: &'static str) -> RepoResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid `{value}` in {column}")))
}

pub(crate) fn uuid_column(row: &Row<'_>, column: &'static str) -> RepoResult<Uuid> {
    let text: String = row.get(column)?;
    parse_uuid(&text, column)
}

pub(crate) fn optional_uuid_column(row: &Row<'_>, column: &'static str) -> RepoResult<Option<Uuid>> {
    row.get::<_, Option<String>>(column)?
        .map(|value| parse_uuid(&value, column))
        .transpose()
}

pub(crate) fn bool_column(row: &Row<'_>, column: &'static str) -> RepoResult<bool> {
    match row.get::<_, i64>(column)? {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(RepoError::InvalidData(format!(
            "invalid boolean value `{other}` in {column}"
        ))),
    }
}

/// Reads a non-negative integer column into `u32`.
pub(crate) fn u32_column(row: &Row<'_>, column: &'static str) -> RepoResult<u32> {
    let value: i64 = row.get(column)?;
    u32::try_from(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid count `{value}` in {column}")))
}

/// Decodes a text code column with the enum's `parse` function.
pub(crate) fn code_column<T>(
    row: &Row<'_>,
    column: &'static str,
    parse: impl Fn(&str) -> Option<T>,
) -> RepoResult<T> {
    let text: String = row.get(column)?;
    parse(&text).ok_or_else(|| RepoError::InvalidData(format!("invalid code `{text}` in {column}")))
}

pub(crate) fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::{run_atomically, WriteScope};
    use crate::repo::error::RepoError;
    use rusqlite::Connection;

    fn count(conn: &Connection) -> i64 {
        conn.query_row("SELECT COUNT(*) FROM marks;", [], |row| row.get(0))
            .unwrap()
    }

    fn scratch() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE marks (value INTEGER NOT NULL);")
            .unwrap();
        conn
    }

    #[test]
    fn inner_scope_joins_outer_and_rolls_back_with_it() {
        let conn = scratch();
        let result: Result<(), RepoError> = run_atomically(&conn, || {
            let inner = WriteScope::begin(&conn)?;
            inner.execute("INSERT INTO marks (value) VALUES (1);", [])?;
            inner.commit()?;
            Err(RepoError::InvalidData("stop".to_string()))
        });

        assert!(result.is_err());
        assert_eq!(count(&conn), 0);
        assert!(conn.is_autocommit());
    }

    #[test]
    fn dropped_scope_rolls_back() {
        let conn = scratch();
        {
            let scope = WriteScope::begin(&conn).unwrap();
            scope
                .execute("INSERT INTO marks (value) VALUES (1);", [])
                .unwrap();
        }
        assert_eq!(count(&conn), 0);

        let scope = WriteScope::begin(&conn).unwrap();
        scope
            .execute("INSERT INTO marks (value) VALUES (2);", [])
            .unwrap();
        scope.commit().unwrap();
        assert_eq!(count(&conn), 1);
    }
}
