//! Database schema migrations for dayweave.
//!
//! Migrations are versioned and applied automatically when opening the database.
//! The `schema_version` table tracks the current migration version.

use rusqlite::{Connection, Result as SqliteResult};

/// Current schema version.
///
/// Increment this when adding new migrations.
pub const SCHEMA_VERSION: i32 = 2;

/// Apply all pending migrations to bring the database to the current schema version.
///
/// # Errors
/// Returns an error if migration fails.
pub fn migrate(conn: &Connection) -> SqliteResult<()> {
    create_schema_version_table(conn)?;

    let current_version = schema_version(conn);

    if current_version < 1 {
        migrate_v1(conn)?;
    }
    if current_version < 2 {
        migrate_v2(conn)?;
    }

    Ok(())
}

fn create_schema_version_table(conn: &Connection) -> SqliteResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );",
    )
}

/// Get the current schema version from the database.
///
/// Returns 0 if no version is set (initial database).
pub fn schema_version(conn: &Connection) -> i32 {
    conn.query_row("SELECT version FROM schema_version", [], |row| {
        row.get::<_, i32>(0)
    })
    .unwrap_or_else(|e| {
        if !matches!(e, rusqlite::Error::QueryReturnedNoRows) {
            tracing::warn!(error = %e, "failed to read schema_version");
        }
        0
    })
}

fn set_schema_version(conn: &Connection, version: i32) -> SqliteResult<()> {
    conn.execute("DELETE FROM schema_version", [])?;
    conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])?;
    Ok(())
}

/// Migration v1: the items table.
///
/// Kind-specific payload lives in `details` as JSON; everything the merge
/// reads or writes by key has its own column.
fn migrate_v1(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS items (
            id                 TEXT PRIMARY KEY,
            user_id            TEXT NOT NULL,
            external_id        TEXT NOT NULL DEFAULT '',
            kind               TEXT NOT NULL,
            source             TEXT NOT NULL DEFAULT '{}',
            title              TEXT NOT NULL DEFAULT '',
            body               TEXT NOT NULL DEFAULT '',
            sender             TEXT NOT NULL DEFAULT '',
            deeplink           TEXT NOT NULL DEFAULT '',
            time_allocated     INTEGER NOT NULL DEFAULT 0,
            ordering_id        INTEGER NOT NULL DEFAULT 0,
            has_been_reordered INTEGER NOT NULL DEFAULT 0,
            is_completed       INTEGER NOT NULL DEFAULT 0,
            details            TEXT NOT NULL
        );",
    )?;
    set_schema_version(&tx, 1)?;
    tx.commit()
}

/// Migration v2: completion timestamp and the active-items index.
///
/// Existing completed rows get a timestamp of the migration time.
fn migrate_v2(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(
        "ALTER TABLE items ADD COLUMN completed_at TEXT;
         UPDATE items SET completed_at = strftime('%Y-%m-%dT%H:%M:%SZ', 'now')
             WHERE is_completed = 1;
         CREATE INDEX IF NOT EXISTS idx_items_user_active
             ON items(user_id, is_completed, ordering_id);",
    )?;
    set_schema_version(&tx, 2)?;
    tx.commit()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column_names(conn: &Connection) -> Vec<String> {
        let mut stmt = conn.prepare("PRAGMA table_info(items)").unwrap();
        stmt.query_map([], |row| row.get::<_, String>(1))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap()
    }

    #[test]
    fn test_migrate_from_scratch() {
        let conn = Connection::open_in_memory().unwrap();

        migrate(&conn).unwrap();

        assert_eq!(schema_version(&conn), SCHEMA_VERSION);
        let columns = column_names(&conn);
        for expected in ["id", "ordering_id", "has_been_reordered", "details", "completed_at"] {
            assert!(columns.iter().any(|c| c == expected), "missing column {expected}");
        }
    }

    #[test]
    fn test_migrate_idempotent() {
        let conn = Connection::open_in_memory().unwrap();

        migrate(&conn).unwrap();
        migrate(&conn).unwrap();

        assert_eq!(schema_version(&conn), SCHEMA_VERSION);
    }

    #[test]
    fn test_incremental_migration() {
        let conn = Connection::open_in_memory().unwrap();
        create_schema_version_table(&conn).unwrap();
        migrate_v1(&conn).unwrap();
        conn.execute(
            "INSERT INTO items (id, user_id, kind, is_completed, details)
             VALUES ('done', 'u', 'tracked_task', 1, '{}'),
                    ('open', 'u', 'tracked_task', 0, '{}')",
            [],
        )
        .unwrap();
        assert_eq!(schema_version(&conn), 1);

        migrate(&conn).unwrap();

        assert_eq!(schema_version(&conn), 2);
        let stamped: Option<String> = conn
            .query_row("SELECT completed_at FROM items WHERE id = 'done'", [], |row| row.get(0))
            .unwrap();
        assert!(stamped.is_some());
        let open: Option<String> = conn
            .query_row("SELECT completed_at FROM items WHERE id = 'open'", [], |row| row.get(0))
            .unwrap();
        assert!(open.is_none());
    }

    #[test]
    fn fresh_database_reports_version_zero() {
        let conn = Connection::open_in_memory().unwrap();
        create_schema_version_table(&conn).unwrap();
        assert_eq!(schema_version(&conn), 0);
    }
}
