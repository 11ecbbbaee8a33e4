//! Idempotent schema bootstrap.
//!
//! The base table is created if missing; later columns are added with
//! `ALTER TABLE`. "already exists" answers are success, anything else is fatal.

use rusqlite::Connection;
use taskboard_types::{Error, Result};

const CREATE_ITEMS: &str = r"
    CREATE TABLE IF NOT EXISTS items (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        title TEXT NOT NULL,
        description TEXT NOT NULL,
        created_at INTEGER NOT NULL
    );
";

const COLUMN_MIGRATIONS: &[(&str, &str)] = &[
    (
        "status",
        "ALTER TABLE items ADD COLUMN status TEXT NOT NULL DEFAULT 'todo'",
    ),
    (
        "resolved",
        "ALTER TABLE items ADD COLUMN resolved INTEGER NOT NULL DEFAULT 0",
    ),
    (
        "order_index",
        "ALTER TABLE items ADD COLUMN order_index INTEGER NOT NULL DEFAULT 0",
    ),
];

pub(crate) fn apply(conn: &Connection) -> Result<()> {
    run_idempotent(conn, "items table", CREATE_ITEMS)?;
    for (column, sql) in COLUMN_MIGRATIONS {
        run_idempotent(conn, column, sql)?;
    }
    Ok(())
}

fn run_idempotent(conn: &Connection, what: &str, sql: &str) -> Result<()> {
    match conn.execute_batch(sql) {
        Ok(()) => Ok(()),
        Err(err) if is_already_exists(&err) => {
            tracing::debug!(what, "Schema element already present");
            Ok(())
        }
        Err(err) => Err(Error::Store(format!("schema init failed ({what}): {err}"))),
    }
}

fn is_already_exists(err: &rusqlite::Error) -> bool {
    let message = match err {
        rusqlite::Error::SqliteFailure(_, Some(message)) => message.as_str(),
        _ => return false,
    };
    let lower = message.to_ascii_lowercase();
    lower.contains("duplicate column name") || lower.contains("already exists")
}
