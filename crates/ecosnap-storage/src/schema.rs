// SPDX-FileCopyrightText: 2026 EcoSnap Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Additive schema upgrades applied after the embedded migrations.
//!
//! Databases created by earlier releases lack some columns. Each column is
//! checked against `PRAGMA table_info` before it is added, so the pass is
//! idempotent and runs on every open.

use rusqlite::Connection;
use tracing::info;

/// `(table, column, definition)` for every column added after the base schema.
pub const ADDITIVE_COLUMNS: &[(&str, &str, &str)] = &[
    (
        "workflows",
        "discord_attach_image",
        "INTEGER NOT NULL DEFAULT 0",
    ),
    ("workflows", "nextcloud_server_url", "TEXT NOT NULL DEFAULT ''"),
    ("workflows", "nextcloud_room_token", "TEXT NOT NULL DEFAULT ''"),
    ("workflows", "nextcloud_username", "TEXT NOT NULL DEFAULT ''"),
    ("workflows", "nextcloud_secret", "TEXT NOT NULL DEFAULT ''"),
    ("audit_records", "error_message", "TEXT NOT NULL DEFAULT ''"),
];

/// Whether `table` currently has a column named `column`.
pub fn table_has_column(conn: &Connection, table: &str, column: &str) -> rusqlite::Result<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table})"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let name: String = row.get(1)?;
        if name == column {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Add every missing column from [`ADDITIVE_COLUMNS`]. Returns how many were added.
pub fn ensure_columns(conn: &Connection) -> rusqlite::Result<usize> {
    let mut added = 0;
    for (table, column, definition) in ADDITIVE_COLUMNS {
        if table_has_column(conn, table, column)? {
            continue;
        }
        conn.execute_batch(&format!(
            "ALTER TABLE {table} ADD COLUMN {column} {definition};"
        ))?;
        info!(table, column, "added column");
        added += 1;
    }
    Ok(added)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn legacy_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE workflows (id INTEGER PRIMARY KEY, name TEXT NOT NULL);
             CREATE TABLE audit_records (id INTEGER PRIMARY KEY, workflow_id INTEGER);
             INSERT INTO workflows (id, name) VALUES (1, 'legacy');",
        )
        .unwrap();
        conn
    }

    #[test]
    fn adds_missing_columns_once() {
        let conn = legacy_db();
        assert!(!table_has_column(&conn, "audit_records", "error_message").unwrap());

        assert_eq!(ensure_columns(&conn).unwrap(), ADDITIVE_COLUMNS.len());
        assert_eq!(ensure_columns(&conn).unwrap(), 0);

        for (table, column, _) in ADDITIVE_COLUMNS {
            assert!(table_has_column(&conn, table, column).unwrap(), "{table}.{column}");
        }
    }

    #[test]
    fn existing_rows_get_defaults() {
        let conn = legacy_db();
        ensure_columns(&conn).unwrap();
        let (attach, secret): (i64, String) = conn
            .query_row(
                "SELECT discord_attach_image, nextcloud_secret FROM workflows WHERE id = 1",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .unwrap();
        assert_eq!(attach, 0);
        assert_eq!(secret, "");
    }

    #[test]
    fn skips_only_present_columns() {
        let conn = legacy_db();
        conn.execute_batch("ALTER TABLE audit_records ADD COLUMN error_message TEXT;")
            .unwrap();
        assert_eq!(ensure_columns(&conn).unwrap(), ADDITIVE_COLUMNS.len() - 1);
    }
}
