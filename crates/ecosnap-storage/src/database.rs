// SPDX-FileCopyrightText: 2026 EcoSnap Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All statements from one process run on tokio-rusqlite's single background
//! thread. Other processes may hold their own connections to the same file,
//! which is why writes go through [`crate::writer::with_busy_retry`].

use std::path::Path;
use std::time::Duration;

use ecosnap_config::model::StorageConfig;
use ecosnap_core::EcoSnapError;
use tracing::debug;

use crate::writer::RetryPolicy;

/// Handle to the EcoSnap SQLite database.
#[derive(Clone)]
pub struct Database {
    conn: tokio_rusqlite::Connection,
    retry: RetryPolicy,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl Database {
    /// Open (creating if needed) the database at `path` with default settings.
    pub async fn open(path: &str) -> Result<Self, EcoSnapError> {
        let config = StorageConfig {
            database_path: path.to_string(),
            ..StorageConfig::default()
        };
        Self::open_with_config(&config).await
    }

    /// Open the database described by `config`, migrating it to the current schema.
    pub async fn open_with_config(config: &StorageConfig) -> Result<Self, EcoSnapError> {
        let path = config.database_path.as_str();
        if let Some(parent) = Path::new(path).parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| EcoSnapError::Storage {
                source: Box::new(e),
            })?;
        }

        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(|e| EcoSnapError::Storage {
                source: Box::new(e),
            })?;
        let db = Self {
            conn,
            retry: RetryPolicy::from_config(config),
        };
        db.prepare(Duration::from_millis(config.busy_timeout_ms))
            .await?;
        debug!(path, "database opened");
        Ok(db)
    }

    /// In-memory database with the full schema, for tests.
    pub async fn open_in_memory() -> Result<Self, EcoSnapError> {
        let conn = tokio_rusqlite::Connection::open_in_memory()
            .await
            .map_err(|e| EcoSnapError::Storage {
                source: Box::new(e),
            })?;
        let db = Self {
            conn,
            retry: RetryPolicy::default(),
        };
        db.prepare(Duration::from_millis(StorageConfig::default().busy_timeout_ms))
            .await?;
        Ok(db)
    }

    /// Replace the retry policy used for writes.
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// Checkpoint the WAL and close the connection.
    pub async fn close(self) -> Result<(), EcoSnapError> {
        self.conn
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        self.conn.close().await.map_err(map_tr_err)?;
        debug!("database closed");
        Ok(())
    }

    async fn prepare(&self, busy_timeout: Duration) -> Result<(), EcoSnapError> {
        self.conn
            .call(move |conn| -> Result<(), EcoSnapError> {
                conn.busy_timeout(busy_timeout).map_err(storage_err)?;
                conn.execute_batch(
                    "PRAGMA journal_mode = WAL;
                     PRAGMA synchronous = NORMAL;
                     PRAGMA foreign_keys = ON;",
                )
                .map_err(storage_err)?;
                crate::migrations::run_migrations(conn)?;
                crate::schema::ensure_columns(conn).map_err(storage_err)?;
                Ok(())
            })
            .await
            .map_err(|e| match e {
                tokio_rusqlite::Error::Error(inner) => inner,
                other => EcoSnapError::Storage {
                    source: other.to_string().into(),
                },
            })
    }
}

fn storage_err(e: rusqlite::Error) -> EcoSnapError {
    EcoSnapError::Storage {
        source: Box::new(e),
    }
}

/// Convert a tokio-rusqlite error into the shared storage error.
pub fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> EcoSnapError {
    EcoSnapError::Storage {
        source: Box::new(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ADDITIVE_COLUMNS;
    use tempfile::tempdir;

    #[tokio::test]
    async fn open_creates_schema_and_parent_dir() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("ecosnap.db");
        let db = Database::open(path.to_str().unwrap()).await.unwrap();

        let (mode, fk): (String, i64) = db
            .connection()
            .call(|conn| -> Result<_, rusqlite::Error> {
                let mode = conn.query_row("PRAGMA journal_mode", [], |r| r.get(0))?;
                let fk = conn.query_row("PRAGMA foreign_keys", [], |r| r.get(0))?;
                Ok((mode, fk))
            })
            .await
            .unwrap();
        assert_eq!(mode.to_lowercase(), "wal");
        assert_eq!(fk, 1);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn reopen_is_idempotent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ecosnap.db");
        let path = path.to_str().unwrap();

        Database::open(path).await.unwrap().close().await.unwrap();
        let db = Database::open(path).await.unwrap();

        let present = db
            .connection()
            .call(|conn| -> Result<usize, rusqlite::Error> {
                let mut n = 0;
                for (table, column, _) in ADDITIVE_COLUMNS {
                    if crate::schema::table_has_column(conn, table, column)? {
                        n += 1;
                    }
                }
                Ok(n)
            })
            .await
            .unwrap();
        assert_eq!(present, ADDITIVE_COLUMNS.len());
    }

    #[tokio::test]
    async fn in_memory_database_has_tables() {
        let db = Database::open_in_memory().await.unwrap();
        let count: i64 = db
            .connection()
            .call(|conn| -> Result<i64, rusqlite::Error> {
                conn.query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' \
                     AND name IN ('workflows', 'audit_records')",
                    [],
                    |r| r.get(0),
                )
            })
            .await
            .unwrap();
        assert_eq!(count, 2);
    }
}
