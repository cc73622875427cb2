// SPDX-FileCopyrightText: 2026 EcoSnap Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Audit writes against a database locked by another connection.

use std::time::Duration;

use ecosnap_config::model::StorageConfig;
use ecosnap_core::{AuditRecord, EcoSnapError, WorkflowConfig, WorkflowStore};
use ecosnap_storage::{RetryPolicy, SqliteStore};
use tempfile::TempDir;

async fn store_with_workflow(retry: RetryPolicy) -> (TempDir, String, SqliteStore, i64) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ecosnap.db").to_string_lossy().into_owned();
    let config = StorageConfig {
        database_path: path.clone(),
        busy_timeout_ms: 10,
        ..StorageConfig::default()
    };
    let store = SqliteStore::open(&config).await.unwrap();
    let store = SqliteStore::new(store.database().clone().with_retry_policy(retry));
    let workflow = WorkflowConfig {
        id: 0,
        name: "contended".to_string(),
        active: true,
        filter_device_id: String::new(),
        filter_wake_reason: String::new(),
        ai_base_url: "http://localhost:11434".to_string(),
        model: "llava".to_string(),
        prompt: "Describe".to_string(),
        channels: Default::default(),
        email: Default::default(),
        discord: Default::default(),
        nextcloud: Default::default(),
        created_at: String::new(),
    };
    let id = store.create_workflow(&workflow).await.unwrap();
    (dir, path, store, id)
}

/// Hold a write lock from a second connection for `hold`.
fn lock_for(path: String, hold: Duration) -> std::thread::JoinHandle<()> {
    let (locked_tx, locked_rx) = std::sync::mpsc::channel();
    let handle = std::thread::spawn(move || {
        let conn = rusqlite::Connection::open(path).unwrap();
        conn.execute_batch("BEGIN IMMEDIATE;").unwrap();
        locked_tx.send(()).unwrap();
        std::thread::sleep(hold);
        conn.execute_batch("COMMIT;").unwrap();
    });
    locked_rx.recv().unwrap();
    handle
}

#[tokio::test(flavor = "multi_thread")]
async fn write_succeeds_once_lock_is_released() {
    let retry = RetryPolicy {
        attempts: 5,
        backoff: Duration::from_millis(100),
    };
    let (_dir, path, store, wf) = store_with_workflow(retry).await;

    let locker = lock_for(path, Duration::from_millis(250));
    let id = store
        .record_attempt(&AuditRecord::completed(wf, "/img/a.jpg", "fox", true, ""))
        .await
        .unwrap();
    locker.join().unwrap();

    assert!(id > 0);
    assert_eq!(store.audit_records(Some(wf), None).await.unwrap().len(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn exhausted_retries_surface_the_error() {
    let retry = RetryPolicy {
        attempts: 2,
        backoff: Duration::from_millis(10),
    };
    let (_dir, path, store, wf) = store_with_workflow(retry).await;

    let locker = lock_for(path, Duration::from_millis(1500));
    let err = store
        .record_attempt(&AuditRecord::failed(wf, "/img/a.jpg", "gate timeout"))
        .await
        .unwrap_err();
    locker.join().unwrap();

    assert!(
        matches!(err, EcoSnapError::AuditWriteFailed { attempts: 2, .. }),
        "unexpected error: {err}"
    );
    assert!(store.audit_records(Some(wf), None).await.unwrap().is_empty());
}
