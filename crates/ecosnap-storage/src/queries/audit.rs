// SPDX-FileCopyrightText: 2026 EcoSnap Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Append-only audit trail operations.

use ecosnap_core::types::now_timestamp;
use ecosnap_core::{AuditRecord, EcoSnapError};
use rusqlite::params;

use crate::database::{Database, map_tr_err};
use crate::models::{AUDIT_COLUMNS, audit_from_row};
use crate::writer::with_busy_retry;

/// Append one audit record and return its id.
///
/// Busy conditions are retried per the database's retry policy; exhaustion
/// or a permanent failure yields [`EcoSnapError::AuditWriteFailed`].
pub async fn insert_audit_record(db: &Database, record: &AuditRecord) -> Result<i64, EcoSnapError> {
    let mut record = record.clone();
    if record.created_at.is_empty() {
        record.created_at = now_timestamp();
    }
    with_busy_retry(db.retry_policy(), "insert_audit_record", move || {
        let r = record.clone();
        async move {
            db.connection()
                .call(move |conn| -> Result<i64, rusqlite::Error> {
                    conn.execute(
                        "INSERT INTO audit_records (workflow_id, image_path, result, \
                         notification_sent, error_message, created_at) \
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                        params![
                            r.workflow_id,
                            r.image_path,
                            r.result,
                            r.notification_sent,
                            r.error_message,
                            r.created_at,
                        ],
                    )?;
                    Ok(conn.last_insert_rowid())
                })
                .await
        }
    })
    .await
}

/// Audit records newest first, optionally for one workflow and capped at `limit`.
pub async fn list_audit_records(
    db: &Database,
    workflow_id: Option<i64>,
    limit: Option<i64>,
) -> Result<Vec<AuditRecord>, EcoSnapError> {
    db.connection()
        .call(move |conn| {
            let sql = format!(
                "SELECT {AUDIT_COLUMNS} FROM audit_records \
                 WHERE (?1 IS NULL OR workflow_id = ?1) \
                 ORDER BY id DESC LIMIT ?2"
            );
            let mut stmt = conn.prepare(&sql)?;
            // SQLite treats a negative LIMIT as unbounded.
            let rows = stmt.query_map(params![workflow_id, limit.unwrap_or(-1)], audit_from_row)?;
            rows.collect::<Result<Vec<_>, _>>()
        })
        .await
        .map_err(map_tr_err)
}

/// Number of audit records for a workflow.
pub async fn count_audit_records(db: &Database, workflow_id: i64) -> Result<i64, EcoSnapError> {
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT COUNT(*) FROM audit_records WHERE workflow_id = ?1",
                params![workflow_id],
                |row| row.get(0),
            )
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::workflows::{create_workflow, delete_workflow};
    use ecosnap_core::WorkflowConfig;

    async fn db_with_workflow() -> (Database, i64) {
        let db = Database::open_in_memory().await.unwrap();
        let wf = workflow_named("audit target");
        let id = create_workflow(&db, &wf).await.unwrap();
        (db, id)
    }

    fn workflow_named(name: &str) -> WorkflowConfig {
        WorkflowConfig {
            id: 0,
            name: name.to_string(),
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
        }
    }

    #[tokio::test]
    async fn success_and_failure_share_one_table() {
        let (db, wf) = db_with_workflow().await;
        insert_audit_record(&db, &AuditRecord::failed(wf, "/img/a.jpg", "gate timeout"))
            .await
            .unwrap();
        insert_audit_record(
            &db,
            &AuditRecord::completed(wf, "/img/b.jpg", "deer detected", true, ""),
        )
        .await
        .unwrap();

        let records = list_audit_records(&db, Some(wf), None).await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].image_path, "/img/b.jpg");
        assert!(records[0].is_success());
        assert_eq!(records[1].error_message, "gate timeout");
        assert_eq!(records[1].result, "");
        assert!(!records[1].notification_sent);
    }

    #[tokio::test]
    async fn query_filters_by_workflow_and_limits() {
        let (db, first) = db_with_workflow().await;
        let second = create_workflow(&db, &workflow_named("other"))
            .await
            .unwrap();
        for i in 0..3 {
            insert_audit_record(&db, &AuditRecord::failed(first, format!("/img/{i}.jpg"), "x"))
                .await
                .unwrap();
        }
        insert_audit_record(&db, &AuditRecord::failed(second, "/img/z.jpg", "x"))
            .await
            .unwrap();

        assert_eq!(list_audit_records(&db, None, None).await.unwrap().len(), 4);
        assert_eq!(list_audit_records(&db, Some(first), None).await.unwrap().len(), 3);
        let latest = list_audit_records(&db, Some(first), Some(1)).await.unwrap();
        assert_eq!(latest.len(), 1);
        assert_eq!(latest[0].image_path, "/img/2.jpg");
    }

    #[tokio::test]
    async fn deleting_workflow_cascades_to_records() {
        let (db, wf) = db_with_workflow().await;
        insert_audit_record(&db, &AuditRecord::failed(wf, "/img/a.jpg", "x"))
            .await
            .unwrap();
        assert_eq!(count_audit_records(&db, wf).await.unwrap(), 1);

        delete_workflow(&db, wf).await.unwrap();
        assert_eq!(count_audit_records(&db, wf).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn record_for_unknown_workflow_fails_without_retry() {
        let db = Database::open_in_memory().await.unwrap();
        let err = insert_audit_record(&db, &AuditRecord::failed(999, "/img/a.jpg", "x"))
            .await
            .unwrap_err();
        assert!(matches!(err, EcoSnapError::AuditWriteFailed { attempts: 1, .. }));
    }
}
