// SPDX-FileCopyrightText: 2026 EcoSnap Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Workflow CRUD operations.

use ecosnap_core::{EcoSnapError, WorkflowConfig};
use rusqlite::{OptionalExtension, params};

use crate::database::{Database, map_tr_err};
use crate::models::{WORKFLOW_COLUMNS, encode_channels, workflow_from_row};
use crate::writer::with_busy_retry;

/// Insert a workflow and return its id. The `id` field of the input is ignored.
pub async fn create_workflow(db: &Database, workflow: &WorkflowConfig) -> Result<i64, EcoSnapError> {
    let workflow = workflow.clone();
    with_busy_retry(db.retry_policy(), "create_workflow", move || {
        let wf = workflow.clone();
        async move {
            db.connection()
                .call(move |conn| -> Result<i64, rusqlite::Error> {
                    conn.execute(
                        "INSERT INTO workflows (name, active, filter_device_id, filter_wake_reason, \
                         ai_base_url, model, prompt, channels, email_recipient, \
                         discord_webhook_url, discord_attach_image, nextcloud_server_url, \
                         nextcloud_room_token, nextcloud_username, nextcloud_secret) \
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
                        params![
                            wf.name,
                            wf.active,
                            wf.filter_device_id,
                            wf.filter_wake_reason,
                            wf.ai_base_url,
                            wf.model,
                            wf.prompt,
                            encode_channels(&wf.channels),
                            wf.email.recipient,
                            wf.discord.webhook_url,
                            wf.discord.attach_image,
                            wf.nextcloud.server_url,
                            wf.nextcloud.room_token,
                            wf.nextcloud.username,
                            wf.nextcloud.secret,
                        ],
                    )?;
                    Ok(conn.last_insert_rowid())
                })
                .await
        }
    })
    .await
    .map_err(into_storage)
}

/// Get a workflow by id.
pub async fn get_workflow(db: &Database, id: i64) -> Result<Option<WorkflowConfig>, EcoSnapError> {
    db.connection()
        .call(move |conn| {
            let sql = format!("SELECT {WORKFLOW_COLUMNS} FROM workflows WHERE id = ?1");
            conn.query_row(&sql, params![id], workflow_from_row)
                .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Every workflow, active or not, ordered by id.
pub async fn list_workflows(db: &Database) -> Result<Vec<WorkflowConfig>, EcoSnapError> {
    select_workflows(db, false).await
}

/// Active workflows in configuration order (ascending id).
pub async fn list_active_workflows(db: &Database) -> Result<Vec<WorkflowConfig>, EcoSnapError> {
    select_workflows(db, true).await
}

async fn select_workflows(
    db: &Database,
    active_only: bool,
) -> Result<Vec<WorkflowConfig>, EcoSnapError> {
    db.connection()
        .call(move |conn| {
            let filter = if active_only { "WHERE active = 1" } else { "" };
            let sql = format!("SELECT {WORKFLOW_COLUMNS} FROM workflows {filter} ORDER BY id ASC");
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map([], workflow_from_row)?;
            rows.collect::<Result<Vec<_>, _>>()
        })
        .await
        .map_err(map_tr_err)
}

/// Delete a workflow and, through the foreign key cascade, its audit records.
///
/// Returns `false` when no workflow had that id.
pub async fn delete_workflow(db: &Database, id: i64) -> Result<bool, EcoSnapError> {
    with_busy_retry(db.retry_policy(), "delete_workflow", move || async move {
        db.connection()
            .call(move |conn| -> Result<bool, rusqlite::Error> {
                let deleted = conn.execute("DELETE FROM workflows WHERE id = ?1", params![id])?;
                Ok(deleted > 0)
            })
            .await
    })
    .await
    .map_err(into_storage)
}

/// Workflow writes share the busy retry but are not audit writes.
fn into_storage(err: EcoSnapError) -> EcoSnapError {
    match err {
        EcoSnapError::AuditWriteFailed { source, .. } => EcoSnapError::Storage { source },
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use ecosnap_core::{ChannelKind, DiscordTarget, NextcloudTarget};

    use super::*;

    fn sample(name: &str) -> WorkflowConfig {
        WorkflowConfig {
            id: 0,
            name: name.to_string(),
            active: true,
            filter_device_id: String::new(),
            filter_wake_reason: "PIR".to_string(),
            ai_base_url: "http://localhost:11434".to_string(),
            model: "llava".to_string(),
            prompt: "Which animal is in this picture?".to_string(),
            channels: BTreeSet::from([ChannelKind::Discord, ChannelKind::Nextcloud]),
            email: Default::default(),
            discord: DiscordTarget {
                webhook_url: "https://discord.com/api/webhooks/1/abc".to_string(),
                attach_image: true,
            },
            nextcloud: NextcloudTarget {
                server_url: "https://cloud.example.org".to_string(),
                room_token: "r00m".to_string(),
                username: "cam".to_string(),
                secret: "app-password".to_string(),
            },
            created_at: String::new(),
        }
    }

    #[tokio::test]
    async fn create_and_get_round_trip() {
        let db = Database::open_in_memory().await.unwrap();
        let id = create_workflow(&db, &sample("deer watch")).await.unwrap();

        let stored = get_workflow(&db, id).await.unwrap().unwrap();
        assert_eq!(stored.id, id);
        assert_eq!(stored.name, "deer watch");
        assert_eq!(stored.channels, sample("x").channels);
        assert!(stored.discord.attach_image);
        assert_eq!(stored.nextcloud.secret, "app-password");
        assert!(!stored.created_at.is_empty());

        assert!(get_workflow(&db, id + 100).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn active_listing_skips_inactive_and_keeps_order() {
        let db = Database::open_in_memory().await.unwrap();
        let first = create_workflow(&db, &sample("first")).await.unwrap();
        let mut paused = sample("paused");
        paused.active = false;
        create_workflow(&db, &paused).await.unwrap();
        let third = create_workflow(&db, &sample("third")).await.unwrap();

        let active: Vec<i64> = list_active_workflows(&db)
            .await
            .unwrap()
            .iter()
            .map(|w| w.id)
            .collect();
        assert_eq!(active, vec![first, third]);
        assert_eq!(list_workflows(&db).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn delete_reports_whether_row_existed() {
        let db = Database::open_in_memory().await.unwrap();
        let id = create_workflow(&db, &sample("temp")).await.unwrap();
        assert!(delete_workflow(&db, id).await.unwrap());
        assert!(!delete_workflow(&db, id).await.unwrap());
    }
}
