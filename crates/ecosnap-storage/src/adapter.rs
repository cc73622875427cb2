// SPDX-FileCopyrightText: 2026 EcoSnap Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the [`WorkflowStore`] trait.

use async_trait::async_trait;
use tracing::debug;

use ecosnap_config::model::StorageConfig;
use ecosnap_core::{AuditRecord, EcoSnapError, WorkflowConfig, WorkflowStore};

use crate::database::Database;
use crate::queries;

/// SQLite-backed workflow and audit store.
///
/// Wraps a [`Database`] handle and delegates to the typed query modules.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    db: Database,
}

impl SqliteStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Open the configured database, running migrations.
    pub async fn open(config: &StorageConfig) -> Result<Self, EcoSnapError> {
        let db = Database::open_with_config(config).await?;
        debug!(path = %config.database_path, "SQLite store initialized");
        Ok(Self::new(db))
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub async fn create_workflow(&self, workflow: &WorkflowConfig) -> Result<i64, EcoSnapError> {
        queries::workflows::create_workflow(&self.db, workflow).await
    }

    pub async fn get_workflow(&self, id: i64) -> Result<Option<WorkflowConfig>, EcoSnapError> {
        queries::workflows::get_workflow(&self.db, id).await
    }

    pub async fn list_workflows(&self) -> Result<Vec<WorkflowConfig>, EcoSnapError> {
        queries::workflows::list_workflows(&self.db).await
    }

    pub async fn delete_workflow(&self, id: i64) -> Result<bool, EcoSnapError> {
        queries::workflows::delete_workflow(&self.db, id).await
    }

    pub async fn close(self) -> Result<(), EcoSnapError> {
        self.db.close().await
    }
}

#[async_trait]
impl WorkflowStore for SqliteStore {
    async fn active_workflows(&self) -> Result<Vec<WorkflowConfig>, EcoSnapError> {
        queries::workflows::list_active_workflows(&self.db).await
    }

    async fn record_attempt(&self, record: &AuditRecord) -> Result<i64, EcoSnapError> {
        queries::audit::insert_audit_record(&self.db, record).await
    }

    async fn audit_records(
        &self,
        workflow_id: Option<i64>,
        limit: Option<i64>,
    ) -> Result<Vec<AuditRecord>, EcoSnapError> {
        queries::audit::list_audit_records(&self.db, workflow_id, limit).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::tempdir;

    fn workflow(name: &str, active: bool) -> WorkflowConfig {
        WorkflowConfig {
            id: 0,
            name: name.to_string(),
            active,
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
    async fn store_is_usable_through_the_trait() {
        let dir = tempdir().unwrap();
        let config = StorageConfig {
            database_path: dir.path().join("ecosnap.db").to_string_lossy().into_owned(),
            ..StorageConfig::default()
        };
        let store = SqliteStore::open(&config).await.unwrap();
        let id = store.create_workflow(&workflow("on", true)).await.unwrap();
        store.create_workflow(&workflow("off", false)).await.unwrap();

        let dyn_store: Arc<dyn WorkflowStore> = Arc::new(store.clone());
        let active = dyn_store.active_workflows().await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, id);

        let record_id = dyn_store
            .record_attempt(&AuditRecord::failed(id, "/img/a.jpg", "gate timeout"))
            .await
            .unwrap();
        assert!(record_id > 0);
        assert_eq!(dyn_store.audit_records(Some(id), None).await.unwrap().len(), 1);

        store.close().await.unwrap();
    }

    #[tokio::test]
    async fn configuration_changes_are_seen_without_caching() {
        let store = SqliteStore::new(Database::open_in_memory().await.unwrap());
        assert!(store.active_workflows().await.unwrap().is_empty());

        let id = store.create_workflow(&workflow("new", true)).await.unwrap();
        assert_eq!(store.active_workflows().await.unwrap().len(), 1);

        store.delete_workflow(id).await.unwrap();
        assert!(store.active_workflows().await.unwrap().is_empty());
    }
}
