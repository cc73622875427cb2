// SPDX-FileCopyrightText: 2026 EcoSnap Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Store trait for workflow lookup and the audit trail.

use async_trait::async_trait;

use crate::error::EcoSnapError;
use crate::types::{AuditRecord, WorkflowConfig};

/// Persistence the orchestrator needs: active workflows in, audit records out.
#[async_trait]
pub trait WorkflowStore: Send + Sync + 'static {
    /// Active workflows in configuration order. Never cached by callers.
    async fn active_workflows(&self) -> Result<Vec<WorkflowConfig>, EcoSnapError>;

    /// Appends one audit record and returns its id.
    ///
    /// Transient lock contention is retried inside the store; exhausting the
    /// retries yields [`EcoSnapError::AuditWriteFailed`].
    async fn record_attempt(&self, record: &AuditRecord) -> Result<i64, EcoSnapError>;

    /// Audit records, newest first, optionally for one workflow.
    async fn audit_records(
        &self,
        workflow_id: Option<i64>,
        limit: Option<i64>,
    ) -> Result<Vec<AuditRecord>, EcoSnapError>;
}
