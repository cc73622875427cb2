// SPDX-FileCopyrightText: 2026 EcoSnap Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Drives gate -> analysis -> notify -> record for each matching workflow.
//!
//! Every (workflow, image) pair ends in exactly one audit record, whatever
//! failed along the way. The only error that reaches the caller is a failed
//! audit write (or a failure to load the workflows in the first place).

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use ecosnap_core::{
    AnalysisBackend, AnalysisRequest, AuditRecord, EcoSnapError, ImageMetadata, WorkflowConfig,
    WorkflowStore,
};
use ecosnap_gate::FileGate;
use ecosnap_notify::{DispatchReport, Notifier};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::matcher::select;
use crate::message::compose;

/// Error text recorded when the gate could not be acquired in time.
pub const GATE_TIMEOUT_MESSAGE: &str = "gate timeout";

/// States of one (workflow, image) attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptState {
    Matched,
    GateWait,
    /// Terminal: the gate stayed busy.
    GateTimedOut,
    GateHeld,
    AnalysisRunning,
    /// Terminal: the backend failed; the gate has been released.
    AnalysisFailed,
    AnalysisSucceeded,
    Notifying,
    /// Terminal: notifications dispatched and the attempt recorded.
    Recorded,
}

impl std::fmt::Display for AttemptState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AttemptState::Matched => write!(f, "matched"),
            AttemptState::GateWait => write!(f, "gate-wait"),
            AttemptState::GateTimedOut => write!(f, "gate-timed-out"),
            AttemptState::GateHeld => write!(f, "gate-held"),
            AttemptState::AnalysisRunning => write!(f, "analysis-running"),
            AttemptState::AnalysisFailed => write!(f, "analysis-failed"),
            AttemptState::AnalysisSucceeded => write!(f, "analysis-succeeded"),
            AttemptState::Notifying => write!(f, "notifying"),
            AttemptState::Recorded => write!(f, "recorded"),
        }
    }
}

/// Result of one (workflow, image) attempt.
#[derive(Debug, Clone, Serialize)]
pub struct AttemptOutcome {
    pub workflow_name: String,
    /// Terminal state the attempt reached.
    pub state: AttemptState,
    /// The stored record, with its id filled in.
    pub record: AuditRecord,
    /// Present when notifications were dispatched.
    pub dispatch: Option<DispatchReport>,
}

/// Processes uploaded images against the configured workflows.
pub struct Orchestrator {
    store: Arc<dyn WorkflowStore>,
    gate: FileGate,
    backend: Arc<dyn AnalysisBackend>,
    notifier: Notifier,
    gate_timeout: Duration,
}

impl Orchestrator {
    pub fn new(
        store: Arc<dyn WorkflowStore>,
        gate: FileGate,
        backend: Arc<dyn AnalysisBackend>,
        notifier: Notifier,
        gate_timeout: Duration,
    ) -> Self {
        Self {
            store,
            gate,
            backend,
            notifier,
            gate_timeout,
        }
    }

    pub fn gate(&self) -> &FileGate {
        &self.gate
    }

    /// Run every matching workflow on `image_path`, one at a time.
    ///
    /// Workflows are loaded fresh on each call. Returns one outcome per
    /// matching workflow, in configuration order.
    pub async fn process_image(
        &self,
        image_path: &Path,
        metadata: &ImageMetadata,
    ) -> Result<Vec<AttemptOutcome>, EcoSnapError> {
        match self.gate.reclaim_stale() {
            Ok(true) => info!("idle sweep removed a stale gate token"),
            Ok(false) => {}
            Err(e) => warn!(error = %e, "idle gate sweep failed"),
        }

        let workflows = select(self.store.active_workflows().await?, metadata);
        info!(
            image = %image_path.display(),
            device_id = %metadata.device_id,
            wake_reason = %metadata.wake_reason,
            matched = workflows.len(),
            "processing image"
        );

        let mut outcomes = Vec::with_capacity(workflows.len());
        for workflow in &workflows {
            outcomes.push(self.run_workflow(workflow, image_path, metadata).await?);
        }
        Ok(outcomes)
    }

    async fn run_workflow(
        &self,
        workflow: &WorkflowConfig,
        image_path: &Path,
        metadata: &ImageMetadata,
    ) -> Result<AttemptOutcome, EcoSnapError> {
        let image = image_path.to_string_lossy().into_owned();
        let mut state = AttemptState::Matched;
        debug!(workflow_id = workflow.id, %state, "attempt started");

        state = AttemptState::GateWait;
        debug!(workflow_id = workflow.id, %state, timeout_secs = self.gate_timeout.as_secs());
        let guard = match self.gate.acquire_guard(self.gate_timeout).await {
            Ok(Some(guard)) => guard,
            Ok(None) => {
                warn!(workflow_id = workflow.id, image = %image, "AI backend busy, giving up");
                let record = AuditRecord::failed(workflow.id, &image, GATE_TIMEOUT_MESSAGE);
                return self
                    .finish(workflow, AttemptState::GateTimedOut, record, None)
                    .await;
            }
            Err(e) => {
                warn!(workflow_id = workflow.id, error = %e, "gate unavailable");
                let record = AuditRecord::failed(workflow.id, &image, e.to_string());
                return self
                    .finish(workflow, AttemptState::GateTimedOut, record, None)
                    .await;
            }
        };

        state = AttemptState::GateHeld;
        debug!(workflow_id = workflow.id, %state, holder = %guard.holder_id());

        state = AttemptState::AnalysisRunning;
        debug!(workflow_id = workflow.id, %state, backend = self.backend.name());
        let request = AnalysisRequest {
            base_url: workflow.ai_base_url.clone(),
            model: workflow.model.clone(),
            prompt: workflow.prompt.clone(),
            image_path: image_path.to_path_buf(),
        };
        let analysis = self.backend.analyze(&request).await;
        guard.release();

        let result = match analysis {
            Ok(text) => text,
            Err(e) => {
                warn!(workflow_id = workflow.id, error = %e, "analysis failed");
                let record = AuditRecord::failed(workflow.id, &image, e.to_string());
                return self
                    .finish(workflow, AttemptState::AnalysisFailed, record, None)
                    .await;
            }
        };
        state = AttemptState::AnalysisSucceeded;
        debug!(workflow_id = workflow.id, %state, chars = result.len());

        state = AttemptState::Notifying;
        debug!(workflow_id = workflow.id, %state, channels = workflow.channels.len());
        let notification = compose(workflow, metadata, &result, image_path);
        let report = self.notifier.dispatch(workflow, &notification).await;
        let sent = report.any_sent();
        let error = if sent {
            String::new()
        } else {
            report.failure_summary()
        };

        let record = AuditRecord::completed(workflow.id, &image, result, sent, error);
        self.finish(workflow, AttemptState::Recorded, record, Some(report))
            .await
    }

    async fn finish(
        &self,
        workflow: &WorkflowConfig,
        state: AttemptState,
        mut record: AuditRecord,
        dispatch: Option<DispatchReport>,
    ) -> Result<AttemptOutcome, EcoSnapError> {
        record.id = self.store.record_attempt(&record).await?;
        info!(
            workflow_id = workflow.id,
            record_id = record.id,
            %state,
            sent = record.notification_sent,
            error = %record.error_message,
            "attempt recorded"
        );
        Ok(AttemptOutcome {
            workflow_name: workflow.name.clone(),
            state,
            record,
            dispatch,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn states_display_as_kebab_case() {
        assert_eq!(AttemptState::GateTimedOut.to_string(), "gate-timed-out");
        assert_eq!(AttemptState::Recorded.to_string(), "recorded");
    }
}
