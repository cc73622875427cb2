// SPDX-FileCopyrightText: 2026 EcoSnap Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness wiring a temp store, a temp gate, and mocks into an orchestrator.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use ecosnap_config::model::StorageConfig;
use ecosnap_core::{
    AuditRecord, ChannelKind, DiscordTarget, EcoSnapError, EmailTarget, ImageMetadata,
    WorkflowConfig, WorkflowStore,
};
use ecosnap_gate::FileGate;
use ecosnap_notify::Notifier;
use ecosnap_storage::SqliteStore;
use ecosnap_workflow::{AttemptOutcome, Orchestrator};

use crate::mock_backend::MockBackend;
use crate::mock_channel::MockChannel;

/// Builder for [`TestHarness`].
pub struct TestHarnessBuilder {
    backend: MockBackend,
    failing: Vec<(ChannelKind, String)>,
    gate_timeout: Duration,
    poll_interval: Duration,
}

impl Default for TestHarnessBuilder {
    fn default() -> Self {
        Self {
            backend: MockBackend::new(),
            failing: Vec::new(),
            gate_timeout: Duration::from_secs(2),
            poll_interval: Duration::from_millis(20),
        }
    }
}

impl TestHarnessBuilder {
    /// Successful backend responses, returned in order.
    pub fn with_backend_responses(mut self, responses: Vec<String>) -> Self {
        self.backend = MockBackend::with_responses(responses);
        self
    }

    pub fn with_backend(mut self, backend: MockBackend) -> Self {
        self.backend = backend;
        self
    }

    /// Make every send on `kind` fail with `message`.
    pub fn with_failing_channel(mut self, kind: ChannelKind, message: impl Into<String>) -> Self {
        self.failing.push((kind, message.into()));
        self
    }

    pub fn with_gate_timeout(mut self, timeout: Duration) -> Self {
        self.gate_timeout = timeout;
        self
    }

    /// Build the harness: a file-backed store and a gate token inside one temp dir.
    pub async fn build(self) -> Result<TestHarness, EcoSnapError> {
        let temp_dir = tempfile::TempDir::new()
            .map_err(|e| EcoSnapError::Internal(format!("failed to create temp dir: {e}")))?;

        let storage = StorageConfig {
            database_path: temp_dir.path().join("ecosnap.db").display().to_string(),
            retry_backoff_ms: 10,
            ..StorageConfig::default()
        };
        let store = SqliteStore::open(&storage).await?;

        let gate_path = temp_dir.path().join("ai.lock");
        let gate = FileGate::new(&gate_path).with_poll_interval(self.poll_interval);

        let channel = |kind: ChannelKind| match self.failing.iter().find(|(k, _)| *k == kind) {
            Some((_, message)) => MockChannel::failing(kind, message.clone()),
            None => MockChannel::new(kind),
        };
        let email = channel(ChannelKind::Email);
        let discord = channel(ChannelKind::Discord);
        let nextcloud = channel(ChannelKind::Nextcloud);
        let notifier = Notifier::new()
            .with_channel(Arc::new(email.clone()))
            .with_channel(Arc::new(discord.clone()))
            .with_channel(Arc::new(nextcloud.clone()));

        let orchestrator = Orchestrator::new(
            Arc::new(store.clone()),
            gate,
            Arc::new(self.backend.clone()),
            notifier,
            self.gate_timeout,
        );

        Ok(TestHarness {
            orchestrator,
            store,
            backend: self.backend,
            email,
            discord,
            nextcloud,
            gate_path,
            _temp_dir: temp_dir,
        })
    }
}

/// A wired orchestrator plus handles to every mock behind it.
///
/// The temp directory (database and gate token) is removed on drop.
pub struct TestHarness {
    pub orchestrator: Orchestrator,
    pub store: SqliteStore,
    pub backend: MockBackend,
    pub email: MockChannel,
    pub discord: MockChannel,
    pub nextcloud: MockChannel,
    /// Gate token path; a second `FileGate` on it competes with the orchestrator.
    pub gate_path: PathBuf,
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::default()
    }

    /// Directory holding the database and gate token.
    pub fn dir(&self) -> &std::path::Path {
        self._temp_dir.path()
    }

    /// Store a workflow and return it with its id filled in.
    pub async fn add_workflow(&self, mut workflow: WorkflowConfig) -> Result<WorkflowConfig, EcoSnapError> {
        workflow.id = self.store.create_workflow(&workflow).await?;
        Ok(workflow)
    }

    /// Write a small fake JPEG into the temp dir.
    pub fn write_image(&self, name: &str) -> Result<PathBuf, EcoSnapError> {
        let path = self.dir().join(name);
        std::fs::write(&path, [0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0xFF, 0xD9])
            .map_err(|e| EcoSnapError::Internal(format!("failed to write image: {e}")))?;
        Ok(path)
    }

    pub async fn process(
        &self,
        image_path: &std::path::Path,
        metadata: &ImageMetadata,
    ) -> Result<Vec<AttemptOutcome>, EcoSnapError> {
        self.orchestrator.process_image(image_path, metadata).await
    }

    /// All audit records, newest first.
    pub async fn records(&self) -> Result<Vec<AuditRecord>, EcoSnapError> {
        self.store.audit_records(None, None).await
    }

    /// A competing gate on the same token path.
    pub fn rival_gate(&self) -> FileGate {
        FileGate::new(&self.gate_path).with_poll_interval(Duration::from_millis(20))
    }
}

/// An active workflow with no filters and the given channels configured.
pub fn workflow(name: &str, channels: &[ChannelKind]) -> WorkflowConfig {
    WorkflowConfig {
        id: 0,
        name: name.to_string(),
        active: true,
        filter_device_id: String::new(),
        filter_wake_reason: String::new(),
        ai_base_url: "http://localhost:11434".to_string(),
        model: "llava".to_string(),
        prompt: "What animal is in this picture?".to_string(),
        channels: channels.iter().copied().collect::<BTreeSet<_>>(),
        email: EmailTarget {
            recipient: "ranger@example.org".to_string(),
        },
        discord: DiscordTarget {
            webhook_url: "https://discord.test/api/webhooks/1/abc".to_string(),
            attach_image: false,
        },
        nextcloud: Default::default(),
        created_at: String::new(),
    }
}
