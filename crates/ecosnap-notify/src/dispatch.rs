// SPDX-FileCopyrightText: 2026 EcoSnap Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fan-out of one notification to a workflow's enabled channels.

use std::collections::BTreeMap;
use std::sync::Arc;

use ecosnap_config::EcoSnapConfig;
use ecosnap_core::{
    ChannelKind, EcoSnapError, Notification, NotificationChannel, WorkflowConfig,
};
use futures::future::join_all;
use serde::Serialize;
use tracing::{info, warn};

use crate::discord::DiscordChannel;
use crate::email::EmailChannel;
use crate::nextcloud::NextcloudChannel;

/// What happened to one channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ChannelOutcome {
    Sent,
    /// Required configuration was blank; nothing was sent.
    Skipped { missing: Vec<&'static str> },
    Failed { message: String },
}

impl ChannelOutcome {
    pub fn is_sent(&self) -> bool {
        matches!(self, ChannelOutcome::Sent)
    }
}

/// Per-channel outcomes of one dispatch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DispatchReport {
    pub outcomes: BTreeMap<ChannelKind, ChannelOutcome>,
}

impl DispatchReport {
    /// True when at least one enabled channel delivered.
    pub fn any_sent(&self) -> bool {
        self.outcomes.values().any(ChannelOutcome::is_sent)
    }

    pub fn per_channel(&self) -> BTreeMap<ChannelKind, bool> {
        self.outcomes
            .iter()
            .map(|(kind, outcome)| (*kind, outcome.is_sent()))
            .collect()
    }

    /// One line describing every channel that did not deliver.
    pub fn failure_summary(&self) -> String {
        if self.outcomes.is_empty() {
            return "no notification channels enabled".to_string();
        }
        self.outcomes
            .iter()
            .filter_map(|(kind, outcome)| match outcome {
                ChannelOutcome::Sent => None,
                ChannelOutcome::Skipped { missing } => Some(
                    EcoSnapError::ChannelNotConfigured {
                        channel: *kind,
                        missing: missing.clone(),
                    }
                    .to_string(),
                ),
                ChannelOutcome::Failed { message } => Some(format!("{kind}: {message}")),
            })
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Holds one sender per channel kind.
#[derive(Clone, Default)]
pub struct Notifier {
    channels: BTreeMap<ChannelKind, Arc<dyn NotificationChannel>>,
}

impl std::fmt::Debug for Notifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notifier")
            .field("channels", &self.channels.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Notifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the sender for its channel kind.
    pub fn with_channel(mut self, channel: Arc<dyn NotificationChannel>) -> Self {
        self.channels.insert(channel.kind(), channel);
        self
    }

    /// Email, Discord, and Nextcloud senders built from configuration.
    pub fn from_config(config: &EcoSnapConfig) -> Result<Self, EcoSnapError> {
        Ok(Self::new()
            .with_channel(Arc::new(EmailChannel::from_config(&config.email)))
            .with_channel(Arc::new(DiscordChannel::new(&config.discord)?))
            .with_channel(Arc::new(NextcloudChannel::new(&config.nextcloud)?)))
    }

    /// Send `notification` through every channel `workflow` enables.
    ///
    /// Channels run concurrently and independently; a failing or unconfigured
    /// channel never prevents the others from being tried.
    pub async fn dispatch(
        &self,
        workflow: &WorkflowConfig,
        notification: &Notification,
    ) -> DispatchReport {
        let sends = workflow.enabled_targets().into_iter().map(move |target| async move {
            let kind = target.kind();
            let missing = target.missing_fields();
            if !missing.is_empty() {
                info!(
                    workflow_id = workflow.id,
                    channel = %kind,
                    missing = %missing.join(","),
                    "channel skipped: not configured"
                );
                return (kind, ChannelOutcome::Skipped { missing });
            }
            let Some(channel) = self.channels.get(&kind) else {
                warn!(workflow_id = workflow.id, channel = %kind, "no sender registered");
                return (
                    kind,
                    ChannelOutcome::Failed {
                        message: "no sender registered".to_string(),
                    },
                );
            };
            match channel.send(&target, notification).await {
                Ok(()) => (kind, ChannelOutcome::Sent),
                Err(e) => {
                    warn!(workflow_id = workflow.id, channel = %kind, error = %e, "channel failed");
                    (
                        kind,
                        ChannelOutcome::Failed {
                            message: e.to_string(),
                        },
                    )
                }
            }
        });

        DispatchReport {
            outcomes: join_all(sends).await.into_iter().collect(),
        }
    }
}
