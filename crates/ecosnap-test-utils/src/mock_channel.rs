// SPDX-FileCopyrightText: 2026 EcoSnap Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock notification channel for deterministic testing.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use ecosnap_core::{ChannelKind, ChannelTarget, EcoSnapError, Notification, NotificationChannel};

/// A notification channel that captures every send.
///
/// Stands in for one [`ChannelKind`]. Sends succeed unless the channel was
/// built with [`MockChannel::failing`].
#[derive(Clone)]
pub struct MockChannel {
    kind: ChannelKind,
    failure: Option<String>,
    sent: Arc<Mutex<Vec<(ChannelTarget, Notification)>>>,
}

impl MockChannel {
    pub fn new(kind: ChannelKind) -> Self {
        Self {
            kind,
            failure: None,
            sent: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// A channel whose every send fails with `message`.
    pub fn failing(kind: ChannelKind, message: impl Into<String>) -> Self {
        Self {
            failure: Some(message.into()),
            ..Self::new(kind)
        }
    }

    /// Every (target, notification) pair passed to `send()`, failures included.
    pub async fn sent(&self) -> Vec<(ChannelTarget, Notification)> {
        self.sent.lock().await.clone()
    }

    pub async fn send_count(&self) -> usize {
        self.sent.lock().await.len()
    }
}

#[async_trait]
impl NotificationChannel for MockChannel {
    fn kind(&self) -> ChannelKind {
        self.kind
    }

    async fn send(&self, target: &ChannelTarget, notification: &Notification) -> Result<(), EcoSnapError> {
        self.sent
            .lock()
            .await
            .push((target.clone(), notification.clone()));
        match &self.failure {
            Some(message) => Err(EcoSnapError::channel(self.kind, message.clone())),
            None => Ok(()),
        }
    }
}
