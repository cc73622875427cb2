// SPDX-FileCopyrightText: 2026 EcoSnap Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Notification channel trait (email, Discord, Nextcloud Talk).

use async_trait::async_trait;

use crate::error::EcoSnapError;
use crate::types::{ChannelKind, ChannelTarget, Notification};

/// A one-shot delivery mechanism for workflow results.
///
/// Implementations never retry. The dispatcher has already checked that the
/// target carries every required field before calling [`send`](Self::send).
#[async_trait]
pub trait NotificationChannel: Send + Sync + 'static {
    /// Which [`ChannelTarget`] variant this channel consumes.
    fn kind(&self) -> ChannelKind;

    /// Delivers the notification to the given target.
    async fn send(
        &self,
        target: &ChannelTarget,
        notification: &Notification,
    ) -> Result<(), EcoSnapError>;
}
