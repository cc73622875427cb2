// SPDX-FileCopyrightText: 2026 EcoSnap Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Notification channels for EcoSnap.
//!
//! Each channel implements [`ecosnap_core::NotificationChannel`]; the
//! [`Notifier`] sends one notification through every channel a workflow
//! enables and reports each outcome separately.

pub mod discord;
pub mod dispatch;
pub mod email;
pub mod nextcloud;

pub use discord::DiscordChannel;
pub use dispatch::{ChannelOutcome, DispatchReport, Notifier};
pub use email::{EmailChannel, MxResolver, RelayResolver};
pub use nextcloud::NextcloudChannel;
