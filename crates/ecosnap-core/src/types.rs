// SPDX-FileCopyrightText: 2026 EcoSnap Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared across the gate, channels, store, and orchestrator.

use std::collections::BTreeSet;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Metadata describing one uploaded camera image.
///
/// Produced by the upload side of the application; the core only matches on
/// it and formats it into notifications.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageMetadata {
    /// Identifier of the camera that took the picture.
    pub device_id: String,
    /// Why the camera woke up (`PIR`, `TIMER`, `POWERON`, ...).
    pub wake_reason: String,
    /// Capture time as `YYYYMMDD-HHMMSS`.
    pub timestamp_short: String,
    /// Calendar date as `YYYYMMDD`.
    pub date: String,
    /// Battery voltage in millivolts, when the camera reported one.
    #[serde(default)]
    pub battery_mv: Option<u32>,
}

impl ImageMetadata {
    /// Build metadata from the capture timestamp; `date` is its first eight characters.
    pub fn new(
        device_id: impl Into<String>,
        wake_reason: impl Into<String>,
        timestamp_short: impl Into<String>,
    ) -> Self {
        let timestamp_short = timestamp_short.into();
        let date = timestamp_short.chars().take(8).collect();
        Self {
            device_id: device_id.into(),
            wake_reason: wake_reason.into(),
            timestamp_short,
            date,
            battery_mv: None,
        }
    }

    pub fn with_battery_mv(mut self, millivolts: u32) -> Self {
        self.battery_mv = Some(millivolts);
        self
    }

    /// Capture time rendered as `DD.MM.YYYY HH:MM:SS`, or the raw value if it
    /// does not parse as `YYYYMMDD-HHMMSS`.
    pub fn captured_at_display(&self) -> String {
        chrono::NaiveDateTime::parse_from_str(&self.timestamp_short, "%Y%m%d-%H%M%S")
            .map(|ts| ts.format("%d.%m.%Y %H:%M:%S").to_string())
            .unwrap_or_else(|_| self.timestamp_short.clone())
    }
}

/// The notification mechanisms a workflow can enable.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Display,
    EnumString,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    Email,
    Discord,
    Nextcloud,
}

/// Email channel settings of a workflow.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmailTarget {
    pub recipient: String,
}

/// Discord channel settings of a workflow.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscordTarget {
    pub webhook_url: String,
    /// Upload the image alongside the embed when the file exists.
    pub attach_image: bool,
}

/// Nextcloud Talk channel settings of a workflow.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NextcloudTarget {
    pub server_url: String,
    pub room_token: String,
    pub username: String,
    /// App password used for basic authentication. Serialized redacted.
    #[serde(serialize_with = "serialize_redacted")]
    pub secret: String,
}

const REDACTED: &str = "[REDACTED]";

/// Blank stays blank so output still shows whether a secret is configured.
fn serialize_redacted<S: serde::Serializer>(value: &str, serializer: S) -> Result<S::Ok, S::Error> {
    if value.is_empty() {
        serializer.serialize_str("")
    } else {
        serializer.serialize_str(REDACTED)
    }
}

impl std::fmt::Debug for NextcloudTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NextcloudTarget")
            .field("server_url", &self.server_url)
            .field("room_token", &self.room_token)
            .field("username", &self.username)
            .field("secret", &REDACTED)
            .finish()
    }
}

/// One channel's configuration, tagged by channel.
///
/// Dispatch checks [`ChannelTarget::missing_fields`] before any I/O happens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelTarget {
    Email(EmailTarget),
    Discord(DiscordTarget),
    Nextcloud(NextcloudTarget),
}

impl ChannelTarget {
    pub fn kind(&self) -> ChannelKind {
        match self {
            ChannelTarget::Email(_) => ChannelKind::Email,
            ChannelTarget::Discord(_) => ChannelKind::Discord,
            ChannelTarget::Nextcloud(_) => ChannelKind::Nextcloud,
        }
    }

    /// Names of required fields that are blank. Empty means sendable.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let required: Vec<(&'static str, &str)> = match self {
            ChannelTarget::Email(t) => vec![("recipient", &t.recipient)],
            ChannelTarget::Discord(t) => vec![("webhook_url", &t.webhook_url)],
            ChannelTarget::Nextcloud(t) => vec![
                ("server_url", &t.server_url),
                ("room_token", &t.room_token),
                ("username", &t.username),
                ("secret", &t.secret),
            ],
        };
        required
            .into_iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(name, _)| name)
            .collect()
    }
}

/// A named automation rule: image filter, AI prompt, and notification setup.
///
/// Owned by the configuration side of the application; read-only to the core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowConfig {
    #[serde(default)]
    pub id: i64,
    pub name: String,
    #[serde(default = "default_active")]
    pub active: bool,
    /// Empty matches every device.
    #[serde(default)]
    pub filter_device_id: String,
    /// Empty matches every wake reason.
    #[serde(default)]
    pub filter_wake_reason: String,
    pub ai_base_url: String,
    pub model: String,
    pub prompt: String,
    #[serde(default)]
    pub channels: BTreeSet<ChannelKind>,
    #[serde(default)]
    pub email: EmailTarget,
    #[serde(default)]
    pub discord: DiscordTarget,
    #[serde(default)]
    pub nextcloud: NextcloudTarget,
    #[serde(default)]
    pub created_at: String,
}

fn default_active() -> bool {
    true
}

impl WorkflowConfig {
    /// The tagged configuration for one channel, whether or not it is enabled.
    pub fn target(&self, kind: ChannelKind) -> ChannelTarget {
        match kind {
            ChannelKind::Email => ChannelTarget::Email(self.email.clone()),
            ChannelKind::Discord => ChannelTarget::Discord(self.discord.clone()),
            ChannelKind::Nextcloud => ChannelTarget::Nextcloud(self.nextcloud.clone()),
        }
    }

    /// Targets of every enabled channel.
    pub fn enabled_targets(&self) -> Vec<ChannelTarget> {
        self.channels.iter().map(|kind| self.target(*kind)).collect()
    }
}

/// One row of the audit trail: a single (workflow, image) processing attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub id: i64,
    pub workflow_id: i64,
    pub image_path: String,
    /// AI result text; empty when the attempt failed before or during analysis.
    pub result: String,
    pub notification_sent: bool,
    /// Empty on success.
    pub error_message: String,
    pub created_at: String,
}

impl AuditRecord {
    /// An attempt that produced an AI result.
    pub fn completed(
        workflow_id: i64,
        image_path: impl Into<String>,
        result: impl Into<String>,
        notification_sent: bool,
        error_message: impl Into<String>,
    ) -> Self {
        Self {
            id: 0,
            workflow_id,
            image_path: image_path.into(),
            result: result.into(),
            notification_sent,
            error_message: error_message.into(),
            created_at: now_timestamp(),
        }
    }

    /// An attempt that never produced an AI result.
    pub fn failed(
        workflow_id: i64,
        image_path: impl Into<String>,
        error_message: impl Into<String>,
    ) -> Self {
        Self::completed(workflow_id, image_path, String::new(), false, error_message)
    }

    pub fn is_success(&self) -> bool {
        self.notification_sent && self.error_message.is_empty()
    }
}

/// Read-only view of the exclusive gate for display purposes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum GateStatus {
    Free,
    Busy { age_seconds: u64, holder_id: String },
}

/// Input for one AI backend call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisRequest {
    pub base_url: String,
    pub model: String,
    pub prompt: String,
    pub image_path: PathBuf,
}

/// A composed message ready for channel delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub workflow_name: String,
    pub subject: String,
    pub body: String,
    /// Short device/reason line, used as the Discord embed footer.
    pub footer: String,
    pub image_path: Option<PathBuf>,
}

/// Current UTC time in the ISO 8601 millisecond format used by the store.
pub fn now_timestamp() -> String {
    chrono::Utc::now()
        .format("%Y-%m-%dT%H:%M:%S%.3fZ")
        .to_string()
}
