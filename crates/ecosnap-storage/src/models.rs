// SPDX-FileCopyrightText: 2026 EcoSnap Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Row mapping between SQLite and the domain types in `ecosnap-core`.

use std::collections::BTreeSet;
use std::str::FromStr;

use ecosnap_core::{
    AuditRecord, ChannelKind, DiscordTarget, EmailTarget, NextcloudTarget, WorkflowConfig,
};
use rusqlite::Row;
use tracing::warn;

/// Column list matching [`workflow_from_row`].
pub const WORKFLOW_COLUMNS: &str = "id, name, active, filter_device_id, filter_wake_reason, \
     ai_base_url, model, prompt, channels, email_recipient, discord_webhook_url, \
     discord_attach_image, nextcloud_server_url, nextcloud_room_token, nextcloud_username, \
     nextcloud_secret, created_at";

/// Column list matching [`audit_from_row`].
pub const AUDIT_COLUMNS: &str =
    "id, workflow_id, image_path, result, notification_sent, error_message, created_at";

pub fn workflow_from_row(row: &Row<'_>) -> rusqlite::Result<WorkflowConfig> {
    let id: i64 = row.get(0)?;
    let channels: String = row.get(8)?;
    Ok(WorkflowConfig {
        id,
        name: row.get(1)?,
        active: row.get(2)?,
        filter_device_id: row.get(3)?,
        filter_wake_reason: row.get(4)?,
        ai_base_url: row.get(5)?,
        model: row.get(6)?,
        prompt: row.get(7)?,
        channels: decode_channels(id, &channels),
        email: EmailTarget {
            recipient: row.get(9)?,
        },
        discord: DiscordTarget {
            webhook_url: row.get(10)?,
            attach_image: row.get(11)?,
        },
        nextcloud: NextcloudTarget {
            server_url: row.get(12)?,
            room_token: row.get(13)?,
            username: row.get(14)?,
            secret: row.get(15)?,
        },
        created_at: row.get(16)?,
    })
}

pub fn audit_from_row(row: &Row<'_>) -> rusqlite::Result<AuditRecord> {
    Ok(AuditRecord {
        id: row.get(0)?,
        workflow_id: row.get(1)?,
        image_path: row.get(2)?,
        result: row.get(3)?,
        notification_sent: row.get(4)?,
        error_message: row.get(5)?,
        created_at: row.get(6)?,
    })
}

/// Channel set as stored: lowercase names joined by commas.
pub fn encode_channels(channels: &BTreeSet<ChannelKind>) -> String {
    channels
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

/// Parse a stored channel list, dropping names this build does not know.
pub fn decode_channels(workflow_id: i64, raw: &str) -> BTreeSet<ChannelKind> {
    raw.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .filter_map(|name| match ChannelKind::from_str(name) {
            Ok(kind) => Some(kind),
            Err(_) => {
                warn!(workflow_id, channel = name, "ignoring unknown channel");
                None
            }
        })
        .collect()
}
