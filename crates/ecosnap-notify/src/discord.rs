// SPDX-FileCopyrightText: 2026 EcoSnap Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Discord webhook channel.

use std::time::Duration;

use async_trait::async_trait;
use ecosnap_config::model::DiscordConfig;
use ecosnap_core::{ChannelKind, ChannelTarget, EcoSnapError, Notification, NotificationChannel};
use reqwest::multipart::{Form, Part};
use serde::Serialize;
use tracing::{debug, info};

/// Discord rejects embed descriptions longer than this.
pub const MAX_DESCRIPTION_CHARS: usize = 4096;

#[derive(Debug, Serialize)]
pub struct WebhookPayload {
    pub username: String,
    pub content: String,
    pub embeds: Vec<Embed>,
}

#[derive(Debug, Serialize)]
pub struct Embed {
    pub title: String,
    pub description: String,
    pub color: u32,
    pub timestamp: String,
    pub footer: EmbedFooter,
}

#[derive(Debug, Serialize)]
pub struct EmbedFooter {
    pub text: String,
}

/// Posts notifications to a Discord webhook, optionally with the image attached.
#[derive(Debug, Clone)]
pub struct DiscordChannel {
    client: reqwest::Client,
    config: DiscordConfig,
}

impl DiscordChannel {
    pub fn new(config: &DiscordConfig) -> Result<Self, EcoSnapError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| EcoSnapError::ChannelSendFailed {
                channel: ChannelKind::Discord,
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;
        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    pub fn payload(&self, notification: &Notification) -> WebhookPayload {
        WebhookPayload {
            username: self.config.username.clone(),
            content: format!("New result from workflow **{}**", notification.workflow_name),
            embeds: vec![Embed {
                title: notification.subject.clone(),
                description: truncate_chars(&notification.body, MAX_DESCRIPTION_CHARS),
                color: self.config.embed_color,
                timestamp: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
                footer: EmbedFooter {
                    text: notification.footer.clone(),
                },
            }],
        }
    }

    /// Multipart body with the image, or `None` when it cannot be attached.
    async fn attachment_form(
        &self,
        payload_json: &str,
        notification: &Notification,
    ) -> Result<Option<Form>, EcoSnapError> {
        let Some(path) = notification.image_path.as_deref() else {
            return Ok(None);
        };
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "image not attachable, sending embed only");
                return Ok(None);
            }
        };
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image.jpg".to_string());
        let part = Part::bytes(bytes)
            .file_name(file_name)
            .mime_str("image/jpeg")
            .map_err(|e| EcoSnapError::ChannelSendFailed {
                channel: ChannelKind::Discord,
                message: format!("invalid attachment: {e}"),
                source: Some(Box::new(e)),
            })?;
        Ok(Some(
            Form::new()
                .text("payload_json", payload_json.to_string())
                .part("files[0]", part),
        ))
    }
}

#[async_trait]
impl NotificationChannel for DiscordChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Discord
    }

    async fn send(&self, target: &ChannelTarget, notification: &Notification) -> Result<(), EcoSnapError> {
        let ChannelTarget::Discord(discord) = target else {
            return Err(EcoSnapError::Internal(format!(
                "discord channel given a {} target",
                target.kind()
            )));
        };

        let payload = self.payload(notification);
        let request = self.client.post(discord.webhook_url.trim());
        let form = if discord.attach_image {
            let payload_json = serde_json::to_string(&payload).map_err(|e| {
                EcoSnapError::ChannelSendFailed {
                    channel: ChannelKind::Discord,
                    message: format!("cannot encode payload: {e}"),
                    source: Some(Box::new(e)),
                }
            })?;
            self.attachment_form(&payload_json, notification).await?
        } else {
            None
        };
        let attached = form.is_some();
        let request = match form {
            Some(form) => request.multipart(form),
            None => request.json(&payload),
        };

        let response = request.send().await.map_err(|e| EcoSnapError::ChannelSendFailed {
            channel: ChannelKind::Discord,
            message: format!("HTTP request failed: {e}"),
            source: Some(Box::new(e)),
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EcoSnapError::channel(
                ChannelKind::Discord,
                format!("webhook returned {status}: {body}"),
            ));
        }
        info!(attached, "discord notification sent");
        Ok(())
    }
}

/// At most `max` characters of `text`, cut on a character boundary.
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}
