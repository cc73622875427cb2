// SPDX-FileCopyrightText: 2026 EcoSnap Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Nextcloud Talk chat channel.

use std::time::Duration;

use async_trait::async_trait;
use ecosnap_config::model::NextcloudConfig;
use ecosnap_core::{ChannelKind, ChannelTarget, EcoSnapError, Notification, NotificationChannel};
use serde::Serialize;
use tracing::{error, info};

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    message: &'a str,
}

/// Posts notifications into a Nextcloud Talk room as the configured user.
#[derive(Debug, Clone)]
pub struct NextcloudChannel {
    client: reqwest::Client,
}

impl NextcloudChannel {
    pub fn new(config: &NextcloudConfig) -> Result<Self, EcoSnapError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| EcoSnapError::ChannelSendFailed {
                channel: ChannelKind::Nextcloud,
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;
        Ok(Self { client })
    }

    /// Chat endpoint for `room_token` on `server_url`.
    pub fn chat_url(server_url: &str, room_token: &str) -> String {
        format!(
            "{}/ocs/v2.php/apps/spreed/api/v1/chat/{}",
            server_url.trim().trim_end_matches('/'),
            room_token.trim()
        )
    }

    pub fn message_text(notification: &Notification) -> String {
        format!("{}\n\n{}", notification.subject, notification.body)
    }
}

/// Credentials only travel over TLS, except to the local machine.
pub fn require_tls(url: &str) -> Result<(), EcoSnapError> {
    let parsed = url::Url::parse(url).map_err(|e| {
        EcoSnapError::channel(ChannelKind::Nextcloud, format!("invalid server URL: {e}"))
    })?;
    let host = parsed.host_str().unwrap_or("");
    if is_localhost(host) || parsed.scheme() == "https" {
        return Ok(());
    }
    error!(%url, "refusing to send credentials over plain HTTP");
    Err(EcoSnapError::channel(
        ChannelKind::Nextcloud,
        "server URL must use https",
    ))
}

pub fn is_localhost(host: &str) -> bool {
    matches!(host, "localhost" | "::1" | "[::1]") || host.starts_with("127.")
}

#[async_trait]
impl NotificationChannel for NextcloudChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Nextcloud
    }

    async fn send(&self, target: &ChannelTarget, notification: &Notification) -> Result<(), EcoSnapError> {
        let ChannelTarget::Nextcloud(room) = target else {
            return Err(EcoSnapError::Internal(format!(
                "nextcloud channel given a {} target",
                target.kind()
            )));
        };

        let url = Self::chat_url(&room.server_url, &room.room_token);
        require_tls(&url)?;

        let text = Self::message_text(notification);
        let response = self
            .client
            .post(&url)
            .header("OCS-APIRequest", "true")
            .header(reqwest::header::ACCEPT, "application/json")
            .basic_auth(room.username.trim(), Some(&room.secret))
            .json(&ChatMessage { message: &text })
            .send()
            .await
            .map_err(|e| EcoSnapError::ChannelSendFailed {
                channel: ChannelKind::Nextcloud,
                message: format!("HTTP request failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EcoSnapError::channel(
                ChannelKind::Nextcloud,
                format!("chat endpoint returned {status}: {body}"),
            ));
        }
        info!(room = %room.room_token, "nextcloud notification sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ecosnap_core::NextcloudTarget;
    use wiremock::matchers::{basic_auth, body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn notification() -> Notification {
        Notification {
            workflow_name: "Fox watch".to_string(),
            subject: "[EcoSnapCam] Fox watch: B7 (TIMER)".to_string(),
            body: "a red fox".to_string(),
            footer: "B7 / TIMER".to_string(),
            image_path: None,
        }
    }

    fn target(server_url: String) -> ChannelTarget {
        ChannelTarget::Nextcloud(NextcloudTarget {
            server_url,
            room_token: "abc123".to_string(),
            username: "ecosnap".to_string(),
            secret: "app-pass".to_string(),
        })
    }

    fn channel() -> NextcloudChannel {
        NextcloudChannel::new(&NextcloudConfig::default()).unwrap()
    }

    #[test]
    fn builds_chat_url() {
        assert_eq!(
            NextcloudChannel::chat_url("https://cloud.example.org/", "abc"),
            "https://cloud.example.org/ocs/v2.php/apps/spreed/api/v1/chat/abc"
        );
    }

    #[test]
    fn tls_policy() {
        assert!(require_tls("https://cloud.example.org/x").is_ok());
        assert!(require_tls("http://127.0.0.1:8080/x").is_ok());
        assert!(require_tls("http://localhost/x").is_ok());
        assert!(require_tls("http://cloud.example.org/x").is_err());
        assert!(require_tls("not a url").is_err());
    }

    #[tokio::test]
    async fn posts_to_room_with_ocs_headers_and_basic_auth() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/ocs/v2.php/apps/spreed/api/v1/chat/abc123"))
            .and(header("OCS-APIRequest", "true"))
            .and(header("accept", "application/json"))
            .and(basic_auth("ecosnap", "app-pass"))
            .and(body_json(serde_json::json!({
                "message": "[EcoSnapCam] Fox watch: B7 (TIMER)\n\na red fox"
            })))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        channel()
            .send(&target(server.uri()), &notification())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn plain_http_to_remote_host_is_refused_before_sending() {
        let err = channel()
            .send(&target("http://cloud.example.org".to_string()), &notification())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("https"));
    }

    #[tokio::test]
    async fn server_error_is_a_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let err = channel()
            .send(&target(server.uri()), &notification())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("401"));
    }
}
