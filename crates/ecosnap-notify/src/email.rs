// SPDX-FileCopyrightText: 2026 EcoSnap Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Direct-to-MX email channel.
//!
//! There is no relay configuration: the recipient's domain is resolved to its
//! mail exchangers and the message is handed straight to the first one that
//! accepts a connection. One attempt, no queue. A server that answers with a
//! rejection ends the attempt; only unreachable hosts fall through to the next.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use ecosnap_config::model::EmailConfig;
use ecosnap_core::{ChannelKind, ChannelTarget, EcoSnapError, Notification, NotificationChannel};
use hickory_resolver::TokioAsyncResolver;
use lettre::message::Mailbox;
use lettre::message::header::ContentType;
use lettre::transport::smtp::extension::ClientId;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::{debug, info, warn};

/// Finds the hosts that accept mail for a domain.
#[async_trait]
pub trait RelayResolver: Send + Sync + 'static {
    /// Candidate hosts, most preferred first. Never empty.
    async fn relays(&self, domain: &str) -> Vec<String>;
}

/// DNS MX lookup with the domain itself as fallback.
pub struct MxResolver {
    resolver: TokioAsyncResolver,
}

impl MxResolver {
    /// Resolver using the system configuration, or public defaults without one.
    pub fn from_system() -> Self {
        let resolver = TokioAsyncResolver::tokio_from_system_conf().unwrap_or_else(|e| {
            warn!(error = %e, "system resolver configuration unavailable, using defaults");
            TokioAsyncResolver::tokio(Default::default(), Default::default())
        });
        Self { resolver }
    }
}

#[async_trait]
impl RelayResolver for MxResolver {
    async fn relays(&self, domain: &str) -> Vec<String> {
        match self.resolver.mx_lookup(domain).await {
            Ok(lookup) => {
                let mut records: Vec<(u16, String)> = lookup
                    .iter()
                    .map(|mx| {
                        let host = mx.exchange().to_utf8();
                        (mx.preference(), host.trim_end_matches('.').to_string())
                    })
                    .filter(|(_, host)| !host.is_empty())
                    .collect();
                records.sort();
                let hosts: Vec<String> = records.into_iter().map(|(_, host)| host).collect();
                if hosts.is_empty() {
                    vec![domain.to_string()]
                } else {
                    hosts
                }
            }
            Err(e) => {
                debug!(domain, error = %e, "no MX record, falling back to domain");
                vec![domain.to_string()]
            }
        }
    }
}

/// Email channel speaking SMTP directly to the recipient's mail server.
pub struct EmailChannel {
    config: EmailConfig,
    resolver: Arc<dyn RelayResolver>,
}

impl EmailChannel {
    pub fn new(config: EmailConfig, resolver: Arc<dyn RelayResolver>) -> Self {
        Self { config, resolver }
    }

    /// Channel backed by the system DNS resolver.
    pub fn from_config(config: &EmailConfig) -> Self {
        Self::new(config.clone(), Arc::new(MxResolver::from_system()))
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.config.connect_timeout_secs)
    }

    /// Format the RFC 5322 message for `recipient`.
    pub fn compose(&self, recipient: &str, notification: &Notification) -> Result<Vec<u8>, EcoSnapError> {
        Ok(self.build_message(recipient, notification)?.formatted())
    }

    fn build_message(&self, recipient: &str, notification: &Notification) -> Result<Message, EcoSnapError> {
        let from: Mailbox = self
            .config
            .from_address
            .parse()
            .map_err(|e| EcoSnapError::channel(ChannelKind::Email, format!("invalid sender address: {e}")))?;
        let to: Mailbox = recipient.parse().map_err(|e| {
            EcoSnapError::channel(ChannelKind::Email, format!("invalid recipient address: {e}"))
        })?;

        let mut body = notification.body.clone();
        if !notification.footer.is_empty() {
            body.push_str("\n\n-- \n");
            body.push_str(&notification.footer);
        }

        Message::builder()
            .from(from)
            .to(to)
            .subject(&notification.subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body)
            .map_err(|e| EcoSnapError::ChannelSendFailed {
                channel: ChannelKind::Email,
                message: format!("cannot build message: {e}"),
                source: Some(Box::new(e)),
            })
    }

    /// Plain SMTP straight to `host`, the way an MTA hands mail to an MX.
    fn transport(&self, host: &str) -> AsyncSmtpTransport<Tokio1Executor> {
        AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host)
            .port(self.config.smtp_port)
            .hello_name(ClientId::Domain(self.config.helo_name.clone()))
            .timeout(Some(self.timeout()))
            .build()
    }
}

#[async_trait]
impl NotificationChannel for EmailChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Email
    }

    async fn send(&self, target: &ChannelTarget, notification: &Notification) -> Result<(), EcoSnapError> {
        let ChannelTarget::Email(email) = target else {
            return Err(EcoSnapError::Internal(format!(
                "email channel given a {} target",
                target.kind()
            )));
        };
        let recipient = email.recipient.trim();
        let domain = recipient_domain(recipient).ok_or_else(|| {
            EcoSnapError::channel(ChannelKind::Email, format!("recipient `{recipient}` has no domain"))
        })?;

        let message = self.build_message(recipient, notification)?;
        let hosts = self.resolver.relays(domain).await;

        let mut last_error = String::from("no relay candidates");
        for host in &hosts {
            match self.transport(host).send(message.clone()).await {
                Ok(_) => {
                    info!(%host, recipient, "email delivered");
                    return Ok(());
                }
                Err(e) if e.is_permanent() || e.is_transient() => {
                    warn!(%host, recipient, error = %e, "mail server rejected message");
                    return Err(EcoSnapError::ChannelSendFailed {
                        channel: ChannelKind::Email,
                        message: format!("{host}: {e}"),
                        source: Some(Box::new(e)),
                    });
                }
                Err(e) => {
                    debug!(%host, error = %e, "mail server unreachable");
                    last_error = format!("{host}: {e}");
                }
            }
        }
        Err(EcoSnapError::channel(
            ChannelKind::Email,
            format!("cannot reach mail server ({last_error})"),
        ))
    }
}

/// The part after the last `@`, if non-empty.
pub fn recipient_domain(recipient: &str) -> Option<&str> {
    recipient
        .rsplit_once('@')
        .map(|(_, domain)| domain.trim())
        .filter(|domain| !domain.is_empty())
}
