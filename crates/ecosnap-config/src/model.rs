// SPDX-FileCopyrightText: 2026 EcoSnap Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs.
//!
//! All structs use `#[serde(deny_unknown_fields)]` so a typo in
//! `ecosnap.toml` fails loudly at startup instead of being ignored.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level EcoSnap configuration.
///
/// Every section is optional and falls back to its defaults.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EcoSnapConfig {
    #[serde(default)]
    pub general: GeneralConfig,

    /// Exclusive gate around the AI backend.
    #[serde(default)]
    pub gate: GateConfig,

    /// SQLite audit store.
    #[serde(default)]
    pub storage: StorageConfig,

    /// AI backend calls.
    #[serde(default)]
    pub analysis: AnalysisConfig,

    #[serde(default)]
    pub email: EmailConfig,

    #[serde(default)]
    pub discord: DiscordConfig,

    #[serde(default)]
    pub nextcloud: NextcloudConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GeneralConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Exclusive gate configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GateConfig {
    /// Path of the token file. Every process on the host must agree on it.
    #[serde(default = "default_lock_path")]
    pub lock_path: String,

    /// How long a workflow waits for the gate before recording a timeout.
    #[serde(default = "default_acquire_timeout_secs")]
    pub acquire_timeout_secs: u64,

    /// Age after which a held token is presumed abandoned.
    #[serde(default = "default_stale_after_secs")]
    pub stale_after_secs: u64,

    /// Sleep between polls while the gate is held by someone else.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl GateConfig {
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }

    pub fn stale_after(&self) -> Duration {
        Duration::from_secs(self.stale_after_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            lock_path: default_lock_path(),
            acquire_timeout_secs: default_acquire_timeout_secs(),
            stale_after_secs: default_stale_after_secs(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

fn default_lock_path() -> String {
    data_file("ai_backend.lock")
}

fn default_acquire_timeout_secs() -> u64 {
    300
}

fn default_stale_after_secs() -> u64 {
    600
}

fn default_poll_interval_ms() -> u64 {
    500
}

/// Audit store configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// SQLite's own busy wait before a write reports `SQLITE_BUSY`.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,

    /// Total attempts for a contended audit write.
    #[serde(default = "default_write_retries")]
    pub write_retries: u32,

    /// Backoff unit; attempt `n` sleeps `n * retry_backoff_ms`.
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            busy_timeout_ms: default_busy_timeout_ms(),
            write_retries: default_write_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

fn default_database_path() -> String {
    data_file("ecosnap.db")
}

fn default_busy_timeout_ms() -> u64 {
    250
}

fn default_write_retries() -> u32 {
    5
}

fn default_retry_backoff_ms() -> u64 {
    200
}

/// AI backend call configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AnalysisConfig {
    /// Upper bound for a single `/api/generate` call.
    #[serde(default = "default_call_timeout_secs")]
    pub call_timeout_secs: u64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            call_timeout_secs: default_call_timeout_secs(),
        }
    }
}

fn default_call_timeout_secs() -> u64 {
    120
}

/// Direct-SMTP email configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EmailConfig {
    /// Envelope and header sender.
    #[serde(default = "default_from_address")]
    pub from_address: String,

    /// Name announced in `HELO`.
    #[serde(default = "default_helo_name")]
    pub helo_name: String,

    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,

    /// Bound for connecting and for each reply.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            from_address: default_from_address(),
            helo_name: default_helo_name(),
            smtp_port: default_smtp_port(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

fn default_from_address() -> String {
    "ecosnapcam@localhost".to_string()
}

fn default_helo_name() -> String {
    "localhost".to_string()
}

fn default_smtp_port() -> u16 {
    25
}

fn default_connect_timeout_secs() -> u64 {
    30
}

/// Discord webhook configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DiscordConfig {
    /// Display name the webhook posts as.
    #[serde(default = "default_discord_username")]
    pub username: String,

    /// Embed accent color as a 24-bit integer.
    #[serde(default = "default_embed_color")]
    pub embed_color: u32,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            username: default_discord_username(),
            embed_color: default_embed_color(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

fn default_discord_username() -> String {
    "EcoSnapCam".to_string()
}

fn default_embed_color() -> u32 {
    0x2E_CC_71
}

fn default_request_timeout_secs() -> u64 {
    30
}

/// Nextcloud Talk configuration. Per-room credentials live on the workflow.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct NextcloudConfig {
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for NextcloudConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

/// `<data_dir>/ecosnap/<name>`, or `<name>` when no data dir is known.
fn data_file(name: &str) -> String {
    dirs::data_dir()
        .map(|p| p.join("ecosnap").join(name))
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_else(|| name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gate_defaults_match_backend_expectations() {
        let gate = GateConfig::default();
        assert_eq!(gate.acquire_timeout(), Duration::from_secs(300));
        assert_eq!(gate.stale_after(), Duration::from_secs(600));
        assert_eq!(gate.poll_interval(), Duration::from_millis(500));
        assert!(gate.lock_path.ends_with("ai_backend.lock"));
    }

    #[test]
    fn storage_defaults_use_linear_backoff_unit() {
        let storage = StorageConfig::default();
        assert_eq!(storage.retry_backoff_ms, 200);
        assert_eq!(storage.write_retries, 5);
        assert!(storage.database_path.ends_with("ecosnap.db"));
    }

    #[test]
    fn embed_color_is_green() {
        assert_eq!(DiscordConfig::default().embed_color, 3_066_993);
    }
}
