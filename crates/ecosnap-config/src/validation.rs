// SPDX-FileCopyrightText: 2026 EcoSnap Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.

use crate::diagnostic::ConfigError;
use crate::model::EcoSnapConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration.
///
/// Collects every problem instead of stopping at the first one.
pub fn validate_config(config: &EcoSnapConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut fail = |message: String| errors.push(ConfigError::Validation { message });

    if !LOG_LEVELS.contains(&config.general.log_level.to_ascii_lowercase().as_str()) {
        fail(format!(
            "general.log_level `{}` must be one of {}",
            config.general.log_level,
            LOG_LEVELS.join(", ")
        ));
    }

    if config.gate.lock_path.trim().is_empty() {
        fail("gate.lock_path must not be empty".to_string());
    }
    if config.gate.acquire_timeout_secs == 0 {
        fail("gate.acquire_timeout_secs must be greater than 0".to_string());
    }
    if config.gate.stale_after_secs == 0 {
        fail("gate.stale_after_secs must be greater than 0".to_string());
    }
    if config.gate.poll_interval_ms == 0 {
        fail("gate.poll_interval_ms must be greater than 0".to_string());
    }

    if config.storage.database_path.trim().is_empty() {
        fail("storage.database_path must not be empty".to_string());
    }
    if config.storage.write_retries == 0 {
        fail("storage.write_retries must be at least 1".to_string());
    }

    if config.analysis.call_timeout_secs == 0 {
        fail("analysis.call_timeout_secs must be greater than 0".to_string());
    }

    if !config.email.from_address.contains('@') {
        fail(format!(
            "email.from_address `{}` is not an email address",
            config.email.from_address
        ));
    }
    if config.email.helo_name.trim().is_empty() {
        fail("email.helo_name must not be empty".to_string());
    }
    if config.email.smtp_port == 0 {
        fail("email.smtp_port must not be 0".to_string());
    }

    if config.discord.embed_color > 0xFF_FF_FF {
        fail(format!(
            "discord.embed_color {} exceeds 0xFFFFFF",
            config.discord.embed_color
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn messages(config: &EcoSnapConfig) -> Vec<String> {
        validate_config(config)
            .unwrap_err()
            .into_iter()
            .map(|e| e.to_string())
            .collect()
    }

    #[test]
    fn default_config_validates() {
        assert!(validate_config(&EcoSnapConfig::default()).is_ok());
    }

    #[test]
    fn zero_poll_interval_fails() {
        let mut config = EcoSnapConfig::default();
        config.gate.poll_interval_ms = 0;
        assert!(messages(&config).iter().any(|m| m.contains("poll_interval_ms")));
    }

    #[test]
    fn all_errors_are_collected() {
        let mut config = EcoSnapConfig::default();
        config.storage.database_path = " ".to_string();
        config.storage.write_retries = 0;
        config.email.from_address = "nobody".to_string();
        assert_eq!(messages(&config).len(), 3);
    }

    #[test]
    fn unknown_log_level_fails() {
        let mut config = EcoSnapConfig::default();
        config.general.log_level = "verbose".to_string();
        assert!(messages(&config).iter().any(|m| m.contains("log_level")));
    }
}
