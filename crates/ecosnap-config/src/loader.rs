// SPDX-FileCopyrightText: 2026 EcoSnap Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Layered configuration loading with Figment.
//!
//! Lookup order: `/etc/ecosnap/ecosnap.toml` < `~/.config/ecosnap/ecosnap.toml`
//! < `./ecosnap.toml` < `ECOSNAP_*` environment variables.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::EcoSnapConfig;

/// Config sections that environment variables may address.
const SECTIONS: &[&str] = &[
    "general",
    "gate",
    "storage",
    "analysis",
    "email",
    "discord",
    "nextcloud",
];

/// Candidate config files, lowest precedence first.
pub fn config_file_candidates() -> Vec<PathBuf> {
    let mut files = vec![PathBuf::from("/etc/ecosnap/ecosnap.toml")];
    if let Some(dir) = dirs::config_dir() {
        files.push(dir.join("ecosnap").join("ecosnap.toml"));
    }
    files.push(PathBuf::from("ecosnap.toml"));
    files
}

/// The merged Figment before extraction.
pub fn build_figment() -> Figment {
    config_file_candidates()
        .into_iter()
        .fold(
            Figment::new().merge(Serialized::defaults(EcoSnapConfig::default())),
            |figment, file| figment.merge(Toml::file(file)),
        )
        .merge(env_provider())
}

/// Load configuration from the standard hierarchy with env var overrides.
pub fn load_config() -> Result<EcoSnapConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no files, no environment).
pub fn load_config_from_str(toml_content: &str) -> Result<EcoSnapConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(EcoSnapConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from one explicit file, still honoring env overrides.
pub fn load_config_from_path(path: &Path) -> Result<EcoSnapConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(EcoSnapConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// `ECOSNAP_<SECTION>_<KEY>` maps to `<section>.<key>`.
///
/// Keys contain underscores themselves, so only the first underscore after a
/// known section name becomes a dot (`ECOSNAP_GATE_LOCK_PATH` -> `gate.lock_path`).
fn env_provider() -> Env {
    Env::prefixed("ECOSNAP_").map(|key| map_env_key(key.as_str()).into())
}

/// Figment hands over the key with the prefix stripped but in its original
/// case, so matching is done on the lower-cased key.
pub(crate) fn map_env_key(key: &str) -> String {
    let key = key.to_ascii_lowercase();
    for section in SECTIONS {
        if let Some(rest) = key.strip_prefix(section)
            && let Some(field) = rest.strip_prefix('_')
        {
            return format!("{section}.{field}");
        }
    }
    key
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_keys_split_on_section_only() {
        assert_eq!(map_env_key("GATE_LOCK_PATH"), "gate.lock_path");
        assert_eq!(
            map_env_key("STORAGE_RETRY_BACKOFF_MS"),
            "storage.retry_backoff_ms"
        );
        assert_eq!(map_env_key("GENERAL_LOG_LEVEL"), "general.log_level");
    }

    #[test]
    fn env_keys_match_sections_in_any_case() {
        assert_eq!(map_env_key("gate_stale_after_secs"), "gate.stale_after_secs");
        assert_eq!(map_env_key("Discord_Username"), "discord.username");
    }

    #[test]
    fn unknown_section_is_left_alone() {
        assert_eq!(map_env_key("TELEMETRY_URL"), "telemetry_url");
    }

    #[test]
    fn local_file_has_highest_file_precedence() {
        let files = config_file_candidates();
        assert_eq!(files.last().unwrap(), &PathBuf::from("ecosnap.toml"));
        assert_eq!(files[0], PathBuf::from("/etc/ecosnap/ecosnap.toml"));
    }
}
