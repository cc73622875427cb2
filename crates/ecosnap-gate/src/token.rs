// SPDX-FileCopyrightText: 2026 EcoSnap Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! On-disk gate token: who holds the gate and since when.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::Path;
use std::time::SystemTime;

use ecosnap_core::EcoSnapError;
use serde::{Deserialize, Serialize};

/// Holder reported for a token whose contents cannot be parsed.
pub const UNKNOWN_HOLDER: &str = "unknown";

/// Token file contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateToken {
    pub holder: String,
    pub pid: u32,
    /// Unix seconds.
    pub acquired_at: i64,
}

impl GateToken {
    pub fn new(holder: &str) -> Self {
        Self {
            holder: holder.to_string(),
            pid: std::process::id(),
            acquired_at: chrono::Utc::now().timestamp(),
        }
    }
}

/// A token as read back from disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservedToken {
    pub holder: String,
    pub age_secs: u64,
    /// Raw file bytes, used to tell one token from its successor.
    pub raw: Vec<u8>,
}

/// Create the token file, failing rather than overwriting if it exists.
///
/// Returns `Ok(false)` when someone else already holds the gate.
pub fn create_exclusive(path: &Path, token: &GateToken) -> Result<bool, EcoSnapError> {
    let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::AlreadyExists => return Ok(false),
        Err(e) => {
            return Err(EcoSnapError::gate_io(
                format!("cannot create gate token {}", path.display()),
                e,
            ));
        }
    };

    let body = serde_json::to_vec(token).map_err(|e| EcoSnapError::Gate {
        message: "cannot encode gate token".to_string(),
        source: Some(Box::new(e)),
    })?;
    if let Err(e) = file.write_all(&body).and_then(|()| file.sync_all()) {
        // The file is ours; leaving it behind would lock everyone out until it goes stale.
        let _ = fs::remove_file(path);
        return Err(EcoSnapError::gate_io("cannot write gate token", e));
    }
    Ok(true)
}

/// Read the token at `path`, or `None` when the gate is free.
///
/// A token that does not parse (for example one caught between creation and
/// its first write) is attributed to [`UNKNOWN_HOLDER`] and aged by its
/// modification time.
pub fn read(path: &Path) -> Result<Option<ObservedToken>, EcoSnapError> {
    let raw = match fs::read(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(EcoSnapError::gate_io(
                format!("cannot read gate token {}", path.display()),
                e,
            ));
        }
    };

    if let Ok(token) = serde_json::from_slice::<GateToken>(&raw) {
        let age = chrono::Utc::now().timestamp() - token.acquired_at;
        return Ok(Some(ObservedToken {
            holder: token.holder,
            age_secs: u64::try_from(age).unwrap_or(0),
            raw,
        }));
    }

    match modified_age_secs(path) {
        Ok(Some(age_secs)) => Ok(Some(ObservedToken {
            holder: UNKNOWN_HOLDER.to_string(),
            age_secs,
            raw,
        })),
        Ok(None) => Ok(None),
        Err(e) => Err(EcoSnapError::gate_io("cannot stat gate token", e)),
    }
}

/// Seconds since `path` was last modified, `None` if it no longer exists.
pub fn modified_age_secs(path: &Path) -> std::io::Result<Option<u64>> {
    let modified = match fs::metadata(path) {
        Ok(meta) => meta.modified()?,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e),
    };
    Ok(Some(
        SystemTime::now()
            .duration_since(modified)
            .map(|d| d.as_secs())
            .unwrap_or(0),
    ))
}

/// Remove `path`, treating an already-missing file as success.
pub fn remove(path: &Path) -> Result<(), EcoSnapError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(EcoSnapError::gate_io(
            format!("cannot remove {}", path.display()),
            e,
        )),
    }
}
