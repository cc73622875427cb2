// SPDX-FileCopyrightText: 2026 EcoSnap Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `ecosnap lock-status` command implementation.
//!
//! Reads the gate token and reports who holds the AI backend and for how
//! long. Read-only: a stale token is reported, never removed.

use ecosnap_config::EcoSnapConfig;
use ecosnap_core::{EcoSnapError, GateStatus};
use ecosnap_gate::FileGate;
use serde::Serialize;

use crate::output::{format_age, mark, print_header, print_json, use_color};

/// Structured output for `--json` mode.
#[derive(Debug, Serialize)]
pub struct LockStatusResponse {
    pub lock_path: String,
    #[serde(flatten)]
    pub status: GateStatus,
    /// Busy for longer than the configured staleness threshold.
    pub stale: bool,
}

impl LockStatusResponse {
    pub fn new(lock_path: &str, status: GateStatus, stale_after_secs: u64) -> Self {
        let stale = matches!(status, GateStatus::Busy { age_seconds, .. } if age_seconds > stale_after_secs);
        Self {
            lock_path: lock_path.to_string(),
            status,
            stale,
        }
    }
}

/// Run the `ecosnap lock-status` command.
pub fn run_lock_status(config: &EcoSnapConfig, json: bool, plain: bool) -> Result<(), EcoSnapError> {
    let gate = FileGate::from_config(&config.gate);
    let response = LockStatusResponse::new(
        &config.gate.lock_path,
        gate.status()?,
        config.gate.stale_after_secs,
    );

    if json {
        print_json(&response);
    } else {
        print_lock_status(&response, use_color(plain));
    }
    Ok(())
}

fn print_lock_status(response: &LockStatusResponse, color: bool) {
    print_header("ecosnap lock-status", 40);
    match &response.status {
        GateStatus::Free => {
            println!("    State:   {} free", mark(true, color));
        }
        GateStatus::Busy {
            age_seconds,
            holder_id,
        } => {
            println!(
                "    State:   {} busy for {}",
                mark(!response.stale, color),
                format_age(*age_seconds)
            );
            println!("    Holder:  {holder_id}");
            if response.stale {
                println!("    Note:    token is stale and will be reclaimed by the next waiter");
            }
        }
    }
    println!("    Token:   {}", response.lock_path);
    println!();
}
