// SPDX-FileCopyrightText: 2026 EcoSnap Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `ecosnap process` command implementation.
//!
//! Wires the SQLite store, the file gate, the Ollama client, and the
//! notification channels into an orchestrator and runs it on one image.

use std::path::PathBuf;
use std::sync::Arc;

use ecosnap_config::EcoSnapConfig;
use ecosnap_core::{EcoSnapError, ImageMetadata};
use ecosnap_gate::FileGate;
use ecosnap_notify::Notifier;
use ecosnap_ollama::OllamaClient;
use ecosnap_storage::SqliteStore;
use ecosnap_workflow::{AttemptOutcome, AttemptState, Orchestrator};
use tracing::info;

use crate::output::{mark, print_header, print_json, use_color};

/// Image description as given on the command line.
#[derive(Debug)]
pub struct ProcessArgs {
    pub image: PathBuf,
    pub device_id: String,
    pub wake_reason: String,
    pub timestamp: Option<String>,
    pub battery_mv: Option<u32>,
}

impl ProcessArgs {
    pub fn metadata(&self) -> ImageMetadata {
        let timestamp = self
            .timestamp
            .clone()
            .unwrap_or_else(|| chrono::Local::now().format("%Y%m%d-%H%M%S").to_string());
        let metadata = ImageMetadata::new(&self.device_id, &self.wake_reason, timestamp);
        match self.battery_mv {
            Some(mv) => metadata.with_battery_mv(mv),
            None => metadata,
        }
    }
}

/// Run the `ecosnap process` command.
pub async fn run_process(
    config: &EcoSnapConfig,
    args: ProcessArgs,
    json: bool,
) -> Result<(), EcoSnapError> {
    if !args.image.is_file() {
        return Err(EcoSnapError::Internal(format!(
            "image not found: {}",
            args.image.display()
        )));
    }

    let store = SqliteStore::open(&config.storage).await?;
    let orchestrator = Orchestrator::new(
        Arc::new(store.clone()),
        FileGate::from_config(&config.gate),
        Arc::new(OllamaClient::from_config(&config.analysis)?),
        Notifier::from_config(config)?,
        config.gate.acquire_timeout(),
    );

    let metadata = args.metadata();
    let outcomes = orchestrator.process_image(&args.image, &metadata).await;
    store.close().await?;
    let outcomes = outcomes?;
    info!(attempts = outcomes.len(), "image processed");

    if json {
        print_json(&outcomes);
    } else {
        print_outcomes(&args.image, &outcomes, use_color(false));
    }
    Ok(())
}

fn print_outcomes(image: &std::path::Path, outcomes: &[AttemptOutcome], color: bool) {
    print_header(&format!("ecosnap process {}", image.display()), 50);
    if outcomes.is_empty() {
        println!("    No active workflow matches this image.");
        println!();
        return;
    }
    for outcome in outcomes {
        let record = &outcome.record;
        println!(
            "    {} {} [{}] record #{}",
            mark(record.is_success(), color),
            outcome.workflow_name,
            outcome.state,
            record.id
        );
        if let Some(report) = &outcome.dispatch {
            for (channel, sent) in report.per_channel() {
                println!("        {channel}: {}", if sent { "sent" } else { "not sent" });
            }
        }
        if !record.error_message.is_empty() {
            println!("        error: {}", record.error_message);
        }
        if outcome.state == AttemptState::Recorded && !record.result.is_empty() {
            println!("        result: {}", first_line(&record.result));
        }
    }
    println!();
}

fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or_default().trim()
}
