// SPDX-FileCopyrightText: 2026 EcoSnap Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `ecosnap workflow` command implementation.
//!
//! Workflows are imported from TOML files holding `[[workflow]]` tables:
//!
//! ```toml
//! [[workflow]]
//! name = "Deer watch"
//! filter_device_id = "A1"
//! filter_wake_reason = "PIR"
//! ai_base_url = "http://localhost:11434"
//! model = "llava"
//! prompt = "Which animal is in this picture?"
//! channels = ["discord"]
//! discord = { webhook_url = "https://discord.com/api/webhooks/..." }
//! ```

use std::path::Path;

use ecosnap_config::EcoSnapConfig;
use ecosnap_core::{EcoSnapError, WorkflowConfig};
use ecosnap_storage::SqliteStore;
use serde::Deserialize;
use tracing::info;

use crate::output::{print_header, print_json};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct WorkflowFile {
    #[serde(default, rename = "workflow")]
    workflows: Vec<WorkflowConfig>,
}

/// Parse a workflow import file.
pub fn parse_workflows(content: &str) -> Result<Vec<WorkflowConfig>, EcoSnapError> {
    let file: WorkflowFile = toml::from_str(content)
        .map_err(|e| EcoSnapError::Config(format!("invalid workflow file: {e}")))?;
    for wf in &file.workflows {
        if wf.name.trim().is_empty() {
            return Err(EcoSnapError::Config("workflow name must not be empty".into()));
        }
        if wf.ai_base_url.trim().is_empty() || wf.model.trim().is_empty() {
            return Err(EcoSnapError::Config(format!(
                "workflow `{}` needs ai_base_url and model",
                wf.name
            )));
        }
    }
    Ok(file.workflows)
}

pub async fn run_list(config: &EcoSnapConfig, json: bool) -> Result<(), EcoSnapError> {
    let store = SqliteStore::open(&config.storage).await?;
    let workflows = store.list_workflows().await?;
    store.close().await?;

    if json {
        print_json(&workflows);
        return Ok(());
    }

    print_header("ecosnap workflow list", 60);
    if workflows.is_empty() {
        println!("    No workflows. Add some with: ecosnap workflow import <file.toml>");
    }
    for wf in &workflows {
        let channels: Vec<String> = wf.channels.iter().map(ToString::to_string).collect();
        println!(
            "    #{} {}{}",
            wf.id,
            wf.name,
            if wf.active { "" } else { " (inactive)" }
        );
        println!(
            "        device: {}  reason: {}  channels: {}",
            or_any(&wf.filter_device_id),
            or_any(&wf.filter_wake_reason),
            if channels.is_empty() {
                "none".to_string()
            } else {
                channels.join(", ")
            }
        );
    }
    println!();
    Ok(())
}

pub async fn run_import(config: &EcoSnapConfig, file: &Path) -> Result<(), EcoSnapError> {
    let content = std::fs::read_to_string(file).map_err(|e| {
        EcoSnapError::Config(format!("cannot read {}: {e}", file.display()))
    })?;
    let workflows = parse_workflows(&content)?;

    let store = SqliteStore::open(&config.storage).await?;
    for wf in &workflows {
        let id = store.create_workflow(wf).await?;
        info!(workflow_id = id, name = %wf.name, "workflow imported");
        println!("imported #{id} {}", wf.name);
    }
    store.close().await
}

pub async fn run_delete(config: &EcoSnapConfig, id: i64) -> Result<(), EcoSnapError> {
    let store = SqliteStore::open(&config.storage).await?;
    let deleted = store.delete_workflow(id).await?;
    store.close().await?;
    if !deleted {
        return Err(EcoSnapError::Internal(format!("workflow {id} not found")));
    }
    println!("deleted workflow #{id}");
    Ok(())
}

fn or_any(filter: &str) -> &str {
    if filter.is_empty() { "*" } else { filter }
}
