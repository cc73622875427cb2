// SPDX-FileCopyrightText: 2026 EcoSnap Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `ecosnap audit` command implementation.

use std::collections::HashMap;

use ecosnap_config::EcoSnapConfig;
use ecosnap_core::{AuditRecord, EcoSnapError, WorkflowStore};
use ecosnap_storage::SqliteStore;

use crate::output::{mark, print_header, print_json, use_color};

/// Run the `ecosnap audit` command.
pub async fn run_audit(
    config: &EcoSnapConfig,
    workflow: Option<i64>,
    limit: i64,
    json: bool,
) -> Result<(), EcoSnapError> {
    let store = SqliteStore::open(&config.storage).await?;
    let records = store.audit_records(workflow, Some(limit)).await?;
    let names: HashMap<i64, String> = store
        .list_workflows()
        .await?
        .into_iter()
        .map(|wf| (wf.id, wf.name))
        .collect();
    store.close().await?;

    if json {
        print_json(&records);
    } else {
        print_records(&records, &names, use_color(false));
    }
    Ok(())
}

fn print_records(records: &[AuditRecord], names: &HashMap<i64, String>, color: bool) {
    print_header("ecosnap audit", 60);
    if records.is_empty() {
        println!("    No audit records.");
        println!();
        return;
    }
    for record in records {
        let name = names
            .get(&record.workflow_id)
            .map(String::as_str)
            .unwrap_or("?");
        println!(
            "    {} #{} {} {} ({})",
            mark(record.is_success(), color),
            record.id,
            record.created_at,
            name,
            record.image_path
        );
        if !record.error_message.is_empty() {
            println!("        error: {}", record.error_message);
        }
    }
    println!();
}
