// SPDX-FileCopyrightText: 2026 EcoSnap Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Workflow filter matching.

use ecosnap_core::{ImageMetadata, WorkflowConfig};

/// Whether `workflow` applies to an image with `metadata`.
///
/// Inactive workflows never match. An empty filter matches every value;
/// a non-empty one requires exact equality.
pub fn matches(workflow: &WorkflowConfig, metadata: &ImageMetadata) -> bool {
    workflow.active
        && filter_accepts(&workflow.filter_device_id, &metadata.device_id)
        && filter_accepts(&workflow.filter_wake_reason, &metadata.wake_reason)
}

fn filter_accepts(filter: &str, value: &str) -> bool {
    filter.is_empty() || filter == value
}

/// The workflows that apply to `metadata`, in their original order.
pub fn select(workflows: Vec<WorkflowConfig>, metadata: &ImageMetadata) -> Vec<WorkflowConfig> {
    workflows
        .into_iter()
        .filter(|wf| matches(wf, metadata))
        .collect()
}
