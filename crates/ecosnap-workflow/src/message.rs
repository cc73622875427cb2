// SPDX-FileCopyrightText: 2026 EcoSnap Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Notification text for an analysed image.

use std::fmt::Write;
use std::path::Path;

use ecosnap_core::{ImageMetadata, Notification, WorkflowConfig};

/// Build the notification for `workflow`'s result on one image.
pub fn compose(
    workflow: &WorkflowConfig,
    metadata: &ImageMetadata,
    result: &str,
    image_path: &Path,
) -> Notification {
    let subject = format!(
        "[EcoSnapCam] {}: {} ({})",
        workflow.name, metadata.device_id, metadata.wake_reason
    );

    let mut body = String::new();
    let _ = writeln!(body, "Device: {}", metadata.device_id);
    let _ = writeln!(body, "Wake reason: {}", metadata.wake_reason);
    let _ = writeln!(body, "Captured: {}", metadata.captured_at_display());
    if let Some(mv) = metadata.battery_mv {
        let _ = writeln!(body, "Battery: {mv} mV");
    }
    let _ = write!(body, "\nResult:\n{}", result.trim());

    let file_name = image_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let footer = format!("{} | {} | {}", workflow.name, metadata.device_id, file_name);

    Notification {
        workflow_name: workflow.name.clone(),
        subject,
        body,
        footer,
        image_path: Some(image_path.to_path_buf()),
    }
}
