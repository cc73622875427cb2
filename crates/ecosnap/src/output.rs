// SPDX-FileCopyrightText: 2026 EcoSnap Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared terminal output helpers.

use std::io::IsTerminal;

use serde::Serialize;

/// Colors only when not disabled and stdout is a terminal.
pub fn use_color(plain: bool) -> bool {
    !plain && std::io::stdout().is_terminal()
}

pub fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
    );
}

/// Print a section heading in the `ecosnap <command>` style.
pub fn print_header(title: &str, width: usize) {
    println!();
    println!("  {title}");
    println!("  {}", "-".repeat(width));
}

/// Format seconds into a human-readable duration string.
pub fn format_age(secs: u64) -> String {
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    let seconds = secs % 60;

    if hours > 0 {
        format!("{hours}h {minutes}m")
    } else if minutes > 0 {
        format!("{minutes}m {seconds}s")
    } else {
        format!("{seconds}s")
    }
}

/// `[OK]`/`[FAIL]` marker, colored when enabled.
pub fn mark(ok: bool, color: bool) -> String {
    if color {
        use colored::Colorize;
        if ok {
            "✓".green().to_string()
        } else {
            "✗".red().to_string()
        }
    } else if ok {
        "[OK]".to_string()
    } else {
        "[FAIL]".to_string()
    }
}
