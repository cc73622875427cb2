// SPDX-FileCopyrightText: 2026 EcoSnap Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Workflow selection and per-image orchestration.
//!
//! For every active workflow whose filters match an image, the
//! [`Orchestrator`] acquires the exclusive gate, runs the AI backend, releases
//! the gate, dispatches notifications, and writes exactly one audit record.

pub mod matcher;
pub mod message;
pub mod orchestrator;

pub use matcher::{matches, select};
pub use message::compose;
pub use orchestrator::{AttemptOutcome, AttemptState, Orchestrator, GATE_TIMEOUT_MESSAGE};
