// SPDX-FileCopyrightText: 2026 EcoSnap Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for EcoSnap integration tests.
//!
//! Provides mock collaborators and a harness for fast, deterministic tests
//! without an AI server, a mail server, or webhooks.
//!
//! # Components
//!
//! - [`MockBackend`] - Analysis backend with queued responses and failures
//! - [`MockChannel`] - Notification channel that records what it was asked to send
//! - [`TestHarness`] - Temp database, temp gate, and a wired [`Orchestrator`](ecosnap_workflow::Orchestrator)

pub mod harness;
pub mod mock_backend;
pub mod mock_channel;

pub use harness::{TestHarness, TestHarnessBuilder, workflow};
pub use mock_backend::MockBackend;
pub use mock_channel::MockChannel;
