// SPDX-FileCopyrightText: 2026 EcoSnap Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Trait seams between the orchestrator and its collaborators.
//!
//! All traits use `#[async_trait]` so they can be held as `Arc<dyn ...>`.

pub mod backend;
pub mod channel;
pub mod storage;

pub use backend::AnalysisBackend;
pub use channel::NotificationChannel;
pub use storage::WorkflowStore;
