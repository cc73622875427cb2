// SPDX-FileCopyrightText: 2026 EcoSnap Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the EcoSnap image pipeline.
//!
//! This crate provides the shared error type, the domain types that flow
//! between the gate, the channels, the audit store, and the orchestrator, and
//! the async traits at those seams.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::EcoSnapError;
pub use types::{
    AnalysisRequest, AuditRecord, ChannelKind, ChannelTarget, DiscordTarget, EmailTarget,
    GateStatus, ImageMetadata, NextcloudTarget, Notification, WorkflowConfig,
};

pub use traits::{AnalysisBackend, NotificationChannel, WorkflowStore};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_taxonomy_is_complete() {
        let _gate_timeout = EcoSnapError::GateTimeout {
            waited: std::time::Duration::from_secs(300),
        };
        let _mismatch = EcoSnapError::GateOwnershipMismatch {
            holder: "a".into(),
            requester: "b".into(),
        };
        let _backend = EcoSnapError::backend("status 500");
        let _channel = EcoSnapError::channel(ChannelKind::Email, "550");
        let _contended = EcoSnapError::AuditWriteContended { attempt: 1 };
        let _failed = EcoSnapError::AuditWriteFailed {
            attempts: 5,
            source: Box::new(std::io::Error::other("database is locked")),
        };
    }

    #[test]
    fn all_traits_are_exported() {
        fn _assert_backend<T: AnalysisBackend>() {}
        fn _assert_channel<T: NotificationChannel>() {}
        fn _assert_store<T: WorkflowStore>() {}
    }
}
