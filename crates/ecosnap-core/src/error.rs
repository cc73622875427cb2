// SPDX-FileCopyrightText: 2026 EcoSnap Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the EcoSnap image pipeline.

use std::time::Duration;

use thiserror::Error;

use crate::types::ChannelKind;

/// The primary error type shared by every EcoSnap crate.
///
/// Only [`EcoSnapError::AuditWriteFailed`] is meant to reach the caller of the
/// orchestrator; everything else is turned into an audit record.
#[derive(Debug, Error)]
pub enum EcoSnapError {
    /// Configuration errors (invalid values, missing required fields).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Filesystem failure while creating, reading, or removing the gate token.
    #[error("gate error: {message}")]
    Gate {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The AI backend stayed busy for longer than the caller was willing to wait.
    #[error("gate timeout after {waited:?}")]
    GateTimeout { waited: Duration },

    /// A release was attempted by a process that does not hold the gate.
    #[error("gate is held by `{holder}`, not by `{requester}`")]
    GateOwnershipMismatch { holder: String, requester: String },

    /// Transport error, non-200 status, or malformed body from the AI backend.
    #[error("backend call failed: {message}")]
    BackendCallFailed {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A single notification channel failed to deliver.
    #[error("{channel} send failed: {message}")]
    ChannelSendFailed {
        channel: ChannelKind,
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A channel is enabled but lacks required configuration fields.
    #[error("{channel} is missing required configuration: {}", missing.join(", "))]
    ChannelNotConfigured {
        channel: ChannelKind,
        missing: Vec<&'static str>,
    },

    /// Transient lock-busy condition on an audit write. Retried locally.
    #[error("audit write contended (attempt {attempt})")]
    AuditWriteContended { attempt: u32 },

    /// An audit write failed permanently or exhausted its retries.
    #[error("audit write failed after {attempts} attempt(s): {source}")]
    AuditWriteFailed {
        attempts: u32,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl EcoSnapError {
    /// Shorthand for a channel failure without an underlying source.
    pub fn channel(channel: ChannelKind, message: impl Into<String>) -> Self {
        EcoSnapError::ChannelSendFailed {
            channel,
            message: message.into(),
            source: None,
        }
    }

    /// Shorthand for a backend failure without an underlying source.
    pub fn backend(message: impl Into<String>) -> Self {
        EcoSnapError::BackendCallFailed {
            message: message.into(),
            source: None,
        }
    }

    /// Shorthand for a gate filesystem failure wrapping an I/O error.
    pub fn gate_io(message: impl Into<String>, source: std::io::Error) -> Self {
        EcoSnapError::Gate {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}
