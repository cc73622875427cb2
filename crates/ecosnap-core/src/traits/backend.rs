// SPDX-FileCopyrightText: 2026 EcoSnap Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! AI backend trait for image analysis (Ollama and test doubles).

use async_trait::async_trait;

use crate::error::EcoSnapError;
use crate::types::AnalysisRequest;

/// A slow, shared inference service that describes an image.
///
/// Callers are expected to hold the exclusive gate for the duration of
/// [`AnalysisBackend::analyze`].
#[async_trait]
pub trait AnalysisBackend: Send + Sync + 'static {
    /// Human-readable backend name for logs.
    fn name(&self) -> &str;

    /// Runs one analysis and returns the generated text.
    ///
    /// Every failure (transport, status, body) maps to
    /// [`EcoSnapError::BackendCallFailed`] or [`EcoSnapError::Timeout`].
    async fn analyze(&self, request: &AnalysisRequest) -> Result<String, EcoSnapError>;
}
