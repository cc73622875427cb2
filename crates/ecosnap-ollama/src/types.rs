// SPDX-FileCopyrightText: 2026 EcoSnap Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wire types for Ollama's `/api/generate` endpoint.

use serde::{Deserialize, Serialize};

/// Request body. `images` carries base64-encoded image bytes.
#[derive(Debug, Clone, Serialize)]
pub struct GenerateRequest<'a> {
    pub model: &'a str,
    pub prompt: &'a str,
    pub images: Vec<String>,
    pub stream: bool,
}

/// The part of the response body EcoSnap reads.
#[derive(Debug, Clone, Deserialize)]
pub struct GenerateResponse {
    pub response: String,
    #[serde(default)]
    pub done: Option<bool>,
}

/// Error body Ollama returns alongside non-2xx statuses.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
