// SPDX-FileCopyrightText: 2026 EcoSnap Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ollama backend for EcoSnap image analysis.
//!
//! Sends the image and the workflow's prompt to a local Ollama server's
//! non-streaming `/api/generate` endpoint and returns the generated text.

pub mod client;
pub mod types;

pub use client::OllamaClient;
