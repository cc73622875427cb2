// SPDX-FileCopyrightText: 2026 EcoSnap Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the Ollama generate API.

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use ecosnap_config::model::AnalysisConfig;
use ecosnap_core::{AnalysisBackend, AnalysisRequest, EcoSnapError};
use tracing::{debug, info};

use crate::types::{ErrorResponse, GenerateRequest, GenerateResponse};

/// Ollama client. One instance serves every workflow; the server URL comes
/// from each [`AnalysisRequest`].
#[derive(Debug, Clone)]
pub struct OllamaClient {
    client: reqwest::Client,
    timeout: Duration,
}

impl OllamaClient {
    /// Creates a client whose calls are bounded by `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, EcoSnapError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| EcoSnapError::BackendCallFailed {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;
        Ok(Self { client, timeout })
    }

    pub fn from_config(config: &AnalysisConfig) -> Result<Self, EcoSnapError> {
        Self::new(Duration::from_secs(config.call_timeout_secs))
    }

    fn endpoint(base_url: &str) -> String {
        format!("{}/api/generate", base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl AnalysisBackend for OllamaClient {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn analyze(&self, request: &AnalysisRequest) -> Result<String, EcoSnapError> {
        let image = tokio::fs::read(&request.image_path).await.map_err(|e| {
            EcoSnapError::BackendCallFailed {
                message: format!("cannot read image {}: {e}", request.image_path.display()),
                source: Some(Box::new(e)),
            }
        })?;

        let body = GenerateRequest {
            model: &request.model,
            prompt: &request.prompt,
            images: vec![STANDARD.encode(&image)],
            stream: false,
        };
        let url = Self::endpoint(&request.base_url);
        debug!(%url, model = %request.model, image_bytes = image.len(), "calling backend");

        let response = self.client.post(&url).json(&body).send().await.map_err(|e| {
            if e.is_timeout() {
                EcoSnapError::Timeout {
                    duration: self.timeout,
                }
            } else {
                EcoSnapError::BackendCallFailed {
                    message: format!("HTTP request failed: {e}"),
                    source: Some(Box::new(e)),
                }
            }
        })?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            let text = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ErrorResponse>(&text)
                .map(|e| e.error)
                .unwrap_or(text);
            return Err(EcoSnapError::backend(format!("backend returned {status}: {detail}")));
        }

        let text = response.text().await.map_err(|e| EcoSnapError::BackendCallFailed {
            message: format!("failed to read response body: {e}"),
            source: Some(Box::new(e)),
        })?;
        let parsed: GenerateResponse =
            serde_json::from_str(&text).map_err(|e| EcoSnapError::BackendCallFailed {
                message: format!("malformed backend response: {e}"),
                source: Some(Box::new(e)),
            })?;

        info!(model = %request.model, chars = parsed.response.len(), "backend analysis complete");
        Ok(parsed.response)
    }
}
