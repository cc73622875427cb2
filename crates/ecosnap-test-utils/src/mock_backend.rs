// SPDX-FileCopyrightText: 2026 EcoSnap Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock analysis backend for deterministic testing.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use ecosnap_core::{AnalysisBackend, AnalysisRequest, EcoSnapError};

/// A scripted backend reply.
#[derive(Debug, Clone)]
pub enum MockReply {
    Text(String),
    Fail(String),
}

/// An analysis backend that returns pre-configured replies.
///
/// Replies are popped from a FIFO queue. When the queue is empty,
/// `"mock analysis"` is returned.
#[derive(Clone, Default)]
pub struct MockBackend {
    replies: Arc<Mutex<VecDeque<MockReply>>>,
    requests: Arc<Mutex<Vec<AnalysisRequest>>>,
    delay: Option<Duration>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a backend pre-loaded with successful responses.
    pub fn with_responses(responses: Vec<String>) -> Self {
        let replies = responses.into_iter().map(MockReply::Text).collect();
        Self {
            replies: Arc::new(Mutex::new(replies)),
            ..Self::default()
        }
    }

    /// Sleep this long inside every call, to hold the gate in tests.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub async fn push_response(&self, text: impl Into<String>) {
        self.replies.lock().await.push_back(MockReply::Text(text.into()));
    }

    /// Queue a failure; the call returns `BackendCallFailed` with this message.
    pub async fn push_failure(&self, message: impl Into<String>) {
        self.replies.lock().await.push_back(MockReply::Fail(message.into()));
    }

    /// Every request received so far.
    pub async fn requests(&self) -> Vec<AnalysisRequest> {
        self.requests.lock().await.clone()
    }

    pub async fn call_count(&self) -> usize {
        self.requests.lock().await.len()
    }
}

#[async_trait]
impl AnalysisBackend for MockBackend {
    fn name(&self) -> &str {
        "mock"
    }

    async fn analyze(&self, request: &AnalysisRequest) -> Result<String, EcoSnapError> {
        self.requests.lock().await.push(request.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let reply = self.replies.lock().await.pop_front();
        match reply {
            Some(MockReply::Text(text)) => Ok(text),
            Some(MockReply::Fail(message)) => Err(EcoSnapError::backend(message)),
            None => Ok("mock analysis".to_string()),
        }
    }
}
