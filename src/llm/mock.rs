//! Mock reasoning client for testing.
//!
//! Provides deterministic responses and scripted failures, and counts calls
//! so tests can assert how often the service was reached.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::error::{Result, TutorError};
use crate::llm::LlmClient;

/// Mock client that returns canned responses based on prompt patterns.
///
/// Clones share the call counter.
#[derive(Debug, Clone, Default)]
pub struct MockLlmClient {
    /// Custom response mappings (pattern -> response).
    custom_responses: Vec<(String, String)>,
    /// Number of leading calls that fail before responses succeed.
    failures_before_success: usize,
    /// Fail every call.
    always_fail: bool,
    /// Artificial latency per call.
    delay: Option<Duration>,
    calls: Arc<AtomicUsize>,
}

impl MockLlmClient {
    /// Creates a new mock client with default responses.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a client whose every call fails like an unreachable service.
    pub fn unreachable() -> Self {
        Self {
            always_fail: true,
            ..Self::default()
        }
    }

    /// Adds a custom response mapping.
    ///
    /// When the prompt contains `pattern`, the mock will return `response`.
    pub fn with_response(
        mut self,
        pattern: impl Into<String>,
        response: impl Into<String>,
    ) -> Self {
        self.custom_responses
            .push((pattern.into(), response.into()));
        self
    }

    /// Makes the first `count` calls fail.
    pub fn failing_first(mut self, count: usize) -> Self {
        self.failures_before_success = count;
        self
    }

    /// Delays every call by `delay` before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of `generate` calls received so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Generates a mock response based on the prompt.
    fn mock_response(&self, prompt: &str) -> String {
        let prompt_lower = prompt.to_lowercase();

        for (pattern, response) in &self.custom_responses {
            if prompt_lower.contains(&pattern.to_lowercase()) {
                return response.clone();
            }
        }

        if prompt_lower.contains("correct: yes") {
            return "Great job! Your query returns the expected rows.".to_string();
        }

        "Take another look at your query and compare it with the exercise.".to_string()
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if self.always_fail || call < self.failures_before_success {
            return Err(TutorError::feedback_service("Failed to connect to Ollama"));
        }

        Ok(self.mock_response(prompt))
    }

    async fn is_available(&self) -> bool {
        !self.always_fail
    }
}
