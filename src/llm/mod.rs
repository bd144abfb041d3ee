//! Reasoning service integration for sqltutor.
//!
//! Provides the client trait the feedback orchestrator calls, an Ollama HTTP
//! implementation, and a deterministic mock for tests.

pub mod mock;
pub mod ollama;

pub use mock::MockLlmClient;
pub use ollama::{OllamaClient, OllamaConfig, DEFAULT_OLLAMA_MODEL, DEFAULT_OLLAMA_URL};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Sampling options forwarded to the reasoning service.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenerationOptions {
    pub temperature: f32,
    pub top_p: f32,
    /// Maximum number of tokens to generate.
    pub num_predict: u32,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            temperature: 0.3,
            top_p: 0.9,
            num_predict: 300,
        }
    }
}

/// Trait for clients of the external reasoning service.
///
/// Implementations must be thread-safe (Send + Sync); one client is shared
/// by every concurrent evaluation.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Generates a completion for a single prompt.
    ///
    /// Any transport failure, non-success status, or unreadable body is a
    /// `FeedbackService` error.
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Returns true if the service answers its liveness check.
    async fn is_available(&self) -> bool;
}
