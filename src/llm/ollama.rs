//! Ollama client implementation.
//!
//! Implements the LlmClient trait against a local or remote Ollama instance
//! using the non-streaming `/api/generate` endpoint.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{Result, TutorError};
use crate::llm::{GenerationOptions, LlmClient};

/// Default timeout for generate requests.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Timeout for the liveness check.
const LIVENESS_TIMEOUT_SECS: u64 = 5;

/// Default Ollama API URL.
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

/// Default model.
pub const DEFAULT_OLLAMA_MODEL: &str = "llama3.2:3b";

/// Ollama client configuration.
#[derive(Debug, Clone)]
pub struct OllamaConfig {
    /// Base URL for the Ollama API.
    pub base_url: String,
    /// Model to use (e.g., "llama3.2:3b", "qwen2.5:1.5b").
    pub model: String,
    /// Request timeout.
    pub timeout: Duration,
    /// Sampling options sent with every request.
    pub options: GenerationOptions,
}

impl OllamaConfig {
    /// Creates a new config with the given model.
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_OLLAMA_URL.to_string(),
            model: model.into(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            options: GenerationOptions::default(),
        }
    }

    /// Sets the base URL.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the sampling options.
    pub fn with_options(mut self, options: GenerationOptions) -> Self {
        self.options = options;
        self
    }
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self::new(DEFAULT_OLLAMA_MODEL)
    }
}

/// Ollama reasoning service client.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    config: OllamaConfig,
    client: Client,
}

impl OllamaClient {
    /// Creates a new Ollama client with the given configuration.
    pub fn new(config: OllamaConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| {
                TutorError::feedback_service(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self { config, client })
    }

    /// Returns the client configuration.
    pub fn config(&self) -> &OllamaConfig {
        &self.config
    }

    /// Returns the generate API endpoint URL.
    fn generate_url(&self) -> String {
        format!("{}/api/generate", self.config.base_url)
    }

    /// Returns the liveness check URL.
    fn tags_url(&self) -> String {
        format!("{}/api/tags", self.config.base_url)
    }
}

#[async_trait]
impl LlmClient for OllamaClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let request = GenerateRequest {
            model: &self.config.model,
            prompt,
            stream: false,
            options: self.config.options,
        };

        let response = self
            .client
            .post(self.generate_url())
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TutorError::feedback_service("Request timed out")
                } else if e.is_connect() {
                    TutorError::feedback_service("Failed to connect to Ollama")
                } else {
                    TutorError::feedback_service(format!("Request failed: {}", e))
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| TutorError::feedback_service(format!("Failed to read response: {}", e)))?;

        if status != StatusCode::OK {
            return Err(TutorError::feedback_service(format!(
                "Ollama API error ({}): {}",
                status, body
            )));
        }

        let response: GenerateResponse = serde_json::from_str(&body)
            .map_err(|e| TutorError::feedback_service(format!("Failed to parse response: {}", e)))?;

        Ok(response.response)
    }

    async fn is_available(&self) -> bool {
        match self
            .client
            .get(self.tags_url())
            .timeout(Duration::from_secs(LIVENESS_TIMEOUT_SECS))
            .send()
            .await
        {
            Ok(response) => response.status() == StatusCode::OK,
            Err(_) => false,
        }
    }
}

// Ollama API types

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerationOptions,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}
