//! Configuration management for sqltutor.
//!
//! Handles loading configuration from a TOML file, applying environment
//! overrides once at startup, and resolving the settings each component
//! consumes (sandbox limits, retry policy, reasoning service client).

use crate::error::{Result, TutorError};
use crate::feedback::RetryPolicy;
use crate::llm::{GenerationOptions, OllamaConfig, DEFAULT_OLLAMA_MODEL, DEFAULT_OLLAMA_URL};
use crate::sandbox::SandboxLimits;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use url::Url;

/// Main configuration structure for sqltutor.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    /// Reasoning service settings.
    #[serde(default)]
    pub llm: LlmConfig,

    /// Feedback retry and cache settings.
    #[serde(default)]
    pub feedback: FeedbackConfig,

    /// Sandbox execution limits.
    #[serde(default)]
    pub sandbox: SandboxConfig,
}

/// Reasoning service configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LlmConfig {
    /// Base URL of the Ollama-compatible service.
    pub base_url: String,

    /// Model name (e.g., "llama3.2:3b").
    pub model: String,

    pub temperature: f32,
    pub top_p: f32,
    pub num_predict: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        let options = GenerationOptions::default();
        Self {
            base_url: DEFAULT_OLLAMA_URL.to_string(),
            model: DEFAULT_OLLAMA_MODEL.to_string(),
            temperature: options.temperature,
            top_p: options.top_p,
            num_predict: options.num_predict,
        }
    }
}

/// Host throughput class, used to size the per-attempt deadline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThroughputProfile {
    /// Typical desktop or server host.
    #[default]
    Standard,
    /// Slow hosts where local inference needs more time.
    Constrained,
}

impl ThroughputProfile {
    /// Per-attempt deadline for this profile.
    pub fn attempt_timeout(self) -> Duration {
        match self {
            Self::Standard => Duration::from_secs(30),
            Self::Constrained => Duration::from_secs(90),
        }
    }
}

impl std::str::FromStr for ThroughputProfile {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "standard" => Ok(Self::Standard),
            "constrained" => Ok(Self::Constrained),
            _ => Err(format!(
                "Invalid throughput profile: {s}. Expected: standard or constrained"
            )),
        }
    }
}

/// Feedback orchestration configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FeedbackConfig {
    pub throughput: ThroughputProfile,

    /// Explicit per-attempt timeout; overrides the throughput profile.
    pub timeout_secs: Option<u64>,

    pub max_retries: u32,
    pub retry_delay_ms: u64,
    pub cache_ttl_secs: u64,
}

impl Default for FeedbackConfig {
    fn default() -> Self {
        Self {
            throughput: ThroughputProfile::default(),
            timeout_secs: None,
            max_retries: 3,
            retry_delay_ms: 2_000,
            cache_ttl_secs: 3_600,
        }
    }
}

/// Sandbox configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SandboxConfig {
    pub max_rows: usize,
    pub query_timeout_ms: u64,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            max_rows: 100,
            query_timeout_ms: 5_000,
        }
    }
}

impl Config {
    /// Returns the default config file path for the current platform.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("sqltutor")
            .join("config.toml")
    }

    /// Loads the file at `path`, applies process environment overrides, and validates.
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = Self::load_from_file(path)?;
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a TOML file. A missing file yields defaults.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| TutorError::config(format!("Failed to read config file: {e}")))?;

        Self::parse_toml(&content, path)
    }

    /// Parses configuration from a TOML string.
    fn parse_toml(content: &str, path: &Path) -> Result<Self> {
        toml::from_str(content).map_err(|e| {
            TutorError::config(format!(
                "Configuration error in {}:\n  {}",
                path.display(),
                e
            ))
        })
    }

    /// Applies `SQLTUTOR_*` overrides read through `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("SQLTUTOR_LLM_URL") {
            self.llm.base_url = url;
        }
        if let Some(model) = lookup("SQLTUTOR_LLM_MODEL") {
            self.llm.model = model;
        }
        if let Some(profile) = lookup("SQLTUTOR_THROUGHPUT") {
            self.feedback.throughput = profile.parse().map_err(TutorError::config)?;
        }
        if let Some(secs) = lookup("SQLTUTOR_LLM_TIMEOUT_SECS") {
            self.feedback.timeout_secs = Some(parse_number("SQLTUTOR_LLM_TIMEOUT_SECS", &secs)?);
        }
        if let Some(retries) = lookup("SQLTUTOR_MAX_RETRIES") {
            self.feedback.max_retries = parse_number("SQLTUTOR_MAX_RETRIES", &retries)?;
        }
        if let Some(rows) = lookup("SQLTUTOR_MAX_ROWS") {
            self.sandbox.max_rows = parse_number("SQLTUTOR_MAX_ROWS", &rows)?;
        }
        if let Some(ms) = lookup("SQLTUTOR_QUERY_TIMEOUT_MS") {
            self.sandbox.query_timeout_ms = parse_number("SQLTUTOR_QUERY_TIMEOUT_MS", &ms)?;
        }
        Ok(())
    }

    /// Checks value ranges and the service URL.
    pub fn validate(&self) -> Result<()> {
        let url = Url::parse(&self.llm.base_url)
            .map_err(|e| TutorError::config(format!("Invalid llm.base_url: {e}")))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(TutorError::config(format!(
                "Invalid scheme '{}' in llm.base_url. Expected 'http' or 'https'",
                url.scheme()
            )));
        }
        if self.llm.model.trim().is_empty() {
            return Err(TutorError::config("llm.model must not be empty"));
        }
        if self.feedback.max_retries < 1 {
            return Err(TutorError::config("feedback.max_retries must be at least 1"));
        }
        if self.feedback.timeout_secs == Some(0) {
            return Err(TutorError::config("feedback.timeout_secs must be at least 1"));
        }
        if self.sandbox.max_rows < 1 {
            return Err(TutorError::config("sandbox.max_rows must be at least 1"));
        }
        if self.sandbox.query_timeout_ms < 1 {
            return Err(TutorError::config(
                "sandbox.query_timeout_ms must be at least 1",
            ));
        }
        Ok(())
    }

    /// Per-attempt deadline: explicit value if set, otherwise the profile's.
    pub fn attempt_timeout(&self) -> Duration {
        self.feedback
            .timeout_secs
            .map(Duration::from_secs)
            .unwrap_or_else(|| self.feedback.throughput.attempt_timeout())
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.feedback.cache_ttl_secs)
    }

    pub fn sandbox_limits(&self) -> SandboxLimits {
        SandboxLimits {
            max_rows: self.sandbox.max_rows,
            query_timeout: Duration::from_millis(self.sandbox.query_timeout_ms),
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.feedback.max_retries,
            attempt_timeout: self.attempt_timeout(),
            retry_delay: Duration::from_millis(self.feedback.retry_delay_ms),
        }
    }

    pub fn ollama_config(&self) -> OllamaConfig {
        OllamaConfig::new(self.llm.model.clone())
            .with_url(self.llm.base_url.clone())
            .with_timeout(self.attempt_timeout())
            .with_options(GenerationOptions {
                temperature: self.llm.temperature,
                top_p: self.llm.top_p,
                num_predict: self.llm.num_predict,
            })
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| {
            TutorError::config(format!(
                "{key} must be a non-negative integer, got '{value}'"
            ))
        })
}
