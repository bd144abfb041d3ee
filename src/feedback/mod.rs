//! Feedback generation for evaluated submissions.
//!
//! The orchestrator turns a [`SubmissionContext`] into a [`FeedbackPayload`],
//! consulting the cache first, then the reasoning service, and falling back to
//! deterministic text when the service cannot help.

pub mod cache;
pub mod fallback;
pub mod orchestrator;
pub mod prompt;

pub use cache::{fingerprint, FeedbackCache, Fingerprint, DEFAULT_CACHE_TTL};
pub use fallback::fallback_payload;
pub use orchestrator::{FeedbackOrchestrator, RetryPolicy};
pub use prompt::build_feedback_prompt;

use serde::{Deserialize, Serialize};

use crate::sandbox::{ExecutionResult, ResultSet};

/// Everything the feedback engine knows about one evaluation.
///
/// Built once by the evaluation pipeline and never changed afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionContext {
    sql: String,
    exercise_prompt: String,
    expected_sql: Option<String>,
    expected_result: Option<ResultSet>,
    difficulty: String,
    is_correct: bool,
    validation_error: Option<String>,
    result: Option<ResultSet>,
}

impl SubmissionContext {
    /// Creates a context for `sql` answering `exercise_prompt`, not yet executed.
    pub fn new(sql: impl Into<String>, exercise_prompt: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            exercise_prompt: exercise_prompt.into(),
            expected_sql: None,
            expected_result: None,
            difficulty: "beginner".to_string(),
            is_correct: false,
            validation_error: None,
            result: None,
        }
    }

    /// Sets the difficulty tag.
    pub fn with_difficulty(mut self, difficulty: impl Into<String>) -> Self {
        self.difficulty = difficulty.into();
        self
    }

    /// Sets the reference SQL.
    pub fn with_expected_sql(mut self, expected_sql: Option<String>) -> Self {
        self.expected_sql = expected_sql;
        self
    }

    /// Sets the reference result.
    pub fn with_expected_result(mut self, expected_result: Option<ResultSet>) -> Self {
        self.expected_result = expected_result;
        self
    }

    /// Records the execution outcome and the grading verdict.
    pub fn with_outcome(mut self, execution: &ExecutionResult, is_correct: bool) -> Self {
        match execution {
            ExecutionResult::Success(set) => {
                self.result = Some(set.clone());
                self.validation_error = None;
                self.is_correct = is_correct;
            }
            ExecutionResult::Error { message } => {
                self.result = None;
                self.validation_error = Some(message.clone());
                self.is_correct = false;
            }
        }
        self
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn exercise_prompt(&self) -> &str {
        &self.exercise_prompt
    }

    pub fn expected_sql(&self) -> Option<&str> {
        self.expected_sql.as_deref()
    }

    pub fn expected_result(&self) -> Option<&ResultSet> {
        self.expected_result.as_ref()
    }

    pub fn difficulty(&self) -> &str {
        &self.difficulty
    }

    pub fn is_correct(&self) -> bool {
        self.is_correct
    }

    /// True if the statement executed.
    pub fn succeeded(&self) -> bool {
        self.validation_error.is_none()
    }

    pub fn validation_error(&self) -> Option<&str> {
        self.validation_error.as_deref()
    }

    pub fn result(&self) -> Option<&ResultSet> {
        self.result.as_ref()
    }
}

/// Where a payload came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackSource {
    /// Parsed from the reasoning service's answer.
    Service,
    /// Produced by the deterministic fallback rule.
    Fallback,
}

/// Feedback returned to the learner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackPayload {
    pub feedback: String,
    #[serde(default)]
    pub suggestions: Vec<String>,
    #[serde(default)]
    pub explanation: Option<String>,
    #[serde(default)]
    pub next_steps: Vec<String>,
    pub source: FeedbackSource,
}

impl FeedbackPayload {
    /// Builds a payload from raw service text.
    ///
    /// Only the trimmed text is used. Suggestions and explanation stay empty
    /// until the service is asked for a structured answer.
    pub fn from_service_text(text: &str) -> Option<Self> {
        let feedback = text.trim();
        if feedback.is_empty() {
            return None;
        }
        Some(Self {
            feedback: feedback.to_string(),
            suggestions: Vec::new(),
            explanation: None,
            next_steps: Vec::new(),
            source: FeedbackSource::Service,
        })
    }
}
