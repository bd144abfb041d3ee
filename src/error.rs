//! Error types for sqltutor.
//!
//! Defines the main error enum used throughout the evaluation engine.

use thiserror::Error;

/// Main error type for sqltutor operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TutorError {
    /// The classifier refused the statement. Always a caller input error.
    #[error("Rejected statement: {0}")]
    RejectedStatement(String),

    /// The sandbox engine reported an error or timed out.
    #[error("Execution error: {0}")]
    Execution(String),

    /// Transport, deadline or non-200 failure from the reasoning service.
    #[error("Feedback service error: {0}")]
    FeedbackService(String),

    /// Configuration errors (invalid config file, bad URL, out-of-range limits, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Collaborator storage errors (unknown exercise, failed attempt write, etc.)
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// The caller cancelled the evaluation.
    #[error("Evaluation cancelled")]
    Cancelled,
}

impl TutorError {
    /// Creates a rejected-statement error with the given reason.
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::RejectedStatement(reason.into())
    }

    /// Creates an execution error with the given message.
    pub fn execution(msg: impl Into<String>) -> Self {
        Self::Execution(msg.into())
    }

    /// Creates a feedback service error with the given message.
    pub fn feedback_service(msg: impl Into<String>) -> Self {
        Self::FeedbackService(msg.into())
    }

    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates a persistence error with the given message.
    pub fn persistence(msg: impl Into<String>) -> Self {
        Self::Persistence(msg.into())
    }

    /// Returns the error category as a string for display purposes.
    pub fn category(&self) -> &'static str {
        match self {
            Self::RejectedStatement(_) => "Rejected Statement",
            Self::Execution(_) => "Execution Error",
            Self::FeedbackService(_) => "Feedback Service Error",
            Self::Config(_) => "Configuration Error",
            Self::Persistence(_) => "Persistence Error",
            Self::Cancelled => "Cancelled",
        }
    }

    /// Returns true if the error was caused by the caller's input.
    pub fn is_caller_error(&self) -> bool {
        matches!(self, Self::RejectedStatement(_))
    }
}

/// Result type alias using TutorError.
pub type Result<T> = std::result::Result<T, TutorError>;
