//! Result types produced by the sandbox.
//!
//! Defines the structures used to represent query outcomes from the ephemeral store.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Result, TutorError};

/// A row of data, one cell per column.
pub type Row = Vec<Value>;

/// Represents a single scalar value from a sandbox query.
///
/// Serialized untagged so expected results can be written as plain JSON.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Value {
    /// NULL value.
    #[default]
    Null,

    /// Signed integer (SQLite INTEGER).
    Int(i64),

    /// Floating point number (SQLite REAL).
    Float(f64),

    /// Text value (SQLite TEXT).
    String(String),

    /// Binary data (SQLite BLOB).
    Bytes(Vec<u8>),
}

impl Value {
    /// Returns true if this value is NULL.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Converts the value to a string representation.
    pub fn to_display_string(&self) -> String {
        match self {
            Value::Null => "NULL".to_string(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => f.to_string(),
            Value::String(s) => s.clone(),
            Value::Bytes(b) => format!("<{} bytes>", b.len()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_display_string())
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl<T> From<Option<T>> for Value
where
    T: Into<Value>,
{
    fn from(v: Option<T>) -> Self {
        match v {
            Some(val) => val.into(),
            None => Value::Null,
        }
    }
}

/// Columns and rows of a successful query.
///
/// Every row holds exactly `columns.len()` cells.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ResultSet {
    /// Column names in projection order.
    pub columns: Vec<String>,

    /// Rows of data, capped at the sandbox row limit.
    pub rows: Vec<Row>,

    /// Whether rows beyond the limit were dropped.
    #[serde(default)]
    pub truncated: bool,
}

impl ResultSet {
    /// Creates a result set from columns and rows.
    pub fn new(columns: Vec<String>, rows: Vec<Row>) -> Self {
        Self {
            columns,
            rows,
            truncated: false,
        }
    }

    /// Number of rows held.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if there are no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Returns a copy holding at most the first `limit` rows.
    pub fn preview(&self, limit: usize) -> Self {
        Self {
            columns: self.columns.clone(),
            rows: self.rows.iter().take(limit).cloned().collect(),
            truncated: self.truncated || self.rows.len() > limit,
        }
    }
}

/// Outcome of running a statement in the sandbox.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ExecutionResult {
    /// The statement ran and produced a (possibly empty) result set.
    Success(ResultSet),
    /// The statement failed, timed out, or was cancelled.
    Error { message: String },
}

impl ExecutionResult {
    /// Creates an error outcome.
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// Returns true if the statement ran.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Returns the result set on success.
    pub fn result_set(&self) -> Option<&ResultSet> {
        match self {
            Self::Success(set) => Some(set),
            Self::Error { .. } => None,
        }
    }

    /// Returns the error message on failure.
    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Success(_) => None,
            Self::Error { message } => Some(message),
        }
    }

    /// Converts the outcome into a `Result`, mapping a failure to
    /// `TutorError::Execution`.
    pub fn into_result(self) -> Result<ResultSet> {
        match self {
            Self::Success(set) => Ok(set),
            Self::Error { message } => Err(TutorError::execution(message)),
        }
    }
}
