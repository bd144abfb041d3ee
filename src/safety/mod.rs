//! Statement classification module.
//!
//! Decides whether submitted SQL text may reach the sandbox at all. The
//! classifier is a deliberately coarse lexical gate, not a parser: it favors
//! rejecting a harmless query over admitting a harmful one.

mod classifier;

pub use classifier::{classify_sql, SqlClassifier, FORBIDDEN_KEYWORDS};

use std::fmt;

/// Why a statement was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    /// The text was empty or whitespace only.
    Empty,
    /// The text contains a mutation, schema, or privilege keyword.
    ForbiddenKeyword(&'static str),
    /// The statement does not begin with the read-only query verb.
    LeadingToken(String),
    /// More than one non-empty statement separated by `;`.
    MultipleStatements,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "empty query"),
            Self::ForbiddenKeyword(keyword) => {
                write!(f, "forbidden operation: {keyword} is not permitted")
            }
            Self::LeadingToken(token) => write!(
                f,
                "only SELECT statements are permitted, found '{token}'"
            ),
            Self::MultipleStatements => write!(f, "multiple statements not permitted"),
        }
    }
}

/// Verdict of classifying a SQL text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// The text may be executed in the sandbox.
    Allow,
    /// The text must not be executed.
    Reject(RejectReason),
}

impl Verdict {
    /// Returns true if the statement may run.
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow)
    }

    /// Returns the rejection reason, if any.
    pub fn reason(&self) -> Option<&RejectReason> {
        match self {
            Self::Allow => None,
            Self::Reject(reason) => Some(reason),
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Allow => write!(f, "Allow"),
            Self::Reject(reason) => write!(f, "Reject: {reason}"),
        }
    }
}
