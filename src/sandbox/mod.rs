//! Sandbox execution layer for sqltutor.
//!
//! Runs classifier-approved SQL against throwaway, deterministically seeded
//! SQLite stores and shapes the outcome into columns and rows.

mod executor;
pub mod normalize;
mod seed;
mod types;

pub use executor::{
    execute_with, SandboxExecutor, SandboxLimits, CANCELLED_MESSAGE, SQL_ERROR_PREFIX,
    TIMEOUT_MESSAGE,
};
pub use normalize::{equivalent, normalize};
pub use seed::SEED_TABLES;
pub use types::{ExecutionResult, ResultSet, Row, Value};
