//! sqltutor - sandboxed SQL evaluation and tutor feedback engine.
//!
//! This library exposes the core modules for the binary and integration tests.

pub mod cli;
pub mod config;
pub mod error;
pub mod evaluation;
pub mod feedback;
pub mod llm;
pub mod logging;
pub mod safety;
pub mod sandbox;
