//! Integration tests for sqltutor.

pub mod cli_test;
pub mod evaluation_test;
pub mod ollama_test;
pub mod sandbox_test;
pub mod service;
