//! Command-line argument parsing for sqltutor.
//!
//! Uses clap derive to parse the global flags and subcommands.

use crate::evaluation::{Exercise, SubmissionMode};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Sandboxed SQL evaluation with tutor feedback.
#[derive(Parser, Debug)]
#[command(name = "sqltutor")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Write logs to the state directory instead of stderr
    #[arg(long, global = true)]
    pub log_file: bool,

    /// Never contact the reasoning service; always use fallback feedback
    #[arg(long, global = true)]
    pub offline: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Command {
    /// Evaluate a query against an exercise and print the result as JSON
    Evaluate(EvaluateArgs),

    /// Print the classifier verdict for a statement
    Classify {
        /// SQL to classify
        #[arg(value_name = "SQL")]
        sql: String,
    },

    /// Check whether the reasoning service is reachable
    Check,
}

#[derive(clap::Args, Debug, PartialEq)]
pub struct EvaluateArgs {
    /// Student SQL
    #[arg(long, value_name = "SQL")]
    pub sql: String,

    /// Exercise prompt shown to the student
    #[arg(long, value_name = "TEXT")]
    pub prompt: String,

    /// Reference solution used for grading
    #[arg(long, value_name = "SQL")]
    pub expected_sql: Option<String>,

    /// Difficulty tag passed to the tutor
    #[arg(long, value_name = "TAG", default_value = "beginner")]
    pub difficulty: String,

    /// run: execute and preview only; submit: full feedback
    #[arg(long, value_name = "MODE", default_value = "submit")]
    pub mode: SubmissionMode,
}

impl EvaluateArgs {
    /// Builds the ad-hoc exercise described by the arguments.
    pub fn exercise(&self) -> Exercise {
        let exercise =
            Exercise::new("cli", self.prompt.clone()).with_difficulty(self.difficulty.clone());
        match &self.expected_sql {
            Some(sql) => exercise.with_expected_sql(sql.clone()),
            None => exercise,
        }
    }
}

impl Cli {
    /// Parses command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Returns the config file path to use.
    ///
    /// Uses the --config argument if provided, otherwise the default path.
    pub fn config_path(&self) -> PathBuf {
        self.config
            .clone()
            .unwrap_or_else(crate::config::Config::default_path)
    }
}
