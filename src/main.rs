//! sqltutor - sandboxed SQL evaluation with tutor feedback.

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use sqltutor::cli::{Cli, Command};
use sqltutor::config::Config;
use sqltutor::evaluation::Evaluator;
use sqltutor::feedback::{FeedbackCache, FeedbackOrchestrator};
use sqltutor::llm::{LlmClient, OllamaClient};
use sqltutor::logging::{self, LogTarget};
use sqltutor::safety::classify_sql;
use sqltutor::sandbox::SandboxExecutor;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Exit code for a statement the classifier refused.
const EXIT_REJECTED: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let cli = Cli::parse_args();
    logging::init(LogTarget::from_flag(cli.log_file));

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            error!("{e:#}");
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let config_path = cli.config_path();
    info!("Loading config from: {}", config_path.display());
    let config = Config::load(&config_path).context("Failed to load configuration")?;

    match cli.command {
        Command::Classify { sql } => {
            let verdict = classify_sql(&sql);
            println!("{verdict}");
            Ok(if verdict.is_allowed() {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(EXIT_REJECTED)
            })
        }
        Command::Check => {
            let client = OllamaClient::new(config.ollama_config())?;
            let base_url = &client.config().base_url;
            if client.is_available().await {
                println!("Reasoning service reachable at {base_url}");
                Ok(ExitCode::SUCCESS)
            } else {
                println!("Reasoning service unreachable at {base_url}");
                Ok(ExitCode::FAILURE)
            }
        }
        Command::Evaluate(args) => {
            let evaluator = build_evaluator(&config, cli.offline)?;
            let cancel = CancellationToken::new();
            spawn_interrupt_handler(cancel.clone());

            match evaluator
                .evaluate(&args.exercise(), &args.sql, args.mode, &cancel)
                .await
            {
                Ok(evaluation) => {
                    println!("{}", serde_json::to_string_pretty(&evaluation)?);
                    Ok(ExitCode::SUCCESS)
                }
                Err(e) if e.is_caller_error() => {
                    eprintln!("{e}");
                    Ok(ExitCode::from(EXIT_REJECTED))
                }
                Err(e) => Err(e.into()),
            }
        }
    }
}

/// Wires sandbox, cache, and reasoning client from configuration.
fn build_evaluator(config: &Config, offline: bool) -> anyhow::Result<Evaluator> {
    let cache = Arc::new(FeedbackCache::new(config.cache_ttl()));
    let orchestrator = if offline {
        info!("Offline mode, feedback will use the fallback rule");
        FeedbackOrchestrator::offline(cache)
    } else {
        let client = OllamaClient::new(config.ollama_config())
            .context("Failed to create reasoning service client")?;
        FeedbackOrchestrator::new(Arc::new(client), cache, config.retry_policy())
    };

    Ok(Evaluator::new(
        SandboxExecutor::new(config.sandbox_limits()),
        Arc::new(orchestrator),
    ))
}

/// Cancels `cancel` on Ctrl-C.
fn spawn_interrupt_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                warn!("Interrupt received, cancelling evaluation");
                cancel.cancel();
            }
            Err(e) => error!("Failed to listen for Ctrl-C: {e}"),
        }
    });
}
