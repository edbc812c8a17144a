//! # conform
//!
//! Runs the Ethereum JSON-RPC conformance suite against a node.
//!
//! ## Usage
//!
//! ```bash
//! # Everything, against the configured node
//! conform run
//!
//! # Two scenarios, another endpoint, machine-readable report
//! conform --rpc-url http://127.0.0.1:8545 --json run -s block -s balance
//!
//! # What is available / what is configured
//! conform list
//! conform config
//! ```
//!
//! Exit status: 0 when every scenario passed or was skipped, 1 when any
//! scenario failed, 2 when the run could not start.

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use conform_harness::Runner;
use conform_sdk::{HttpTransport, RpcClient};
use serde_json::json;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

mod config;
mod error;
mod logging;
mod output;

pub use config::Config;
pub use error::CliError;
pub use output::Output;

use logging::LogFormat;

/// Ethereum JSON-RPC conformance runner
#[derive(Parser, Debug)]
#[command(name = "conform")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Config file (default: ~/.conform/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// RPC endpoint URL
    #[arg(long, global = true)]
    rpc_url: Option<String>,

    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Log level when RUST_LOG is unset
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Log line format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

/// CLI commands
#[derive(Debug, Subcommand)]
enum Commands {
    /// Run scenarios against the node
    Run {
        /// Only run this scenario (repeatable)
        #[arg(long = "scenario", short = 's')]
        scenarios: Vec<String>,
        /// Never run this scenario (repeatable)
        #[arg(long)]
        skip: Vec<String>,
        /// Scenarios running at once
        #[arg(long)]
        concurrency: Option<usize>,
    },
    /// List built-in scenarios
    List,
    /// Show the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(&cli.log_level, cli.log_format);
    let json = cli.json;

    match execute(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            if json {
                println!(
                    "{}",
                    json!({
                        "error": format!("{:#}", e),
                        "success": false
                    })
                );
            } else {
                eprintln!("Error: {:#}", e);
            }
            ExitCode::from(2)
        }
    }
}

/// `Ok(false)` when the run completed with failures
async fn execute(cli: Cli) -> anyhow::Result<bool> {
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(rpc_url) = cli.rpc_url {
        config.rpc_url = rpc_url;
    }

    match cli.command {
        Commands::Run {
            scenarios,
            skip,
            concurrency,
        } => {
            if let Some(concurrency) = concurrency {
                if concurrency == 0 {
                    return Err(CliError::InvalidInput("--concurrency must be at least 1".into()).into());
                }
                config.runner.max_concurrency = concurrency;
            }
            config.runner.skip.extend(skip);
            run(&config, &scenarios, cli.json).await
        }
        Commands::List => {
            list(cli.json);
            Ok(true)
        }
        Commands::Config => {
            show_config(&config, cli.json)?;
            Ok(true)
        }
    }
}

async fn run(config: &Config, names: &[String], json: bool) -> anyhow::Result<bool> {
    let scenarios = conform_suite::select(names).map_err(CliError::UnknownScenario)?;
    let fixtures = Arc::new(config.fixtures()?);
    let transport = HttpTransport::with_timeout(&config.rpc_url, config.request_timeout())
        .with_context(|| format!("cannot create transport for {}", config.rpc_url))?;
    let runner = Runner::new(RpcClient::new(transport), fixtures, config.runner_config());

    tracing::info!(
        rpc_url = %config.rpc_url,
        scenarios = scenarios.len(),
        concurrency = config.runner.max_concurrency,
        "starting conformance run"
    );
    let report = runner.run_all(scenarios).await;
    tracing::info!(
        passed = report.totals.passed,
        failed = report.totals.failed,
        skipped = report.totals.skipped,
        "conformance run finished"
    );

    output::print_report(&report, json);
    Ok(report.success())
}

fn list(json: bool) {
    let scenarios = conform_suite::all_scenarios();
    let message = scenarios
        .iter()
        .map(|s| format!("{:<10} {}", s.name(), s.description().unwrap_or("")))
        .collect::<Vec<_>>()
        .join("\n");
    let entries: Vec<_> = scenarios
        .iter()
        .map(|s| {
            json!({
                "name": s.name(),
                "description": s.description(),
                "steps": s.steps().iter().map(|step| step.name()).collect::<Vec<_>>(),
            })
        })
        .collect();

    Output::new(json)
        .field_value("scenarios", json!(entries))
        .message(&message)
        .print();
}

fn show_config(config: &Config, json: bool) -> anyhow::Result<()> {
    let mut shown = config.clone();
    for account in shown.accounts.values_mut() {
        account.private_key = "<redacted>".to_string();
    }

    let text = toml::to_string_pretty(&shown).context("cannot render config")?;
    Output::new(json)
        .field_value("config", serde_json::to_value(&shown)?)
        .field("rpc_url", &shown.rpc_url)
        .message(text.trim_end())
        .print();
    Ok(())
}
