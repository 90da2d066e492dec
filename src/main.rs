//! gist-api-tests - GitHub Gists API test suite
//!
//! A CLI that runs end-to-end scenarios against the Gists REST API through a
//! retrying, status-asserting HTTP client.
//!
//! ## Features
//!
//! - 11 scenarios covering CRUD, stars, listing, history, forks and error paths
//! - Transport retries with exponential backoff and `Retry-After` support
//! - Per-call request/response attachments written to a report directory
//! - Multiple output formats (Table, JSON, CSV, Summary)
//!
//! ## Usage
//!
//! ```bash
//! # Run every scenario
//! GITHUB_TOKEN=ghp_xxx gist-api-tests run
//!
//! # Run specific scenarios
//! gist-api-tests run --scenario 1 --scenario 4
//!
//! # Skip slow ones and write JSON results
//! gist-api-tests run --skip 7,8 --format json --output results.json
//!
//! # List available scenarios
//! gist-api-tests list --detailed
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use std::process::ExitCode;
use tracing::{debug, info};

mod api;
mod cli;
mod config;
mod executor;
mod http;
mod models;
mod output;
mod report;
mod scenarios;
mod utils;

use cli::Args;
use config::{Config, ConfigFile, EnvConfig, Overrides};
use executor::ScenarioRunner;
use models::Scenario;
use output::ResultFormatter;
use report::Reporter;
use utils::logger::{init_logger, LogLevel};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();
    init_logger(LogLevel::from_verbosity(args.verbose));

    match args.command {
        cli::Command::Run(run_args) => run_scenarios(run_args, args.config).await,
        cli::Command::List(list_args) => {
            list_scenarios(list_args);
            Ok(ExitCode::SUCCESS)
        }
        cli::Command::Env(env_args) => {
            show_env(env_args, args.config)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn run_scenarios(
    args: cli::RunArgs,
    config_file: Option<std::path::PathBuf>,
) -> Result<ExitCode> {
    let config = Config::load(Overrides {
        base_url: args.base_url,
        report_dir: args.report_dir,
        config_file,
    })?;
    if let Some(source) = &config.source {
        debug!("Loaded configuration from {}", source.display());
    }
    debug!("Resolved settings: {:?}", config.settings);

    let selected = args
        .scenarios
        .iter()
        .map(|&n| Scenario::from_number(n).with_context(|| format!("Invalid scenario number: {n}")))
        .collect::<Result<Vec<_>>>()?;

    let reporter = Reporter::for_dir(config.client.report_dir.clone())?;
    let runner = ScenarioRunner::new(&config, reporter)?.with_skip(args.skip);

    info!(
        "Testing {} (token {})",
        config.settings.base_url,
        if config.settings.has_token() { "set" } else { "not set" }
    );

    let summary = if selected.is_empty() {
        runner.run_all().await
    } else {
        runner.run_scenarios(&selected).await
    };

    let mut formatter = ResultFormatter::new(args.format);
    if args.no_color {
        formatter = formatter.no_color();
    }
    println!("{}", formatter.format_summary(&summary)?);

    if let Some(path) = &args.output {
        formatter.write_to_file(path, &summary)?;
        println!("Results saved to {}", path.display());
    }
    if let Some(dir) = &config.client.report_dir {
        println!("Attachments written to {}", dir.display());
    }

    Ok(if summary.has_failures() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

fn list_scenarios(args: cli::ListArgs) {
    let all = Scenario::all();
    println!("\nGists API Scenarios ({} total)\n", all.len());
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    for scenario in all {
        if args.detailed {
            let token = if scenario.requires_token() { "token" } else { "     " };
            println!(
                "  {:2}. {:22} [{:8}] {}  {}",
                scenario.number(),
                scenario.name(),
                scenario.category(),
                token,
                scenario.description()
            );
        } else {
            println!("  {:2}. {}", scenario.number(), scenario.name());
        }
    }

    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n");
}

fn show_env(args: cli::EnvArgs, config_file: Option<std::path::PathBuf>) -> Result<()> {
    if args.example {
        print!("{}", ConfigFile::example().to_yaml()?);
        return Ok(());
    }

    let env = EnvConfig::load();
    env.print_summary();
    println!();

    let config = Config::load(Overrides {
        config_file,
        ..Default::default()
    })?;
    println!("Resolved Configuration:");
    println!(
        "  Config file:  {}",
        config
            .source
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(none)".to_string())
    );
    println!("  Base URL:     {}", config.settings.base_url);
    println!("  API version:  {}", config.settings.api_version);
    println!(
        "  Token:        {}",
        if config.settings.has_token() { "<set>" } else { "(none)" }
    );
    println!(
        "  Timeout:      {}",
        config
            .client
            .timeout
            .map(|t| format!("{:.1}s", t.as_secs_f64()))
            .unwrap_or_else(|| "disabled".to_string())
    );
    println!("  Retries:      {}", config.client.retries);
    println!("  Backoff:      {}", config.client.backoff_factor);
    println!("  TLS:          {:?}", config.client.tls());
    println!();

    if !env.has_any() {
        config::print_env_help();
    }
    Ok(())
}
