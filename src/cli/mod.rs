//! CLI argument parsing
//!
//! Defines command-line interface using clap.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

use crate::output::OutputFormat;

/// Automated API test suite for GitHub Gists
#[derive(Parser, Debug)]
#[command(name = "gist-api-tests")]
#[command(version)]
#[command(about = "Run end-to-end scenarios against the GitHub Gists REST API")]
#[command(long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Config file to use instead of the standard locations
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run gists scenarios
    Run(RunArgs),

    /// List available scenarios
    List(ListArgs),

    /// Show environment configuration
    Env(EnvArgs),
}

/// Arguments for run command
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Scenario number to run (repeatable; default: all)
    #[arg(short, long = "scenario", value_name = "N", value_parser = clap::value_parser!(u8).range(1..=11))]
    pub scenarios: Vec<u8>,

    /// Skip scenarios (comma-separated numbers)
    #[arg(long, value_delimiter = ',', value_name = "N,..")]
    pub skip: Vec<u8>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,

    /// Save results to file
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Write request/response attachments below this directory
    #[arg(long)]
    pub report_dir: Option<PathBuf>,

    /// API base URL (overrides BASE_URL)
    #[arg(long)]
    pub base_url: Option<String>,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,
}

/// Arguments for list command
#[derive(Parser, Debug)]
pub struct ListArgs {
    /// Show category, token requirement and description
    #[arg(short, long)]
    pub detailed: bool,
}

/// Arguments for env command
#[derive(Parser, Debug)]
pub struct EnvArgs {
    /// Print an example config file instead
    #[arg(long)]
    pub example: bool,
}
