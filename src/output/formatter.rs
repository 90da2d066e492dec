//! Output formatters for run results
//!
//! Provides table, JSON, CSV and one-line summary output.

use anyhow::{Context, Result};
use clap::ValueEnum;
use std::path::Path;

use crate::models::{RunSummary, ScenarioResult, ScenarioStatus};

/// Output format options
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    JsonPretty,
    Csv,
    Summary,
}

/// Result formatter
pub struct ResultFormatter {
    format: OutputFormat,
    colorize: bool,
}

impl ResultFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            colorize: true,
        }
    }

    pub fn no_color(mut self) -> Self {
        self.colorize = false;
        self
    }

    fn format_result_table(&self, result: &ScenarioResult) -> String {
        let label = match result.status {
            ScenarioStatus::Pass => "✓ PASS ",
            ScenarioStatus::Fail => "✗ FAIL ",
            ScenarioStatus::Skip => "○ SKIP ",
            ScenarioStatus::Error => "! ERROR",
        };
        let status = if self.colorize {
            let color = match result.status {
                ScenarioStatus::Pass => "32",
                ScenarioStatus::Skip => "33",
                ScenarioStatus::Fail | ScenarioStatus::Error => "31",
            };
            format!("\x1b[{color}m{label}\x1b[0m")
        } else {
            label.to_string()
        };

        let mut line = format!(
            "{:2}. {:24} {} [{:>6}ms]",
            result.scenario.number(),
            result.scenario.name(),
            status,
            result.duration_ms
        );
        if let Some(message) = &result.message {
            let first_line = message.lines().next().unwrap_or_default();
            line.push_str(&format!("\n      {first_line}"));
        }
        line
    }

    /// Format a whole run
    pub fn format_summary(&self, summary: &RunSummary) -> Result<String> {
        Ok(match self.format {
            OutputFormat::Table => self.format_summary_table(summary),
            OutputFormat::Json => serde_json::to_string(summary)?,
            OutputFormat::JsonPretty => serde_json::to_string_pretty(summary)?,
            OutputFormat::Csv => format_summary_csv(summary)?,
            OutputFormat::Summary => format_summary_brief(summary),
        })
    }

    fn format_summary_table(&self, summary: &RunSummary) -> String {
        let mut output = String::new();

        output.push_str("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n");
        output.push_str(&format!(" Gists API - {}\n", summary.target));
        output.push_str("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n");

        for result in &summary.results {
            output.push_str(&format!(" {}\n", self.format_result_table(result)));
        }

        output.push_str("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n");

        let pass_str = if self.colorize {
            format!("\x1b[32m{}\x1b[0m", summary.passed)
        } else {
            summary.passed.to_string()
        };
        let fail_str = if self.colorize && summary.failed > 0 {
            format!("\x1b[31m{}\x1b[0m", summary.failed)
        } else {
            summary.failed.to_string()
        };

        output.push_str(&format!(
            " Total: {} | Pass: {} | Fail: {} | Skip: {} | Error: {}\n",
            summary.total, pass_str, fail_str, summary.skipped, summary.errors
        ));
        output.push_str(&format!(
            " Pass Rate: {:.1}% | Duration: {}ms\n",
            summary.pass_rate(),
            summary.total_duration_ms
        ));

        output
    }

    /// Write a run to `path`, without colors
    pub fn write_to_file(&self, path: &Path, summary: &RunSummary) -> Result<()> {
        let plain = ResultFormatter::new(self.format).no_color();
        let content = plain.format_summary(summary)?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write results to {}", path.display()))
    }
}

impl Default for ResultFormatter {
    fn default() -> Self {
        Self::new(OutputFormat::Table)
    }
}

const CSV_HEADER: [&str; 6] = [
    "scenario_num",
    "scenario_name",
    "category",
    "status",
    "duration_ms",
    "message",
];

fn format_summary_csv(summary: &RunSummary) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(CSV_HEADER)?;

    for result in &summary.results {
        writer.write_record([
            result.scenario.number().to_string(),
            result.scenario.name().to_string(),
            result.scenario.category().to_string(),
            result.status.to_string(),
            result.duration_ms.to_string(),
            result.message.clone().unwrap_or_default(),
        ])?;
    }

    let bytes = writer.into_inner().context("Failed to flush CSV output")?;
    String::from_utf8(bytes).context("CSV output is not valid UTF-8")
}

fn format_summary_brief(summary: &RunSummary) -> String {
    format!(
        "{}: {}/{} passed, {} failed, {} errors, {} skipped ({:.1}%) in {}ms",
        summary.target,
        summary.passed,
        summary.total,
        summary.failed,
        summary.errors,
        summary.skipped,
        summary.pass_rate(),
        summary.total_duration_ms
    )
}
