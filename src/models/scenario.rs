//! Scenario result models
//!
//! Defines the scenario catalogue, outcomes, and run summaries.

#![allow(dead_code)]

use serde::{Deserialize, Serialize};
use std::fmt;

/// All 11 scenarios in the gists suite
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scenario {
    // CRUD (1-3)
    CreateAndGet,
    Update,
    Delete,

    // Stars (4)
    StarUnstar,

    // Listing and history (5-8)
    ListPublic,
    Commits,
    Forks,
    OwnList,

    // Negative paths (9-11)
    NotFound,
    InvalidPayload,
    Unauthorized,
}

impl Scenario {
    /// Scenario number (1-11)
    pub fn number(&self) -> u8 {
        match self {
            Scenario::CreateAndGet => 1,
            Scenario::Update => 2,
            Scenario::Delete => 3,
            Scenario::StarUnstar => 4,
            Scenario::ListPublic => 5,
            Scenario::Commits => 6,
            Scenario::Forks => 7,
            Scenario::OwnList => 8,
            Scenario::NotFound => 9,
            Scenario::InvalidPayload => 10,
            Scenario::Unauthorized => 11,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Scenario::CreateAndGet => "Create and Get",
            Scenario::Update => "Update Gist",
            Scenario::Delete => "Delete Gist",
            Scenario::StarUnstar => "Star and Unstar",
            Scenario::ListPublic => "List Public Gists",
            Scenario::Commits => "Commit History",
            Scenario::Forks => "Fork Gist",
            Scenario::OwnList => "Own Gists Since",
            Scenario::NotFound => "Unknown Gist 404",
            Scenario::InvalidPayload => "Invalid Payload 422",
            Scenario::Unauthorized => "Unauthorized 401",
        }
    }

    pub fn category(&self) -> &'static str {
        match self {
            Scenario::CreateAndGet | Scenario::Update | Scenario::Delete => "CRUD",
            Scenario::StarUnstar => "Stars",
            Scenario::ListPublic | Scenario::OwnList => "Listing",
            Scenario::Commits => "History",
            Scenario::Forks => "Forks",
            Scenario::NotFound | Scenario::InvalidPayload | Scenario::Unauthorized => "Negative",
        }
    }

    /// One-line description for `list --detailed`
    pub fn description(&self) -> &'static str {
        match self {
            Scenario::CreateAndGet => "Create a private gist and fetch it back by id",
            Scenario::Update => "Change description and file content, then re-fetch",
            Scenario::Delete => "Delete a gist and expect 404 on the next fetch",
            Scenario::StarUnstar => "Star state goes 404 -> 204 -> 404 across star/unstar",
            Scenario::ListPublic => "Public gists endpoint returns a JSON array",
            Scenario::Commits => "One update produces exactly two commits",
            Scenario::Forks => "A fork shows up in the source gist's forks list",
            Scenario::OwnList => "A new gist shows up in the owner's list filtered by since",
            Scenario::NotFound => "Fetching a random id returns 404",
            Scenario::InvalidPayload => "Creating a gist without files returns 422",
            Scenario::Unauthorized => "Starred list without a token returns 401",
        }
    }

    /// Whether the scenario needs an authenticated client
    pub fn requires_token(&self) -> bool {
        !matches!(
            self,
            Scenario::ListPublic | Scenario::NotFound | Scenario::Unauthorized
        )
    }

    pub fn all() -> Vec<Scenario> {
        vec![
            Scenario::CreateAndGet,
            Scenario::Update,
            Scenario::Delete,
            Scenario::StarUnstar,
            Scenario::ListPublic,
            Scenario::Commits,
            Scenario::Forks,
            Scenario::OwnList,
            Scenario::NotFound,
            Scenario::InvalidPayload,
            Scenario::Unauthorized,
        ]
    }

    pub fn from_number(n: u8) -> Option<Scenario> {
        Self::all().into_iter().find(|s| s.number() == n)
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Scenario {}: {}", self.number(), self.name())
    }
}

/// Scenario outcome
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScenarioStatus {
    Pass,
    Fail,
    Skip,
    Error,
}

impl ScenarioStatus {
    pub fn symbol(&self) -> &'static str {
        match self {
            ScenarioStatus::Pass => "✓",
            ScenarioStatus::Fail => "✗",
            ScenarioStatus::Skip => "○",
            ScenarioStatus::Error => "!",
        }
    }

    /// Fail and Error count against the run; Skip does not
    pub fn is_failure(&self) -> bool {
        matches!(self, ScenarioStatus::Fail | ScenarioStatus::Error)
    }
}

impl fmt::Display for ScenarioStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScenarioStatus::Pass => write!(f, "PASS"),
            ScenarioStatus::Fail => write!(f, "FAIL"),
            ScenarioStatus::Skip => write!(f, "SKIP"),
            ScenarioStatus::Error => write!(f, "ERROR"),
        }
    }
}

/// Result of one scenario
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub scenario: Scenario,
    pub status: ScenarioStatus,
    pub duration_ms: u64,
    pub message: Option<String>,
}

impl ScenarioResult {
    pub fn pass(scenario: Scenario, duration_ms: u64) -> Self {
        Self {
            scenario,
            status: ScenarioStatus::Pass,
            duration_ms,
            message: None,
        }
    }

    pub fn fail(scenario: Scenario, duration_ms: u64, message: impl Into<String>) -> Self {
        Self {
            scenario,
            status: ScenarioStatus::Fail,
            duration_ms,
            message: Some(message.into()),
        }
    }

    pub fn error(scenario: Scenario, duration_ms: u64, message: impl Into<String>) -> Self {
        Self {
            scenario,
            status: ScenarioStatus::Error,
            duration_ms,
            message: Some(message.into()),
        }
    }

    pub fn skip(scenario: Scenario, reason: impl Into<String>) -> Self {
        Self {
            scenario,
            status: ScenarioStatus::Skip,
            duration_ms: 0,
            message: Some(reason.into()),
        }
    }
}

impl fmt::Display for ScenarioResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} [{}ms]",
            self.status.symbol(),
            self.scenario,
            self.duration_ms
        )?;
        if let Some(msg) = &self.message {
            // Status mismatch messages span several lines
            let first_line = msg.lines().next().unwrap_or_default();
            write!(f, " - {first_line}")?;
        }
        Ok(())
    }
}

/// Totals for one run against a target
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunSummary {
    pub target: String,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub errors: usize,
    pub total_duration_ms: u64,
    pub results: Vec<ScenarioResult>,
}

impl RunSummary {
    pub fn new(target: impl Into<String>, results: Vec<ScenarioResult>) -> Self {
        let count = |status: ScenarioStatus| results.iter().filter(|r| r.status == status).count();

        Self {
            target: target.into(),
            total: results.len(),
            passed: count(ScenarioStatus::Pass),
            failed: count(ScenarioStatus::Fail),
            skipped: count(ScenarioStatus::Skip),
            errors: count(ScenarioStatus::Error),
            total_duration_ms: results.iter().map(|r| r.duration_ms).sum(),
            results,
        }
    }

    /// Percentage of executed (non-skipped) scenarios that passed
    pub fn pass_rate(&self) -> f64 {
        let executed = self.total - self.skipped;
        if executed == 0 {
            0.0
        } else {
            (self.passed as f64 / executed as f64) * 100.0
        }
    }

    pub fn has_failures(&self) -> bool {
        self.failed + self.errors > 0
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Gists API - {}", self.target)?;
        writeln!(f, "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━")?;
        for result in &self.results {
            writeln!(f, "  {result}")?;
        }
        writeln!(f, "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━")?;
        writeln!(
            f,
            "Total: {} | Pass: {} | Fail: {} | Skip: {} | Error: {}",
            self.total, self.passed, self.failed, self.skipped, self.errors
        )?;
        writeln!(
            f,
            "Pass Rate: {:.1}% | Duration: {}ms",
            self.pass_rate(),
            self.total_duration_ms
        )
    }
}
