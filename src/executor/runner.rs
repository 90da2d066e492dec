//! Scenario runner
//!
//! Runs the selected gists scenarios one after another and turns each
//! outcome into a [`ScenarioResult`].

use anyhow::Result;
use futures::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::Instant;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::http::HttpError;
use crate::models::{RunSummary, Scenario, ScenarioResult};
use crate::report::Reporter;
use crate::scenarios::{self, SuiteContext};

/// Sequential runner for the gists scenarios
pub struct ScenarioRunner {
    ctx: SuiteContext,
    skip: Vec<u8>,
}

impl ScenarioRunner {
    /// Create a new runner
    pub fn new(config: &Config, reporter: Reporter) -> Result<Self> {
        Ok(Self {
            ctx: SuiteContext::new(config, reporter)?,
            skip: Vec::new(),
        })
    }

    /// Scenario numbers to skip
    pub fn with_skip(mut self, skip: impl IntoIterator<Item = u8>) -> Self {
        self.skip = skip.into_iter().collect();
        self
    }

    /// Run a single scenario
    pub async fn run_scenario(&self, scenario: Scenario) -> ScenarioResult {
        if self.skip.contains(&scenario.number()) {
            return ScenarioResult::skip(scenario, "Skipped by configuration");
        }
        if scenario.requires_token() && !self.ctx.settings.has_token() {
            return ScenarioResult::skip(scenario, "GITHUB_TOKEN is not set");
        }

        info!("Running {}", scenario);
        let _scope = self.ctx.reporter.enter_scope(scenario.name());
        execute(scenario, scenarios::run_scenario(&self.ctx, scenario)).await
    }

    /// Run every scenario in number order
    pub async fn run_all(&self) -> RunSummary {
        self.run_scenarios(&Scenario::all()).await
    }

    /// Run the given scenarios in order
    pub async fn run_scenarios(&self, selected: &[Scenario]) -> RunSummary {
        info!(
            "Running {} scenario(s) against {}",
            selected.len(),
            self.ctx.settings.base_url
        );

        let start = Instant::now();
        let mut results = Vec::with_capacity(selected.len());

        for &scenario in selected {
            let result = self.run_scenario(scenario).await;
            info!("  {}", result);
            results.push(result);
        }

        let summary = RunSummary::new(self.ctx.settings.base_url.as_str(), results);

        info!(
            "Run completed in {}ms - Pass: {}/{} ({:.1}%)",
            start.elapsed().as_millis(),
            summary.passed,
            summary.total,
            summary.pass_rate()
        );

        summary
    }
}

/// Await a scenario body, timing it and catching panics
async fn execute<F>(scenario: Scenario, body: F) -> ScenarioResult
where
    F: Future<Output = Result<()>>,
{
    let start = Instant::now();
    let outcome = AssertUnwindSafe(body).catch_unwind().await;
    let duration_ms = start.elapsed().as_millis() as u64;

    match outcome {
        Ok(Ok(())) => ScenarioResult::pass(scenario, duration_ms),
        Ok(Err(e)) => classify(scenario, duration_ms, &e),
        Err(panic) => {
            let message = panic_message(panic.as_ref());
            error!("{} panicked: {}", scenario, message);
            ScenarioResult::fail(scenario, duration_ms, format!("panicked: {message}"))
        }
    }
}

/// Transport failures are errors; everything else is a failed check
fn classify(scenario: Scenario, duration_ms: u64, err: &anyhow::Error) -> ScenarioResult {
    let transport = err
        .chain()
        .filter_map(|cause| cause.downcast_ref::<HttpError>())
        .any(HttpError::is_transport);

    let message = format!("{err:#}");
    if transport {
        error!("{} errored: {}", scenario, message);
        ScenarioResult::error(scenario, duration_ms, message)
    } else {
        warn!("{} failed: {}", scenario, message);
        ScenarioResult::fail(scenario, duration_ms, message)
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ClientConfig, Settings};
    use crate::models::ScenarioStatus;
    use crate::report::MemorySink;
    use mockito::Server;
    use std::sync::Arc;

    fn config(base_url: String, token: Option<&str>) -> Config {
        Config {
            settings: Settings {
                base_url,
                token: token.map(str::to_string),
                ..Settings::default()
            },
            client: ClientConfig {
                retries: 0,
                ..ClientConfig::default()
            },
            source: None,
        }
    }

    async fn panicking_body() -> Result<()> {
        panic!("boom")
    }

    #[tokio::test]
    async fn test_execute_classifies_outcomes() {
        let ok = execute(Scenario::NotFound, async { Ok(()) }).await;
        assert_eq!(ok.status, ScenarioStatus::Pass);

        let failed = execute(Scenario::NotFound, async { anyhow::bail!("ID mismatch") }).await;
        assert_eq!(failed.status, ScenarioStatus::Fail);
        assert_eq!(failed.message.as_deref(), Some("ID mismatch"));

        let panicked = execute(Scenario::NotFound, panicking_body()).await;
        assert_eq!(panicked.status, ScenarioStatus::Fail);
        assert!(panicked.message.unwrap().contains("boom"));
    }

    #[tokio::test]
    async fn test_transport_failure_is_error() {
        // Nothing listens on port 1
        let runner =
            ScenarioRunner::new(&config("http://127.0.0.1:1".to_string(), None), Reporter::tracing())
                .unwrap();

        let result = runner.run_scenario(Scenario::ListPublic).await;
        assert_eq!(result.status, ScenarioStatus::Error);
    }

    #[tokio::test]
    async fn test_status_mismatch_is_failure() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/gists/starred")
            .with_status(200)
            .with_body("[]")
            .create_async()
            .await;

        let runner = ScenarioRunner::new(&config(server.url(), None), Reporter::tracing()).unwrap();
        let result = runner.run_scenario(Scenario::Unauthorized).await;

        assert_eq!(result.status, ScenarioStatus::Fail);
        assert!(result.message.unwrap().contains("401"));
    }

    #[tokio::test]
    async fn test_skips_without_token_and_by_number() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/gists/public")
            .with_status(200)
            .with_body("[]")
            .create_async()
            .await;

        let sink = Arc::new(MemorySink::new());
        let runner = ScenarioRunner::new(&config(server.url(), None), Reporter::from_arc(sink.clone()))
            .unwrap()
            .with_skip([9]);

        let summary = runner
            .run_scenarios(&[Scenario::CreateAndGet, Scenario::ListPublic, Scenario::NotFound])
            .await;

        assert_eq!(summary.total, 3);
        assert_eq!(summary.passed, 1);
        assert_eq!(summary.skipped, 2);
        assert!(!summary.has_failures());
        assert_eq!(
            summary.results[0].message.as_deref(),
            Some("GITHUB_TOKEN is not set")
        );
        assert!(sink.steps().contains(&"List public gists".to_string()));
    }

    #[tokio::test]
    async fn test_scope_is_restored_after_scenario() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/gists/public")
            .with_status(200)
            .with_body("[]")
            .create_async()
            .await;

        let runner = ScenarioRunner::new(&config(server.url(), None), Reporter::tracing()).unwrap();
        runner.run_scenario(Scenario::ListPublic).await;
        assert_eq!(runner.ctx.reporter.scope(), None);
    }
}
