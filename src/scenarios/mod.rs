//! Gists API scenarios
//!
//! Each scenario drives the resource API layer against the live service and
//! fails with a descriptive error on the first broken expectation.
//!
//! ## Categories
//!
//! - CRUD (1-3): create/get, update, delete
//! - Stars (4)
//! - Listing and history (5-8): public list, commits, forks, own list
//! - Negative paths (9-11): 404, 422, 401

mod fixtures;
mod gists;

use anyhow::{Context, Result};

use crate::api::GistsApi;
use crate::config::{ClientConfig, Config, Settings};
use crate::http::HttpClient;
use crate::models::Scenario;
use crate::report::Reporter;

/// Shared state for one suite run
#[derive(Clone, Debug)]
pub struct SuiteContext {
    pub settings: Settings,
    pub client_config: ClientConfig,
    pub reporter: Reporter,
    api: GistsApi,
}

impl SuiteContext {
    /// Build the authenticated API client for a run
    pub fn new(config: &Config, reporter: Reporter) -> Result<Self> {
        let client = build_client(
            &config.settings,
            &config.client,
            &reporter,
            config.settings.token.as_deref(),
        )?;

        Ok(Self {
            settings: config.settings.clone(),
            client_config: config.client.clone(),
            api: GistsApi::new(client, config.settings.api_version.clone()),
            reporter,
        })
    }

    pub fn api(&self) -> &GistsApi {
        &self.api
    }

    /// A separate client with the same tuning but no credentials
    pub fn anonymous_api(&self) -> Result<GistsApi> {
        let client = build_client(&self.settings, &self.client_config, &self.reporter, None)?;
        Ok(GistsApi::new(client, self.settings.api_version.clone()))
    }
}

fn build_client(
    settings: &Settings,
    tuning: &ClientConfig,
    reporter: &Reporter,
    token: Option<&str>,
) -> Result<HttpClient> {
    let mut builder = HttpClient::builder(settings.base_url.as_str())
        .timeout(tuning.timeout)
        .retries(tuning.retries)
        .backoff_factor(tuning.backoff_factor)
        .tls(tuning.tls())
        .reporter(reporter.clone());
    if let Some(token) = token {
        builder = builder.bearer_token(token);
    }
    builder
        .build()
        .with_context(|| format!("Failed to create client for {}", settings.base_url))
}

/// Run one scenario body
pub async fn run_scenario(ctx: &SuiteContext, scenario: Scenario) -> Result<()> {
    match scenario {
        Scenario::CreateAndGet => gists::create_and_get(ctx).await,
        Scenario::Update => gists::update(ctx).await,
        Scenario::Delete => gists::delete(ctx).await,
        Scenario::StarUnstar => gists::star_unstar(ctx).await,
        Scenario::ListPublic => gists::list_public(ctx).await,
        Scenario::Commits => gists::commits(ctx).await,
        Scenario::Forks => gists::forks(ctx).await,
        Scenario::OwnList => gists::own_list(ctx).await,
        Scenario::NotFound => gists::not_found(ctx).await,
        Scenario::InvalidPayload => gists::invalid_payload(ctx).await,
        Scenario::Unauthorized => gists::unauthorized(ctx).await,
    }
}
