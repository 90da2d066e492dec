//! Scenario bodies

use anyhow::{ensure, Context, Result};
use chrono::{Duration as ChronoDuration, Utc};
use futures::FutureExt;
use rand::Rng;
use serde_json::{json, Value};
use std::panic::{self, AssertUnwindSafe};
use std::time::Duration;

use super::fixtures::{ForkedGist, TempGist};
use super::SuiteContext;
use crate::models::{Gist, GistFork, GistUpdate, ListOptions};
use crate::utils::wait::Wait;

const FORK_WAIT: Duration = Duration::from_secs(10);
const OWN_LIST_WAIT: Duration = Duration::from_secs(15);

/// Create a temporary gist, run `check` against it, then delete it.
///
/// Teardown also runs when `check` panics; the panic is re-raised afterwards.
macro_rules! with_temp_gist {
    ($ctx:expr, $check:ident) => {{
        let ctx: &SuiteContext = $ctx;
        let fixture = TempGist::create(ctx.api()).await?;
        let outcome = AssertUnwindSafe($check(ctx, &fixture.gist))
            .catch_unwind()
            .await;
        fixture.teardown().await;
        match outcome {
            Ok(result) => result,
            Err(payload) => panic::resume_unwind(payload),
        }
    }};
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn first_file(gist: &Gist) -> Result<String> {
    gist.first_file_name()
        .map(str::to_string)
        .context("Temporary gist has no files")
}

pub(super) async fn create_and_get(ctx: &SuiteContext) -> Result<()> {
    with_temp_gist!(ctx, check_create_and_get)
}

async fn check_create_and_get(ctx: &SuiteContext, created: &Gist) -> Result<()> {
    ctx.reporter.step("Get created gist");
    let fetched: Gist = ctx.api().get_gist(&created.id, None).await?.json()?;

    ensure!(
        fetched.id == created.id,
        "Gist ID mismatch: expected {}, got {}",
        created.id,
        fetched.id
    );
    ensure!(!fetched.files.is_empty(), "Response JSON should contain files");
    ensure!(
        fetched.description == created.description,
        "Description mismatch: expected {:?}, got {:?}",
        created.description,
        fetched.description
    );
    for name in created.files.keys() {
        ensure!(
            fetched.files.contains_key(name),
            "Fetched gist is missing file '{name}'"
        );
    }
    Ok(())
}

pub(super) async fn update(ctx: &SuiteContext) -> Result<()> {
    with_temp_gist!(ctx, check_update)
}

async fn check_update(ctx: &SuiteContext, gist: &Gist) -> Result<()> {
    let filename = first_file(gist)?;
    let new_desc = format!("updated-{}", Utc::now().timestamp());
    let new_content = "Updated content via automated test";

    ctx.reporter.step("Update gist description and content");
    let payload = GistUpdate::new()
        .description(new_desc.as_str())
        .file(filename.as_str(), new_content);
    let updated: Gist = ctx
        .api()
        .update_gist(&gist.id, &payload, None)
        .await?
        .json()?;
    ensure!(
        updated.description.as_deref() == Some(new_desc.as_str()),
        "Description not updated: expected '{}', got {:?}",
        new_desc,
        updated.description
    );
    ensure!(
        updated.files.contains_key(&filename),
        "Updated files should contain '{}'. Keys: {:?}",
        filename,
        updated.files.keys().collect::<Vec<_>>()
    );

    ctx.reporter.step("Verify updated gist content");
    let persisted: Gist = ctx.api().get_gist(&gist.id, None).await?.json()?;
    ensure!(
        persisted.description.as_deref() == Some(new_desc.as_str()),
        "Persisted description mismatch: expected '{}', got {:?}",
        new_desc,
        persisted.description
    );
    ensure!(
        persisted.file_content(&filename) == Some(new_content),
        "File content not updated: expected '{}', got {:?}",
        new_content,
        persisted.file_content(&filename)
    );
    Ok(())
}

pub(super) async fn delete(ctx: &SuiteContext) -> Result<()> {
    // Teardown deletes a second time; that 404 is only logged
    with_temp_gist!(ctx, check_delete)
}

async fn check_delete(ctx: &SuiteContext, gist: &Gist) -> Result<()> {
    ctx.reporter.step("Delete gist");
    ctx.api().delete_gist(&gist.id, None).await?;

    ctx.reporter.step("Verify 404 on get after delete");
    ctx.api().get_gist(&gist.id, Some(404)).await?;
    Ok(())
}

pub(super) async fn star_unstar(ctx: &SuiteContext) -> Result<()> {
    with_temp_gist!(ctx, check_star_unstar)
}

async fn check_star_unstar(ctx: &SuiteContext, gist: &Gist) -> Result<()> {
    let api = ctx.api();

    ctx.reporter.step("Verify gist is not starred");
    api.check_starred(&gist.id, Some(404)).await?;

    ctx.reporter.step("Star gist");
    api.star(&gist.id, None).await?;

    ctx.reporter.step("Check gist is starred");
    api.check_starred(&gist.id, Some(204)).await?;

    ctx.reporter.step("Unstar gist");
    api.unstar(&gist.id, None).await?;

    ctx.reporter.step("Check gist is not starred");
    api.check_starred(&gist.id, Some(404)).await?;
    Ok(())
}

pub(super) async fn list_public(ctx: &SuiteContext) -> Result<()> {
    ctx.reporter.step("List public gists");
    let data = ctx
        .api()
        .list_public_gists(&ListOptions::new(), None)
        .await?
        .json_value()?;
    ensure!(
        data.is_array(),
        "Expected list of gists, got {}",
        json_type(&data)
    );
    Ok(())
}

pub(super) async fn commits(ctx: &SuiteContext) -> Result<()> {
    with_temp_gist!(ctx, check_commits)
}

async fn check_commits(ctx: &SuiteContext, gist: &Gist) -> Result<()> {
    let filename = first_file(gist)?;

    ctx.reporter
        .step("Perform an update to create a second commit");
    let bump = GistUpdate::new().file(filename, format!("bump-{}", Utc::now().timestamp()));
    ctx.api().update_gist(&gist.id, &bump, None).await?;

    ctx.reporter.step("List gist commits");
    let commits = ctx
        .api()
        .list_gist_commits(&gist.id, &ListOptions::new(), None)
        .await?
        .json_value()?;
    let entries = commits
        .as_array()
        .with_context(|| format!("Expected list of commits, got {}", json_type(&commits)))?;
    ensure!(
        entries.len() == 2,
        "Expected exactly 2 commits after one update, got {}",
        entries.len()
    );
    Ok(())
}

pub(super) async fn forks(ctx: &SuiteContext) -> Result<()> {
    let fixture = ForkedGist::create(ctx.api()).await?;
    let outcome = AssertUnwindSafe(check_fork_listed(ctx, &fixture))
        .catch_unwind()
        .await;
    fixture.teardown().await;
    match outcome {
        Ok(result) => result,
        Err(payload) => panic::resume_unwind(payload),
    }
}

async fn check_fork_listed(ctx: &SuiteContext, fixture: &ForkedGist) -> Result<()> {
    let api = ctx.api();
    let source_id = fixture.source_id.as_str();
    let fork_id = fixture.fork_id.as_str();

    Wait::new(format!("Wait until fork {fork_id} appears in forks list"))
        .timeout(FORK_WAIT)
        .reporter(&ctx.reporter)
        .until(|| async move {
            let forks: Vec<GistFork> = api.list_gist_forks(source_id, None).await?.json()?;
            Ok::<_, anyhow::Error>(forks.iter().any(|f| f.id == fork_id))
        })
        .await?;
    Ok(())
}

pub(super) async fn own_list(ctx: &SuiteContext) -> Result<()> {
    with_temp_gist!(ctx, check_own_list)
}

async fn check_own_list(ctx: &SuiteContext, gist: &Gist) -> Result<()> {
    let api = ctx.api();
    // Slack for clock skew between the service and this machine
    let since = gist.created_at.unwrap_or_else(Utc::now) - ChronoDuration::seconds(60);
    let options = ListOptions::new().since(since);
    let options = &options;
    let gist_id = gist.id.as_str();

    Wait::new(format!("Wait until gist {gist_id} appears in the owner's list"))
        .timeout(OWN_LIST_WAIT)
        .reporter(&ctx.reporter)
        .until(|| async move {
            let mine: Vec<Gist> = api
                .list_gists_for_authenticated_user(options, None)
                .await?
                .json()?;
            Ok::<_, anyhow::Error>(mine.iter().any(|g| g.id == gist_id))
        })
        .await?;
    Ok(())
}

pub(super) async fn not_found(ctx: &SuiteContext) -> Result<()> {
    let non_existent = format!("{:032x}", rand::rng().random::<u128>());

    ctx.reporter
        .step("Request non-existent gist and expect 404");
    ctx.api().get_gist(&non_existent, Some(404)).await?;
    Ok(())
}

pub(super) async fn invalid_payload(ctx: &SuiteContext) -> Result<()> {
    let payload = json!({"description": "invalid payload", "public": false});

    ctx.reporter
        .step("POST invalid payload to create gist and expect 422");
    ctx.api().create_gist(&payload, Some(422)).await?;
    Ok(())
}

pub(super) async fn unauthorized(ctx: &SuiteContext) -> Result<()> {
    ctx.reporter
        .step("Create client without Authorization header");
    let anonymous = ctx.anonymous_api()?;

    ctx.reporter
        .step("GET starred gists should require authentication -> 401");
    anonymous
        .list_starred_gists(&ListOptions::new(), Some(401))
        .await?;
    Ok(())
}
