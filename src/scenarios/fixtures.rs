//! Ephemeral gists created for a single scenario
//!
//! Fixtures are created right before a scenario body runs and torn down
//! right after, whatever the outcome. Teardown never fails: a gist that is
//! already gone (or a flaky delete) only produces a warning, so cleanup can
//! not mask the scenario's own result.

use anyhow::{Context, Result};
use rand::Rng;
use tracing::{debug, warn};

use crate::api::GistsApi;
use crate::models::{Gist, ListOptions, NewGist};

/// Content written into every temporary gist
pub const TEMP_CONTENT: &str = "Hello from automated tests";

/// Short random hex suffix for unique names
pub fn unique_suffix() -> String {
    format!("{:08x}", rand::rng().random::<u32>())
}

/// A private gist owned by the authenticated user
#[derive(Debug)]
pub struct TempGist {
    pub gist: Gist,
    api: GistsApi,
}

impl TempGist {
    pub async fn create(api: &GistsApi) -> Result<Self> {
        let suffix = unique_suffix();
        let payload = NewGist::new()
            .description(format!("api-test-temp-{suffix}"))
            .public(false)
            .file(format!("test_{suffix}.txt"), TEMP_CONTENT);

        let gist: Gist = api
            .create_gist(&payload, None)
            .await
            .context("Failed to create temporary gist")?
            .json()?;
        anyhow::ensure!(!gist.id.is_empty(), "Expected a valid gist ID");
        debug!("Created temporary gist {}", gist.id);

        Ok(Self {
            gist,
            api: api.clone(),
        })
    }

    pub fn id(&self) -> &str {
        &self.gist.id
    }

    /// Best-effort delete
    pub async fn teardown(self) {
        delete_quietly(&self.api, self.id()).await;
    }
}

/// A fork of somebody's public gist
#[derive(Debug)]
pub struct ForkedGist {
    pub source_id: String,
    pub fork_id: String,
    api: GistsApi,
}

impl ForkedGist {
    /// Fork the first gist of the public timeline
    pub async fn create(api: &GistsApi) -> Result<Self> {
        let public: Vec<Gist> = api
            .list_public_gists(&ListOptions::new(), None)
            .await
            .context("Failed to list public gists")?
            .json()?;
        let source_id = public
            .first()
            .map(|g| g.id.clone())
            .context("Expected at least one public gist to exist")?;

        let fork: Gist = api
            .fork_gist(&source_id, Some(201))
            .await
            .with_context(|| format!("Failed to fork gist {source_id}"))?
            .json()?;
        debug!("Forked gist {} into {}", source_id, fork.id);

        Ok(Self {
            source_id,
            fork_id: fork.id,
            api: api.clone(),
        })
    }

    /// Best-effort delete of the fork
    pub async fn teardown(self) {
        delete_quietly(&self.api, &self.fork_id).await;
    }
}

async fn delete_quietly(api: &GistsApi, gist_id: &str) {
    match api.delete_gist(gist_id, Some(204)).await {
        Ok(_) => debug!("Deleted gist {}", gist_id),
        Err(e) => warn!("Cleanup of gist {} failed: {}", gist_id, e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::HttpClient;
    use mockito::{Matcher, Server};

    #[test]
    fn test_unique_suffix_shape() {
        let a = unique_suffix();
        assert_eq!(a.len(), 8);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[tokio::test]
    async fn test_temp_gist_lifecycle() {
        let mut server = Server::new_async().await;
        let create = server
            .mock("POST", "/gists")
            .match_body(Matcher::Regex(
                r#""description":"api-test-temp-[0-9a-f]{8}""#.to_string(),
            ))
            .with_status(201)
            .with_body(r#"{"id":"tmp1","files":{}}"#)
            .create_async()
            .await;
        let delete = server
            .mock("DELETE", "/gists/tmp1")
            .with_status(204)
            .create_async()
            .await;

        let client = HttpClient::builder(server.url()).retries(0).build().unwrap();
        let api = GistsApi::new(client, "2022-11-28");

        let fixture = TempGist::create(&api).await.unwrap();
        assert_eq!(fixture.id(), "tmp1");
        fixture.teardown().await;

        create.assert_async().await;
        delete.assert_async().await;
    }

    #[tokio::test]
    async fn test_teardown_swallows_failures() {
        let mut server = Server::new_async().await;
        server
            .mock("DELETE", "/gists/gone")
            .with_status(404)
            .create_async()
            .await;

        let client = HttpClient::builder(server.url()).retries(0).build().unwrap();
        let api = GistsApi::new(client, "2022-11-28");

        // Must not panic or error
        delete_quietly(&api, "gone").await;
    }

    #[tokio::test]
    async fn test_forked_gist_requires_public_gists() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/gists/public")
            .with_status(200)
            .with_body("[]")
            .create_async()
            .await;

        let client = HttpClient::builder(server.url()).retries(0).build().unwrap();
        let api = GistsApi::new(client, "2022-11-28");

        let err = ForkedGist::create(&api).await.unwrap_err();
        assert!(err.to_string().contains("at least one public gist"));
    }
}
