//! Gists resource endpoints
//!
//! One method per operation. Each fixes the verb, the path template, the
//! GitHub media type headers and the documented success status; passing
//! `Some(code)` as `expected` asserts a different status instead.

#![allow(dead_code)]

use reqwest::{Method, Url};
use serde::Serialize;
use tracing::debug;

use crate::http::{HttpClient, HttpError, HttpResponse, RequestOptions};
use crate::models::ListOptions;

/// Media type GitHub recommends for REST calls
pub const GITHUB_MEDIA_TYPE: &str = "application/vnd.github+json";

/// Default `X-GitHub-Api-Version`
pub const DEFAULT_API_VERSION: &str = "2022-11-28";

/// Typed access to `/gists`
#[derive(Clone, Debug)]
pub struct GistsApi {
    client: HttpClient,
    api_version: String,
}

impl GistsApi {
    pub fn new(client: HttpClient, api_version: impl Into<String>) -> Self {
        Self {
            client,
            api_version: api_version.into(),
        }
    }

    /// `POST /gists`
    pub async fn create_gist<P: Serialize + ?Sized>(
        &self,
        payload: &P,
        expected: Option<u16>,
    ) -> Result<HttpResponse, HttpError> {
        let options = self.json_options(payload)?;
        self.call(Method::POST, "/gists".to_string(), options, expected, 201)
            .await
    }

    /// `GET /gists/{id}`
    pub async fn get_gist(
        &self,
        gist_id: &str,
        expected: Option<u16>,
    ) -> Result<HttpResponse, HttpError> {
        let path = resource_path(&["gists", gist_id])?;
        self.call(Method::GET, path, self.options(), expected, 200)
            .await
    }

    /// `GET /gists/{id}/{sha}`
    pub async fn get_gist_revision(
        &self,
        gist_id: &str,
        sha: &str,
        expected: Option<u16>,
    ) -> Result<HttpResponse, HttpError> {
        let path = resource_path(&["gists", gist_id, sha])?;
        self.call(Method::GET, path, self.options(), expected, 200)
            .await
    }

    /// `PATCH /gists/{id}`
    pub async fn update_gist<P: Serialize + ?Sized>(
        &self,
        gist_id: &str,
        payload: &P,
        expected: Option<u16>,
    ) -> Result<HttpResponse, HttpError> {
        let path = resource_path(&["gists", gist_id])?;
        let options = self.json_options(payload)?;
        self.call(Method::PATCH, path, options, expected, 200).await
    }

    /// `DELETE /gists/{id}`
    pub async fn delete_gist(
        &self,
        gist_id: &str,
        expected: Option<u16>,
    ) -> Result<HttpResponse, HttpError> {
        let path = resource_path(&["gists", gist_id])?;
        self.call(Method::DELETE, path, self.options(), expected, 204)
            .await
    }

    /// `GET /gists`
    pub async fn list_gists_for_authenticated_user(
        &self,
        list: &ListOptions,
        expected: Option<u16>,
    ) -> Result<HttpResponse, HttpError> {
        let options = self.list_options(list);
        self.call(Method::GET, "/gists".to_string(), options, expected, 200)
            .await
    }

    /// `GET /gists/public`
    pub async fn list_public_gists(
        &self,
        list: &ListOptions,
        expected: Option<u16>,
    ) -> Result<HttpResponse, HttpError> {
        let options = self.list_options(list);
        self.call(Method::GET, "/gists/public".to_string(), options, expected, 200)
            .await
    }

    /// `GET /gists/starred`
    pub async fn list_starred_gists(
        &self,
        list: &ListOptions,
        expected: Option<u16>,
    ) -> Result<HttpResponse, HttpError> {
        let options = self.list_options(list);
        self.call(Method::GET, "/gists/starred".to_string(), options, expected, 200)
            .await
    }

    /// `GET /users/{user}/gists`
    pub async fn list_gists_for_user(
        &self,
        username: &str,
        list: &ListOptions,
        expected: Option<u16>,
    ) -> Result<HttpResponse, HttpError> {
        let path = resource_path(&["users", username, "gists"])?;
        let options = self.list_options(list);
        self.call(Method::GET, path, options, expected, 200).await
    }

    /// `POST /gists/{id}/forks`
    pub async fn fork_gist(
        &self,
        gist_id: &str,
        expected: Option<u16>,
    ) -> Result<HttpResponse, HttpError> {
        let path = resource_path(&["gists", gist_id, "forks"])?;
        self.call(Method::POST, path, self.options(), expected, 201)
            .await
    }

    /// `GET /gists/{id}/forks`
    pub async fn list_gist_forks(
        &self,
        gist_id: &str,
        expected: Option<u16>,
    ) -> Result<HttpResponse, HttpError> {
        let path = resource_path(&["gists", gist_id, "forks"])?;
        self.call(Method::GET, path, self.options(), expected, 200)
            .await
    }

    /// `GET /gists/{id}/star`: 204 when starred, 404 when not
    pub async fn check_starred(
        &self,
        gist_id: &str,
        expected: Option<u16>,
    ) -> Result<HttpResponse, HttpError> {
        let path = star_path(gist_id)?;
        self.call(Method::GET, path, self.options(), expected, 204)
            .await
    }

    /// Star state as a boolean
    pub async fn is_starred(&self, gist_id: &str) -> Result<bool, HttpError> {
        let resp = self
            .client
            .get(&star_path(gist_id)?, self.options())
            .await?;

        match resp.status_code() {
            204 => Ok(true),
            404 => Ok(false),
            status => Err(HttpError::UnexpectedStatus {
                method: Method::GET,
                url: resp.url.to_string(),
                status,
                expected: 204,
                body: resp.safe_body(),
            }),
        }
    }

    /// `PUT /gists/{id}/star`
    pub async fn star(
        &self,
        gist_id: &str,
        expected: Option<u16>,
    ) -> Result<HttpResponse, HttpError> {
        // GitHub wants an explicit zero Content-Length here
        let options = self.options().body(Vec::new());
        self.call(Method::PUT, star_path(gist_id)?, options, expected, 204)
            .await
    }

    /// `DELETE /gists/{id}/star`
    pub async fn unstar(
        &self,
        gist_id: &str,
        expected: Option<u16>,
    ) -> Result<HttpResponse, HttpError> {
        self.call(Method::DELETE, star_path(gist_id)?, self.options(), expected, 204)
            .await
    }

    /// `GET /gists/{id}/commits`
    pub async fn list_gist_commits(
        &self,
        gist_id: &str,
        list: &ListOptions,
        expected: Option<u16>,
    ) -> Result<HttpResponse, HttpError> {
        let path = resource_path(&["gists", gist_id, "commits"])?;
        let options = self.list_options(list);
        self.call(Method::GET, path, options, expected, 200).await
    }

    async fn call(
        &self,
        method: Method,
        path: String,
        options: RequestOptions,
        expected: Option<u16>,
        default_status: u16,
    ) -> Result<HttpResponse, HttpError> {
        let expected = expected.unwrap_or(default_status);
        debug!("{} {} (expecting {})", method, path, expected);
        self.client
            .request(method, &path, options.expect_status(expected))
            .await
    }

    fn options(&self) -> RequestOptions {
        RequestOptions::new()
            .header("Accept", GITHUB_MEDIA_TYPE)
            .header("X-GitHub-Api-Version", self.api_version.as_str())
    }

    fn list_options(&self, list: &ListOptions) -> RequestOptions {
        list.to_query()
            .into_iter()
            .fold(self.options(), |options, (key, value)| options.param(key, value))
    }

    fn json_options<P: Serialize + ?Sized>(&self, payload: &P) -> Result<RequestOptions, HttpError> {
        let body = serde_json::to_value(payload).map_err(|e| HttpError::Encode(e.to_string()))?;
        Ok(self.options().json(body))
    }
}

/// Only used to borrow the URL parser's path-segment encoding
const SEGMENT_BASE: &str = "http://localhost/";

fn star_path(gist_id: &str) -> Result<String, HttpError> {
    resource_path(&["gists", gist_id, "star"])
}

/// Absolute path with every segment percent-encoded, so an id can never
/// add segments of its own
fn resource_path(segments: &[&str]) -> Result<String, HttpError> {
    let invalid = |message: String| HttpError::InvalidUrl {
        url: segments.join("/"),
        message,
    };
    let mut url = Url::parse(SEGMENT_BASE).map_err(|e| invalid(e.to_string()))?;
    url.path_segments_mut()
        .map_err(|()| invalid("URL cannot be a base".to_string()))?
        .clear()
        .extend(segments);
    Ok(url.path().to_string())
}
