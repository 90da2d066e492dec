//! HTTP client for API testing
//!
//! Wraps a `reqwest` client with a base URL, default headers and cookies,
//! transport-level retries, status assertions and a diagnostic trail for
//! every completed call.

#![allow(dead_code)]

use anyhow::{Context, Result};
use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, COOKIE},
    multipart, redirect, Certificate, Client, Method,
};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, warn};

use super::cookies::CookieStore;
use super::request::{RequestBody, RequestOptions};
use super::response::{HttpResponse, RequestRecord};
use super::retry::RetryPolicy;
use crate::report::Reporter;

/// Redirect hops followed when redirects are allowed
const MAX_REDIRECTS: usize = 30;

/// HTTP client errors
#[derive(Error, Debug)]
pub enum HttpError {
    #[error("Invalid URL {url}: {message}")]
    InvalidUrl { url: String, message: String },

    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("{method} {url} timed out after {attempts} attempt(s)")]
    Timeout {
        method: Method,
        url: String,
        attempts: u32,
        #[source]
        source: reqwest::Error,
    },

    #[error("Connection refused to {url} after {attempts} attempt(s)")]
    ConnectionRefused {
        url: String,
        attempts: u32,
        #[source]
        source: reqwest::Error,
    },

    #[error("{method} {url} failed after {attempts} attempt(s): {source}")]
    RequestFailed {
        method: Method,
        url: String,
        attempts: u32,
        #[source]
        source: reqwest::Error,
    },

    #[error("Unexpected status {status}, expected {expected}.\nURL: {method} {url}\nBody: {body}")]
    UnexpectedStatus {
        method: Method,
        url: String,
        status: u16,
        expected: u16,
        body: String,
    },

    #[error("Failed to decode response body from {url}: {message}")]
    Decode { url: String, message: String },

    #[error("Failed to encode request body: {0}")]
    Encode(String),
}

impl HttpError {
    /// True for network-level failures (as opposed to assertion failures)
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            HttpError::Timeout { .. }
                | HttpError::ConnectionRefused { .. }
                | HttpError::RequestFailed { .. }
        )
    }

    /// Actual status of an `UnexpectedStatus` error
    pub fn status(&self) -> Option<u16> {
        match self {
            HttpError::UnexpectedStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    fn transport(method: &Method, url: &str, attempts: u32, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            HttpError::Timeout {
                method: method.clone(),
                url: url.to_string(),
                attempts,
                source,
            }
        } else if source.is_connect() {
            HttpError::ConnectionRefused {
                url: url.to_string(),
                attempts,
                source,
            }
        } else {
            HttpError::RequestFailed {
                method: method.clone(),
                url: url.to_string(),
                attempts,
                source,
            }
        }
    }
}

/// Whether a transport error is worth another attempt
fn is_retryable_error(err: &reqwest::Error) -> bool {
    err.is_connect() || err.is_timeout() || err.is_request()
}

/// TLS certificate verification mode
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum TlsVerification {
    #[default]
    Enabled,
    Disabled,
    /// Trust an additional PEM bundle on top of the built-in roots
    CaBundle(PathBuf),
}

/// Builder for [`HttpClient`]
#[derive(Clone, Debug)]
pub struct HttpClientBuilder {
    base_url: String,
    default_headers: Vec<(String, String)>,
    default_cookies: BTreeMap<String, String>,
    tls: TlsVerification,
    timeout: Option<Duration>,
    retry: RetryPolicy,
    reporter: Option<Reporter>,
    user_agent: String,
}

impl HttpClientBuilder {
    fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            default_headers: Vec::new(),
            default_cookies: BTreeMap::new(),
            tls: TlsVerification::Enabled,
            timeout: Some(Duration::from_secs(30)),
            retry: RetryPolicy::default(),
            reporter: None,
            user_agent: format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")),
        }
    }

    /// Add a header sent with every request
    pub fn default_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.push((key.into(), value.into()));
        self
    }

    /// Send `Authorization: Bearer <token>` with every request
    pub fn bearer_token(self, token: impl AsRef<str>) -> Self {
        let value = format!("Bearer {}", token.as_ref());
        self.default_header(AUTHORIZATION.as_str(), value)
    }

    /// Seed the session cookie store
    pub fn default_cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_cookies.insert(name.into(), value.into());
        self
    }

    pub fn tls(mut self, tls: TlsVerification) -> Self {
        self.tls = tls;
        self
    }

    /// Default per-request timeout; `None` waits indefinitely
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn retries(mut self, total: u32) -> Self {
        self.retry.total = total;
        self
    }

    pub fn backoff_factor(mut self, factor: f64) -> Self {
        self.retry.backoff_factor = factor;
        self
    }

    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry = policy;
        self
    }

    pub fn reporter(mut self, reporter: Reporter) -> Self {
        self.reporter = Some(reporter);
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn build(self) -> Result<HttpClient> {
        let mut default_headers = HeaderMap::new();
        for (key, value) in &self.default_headers {
            let (name, value) = parse_header(key, value)?;
            default_headers.insert(name, value);
        }

        let client = self.transport(redirect::Policy::limited(MAX_REDIRECTS))?;
        let no_redirect_client = self.transport(redirect::Policy::none())?;

        Ok(HttpClient {
            client,
            no_redirect_client,
            base_url: self.base_url.trim_end_matches('/').to_string(),
            default_headers,
            cookies: Arc::new(Mutex::new(CookieStore::from_pairs(self.default_cookies))),
            default_timeout: self.timeout,
            retry: self.retry,
            reporter: self.reporter.unwrap_or_default(),
        })
    }

    fn transport(&self, policy: redirect::Policy) -> Result<Client> {
        let mut builder = Client::builder()
            .user_agent(self.user_agent.as_str())
            .redirect(policy);

        match &self.tls {
            TlsVerification::Enabled => {}
            TlsVerification::Disabled => {
                builder = builder.danger_accept_invalid_certs(true);
            }
            TlsVerification::CaBundle(path) => {
                for cert in load_ca_bundle(path)? {
                    builder = builder.add_root_certificate(cert);
                }
            }
        }

        builder.build().context("Failed to create HTTP client")
    }
}

/// Every certificate of a PEM bundle
fn load_ca_bundle(path: &Path) -> Result<Vec<Certificate>> {
    let pem = std::fs::read(path)
        .with_context(|| format!("Failed to read CA bundle: {}", path.display()))?;
    let certs = Certificate::from_pem_bundle(&pem)
        .with_context(|| format!("Invalid CA bundle: {}", path.display()))?;
    if certs.is_empty() {
        anyhow::bail!("CA bundle contains no certificates: {}", path.display());
    }
    debug!("Loaded {} CA certificate(s) from {}", certs.len(), path.display());
    Ok(certs)
}

/// HTTP client with retries, status assertions and diagnostics
///
/// Clones share the connection pool and the session cookie store.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    no_redirect_client: Client,
    base_url: String,
    default_headers: HeaderMap,
    cookies: Arc<Mutex<CookieStore>>,
    default_timeout: Option<Duration>,
    retry: RetryPolicy,
    reporter: Reporter,
}

impl HttpClient {
    /// Start building a client for `base_url`
    pub fn builder(base_url: impl Into<String>) -> HttpClientBuilder {
        HttpClientBuilder::new(base_url)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    pub fn reporter(&self) -> &Reporter {
        &self.reporter
    }

    /// Current value of a session cookie
    pub fn cookie(&self, name: &str) -> Option<String> {
        self.lock_cookies().get(name).map(str::to_string)
    }

    /// Build full URL; absolute URLs are used unchanged
    pub fn build_url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            format!("{}{}", self.base_url, path)
        }
    }

    /// Send a request
    ///
    /// Retryable failures are re-sent according to the retry policy. When
    /// retries run out on a retryable status the last response is returned
    /// (or asserted against `expected_status`), never turned into a
    /// transport error.
    pub async fn request(
        &self,
        method: Method,
        url: &str,
        options: RequestOptions,
    ) -> Result<HttpResponse, HttpError> {
        let full_url = self.build_url(url);
        let has_cookie_overrides = !options.cookies.is_empty();

        // Overrides only ever live in this request-local copy
        let cookie_header = self.lock_cookies().layered(&options.cookies).header_value();

        let timeout = options.timeout.or(self.default_timeout);
        let transport = if options.allow_redirects {
            &self.client
        } else {
            &self.no_redirect_client
        };

        let mut retries = 0u32;
        let start = Instant::now();

        let (record, response) = loop {
            let request = self.build_request(
                transport,
                &method,
                &full_url,
                &options,
                cookie_header.as_deref(),
                timeout,
            )?;
            let record = RequestRecord::capture(&request);
            debug!("Sending {} request to {}", method, record.url);

            match transport.execute(request).await {
                Ok(resp) => {
                    let status = resp.status().as_u16();
                    if retries < self.retry.total && self.retry.should_retry_status(&method, status)
                    {
                        let delay = self.retry.delay_for_response(retries, status, resp.headers());
                        warn!(
                            "{} {} returned {}, retrying in {}ms ({}/{})",
                            method,
                            full_url,
                            status,
                            delay.as_millis(),
                            retries + 1,
                            self.retry.total
                        );
                        drop(resp);
                        retries += 1;
                        sleep(delay).await;
                        continue;
                    }
                    break (record, resp);
                }
                Err(err) => {
                    if retries < self.retry.total
                        && self.retry.allows_method(&method)
                        && is_retryable_error(&err)
                    {
                        let delay = self.retry.backoff(retries);
                        warn!(
                            "{} {} failed ({}), retrying in {}ms ({}/{})",
                            method,
                            full_url,
                            err,
                            delay.as_millis(),
                            retries + 1,
                            self.retry.total
                        );
                        retries += 1;
                        sleep(delay).await;
                        continue;
                    }
                    return Err(HttpError::transport(&method, &full_url, retries + 1, err));
                }
            }
        };

        let attempts = retries + 1;
        let status = response.status();
        let headers = response.headers().clone();
        let final_url = response.url().clone();
        let body = response
            .bytes()
            .await
            .map_err(|e| HttpError::transport(&method, &full_url, attempts, e))?
            .to_vec();

        let response = HttpResponse {
            method: method.clone(),
            url: final_url,
            status,
            headers,
            body,
            elapsed: start.elapsed(),
            attempts,
        };

        debug!(
            "Response: {} {} in {}ms ({} attempt(s))",
            response.status_code(),
            response.reason(),
            response.elapsed.as_millis(),
            attempts
        );

        // Server-set cookies are dropped along with the overrides
        if !has_cookie_overrides {
            self.lock_cookies().absorb_set_cookie(&response.headers);
        }

        self.attach_diagnostics(&record, &response);

        if let Some(expected) = options.expected_status {
            if response.status_code() != expected {
                return Err(HttpError::UnexpectedStatus {
                    method,
                    url: full_url,
                    status: response.status_code(),
                    expected,
                    body: response.safe_body(),
                });
            }
        }

        Ok(response)
    }

    /// GET request
    pub async fn get(&self, url: &str, options: RequestOptions) -> Result<HttpResponse, HttpError> {
        self.request(Method::GET, url, options).await
    }

    /// POST request
    pub async fn post(&self, url: &str, options: RequestOptions) -> Result<HttpResponse, HttpError> {
        self.request(Method::POST, url, options).await
    }

    /// PUT request
    pub async fn put(&self, url: &str, options: RequestOptions) -> Result<HttpResponse, HttpError> {
        self.request(Method::PUT, url, options).await
    }

    /// PATCH request
    pub async fn patch(
        &self,
        url: &str,
        options: RequestOptions,
    ) -> Result<HttpResponse, HttpError> {
        self.request(Method::PATCH, url, options).await
    }

    /// DELETE request
    pub async fn delete(
        &self,
        url: &str,
        options: RequestOptions,
    ) -> Result<HttpResponse, HttpError> {
        self.request(Method::DELETE, url, options).await
    }

    fn build_request(
        &self,
        transport: &Client,
        method: &Method,
        url: &str,
        options: &RequestOptions,
        cookie_header: Option<&str>,
        timeout: Option<Duration>,
    ) -> Result<reqwest::Request, HttpError> {
        let mut headers = self.default_headers.clone();
        for (key, value) in &options.headers {
            let (name, value) = parse_header(key, value)
                .map_err(|e| HttpError::InvalidHeader(format!("{e:#}")))?;
            headers.insert(name, value);
        }
        if let Some(cookies) = cookie_header {
            let value = HeaderValue::from_str(cookies)
                .map_err(|e| HttpError::InvalidHeader(format!("cookie: {e}")))?;
            headers.insert(COOKIE, value);
        }

        let mut builder = transport.request(method.clone(), url).headers(headers);

        if !options.params.is_empty() {
            builder = builder.query(&options.params);
        }

        if options.files.is_empty() {
            builder = match &options.body {
                RequestBody::Empty => builder,
                RequestBody::Json(value) => builder.json(value),
                RequestBody::Raw(bytes) => builder.body(bytes.clone()),
                RequestBody::Form(fields) => builder.form(fields),
            };
        } else {
            let mut form = multipart::Form::new();
            match &options.body {
                RequestBody::Empty => {}
                RequestBody::Form(fields) => {
                    for (key, value) in fields {
                        form = form.text(key.clone(), value.clone());
                    }
                }
                RequestBody::Json(_) | RequestBody::Raw(_) => {
                    return Err(HttpError::InvalidRequest(
                        "file attachments can only be combined with form fields".to_string(),
                    ));
                }
            }
            for file in &options.files {
                let mut part =
                    multipart::Part::bytes(file.content.clone()).file_name(file.file_name.clone());
                if let Some(mime) = &file.mime {
                    part = part
                        .mime_str(mime)
                        .map_err(|e| HttpError::InvalidRequest(format!("mime '{mime}': {e}")))?;
                }
                form = form.part(file.field.clone(), part);
            }
            builder = builder.multipart(form);
        }

        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        builder.build().map_err(|e| HttpError::InvalidUrl {
            url: url.to_string(),
            message: e.to_string(),
        })
    }

    fn attach_diagnostics(&self, record: &RequestRecord, response: &HttpResponse) {
        self.reporter.attach_text(record.title(), record.to_string());
        self.reporter.attach_text(
            format!("Response {}", response.status_code()),
            response.describe(),
        );
    }

    fn lock_cookies(&self) -> MutexGuard<'_, CookieStore> {
        self.cookies
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("base_url", &self.base_url)
            .field("default_timeout", &self.default_timeout)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

fn parse_header(key: &str, value: &str) -> Result<(HeaderName, HeaderValue)> {
    let name = HeaderName::from_bytes(key.as_bytes())
        .with_context(|| format!("Invalid header name: {key}"))?;
    let value =
        HeaderValue::from_str(value).with_context(|| format!("Invalid value for header {key}"))?;
    Ok((name, value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::request::FileAttachment;
    use crate::report::MemorySink;
    use mockito::{Matcher, Server, ServerGuard};
    use serde_json::json;

    fn client_for(server: &ServerGuard) -> HttpClient {
        HttpClient::builder(server.url())
            .retries(3)
            .backoff_factor(0.0)
            .build()
            .unwrap()
    }

    #[test]
    fn test_build_url() {
        let client = HttpClient::builder("https://api.github.com/").build().unwrap();
        assert_eq!(client.base_url(), "https://api.github.com");
        assert_eq!(client.build_url("/gists"), "https://api.github.com/gists");
        assert_eq!(
            client.build_url("http://other.example.com/x"),
            "http://other.example.com/x"
        );
    }

    const TWO_CA_BUNDLE: &str = "\
-----BEGIN CERTIFICATE-----
MIIBizCCATGgAwIBAgIUaMExvj9RFhRB/83xM5J+PgHkj6cwCgYIKoZIzj0EAwIw
GjEYMBYGA1UEAwwPZ2lzdC10ZXN0cy1jYS0xMCAXDTI2MTAxNzAwMTk0NloYDzIx
MjYwOTIzMDAxOTQ2WjAaMRgwFgYDVQQDDA9naXN0LXRlc3RzLWNhLTEwWTATBgcq
hkjOPQIBBggqhkjOPQMBBwNCAARJEsI1AWoqnbxJeCgd/Z0b9K/iBEtYjVT1ft2q
2ryPKAGg1CHNZ+kzhwLMHhiGCtiwON9niZirml0+nNDonDPbo1MwUTAdBgNVHQ4E
FgQUJPbCF5H9CUM7OWFCf5wF3Mde/6gwHwYDVR0jBBgwFoAUJPbCF5H9CUM7OWFC
f5wF3Mde/6gwDwYDVR0TAQH/BAUwAwEB/zAKBggqhkjOPQQDAgNIADBFAiA7/k2q
1dxy8qmD4jrujwnOFsEdX17rhGLvYyMCOV1eHQIhAOWTB9M1SB0PHzJApPSFPTMo
ykiEF4BaJSJByc4rp5m7
-----END CERTIFICATE-----
-----BEGIN CERTIFICATE-----
MIIBijCCATGgAwIBAgIUBey8oSouAd+rycYfZaeuXzuI0kMwCgYIKoZIzj0EAwIw
GjEYMBYGA1UEAwwPZ2lzdC10ZXN0cy1jYS0yMCAXDTI2MTAxNzAwMTk0NloYDzIx
MjYwOTIzMDAxOTQ2WjAaMRgwFgYDVQQDDA9naXN0LXRlc3RzLWNhLTIwWTATBgcq
hkjOPQIBBggqhkjOPQMBBwNCAATLhwOOcTxql7xWOfb1mjHBSSsLqRJv89D+cHHy
diBcsNCgs3KBuaV04kZmeKr45kYQlOwoo+vzORzyn8QtLZIso1MwUTAdBgNVHQ4E
FgQUehEI101jT7mTuzBMn/T3jRoB0lowHwYDVR0jBBgwFoAUehEI101jT7mTuzBM
n/T3jRoB0lowDwYDVR0TAQH/BAUwAwEB/zAKBggqhkjOPQQDAgNHADBEAiBVyVYz
1W6DJ3KUhmsCe/ddWiVxomPMNB27OXcyk6edBgIgZUusp5WJPzhSWpPFzg9rrMb9
m23lER9AIzrd+e8Oab8=
-----END CERTIFICATE-----
";

    #[test]
    fn test_ca_bundle_loads_every_certificate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bundle.pem");
        std::fs::write(&path, TWO_CA_BUNDLE).unwrap();

        assert_eq!(load_ca_bundle(&path).unwrap().len(), 2);

        let client = HttpClient::builder("https://api.github.com")
            .tls(TlsVerification::CaBundle(path))
            .build();
        assert!(client.is_ok());
    }

    #[test]
    fn test_ca_bundle_without_certificates_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.pem");
        std::fs::write(&path, "").unwrap();

        let err = load_ca_bundle(&path).unwrap_err();
        assert!(err.to_string().contains("no certificates"));
    }

    #[test]
    fn test_invalid_default_header() {
        let result = HttpClient::builder("https://api.github.com")
            .default_header("bad header", "x")
            .build();
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_expected_status_passes() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/gists/abc")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"id":"abc"}"#)
            .create_async()
            .await;

        let client = client_for(&server);
        let resp = client
            .get("/gists/abc", RequestOptions::new().expect_status(200))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(resp.status_code(), 200);
        assert_eq!(resp.attempts, 1);
        assert_eq!(resp.json_value().unwrap()["id"], "abc");
    }

    #[tokio::test]
    async fn test_unexpected_status_reports_both_values() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/gists/missing")
            .with_status(404)
            .with_body(r#"{"message":"Not Found"}"#)
            .create_async()
            .await;

        let client = client_for(&server);
        let err = client
            .get("/gists/missing", RequestOptions::new().expect_status(200))
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(404));
        assert!(!err.is_transport());
        let message = err.to_string();
        assert!(message.contains("Unexpected status 404, expected 200"));
        assert!(message.contains("/gists/missing"));
        assert!(message.contains("\"message\": \"Not Found\""));
    }

    #[tokio::test]
    async fn test_no_assertion_without_expected_status() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/teapot")
            .with_status(418)
            .create_async()
            .await;

        let resp = client_for(&server)
            .get("/teapot", RequestOptions::new())
            .await
            .unwrap();
        assert_eq!(resp.status_code(), 418);
    }

    #[tokio::test]
    async fn test_retries_until_success() {
        let mut server = Server::new_async().await;
        let failing = server
            .mock("GET", "/flaky")
            .with_status(503)
            .expect(2)
            .create_async()
            .await;
        let ok = server
            .mock("GET", "/flaky")
            .with_status(200)
            .expect(1)
            .create_async()
            .await;

        let resp = client_for(&server)
            .get("/flaky", RequestOptions::new().expect_status(200))
            .await
            .unwrap();

        failing.assert_async().await;
        ok.assert_async().await;
        assert_eq!(resp.attempts, 3);
    }

    #[tokio::test]
    async fn test_post_is_retried() {
        let mut server = Server::new_async().await;
        let failing = server
            .mock("POST", "/gists")
            .with_status(502)
            .expect(1)
            .create_async()
            .await;
        let created = server
            .mock("POST", "/gists")
            .with_status(201)
            .expect(1)
            .create_async()
            .await;

        let resp = client_for(&server)
            .post("/gists", RequestOptions::new().json(json!({"files": {}})))
            .await
            .unwrap();

        failing.assert_async().await;
        created.assert_async().await;
        assert_eq!(resp.status_code(), 201);
    }

    #[tokio::test]
    async fn test_exhausted_retries_return_last_response() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/down")
            .with_status(500)
            .expect(3)
            .create_async()
            .await;

        let client = HttpClient::builder(server.url())
            .retries(2)
            .backoff_factor(0.0)
            .build()
            .unwrap();
        let resp = client.get("/down", RequestOptions::new()).await.unwrap();

        mock.assert_async().await;
        assert_eq!(resp.status_code(), 500);
        assert_eq!(resp.attempts, 3);
    }

    #[tokio::test]
    async fn test_non_retryable_status_is_not_retried() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/gists/x")
            .with_status(404)
            .expect(1)
            .create_async()
            .await;

        let resp = client_for(&server)
            .get("/gists/x", RequestOptions::new())
            .await
            .unwrap();
        mock.assert_async().await;
        assert_eq!(resp.attempts, 1);
    }

    #[tokio::test]
    async fn test_connection_failure_is_transport_error() {
        let client = HttpClient::builder("http://127.0.0.1:1")
            .retries(1)
            .backoff_factor(0.0)
            .timeout(Some(Duration::from_secs(2)))
            .build()
            .unwrap();

        let err = client
            .get("/gists", RequestOptions::new())
            .await
            .unwrap_err();
        assert!(err.is_transport());
        assert!(err.to_string().contains("2 attempt(s)"));
    }

    #[tokio::test]
    async fn test_headers_merge_over_defaults() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/gists")
            .match_header("accept", "application/vnd.github+json")
            .match_header("x-github-api-version", "2022-11-28")
            .match_header("authorization", "Bearer token123")
            .with_status(200)
            .create_async()
            .await;

        let client = HttpClient::builder(server.url())
            .bearer_token("token123")
            .default_header("Accept", "application/json")
            .build()
            .unwrap();

        client
            .get(
                "/gists",
                RequestOptions::new()
                    .header("Accept", "application/vnd.github+json")
                    .header("X-GitHub-Api-Version", "2022-11-28")
                    .expect_status(200),
            )
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_query_params() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/gists/public")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("since".into(), "2024-01-01T00:00:00Z".into()),
                Matcher::UrlEncoded("per_page".into(), "5".into()),
            ]))
            .with_status(200)
            .with_body("[]")
            .create_async()
            .await;

        client_for(&server)
            .get(
                "/gists/public",
                RequestOptions::new()
                    .param("since", "2024-01-01T00:00:00Z")
                    .param("per_page", 5)
                    .expect_status(200),
            )
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_cookie_override_does_not_leak() {
        let mut server = Server::new_async().await;
        let with_override = server
            .mock("GET", "/first")
            .match_header("cookie", "session=default; tracking=temp")
            .with_status(200)
            .create_async()
            .await;
        let without_override = server
            .mock("GET", "/second")
            .match_header("cookie", "session=default")
            .with_status(200)
            .create_async()
            .await;

        let client = HttpClient::builder(server.url())
            .default_cookie("session", "default")
            .build()
            .unwrap();

        client
            .get(
                "/first",
                RequestOptions::new().cookie("tracking", "temp").expect_status(200),
            )
            .await
            .unwrap();
        client
            .get("/second", RequestOptions::new().expect_status(200))
            .await
            .unwrap();

        with_override.assert_async().await;
        without_override.assert_async().await;
        assert_eq!(client.cookie("tracking"), None);
        assert_eq!(client.cookie("session").as_deref(), Some("default"));
    }

    #[tokio::test]
    async fn test_cookie_override_restored_after_failure() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/fails")
            .with_status(400)
            .create_async()
            .await;

        let client = client_for(&server);
        let result = client
            .get(
                "/fails",
                RequestOptions::new().cookie("temp", "1").expect_status(200),
            )
            .await;

        assert!(result.is_err());
        assert_eq!(client.cookie("temp"), None);
    }

    #[tokio::test]
    async fn test_set_cookie_is_remembered() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/login")
            .with_status(200)
            .with_header("set-cookie", "logged_in=yes; Path=/")
            .create_async()
            .await;

        let client = client_for(&server);
        client.get("/login", RequestOptions::new()).await.unwrap();
        assert_eq!(client.cookie("logged_in").as_deref(), Some("yes"));
    }

    #[tokio::test]
    async fn test_redirects_can_be_disabled() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/old")
            .with_status(301)
            .with_header("location", "/new")
            .create_async()
            .await;
        server
            .mock("GET", "/new")
            .with_status(200)
            .create_async()
            .await;

        let client = client_for(&server);
        let followed = client.get("/old", RequestOptions::new()).await.unwrap();
        assert_eq!(followed.status_code(), 200);
        assert!(followed.url.path().ends_with("/new"));

        let not_followed = client
            .get("/old", RequestOptions::new().allow_redirects(false))
            .await
            .unwrap();
        assert_eq!(not_followed.status_code(), 301);
        assert_eq!(not_followed.header("location"), Some("/new"));
    }

    #[tokio::test]
    async fn test_json_and_raw_bodies() {
        let mut server = Server::new_async().await;
        let json_mock = server
            .mock("PATCH", "/gists/1")
            .match_header("content-type", "application/json")
            .match_body(Matcher::Json(json!({"description": "updated"})))
            .with_status(200)
            .create_async()
            .await;
        let raw_mock = server
            .mock("PUT", "/raw")
            .match_body("raw-bytes")
            .with_status(204)
            .create_async()
            .await;

        let client = client_for(&server);
        client
            .patch(
                "/gists/1",
                RequestOptions::new().json(json!({"description": "updated"})),
            )
            .await
            .unwrap();
        client
            .put("/raw", RequestOptions::new().body("raw-bytes"))
            .await
            .unwrap();

        json_mock.assert_async().await;
        raw_mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_multipart_upload() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/upload")
            .match_header(
                "content-type",
                Matcher::Regex("^multipart/form-data; boundary=.+$".to_string()),
            )
            .match_body(Matcher::AllOf(vec![
                Matcher::Regex("name=\"note\"".to_string()),
                Matcher::Regex("filename=\"hello.txt\"".to_string()),
                Matcher::Regex("Hello from automated tests".to_string()),
            ]))
            .with_status(201)
            .create_async()
            .await;

        client_for(&server)
            .post(
                "/upload",
                RequestOptions::new()
                    .form([("note", "attached")])
                    .file(
                        FileAttachment::new("file", "hello.txt", "Hello from automated tests")
                            .mime("text/plain"),
                    )
                    .expect_status(201),
            )
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_files_reject_json_body() {
        let server = Server::new_async().await;
        let err = client_for(&server)
            .post(
                "/upload",
                RequestOptions::new()
                    .json(json!({}))
                    .file(FileAttachment::new("file", "a.txt", "a")),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, HttpError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_diagnostics_attached_on_every_call() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/gists/abc")
            .with_status(404)
            .with_body(r#"{"message":"Not Found"}"#)
            .create_async()
            .await;

        let sink = Arc::new(MemorySink::new());
        let client = HttpClient::builder(server.url())
            .bearer_token("secret-token")
            .reporter(Reporter::from_arc(sink.clone()))
            .build()
            .unwrap();

        // Assertion fails, diagnostics are still recorded
        let _ = client
            .get("/gists/abc", RequestOptions::new().expect_status(200))
            .await;

        let attachments = sink.attachments();
        assert_eq!(attachments.len(), 2);
        assert!(attachments[0].name.starts_with("GET "));
        assert!(attachments[0].body.contains("/gists/abc"));
        assert!(!attachments[0].body.contains("secret-token"));
        assert_eq!(attachments[1].name, "Response 404");
        assert!(attachments[1].body.contains("Status: 404 Not Found"));
    }

    #[tokio::test]
    async fn test_per_call_timeout() {
        use std::io::Write;

        let mut server = Server::new_async().await;
        server
            .mock("GET", "/slow")
            .with_status(200)
            .with_chunked_body(|w| {
                std::thread::sleep(Duration::from_millis(500));
                w.write_all(b"late")
            })
            .create_async()
            .await;

        let client = HttpClient::builder(server.url())
            .retry_policy(RetryPolicy::none())
            .build()
            .unwrap();
        let err = client
            .get(
                "/slow",
                RequestOptions::new().timeout(Duration::from_millis(100)),
            )
            .await
            .unwrap_err();
        assert!(err.is_transport());
    }
}
