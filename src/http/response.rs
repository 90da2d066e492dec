//! HTTP response wrapper and diagnostic rendering

#![allow(dead_code)]

use reqwest::header::{HeaderMap, AUTHORIZATION};
use reqwest::{Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use std::time::Duration;

use super::HttpError;

/// Fully buffered HTTP response
#[derive(Clone, Debug)]
pub struct HttpResponse {
    pub method: Method,
    /// Final URL after redirects
    pub url: Url,
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
    pub elapsed: Duration,
    /// Number of attempts it took, including retries
    pub attempts: u32,
}

impl HttpResponse {
    pub fn status_code(&self) -> u16 {
        self.status.as_u16()
    }

    pub fn reason(&self) -> &'static str {
        self.status.canonical_reason().unwrap_or("")
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn is_client_error(&self) -> bool {
        self.status.is_client_error()
    }

    pub fn is_server_error(&self) -> bool {
        self.status.is_server_error()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Body decoded as UTF-8, with invalid sequences replaced
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Deserialize the body as JSON
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, HttpError> {
        serde_json::from_slice(&self.body).map_err(|e| HttpError::Decode {
            url: self.url.to_string(),
            message: e.to_string(),
        })
    }

    /// Body as an untyped JSON value
    pub fn json_value(&self) -> Result<Value, HttpError> {
        self.json()
    }

    /// Body rendered for humans: pretty JSON, else text, else a placeholder
    pub fn safe_body(&self) -> String {
        render_body(&self.body)
    }

    /// Multi-line description used for report attachments
    pub fn describe(&self) -> String {
        format!(
            "Status: {} {}\n\nHeaders:\n{}\n\nBody:\n{}\n",
            self.status_code(),
            self.reason(),
            render_headers(&self.headers),
            self.safe_body()
        )
    }
}

/// Snapshot of an outgoing request, taken just before it is sent
#[derive(Clone, Debug)]
pub struct RequestRecord {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub body: Option<String>,
}

impl RequestRecord {
    pub fn capture(request: &reqwest::Request) -> Self {
        let body = request.body().map(|body| match body.as_bytes() {
            Some(bytes) => render_body(bytes),
            None => "<streamed body>".to_string(),
        });

        Self {
            method: request.method().clone(),
            url: request.url().to_string(),
            headers: request.headers().clone(),
            body,
        }
    }

    /// Attachment name for this request
    pub fn title(&self) -> String {
        format!("{} {}", self.method, self.url)
    }
}

impl fmt::Display for RequestRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Request:\n{} {}\n\nHeaders:\n{}\n\nBody:\n{}\n",
            self.method,
            self.url,
            render_headers(&self.headers),
            self.body.as_deref().unwrap_or("<empty>")
        )
    }
}

/// Render a body: pretty JSON when it parses, UTF-8 text otherwise
pub fn render_body(bytes: &[u8]) -> String {
    if let Ok(value) = serde_json::from_slice::<Value>(bytes) {
        if let Ok(pretty) = serde_json::to_string_pretty(&value) {
            return pretty;
        }
    }
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => format!("<unreadable: {} bytes>", bytes.len()),
    }
}

/// One `name: value` line per header; credentials are masked
fn render_headers(headers: &HeaderMap) -> String {
    let lines: Vec<String> = headers
        .iter()
        .map(|(name, value)| {
            let value = if name == AUTHORIZATION {
                "<redacted>".to_string()
            } else {
                value.to_str().unwrap_or("<binary>").to_string()
            };
            format!("  {name}: {value}")
        })
        .collect();
    lines.join("\n")
}
