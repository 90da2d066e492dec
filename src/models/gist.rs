//! Gist resource models
//!
//! Typed views of the JSON the gists endpoints return, plus the request
//! payloads the suite sends. Unknown response fields are ignored.

#![allow(dead_code)]

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Account that owns a gist or authored a revision
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GistOwner {
    pub login: String,
    pub id: u64,
}

/// A file inside a gist
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GistFile {
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(rename = "type", default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub raw_url: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub truncated: Option<bool>,
    /// Only present on single-gist responses
    #[serde(default)]
    pub content: Option<String>,
}

/// Line counts for a revision
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeStatus {
    #[serde(default)]
    pub total: Option<u64>,
    #[serde(default)]
    pub additions: Option<u64>,
    #[serde(default)]
    pub deletions: Option<u64>,
}

/// One entry of a gist's revision history
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GistCommit {
    pub version: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub user: Option<GistOwner>,
    #[serde(default)]
    pub change_status: ChangeStatus,
    #[serde(default)]
    pub committed_at: Option<DateTime<Utc>>,
}

/// Entry of a gist's forks list
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GistFork {
    pub id: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub owner: Option<GistOwner>,
    /// Older API versions report the forking account here
    #[serde(default)]
    pub user: Option<GistOwner>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// A gist
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Gist {
    pub id: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub html_url: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub public: bool,
    #[serde(default)]
    pub files: BTreeMap<String, GistFile>,
    #[serde(default)]
    pub owner: Option<GistOwner>,
    #[serde(default)]
    pub history: Vec<GistCommit>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Gist {
    /// Name of the first file, in key order
    pub fn first_file_name(&self) -> Option<&str> {
        self.files.keys().next().map(String::as_str)
    }

    pub fn file_content(&self, name: &str) -> Option<&str> {
        self.files.get(name).and_then(|f| f.content.as_deref())
    }
}

/// File body in a create or update payload
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct FileContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Renames the file on update
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
}

impl FileContent {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            filename: None,
        }
    }
}

/// Body of `POST /gists`
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct NewGist {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub public: bool,
    pub files: BTreeMap<String, FileContent>,
}

impl NewGist {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn public(mut self, public: bool) -> Self {
        self.public = public;
        self
    }

    pub fn file(mut self, name: impl Into<String>, content: impl Into<String>) -> Self {
        self.files.insert(name.into(), FileContent::new(content));
        self
    }
}

/// Body of `PATCH /gists/{id}`
///
/// A file mapped to `None` is serialized as `null`, which deletes it.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct GistUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub files: BTreeMap<String, Option<FileContent>>,
}

impl GistUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn file(mut self, name: impl Into<String>, content: impl Into<String>) -> Self {
        self.files.insert(name.into(), Some(FileContent::new(content)));
        self
    }

    pub fn rename_file(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.files.insert(
            from.into(),
            Some(FileContent {
                content: None,
                filename: Some(to.into()),
            }),
        );
        self
    }

    pub fn delete_file(mut self, name: impl Into<String>) -> Self {
        self.files.insert(name.into(), None);
        self
    }
}

/// Pagination and filtering for list endpoints
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ListOptions {
    /// Only gists updated at or after this time
    pub since: Option<DateTime<Utc>>,
    pub per_page: Option<u32>,
    pub page: Option<u32>,
}

impl ListOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    pub fn per_page(mut self, per_page: u32) -> Self {
        self.per_page = Some(per_page);
        self
    }

    pub fn page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    /// Query pairs for the values that are set
    pub fn to_query(&self) -> Vec<(String, String)> {
        let mut query = Vec::new();
        if let Some(since) = self.since {
            query.push((
                "since".to_string(),
                since.to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
            ));
        }
        if let Some(per_page) = self.per_page {
            query.push(("per_page".to_string(), per_page.to_string()));
        }
        if let Some(page) = self.page {
            query.push(("page".to_string(), page.to_string()));
        }
        query
    }
}
