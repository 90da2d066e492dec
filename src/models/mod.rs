//! Data models for the gists suite
//!
//! Gist resource types, request payloads, and scenario outcomes.

mod gist;
mod scenario;

pub use gist::{Gist, GistFork, GistUpdate, ListOptions, NewGist};
pub use scenario::{RunSummary, Scenario, ScenarioResult, ScenarioStatus};
