//! Polling for eventually consistent state
//!
//! Some endpoints (forks lists, the owner's gist list) lag behind writes.
//! [`Wait`] re-evaluates a condition at a fixed interval until it holds or a
//! deadline passes.

#![allow(dead_code)]

use serde_json::Value;
use std::fmt::Debug;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio::time::{sleep, Instant};
use tracing::debug;

use crate::report::Reporter;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Wait errors
#[derive(Error, Debug)]
pub enum WaitError {
    #[error(
        "Condition was not met within {:.1}s. Condition: {summary}. Last result: \"{last}\".{}",
        .timeout.as_secs_f64(),
        expected_suffix(.expected)
    )]
    Timeout {
        summary: String,
        timeout: Duration,
        last: String,
        expected: Option<String>,
    },

    #[error("Condition failed while waiting for: {summary}")]
    Condition {
        summary: String,
        #[source]
        source: anyhow::Error,
    },
}

fn expected_suffix(expected: &Option<String>) -> String {
    match expected {
        Some(value) => format!(" Expected: \"{value}\"."),
        None => String::new(),
    }
}

/// Values that count as "condition met" when no expected value is given
pub trait Truthy {
    fn is_truthy(&self) -> bool;
}

impl Truthy for bool {
    fn is_truthy(&self) -> bool {
        *self
    }
}

impl<T> Truthy for Option<T> {
    fn is_truthy(&self) -> bool {
        self.is_some()
    }
}

impl<T> Truthy for Vec<T> {
    fn is_truthy(&self) -> bool {
        !self.is_empty()
    }
}

impl Truthy for String {
    fn is_truthy(&self) -> bool {
        !self.is_empty()
    }
}

impl Truthy for &str {
    fn is_truthy(&self) -> bool {
        !self.is_empty()
    }
}

macro_rules! truthy_number {
    ($($t:ty),*) => {
        $(impl Truthy for $t {
            fn is_truthy(&self) -> bool {
                *self != 0
            }
        })*
    };
}

truthy_number!(i32, i64, u8, u16, u32, u64, usize);

impl Truthy for f64 {
    fn is_truthy(&self) -> bool {
        *self != 0.0 && !self.is_nan()
    }
}

impl Truthy for Value {
    fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
            Value::String(s) => !s.is_empty(),
            Value::Array(a) => !a.is_empty(),
            Value::Object(o) => !o.is_empty(),
        }
    }
}

/// Polling configuration
#[derive(Clone, Debug)]
pub struct Wait {
    summary: String,
    timeout: Duration,
    poll_interval: Duration,
    reporter: Option<Reporter>,
}

impl Wait {
    /// Start a wait described by `summary`
    pub fn new(summary: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
            timeout: DEFAULT_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            reporter: None,
        }
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Record the wait as a report step
    pub fn reporter(mut self, reporter: &Reporter) -> Self {
        self.reporter = Some(reporter.clone());
        self
    }

    /// Poll until the condition returns a truthy value
    pub async fn until<T, F, Fut>(self, condition: F) -> Result<T, WaitError>
    where
        T: Truthy + Debug,
        F: FnMut() -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        self.poll(condition, |value: &T| value.is_truthy(), None)
            .await
    }

    /// Poll until the condition returns exactly `expected`
    pub async fn until_eq<T, F, Fut>(self, condition: F, expected: T) -> Result<T, WaitError>
    where
        T: PartialEq + Debug,
        F: FnMut() -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        let shown = format!("{expected:?}");
        self.poll(condition, |value: &T| *value == expected, Some(shown))
            .await
    }

    async fn poll<T, F, Fut, P>(
        self,
        mut condition: F,
        done: P,
        expected: Option<String>,
    ) -> Result<T, WaitError>
    where
        T: Debug,
        F: FnMut() -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
        P: Fn(&T) -> bool,
    {
        if let Some(reporter) = &self.reporter {
            reporter.step(&self.summary);
        }

        let deadline = Instant::now() + self.timeout;
        let mut polls = 0u32;

        loop {
            polls += 1;
            let value = condition().await.map_err(|source| WaitError::Condition {
                summary: self.summary.clone(),
                source,
            })?;

            if done(&value) {
                debug!("'{}' met after {} poll(s)", self.summary, polls);
                return Ok(value);
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(WaitError::Timeout {
                    summary: self.summary,
                    timeout: self.timeout,
                    last: format!("{value:?}"),
                    expected,
                });
            }

            debug!("'{}' not met yet (last: {:?})", self.summary, value);
            sleep(self.poll_interval.min(remaining)).await;
        }
    }
}
