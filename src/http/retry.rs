//! Transport-level retry policy
//!
//! Retries happen inside the client, below any caller logic: a request is
//! re-sent on connection failures or on a retryable status, and once the
//! budget is spent the last response is handed back unchanged so the caller
//! can assert on it.

#![allow(dead_code)]

use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::Method;
use std::time::Duration;

/// Status codes that trigger a retry by default
pub const DEFAULT_STATUS_FORCELIST: [u16; 5] = [429, 500, 502, 503, 504];

/// Statuses for which a `Retry-After` header overrides the computed backoff
const RETRY_AFTER_STATUSES: [u16; 3] = [413, 429, 503];

/// Upper bound for any single retry delay
pub const BACKOFF_MAX: Duration = Duration::from_secs(120);

/// Retry configuration applied to every request of a client
#[derive(Clone, Debug, PartialEq)]
pub struct RetryPolicy {
    /// Maximum number of retries (not counting the first attempt)
    pub total: u32,

    /// Base delay in seconds; retry `n` (from 0) waits `factor * 2^n`
    pub backoff_factor: f64,

    /// Response statuses that are retried
    pub status_forcelist: Vec<u16>,

    /// Methods that may be retried
    pub allowed_methods: Vec<Method>,

    /// Honor `Retry-After` on 413/429/503 responses
    pub respect_retry_after: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            total: 3,
            backoff_factor: 0.3,
            status_forcelist: DEFAULT_STATUS_FORCELIST.to_vec(),
            // POST and PATCH are included on purpose; see DESIGN.md
            allowed_methods: vec![
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::PATCH,
                Method::HEAD,
                Method::OPTIONS,
            ],
            respect_retry_after: true,
        }
    }
}

impl RetryPolicy {
    pub fn new(total: u32, backoff_factor: f64) -> Self {
        Self {
            total,
            backoff_factor,
            ..Self::default()
        }
    }

    /// Policy that never retries
    pub fn none() -> Self {
        Self::new(0, 0.0)
    }

    pub fn allows_method(&self, method: &Method) -> bool {
        self.allowed_methods.contains(method)
    }

    /// Whether a response with `status` to `method` should be retried
    pub fn should_retry_status(&self, method: &Method, status: u16) -> bool {
        self.allows_method(method) && self.status_forcelist.contains(&status)
    }

    /// Exponential backoff before retry number `retry` (0-based)
    pub fn backoff(&self, retry: u32) -> Duration {
        if self.backoff_factor <= 0.0 {
            return Duration::ZERO;
        }
        let secs = self.backoff_factor * 2f64.powi(retry.min(31) as i32);
        if !secs.is_finite() || secs >= BACKOFF_MAX.as_secs_f64() {
            BACKOFF_MAX
        } else {
            Duration::from_secs_f64(secs)
        }
    }

    /// Delay before retrying a response, preferring `Retry-After` when allowed
    pub fn delay_for_response(&self, retry: u32, status: u16, headers: &HeaderMap) -> Duration {
        if self.respect_retry_after && RETRY_AFTER_STATUSES.contains(&status) {
            let retry_after = headers
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| parse_retry_after(v, Utc::now()));
            if let Some(delay) = retry_after {
                return delay.min(BACKOFF_MAX);
            }
        }
        self.backoff(retry)
    }
}

/// Parse a `Retry-After` value: delay in seconds or an HTTP date
fn parse_retry_after(value: &str, now: DateTime<Utc>) -> Option<Duration> {
    let value = value.trim();
    if let Ok(secs) = value.parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }

    let date = DateTime::parse_from_rfc2822(value).ok()?;
    let delta = date.with_timezone(&Utc) - now;
    Some(delta.to_std().unwrap_or(Duration::ZERO))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use reqwest::header::HeaderValue;

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.total, 3);
        assert!(policy.allows_method(&Method::POST));
        assert!(policy.allows_method(&Method::PATCH));
        assert!(!policy.allows_method(&Method::TRACE));
    }

    #[test]
    fn test_retryable_statuses() {
        let policy = RetryPolicy::default();
        assert!(policy.should_retry_status(&Method::GET, 503));
        assert!(policy.should_retry_status(&Method::POST, 429));
        assert!(!policy.should_retry_status(&Method::GET, 404));
        assert!(!policy.should_retry_status(&Method::GET, 501));
        assert!(!policy.should_retry_status(&Method::TRACE, 503));
    }

    #[test]
    fn test_backoff_doubles() {
        let policy = RetryPolicy::new(5, 0.5);
        assert_eq!(policy.backoff(0), Duration::from_millis(500));
        assert_eq!(policy.backoff(1), Duration::from_secs(1));
        assert_eq!(policy.backoff(3), Duration::from_secs(4));
    }

    #[test]
    fn test_backoff_capped() {
        let policy = RetryPolicy::new(50, 1.0);
        assert_eq!(policy.backoff(40), BACKOFF_MAX);
        assert_eq!(RetryPolicy::none().backoff(3), Duration::ZERO);
    }

    #[test]
    fn test_retry_after_seconds() {
        let policy = RetryPolicy::new(3, 0.1);
        let mut headers = HeaderMap::new();
        headers.insert(RETRY_AFTER, HeaderValue::from_static("7"));

        assert_eq!(
            policy.delay_for_response(0, 429, &headers),
            Duration::from_secs(7)
        );
        // 502 does not honor Retry-After
        assert_eq!(
            policy.delay_for_response(0, 502, &headers),
            Duration::from_millis(100)
        );
    }

    #[test]
    fn test_retry_after_ignored_when_disabled() {
        let policy = RetryPolicy {
            respect_retry_after: false,
            ..RetryPolicy::new(3, 0.0)
        };
        let mut headers = HeaderMap::new();
        headers.insert(RETRY_AFTER, HeaderValue::from_static("30"));
        assert_eq!(policy.delay_for_response(0, 503, &headers), Duration::ZERO);
    }

    #[test]
    fn test_parse_retry_after_date() {
        let now = Utc.with_ymd_and_hms(2015, 10, 21, 7, 28, 0).unwrap();
        let delay = parse_retry_after("Wed, 21 Oct 2015 07:28:30 GMT", now);
        assert_eq!(delay, Some(Duration::from_secs(30)));

        let past = parse_retry_after("Wed, 21 Oct 2015 07:27:00 GMT", now);
        assert_eq!(past, Some(Duration::ZERO));

        assert_eq!(parse_retry_after("soon", now), None);
    }
}
