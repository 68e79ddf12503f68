//! Resilient fetcher for the listing endpoint.
//!
//! Retries a JSON GET at a fixed interval up to a bounded number of attempts.
//! Unlike the table downloads, a failed listing fetch is reported by the
//! fetcher itself once all attempts are used up.

use super::transport::{Transport, TransportError};
use crate::report::FailureReporter;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, warn};

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_WAIT: Duration = Duration::from_secs(5);
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Attempt budget and fixed wait between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one. Zero behaves like one.
    pub max_attempts: u32,
    /// Sleep between consecutive attempts. Never grows.
    pub wait: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            wait: DEFAULT_WAIT,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, wait: Duration) -> Self {
        Self { max_attempts, wait }
    }

    fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

/// Blocking wait between attempts.
pub trait Sleeper: Send + Sync {
    fn sleep(&self, duration: Duration);
}

/// Sleeps the current thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Why a single attempt failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AttemptError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("response body is not valid JSON: {0}")]
    InvalidJson(String),
}

/// Errors from the resilient fetcher.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("API request failed after {attempts} attempts: {last_error}")]
    Exhausted {
        attempts: u32,
        last_error: AttemptError,
    },
}

/// GETs a JSON document, retrying at a fixed interval.
pub struct ResilientFetcher {
    transport: Arc<dyn Transport>,
    sleeper: Arc<dyn Sleeper>,
    policy: RetryPolicy,
}

impl ResilientFetcher {
    pub fn new(transport: Arc<dyn Transport>, sleeper: Arc<dyn Sleeper>, policy: RetryPolicy) -> Self {
        Self {
            transport,
            sleeper,
            policy,
        }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Fetch `url` and parse the body as JSON.
    ///
    /// Connection errors, timeouts, non-2xx statuses, and non-JSON bodies all
    /// count as failed attempts. After the last failed attempt exactly one
    /// failure is sent to `reporter` and [`FetchError::Exhausted`] is returned.
    pub fn fetch_json(&self, url: &str, reporter: &dyn FailureReporter) -> Result<Value, FetchError> {
        let attempts = self.policy.attempts();
        let mut attempt = 1;

        loop {
            let err = match self.attempt(url) {
                Ok(value) => {
                    debug!(attempt, "API request succeeded");
                    return Ok(value);
                }
                Err(e) => e,
            };

            warn!("Attempt {attempt}/{attempts}: API request failed - {err}");

            if attempt >= attempts {
                error!("Max retries reached. API request failed.");
                reporter.report_failure(&format!("API request failed after {attempts} attempts."));
                return Err(FetchError::Exhausted {
                    attempts,
                    last_error: err,
                });
            }

            self.sleeper.sleep(self.policy.wait);
            attempt += 1;
        }
    }

    fn attempt(&self, url: &str) -> Result<Value, AttemptError> {
        let resp = self.transport.get(url)?.error_for_status(url)?;
        serde_json::from_str(&resp.body).map_err(|e| AttemptError::InvalidJson(e.to_string()))
    }
}
