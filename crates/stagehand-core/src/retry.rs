//! Bounded commit retry policy
//!
//! Only `CommitFailed` is retried. Each retry re-runs the whole commit
//! closure, so a well-behaved update re-derives its change from the
//! refreshed base before writing again. `CommitStateUnknown` returns
//! immediately: retrying an already-applied write could double-apply it.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::collector::ErrorCollector;
use crate::errors::{ErrorKind, Result, Status};

pub const COMMIT_NUM_RETRIES: &str = "commit.retry.num-retries";
pub const COMMIT_MIN_RETRY_WAIT_MS: &str = "commit.retry.min-wait-ms";
pub const COMMIT_MAX_RETRY_WAIT_MS: &str = "commit.retry.max-wait-ms";
pub const COMMIT_TOTAL_RETRY_TIME_MS: &str = "commit.retry.total-timeout-ms";

pub const COMMIT_NUM_RETRIES_DEFAULT: u32 = 4;
pub const COMMIT_MIN_RETRY_WAIT_MS_DEFAULT: u64 = 100;
pub const COMMIT_MAX_RETRY_WAIT_MS_DEFAULT: u64 = 60_000;
pub const COMMIT_TOTAL_RETRY_TIME_MS_DEFAULT: u64 = 1_800_000;

/// Retry settings applied around a commit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub num_retries: u32,
    pub min_wait_ms: u64,
    pub max_wait_ms: u64,
    /// Upper bound on time spent across all attempts
    pub total_timeout_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            num_retries: COMMIT_NUM_RETRIES_DEFAULT,
            min_wait_ms: COMMIT_MIN_RETRY_WAIT_MS_DEFAULT,
            max_wait_ms: COMMIT_MAX_RETRY_WAIT_MS_DEFAULT,
            total_timeout_ms: COMMIT_TOTAL_RETRY_TIME_MS_DEFAULT,
        }
    }
}

impl RetryPolicy {
    /// A policy that makes exactly one attempt
    pub fn no_retry() -> Self {
        Self {
            num_retries: 0,
            ..Self::default()
        }
    }

    /// Read the policy from object properties, falling back to defaults
    ///
    /// Every malformed property is reported, not just the first.
    ///
    /// # Errors
    ///
    /// Returns `ValidationFailed` listing each property that is not a valid
    /// non-negative integer, or when `min-wait-ms` exceeds `max-wait-ms`.
    pub fn from_properties(properties: &BTreeMap<String, String>) -> Result<Self> {
        let mut errors = ErrorCollector::new();
        let defaults = Self::default();

        let num_retries = parse_property(
            properties,
            COMMIT_NUM_RETRIES,
            defaults.num_retries,
            &mut errors,
        );
        let min_wait_ms = parse_property(
            properties,
            COMMIT_MIN_RETRY_WAIT_MS,
            defaults.min_wait_ms,
            &mut errors,
        );
        let max_wait_ms = parse_property(
            properties,
            COMMIT_MAX_RETRY_WAIT_MS,
            defaults.max_wait_ms,
            &mut errors,
        );
        let total_timeout_ms = parse_property(
            properties,
            COMMIT_TOTAL_RETRY_TIME_MS,
            defaults.total_timeout_ms,
            &mut errors,
        );

        if min_wait_ms > max_wait_ms {
            errors.add_error(
                ErrorKind::InvalidArgument,
                format!(
                    "{} ({}) cannot exceed {} ({})",
                    COMMIT_MIN_RETRY_WAIT_MS, min_wait_ms, COMMIT_MAX_RETRY_WAIT_MS, max_wait_ms
                ),
            );
        }

        errors.check_errors()?;

        Ok(Self {
            num_retries,
            min_wait_ms,
            max_wait_ms,
            total_timeout_ms,
        })
    }

    /// Wait before retry number `attempt` (0-based): exponential, capped
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
        let wait = self.min_wait_ms.saturating_mul(factor).min(self.max_wait_ms);
        Duration::from_millis(wait)
    }

    /// Run `attempt` until it succeeds, fails with a non-retryable kind, or
    /// the retry/time budget is spent
    ///
    /// The closure receives the 0-based attempt number.
    ///
    /// # Errors
    ///
    /// Returns the last error produced by the closure.
    pub fn run<F>(&self, op: &str, mut attempt: F) -> Status
    where
        F: FnMut(u32) -> Status,
    {
        let start = Instant::now();
        let budget = Duration::from_millis(self.total_timeout_ms);
        let mut n = 0u32;

        loop {
            let err = match attempt(n) {
                Ok(()) => return Ok(()),
                Err(err) => err,
            };

            if !err.kind().is_retryable() || n >= self.num_retries {
                return Err(err);
            }

            let wait = self.backoff(n);
            if start.elapsed() + wait > budget {
                tracing::warn!(
                    op = op,
                    attempt = n,
                    "Commit retry budget exhausted"
                );
                return Err(err);
            }

            tracing::warn!(
                op = op,
                attempt = n,
                wait_ms = wait.as_millis() as u64,
                err_code = err.code(),
                "Commit conflict, retrying"
            );
            if !wait.is_zero() {
                std::thread::sleep(wait);
            }
            n += 1;
        }
    }
}

fn parse_property<N: std::str::FromStr + Copy>(
    properties: &BTreeMap<String, String>,
    key: &str,
    default: N,
    errors: &mut ErrorCollector,
) -> N {
    match properties.get(key) {
        None => default,
        Some(raw) => match raw.trim().parse::<N>() {
            Ok(value) => value,
            Err(_) => {
                errors.add_error(
                    ErrorKind::InvalidArgument,
                    format!("Invalid value for {}: '{}'", key, raw),
                );
                default
            }
        },
    }
}
