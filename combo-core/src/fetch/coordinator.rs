//! Fetch coordinator: bounded retries with jittered exponential backoff.
//!
//! The coordinator never looks at the cache. The orchestrator decides that
//! a fetch is needed and hands the coordinator a closure that performs one
//! request against a source. Source-level state (throttle, circuit breaker)
//! lives on the [`SourceHandle`], so coordinators for different sources never
//! serialize against each other.

use rand::Rng;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

use super::error::FetchError;
use super::handle::SourceHandle;
use crate::sources::SourceFetcher;

/// Retry budget for one fetch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    pub base_delay: Duration,
    /// Relative jitter applied to every backoff delay (0.25 = ±25%).
    pub jitter: f64,
    /// Upper bound on a wait requested through `Retry-After`.
    pub max_rate_limit_wait: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(2),
            jitter: 0.25,
            max_rate_limit_wait: Duration::from_secs(120),
        }
    }
}

impl RetryPolicy {
    /// No waiting between attempts (tests, local file sources).
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay: Duration::ZERO,
            jitter: 0.0,
            max_rate_limit_wait: Duration::ZERO,
        }
    }

    /// Delay before the retry that follows failed attempt `attempt` (0-based):
    /// `base_delay * 2^attempt`, scaled by a random factor in `1 ± jitter`.
    pub fn backoff_delay(&self, attempt: u32, rng: &mut impl Rng) -> Duration {
        let exp = self.base_delay.saturating_mul(2u32.saturating_pow(attempt));
        let jitter = self.jitter.clamp(0.0, 1.0);
        if jitter == 0.0 || exp.is_zero() {
            return exp;
        }
        let factor = rng.gen_range((1.0 - jitter)..=(1.0 + jitter));
        exp.mul_f64(factor)
    }

    /// Delay before retrying after `error` on attempt `attempt`. A rate limit
    /// stretches the backoff to the source's `Retry-After`, capped at
    /// `max_rate_limit_wait`.
    pub fn retry_delay(&self, attempt: u32, error: &FetchError, rng: &mut impl Rng) -> Duration {
        let backoff = self.backoff_delay(attempt, rng);
        match error {
            FetchError::RateLimited { retry_after_secs } => {
                let requested = Duration::from_secs(*retry_after_secs).min(self.max_rate_limit_wait);
                backoff.max(requested)
            }
            _ => backoff,
        }
    }
}

/// Why a fetch ultimately failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Every attempt failed with a transient error.
    Exhausted,
    /// A non-retryable error ended the fetch early.
    Permanent,
}

/// Result of one coordinated fetch. Never persisted.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome<T> {
    Success(T),
    Failure {
        kind: FailureKind,
        attempts: u32,
        last_error: FetchError,
    },
    SourceSkipped(String),
}

impl<T> FetchOutcome<T> {
    pub fn success(self) -> Option<T> {
        match self {
            FetchOutcome::Success(v) => Some(v),
            _ => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> FetchOutcome<U> {
        match self {
            FetchOutcome::Success(v) => FetchOutcome::Success(f(v)),
            FetchOutcome::Failure {
                kind,
                attempts,
                last_error,
            } => FetchOutcome::Failure {
                kind,
                attempts,
                last_error,
            },
            FetchOutcome::SourceSkipped(reason) => FetchOutcome::SourceSkipped(reason),
        }
    }
}

/// Counters over every fetch a coordinator executed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FetchStats {
    pub requests: u64,
    pub retries: u64,
    pub failures: u64,
    pub skipped: u64,
}

/// Executes single-source fetches under a retry policy.
#[derive(Debug, Default)]
pub struct FetchCoordinator {
    requests: AtomicU64,
    retries: AtomicU64,
    failures: AtomicU64,
    skipped: AtomicU64,
}

impl FetchCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `op` against `source` until it succeeds, hits a permanent error,
    /// or spends `policy.max_attempts`.
    ///
    /// Errors never escape: they become a `Failure` outcome carrying the
    /// attempt count and last error.
    pub fn execute<T, F>(
        &self,
        source: &SourceHandle,
        key: &str,
        policy: &RetryPolicy,
        mut op: F,
    ) -> FetchOutcome<T>
    where
        F: FnMut(&dyn SourceFetcher) -> Result<T, FetchError>,
    {
        let name = source.name();
        let max_attempts = policy.max_attempts.max(1);
        let mut last_error: Option<FetchError> = None;

        for attempt in 0..max_attempts {
            if let Some(err) = &last_error {
                let delay = policy.retry_delay(attempt - 1, err, &mut rand::thread_rng());
                debug!(source = name, key, attempt, delay_ms = delay.as_millis() as u64, "backing off");
                self.retries.fetch_add(1, Ordering::Relaxed);
                std::thread::sleep(delay);
            }

            if !source.breaker().is_allowed() {
                return self.skip(source, key);
            }

            source.throttle().wait_turn();
            self.requests.fetch_add(1, Ordering::Relaxed);

            match op(source.fetcher()) {
                Ok(value) => {
                    source.breaker().record_success();
                    return FetchOutcome::Success(value);
                }
                Err(err @ FetchError::Blocked(_)) => {
                    source.breaker().trip();
                    return self.fail(name, key, FailureKind::Permanent, attempt + 1, err);
                }
                Err(err) if !err.is_transient() => {
                    return self.fail(name, key, FailureKind::Permanent, attempt + 1, err);
                }
                Err(err) => {
                    warn!(
                        source = name,
                        key,
                        attempt = attempt + 1,
                        max_attempts,
                        error = %err,
                        "transient fetch error"
                    );
                    last_error = Some(err);
                }
            }
        }

        let err = last_error.unwrap_or(FetchError::NetworkUnreachable("no attempts made".into()));
        source.breaker().record_failure();
        self.fail(name, key, FailureKind::Exhausted, max_attempts, err)
    }

    /// Snapshot of the counters.
    pub fn stats(&self) -> FetchStats {
        FetchStats {
            requests: self.requests.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
        }
    }

    fn fail<T>(
        &self,
        source: &str,
        key: &str,
        kind: FailureKind,
        attempts: u32,
        last_error: FetchError,
    ) -> FetchOutcome<T> {
        self.failures.fetch_add(1, Ordering::Relaxed);
        warn!(source, key, ?kind, attempts, error = %last_error, "fetch failed");
        FetchOutcome::Failure {
            kind,
            attempts,
            last_error,
        }
    }

    fn skip<T>(&self, source: &SourceHandle, key: &str) -> FetchOutcome<T> {
        self.skipped.fetch_add(1, Ordering::Relaxed);
        let reason = format!(
            "circuit breaker open for {} ({}s cooldown left)",
            source.name(),
            source.breaker().remaining_cooldown().as_secs()
        );
        warn!(source = source.name(), key, "{reason}");
        FetchOutcome::SourceSkipped(reason)
    }
}
