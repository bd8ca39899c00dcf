//! A registered source plus the per-source state every fetch against it shares.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use super::circuit_breaker::CircuitBreaker;
use super::coordinator::RetryPolicy;
use super::throttle::{RequestDelay, Throttle};
use crate::sources::{QueryParams, SourceFetcher};

/// Per-source knobs supplied at registration time.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceSettings {
    /// Listing queries to run each pass. Empty means one query with no parameters.
    pub queries: Vec<QueryParams>,
    pub retry: RetryPolicy,
    pub request_delay: RequestDelay,
    pub breaker_cooldown: Duration,
    pub breaker_threshold: u32,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            queries: Vec::new(),
            retry: RetryPolicy::default(),
            request_delay: RequestDelay::default(),
            breaker_cooldown: Duration::from_secs(30 * 60),
            breaker_threshold: 3,
        }
    }
}

impl SourceSettings {
    /// No request spacing and no backoff. Used for local sources and tests.
    pub fn immediate() -> Self {
        Self {
            retry: RetryPolicy::immediate(3),
            request_delay: RequestDelay::none(),
            ..Self::default()
        }
    }

    pub fn with_query(mut self, query: QueryParams) -> Self {
        self.queries.push(query);
        self
    }

    /// Queries to execute, substituting a single empty query when none are set.
    pub fn effective_queries(&self) -> Vec<QueryParams> {
        if self.queries.is_empty() {
            vec![BTreeMap::new()]
        } else {
            self.queries.clone()
        }
    }
}

/// A fetcher together with its throttle, circuit breaker and retry policy.
pub struct SourceHandle {
    fetcher: Arc<dyn SourceFetcher>,
    throttle: Throttle,
    breaker: CircuitBreaker,
    retry: RetryPolicy,
}

impl SourceHandle {
    pub fn new(fetcher: Arc<dyn SourceFetcher>, settings: &SourceSettings) -> Self {
        Self {
            fetcher,
            throttle: Throttle::new(settings.request_delay),
            breaker: CircuitBreaker::new(settings.breaker_cooldown, settings.breaker_threshold),
            retry: settings.retry,
        }
    }

    pub fn name(&self) -> &str {
        self.fetcher.name()
    }

    pub fn fetcher(&self) -> &dyn SourceFetcher {
        self.fetcher.as_ref()
    }

    pub fn throttle(&self) -> &Throttle {
        &self.throttle
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }
}

impl std::fmt::Debug for SourceHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceHandle")
            .field("name", &self.name())
            .field("throttle", &self.throttle)
            .field("breaker", &self.breaker)
            .field("retry", &self.retry)
            .finish()
    }
}
