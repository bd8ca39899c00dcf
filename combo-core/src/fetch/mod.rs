//! Fetch coordination: retries, backoff, circuit breaking and request spacing.

pub mod circuit_breaker;
pub mod coordinator;
pub mod error;
pub mod handle;
pub mod throttle;

pub use circuit_breaker::{BreakerState, CircuitBreaker};
pub use coordinator::{FailureKind, FetchCoordinator, FetchOutcome, FetchStats, RetryPolicy};
pub use error::FetchError;
pub use handle::{SourceHandle, SourceSettings};
pub use throttle::{RequestDelay, Throttle};
