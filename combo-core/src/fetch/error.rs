//! Structured fetch errors and their retry classification.

use thiserror::Error;

/// Errors a source can report for a single request.
///
/// These are designed to be displayable in run reports and logs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("rate limited by source (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("HTTP {status} from source")]
    HttpStatus { status: u16 },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("source blocked requests: {0}")]
    Blocked(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("{operation} is not supported by this source")]
    Unsupported { operation: &'static str },
}

impl FetchError {
    /// Transient errors are worth retrying; anything else fails immediately.
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::NetworkUnreachable(_)
            | FetchError::Timeout(_)
            | FetchError::RateLimited { .. } => true,
            FetchError::HttpStatus { status } => *status >= 500,
            FetchError::ResponseFormatChanged(_)
            | FetchError::Blocked(_)
            | FetchError::NotFound(_)
            | FetchError::Unsupported { .. } => false,
        }
    }
}
