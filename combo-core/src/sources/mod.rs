//! Source capability trait and the concrete source kinds.
//!
//! A source is anything that can list combo deals and, optionally, return
//! detail data for a deal or an individual component price. Sources know
//! nothing about the cache or about retries; the orchestrator and the fetch
//! coordinator sit above this trait.

pub mod file;
pub mod http_json;
pub mod registry;
pub mod static_source;
mod wire;

use std::collections::BTreeMap;

use crate::domain::{DealDetail, RawDeal};
use crate::fetch::FetchError;

pub use file::FileSource;
pub use http_json::{HttpJsonConfig, HttpJsonSource};
pub use registry::{SourceEntry, SourceRegistry};
pub use static_source::{CallCounts, StaticSource};

/// Source-specific listing parameters (a store zip code, a category filter).
pub type QueryParams = BTreeMap<String, String>;

/// What a source can do beyond listing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    pub listing: bool,
    pub detail: bool,
    pub price_lookup: bool,
}

/// A retail deal source.
pub trait SourceFetcher: Send + Sync {
    /// Stable name used in logs, reports and config.
    fn name(&self) -> &str;

    fn capabilities(&self) -> Capabilities;

    /// One listing request.
    fn fetch_listing(&self, query: &QueryParams) -> Result<Vec<RawDeal>, FetchError>;

    fn fetch_detail(&self, _url: &str) -> Result<DealDetail, FetchError> {
        Err(FetchError::Unsupported {
            operation: "detail fetch",
        })
    }

    /// Individual (non-bundled) price of a component, looked up by name.
    fn fetch_component_price(&self, _name: &str) -> Result<f64, FetchError> {
        Err(FetchError::Unsupported {
            operation: "component price lookup",
        })
    }

    /// Whether a listed deal lacks data that only its detail page carries.
    fn needs_detail(&self, _deal: &RawDeal) -> bool {
        self.capabilities().detail
    }
}
