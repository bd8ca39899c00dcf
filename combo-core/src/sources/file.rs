//! Local JSON file source.
//!
//! The file holds a snapshot of a feed:
//!
//! ```json
//! {
//!   "listings": [{ "url": "...", "combo_price": 649.99, "components": [...] }],
//!   "details":  { "<url>": { "components": [...], "combo_type": "CPU+MB+RAM", ... } },
//!   "prices":   { "<component name>": 429.99 }
//! }
//! ```
//!
//! The file is re-read on every call, so an updated snapshot is picked up by
//! the next run without restarting anything.

use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use super::wire::ListingRecord;
use super::{Capabilities, QueryParams, SourceFetcher};
use crate::domain::{canonical_url, DealDetail, RawDeal};
use crate::fetch::FetchError;

#[derive(Debug, Default, Deserialize)]
struct FeedFile {
    #[serde(default)]
    listings: Vec<ListingRecord>,
    #[serde(default)]
    details: HashMap<String, DealDetail>,
    #[serde(default)]
    prices: HashMap<String, f64>,
}

#[derive(Debug, Clone)]
pub struct FileSource {
    name: String,
    path: PathBuf,
}

impl FileSource {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<FeedFile, FetchError> {
        let content = std::fs::read_to_string(&self.path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                FetchError::NotFound(format!("{} does not exist", self.path.display()))
            } else {
                FetchError::NetworkUnreachable(format!("{}: {e}", self.path.display()))
            }
        })?;
        serde_json::from_str(&content).map_err(|e| {
            FetchError::ResponseFormatChanged(format!("{}: {e}", self.path.display()))
        })
    }
}

impl SourceFetcher for FileSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            listing: true,
            detail: true,
            price_lookup: true,
        }
    }

    fn fetch_listing(&self, _query: &QueryParams) -> Result<Vec<RawDeal>, FetchError> {
        let feed = self.load()?;
        Ok(feed
            .listings
            .into_iter()
            .map(|record| record.into_deal(&self.name))
            .collect())
    }

    fn fetch_detail(&self, url: &str) -> Result<DealDetail, FetchError> {
        let key = canonical_url(url);
        self.load()?
            .details
            .into_iter()
            .find(|(u, _)| canonical_url(u) == key)
            .map(|(_, detail)| detail)
            .ok_or_else(|| FetchError::NotFound(format!("no detail for {url}")))
    }

    fn fetch_component_price(&self, name: &str) -> Result<f64, FetchError> {
        self.load()?
            .prices
            .remove(name)
            .ok_or_else(|| FetchError::NotFound(format!("no price for {name}")))
    }

    /// Only deals whose listing left components unclassified need a detail.
    fn needs_detail(&self, deal: &RawDeal) -> bool {
        deal.components.is_empty()
            || deal
                .components
                .iter()
                .any(|c| c.category == crate::domain::ComponentCategory::Unknown)
    }
}
