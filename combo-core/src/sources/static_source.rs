//! In-memory source with scripted responses and call counters.
//!
//! Used by tests and demos to drive the orchestrator without a network.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use super::{Capabilities, QueryParams, SourceFetcher};
use crate::domain::{canonical_url, DealDetail, RawDeal};
use crate::fetch::FetchError;

/// Snapshot of how often each operation was invoked.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub listing: usize,
    pub detail: HashMap<String, usize>,
    pub price: HashMap<String, usize>,
}

impl CallCounts {
    pub fn detail_total(&self) -> usize {
        self.detail.values().sum()
    }

    pub fn price_total(&self) -> usize {
        self.price.values().sum()
    }

    pub fn detail_for(&self, url: &str) -> usize {
        self.detail.get(&canonical_url(url)).copied().unwrap_or(0)
    }

    pub fn price_for(&self, name: &str) -> usize {
        self.price.get(name).copied().unwrap_or(0)
    }
}

pub struct StaticSource {
    name: String,
    capabilities: Capabilities,
    deals: Vec<RawDeal>,
    details: HashMap<String, DealDetail>,
    prices: HashMap<String, f64>,
    /// Errors returned by the next listing calls, in order.
    scripted_listing_errors: Mutex<VecDeque<FetchError>>,
    listing_error: Option<FetchError>,
    detail_error: Option<FetchError>,
    price_error: Option<FetchError>,
    latency: Duration,
    listing_calls: AtomicUsize,
    detail_calls: Mutex<HashMap<String, usize>>,
    price_calls: Mutex<HashMap<String, usize>>,
}

impl StaticSource {
    /// A listing-only source with no deals.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            capabilities: Capabilities {
                listing: true,
                detail: false,
                price_lookup: false,
            },
            deals: Vec::new(),
            details: HashMap::new(),
            prices: HashMap::new(),
            scripted_listing_errors: Mutex::new(VecDeque::new()),
            listing_error: None,
            detail_error: None,
            price_error: None,
            latency: Duration::ZERO,
            listing_calls: AtomicUsize::new(0),
            detail_calls: Mutex::new(HashMap::new()),
            price_calls: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_deals(mut self, deals: Vec<RawDeal>) -> Self {
        self.deals = deals;
        self
    }

    /// Serve `detail` for `url`; enables the detail capability.
    pub fn with_detail(mut self, url: &str, detail: DealDetail) -> Self {
        self.capabilities.detail = true;
        self.details.insert(canonical_url(url), detail);
        self
    }

    pub fn supports_detail(mut self) -> Self {
        self.capabilities.detail = true;
        self
    }

    /// Serve `price` for component `name`; enables price lookup.
    pub fn with_price(mut self, name: impl Into<String>, price: f64) -> Self {
        self.capabilities.price_lookup = true;
        self.prices.insert(name.into(), price);
        self
    }

    /// Price lookups only, no listing.
    pub fn price_only(mut self) -> Self {
        self.capabilities.listing = false;
        self.capabilities.price_lookup = true;
        self
    }

    /// Fail the next `times` listing calls with `error`, then behave normally.
    pub fn failing_listing_times(self, times: usize, error: FetchError) -> Self {
        {
            let mut queue = self
                .scripted_listing_errors
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            queue.extend(std::iter::repeat(error).take(times));
        }
        self
    }

    /// Fail every listing call with `error`.
    pub fn failing_listing(mut self, error: FetchError) -> Self {
        self.listing_error = Some(error);
        self
    }

    pub fn failing_detail(mut self, error: FetchError) -> Self {
        self.capabilities.detail = true;
        self.detail_error = Some(error);
        self
    }

    pub fn failing_price(mut self, error: FetchError) -> Self {
        self.capabilities.price_lookup = true;
        self.price_error = Some(error);
        self
    }

    /// Sleep this long inside every detail and price call.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn calls(&self) -> CallCounts {
        CallCounts {
            listing: self.listing_calls.load(Ordering::SeqCst),
            detail: self
                .detail_calls
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone(),
            price: self
                .price_calls
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone(),
        }
    }

    fn bump(counter: &Mutex<HashMap<String, usize>>, key: &str) {
        let mut map = counter.lock().unwrap_or_else(PoisonError::into_inner);
        *map.entry(key.to_string()).or_insert(0) += 1;
    }

    fn pause(&self) {
        if !self.latency.is_zero() {
            std::thread::sleep(self.latency);
        }
    }
}

impl SourceFetcher for StaticSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    fn fetch_listing(&self, _query: &QueryParams) -> Result<Vec<RawDeal>, FetchError> {
        self.listing_calls.fetch_add(1, Ordering::SeqCst);
        let scripted = self
            .scripted_listing_errors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
        if let Some(err) = scripted.or_else(|| self.listing_error.clone()) {
            return Err(err);
        }
        Ok(self.deals.clone())
    }

    fn fetch_detail(&self, url: &str) -> Result<DealDetail, FetchError> {
        let key = canonical_url(url);
        Self::bump(&self.detail_calls, &key);
        self.pause();
        if let Some(err) = &self.detail_error {
            return Err(err.clone());
        }
        self.details
            .get(&key)
            .cloned()
            .ok_or_else(|| FetchError::NotFound(format!("no detail for {url}")))
    }

    fn fetch_component_price(&self, name: &str) -> Result<f64, FetchError> {
        Self::bump(&self.price_calls, name);
        self.pause();
        if let Some(err) = &self.price_error {
            return Err(err.clone());
        }
        self.prices
            .get(name)
            .copied()
            .ok_or_else(|| FetchError::NotFound(format!("no price for {name}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Component, ComponentCategory};

    #[test]
    fn scripted_failures_then_success() {
        let deal = RawDeal::new(
            "https://example.com/combo/1",
            "example",
            599.0,
            vec![Component::new("Ryzen 5 9600X", ComponentCategory::Cpu)],
        );
        let source = StaticSource::new("example")
            .with_deals(vec![deal])
            .failing_listing_times(2, FetchError::Timeout("slow".into()));

        let q = QueryParams::new();
        assert!(source.fetch_listing(&q).is_err());
        assert!(source.fetch_listing(&q).is_err());
        assert_eq!(source.fetch_listing(&q).map(|d| d.len()), Ok(1));
        assert_eq!(source.calls().listing, 3);
    }

    #[test]
    fn counts_detail_and_price_calls_per_key() {
        let source = StaticSource::new("example")
            .with_detail("https://example.com/combo/1", DealDetail {
                components: Vec::new(),
                combo_type: "CPU+MB+RAM".into(),
                cpu_name: String::new(),
                ram_specs: Default::default(),
            })
            .with_price("Ryzen 5 9600X", 199.0);

        assert!(source.fetch_detail("https://example.com/combo/1/").is_ok());
        assert!(source.fetch_detail("https://example.com/combo/2").is_err());
        assert_eq!(source.fetch_component_price("Ryzen 5 9600X"), Ok(199.0));

        let calls = source.calls();
        assert_eq!(calls.detail_for("https://example.com/combo/1"), 1);
        assert_eq!(calls.detail_total(), 2);
        assert_eq!(calls.price_for("Ryzen 5 9600X"), 1);
    }

    #[test]
    fn default_operations_are_unsupported() {
        struct ListingOnly;
        impl SourceFetcher for ListingOnly {
            fn name(&self) -> &str {
                "listing-only"
            }
            fn capabilities(&self) -> Capabilities {
                Capabilities {
                    listing: true,
                    ..Capabilities::default()
                }
            }
            fn fetch_listing(&self, _: &QueryParams) -> Result<Vec<RawDeal>, FetchError> {
                Ok(Vec::new())
            }
        }

        let source = ListingOnly;
        assert!(matches!(source.fetch_detail("x"), Err(FetchError::Unsupported { .. })));
        assert!(matches!(
            source.fetch_component_price("x"),
            Err(FetchError::Unsupported { .. })
        ));
    }
}
