//! HTTP JSON feed source.
//!
//! Talks to a deal feed that exposes three endpoints:
//!
//! - listing: `GET {listing_url}?<query params>` returns an array of deals
//! - detail: `GET {detail_url}?url=<deal url>` returns a `DealDetail`
//! - price: `GET {price_url}?q=<component name>` returns `{ "price": number }`
//!
//! Only one request is made per call. Retries, backoff and the circuit
//! breaker live in the fetch coordinator; this type only classifies what
//! went wrong.

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::time::Duration;

use super::wire::{ListingRecord, PriceRecord};
use super::{Capabilities, QueryParams, SourceFetcher};
use crate::domain::{DealDetail, RawDeal};
use crate::fetch::FetchError;

/// Endpoints and client settings for an HTTP JSON source.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpJsonConfig {
    pub listing_url: String,
    pub detail_url: Option<String>,
    pub price_url: Option<String>,
    pub timeout: Duration,
    pub user_agent: String,
}

impl HttpJsonConfig {
    pub fn new(listing_url: impl Into<String>) -> Self {
        Self {
            listing_url: listing_url.into(),
            detail_url: None,
            price_url: None,
            timeout: Duration::from_secs(30),
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36".into(),
        }
    }
}

pub struct HttpJsonSource {
    name: String,
    config: HttpJsonConfig,
    client: reqwest::blocking::Client,
}

impl HttpJsonSource {
    pub fn new(name: impl Into<String>, config: HttpJsonConfig) -> reqwest::Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.as_str())
            .build()?;
        Ok(Self {
            name: name.into(),
            config,
            client,
        })
    }

    pub fn config(&self) -> &HttpJsonConfig {
        &self.config
    }

    fn get_json<T, Q>(&self, url: &str, query: &Q) -> Result<T, FetchError>
    where
        T: DeserializeOwned,
        Q: serde::Serialize + ?Sized,
    {
        let resp = self
            .client
            .get(url)
            .query(query)
            .send()
            .map_err(transport_error)?;

        let retry_after = resp
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        if let Some(err) = classify_status(resp.status(), retry_after.as_deref(), url) {
            return Err(err);
        }

        resp.json::<T>().map_err(|e| {
            if e.is_decode() {
                FetchError::ResponseFormatChanged(format!("failed to parse response from {url}: {e}"))
            } else {
                transport_error(e)
            }
        })
    }
}

/// Map a non-success HTTP status to a fetch error. `None` means success.
fn classify_status(status: StatusCode, retry_after: Option<&str>, url: &str) -> Option<FetchError> {
    if status.is_success() {
        return None;
    }
    Some(match status {
        StatusCode::FORBIDDEN => FetchError::Blocked(format!("HTTP 403 from {url}")),
        StatusCode::TOO_MANY_REQUESTS => FetchError::RateLimited {
            retry_after_secs: retry_after
                .and_then(|v| v.trim().parse::<u64>().ok())
                .unwrap_or(60),
        },
        StatusCode::NOT_FOUND => FetchError::NotFound(url.to_string()),
        other => FetchError::HttpStatus {
            status: other.as_u16(),
        },
    })
}

fn transport_error(e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout(e.to_string())
    } else {
        FetchError::NetworkUnreachable(e.to_string())
    }
}

impl SourceFetcher for HttpJsonSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            listing: !self.config.listing_url.is_empty(),
            detail: self.config.detail_url.is_some(),
            price_lookup: self.config.price_url.is_some(),
        }
    }

    fn fetch_listing(&self, query: &QueryParams) -> Result<Vec<RawDeal>, FetchError> {
        let records: Vec<ListingRecord> = self.get_json(&self.config.listing_url, query)?;
        Ok(records
            .into_iter()
            .map(|record| record.into_deal(&self.name))
            .collect())
    }

    fn fetch_detail(&self, url: &str) -> Result<DealDetail, FetchError> {
        let endpoint = self.config.detail_url.as_deref().ok_or(FetchError::Unsupported {
            operation: "detail fetch",
        })?;
        self.get_json(endpoint, &[("url", url)])
    }

    fn fetch_component_price(&self, name: &str) -> Result<f64, FetchError> {
        let endpoint = self.config.price_url.as_deref().ok_or(FetchError::Unsupported {
            operation: "component price lookup",
        })?;
        let record: PriceRecord = self.get_json(endpoint, &[("q", name)])?;
        record
            .price
            .ok_or_else(|| FetchError::NotFound(format!("no price listed for {name}")))
    }
}
