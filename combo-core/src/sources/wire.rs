//! JSON shapes shared by the HTTP and file sources.

use chrono::Utc;
use serde::Deserialize;

use crate::domain::{Component, RawDeal};

/// One listed deal as a feed reports it.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ListingRecord {
    pub url: String,
    #[serde(default)]
    pub retailer: Option<String>,
    pub combo_price: f64,
    #[serde(default)]
    pub components: Vec<Component>,
    #[serde(default)]
    pub in_stock: Option<bool>,
}

impl ListingRecord {
    /// Convert into a deal, defaulting the retailer to the source name.
    pub fn into_deal(self, source: &str) -> RawDeal {
        RawDeal {
            url: self.url,
            retailer: self.retailer.unwrap_or_else(|| source.to_string()),
            combo_price: self.combo_price,
            components: self.components,
            scraped_at: Utc::now(),
            in_stock: self.in_stock.unwrap_or(true),
        }
    }
}

/// Response of a component price lookup.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct PriceRecord {
    pub price: Option<f64>,
}
