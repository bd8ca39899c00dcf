use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::component::{Component, ComponentCategory};

/// A combo deal exactly as a listing fetch reported it.
///
/// Raw deals are never mutated after a listing fetch produces them; the
/// orchestrator builds new values when it merges detail data and prices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawDeal {
    /// Canonical identity used for deduplication across sources.
    pub url: String,
    pub retailer: String,
    pub combo_price: f64,
    pub components: Vec<Component>,
    pub scraped_at: DateTime<Utc>,
    #[serde(default = "default_in_stock")]
    pub in_stock: bool,
}

fn default_in_stock() -> bool {
    true
}

impl RawDeal {
    pub fn new(
        url: impl Into<String>,
        retailer: impl Into<String>,
        combo_price: f64,
        components: Vec<Component>,
    ) -> Self {
        Self {
            url: url.into(),
            retailer: retailer.into(),
            combo_price,
            components,
            scraped_at: Utc::now(),
            in_stock: true,
        }
    }

    /// First component of the given category, if any.
    pub fn component(&self, category: ComponentCategory) -> Option<&Component> {
        self.components.iter().find(|c| c.category == category)
    }

    /// Canonical form of this deal's URL.
    pub fn identity(&self) -> String {
        canonical_url(&self.url)
    }
}

/// Normalize a deal URL into its canonical identity.
///
/// Trims whitespace, drops any `#fragment`, lowercases the scheme and host,
/// and removes a trailing slash from the path. The query string is kept
/// because retailers encode the product in it.
pub fn canonical_url(url: &str) -> String {
    let trimmed = url.trim();
    let without_fragment = trimmed.split('#').next().unwrap_or(trimmed);

    let (scheme, rest) = match without_fragment.split_once("://") {
        Some((scheme, rest)) => (Some(scheme.to_ascii_lowercase()), rest),
        None => (None, without_fragment),
    };

    let (before_query, query) = match rest.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (rest, None),
    };

    let (host, path) = match before_query.find('/') {
        Some(idx) => (&before_query[..idx], &before_query[idx..]),
        None => (before_query, ""),
    };
    let path = path.trim_end_matches('/');

    let mut out = String::with_capacity(without_fragment.len());
    if let Some(scheme) = scheme {
        out.push_str(&scheme);
        out.push_str("://");
    }
    out.push_str(&host.to_ascii_lowercase());
    out.push_str(path);
    if let Some(query) = query {
        out.push('?');
        out.push_str(query);
    }
    out
}

/// Bundle shape, derived from which categories a deal contains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComboType {
    #[serde(rename = "CPU+MB+RAM")]
    CpuBoardRam,
    #[serde(rename = "CPU+RAM")]
    CpuRam,
    #[serde(rename = "MB+RAM")]
    BoardRam,
    #[serde(rename = "CPU+MB")]
    CpuBoard,
    #[serde(rename = "Other")]
    Other,
}

impl ComboType {
    pub fn from_components(components: &[Component]) -> Self {
        let has = |cat| components.iter().any(|c| c.category == cat);
        let cpu = has(ComponentCategory::Cpu);
        let board = has(ComponentCategory::Motherboard);
        let ram = has(ComponentCategory::Ram);
        match (cpu, board, ram) {
            (true, true, true) => ComboType::CpuBoardRam,
            (true, false, true) => ComboType::CpuRam,
            (false, true, true) => ComboType::BoardRam,
            (true, true, false) => ComboType::CpuBoard,
            _ => ComboType::Other,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ComboType::CpuBoardRam => "CPU+MB+RAM",
            ComboType::CpuRam => "CPU+RAM",
            ComboType::BoardRam => "MB+RAM",
            ComboType::CpuBoard => "CPU+MB",
            ComboType::Other => "Other",
        }
    }
}

impl fmt::Display for ComboType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
