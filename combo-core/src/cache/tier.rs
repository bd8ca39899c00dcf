//! Cache tiers and their freshness policies.

use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One of the three independent cache namespaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheTier {
    /// Individual component prices, keyed by component name.
    AmazonPrice,
    /// Detail-page metadata, keyed by deal URL.
    DealDetail,
    /// Current combo price, keyed by deal URL.
    DealPrice,
}

impl CacheTier {
    pub const ALL: [CacheTier; 3] = [
        CacheTier::AmazonPrice,
        CacheTier::DealDetail,
        CacheTier::DealPrice,
    ];

    /// Backing file name inside the cache directory.
    pub fn file_name(self) -> &'static str {
        match self {
            CacheTier::AmazonPrice => "amazon_prices.json",
            CacheTier::DealDetail => "deal_details.json",
            CacheTier::DealPrice => "deal_prices.json",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CacheTier::AmazonPrice => "amazon_price",
            CacheTier::DealDetail => "deal_detail",
            CacheTier::DealPrice => "deal_price",
        }
    }

    pub(crate) fn index(self) -> usize {
        match self {
            CacheTier::AmazonPrice => 0,
            CacheTier::DealDetail => 1,
            CacheTier::DealPrice => 2,
        }
    }

    /// Freshness policy for this tier given the configured price TTL.
    pub fn policy(self, price_ttl: Duration) -> TierPolicy {
        match self {
            CacheTier::AmazonPrice => TierPolicy::MaxAge(price_ttl),
            CacheTier::DealDetail => TierPolicy::Immutable,
            CacheTier::DealPrice => TierPolicy::CurrentEpoch,
        }
    }
}

impl fmt::Display for CacheTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CacheTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "amazon_price" | "amazon_prices" | "price" | "prices" => Ok(CacheTier::AmazonPrice),
            "deal_detail" | "deal_details" | "detail" | "details" => Ok(CacheTier::DealDetail),
            "deal_price" | "deal_prices" => Ok(CacheTier::DealPrice),
            other => Err(format!(
                "unknown cache tier '{other}'. Valid: amazon_price, deal_detail, deal_price"
            )),
        }
    }
}

/// How a tier decides whether an entry can be used without re-fetching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TierPolicy {
    /// Valid while `now - stored_at < max_age`.
    MaxAge(Duration),
    /// Valid until explicitly cleared.
    Immutable,
    /// Valid only for entries written during the current cache epoch.
    CurrentEpoch,
}
