//! Cache entries and their on-disk records.
//!
//! Each tier persists as a JSON object keyed by the entry key:
//! - `AmazonPrice`: `{ "price": f64, "timestamp": RFC 3339 }`
//! - `DealDetail`: `{ "components", "combo_type", "cpu_name", "ram_specs", "timestamp"? }`
//! - `DealPrice`: `{ "combo_price": f64, "timestamp": RFC 3339 }`

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::tier::CacheTier;
use crate::domain::DealDetail;

/// Payload stored in a cache tier.
#[derive(Debug, Clone, PartialEq)]
pub enum CachedValue {
    /// Individual component price (`AmazonPrice` tier).
    Price(f64),
    /// Detail-page metadata (`DealDetail` tier).
    Detail(DealDetail),
    /// Combo price seen this run (`DealPrice` tier).
    ComboPrice(f64),
}

impl CachedValue {
    /// The tier this value belongs to.
    pub fn tier(&self) -> CacheTier {
        match self {
            CachedValue::Price(_) => CacheTier::AmazonPrice,
            CachedValue::Detail(_) => CacheTier::DealDetail,
            CachedValue::ComboPrice(_) => CacheTier::DealPrice,
        }
    }

    pub fn as_price(&self) -> Option<f64> {
        match self {
            CachedValue::Price(p) => Some(*p),
            _ => None,
        }
    }

    pub fn as_detail(&self) -> Option<&DealDetail> {
        match self {
            CachedValue::Detail(d) => Some(d),
            _ => None,
        }
    }

    pub fn into_detail(self) -> Option<DealDetail> {
        match self {
            CachedValue::Detail(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_combo_price(&self) -> Option<f64> {
        match self {
            CachedValue::ComboPrice(p) => Some(*p),
            _ => None,
        }
    }
}

/// A stored value with its write timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub key: String,
    pub value: CachedValue,
    pub stored_at: DateTime<Utc>,
    /// Cache epoch the entry was written in. Entries loaded from disk are 0.
    pub epoch: u64,
}

#[derive(Debug, Serialize, Deserialize)]
struct PriceRecord {
    price: f64,
    timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ComboPriceRecord {
    combo_price: f64,
    timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
struct DetailRecord {
    #[serde(flatten)]
    detail: DealDetail,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    timestamp: Option<DateTime<Utc>>,
}

pub(crate) type TierMap = BTreeMap<String, CacheEntry>;

/// Serialize one tier to its JSON file contents.
pub(crate) fn encode_tier(tier: CacheTier, entries: &TierMap) -> serde_json::Result<String> {
    match tier {
        CacheTier::AmazonPrice => {
            let records: BTreeMap<&str, PriceRecord> = entries
                .iter()
                .filter_map(|(k, e)| {
                    e.value.as_price().map(|price| {
                        (
                            k.as_str(),
                            PriceRecord {
                                price,
                                timestamp: e.stored_at,
                            },
                        )
                    })
                })
                .collect();
            serde_json::to_string_pretty(&records)
        }
        CacheTier::DealDetail => {
            let records: BTreeMap<&str, DetailRecord> = entries
                .iter()
                .filter_map(|(k, e)| {
                    e.value.as_detail().map(|detail| {
                        (
                            k.as_str(),
                            DetailRecord {
                                detail: detail.clone(),
                                timestamp: Some(e.stored_at),
                            },
                        )
                    })
                })
                .collect();
            serde_json::to_string_pretty(&records)
        }
        CacheTier::DealPrice => {
            let records: BTreeMap<&str, ComboPriceRecord> = entries
                .iter()
                .filter_map(|(k, e)| {
                    e.value.as_combo_price().map(|combo_price| {
                        (
                            k.as_str(),
                            ComboPriceRecord {
                                combo_price,
                                timestamp: e.stored_at,
                            },
                        )
                    })
                })
                .collect();
            serde_json::to_string_pretty(&records)
        }
    }
}

/// Parse one tier's JSON file contents. Loaded entries get epoch 0.
pub(crate) fn decode_tier(tier: CacheTier, content: &str) -> serde_json::Result<TierMap> {
    let entry = |key: String, value: CachedValue, stored_at: DateTime<Utc>| {
        (
            key.clone(),
            CacheEntry {
                key,
                value,
                stored_at,
                epoch: 0,
            },
        )
    };

    let map = match tier {
        CacheTier::AmazonPrice => serde_json::from_str::<BTreeMap<String, PriceRecord>>(content)?
            .into_iter()
            .map(|(k, r)| entry(k, CachedValue::Price(r.price), r.timestamp))
            .collect(),
        CacheTier::DealDetail => serde_json::from_str::<BTreeMap<String, DetailRecord>>(content)?
            .into_iter()
            .map(|(k, r)| {
                entry(
                    k,
                    CachedValue::Detail(r.detail),
                    r.timestamp.unwrap_or_default(),
                )
            })
            .collect(),
        CacheTier::DealPrice => {
            serde_json::from_str::<BTreeMap<String, ComboPriceRecord>>(content)?
                .into_iter()
                .map(|(k, r)| entry(k, CachedValue::ComboPrice(r.combo_price), r.timestamp))
                .collect()
        }
    };
    Ok(map)
}
