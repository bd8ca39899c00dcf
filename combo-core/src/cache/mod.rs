//! Tiered cache with per-tier freshness rules

pub mod entry;
pub mod store;
pub mod tier;

pub use entry::{CacheEntry, CachedValue};
pub use store::{CacheError, CacheOptions, CacheStore, ClearScope, TierStatus};
pub use tier::{CacheTier, TierPolicy};
