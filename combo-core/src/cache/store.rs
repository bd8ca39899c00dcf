//! Tiered JSON cache store.
//!
//! Layout: `{cache_dir}/{amazon_prices,deal_details,deal_prices}.json`
//!
//! Features:
//! - Lazy, idempotent load on first access
//! - Durable writes (write .tmp, fsync, rename into place) after every mutation
//! - Quarantine for corrupt tier files ({file}.quarantined)
//! - Per-tier freshness policy, plus a read bypass for `--fresh` runs

use chrono::{DateTime, Duration, Utc};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, OnceLock, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::entry::{decode_tier, encode_tier, CacheEntry, CachedValue, TierMap};
use super::tier::{CacheTier, TierPolicy};

/// Errors from cache persistence.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache directory {path} is not writable: {source}")]
    Unwritable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cache I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cache serialization error for tier {tier}: {source}")]
    Serialize {
        tier: CacheTier,
        #[source]
        source: serde_json::Error,
    },

    #[error("value for tier {actual} cannot be stored in tier {expected}")]
    TierMismatch {
        expected: CacheTier,
        actual: CacheTier,
    },
}

/// Options controlling freshness and read behaviour.
#[derive(Debug, Clone)]
pub struct CacheOptions {
    /// Max age of an `AmazonPrice` entry.
    pub price_ttl: Duration,
    /// Hide everything not written in the current epoch (`--fresh`).
    pub bypass_reads: bool,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            price_ttl: Duration::hours(8),
            bypass_reads: false,
        }
    }
}

/// Which tiers a clear operation empties.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearScope {
    Tier(CacheTier),
    All,
}

/// Entry counts for one tier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TierStatus {
    pub tier: CacheTier,
    pub entries: usize,
    pub fresh: usize,
    pub file_bytes: u64,
}

#[derive(Debug, Default)]
struct Tiers {
    maps: [TierMap; 3],
}

impl Tiers {
    fn get(&self, tier: CacheTier) -> &TierMap {
        &self.maps[tier.index()]
    }

    fn get_mut(&mut self, tier: CacheTier) -> &mut TierMap {
        &mut self.maps[tier.index()]
    }
}

/// The tiered cache.
///
/// Shared across threads behind an `Arc`. Reads take a shared lock, writes an
/// exclusive one; flushes are serialized so the file on disk always holds a
/// complete snapshot.
#[derive(Debug)]
pub struct CacheStore {
    cache_dir: PathBuf,
    options: CacheOptions,
    tiers: OnceLock<RwLock<Tiers>>,
    flush_lock: Mutex<()>,
    epoch: AtomicU64,
}

impl CacheStore {
    /// Open a cache rooted at `cache_dir`.
    ///
    /// Creates the directory and checks it is writable. Tier files are not
    /// read until the first lookup or store.
    pub fn open(cache_dir: impl Into<PathBuf>, options: CacheOptions) -> Result<Self, CacheError> {
        let cache_dir = cache_dir.into();
        let unwritable = |source| CacheError::Unwritable {
            path: cache_dir.clone(),
            source,
        };

        fs::create_dir_all(&cache_dir).map_err(unwritable)?;
        let probe = cache_dir.join(".write_probe");
        fs::write(&probe, b"ok").map_err(unwritable)?;
        let _ = fs::remove_file(&probe);

        Ok(Self {
            cache_dir,
            options,
            tiers: OnceLock::new(),
            flush_lock: Mutex::new(()),
            epoch: AtomicU64::new(1),
        })
    }

    /// Root directory of the cache.
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    pub fn options(&self) -> &CacheOptions {
        &self.options
    }

    /// Path of a tier's backing file.
    pub fn tier_path(&self, tier: CacheTier) -> PathBuf {
        self.cache_dir.join(tier.file_name())
    }

    /// Start a new cache epoch (one pipeline run). Returns the new epoch.
    pub fn begin_epoch(&self) -> u64 {
        self.epoch.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn current_epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }

    /// Look up an entry regardless of freshness.
    ///
    /// With `bypass_reads` set, only entries written in the current epoch are
    /// visible.
    pub fn lookup(&self, tier: CacheTier, key: &str) -> Option<CacheEntry> {
        let tiers = self.read();
        let entry = tiers.get(tier).get(key)?;
        if self.options.bypass_reads && entry.epoch != self.current_epoch() {
            return None;
        }
        Some(entry.clone())
    }

    /// Look up an entry and return it only if it is fresh at `now`.
    pub fn lookup_fresh(&self, tier: CacheTier, key: &str, now: DateTime<Utc>) -> Option<CacheEntry> {
        self.lookup(tier, key)
            .filter(|entry| self.is_fresh(tier, entry, now))
    }

    /// Whether `entry` can be used without re-fetching.
    pub fn is_fresh(&self, tier: CacheTier, entry: &CacheEntry, now: DateTime<Utc>) -> bool {
        match tier.policy(self.options.price_ttl) {
            TierPolicy::MaxAge(ttl) => now - entry.stored_at < ttl,
            TierPolicy::Immutable => true,
            TierPolicy::CurrentEpoch => entry.epoch == self.current_epoch(),
        }
    }

    /// Store a value stamped with the current time, then flush the tier.
    pub fn store(
        &self,
        tier: CacheTier,
        key: &str,
        value: CachedValue,
    ) -> Result<CacheEntry, CacheError> {
        self.store_at(tier, key, value, Utc::now())
    }

    /// Store a value with an explicit timestamp, then flush the tier.
    ///
    /// Overwrites any existing entry for `(tier, key)`.
    pub fn store_at(
        &self,
        tier: CacheTier,
        key: &str,
        value: CachedValue,
        stored_at: DateTime<Utc>,
    ) -> Result<CacheEntry, CacheError> {
        if value.tier() != tier {
            return Err(CacheError::TierMismatch {
                expected: tier,
                actual: value.tier(),
            });
        }

        let entry = CacheEntry {
            key: key.to_string(),
            value,
            stored_at,
            epoch: self.current_epoch(),
        };
        self.write().get_mut(tier).insert(key.to_string(), entry.clone());
        debug!(tier = %tier, key, "cache store");

        self.flush(tier)?;
        Ok(entry)
    }

    /// Empty one tier or all tiers, flushing the result.
    pub fn clear(&self, scope: ClearScope) -> Result<(), CacheError> {
        let tiers: Vec<CacheTier> = match scope {
            ClearScope::Tier(tier) => vec![tier],
            ClearScope::All => CacheTier::ALL.to_vec(),
        };

        for tier in tiers {
            let removed = {
                let mut guard = self.write();
                let map = guard.get_mut(tier);
                let n = map.len();
                map.clear();
                n
            };
            self.flush(tier)?;
            info!(tier = %tier, removed, "cache tier cleared");
        }
        Ok(())
    }

    /// Number of entries in a tier (ignoring freshness and read bypass).
    pub fn len(&self, tier: CacheTier) -> usize {
        self.read().get(tier).len()
    }

    pub fn is_empty(&self) -> bool {
        let tiers = self.read();
        CacheTier::ALL.iter().all(|t| tiers.get(*t).is_empty())
    }

    /// Entry and fresh counts for every tier.
    pub fn status(&self, now: DateTime<Utc>) -> Vec<TierStatus> {
        let tiers = self.read();
        CacheTier::ALL
            .iter()
            .map(|&tier| {
                let map = tiers.get(tier);
                TierStatus {
                    tier,
                    entries: map.len(),
                    fresh: map.values().filter(|e| self.is_fresh(tier, e, now)).count(),
                    file_bytes: fs::metadata(self.tier_path(tier))
                        .map(|m| m.len())
                        .unwrap_or(0),
                }
            })
            .collect()
    }

    // ── Internals ───────────────────────────────────────────────────

    fn tiers(&self) -> &RwLock<Tiers> {
        self.tiers.get_or_init(|| RwLock::new(self.load_all()))
    }

    fn read(&self) -> RwLockReadGuard<'_, Tiers> {
        self.tiers().read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Tiers> {
        self.tiers().write().unwrap_or_else(PoisonError::into_inner)
    }

    fn load_all(&self) -> Tiers {
        let mut tiers = Tiers::default();
        for tier in CacheTier::ALL {
            *tiers.get_mut(tier) = self.load_tier(tier);
        }
        info!(
            prices = tiers.get(CacheTier::AmazonPrice).len(),
            details = tiers.get(CacheTier::DealDetail).len(),
            deal_prices = tiers.get(CacheTier::DealPrice).len(),
            dir = %self.cache_dir.display(),
            "cache loaded"
        );
        tiers
    }

    /// Read one tier file. Missing means empty; unreadable or malformed
    /// content is quarantined and treated as empty.
    fn load_tier(&self, tier: CacheTier) -> TierMap {
        let path = self.tier_path(tier);
        if !path.exists() {
            return TierMap::new();
        }

        let parsed = fs::read_to_string(&path)
            .map_err(|e| e.to_string())
            .and_then(|content| decode_tier(tier, &content).map_err(|e| e.to_string()));

        match parsed {
            Ok(map) => map,
            Err(reason) => {
                let quarantine = path.with_extension("json.quarantined");
                warn!(
                    tier = %tier,
                    path = %path.display(),
                    error = %reason,
                    "corrupt cache file, quarantining and starting empty"
                );
                let _ = fs::rename(&path, &quarantine);
                TierMap::new()
            }
        }
    }

    /// Persist one tier atomically.
    ///
    /// The snapshot is taken while holding the flush lock, so the last flush
    /// to finish always carries every store that completed before it.
    fn flush(&self, tier: CacheTier) -> Result<(), CacheError> {
        let _flush = self.flush_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let json = {
            let tiers = self.read();
            encode_tier(tier, tiers.get(tier))
                .map_err(|source| CacheError::Serialize { tier, source })?
        };

        let path = self.tier_path(tier);
        let tmp_path = path.with_extension("json.tmp");
        let io_err = |source| CacheError::Io {
            path: tmp_path.clone(),
            source,
        };

        let mut file = fs::File::create(&tmp_path).map_err(io_err)?;
        file.write_all(json.as_bytes()).map_err(io_err)?;
        file.sync_all().map_err(io_err)?;
        drop(file);

        fs::rename(&tmp_path, &path).map_err(|source| {
            let _ = fs::remove_file(&tmp_path);
            CacheError::Io {
                path: path.clone(),
                source,
            }
        })?;
        Ok(())
    }
}
