//! Run orchestration: listing, dedup, cache-aware detail and price fetches.
//!
//! One call to [`Orchestrator::run`] is one cache epoch. Within a run:
//!
//! 1. every listing source runs each of its queries through the coordinator
//! 2. deals are merged in registry order and deduplicated by canonical URL
//! 3. combo prices are recorded in the `DealPrice` tier
//! 4. detail data comes from the `DealDetail` tier or a detail fetch
//! 5. missing component prices come from the `AmazonPrice` tier or the
//!    price sources, after a batch freshness check
//!
//! Every cache-backed fetch goes through a run memo, so a key is fetched at
//! most once per run no matter how many deals share it.

pub mod dedup;
mod run_memo;

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::cache::{CacheStore, CacheTier, CachedValue};
use crate::domain::{Component, DealDetail, RawDeal};
use crate::fetch::{FetchCoordinator, FetchOutcome, FetchStats};
use crate::sources::{QueryParams, SourceEntry, SourceRegistry};

pub use dedup::{dedup_by_url, dedup_tagged, SeenDeals};
use run_memo::RunMemo;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrchestratorOptions {
    /// Run sources, detail fetches and price fetches on the rayon pool.
    pub concurrent: bool,
}

impl Default for OrchestratorOptions {
    fn default() -> Self {
        Self { concurrent: true }
    }
}

/// A deduplicated deal with everything the run learned about it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssembledDeal {
    pub deal: RawDeal,
    pub detail: Option<DealDetail>,
    /// Name of the source whose listing won dedup.
    pub source: String,
}

/// Result of one listing query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryOutcome {
    pub query: QueryParams,
    pub deals: usize,
    pub error: Option<String>,
    /// The circuit breaker refused the request.
    pub skipped: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceStatus {
    Ok,
    Partial,
    Failed,
    Skipped,
}

/// Per-source listing summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceReport {
    pub source: String,
    pub queries: Vec<QueryOutcome>,
    /// Deals returned by the source before dedup.
    pub deals_listed: usize,
    /// Deals that survived dedup.
    pub deals_kept: usize,
}

impl SourceReport {
    pub fn status(&self) -> SourceStatus {
        let failed = self.queries.iter().filter(|q| q.error.is_some()).count();
        if failed == 0 {
            SourceStatus::Ok
        } else if failed < self.queries.len() {
            SourceStatus::Partial
        } else if self.queries.iter().all(|q| q.skipped) {
            SourceStatus::Skipped
        } else {
            SourceStatus::Failed
        }
    }

    /// First recorded error, if any.
    pub fn failure(&self) -> Option<&str> {
        self.queries.iter().find_map(|q| q.error.as_deref())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    pub deals_listed: usize,
    pub duplicates_dropped: usize,
    pub deal_prices_reused: usize,
    pub detail_cache_hits: usize,
    pub detail_fetches: usize,
    pub detail_failures: usize,
    pub price_cache_hits: usize,
    pub price_fetches: usize,
    pub price_failures: usize,
    pub fetch: FetchStats,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub epoch: u64,
    pub deals: Vec<AssembledDeal>,
    pub sources: Vec<SourceReport>,
    pub stats: RunStats,
}

impl RunReport {
    pub fn all_sources_failed(&self) -> bool {
        !self.sources.is_empty()
            && self
                .sources
                .iter()
                .all(|s| matches!(s.status(), SourceStatus::Failed | SourceStatus::Skipped))
    }
}

#[derive(Debug, Default)]
struct Counters {
    deal_prices_reused: AtomicUsize,
    detail_cache_hits: AtomicUsize,
    detail_fetches: AtomicUsize,
    detail_failures: AtomicUsize,
    price_cache_hits: AtomicUsize,
    price_fetches: AtomicUsize,
    price_failures: AtomicUsize,
}

impl Counters {
    fn bump(counter: &AtomicUsize) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn get(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::Relaxed)
    }
}

/// State shared by every step of one run.
struct RunContext {
    coordinator: FetchCoordinator,
    memo: RunMemo,
    counters: Counters,
}

/// Drives one acquisition run over a registry and a shared cache.
pub struct Orchestrator {
    cache: Arc<CacheStore>,
    registry: Arc<SourceRegistry>,
    options: OrchestratorOptions,
}

impl Orchestrator {
    pub fn new(cache: Arc<CacheStore>, registry: Arc<SourceRegistry>, options: OrchestratorOptions) -> Self {
        Self {
            cache,
            registry,
            options,
        }
    }

    pub fn cache(&self) -> &Arc<CacheStore> {
        &self.cache
    }

    pub fn registry(&self) -> &Arc<SourceRegistry> {
        &self.registry
    }

    /// Run one pass in a new cache epoch. Never fails: source errors end up
    /// in the report.
    pub fn run(&self) -> RunReport {
        let epoch = self.cache.begin_epoch();
        self.run_pass(epoch)
    }

    /// Run another pass inside the current cache epoch, e.g. a retry after a
    /// source's breaker cooled down. Combo prices recorded by earlier passes
    /// of the epoch win over newly listed ones.
    pub fn resume(&self) -> RunReport {
        self.run_pass(self.cache.current_epoch())
    }

    fn run_pass(&self, epoch: u64) -> RunReport {
        let started_at = Utc::now();
        let ctx = RunContext {
            coordinator: FetchCoordinator::new(),
            memo: RunMemo::new(),
            counters: Counters::default(),
        };
        info!(
            epoch,
            sources = self.registry.len(),
            fresh = self.cache.options().bypass_reads,
            "run started"
        );

        // 1. Listings
        let listing_sources: Vec<&SourceEntry> = self.registry.listing_sources().collect();
        let listed = self.map_items(&listing_sources, |entry| self.list_source(entry, &ctx));

        // 2. Merge and dedup
        let mut sources = Vec::with_capacity(listed.len());
        let mut tagged: Vec<(String, RawDeal)> = Vec::new();
        for (report, deals) in listed {
            tagged.extend(deals.into_iter().map(|deal| (report.source.clone(), deal)));
            sources.push(report);
        }
        let deals_listed = tagged.len();
        let kept = dedup_tagged(tagged);
        for report in &mut sources {
            report.deals_kept = kept.iter().filter(|(source, _)| *source == report.source).count();
        }
        let duplicates_dropped = deals_listed - kept.len();
        debug!(deals_listed, kept = kept.len(), duplicates_dropped, "deduplicated listings");

        // 3. Combo prices
        let kept: Vec<(String, RawDeal)> = kept
            .into_iter()
            .map(|(source, deal)| (source, self.record_combo_price(deal, &ctx)))
            .collect();

        // 4. Details
        let assembled = self.map_items(&kept, |(source, deal)| self.assemble(source, deal, &ctx));

        // 5. Component prices
        let deals = self.fill_component_prices(assembled, &ctx);

        let c = &ctx.counters;
        let stats = RunStats {
            deals_listed,
            duplicates_dropped,
            deal_prices_reused: Counters::get(&c.deal_prices_reused),
            detail_cache_hits: Counters::get(&c.detail_cache_hits),
            detail_fetches: Counters::get(&c.detail_fetches),
            detail_failures: Counters::get(&c.detail_failures),
            price_cache_hits: Counters::get(&c.price_cache_hits),
            price_fetches: Counters::get(&c.price_fetches),
            price_failures: Counters::get(&c.price_failures),
            fetch: ctx.coordinator.stats(),
        };

        let report = RunReport {
            started_at,
            finished_at: Utc::now(),
            epoch,
            deals,
            sources,
            stats,
        };
        if report.all_sources_failed() {
            warn!("every listing source failed; returning an empty deal set");
        }
        info!(
            epoch,
            deals = report.deals.len(),
            requests = stats.fetch.requests,
            retries = stats.fetch.retries,
            "run finished"
        );
        report
    }

    fn list_source(&self, entry: &SourceEntry, ctx: &RunContext) -> (SourceReport, Vec<RawDeal>) {
        let name = entry.name();
        let mut queries = Vec::new();
        let mut deals = Vec::new();

        for query in entry.settings.effective_queries() {
            let key = describe_query(&query);
            let policy = entry.handle.retry_policy();
            let outcome = ctx
                .coordinator
                .execute(&entry.handle, &key, policy, |fetcher| fetcher.fetch_listing(&query));

            let (found, error, skipped) = match outcome {
                FetchOutcome::Success(found) => (found, None, false),
                FetchOutcome::Failure {
                    attempts,
                    last_error,
                    ..
                } => (
                    Vec::new(),
                    Some(format!("{last_error} (after {attempts} attempt(s))")),
                    false,
                ),
                FetchOutcome::SourceSkipped(reason) => (Vec::new(), Some(reason), true),
            };
            info!(source = name, query = %key, deals = found.len(), ok = error.is_none(), "listing finished");
            queries.push(QueryOutcome {
                query,
                deals: found.len(),
                error,
                skipped,
            });
            deals.extend(found);
        }

        let report = SourceReport {
            source: name.to_string(),
            queries,
            deals_listed: deals.len(),
            deals_kept: 0,
        };
        (report, deals)
    }

    /// Reuse a combo price recorded earlier this run, or record this one.
    fn record_combo_price(&self, deal: RawDeal, ctx: &RunContext) -> RawDeal {
        let tier = CacheTier::DealPrice;
        if let Some(price) = self
            .cache
            .lookup_fresh(tier, &deal.url, Utc::now())
            .and_then(|e| e.value.as_combo_price())
        {
            Counters::bump(&ctx.counters.deal_prices_reused);
            debug!(key = %deal.url, price, "reusing combo price from this run");
            return RawDeal {
                combo_price: price,
                ..deal
            };
        }
        if let Err(e) = self
            .cache
            .store(tier, &deal.url, CachedValue::ComboPrice(deal.combo_price))
        {
            warn!(tier = %tier, key = %deal.url, error = %e, "failed to record combo price");
        }
        deal
    }

    fn assemble(&self, source: &str, deal: &RawDeal, ctx: &RunContext) -> AssembledDeal {
        let detail = self
            .registry
            .find(source)
            .filter(|entry| {
                let fetcher = entry.handle.fetcher();
                fetcher.capabilities().detail && fetcher.needs_detail(deal)
            })
            .and_then(|entry| self.detail_for(entry, &deal.url, ctx));

        let deal = match &detail {
            Some(detail) => merge_detail(deal, detail),
            None => deal.clone(),
        };
        AssembledDeal {
            deal,
            detail,
            source: source.to_string(),
        }
    }

    fn detail_for(&self, entry: &SourceEntry, url: &str, ctx: &RunContext) -> Option<DealDetail> {
        self.fetch_through_cache(CacheTier::DealDetail, url, ctx, || {
            Counters::bump(&ctx.counters.detail_fetches);
            let outcome = ctx.coordinator.execute(
                &entry.handle,
                url,
                entry.handle.retry_policy(),
                |fetcher| fetcher.fetch_detail(url),
            );
            let value = outcome.map(CachedValue::Detail).success();
            if value.is_none() {
                Counters::bump(&ctx.counters.detail_failures);
            }
            value
        })
        .and_then(CachedValue::into_detail)
    }

    fn fill_component_prices(&self, deals: Vec<AssembledDeal>, ctx: &RunContext) -> Vec<AssembledDeal> {
        let names: BTreeSet<String> = deals
            .iter()
            .flat_map(|d| d.deal.components.iter())
            .filter(|c| c.needs_price())
            .map(|c| c.name.clone())
            .collect();
        if names.is_empty() {
            return deals;
        }

        // Batch freshness check before touching any price source.
        let now = Utc::now();
        let mut prices: HashMap<String, f64> = HashMap::new();
        let mut missing: Vec<String> = Vec::new();
        for name in names {
            match self
                .cache
                .lookup_fresh(CacheTier::AmazonPrice, &name, now)
                .and_then(|e| e.value.as_price())
            {
                Some(price) => {
                    Counters::bump(&ctx.counters.price_cache_hits);
                    prices.insert(name, price);
                }
                None => missing.push(name),
            }
        }

        if missing.is_empty() {
            info!(cached = prices.len(), "all component prices fresh, skipping price lookup");
        } else {
            info!(cached = prices.len(), missing = missing.len(), "looking up component prices");
            let fetched = self.map_items(&missing, |name| {
                let price = self
                    .fetch_through_cache(CacheTier::AmazonPrice, name, ctx, || self.lookup_price(name, ctx))
                    .and_then(|v| v.as_price());
                (name.clone(), price)
            });
            for (name, price) in fetched {
                if let Some(price) = price {
                    prices.insert(name, price);
                }
            }
        }

        deals
            .into_iter()
            .map(|assembled| AssembledDeal {
                deal: apply_prices(&assembled.deal, &prices),
                ..assembled
            })
            .collect()
    }

    /// Try each price source in registry order; first usable price wins.
    fn lookup_price(&self, name: &str, ctx: &RunContext) -> Option<CachedValue> {
        Counters::bump(&ctx.counters.price_fetches);
        for entry in self.registry.price_sources() {
            let outcome = ctx.coordinator.execute(
                &entry.handle,
                name,
                entry.handle.retry_policy(),
                |fetcher| fetcher.fetch_component_price(name),
            );
            match outcome {
                FetchOutcome::Success(price) if price.is_finite() && price > 0.0 => {
                    debug!(source = entry.name(), key = name, price, "component price found");
                    return Some(CachedValue::Price(price));
                }
                FetchOutcome::Success(price) => {
                    warn!(source = entry.name(), key = name, price, "rejecting non-positive price");
                }
                _ => {}
            }
        }
        Counters::bump(&ctx.counters.price_failures);
        None
    }

    /// Consult the cache for `(tier, key)` and fetch only on a miss.
    ///
    /// The run memo guarantees `fetch` runs at most once per key per run,
    /// even when many deals ask for the same key concurrently.
    fn fetch_through_cache<F>(&self, tier: CacheTier, key: &str, ctx: &RunContext, fetch: F) -> Option<CachedValue>
    where
        F: FnOnce() -> Option<CachedValue>,
    {
        let (value, _) = ctx.memo.get_or_fetch(tier, key, || {
            if let Some(entry) = self.cache.lookup_fresh(tier, key, Utc::now()) {
                if tier == CacheTier::DealDetail {
                    Counters::bump(&ctx.counters.detail_cache_hits);
                }
                debug!(tier = %tier, key, "cache hit");
                return Some(entry.value);
            }
            let value = fetch()?;
            if let Err(e) = self.cache.store(tier, key, value.clone()) {
                warn!(tier = %tier, key, error = %e, "failed to store fetched value");
            }
            Some(value)
        });
        value
    }

    fn map_items<T, R, F>(&self, items: &[T], f: F) -> Vec<R>
    where
        T: Sync,
        R: Send,
        F: Fn(&T) -> R + Sync + Send,
    {
        if self.options.concurrent {
            items.par_iter().map(&f).collect()
        } else {
            items.iter().map(&f).collect()
        }
    }
}

/// Replace listing components with the detail's, keeping listing prices.
fn merge_detail(deal: &RawDeal, detail: &DealDetail) -> RawDeal {
    if detail.components.is_empty() {
        return deal.clone();
    }
    let listing_prices: HashMap<&str, f64> = deal
        .components
        .iter()
        .filter_map(|c| c.price.map(|p| (c.name.as_str(), p)))
        .collect();
    let components = detail
        .components
        .iter()
        .map(|c| Component {
            price: c.price.or_else(|| listing_prices.get(c.name.as_str()).copied()),
            ..c.clone()
        })
        .collect();
    RawDeal {
        components,
        ..deal.clone()
    }
}

fn apply_prices(deal: &RawDeal, prices: &HashMap<String, f64>) -> RawDeal {
    let components = deal
        .components
        .iter()
        .map(|c| match (c.needs_price(), prices.get(&c.name)) {
            (true, Some(&price)) => c.clone().with_price(price),
            _ => c.clone(),
        })
        .collect();
    RawDeal {
        components,
        ..deal.clone()
    }
}

fn describe_query(query: &QueryParams) -> String {
    if query.is_empty() {
        return "(default)".to_string();
    }
    query
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&")
}
