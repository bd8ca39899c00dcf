//! Pipeline runner: wires configuration, sources, cache and orchestrator
//! together, then enriches, filters, ranks and reports.
//!
//! Two entry points:
//! - `run_pipeline()`: builds sources from the config. Used by the CLI.
//! - `run_with_registry()`: takes a prepared registry. Used by tests and
//!   embedders that bring their own `SourceFetcher`s.

use anyhow::Context;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

use combo_core::cache::{CacheError, CacheOptions, CacheStore};
use combo_core::orchestrator::{Orchestrator, OrchestratorOptions};
use combo_core::sources::{FileSource, HttpJsonConfig, HttpJsonSource, SourceFetcher, SourceRegistry};

use crate::config::{ConfigError, PipelineConfig, SourceConfig, SourceKind};
use crate::enrichment::enrich_all;
use crate::filters::filter_and_rank;
use crate::reporting::{ArtifactManager, ArtifactPaths};
use crate::result::PipelineResult;
use crate::seen::SeenUrls;

/// Errors from pipeline setup.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("cache error: {0}")]
    Cache(#[from] CacheError),
    #[error("source '{name}': {reason}")]
    SourceSetup { name: String, reason: String },
}

/// Everything a finished run produced.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub result: PipelineResult,
    pub artifacts: ArtifactPaths,
}

/// Construct one fetcher from its config table.
pub fn build_source(config: &SourceConfig) -> Result<Arc<dyn SourceFetcher>, RunError> {
    let setup_error = |reason: String| RunError::SourceSetup {
        name: config.name.clone(),
        reason,
    };
    match config.kind {
        SourceKind::HttpJson => {
            let listing_url = config
                .listing_url
                .clone()
                .ok_or_else(|| setup_error("missing listing_url".into()))?;
            let mut http = HttpJsonConfig::new(listing_url);
            http.detail_url = config.detail_url.clone();
            http.price_url = config.price_url.clone();
            http.timeout = Duration::from_secs(config.timeout_secs);
            let source = HttpJsonSource::new(config.name.clone(), http)
                .map_err(|e| setup_error(format!("HTTP client: {e}")))?;
            Ok(Arc::new(source))
        }
        SourceKind::File => {
            let path = config
                .path
                .clone()
                .ok_or_else(|| setup_error("missing path".into()))?;
            Ok(Arc::new(FileSource::new(config.name.clone(), path)))
        }
    }
}

/// Register every enabled source, in config order.
pub fn build_registry(config: &PipelineConfig) -> Result<SourceRegistry, RunError> {
    let mut registry = SourceRegistry::new();
    for source in config.enabled_sources() {
        let fetcher = build_source(source)?;
        registry.register(fetcher, config.settings_for(source));
    }
    Ok(registry)
}

pub fn cache_options(config: &PipelineConfig) -> CacheOptions {
    CacheOptions {
        price_ttl: config.price_ttl(),
        bypass_reads: config.fresh,
    }
}

/// Open the cache store, failing early if the directory is unusable.
pub fn open_cache(config: &PipelineConfig) -> Result<Arc<CacheStore>, RunError> {
    let store = CacheStore::open(&config.cache_dir, cache_options(config))?;
    Ok(Arc::new(store))
}

/// Run the full pipeline with sources built from `config`.
pub fn run_pipeline(config: &PipelineConfig) -> anyhow::Result<PipelineOutput> {
    config.validate().map_err(RunError::from)?;
    let registry = build_registry(config)?;
    run_with_registry(config, registry)
}

/// Run the full pipeline against a prepared registry.
///
/// Source failures never fail the run; they show up in the report. Only
/// an unusable cache or results directory does.
pub fn run_with_registry(
    config: &PipelineConfig,
    registry: SourceRegistry,
) -> anyhow::Result<PipelineOutput> {
    let cache = open_cache(config)?;
    info!(
        sources = registry.len(),
        fresh = config.fresh,
        cache_dir = %config.cache_dir.display(),
        "starting pipeline"
    );
    let orchestrator = Orchestrator::new(
        cache,
        Arc::new(registry),
        OrchestratorOptions {
            concurrent: config.concurrent_sources,
        },
    );

    let mut report = orchestrator.run();
    if report.all_sources_failed() {
        warn!("every source failed; reporting an empty deal list");
    }

    let assembled = std::mem::take(&mut report.deals);
    let acquired = assembled.len();
    let enriched = enrich_all(assembled);
    let mut ranked = filter_and_rank(enriched, &config.filters);
    info!(acquired, kept = ranked.len(), "filtered deals");

    let mut seen = SeenUrls::load(&config.results_dir);
    let new_deals = seen.mark_new(&mut ranked);

    let result = PipelineResult::new(report, ranked, acquired, new_deals, config.fresh);
    let artifacts = ArtifactManager::new(&config.results_dir)?
        .save_run(&result)
        .context("Failed to write run artifacts")?;

    seen.record(result.deals.iter().map(|d| d.url.as_str()));
    seen.save().context("Failed to persist seen URLs")?;

    info!(
        run_id = %result.run_id,
        kept = result.stats.deals_kept,
        new = new_deals,
        run_dir = %artifacts.run_dir.display(),
        "pipeline finished"
    );
    Ok(PipelineOutput { result, artifacts })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn source(kind: SourceKind) -> SourceConfig {
        SourceConfig {
            name: "s".into(),
            kind,
            listing_url: None,
            detail_url: None,
            price_url: None,
            path: None,
            timeout_secs: 30,
            queries: Vec::new(),
            retry: None,
            request_delay: None,
            enabled: true,
        }
    }

    #[test]
    fn build_source_by_kind() {
        let mut http = source(SourceKind::HttpJson);
        http.listing_url = Some("http://127.0.0.1:1/listing".into());
        http.price_url = Some("http://127.0.0.1:1/price".into());
        let fetcher = build_source(&http).unwrap();
        assert_eq!(fetcher.name(), "s");
        assert!(fetcher.capabilities().price_lookup);
        assert!(!fetcher.capabilities().detail);

        let mut file = source(SourceKind::File);
        file.path = Some(PathBuf::from("deals.json"));
        assert!(build_source(&file).unwrap().capabilities().listing);
    }

    #[test]
    fn build_source_reports_missing_fields() {
        let err = build_source(&source(SourceKind::File)).err().unwrap();
        assert!(matches!(err, RunError::SourceSetup { ref name, .. } if name == "s"));
    }

    #[test]
    fn disabled_sources_are_not_registered() {
        let config = PipelineConfig::from_toml(
            r#"
[[sources]]
name = "on"
kind = "file"
path = "a.json"

[[sources]]
name = "off"
kind = "file"
path = "b.json"
enabled = false
"#,
        )
        .unwrap();
        let registry = build_registry(&config).unwrap();
        assert_eq!(registry.len(), 1);
        assert!(registry.find("on").is_some());
        assert!(registry.find("off").is_none());
    }

    #[test]
    fn cache_options_follow_config() {
        let config = PipelineConfig {
            fresh: true,
            price_cache_ttl_hours: 2.0,
            ..PipelineConfig::default()
        };
        let options = cache_options(&config);
        assert!(options.bypass_reads);
        assert_eq!(options.price_ttl, chrono::Duration::hours(2));
    }
}
