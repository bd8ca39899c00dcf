//! Combo deal runner: configuration, enrichment, filtering, reporting.
//!
//! This crate builds on `combo-core` to provide:
//! - TOML pipeline configuration and source construction
//! - CPU benchmark reference table
//! - Enrichment (benchmarks, RAM specs, savings)
//! - Short component names for display
//! - Filtering and ranking against user preferences
//! - Seen-URL tracking across runs
//! - Terminal report and run artifacts (CSV, JSON, manifest)

pub mod benchmarks;
pub mod config;
pub mod display;
pub mod enrichment;
pub mod filters;
pub mod reporting;
pub mod result;
pub mod runner;
pub mod seen;

pub use benchmarks::{lookup_cpu, CpuBenchmark};
pub use config::{ConfigError, PipelineConfig, SourceConfig, SourceKind};
pub use enrichment::{enrich, enrich_all, EnrichedDeal};
pub use filters::{filter_and_rank, FilterConfig};
pub use reporting::{ArtifactManager, ArtifactPaths};
pub use result::{PipelineResult, PipelineStats};
pub use runner::{
    build_registry, open_cache, run_pipeline, run_with_registry, PipelineOutput, RunError,
};
pub use seen::SeenUrls;

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn config_types_are_send_sync() {
        assert_send::<PipelineConfig>();
        assert_sync::<PipelineConfig>();
        assert_send::<FilterConfig>();
        assert_sync::<FilterConfig>();
    }

    #[test]
    fn enriched_deal_is_send_sync() {
        assert_send::<EnrichedDeal>();
        assert_sync::<EnrichedDeal>();
    }

    #[test]
    fn pipeline_result_is_send_sync() {
        assert_send::<PipelineResult>();
        assert_sync::<PipelineResult>();
        assert_send::<PipelineOutput>();
        assert_sync::<PipelineOutput>();
    }
}
