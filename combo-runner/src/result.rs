//! Pipeline result and summary statistics.

use chrono::{DateTime, Utc};
use serde::Serialize;

use combo_core::orchestrator::{RunReport, SourceStatus};

use crate::enrichment::EnrichedDeal;

/// Complete result of one pipeline run.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineResult {
    /// BLAKE3 of the run's start time, epoch and deal set.
    pub run_id: String,
    /// BLAKE3 of the reported deals (URL + combo price), order-independent.
    pub deal_set_hash: String,
    /// Deals that passed the filter, best first.
    pub deals: Vec<EnrichedDeal>,
    pub report: RunReport,
    pub stats: PipelineStats,
    pub metadata: ResultMetadata,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PipelineStats {
    pub sources: usize,
    pub sources_failed: usize,
    pub deals_acquired: usize,
    pub deals_kept: usize,
    pub new_deals: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResultMetadata {
    pub timestamp: DateTime<Utc>,
    pub duration_secs: f64,
    pub fresh: bool,
}

impl PipelineResult {
    pub fn new(
        report: RunReport,
        deals: Vec<EnrichedDeal>,
        deals_acquired: usize,
        new_deals: usize,
        fresh: bool,
    ) -> Self {
        let sources_failed = report
            .sources
            .iter()
            .filter(|s| matches!(s.status(), SourceStatus::Failed | SourceStatus::Skipped))
            .count();
        let stats = PipelineStats {
            sources: report.sources.len(),
            sources_failed,
            deals_acquired,
            deals_kept: deals.len(),
            new_deals,
        };
        let duration_secs = (report.finished_at - report.started_at)
            .to_std()
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0);
        let metadata = ResultMetadata {
            timestamp: report.started_at,
            duration_secs,
            fresh,
        };
        let deal_set_hash = deal_set_hash(&deals);
        let run_id = run_id(&metadata.timestamp, report.epoch, &deal_set_hash);

        Self {
            run_id,
            deal_set_hash,
            deals,
            report,
            stats,
            metadata,
        }
    }

    pub fn new_deals(&self) -> impl Iterator<Item = &EnrichedDeal> {
        self.deals.iter().filter(|d| d.is_new)
    }
}

/// Hash of the reported deal set. Sorted first, so ranking ties do not
/// change it.
pub fn deal_set_hash(deals: &[EnrichedDeal]) -> String {
    let mut lines: Vec<String> = deals
        .iter()
        .map(|d| format!("{}\t{:.2}", d.url, d.combo_price))
        .collect();
    lines.sort();
    blake3::hash(lines.join("\n").as_bytes()).to_hex().to_string()
}

fn run_id(started_at: &DateTime<Utc>, epoch: u64, deal_set_hash: &str) -> String {
    let seed = format!("{}|{}|{}", started_at.to_rfc3339(), epoch, deal_set_hash);
    blake3::hash(seed.as_bytes()).to_hex().to_string()
}
