//! Run manifest export (JSON).

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;

use combo_core::orchestrator::{RunStats, SourceStatus};

use crate::result::{PipelineResult, PipelineStats};

#[derive(Debug, Clone, Serialize)]
pub struct RunManifest<'a> {
    pub run_id: &'a str,
    pub deal_set_hash: &'a str,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub duration_secs: f64,
    pub epoch: u64,
    pub fresh: bool,
    pub stats: &'a PipelineStats,
    pub acquisition: &'a RunStats,
    pub sources: Vec<SourceSummary<'a>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SourceSummary<'a> {
    pub name: &'a str,
    pub status: SourceStatus,
    pub deals_listed: usize,
    pub deals_kept: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<&'a str>,
}

pub fn write_manifest(path: &Path, result: &PipelineResult) -> Result<()> {
    let manifest = RunManifest {
        run_id: &result.run_id,
        deal_set_hash: &result.deal_set_hash,
        timestamp: result.metadata.timestamp,
        duration_secs: result.metadata.duration_secs,
        epoch: result.report.epoch,
        fresh: result.metadata.fresh,
        stats: &result.stats,
        acquisition: &result.report.stats,
        sources: result
            .report
            .sources
            .iter()
            .map(|s| SourceSummary {
                name: &s.source,
                status: s.status(),
                deals_listed: s.deals_listed,
                deals_kept: s.deals_kept,
                error: s.failure(),
            })
            .collect(),
    };

    let json = serde_json::to_string_pretty(&manifest).context("Failed to serialize run manifest")?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write manifest to {}", path.display()))?;
    Ok(())
}
