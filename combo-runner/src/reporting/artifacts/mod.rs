//! Artifact manager for persisting run outputs.
//!
//! Layout: `{results_dir}/{run_id}/{run.json,deals.csv,deals.json}`

mod deals;
mod manifest;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::result::PipelineResult;

pub use deals::ram_spec_label;
pub use manifest::{RunManifest, SourceSummary};

/// Artifact paths returned after export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub run_dir: PathBuf,
    pub manifest: PathBuf,
    pub deals_csv: PathBuf,
    pub deals_json: PathBuf,
}

/// Manages writing all artifacts for a run.
#[derive(Debug, Clone)]
pub struct ArtifactManager {
    output_dir: PathBuf,
}

impl ArtifactManager {
    pub fn new(output_dir: impl AsRef<Path>) -> Result<Self> {
        let output_dir = output_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&output_dir)
            .with_context(|| format!("Failed to create results directory {}", output_dir.display()))?;
        Ok(Self { output_dir })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Save complete run artifacts.
    pub fn save_run(&self, result: &PipelineResult) -> Result<ArtifactPaths> {
        let run_dir = self.output_dir.join(&result.run_id);
        std::fs::create_dir_all(&run_dir).context("Failed to create run artifact directory")?;

        let manifest_path = run_dir.join("run.json");
        manifest::write_manifest(&manifest_path, result)?;

        let deals_csv = run_dir.join("deals.csv");
        let deals_json = run_dir.join("deals.json");
        deals::write_deals_csv(&deals_csv, &result.deals)?;
        deals::write_deals_json(&deals_json, &result.deals)?;

        Ok(ArtifactPaths {
            run_dir,
            manifest: manifest_path,
            deals_csv,
            deals_json,
        })
    }
}
