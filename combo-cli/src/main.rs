//! Combo deals CLI: pipeline runs and cache management.
//!
//! Commands:
//! - `run`: fetch, enrich, filter and report combo deals
//! - `cache status`: entries, freshness and file size per cache tier
//! - `cache clear`: empty one tier or all of them

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use combo_core::cache::{CacheStore, CacheTier, ClearScope};
use combo_runner::reporting::{render_deals_table, render_source_status};
use combo_runner::runner::cache_options;
use combo_runner::{run_pipeline, PipelineConfig, PipelineOutput};

#[derive(Parser)]
#[command(
    name = "combo-deals",
    about = "Combo deal aggregator: CPU + motherboard + RAM bundles across retailers"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the pipeline once and print the ranked deals.
    Run {
        /// Path to a TOML config file. Without it, built-in defaults are used.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Ignore cached data for this run (results are still cached).
        #[arg(long, default_value_t = false)]
        fresh: bool,

        /// Run browser-driven sources with a visible window.
        #[arg(long, default_value_t = false)]
        visible: bool,

        /// Debug logging.
        #[arg(long, default_value_t = false)]
        debug: bool,

        /// Cache directory. Overrides the config file.
        #[arg(long)]
        cache_dir: Option<PathBuf>,

        /// Results directory. Overrides the config file.
        #[arg(long)]
        results_dir: Option<PathBuf>,

        /// Query sources one at a time.
        #[arg(long, default_value_t = false)]
        sequential: bool,
    },
    /// Cache management commands.
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// Report entries, fresh entries and file size per tier.
    Status {
        #[arg(long)]
        config: Option<PathBuf>,

        #[arg(long)]
        cache_dir: Option<PathBuf>,
    },
    /// Remove cached entries.
    Clear {
        /// Tier to clear: amazon_price, deal_detail or deal_price. Default: all.
        #[arg(long)]
        tier: Option<CacheTier>,

        #[arg(long)]
        config: Option<PathBuf>,

        #[arg(long)]
        cache_dir: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            fresh,
            visible,
            debug,
            cache_dir,
            results_dir,
            sequential,
        } => {
            let mut config = load_config(config.as_ref())?;
            config.fresh |= fresh;
            config.visible |= visible;
            config.debug |= debug;
            if sequential {
                config.concurrent_sources = false;
            }
            if let Some(dir) = cache_dir {
                config.cache_dir = dir;
            }
            if let Some(dir) = results_dir {
                config.results_dir = dir;
            }
            init_logging(config.debug);
            run_deals(&config)
        }
        Commands::Cache { action } => {
            init_logging(false);
            match action {
                CacheAction::Status { config, cache_dir } => {
                    let config = with_cache_dir(load_config(config.as_ref())?, cache_dir);
                    run_cache_status(&config)
                }
                CacheAction::Clear {
                    tier,
                    config,
                    cache_dir,
                } => {
                    let config = with_cache_dir(load_config(config.as_ref())?, cache_dir);
                    run_cache_clear(&config, tier)
                }
            }
        }
    }
}

fn load_config(path: Option<&PathBuf>) -> Result<PipelineConfig> {
    match path {
        Some(path) => PipelineConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display())),
        None => Ok(PipelineConfig::default()),
    }
}

fn with_cache_dir(mut config: PipelineConfig, cache_dir: Option<PathBuf>) -> PipelineConfig {
    if let Some(dir) = cache_dir {
        config.cache_dir = dir;
    }
    config
}

/// `RUST_LOG` wins; otherwise `debug` or `info`.
fn init_logging(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run_deals(config: &PipelineConfig) -> Result<()> {
    if config.sources.is_empty() {
        tracing::warn!("no sources configured; pass --config with [[sources]] tables");
    }
    let output = run_pipeline(config)?;

    println!("{}", render_deals_table(&output.result));
    print!("{}", render_source_status(&output.result.report));
    print_summary(&output);
    Ok(())
}

fn run_cache_status(config: &PipelineConfig) -> Result<()> {
    if !config.cache_dir.exists() {
        println!("Cache directory does not exist: {}", config.cache_dir.display());
        return Ok(());
    }
    let store = CacheStore::open(&config.cache_dir, cache_options(config))
        .context("Failed to open cache")?;

    println!("Cache directory: {}", config.cache_dir.display());
    println!();
    println!("{:<14} {:>8} {:>8} {:>10}", "Tier", "Entries", "Fresh", "Size");
    println!("{}", "-".repeat(43));
    let mut total_size = 0u64;
    for status in store.status(chrono::Utc::now()) {
        total_size += status.file_bytes;
        println!(
            "{:<14} {:>8} {:>8} {:>10}",
            status.tier.as_str(),
            status.entries,
            status.fresh,
            format_size(status.file_bytes)
        );
    }
    println!();
    println!("Total size: {}", format_size(total_size));
    Ok(())
}

fn run_cache_clear(config: &PipelineConfig, tier: Option<CacheTier>) -> Result<()> {
    let store = CacheStore::open(&config.cache_dir, cache_options(config))
        .context("Failed to open cache")?;
    let scope = match tier {
        Some(tier) => ClearScope::Tier(tier),
        None => ClearScope::All,
    };
    store.clear(scope).context("Failed to clear cache")?;
    match tier {
        Some(tier) => println!("Cleared cache tier {tier}."),
        None => println!("Cleared all cache tiers."),
    }
    Ok(())
}

fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}

fn print_summary(output: &PipelineOutput) {
    let result = &output.result;
    let acq = &result.report.stats;
    println!();
    println!("=== Run Summary ===");
    println!("Run ID:         {}", result.run_id);
    println!("Duration:       {:.1}s", result.metadata.duration_secs);
    println!(
        "Sources:        {} ({} failed)",
        result.stats.sources, result.stats.sources_failed
    );
    println!(
        "Deals:          {} acquired, {} kept, {} new",
        result.stats.deals_acquired, result.stats.deals_kept, result.stats.new_deals
    );
    println!();
    println!("--- Acquisition ---");
    println!(
        "Listings:       {} listed, {} duplicates dropped",
        acq.deals_listed, acq.duplicates_dropped
    );
    println!(
        "Details:        {} cached, {} fetched, {} failed",
        acq.detail_cache_hits, acq.detail_fetches, acq.detail_failures
    );
    println!(
        "Prices:         {} cached, {} fetched, {} failed",
        acq.price_cache_hits, acq.price_fetches, acq.price_failures
    );
    println!(
        "Requests:       {} ({} retries, {} skipped by circuit breaker)",
        acq.fetch.requests, acq.fetch.retries, acq.fetch.skipped
    );
    println!();
    println!("Artifacts:      {}", output.artifacts.run_dir.display());
}
