//! End-to-end pipeline tests: config → sources → orchestrator → enrichment
//! → filter → artifacts, using file and in-memory sources.

use std::path::Path;
use std::sync::Arc;

use combo_core::domain::{Component, ComponentCategory, RawDeal};
use combo_core::fetch::SourceSettings;
use combo_core::sources::{SourceRegistry, StaticSource};
use combo_runner::config::{PipelineConfig, SourceConfig, SourceKind};
use combo_runner::reporting::{render_deals_table, render_source_status};
use combo_runner::{run_pipeline, run_with_registry, SeenUrls};

// ── Fixtures ─────────────────────────────────────────────────────────

const CPU: &str = "AMD Ryzen 7 9800X3D";
const BOARD: &str = "ASUS TUF GAMING B650-PLUS WIFI";
const RAM: &str = "G.SKILL Flare X5 32GB (2 x 16GB) DDR5 6000";
const OLD_RAM: &str = "Corsair Vengeance LPX 32GB (2 x 16GB) DDR4 3200";

const FEED: &str = r#"{
  "listings": [
    {
      "url": "https://shop.example/combo/good/",
      "retailer": "Shop",
      "combo_price": 699.99,
      "components": [
        {"name": "AMD Ryzen 7 9800X3D", "category": "cpu"},
        {"name": "ASUS TUF GAMING B650-PLUS WIFI", "category": "motherboard"},
        {"name": "G.SKILL Flare X5 32GB (2 x 16GB) DDR5 6000", "category": "ram"}
      ]
    },
    {
      "url": "https://SHOP.example/combo/good#reviews",
      "combo_price": 1.0,
      "components": []
    },
    {
      "url": "https://shop.example/combo/ddr4",
      "combo_price": 599.99,
      "components": [
        {"name": "AMD Ryzen 7 9800X3D", "category": "cpu"},
        {"name": "Corsair Vengeance LPX 32GB (2 x 16GB) DDR4 3200", "category": "ram"}
      ]
    },
    {
      "url": "https://shop.example/combo/pricey",
      "combo_price": 2199.99,
      "in_stock": true,
      "components": [
        {"name": "AMD Ryzen 7 9800X3D", "category": "cpu"},
        {"name": "G.SKILL Flare X5 32GB (2 x 16GB) DDR5 6000", "category": "ram"}
      ]
    }
  ],
  "prices": {
    "AMD Ryzen 7 9800X3D": 479.0,
    "ASUS TUF GAMING B650-PLUS WIFI": 199.0,
    "G.SKILL Flare X5 32GB (2 x 16GB) DDR5 6000": 102.0,
    "Corsair Vengeance LPX 32GB (2 x 16GB) DDR4 3200": 69.0
  }
}"#;

const FAST_KNOBS: &str = r#"
[retry]
max_attempts = 2
base_delay_ms = 0
jitter = 0.0

[request_delay]
min_ms = 0
max_ms = 0
"#;

fn file_source(name: &str, path: &Path) -> SourceConfig {
    SourceConfig {
        name: name.into(),
        kind: SourceKind::File,
        listing_url: None,
        detail_url: None,
        price_url: None,
        path: Some(path.to_path_buf()),
        timeout_secs: 30,
        queries: Vec::new(),
        retry: None,
        request_delay: None,
        enabled: true,
    }
}

fn config_in(dir: &Path) -> PipelineConfig {
    let mut config = PipelineConfig::from_toml(FAST_KNOBS).unwrap();
    config.cache_dir = dir.join("cache");
    config.results_dir = dir.join("results");
    config.concurrent_sources = false;
    config
}

fn full_combo(url: &str, price: f64) -> RawDeal {
    RawDeal::new(
        url,
        "Shop",
        price,
        vec![
            Component::new(CPU, ComponentCategory::Cpu),
            Component::new(BOARD, ComponentCategory::Motherboard),
            Component::new(RAM, ComponentCategory::Ram),
        ],
    )
}

fn static_registry(listing: &Arc<StaticSource>, prices: &Arc<StaticSource>) -> SourceRegistry {
    let mut registry = SourceRegistry::new();
    registry.register(listing.clone(), SourceSettings::immediate());
    registry.register(prices.clone(), SourceSettings::immediate());
    registry
}

fn price_source() -> Arc<StaticSource> {
    Arc::new(
        StaticSource::new("prices")
            .price_only()
            .with_price(CPU, 479.0)
            .with_price(BOARD, 199.0)
            .with_price(RAM, 102.0),
    )
}

// ── File source, end to end ──────────────────────────────────────────

#[test]
fn file_feed_runs_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let feed = dir.path().join("feed.json");
    std::fs::write(&feed, FEED).unwrap();
    let mut config = config_in(dir.path());
    config.sources.push(file_source("shop", &feed));

    let output = run_pipeline(&config).unwrap();
    let result = &output.result;

    // Duplicate URL dropped; DDR4 and over-budget combos filtered out.
    assert_eq!(result.stats.deals_acquired, 3);
    assert_eq!(result.deals.len(), 1);
    let deal = &result.deals[0];
    assert_eq!(deal.url, "https://shop.example/combo/good");
    assert_eq!(deal.combo_price, 699.99);
    assert_eq!(deal.combo_type, "CPU+MB+RAM");
    assert_eq!(deal.ram_specs.capacity_gb, Some(32));
    assert_eq!(deal.ram_specs.ddr, Some(5));
    assert_eq!(deal.single_core_score(), 4700);
    assert!((deal.savings.unwrap() - 80.01).abs() < 1e-6);
    assert!(deal.is_new);
    assert_eq!(result.stats.new_deals, 1);
    assert_eq!(result.report.stats.duplicates_dropped, 1);

    // Artifacts
    let paths = &output.artifacts;
    assert_eq!(paths.run_dir, config.results_dir.join(&result.run_id));
    let csv = std::fs::read_to_string(&paths.deals_csv).unwrap();
    assert_eq!(csv.lines().count(), 2);
    assert!(csv.lines().next().unwrap().starts_with("rank,new,retailer"));
    let manifest: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&paths.manifest).unwrap()).unwrap();
    assert_eq!(manifest["run_id"], result.run_id.as_str());
    assert_eq!(manifest["deal_set_hash"], result.deal_set_hash.as_str());
    assert_eq!(manifest["sources"][0]["status"], "ok");
    let deals_json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&paths.deals_json).unwrap()).unwrap();
    assert_eq!(deals_json.as_array().unwrap().len(), 1);

    // Seen URLs persisted
    let seen = SeenUrls::load(&config.results_dir);
    assert!(seen.contains("https://shop.example/combo/good"));

    let table = render_deals_table(result);
    assert!(table.contains("Found: 1"));
    assert!(table.contains("https://shop.example/combo/good"));
}

#[test]
fn second_run_marks_nothing_new() {
    let dir = tempfile::tempdir().unwrap();
    let feed = dir.path().join("feed.json");
    std::fs::write(&feed, FEED).unwrap();
    let mut config = config_in(dir.path());
    config.sources.push(file_source("shop", &feed));

    let first = run_pipeline(&config).unwrap();
    let second = run_pipeline(&config).unwrap();

    assert_eq!(first.result.stats.new_deals, 1);
    assert_eq!(second.result.stats.new_deals, 0);
    assert!(!second.result.deals[0].is_new);
    assert_eq!(first.result.deal_set_hash, second.result.deal_set_hash);
}

// ── Failure isolation ────────────────────────────────────────────────

#[test]
fn all_sources_failing_yields_empty_report() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config_in(dir.path());
    config
        .sources
        .push(file_source("broken", &dir.path().join("missing.json")));

    let output = run_pipeline(&config).unwrap();
    assert!(output.result.deals.is_empty());
    assert!(output.result.report.all_sources_failed());
    assert_eq!(output.result.stats.sources_failed, 1);

    let status = render_source_status(&output.result.report);
    assert!(status.contains("FAILED"));
    assert!(status.contains("Sources with zero deals: broken"));
    assert!(render_deals_table(&output.result).contains("No deals found"));
}

#[test]
fn one_broken_source_does_not_hide_the_other() {
    let dir = tempfile::tempdir().unwrap();
    let feed = dir.path().join("feed.json");
    std::fs::write(&feed, FEED).unwrap();
    let mut config = config_in(dir.path());
    config
        .sources
        .push(file_source("broken", &dir.path().join("missing.json")));
    config.sources.push(file_source("shop", &feed));

    let output = run_pipeline(&config).unwrap();
    assert_eq!(output.result.deals.len(), 1);
    assert_eq!(output.result.stats.sources_failed, 1);
    assert_eq!(output.result.deals[0].source, "shop");
}

#[test]
fn unwritable_cache_dir_fails_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("not-a-dir");
    std::fs::write(&blocker, "file").unwrap();
    let mut config = config_in(dir.path());
    config.cache_dir = blocker.join("cache");

    assert!(run_pipeline(&config).is_err());
}

// ── Cache behaviour across runs ──────────────────────────────────────

#[test]
fn prices_are_reused_across_runs_within_ttl() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());
    let listing = Arc::new(StaticSource::new("shop").with_deals(vec![full_combo(
        "https://shop.example/combo/1",
        700.0,
    )]));
    let prices = price_source();

    run_with_registry(&config, static_registry(&listing, &prices)).unwrap();
    assert_eq!(prices.calls().price_total(), 3);

    let output = run_with_registry(&config, static_registry(&listing, &prices)).unwrap();
    assert_eq!(prices.calls().price_total(), 3);
    assert_eq!(output.result.report.stats.price_cache_hits, 3);
    assert_eq!(output.result.deals[0].savings, Some(80.0));
}

#[test]
fn fresh_run_refetches_prices() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config_in(dir.path());
    let listing = Arc::new(StaticSource::new("shop").with_deals(vec![full_combo(
        "https://shop.example/combo/1",
        700.0,
    )]));
    let prices = price_source();

    run_with_registry(&config, static_registry(&listing, &prices)).unwrap();
    config.fresh = true;
    let output = run_with_registry(&config, static_registry(&listing, &prices)).unwrap();

    assert_eq!(prices.calls().price_total(), 6);
    assert!(output.result.metadata.fresh);
    assert_eq!(output.result.deals.len(), 1);
}

#[test]
fn missing_prices_leave_savings_unknown() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());
    let listing = Arc::new(StaticSource::new("shop").with_deals(vec![full_combo(
        "https://shop.example/combo/1",
        700.0,
    )]));
    let prices = Arc::new(StaticSource::new("prices").price_only().with_price(CPU, 479.0));

    let output = run_with_registry(&config, static_registry(&listing, &prices)).unwrap();
    let deal = &output.result.deals[0];
    assert_eq!(deal.savings, None);
    assert_eq!(deal.individual_total, 479.0);
}
