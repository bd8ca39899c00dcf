//! Ranked deal export (CSV/JSON).

use anyhow::{Context, Result};
use std::path::Path;

use crate::enrichment::EnrichedDeal;

const CSV_HEADER: [&str; 17] = [
    "rank",
    "new",
    "retailer",
    "source",
    "combo_type",
    "combo_price",
    "individual_total",
    "savings",
    "savings_percent",
    "cpu",
    "cpu_cores",
    "cpu_single_core",
    "cpu_multi_core",
    "motherboard",
    "ram",
    "ram_spec",
    "url",
];

fn opt_money(value: Option<f64>) -> String {
    value.map(|v| format!("{v:.2}")).unwrap_or_default()
}

/// "32GB DDR5-6000", or whatever subset is known.
pub fn ram_spec_label(deal: &EnrichedDeal) -> String {
    let specs = &deal.ram_specs;
    let mut parts = Vec::new();
    if let Some(gb) = specs.capacity_gb {
        parts.push(format!("{gb}GB"));
    }
    match (specs.ddr, specs.speed_mhz) {
        (Some(ddr), Some(speed)) => parts.push(format!("DDR{ddr}-{speed}")),
        (Some(ddr), None) => parts.push(format!("DDR{ddr}")),
        (None, Some(speed)) => parts.push(format!("{speed}MHz")),
        (None, None) => {}
    }
    parts.join(" ")
}

pub fn write_deals_csv(path: &Path, deals: &[EnrichedDeal]) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create deals CSV {}", path.display()))?;
    wtr.write_record(CSV_HEADER)?;

    for (i, deal) in deals.iter().enumerate() {
        let bench = deal.cpu_benchmark;
        wtr.write_record([
            (i + 1).to_string(),
            deal.is_new.to_string(),
            deal.retailer.clone(),
            deal.source.clone(),
            deal.combo_type.clone(),
            format!("{:.2}", deal.combo_price),
            format!("{:.2}", deal.individual_total),
            opt_money(deal.savings),
            deal.savings_percent.map(|p| format!("{p:.1}")).unwrap_or_default(),
            deal.cpu_name.clone().unwrap_or_default(),
            bench.map(|b| b.core_label()).unwrap_or_default(),
            bench.map(|b| b.single_core_score.to_string()).unwrap_or_default(),
            bench.map(|b| b.multi_core_score.to_string()).unwrap_or_default(),
            deal.motherboard_name.clone().unwrap_or_default(),
            deal.ram_name.clone().unwrap_or_default(),
            ram_spec_label(deal),
            deal.url.clone(),
        ])?;
    }

    wtr.flush()
        .with_context(|| format!("Failed to write deals CSV {}", path.display()))?;
    Ok(())
}

pub fn write_deals_json(path: &Path, deals: &[EnrichedDeal]) -> Result<()> {
    let json = serde_json::to_string_pretty(deals).context("Failed to serialize deals")?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write deals JSON {}", path.display()))?;
    Ok(())
}
