//! Plain-text report for the terminal.

use std::fmt::Write;

use combo_core::orchestrator::{RunReport, SourceStatus};

use super::artifacts::ram_spec_label;
use crate::display::{shorten_cpu, shorten_motherboard, shorten_ram};
use crate::enrichment::EnrichedDeal;
use crate::result::PipelineResult;

const DASH: &str = "-";

struct Column {
    title: &'static str,
    width: usize,
    right: bool,
}

const COLUMNS: [Column; 12] = [
    Column { title: "#", width: 3, right: true },
    Column { title: "New", width: 3, right: false },
    Column { title: "Retailer", width: 12, right: false },
    Column { title: "Type", width: 10, right: false },
    Column { title: "CPU", width: 22, right: false },
    Column { title: "Cores", width: 7, right: false },
    Column { title: "SC", width: 5, right: true },
    Column { title: "MC", width: 6, right: true },
    Column { title: "Motherboard", width: 30, right: false },
    Column { title: "RAM", width: 16, right: false },
    Column { title: "Combo$", width: 8, right: true },
    Column { title: "Save$", width: 14, right: true },
];

/// Cut `text` to `width` characters, marking the cut with `~`.
fn fit(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let mut out: String = text.chars().take(width.saturating_sub(1)).collect();
    out.push('~');
    out
}

fn push_row(out: &mut String, cells: &[String]) {
    let mut line = String::new();
    for (cell, col) in cells.iter().zip(COLUMNS.iter()) {
        let cell = fit(cell, col.width);
        if col.right {
            let _ = write!(line, "{:>w$}  ", cell, w = col.width);
        } else {
            let _ = write!(line, "{:<w$}  ", cell, w = col.width);
        }
    }
    out.push_str(line.trim_end());
    out.push('\n');
}

fn or_dash(value: Option<String>) -> String {
    value.filter(|v| !v.is_empty()).unwrap_or_else(|| DASH.to_string())
}

fn savings_cell(deal: &EnrichedDeal) -> String {
    match (deal.savings, deal.savings_percent) {
        (Some(s), Some(p)) => format!("{s:.0} ({p:.0}%)"),
        (Some(s), None) => format!("{s:.0}"),
        _ => DASH.to_string(),
    }
}

/// Parsed specs when known, otherwise the shortened RAM title.
fn ram_cell(deal: &EnrichedDeal) -> String {
    let label = ram_spec_label(deal);
    if !label.is_empty() {
        return label;
    }
    deal.ram_name.as_deref().map(shorten_ram).unwrap_or_default()
}

fn deal_cells(rank: usize, deal: &EnrichedDeal) -> Vec<String> {
    let bench = deal.cpu_benchmark;
    vec![
        rank.to_string(),
        if deal.is_new { "*".into() } else { String::new() },
        deal.retailer.clone(),
        deal.combo_type.clone(),
        or_dash(deal.cpu_name.as_deref().map(shorten_cpu)),
        or_dash(bench.map(|b| b.core_label())),
        or_dash(bench.map(|b| b.single_core_score.to_string())),
        or_dash(bench.map(|b| b.multi_core_score.to_string())),
        or_dash(deal.motherboard_name.as_deref().map(shorten_motherboard)),
        or_dash(Some(ram_cell(deal))),
        format!("{:.2}", deal.combo_price),
        savings_cell(deal),
    ]
}

/// Ranked deal table with a header line.
pub fn render_deals_table(result: &PipelineResult) -> String {
    let mut out = String::new();
    if result.deals.is_empty() {
        out.push_str("No deals found matching your criteria.\n");
        return out;
    }

    let _ = writeln!(
        out,
        "Combo deals {}    Found: {}    New: {}\n",
        result.metadata.timestamp.format("%Y-%m-%d %H:%M UTC"),
        result.deals.len(),
        result.stats.new_deals
    );
    let header: Vec<String> = COLUMNS.iter().map(|c| c.title.to_string()).collect();
    push_row(&mut out, &header);
    let rule_width: usize = COLUMNS.iter().map(|c| c.width + 2).sum::<usize>() - 2;
    out.push_str(&"-".repeat(rule_width));
    out.push('\n');

    for (i, deal) in result.deals.iter().enumerate() {
        push_row(&mut out, &deal_cells(i + 1, deal));
    }
    out.push('\n');
    for (i, deal) in result.deals.iter().enumerate() {
        let _ = writeln!(out, "{:>3}  {}", i + 1, deal.url);
    }
    out
}

/// Per-source outcome. Sources that contributed no deals are listed
/// separately so a silently broken source is visible.
pub fn render_source_status(report: &RunReport) -> String {
    let mut out = String::from("=== Source Status ===\n");
    if report.sources.is_empty() {
        out.push_str("  (no sources configured)\n");
        return out;
    }

    for source in &report.sources {
        let status = match source.status() {
            SourceStatus::Ok => "ok",
            SourceStatus::Partial => "partial",
            SourceStatus::Failed => "FAILED",
            SourceStatus::Skipped => "skipped (circuit open)",
        };
        let _ = write!(
            out,
            "  {:<16} {:<22} listed {:>4}  kept {:>4}",
            source.source, status, source.deals_listed, source.deals_kept
        );
        if let Some(err) = source.failure() {
            let _ = write!(out, "  {err}");
        }
        out.push('\n');
    }

    let silent: Vec<&str> = report
        .sources
        .iter()
        .filter(|s| s.deals_kept == 0)
        .map(|s| s.source.as_str())
        .collect();
    if !silent.is_empty() {
        let _ = writeln!(out, "  Sources with zero deals: {}", silent.join(", "));
    }
    out
}
