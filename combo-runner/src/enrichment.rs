//! Enrichment: benchmark scores, RAM specs and savings for assembled deals.
//!
//! Pure functions over orchestrator output. Nothing here fetches.

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

use combo_core::domain::{ComboType, Component, ComponentCategory, RamSpecs};
use combo_core::orchestrator::AssembledDeal;

use crate::benchmarks::{lookup_cpu, CpuBenchmark};

/// An assembled deal with everything the filter and the report need.
#[derive(Debug, Clone, Serialize)]
pub struct EnrichedDeal {
    pub url: String,
    pub retailer: String,
    pub source: String,
    pub combo_price: f64,
    pub in_stock: bool,
    pub scraped_at: DateTime<Utc>,
    pub components: Vec<Component>,
    pub combo_type: String,
    pub cpu_name: Option<String>,
    pub cpu_benchmark: Option<CpuBenchmark>,
    pub motherboard_name: Option<String>,
    pub ram_name: Option<String>,
    pub ram_specs: RamSpecs,
    /// Sum of the individual prices that are known.
    pub individual_total: f64,
    /// `individual_total - combo_price`; only set when every priceable
    /// component has a price.
    pub savings: Option<f64>,
    pub savings_percent: Option<f64>,
    /// Not reported by an earlier run. Set by the seen-URL pass.
    #[serde(default)]
    pub is_new: bool,
}

impl EnrichedDeal {
    pub fn single_core_score(&self) -> u32 {
        self.cpu_benchmark.map(|b| b.single_core_score).unwrap_or(0)
    }

    pub fn multi_core_score(&self) -> u32 {
        self.cpu_benchmark.map(|b| b.multi_core_score).unwrap_or(0)
    }

    /// Savings for ranking; unknown savings rank as zero.
    pub fn savings_or_zero(&self) -> f64 {
        self.savings.unwrap_or(0.0)
    }
}

pub fn enrich_all(deals: Vec<AssembledDeal>) -> Vec<EnrichedDeal> {
    deals.into_iter().map(enrich).collect()
}

pub fn enrich(assembled: AssembledDeal) -> EnrichedDeal {
    let AssembledDeal {
        deal,
        detail,
        source,
    } = assembled;

    let cpu = deal.component(ComponentCategory::Cpu);
    let board = deal.component(ComponentCategory::Motherboard);
    let ram = deal.component(ComponentCategory::Ram);

    let detail_cpu = detail
        .as_ref()
        .map(|d| d.cpu_name.trim())
        .filter(|name| !name.is_empty());
    let cpu_name = detail_cpu
        .map(str::to_string)
        .or_else(|| cpu.map(|c| c.name.clone()));
    let cpu_benchmark = cpu_name.as_deref().and_then(lookup_cpu).copied();

    let mut ram_specs = detail
        .as_ref()
        .map(|d| d.ram_specs.clone())
        .unwrap_or_default();
    if let Some(ram) = ram {
        let parsed = parse_ram_specs(&ram.name);
        ram_specs.ddr = ram_specs.ddr.or(parsed.ddr);
        ram_specs.capacity_gb = ram_specs.capacity_gb.or(parsed.capacity_gb);
        ram_specs.speed_mhz = ram_specs.speed_mhz.or(parsed.speed_mhz);
    }

    let combo_type = detail
        .as_ref()
        .map(|d| d.combo_type.trim())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| ComboType::from_components(&deal.components).to_string());

    let savings = compute_savings(&deal.components, deal.combo_price);

    EnrichedDeal {
        cpu_name,
        cpu_benchmark,
        motherboard_name: board.map(|c| c.name.clone()),
        ram_name: ram.map(|c| c.name.clone()),
        ram_specs,
        combo_type,
        individual_total: savings.individual_total,
        savings: savings.savings,
        savings_percent: savings.savings_percent,
        is_new: false,
        url: deal.url,
        retailer: deal.retailer,
        source,
        combo_price: deal.combo_price,
        in_stock: deal.in_stock,
        scraped_at: deal.scraped_at,
        components: deal.components,
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Savings {
    pub individual_total: f64,
    pub savings: Option<f64>,
    pub savings_percent: Option<f64>,
}

/// Savings of a bundle against buying its parts separately.
pub fn compute_savings(components: &[Component], combo_price: f64) -> Savings {
    let priceable: Vec<&Component> = components
        .iter()
        .filter(|c| c.category != ComponentCategory::Unknown)
        .collect();
    let individual_total: f64 = components.iter().filter_map(|c| c.price).sum();
    let complete = !priceable.is_empty() && priceable.iter().all(|c| c.price.is_some());

    if !complete {
        return Savings {
            individual_total,
            savings: None,
            savings_percent: None,
        };
    }
    let savings = individual_total - combo_price;
    let percent = if individual_total > 0.0 {
        savings / individual_total * 100.0
    } else {
        0.0
    };
    Savings {
        individual_total,
        savings: Some(savings),
        savings_percent: Some(percent),
    }
}

struct RamPatterns {
    ddr: Regex,
    kit: Regex,
    capacity: Regex,
    speed: Regex,
    corsair_sku: Regex,
}

fn ram_patterns() -> &'static RamPatterns {
    static PATTERNS: OnceLock<RamPatterns> = OnceLock::new();
    PATTERNS.get_or_init(|| RamPatterns {
        ddr: Regex::new(r"ddr(\d)").expect("valid regex"),
        kit: Regex::new(r"(\d+)\s*x\s*(\d+)\s*gb").expect("valid regex"),
        capacity: Regex::new(r"(\d+)\s*gb").expect("valid regex"),
        speed: Regex::new(r"ddr\d[- ]?(\d{4,5})").expect("valid regex"),
        corsair_sku: Regex::new(r"(?:cmh|cmk)(\d+)gx(\d)m\d+n?(\d{4,5})").expect("valid regex"),
    })
}

fn capture<T: std::str::FromStr>(re: &Regex, text: &str, group: usize) -> Option<T> {
    re.captures(text)
        .and_then(|caps| caps.get(group))
        .and_then(|m| m.as_str().parse().ok())
}

/// Parse DDR generation, total capacity and speed from a RAM product name.
///
/// Kits like "2x16GB" report the kit total. Corsair SKUs such as
/// `CMH32GX5M2N6400C36` fill whatever the name itself did not state.
pub fn parse_ram_specs(name: &str) -> RamSpecs {
    let p = ram_patterns();
    let lower = name.to_lowercase();
    let compact: String = lower.chars().filter(|c| c.is_ascii_alphanumeric()).collect();

    let mut specs = RamSpecs {
        ddr: capture(&p.ddr, &lower, 1),
        ..RamSpecs::default()
    };
    if specs.ddr.is_none() && compact.contains("gx5") {
        specs.ddr = Some(5);
    }

    specs.capacity_gb = match p.kit.captures(&lower) {
        Some(caps) => {
            let sticks: Option<u32> = caps.get(1).and_then(|m| m.as_str().parse().ok());
            let per_stick: Option<u32> = caps.get(2).and_then(|m| m.as_str().parse().ok());
            sticks.zip(per_stick).and_then(|(n, gb)| n.checked_mul(gb))
        }
        None => capture(&p.capacity, &lower, 1),
    };
    specs.speed_mhz = capture(&p.speed, &lower, 1);

    if let Some(caps) = p.corsair_sku.captures(&compact) {
        let group = |i: usize| caps.get(i).map(|m| m.as_str());
        specs.capacity_gb = specs.capacity_gb.or_else(|| group(1)?.parse().ok());
        specs.ddr = specs.ddr.or_else(|| group(2)?.parse().ok());
        specs.speed_mhz = specs.speed_mhz.or_else(|| group(3)?.parse().ok());
    }
    specs
}

#[cfg(test)]
mod tests {
    use super::*;
    use combo_core::domain::{DealDetail, RawDeal};

    fn assembled(components: Vec<Component>, detail: Option<DealDetail>) -> AssembledDeal {
        AssembledDeal {
            deal: RawDeal::new("https://shop.example/combo/1", "Shop", 600.0, components),
            detail,
            source: "shop".into(),
        }
    }

    // ── RAM parsing ──

    #[test]
    fn parses_kit_capacity_and_speed() {
        let specs = parse_ram_specs("G.Skill Flare X5 2 x 16GB DDR5-6000 CL30");
        assert_eq!(specs.ddr, Some(5));
        assert_eq!(specs.capacity_gb, Some(32));
        assert_eq!(specs.speed_mhz, Some(6000));
    }

    #[test]
    fn parses_single_capacity() {
        let specs = parse_ram_specs("Kingston FURY Beast 64GB DDR5 6400");
        assert_eq!(specs.ddr, Some(5));
        assert_eq!(specs.capacity_gb, Some(64));
        assert_eq!(specs.speed_mhz, Some(6400));
    }

    #[test]
    fn corsair_sku_fills_missing_fields() {
        let specs = parse_ram_specs("Corsair Vengeance CMH32GX5M2N6400C36W");
        assert_eq!(specs.ddr, Some(5));
        assert_eq!(specs.capacity_gb, Some(32));
        assert_eq!(specs.speed_mhz, Some(6400));
    }

    #[test]
    fn oversized_kit_leaves_capacity_unknown() {
        let specs = parse_ram_specs("Bulk lot 4294967295 x 2GB DDR5-6000");
        assert_eq!(specs.capacity_gb, None);
        assert_eq!(specs.ddr, Some(5));
        assert_eq!(specs.speed_mhz, Some(6000));
    }

    #[test]
    fn unparseable_name_yields_empty_specs() {
        assert!(parse_ram_specs("Memory upgrade").is_empty());
    }

    // ── Savings ──

    #[test]
    fn savings_need_every_priceable_component() {
        let parts = vec![
            Component::new("Ryzen 7 9700X", ComponentCategory::Cpu).with_price(300.0),
            Component::new("B650 board", ComponentCategory::Motherboard),
        ];
        let s = compute_savings(&parts, 350.0);
        assert_eq!(s.individual_total, 300.0);
        assert_eq!(s.savings, None);
        assert_eq!(s.savings_percent, None);
    }

    #[test]
    fn unknown_components_do_not_block_savings() {
        let parts = vec![
            Component::new("Ryzen 7 9700X", ComponentCategory::Cpu).with_price(300.0),
            Component::new("B650 board", ComponentCategory::Motherboard).with_price(200.0),
            Component::new("Free game code", ComponentCategory::Unknown),
        ];
        let s = compute_savings(&parts, 400.0);
        assert_eq!(s.savings, Some(100.0));
        assert_eq!(s.savings_percent, Some(20.0));
    }

    #[test]
    fn negative_savings_are_kept() {
        let parts = vec![Component::new("CPU", ComponentCategory::Cpu).with_price(100.0)];
        assert_eq!(compute_savings(&parts, 150.0).savings, Some(-50.0));
    }

    // ── Enrich ──

    #[test]
    fn enrich_uses_listing_components() {
        let deal = enrich(assembled(
            vec![
                Component::new("AMD Ryzen 7 9800X3D", ComponentCategory::Cpu).with_price(479.0),
                Component::new("MSI B650 Tomahawk", ComponentCategory::Motherboard).with_price(219.0),
                Component::new("Corsair 32GB (2x16GB) DDR5-6000", ComponentCategory::Ram).with_price(102.0),
            ],
            None,
        ));
        assert_eq!(deal.combo_type, "CPU+MB+RAM");
        assert_eq!(deal.cpu_name.as_deref(), Some("AMD Ryzen 7 9800X3D"));
        assert_eq!(deal.single_core_score(), 4700);
        assert_eq!(deal.motherboard_name.as_deref(), Some("MSI B650 Tomahawk"));
        assert_eq!(deal.ram_specs.capacity_gb, Some(32));
        assert_eq!(deal.ram_specs.speed_mhz, Some(6000));
        assert_eq!(deal.savings, Some(200.0));
        assert_eq!(deal.source, "shop");
        assert!(!deal.is_new);
    }

    #[test]
    fn detail_specs_take_precedence() {
        let detail = DealDetail {
            components: Vec::new(),
            combo_type: "CPU+RAM".into(),
            cpu_name: "Intel Core i7-14700KF".into(),
            ram_specs: RamSpecs {
                ddr: Some(5),
                capacity_gb: Some(64),
                speed_mhz: None,
            },
        };
        let deal = enrich(assembled(
            vec![
                Component::new("Core i7 processor", ComponentCategory::Cpu),
                Component::new("32GB DDR5-5600 kit", ComponentCategory::Ram),
            ],
            Some(detail),
        ));
        assert_eq!(deal.combo_type, "CPU+RAM");
        assert_eq!(deal.cpu_benchmark.map(|b| b.cpu_name), Some("Core i7-14700KF"));
        assert_eq!(deal.ram_specs.capacity_gb, Some(64));
        assert_eq!(deal.ram_specs.speed_mhz, Some(5600));
        assert_eq!(deal.savings, None);
    }
}
