//! Filtering and ranking of enriched deals.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::enrichment::EnrichedDeal;

/// User preferences a deal must meet to be reported.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FilterConfig {
    pub min_budget: f64,
    pub max_budget: f64,
    pub min_ram_gb: u32,
    pub ddr_version: u8,
    pub require_in_stock: bool,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            min_budget: 500.0,
            max_budget: 1300.0,
            min_ram_gb: 32,
            ddr_version: 5,
            require_in_stock: true,
        }
    }
}

impl FilterConfig {
    pub fn validate(&self) -> Result<(), String> {
        if !(self.min_budget.is_finite() && self.max_budget.is_finite()) {
            return Err("filters budget bounds must be finite".into());
        }
        if self.min_budget > self.max_budget {
            return Err(format!(
                "filters.min_budget ({}) exceeds max_budget ({})",
                self.min_budget, self.max_budget
            ));
        }
        Ok(())
    }

    /// Why a deal is rejected, or `None` when it passes.
    pub fn rejection(&self, deal: &EnrichedDeal) -> Option<Rejection> {
        if self.require_in_stock && !deal.in_stock {
            return Some(Rejection::OutOfStock);
        }
        if deal.ram_specs.ddr != Some(self.ddr_version) {
            return Some(Rejection::RamGeneration);
        }
        if deal.ram_specs.capacity_gb.unwrap_or(0) < self.min_ram_gb {
            return Some(Rejection::RamCapacity);
        }
        if !(self.min_budget..=self.max_budget).contains(&deal.combo_price) {
            return Some(Rejection::Budget);
        }
        None
    }

    pub fn accepts(&self, deal: &EnrichedDeal) -> bool {
        self.rejection(deal).is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rejection {
    OutOfStock,
    RamGeneration,
    RamCapacity,
    Budget,
}

/// Keep the deals that pass `config`, best first: savings descending, then
/// CPU single-core score descending.
pub fn filter_and_rank(deals: Vec<EnrichedDeal>, config: &FilterConfig) -> Vec<EnrichedDeal> {
    let mut kept: Vec<EnrichedDeal> = deals.into_iter().filter(|d| config.accepts(d)).collect();
    kept.sort_by(rank_order);
    kept
}

fn rank_order(a: &EnrichedDeal, b: &EnrichedDeal) -> Ordering {
    b.savings_or_zero()
        .total_cmp(&a.savings_or_zero())
        .then_with(|| b.single_core_score().cmp(&a.single_core_score()))
}
