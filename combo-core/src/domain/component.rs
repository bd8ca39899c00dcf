use serde::{Deserialize, Serialize};
use std::fmt;

/// Category of a part inside a combo deal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentCategory {
    Cpu,
    Motherboard,
    Ram,
    /// Listing text that could not be classified. Never price-looked-up.
    #[serde(other)]
    Unknown,
}

impl ComponentCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            ComponentCategory::Cpu => "cpu",
            ComponentCategory::Motherboard => "motherboard",
            ComponentCategory::Ram => "ram",
            ComponentCategory::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ComponentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One part of a combo deal.
///
/// `price` is the individual (non-bundled) price. Listings rarely carry it;
/// the orchestrator fills it from the `AmazonPrice` cache tier or a
/// price-lookup source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Component {
    pub name: String,
    pub category: ComponentCategory,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
}

impl Component {
    pub fn new(name: impl Into<String>, category: ComponentCategory) -> Self {
        Self {
            name: name.into(),
            category,
            price: None,
        }
    }

    pub fn with_price(mut self, price: f64) -> Self {
        self.price = Some(price);
        self
    }

    /// True when this component still needs an individual price lookup.
    pub fn needs_price(&self) -> bool {
        self.category != ComponentCategory::Unknown && self.price.is_none()
    }
}
