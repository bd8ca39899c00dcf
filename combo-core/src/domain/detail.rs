use serde::{Deserialize, Serialize};

use super::component::Component;

/// Parsed RAM characteristics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RamSpecs {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ddr: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity_gb: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed_mhz: Option<u32>,
}

impl RamSpecs {
    pub fn is_empty(&self) -> bool {
        self.ddr.is_none() && self.capacity_gb.is_none() && self.speed_mhz.is_none()
    }
}

/// Product metadata from a deal's detail page.
///
/// Physical specs of a listed bundle do not change, so once learned this is
/// cached forever in the `DealDetail` tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DealDetail {
    #[serde(default)]
    pub components: Vec<Component>,
    #[serde(default)]
    pub combo_type: String,
    #[serde(default)]
    pub cpu_name: String,
    #[serde(default)]
    pub ram_specs: RamSpecs,
}
