//! Domain types for combo deals

pub mod component;
pub mod deal;
pub mod detail;

pub use component::{Component, ComponentCategory};
pub use deal::{canonical_url, ComboType, RawDeal};
pub use detail::{DealDetail, RamSpecs};
