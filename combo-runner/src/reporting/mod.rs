//! Reporting: terminal output and run artifacts.

pub mod artifacts;
pub mod terminal;

pub use artifacts::{ArtifactManager, ArtifactPaths};
pub use terminal::{render_deals_table, render_source_status};
