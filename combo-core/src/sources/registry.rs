//! Ordered set of registered sources.

use std::sync::Arc;

use super::SourceFetcher;
use crate::fetch::{SourceHandle, SourceSettings};

/// A registered source: its handle plus the listing queries to run.
#[derive(Debug)]
pub struct SourceEntry {
    pub handle: SourceHandle,
    pub settings: SourceSettings,
}

impl SourceEntry {
    pub fn name(&self) -> &str {
        self.handle.name()
    }
}

/// Sources in registration order. Registration order is report order and
/// the order price sources are tried in.
#[derive(Debug, Default)]
pub struct SourceRegistry {
    entries: Vec<SourceEntry>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a source. A later source with the same name replaces the earlier
    /// one in place.
    pub fn register(&mut self, fetcher: Arc<dyn SourceFetcher>, settings: SourceSettings) {
        let entry = SourceEntry {
            handle: SourceHandle::new(fetcher, &settings),
            settings,
        };
        match self.entries.iter().position(|e| e.name() == entry.name()) {
            Some(idx) => self.entries[idx] = entry,
            None => self.entries.push(entry),
        }
    }

    pub fn entries(&self) -> &[SourceEntry] {
        &self.entries
    }

    pub fn listing_sources(&self) -> impl Iterator<Item = &SourceEntry> {
        self.entries
            .iter()
            .filter(|e| e.handle.fetcher().capabilities().listing)
    }

    pub fn price_sources(&self) -> impl Iterator<Item = &SourceEntry> {
        self.entries
            .iter()
            .filter(|e| e.handle.fetcher().capabilities().price_lookup)
    }

    pub fn find(&self, name: &str) -> Option<&SourceEntry> {
        self.entries.iter().find(|e| e.name() == name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
