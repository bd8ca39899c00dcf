//! Cross-source deduplication by canonical URL.

use std::collections::HashSet;

use crate::domain::{canonical_url, RawDeal};

/// Canonical URLs already accepted during one run.
#[derive(Debug, Default)]
pub struct SeenDeals {
    seen: HashSet<String>,
}

impl SeenDeals {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `url`; returns false if its canonical form was already seen.
    pub fn insert(&mut self, url: &str) -> bool {
        self.seen.insert(canonical_url(url))
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

/// Keep the first deal for each canonical URL, preserving input order.
///
/// Kept deals carry their canonical URL.
pub fn dedup_by_url(deals: impl IntoIterator<Item = RawDeal>) -> Vec<RawDeal> {
    dedup_tagged(deals.into_iter().map(|deal| ((), deal)))
        .into_iter()
        .map(|((), deal)| deal)
        .collect()
}

/// [`dedup_by_url`] over deals paired with a tag, such as the name of the
/// source that listed them. The tag travels with the kept deal.
pub fn dedup_tagged<T>(items: impl IntoIterator<Item = (T, RawDeal)>) -> Vec<(T, RawDeal)> {
    let mut seen = SeenDeals::new();
    items
        .into_iter()
        .filter(|(_, deal)| seen.insert(&deal.url))
        .map(|(tag, deal)| {
            let url = deal.identity();
            (tag, RawDeal { url, ..deal })
        })
        .collect()
}
