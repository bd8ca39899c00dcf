//! URLs reported by earlier runs, persisted as `seen_urls.json`.
//!
//! Used only to flag new deals in the report. Dedup within a run lives in
//! the orchestrator and never reads this file.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

use combo_core::domain::canonical_url;

use crate::enrichment::EnrichedDeal;

pub const SEEN_FILE_NAME: &str = "seen_urls.json";

#[derive(Debug, Error)]
pub enum SeenError {
    #[error("write seen URLs to {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("encode seen URLs: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, Clone)]
pub struct SeenUrls {
    path: PathBuf,
    urls: BTreeSet<String>,
}

impl SeenUrls {
    /// Load `seen_urls.json` from `results_dir`.
    ///
    /// A missing file is an empty set. An unreadable or corrupt file is also
    /// treated as empty and overwritten on the next save.
    pub fn load(results_dir: &Path) -> Self {
        let path = results_dir.join(SEEN_FILE_NAME);
        let urls = match fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str::<Vec<String>>(&content) {
                Ok(list) => list.iter().map(|u| canonical_url(u)).collect(),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "seen URL file is corrupt, starting empty");
                    BTreeSet::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeSet::new(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "cannot read seen URL file, starting empty");
                BTreeSet::new()
            }
        };
        debug!(count = urls.len(), "loaded seen URLs");
        Self { path, urls }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    pub fn contains(&self, url: &str) -> bool {
        self.urls.contains(&canonical_url(url))
    }

    /// Flag deals not seen before and return how many were new.
    /// Does not add them to the set.
    pub fn mark_new(&self, deals: &mut [EnrichedDeal]) -> usize {
        let mut new = 0;
        for deal in deals.iter_mut() {
            deal.is_new = !self.contains(&deal.url);
            if deal.is_new {
                new += 1;
            }
        }
        new
    }

    pub fn record<'a>(&mut self, urls: impl IntoIterator<Item = &'a str>) {
        self.urls.extend(urls.into_iter().map(canonical_url));
    }

    /// Write the set, sorted, via a temp file and rename.
    pub fn save(&self) -> Result<(), SeenError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|source| SeenError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let list: Vec<&String> = self.urls.iter().collect();
        let json = serde_json::to_string_pretty(&list)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(|source| SeenError::Io {
            path: tmp.clone(),
            source,
        })?;
        fs::rename(&tmp, &self.path).map_err(|source| SeenError::Io {
            path: self.path.clone(),
            source,
        })
    }
}
