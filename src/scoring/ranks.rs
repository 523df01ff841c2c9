use std::collections::HashMap;
use std::fs;
use std::path::Path;
use crate::core::error::{Error, Result};
use crate::storage::layout::StorageLayout;

/// Static rank tables precomputed offline and immutable at runtime:
/// page rank by URL, domain rank by netloc, citation rank by
/// normalized paper title. Absent keys rank 0.
pub struct RankStore {
    page: HashMap<String, f64>,
    domain: HashMap<String, f64>,
    citation: HashMap<String, f64>,
}

impl RankStore {
    pub fn load(layout: &StorageLayout) -> Result<Self> {
        Ok(RankStore {
            page: load_table(&layout.page_rank_path())?,
            domain: load_table(&layout.domain_rank_path())?,
            citation: load_table(&layout.citation_ranks_path())?,
        })
    }

    pub fn empty() -> Self {
        RankStore {
            page: HashMap::new(),
            domain: HashMap::new(),
            citation: HashMap::new(),
        }
    }

    pub fn page_rank(&self, url: &str) -> f64 {
        self.page.get(url).copied().unwrap_or(0.0)
    }

    pub fn domain_rank(&self, netloc: &str) -> f64 {
        self.domain.get(netloc).copied().unwrap_or(0.0)
    }

    pub fn citation_rank(&self, normalized_title: &str) -> f64 {
        self.citation.get(normalized_title).copied().unwrap_or(0.0)
    }

    #[cfg(test)]
    pub fn from_tables(
        page: HashMap<String, f64>,
        domain: HashMap<String, f64>,
        citation: HashMap<String, f64>,
    ) -> Self {
        RankStore { page, domain, citation }
    }
}

fn load_table(path: &Path) -> Result<HashMap<String, f64>> {
    if !path.exists() {
        // Rank tables are optional; missing means everything ranks 0.
        return Ok(HashMap::new());
    }
    serde_json::from_slice(&fs::read(path)?)
        .map_err(|e| Error::corrupt(format!("rank table {}: {}", path.display(), e)))
}
