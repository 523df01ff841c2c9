use serde::Serialize;
use crate::core::types::DocId;

/// One ranked result row, shaped for the HTTP layer.
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub doc_id: DocId,
    pub final_score: f64,
    pub keyword_score: f64,
    pub semantic_score: f64,
    pub avg_word_score: f64,
    pub phrase_bonus: u64,
    pub url: String,
    pub positions: Vec<u32>,
}

/// Descending by final score; the sort is stable so equal scores keep
/// their insertion order.
pub fn sort_hits(hits: &mut [SearchHit]) {
    hits.sort_by(|a, b| {
        b.final_score
            .partial_cmp(&a.final_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
}
