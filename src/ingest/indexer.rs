use std::collections::HashMap;
use serde_json::Value;
use crate::analysis::tokenizer::TextAnalyzer;
use crate::core::error::{Error, Result};
use crate::core::types::DocId;
use crate::index::hitlist::Hitlist;
use crate::index::paper::{self, PaperDocument};

/// Everything derivable from the raw paper bytes, computed before any
/// engine state is touched so a failed ingest mutates nothing.
#[derive(Debug)]
pub struct PreparedPaper {
    pub title: String,
    pub hitlists: HashMap<String, Hitlist>,
    pub embedding_tokens: Vec<String>,
}

pub fn prepare_paper(
    analyzer: &TextAnalyzer,
    doc_id: &DocId,
    bytes: &[u8],
) -> Result<PreparedPaper> {
    let value: Value = serde_json::from_slice(bytes)
        .map_err(|e| Error::malformed(format!("paper bytes: {}", e)))?;
    let doc = PaperDocument::from_value(&value)?;

    let title = doc.metadata.title.clone();
    let hitlists = paper::build_hitlists(doc_id, &doc);
    let text = paper::extract_text(&value);
    let embedding_tokens = analyzer.embedding_tokens(&text);

    Ok(PreparedPaper {
        title,
        hitlists,
        embedding_tokens,
    })
}
