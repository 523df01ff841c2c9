use serde::{Serialize, Deserialize};

/// Persisted id-allocation state for incremental ingest.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineState {
    pub last_html_id: u64,
    pub last_json_id: u64,
    pub total_documents: u64,
}

/// Snapshot returned by `SearchEngine::state()` for the HTTP layer.
#[derive(Debug, Clone, Serialize)]
pub struct EngineStatus {
    pub last_html_id: u64,
    pub last_json_id: u64,
    pub total_documents: u64,
    pub cached_words: usize,
    pub semantic_available: bool,
    pub initialized: bool,
}
