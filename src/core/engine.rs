use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;
use parking_lot::{Mutex, RwLock};
use crate::analysis::tokenizer::{QueryMode, TextAnalyzer};
use crate::cache::word_cache::WordCache;
use crate::core::config::Config;
use crate::core::error::{Error, Result};
use crate::core::stats::{EngineState, EngineStatus};
use crate::core::types::DocId;
use crate::index::barrel_index::BarrelIndex;
use crate::index::hitlist::PostingList;
use crate::ingest::indexer::prepare_paper;
use crate::scoring::ranks::RankStore;
use crate::scoring::scorer::{HtmlScorer, PaperScorer};
use crate::search::executor::{
    QueryContext, UrlResolver, intersect_doc_ids, rank_results, semantic_only_results,
};
use crate::search::results::SearchHit;
use crate::semantic::index::{SemanticIndex, SemanticLayer};
use crate::semantic::model::{WordVectors, load_idf_map};
use crate::storage::layout::StorageLayout;
use crate::storage::lsm_barrel::LsmBarrel;
use crate::storage::{write_blob_atomic, write_json_atomic};

/// The hybrid search engine: barrel-backed keyword index, in-memory
/// overlay for incremental writes, and the dense semantic layer.
///
/// Reads run concurrently; ingest is serialized by `ingest_lock` and
/// every mutable structure carries its own lock.
pub struct SearchEngine {
    config: Config,
    layout: StorageLayout,
    analyzer: TextAnalyzer,

    barrel_index: BarrelIndex,
    barrels: HashMap<u32, Arc<LsmBarrel>>,
    word_cache: Mutex<WordCache>,

    // Hitlists accumulated since the last delta merge, plus the
    // per-barrel bookkeeping that drives merge scheduling.
    overlay: RwLock<HashMap<String, PostingList>>,
    pending_counts: Mutex<HashMap<u32, usize>>,
    pending_words: Mutex<HashMap<u32, HashSet<String>>>,

    ranks: RankStore,
    doc_id_to_url: HashMap<String, String>,
    paper_info: RwLock<HashMap<String, (String, String)>>,

    semantic: Option<RwLock<SemanticLayer>>,

    state: Mutex<EngineState>,
    ingest_lock: Mutex<()>,

    initialized: AtomicBool,
    stopping: Arc<AtomicBool>,
    maintenance: Mutex<Option<JoinHandle<()>>>,
}

impl SearchEngine {
    /// Load every artifact under the data root and start the
    /// maintenance thread. Required artifacts (barrel index, base
    /// barrel files) abort startup; the semantic stack degrades.
    pub fn open(config: Config) -> Result<Arc<Self>> {
        println!("Loading search engine from {}...", config.data_dir.display());
        let layout = StorageLayout::new(config.data_dir.clone())?;

        println!("  Loading rank tables...");
        let ranks = RankStore::load(&layout)?;

        println!("  Loading document mappings...");
        let paper_info = load_optional_map(&layout.paper_info_path())?;
        let doc_id_to_url = load_optional_map(&layout.url_map_path())?;

        println!("  Loading barrel index...");
        let barrel_index = BarrelIndex::load(&layout.barrels_index_path())?;

        println!("  Opening barrels...");
        let barrels = open_barrels(&layout)?;
        println!("    {} barrels, {} indexed words", barrels.len(), barrel_index.len());

        println!("  Loading semantic artifacts...");
        let semantic = match load_semantic(&layout) {
            Ok(layer) => {
                println!(
                    "    Semantic search enabled ({} rows, dim {})",
                    layer.index.row_count(),
                    layer.index.dim()
                );
                Some(RwLock::new(layer))
            }
            Err(e) => {
                eprintln!("    Semantic search unavailable: {}", e);
                None
            }
        };

        println!("  Initializing word cache...");
        let word_cache = WordCache::load(
            &layout.word_cache_path(),
            config.word_cache_size,
            config.cache_auto_save_interval,
        );

        let mut state = load_state(&layout.state_path());
        if let Some(sem) = &semantic {
            // The embedding matrix is the authoritative doc count.
            let layer = sem.read();
            state.last_html_id = layer.index.html_rows() as u64;
            state.last_json_id = layer.index.paper_rows() as u64;
            state.total_documents = state.last_html_id + state.last_json_id;
        }

        let engine = Arc::new(SearchEngine {
            config,
            layout,
            analyzer: TextAnalyzer::new(),
            barrel_index,
            barrels,
            word_cache: Mutex::new(word_cache),
            overlay: RwLock::new(HashMap::new()),
            pending_counts: Mutex::new(HashMap::new()),
            pending_words: Mutex::new(HashMap::new()),
            ranks,
            doc_id_to_url,
            paper_info: RwLock::new(paper_info),
            semantic,
            state: Mutex::new(state),
            ingest_lock: Mutex::new(()),
            initialized: AtomicBool::new(true),
            stopping: Arc::new(AtomicBool::new(false)),
            maintenance: Mutex::new(None),
        });

        spawn_maintenance(&engine);
        println!("Search engine loaded");
        Ok(engine)
    }

    // ==================== WORD LOOKUP ====================

    /// Posting list for an indexed word: cached base+delta postings
    /// plus any overlay hitlists. Overlay entries are never cached.
    fn word_lookup(&self, word: &str, barrel_id: u32, word_index: u64) -> Result<PostingList> {
        let cached = self.word_cache.lock().get(word);

        let mut postings = match cached {
            Some(postings) => postings,
            None => {
                let barrel = self.barrels.get(&barrel_id).ok_or_else(|| {
                    Error::corrupt(format!("word {} maps to missing barrel {}", word, barrel_id))
                })?;
                let fetched = barrel.get(word_index)?;

                let snapshot = self
                    .word_cache
                    .lock()
                    .insert(word.to_string(), fetched.clone());
                if let Some(payload) = snapshot {
                    // Snapshot failure keeps the cache in memory only.
                    if let Err(e) = write_blob_atomic(&self.layout.word_cache_path(), &payload) {
                        eprintln!("Could not save word cache: {}", e);
                    }
                }
                fetched
            }
        };

        if let Some(extra) = self.overlay.read().get(word) {
            postings.extend(extra.iter().cloned());
        }
        Ok(postings)
    }

    // ==================== SEARCH ====================

    pub fn search(
        &self,
        query: &str,
        use_semantic: bool,
        semantic_weight: f64,
    ) -> Result<Vec<SearchHit>> {
        if !self.initialized.load(Ordering::Acquire) {
            return Ok(Vec::new());
        }

        let tokens_paper: Vec<String> = self
            .analyzer
            .tokenize_query(query, QueryMode::Strip)
            .into_iter()
            .filter(|t| self.barrel_index.contains(t))
            .collect();
        let tokens_html: Vec<String> = self
            .analyzer
            .tokenize_query(query, QueryMode::Space)
            .into_iter()
            .filter(|t| self.barrel_index.contains(t))
            .collect();

        let mut seen = HashSet::new();
        let mut hitlists = Vec::new();
        for token in tokens_paper.iter().chain(tokens_html.iter()) {
            if !seen.insert(token.clone()) {
                continue;
            }
            let (barrel_id, word_index) = self
                .barrel_index
                .get(token)
                .ok_or_else(|| Error::internal(format!("token {} vanished from index", token)))?;
            hitlists.push((token.clone(), self.word_lookup(token, barrel_id, word_index)?));
        }

        let ctx = QueryContext {
            tokens_paper,
            tokens_html,
            hitlists,
        };
        let semantic_enabled = use_semantic && self.semantic.is_some();
        let papers = self.paper_info.read();
        let resolver = UrlResolver {
            urls: &self.doc_id_to_url,
            papers: &*papers,
        };

        let common = intersect_doc_ids(&ctx);
        if ctx.hitlists.is_empty() || common.is_empty() {
            if !semantic_enabled {
                return Ok(Vec::new());
            }
            let scores = self.semantic_scores(query);
            return Ok(semantic_only_results(&scores, semantic_weight, &resolver));
        }

        let semantic_scores = if semantic_enabled {
            self.semantic_scores(query)
        } else {
            HashMap::new()
        };
        let html_scorer = HtmlScorer {
            ranks: &self.ranks,
            urls: &self.doc_id_to_url,
        };
        let paper_scorer = PaperScorer {
            ranks: &self.ranks,
            papers: &*papers,
            analyzer: &self.analyzer,
        };

        Ok(rank_results(
            &ctx,
            &common,
            &html_scorer,
            &paper_scorer,
            &semantic_scores,
            semantic_weight,
            &resolver,
        ))
    }

    pub fn search_default(&self, query: &str) -> Result<Vec<SearchHit>> {
        self.search(
            query,
            self.config.default_use_semantic,
            self.config.default_semantic_weight,
        )
    }

    /// Cosine similarity of every document against the query.
    fn semantic_scores(&self, query: &str) -> HashMap<DocId, f32> {
        let Some(sem) = &self.semantic else {
            return HashMap::new();
        };
        let layer = sem.read();
        let tokens = self.analyzer.embedding_tokens(query);
        let query_vec = layer.embed(&tokens);
        layer.index.score_all(&query_vec)
    }

    // ==================== INGEST ====================

    /// Incrementally index a research paper. Keyword hitlists go to
    /// the overlay (draining to delta barrels in the background), the
    /// embedding row is appended to the matrix. A failure before the
    /// commit point leaves the engine in its pre-ingest state.
    pub fn index_paper(&self, bytes: &[u8], url: &str) -> Result<DocId> {
        if !self.initialized.load(Ordering::Acquire) {
            return Err(Error::new(
                crate::core::error::ErrorKind::InvalidState,
                "engine is shut down".to_string(),
            ));
        }
        let _guard = self.ingest_lock.lock();

        let next_id = self.state.lock().last_json_id;
        let doc_id = DocId::paper(next_id);

        // Fallible work first: parse, hitlists, embedding, raw persist.
        let prepared = prepare_paper(&self.analyzer, &doc_id, bytes)?;
        let embedding = self
            .semantic
            .as_ref()
            .map(|sem| sem.read().embed(&prepared.embedding_tokens));
        fs::write(self.layout.temp_paper_path(&doc_id), bytes)?;

        // Commit point: everything below is in-memory and infallible.
        if let (Some(sem), Some(embedding)) = (&self.semantic, embedding) {
            let mut layer = sem.write();
            layer.index.push_paper_row(&embedding)?;
        }

        {
            let mut state = self.state.lock();
            state.last_json_id += 1;
            state.total_documents += 1;
        }

        {
            let mut overlay = self.overlay.write();
            let mut counts = self.pending_counts.lock();
            let mut words = self.pending_words.lock();
            for (word, hitlist) in &prepared.hitlists {
                // Words outside the barrel index stay out of the
                // keyword path; they still shaped the embedding.
                let Some((barrel_id, _)) = self.barrel_index.get(word) else {
                    continue;
                };
                overlay.entry(word.clone()).or_default().push(hitlist.clone());
                *counts.entry(barrel_id).or_insert(0) += 1;
                words.entry(barrel_id).or_default().insert(word.clone());
            }
        }

        self.paper_info
            .write()
            .insert(next_id.to_string(), (prepared.title, url.to_string()));

        println!("Indexed paper {}", doc_id);
        Ok(doc_id)
    }

    // ==================== BACKGROUND MERGE ====================

    /// Drain one barrel's pending overlay entries into its delta file.
    /// Failed words are restored and the barrel stays flagged for the
    /// next cycle.
    pub fn merge_barrel(&self, barrel_id: u32) -> Result<()> {
        let words: Vec<String> = match self.pending_words.lock().remove(&barrel_id) {
            Some(words) => words.into_iter().collect(),
            None => return Ok(()),
        };
        let Some(barrel) = self.barrels.get(&barrel_id) else {
            return Err(Error::corrupt(format!("pending words for missing barrel {}", barrel_id)));
        };

        let mut failed: HashSet<String> = HashSet::new();
        for word in words {
            let Some((_, word_index)) = self.barrel_index.get(&word) else {
                continue;
            };
            let Some(postings) = self.overlay.write().remove(&word) else {
                continue;
            };

            match barrel.append_delta(word_index, &postings) {
                Ok(()) => {
                    // The cached posting list predates this append.
                    self.word_cache.lock().invalidate(&word);
                }
                Err(e) => {
                    eprintln!("Delta append for '{}' failed: {}", word, e);
                    let mut overlay = self.overlay.write();
                    let entry = overlay.entry(word.clone()).or_default();
                    let mut restored = postings;
                    restored.append(entry);
                    *entry = restored;
                    failed.insert(word);
                }
            }
        }

        if failed.is_empty() {
            self.pending_counts.lock().insert(barrel_id, 0);
            Ok(())
        } else {
            let count = failed.len();
            self.pending_counts.lock().insert(barrel_id, count);
            self.pending_words.lock().insert(barrel_id, failed);
            Err(Error::new(
                crate::core::error::ErrorKind::Io,
                format!("{} words failed to merge into barrel {}", count, barrel_id),
            ))
        }
    }

    /// Drain every flagged barrel. Errors are logged; the flagged
    /// state survives for retry.
    pub fn flush_pending(&self) {
        let barrel_ids: Vec<u32> = self.pending_words.lock().keys().copied().collect();
        for barrel_id in barrel_ids {
            if let Err(e) = self.merge_barrel(barrel_id) {
                eprintln!("Merge of barrel {} failed: {}", barrel_id, e);
            }
        }
    }

    /// Merge a barrel's delta into its base. Only safe in maintenance
    /// windows; concurrent lookups block on the barrel locks.
    pub fn compact_barrel(&self, barrel_id: u32) -> Result<()> {
        let barrel = self
            .barrels
            .get(&barrel_id)
            .ok_or_else(|| Error::not_found(format!("barrel {}", barrel_id)))?;
        barrel.compact()
    }

    // ==================== LIFECYCLE ====================

    pub fn state(&self) -> EngineStatus {
        let state = self.state.lock();
        EngineStatus {
            last_html_id: state.last_html_id,
            last_json_id: state.last_json_id,
            total_documents: state.total_documents,
            cached_words: self.word_cache.lock().len(),
            semantic_available: self.semantic.is_some(),
            initialized: self.initialized.load(Ordering::Acquire),
        }
    }

    /// Flush everything: drain overlays into delta barrels, then
    /// persist cache, state, embeddings and mappings. Idempotent.
    pub fn shutdown(&self) {
        if self.stopping.swap(true, Ordering::AcqRel) {
            return;
        }
        println!("Shutting down search engine...");

        if let Some(handle) = self.maintenance.lock().take() {
            let _ = handle.join();
        }

        // Overlay first so the cache snapshot holds no stale entries.
        self.flush_pending();

        let cache = self.word_cache.lock();
        match cache.snapshot_payload() {
            Ok(payload) => {
                if let Err(e) = write_blob_atomic(cache.path(), &payload) {
                    eprintln!("Could not save word cache: {}", e);
                } else {
                    println!("Saved {} words to cache", cache.len());
                }
            }
            Err(e) => eprintln!("Could not snapshot word cache: {}", e),
        }
        drop(cache);

        if let Err(e) = write_json_atomic(&self.layout.state_path(), &*self.state.lock()) {
            eprintln!("Could not save engine state: {}", e);
        }

        if let Some(sem) = &self.semantic {
            let layer = sem.read();
            if let Err(e) = layer.index.save(
                &self.layout.html_embeddings_path(),
                &self.layout.json_embeddings_path(),
            ) {
                eprintln!("Could not save embeddings: {}", e);
            }
        }

        if let Err(e) = write_json_atomic(&self.layout.paper_info_path(), &*self.paper_info.read()) {
            eprintln!("Could not save paper info: {}", e);
        }
        if let Err(e) = write_json_atomic(&self.layout.url_map_path(), &self.doc_id_to_url) {
            eprintln!("Could not save URL map: {}", e);
        }

        self.initialized.store(false, Ordering::Release);
        println!("Search engine shutdown complete");
    }
}

impl Drop for SearchEngine {
    fn drop(&mut self) {
        self.stopping.store(true, Ordering::Release);
        if let Some(handle) = self.maintenance.lock().take() {
            let _ = handle.join();
        }
    }
}

// ==================== STARTUP HELPERS ====================

fn open_barrels(layout: &StorageLayout) -> Result<HashMap<u32, Arc<LsmBarrel>>> {
    let mut barrels = HashMap::new();
    for entry in fs::read_dir(&layout.barrels_dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let name = entry.file_name();
        let Some(id_str) = name.to_string_lossy().strip_prefix("barrel_").map(String::from) else {
            continue;
        };
        let barrel_id: u32 = id_str
            .parse()
            .map_err(|_| Error::corrupt(format!("barrel directory {:?}", name)))?;
        barrels.insert(barrel_id, Arc::new(LsmBarrel::open(&entry.path())?));
    }
    Ok(barrels)
}

fn load_semantic(layout: &StorageLayout) -> Result<SemanticLayer> {
    let idf = load_idf_map(&layout.idf_map_path())?;
    let vectors = WordVectors::load_word2vec_text(&layout.word_vectors_path())?;
    let html = SemanticIndex::load_rows(&layout.html_embeddings_path())?;
    let paper = SemanticIndex::load_rows(&layout.json_embeddings_path())?;
    let index = SemanticIndex::new(vectors.dim, html, paper)?;
    Ok(SemanticLayer { vectors, idf, index })
}

fn load_optional_map<T: serde::de::DeserializeOwned>(path: &Path) -> Result<HashMap<String, T>> {
    if !path.exists() {
        return Ok(HashMap::new());
    }
    serde_json::from_slice(&fs::read(path)?)
        .map_err(|e| Error::corrupt(format!("mapping {}: {}", path.display(), e)))
}

fn load_state(path: &Path) -> EngineState {
    if !path.exists() {
        return EngineState::default();
    }
    match fs::read(path).map_err(Error::from).and_then(|bytes| {
        serde_json::from_slice(&bytes).map_err(Error::from)
    }) {
        Ok(state) => state,
        Err(e) => {
            eprintln!("    Could not load engine state: {}", e);
            EngineState::default()
        }
    }
}

fn spawn_maintenance(engine: &Arc<SearchEngine>) {
    let weak = Arc::downgrade(engine);
    let stopping = engine.stopping.clone();
    let interval = Duration::from_secs(engine.config.merge_check_interval_secs.max(1));
    let threshold = engine.config.merge_pending_threshold.max(1);

    let handle = std::thread::spawn(move || {
        let tick = Duration::from_millis(200);
        loop {
            let mut slept = Duration::ZERO;
            while slept < interval {
                if stopping.load(Ordering::Acquire) {
                    return;
                }
                std::thread::sleep(tick);
                slept += tick;
            }

            let Some(engine) = weak.upgrade() else {
                return;
            };
            let due: Vec<u32> = engine
                .pending_counts
                .lock()
                .iter()
                .filter(|&(_, &count)| count >= threshold)
                .map(|(&id, _)| id)
                .collect();
            for barrel_id in due {
                if let Err(e) = engine.merge_barrel(barrel_id) {
                    eprintln!("Background merge of barrel {} failed: {}", barrel_id, e);
                }
            }
        }
    });

    *engine.maintenance.lock() = Some(handle);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::DocClass;
    use crate::index::hitlist::Hitlist;

    fn paper_hit(n: u64, positions: &[u32], counters: [u32; 5]) -> Hitlist {
        Hitlist::new(DocId::paper(n), positions.to_vec(), counters.to_vec())
    }

    fn html_hit(n: u64, positions: &[u32], counters: [u32; 8]) -> Hitlist {
        Hitlist::new(DocId::html(n), positions.to_vec(), counters.to_vec())
    }

    /// One HTML page (H0) and two papers (P0, P1) across two barrels,
    /// with id counters already past the seeded documents.
    fn build_fixture(data_dir: &Path, with_semantic: bool) -> Config {
        let layout = StorageLayout::new(data_dir.to_path_buf()).unwrap();

        let index: HashMap<String, (u32, u64)> = HashMap::from([
            ("graph".to_string(), (0, 0)),
            ("theory".to_string(), (0, 1)),
            ("alpha".to_string(), (0, 2)),
            ("quantum".to_string(), (1, 0)),
            ("entanglement".to_string(), (1, 1)),
        ]);
        write_json_atomic(&layout.barrels_index_path(), &index).unwrap();

        LsmBarrel::create(
            &layout.barrel_dir(0),
            &[
                (
                    0,
                    vec![
                        paper_hit(0, &[0, 10], [2, 3, 0, 5, 100]),
                        html_hit(0, &[2, 7], [1, 0, 0, 3, 0, 1, 0, 50]),
                    ],
                ),
                (1, vec![paper_hit(0, &[1], [1, 2, 0, 3, 100])]),
                (2, vec![]),
            ],
        )
        .unwrap();
        LsmBarrel::create(
            &layout.barrel_dir(1),
            &[
                (0, vec![paper_hit(1, &[5, 50], [1, 1, 0, 2, 400])]),
                (1, vec![paper_hit(1, &[6], [1, 0, 0, 1, 400])]),
            ],
        )
        .unwrap();

        let urls: HashMap<String, String> =
            HashMap::from([("0".to_string(), "https://graphs.example.org/intro".to_string())]);
        write_json_atomic(&layout.url_map_path(), &urls).unwrap();

        let papers: HashMap<String, (String, String)> = HashMap::from([
            (
                "0".to_string(),
                ("Graph Theory Basics".to_string(), "https://papers.example/0".to_string()),
            ),
            (
                "1".to_string(),
                ("Quantum Entanglement".to_string(), "https://papers.example/1".to_string()),
            ),
        ]);
        write_json_atomic(&layout.paper_info_path(), &papers).unwrap();

        write_json_atomic(
            &layout.state_path(),
            &EngineState {
                last_html_id: 1,
                last_json_id: 2,
                total_documents: 3,
            },
        )
        .unwrap();

        if with_semantic {
            let idf: HashMap<String, f32> = HashMap::from([
                ("graph".to_string(), 1.0),
                ("alpha".to_string(), 1.5),
                ("xyzzy".to_string(), 2.0),
            ]);
            write_json_atomic(&layout.idf_map_path(), &idf).unwrap();
            fs::write(
                layout.word_vectors_path(),
                "3 2\ngraph 1.0 0.0\nalpha 0.0 1.0\nxyzzy 1.0 0.0\n",
            )
            .unwrap();

            let index = SemanticIndex::new(
                2,
                vec![vec![1.0, 0.0]],                     // H0
                vec![vec![0.8, 0.2], vec![0.1, 0.9]],     // P0, P1
            )
            .unwrap();
            index
                .save(&layout.html_embeddings_path(), &layout.json_embeddings_path())
                .unwrap();
        }

        let mut config = Config::with_data_dir(data_dir);
        // Keep the maintenance thread quiet during tests.
        config.merge_check_interval_secs = 3600;
        config
    }

    fn alpha_paper() -> Vec<u8> {
        serde_json::json!({
            "metadata": {"title": "Alpha Study"},
            "body_text": [{"text": "alpha alpha beta"}]
        })
        .to_string()
        .into_bytes()
    }

    #[test]
    fn single_token_matches_both_corpora() {
        let dir = tempfile::tempdir().unwrap();
        let config = build_fixture(dir.path(), false);
        let engine = SearchEngine::open(config).unwrap();

        let hits = engine.search("graph", false, 20.0).unwrap();
        assert_eq!(hits.len(), 2);
        let ids: HashSet<&str> = hits.iter().map(|h| h.doc_id.as_str()).collect();
        assert_eq!(ids, HashSet::from(["P0", "H0"]));
        assert!(hits[0].final_score >= hits[1].final_score);
        for hit in &hits {
            assert_eq!(hit.semantic_score, 0.0);
            assert!(!hit.url.is_empty());
        }
        engine.shutdown();
    }

    #[test]
    fn two_token_intersection_earns_phrase_bonus() {
        let dir = tempfile::tempdir().unwrap();
        let config = build_fixture(dir.path(), false);
        let engine = SearchEngine::open(config).unwrap();

        let hits = engine.search("quantum entanglement", false, 20.0).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].doc_id, DocId::paper(1));
        // quantum@5 chains to entanglement@6.
        assert_eq!(hits[0].phrase_bonus, 1);
        assert_eq!(hits[0].keyword_score, hits[0].avg_word_score + 1.0);
        engine.shutdown();
    }

    #[test]
    fn empty_intersection_without_semantic_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let config = build_fixture(dir.path(), false);
        let engine = SearchEngine::open(config).unwrap();

        assert!(engine.search("xyzzy plover", false, 20.0).unwrap().is_empty());
        assert!(engine.search("xyzzy plover", true, 20.0).unwrap().is_empty());
        assert!(engine.search("", true, 20.0).unwrap().is_empty());
        engine.shutdown();
    }

    #[test]
    fn empty_intersection_with_semantic_returns_semantic_only() {
        let dir = tempfile::tempdir().unwrap();
        let config = build_fixture(dir.path(), true);
        let engine = SearchEngine::open(config).unwrap();

        let hits = engine.search("xyzzy plover", true, 20.0).unwrap();
        assert!(!hits.is_empty());
        for hit in &hits {
            assert_eq!(hit.keyword_score, 0.0);
            assert!(hit.semantic_score > 0.0);
            assert!((hit.final_score - 20.0 * hit.semantic_score).abs() < 1e-9);
        }
        // With semantic disabled the same query returns nothing.
        assert!(engine.search("xyzzy plover", false, 20.0).unwrap().is_empty());
        engine.shutdown();
    }

    #[test]
    fn ingest_is_visible_before_and_after_merge() {
        let dir = tempfile::tempdir().unwrap();
        let config = build_fixture(dir.path(), false);
        let engine = SearchEngine::open(config).unwrap();

        let doc_id = engine.index_paper(&alpha_paper(), "https://papers.example/new").unwrap();
        assert_eq!(doc_id, DocId::paper(2));

        let before = engine.search("alpha", false, 20.0).unwrap();
        assert_eq!(before.len(), 1);
        assert_eq!(before[0].doc_id, DocId::paper(2));
        assert_eq!(before[0].url, "https://papers.example/new");
        assert_eq!(before[0].positions, vec![0, 2, 3]);

        engine.merge_barrel(0).unwrap();

        let after = engine.search("alpha", false, 20.0).unwrap();
        assert_eq!(after.len(), before.len());
        assert_eq!(after[0].doc_id, before[0].doc_id);
        assert_eq!(after[0].final_score, before[0].final_score);
        assert_eq!(after[0].positions, before[0].positions);

        let status = engine.state();
        assert_eq!(status.last_json_id, 3);
        assert_eq!(status.total_documents, 4);
        engine.shutdown();
    }

    #[test]
    fn ingest_updates_the_semantic_matrix() {
        let dir = tempfile::tempdir().unwrap();
        let config = build_fixture(dir.path(), true);
        let engine = SearchEngine::open(config).unwrap();

        // Counters come from the embedding row counts at startup.
        assert_eq!(engine.state().last_json_id, 2);

        let doc_id = engine.index_paper(&alpha_paper(), "").unwrap();
        assert_eq!(doc_id, DocId::paper(2));

        let layer = engine.semantic.as_ref().unwrap().read();
        assert_eq!(layer.index.paper_rows(), 3);
        assert_eq!(layer.index.doc_id_at(layer.index.row_count() - 1), DocId::paper(2));
        drop(layer);
        engine.shutdown();
    }

    #[test]
    fn malformed_ingest_mutates_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let config = build_fixture(dir.path(), false);
        let engine = SearchEngine::open(config).unwrap();

        let before = engine.state();
        let err = engine.index_paper(b"not a paper", "").unwrap_err();
        assert_eq!(err.kind, crate::core::error::ErrorKind::Malformed);

        let after = engine.state();
        assert_eq!(after.last_json_id, before.last_json_id);
        assert_eq!(after.total_documents, before.total_documents);
        assert!(engine.overlay.read().is_empty());
        engine.shutdown();
    }

    #[test]
    fn repeated_searches_are_deterministic() {
        let dir = tempfile::tempdir().unwrap();
        let config = build_fixture(dir.path(), false);
        let engine = SearchEngine::open(config).unwrap();

        let first = engine.search("graph theory", false, 20.0).unwrap();
        for _ in 0..3 {
            let again = engine.search("graph theory", false, 20.0).unwrap();
            assert_eq!(again.len(), first.len());
            for (a, b) in again.iter().zip(&first) {
                assert_eq!(a.doc_id, b.doc_id);
                assert_eq!(a.final_score, b.final_score);
            }
        }
        engine.shutdown();
    }

    #[test]
    fn shutdown_drains_the_overlay_and_survives_restart() {
        let dir = tempfile::tempdir().unwrap();
        let config = build_fixture(dir.path(), false);

        let engine = SearchEngine::open(config.clone()).unwrap();
        engine.index_paper(&alpha_paper(), "https://papers.example/new").unwrap();
        engine.shutdown();
        assert!(!engine.state().initialized);
        drop(engine);

        let reopened = SearchEngine::open(config).unwrap();
        let hits = reopened.search("alpha", false, 20.0).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].doc_id, DocId::paper(2));
        assert_eq!(reopened.state().last_json_id, 3);
        // Raw bytes were kept for reproducibility.
        assert!(dir.path().join("temp").join("P2.json").exists());
        reopened.shutdown();
    }

    #[test]
    fn search_after_compaction_is_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let config = build_fixture(dir.path(), false);
        let engine = SearchEngine::open(config).unwrap();

        engine.index_paper(&alpha_paper(), "").unwrap();
        engine.merge_barrel(0).unwrap();
        let before = engine.search("alpha", false, 20.0).unwrap();

        engine.compact_barrel(0).unwrap();
        let after = engine.search("alpha", false, 20.0).unwrap();

        assert_eq!(before.len(), after.len());
        assert_eq!(before[0].doc_id, after[0].doc_id);
        assert_eq!(before[0].final_score, after[0].final_score);
        engine.shutdown();
    }

    #[test]
    fn prefix_routes_scorers_and_urls() {
        let dir = tempfile::tempdir().unwrap();
        let config = build_fixture(dir.path(), false);
        let engine = SearchEngine::open(config).unwrap();

        let hits = engine.search("graph", false, 20.0).unwrap();
        for hit in &hits {
            match hit.doc_id.class().unwrap() {
                DocClass::Html => assert_eq!(hit.url, "https://graphs.example.org/intro"),
                DocClass::Paper => assert_eq!(hit.url, "https://papers.example/0"),
            }
        }
        engine.shutdown();
    }
}
