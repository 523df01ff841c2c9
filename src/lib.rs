pub mod core;
pub mod storage;
pub mod analysis;
pub mod index;
pub mod cache;
pub mod semantic;
pub mod scoring;
pub mod search;
pub mod ingest;

/*
┌──────────────────────────────────────────────────────────────────────────┐
│                        SEARCHCORE ARCHITECTURE                           │
└──────────────────────────────────────────────────────────────────────────┘

┌─────────────────────────────── CORE ─────────────────────────────────────┐
│  struct SearchEngine                                                     │
│  • barrel_index: BarrelIndex          // word → (barrel_id, word_index)  │
│  • barrels: HashMap<u32, LsmBarrel>   // mmap base + append-only delta   │
│  • word_cache: Mutex<WordCache>       // LRU posting-list cache          │
│  • overlay: RwLock<Map<word, hits>>   // not-yet-merged ingest hitlists  │
│  • semantic: Option<SemanticLayer>    // embeddings + idf + matrix       │
│  • ranks: RankStore                   // page / domain / citation ranks  │
│  • state: Mutex<EngineState>          // id allocation counters          │
└──────────────────────────────────────────────────────────────────────────┘

┌────────────────────────────── READ PATH ─────────────────────────────────┐
│  query ──> TextAnalyzer (Strip + Space modes)                            │
│        ──> BarrelIndex lookup ──> WordCache ──> LsmBarrel.get()          │
│        ──> overlay union ──> per-class intersection (H* / P* prefix)     │
│        ──> HtmlScorer / PaperScorer + phrase bonus                       │
│        ──> SemanticIndex.score_all() ──> linear fusion ──> SearchHit     │
└──────────────────────────────────────────────────────────────────────────┘

┌────────────────────────────── WRITE PATH ────────────────────────────────┐
│  paper bytes ──> prepare_paper (parse, hitlists, embedding tokens)       │
│             ──> overlay + pending sets ──> SemanticIndex row append      │
│             ──> background merge: overlay ──> LsmBarrel.append_delta()   │
│             ──> maintenance window: LsmBarrel.compact()                  │
└──────────────────────────────────────────────────────────────────────────┘
*/
