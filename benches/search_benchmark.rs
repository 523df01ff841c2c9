use criterion::{black_box, criterion_group, criterion_main, Criterion};
use searchcore::core::config::Config;
use searchcore::core::engine::SearchEngine;
use searchcore::core::stats::EngineState;
use searchcore::core::types::DocId;
use searchcore::index::hitlist::Hitlist;
use searchcore::storage::layout::StorageLayout;
use searchcore::storage::lsm_barrel::LsmBarrel;
use std::collections::HashMap;
use std::fs;
use std::sync::Arc;
use rand::Rng;

const WORDS: &[&str] = &[
    "graph", "theory", "quantum", "entanglement", "search", "engine", "vector", "matrix",
    "neural", "network", "compiler", "runtime", "protocol", "index", "barrel", "overlay",
];

/// Seed a data root with one barrel per four words and a posting list
/// of `docs_per_word` papers for each.
fn build_fixture(data_dir: &std::path::Path, docs_per_word: u64) {
    let layout = StorageLayout::new(data_dir.to_path_buf()).unwrap();
    let mut rng = rand::thread_rng();

    let mut index: HashMap<String, (u32, u64)> = HashMap::new();
    for (i, word) in WORDS.iter().enumerate() {
        index.insert(word.to_string(), ((i / 4) as u32, (i % 4) as u64));
    }
    fs::write(
        layout.barrels_index_path(),
        serde_json::to_vec(&index).unwrap(),
    )
    .unwrap();

    for barrel_id in 0..WORDS.len() / 4 {
        let mut entries = Vec::new();
        for word_index in 0..4u64 {
            let postings: Vec<Hitlist> = (0..docs_per_word)
                .map(|d| {
                    let doc_len = rng.gen_range(200..2000u32);
                    let body = rng.gen_range(1..12u32);
                    let golden = rng.gen_range(0..3u32);
                    Hitlist::new(
                        DocId::paper(d),
                        vec![rng.gen_range(0..doc_len)],
                        vec![golden, body, 0, golden + body, doc_len],
                    )
                })
                .collect();
            entries.push((word_index, postings));
        }
        LsmBarrel::create(&layout.barrel_dir(barrel_id as u32), &entries).unwrap();
    }

    fs::write(
        layout.state_path(),
        serde_json::to_vec(&EngineState {
            last_html_id: 0,
            last_json_id: docs_per_word,
            total_documents: docs_per_word,
        })
        .unwrap(),
    )
    .unwrap();
}

fn open_engine(data_dir: &std::path::Path) -> Arc<SearchEngine> {
    let mut config = Config::with_data_dir(data_dir);
    config.merge_check_interval_secs = 3600;
    SearchEngine::open(config).unwrap()
}

fn bench_single_token_search(c: &mut Criterion) {
    let dir = tempfile::tempdir().unwrap();
    build_fixture(dir.path(), 500);
    let engine = open_engine(dir.path());

    c.bench_function("single_token_search", |b| {
        b.iter(|| {
            let hits = engine.search(black_box("graph"), false, 20.0).unwrap();
            black_box(hits);
        });
    });
    engine.shutdown();
}

fn bench_two_token_search(c: &mut Criterion) {
    let dir = tempfile::tempdir().unwrap();
    build_fixture(dir.path(), 500);
    let engine = open_engine(dir.path());

    c.bench_function("two_token_search", |b| {
        b.iter(|| {
            let hits = engine
                .search(black_box("quantum entanglement"), false, 20.0)
                .unwrap();
            black_box(hits);
        });
    });
    engine.shutdown();
}

fn bench_paper_ingest(c: &mut Criterion) {
    let dir = tempfile::tempdir().unwrap();
    build_fixture(dir.path(), 50);
    let engine = open_engine(dir.path());

    let paper = serde_json::json!({
        "metadata": {"title": "Benchmark Paper"},
        "abstract": [{"text": "graph search over quantum networks"}],
        "body_text": [{"text": WORDS.join(" ")}]
    })
    .to_string()
    .into_bytes();

    c.bench_function("paper_ingest", |b| {
        b.iter(|| {
            let doc_id = engine
                .index_paper(black_box(&paper), "https://papers.example/bench")
                .unwrap();
            black_box(doc_id);
        });
    });
    engine.shutdown();
}

criterion_group!(
    benches,
    bench_single_token_search,
    bench_two_token_search,
    bench_paper_ingest
);
criterion_main!(benches);
