use std::collections::{BTreeMap, HashMap};
use serde::Deserialize;
use serde_json::Value;
use crate::analysis::tokenizer::TextAnalyzer;
use crate::core::error::{Error, Result};
use crate::core::types::DocId;
use crate::index::hitlist::{Hitlist, MAX_POSITIONS, paper_slot};

/// Structured research paper as produced by the PDF extraction pipeline.
/// Unknown sections are ignored; every listed section is optional.
#[derive(Debug, Default, Deserialize)]
pub struct PaperDocument {
    #[serde(default)]
    pub metadata: PaperMetadata,
    #[serde(default, rename = "abstract")]
    pub abstract_items: Vec<TextBlock>,
    #[serde(default)]
    pub body_text: Vec<TextBlock>,
    #[serde(default)]
    pub bib_entries: BTreeMap<String, BibEntry>,
    #[serde(default)]
    pub ref_entries: BTreeMap<String, RefEntry>,
    #[serde(default)]
    pub back_matter: Vec<TextBlock>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PaperMetadata {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub authors: Vec<Author>,
}

/// Authors appear either as plain strings or as objects whose
/// string-valued fields (first, last, affiliation, ...) are all indexed.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum Author {
    Name(String),
    Record(serde_json::Map<String, Value>),
}

#[derive(Debug, Default, Deserialize)]
pub struct TextBlock {
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct BibEntry {
    #[serde(default)]
    pub title: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct RefEntry {
    #[serde(default)]
    pub text: String,
}

impl PaperDocument {
    pub fn from_value(value: &Value) -> Result<Self> {
        serde_json::from_value(value.clone())
            .map_err(|e| Error::malformed(format!("paper document: {}", e)))
    }
}

/// Zone groups for the paper walk: golden (title + abstract + authors),
/// body, other (bib titles + ref texts + back matter).
#[derive(Clone, Copy)]
enum Zone {
    Golden,
    Body,
    Other,
}

struct ZoneWalk {
    positions: HashMap<String, Vec<u32>>,
    golden: HashMap<String, u32>,
    body: HashMap<String, u32>,
    other: HashMap<String, u32>,
    pos: u32,
}

impl ZoneWalk {
    fn new() -> Self {
        ZoneWalk {
            positions: HashMap::new(),
            golden: HashMap::new(),
            body: HashMap::new(),
            other: HashMap::new(),
            pos: 0,
        }
    }

    fn feed(&mut self, zone: Zone, text: &str) {
        for tok in TextAnalyzer::tokenize_structured(text) {
            let positions = self.positions.entry(tok.clone()).or_default();
            if positions.len() < MAX_POSITIONS {
                positions.push(self.pos);
            }
            let counter = match zone {
                Zone::Golden => &mut self.golden,
                Zone::Body => &mut self.body,
                Zone::Other => &mut self.other,
            };
            *counter.entry(tok).or_insert(0) += 1;
            self.pos += 1;
        }
    }

    fn finish(mut self, doc_id: &DocId) -> HashMap<String, Hitlist> {
        let doc_len = self.pos;
        let mut hitlists = HashMap::with_capacity(self.positions.len());

        for (word, positions) in self.positions.drain() {
            let g = self.golden.get(&word).copied().unwrap_or(0);
            let b = self.body.get(&word).copied().unwrap_or(0);
            let o = self.other.get(&word).copied().unwrap_or(0);
            let total = g + b + o;
            if total == 0 {
                continue;
            }

            let mut counters = vec![0u32; paper_slot::WIDTH];
            counters[paper_slot::GOLDEN] = g;
            counters[paper_slot::BODY] = b;
            counters[paper_slot::OTHER] = o;
            counters[paper_slot::TOTAL] = total;
            counters[paper_slot::DOC_LEN] = doc_len;

            hitlists.insert(word, Hitlist::new(doc_id.clone(), positions, counters));
        }

        hitlists
    }
}

/// Walk the paper in fixed section order with one running position
/// counter and emit a hitlist per distinct word.
pub fn build_hitlists(doc_id: &DocId, doc: &PaperDocument) -> HashMap<String, Hitlist> {
    let mut walk = ZoneWalk::new();

    walk.feed(Zone::Golden, &doc.metadata.title);
    for item in &doc.abstract_items {
        walk.feed(Zone::Golden, &item.text);
    }
    for author in &doc.metadata.authors {
        match author {
            Author::Name(name) => walk.feed(Zone::Golden, name),
            Author::Record(fields) => {
                for value in fields.values() {
                    if let Value::String(s) = value {
                        walk.feed(Zone::Golden, s);
                    }
                }
            }
        }
    }
    for item in &doc.body_text {
        walk.feed(Zone::Body, &item.text);
    }
    for entry in doc.bib_entries.values() {
        walk.feed(Zone::Other, &entry.title);
    }
    for entry in doc.ref_entries.values() {
        walk.feed(Zone::Other, &entry.text);
    }
    for item in &doc.back_matter {
        walk.feed(Zone::Other, &item.text);
    }

    walk.finish(doc_id)
}

/// Flat text of every string value in the document, in tree order.
/// Feeds the TF-IDF embedding at ingest time.
pub fn extract_text(value: &Value) -> String {
    fn recurse(value: &Value, out: &mut Vec<String>) {
        match value {
            Value::String(s) => out.push(s.clone()),
            Value::Array(items) => {
                for item in items {
                    recurse(item, out);
                }
            }
            Value::Object(map) => {
                for item in map.values() {
                    recurse(item, out);
                }
            }
            _ => {}
        }
    }

    let mut texts = Vec::new();
    recurse(value, &mut texts);
    texts.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_paper() -> PaperDocument {
        let raw = serde_json::json!({
            "metadata": {
                "title": "Graph Search",
                "authors": [
                    {"first": "Ada", "last": "Lovelace", "suffix": ""},
                    "Alan Turing"
                ]
            },
            "abstract": [{"text": "Search over graph structures."}],
            "body_text": [{"text": "The graph is traversed. Graph edges matter."}],
            "bib_entries": {"BIBREF0": {"title": "Prior graph work"}},
            "ref_entries": {"FIGREF0": {"text": "Figure of a graph"}},
            "back_matter": [{"text": "Acknowledgements"}]
        });
        PaperDocument::from_value(&raw).unwrap()
    }

    #[test]
    fn walk_covers_all_sections_in_order() {
        let doc = sample_paper();
        let doc_id = DocId::paper(7);
        let hitlists = build_hitlists(&doc_id, &doc);

        // title(2) + abstract(4) + authors(4) + body(7) + bib(3) + ref(4) + back(1)
        let graph = &hitlists["graph"];
        assert_eq!(graph.counter(paper_slot::DOC_LEN), 25);
        assert_eq!(graph.counter(paper_slot::GOLDEN), 2);
        assert_eq!(graph.counter(paper_slot::BODY), 2);
        assert_eq!(graph.counter(paper_slot::OTHER), 2);
        assert_eq!(graph.counter(paper_slot::TOTAL), 6);
        assert_eq!(graph.positions[0], 0); // first title token
    }

    #[test]
    fn counter_totals_are_consistent() {
        let doc = sample_paper();
        let hitlists = build_hitlists(&DocId::paper(0), &doc);
        for hit in hitlists.values() {
            assert_eq!(
                hit.counter(paper_slot::TOTAL),
                hit.counter(paper_slot::GOLDEN)
                    + hit.counter(paper_slot::BODY)
                    + hit.counter(paper_slot::OTHER)
            );
            assert!(hit.counter(paper_slot::TOTAL) > 0);
        }
    }

    #[test]
    fn positions_increase_and_stay_below_doc_length() {
        let doc = sample_paper();
        let hitlists = build_hitlists(&DocId::paper(0), &doc);
        for hit in hitlists.values() {
            let doc_len = hit.counter(paper_slot::DOC_LEN);
            for pair in hit.positions.windows(2) {
                assert!(pair[0] < pair[1]);
            }
            for &p in &hit.positions {
                assert!(p < doc_len);
            }
        }
    }

    #[test]
    fn position_list_capped_counters_keep_counting() {
        let text = vec!["alpha"; 40].join(" ");
        let raw = serde_json::json!({
            "metadata": {"title": ""},
            "body_text": [{"text": text}]
        });
        let doc = PaperDocument::from_value(&raw).unwrap();
        let hitlists = build_hitlists(&DocId::paper(1), &doc);

        let hit = &hitlists["alpha"];
        assert_eq!(hit.positions.len(), MAX_POSITIONS);
        assert_eq!(hit.counter(paper_slot::TOTAL), 40);
        assert_eq!(hit.counter(paper_slot::BODY), 40);
    }

    #[test]
    fn extract_text_walks_every_string() {
        let raw = serde_json::json!({
            "metadata": {"title": "A"},
            "body_text": [{"text": "B"}, {"text": "C"}],
            "n": 5
        });
        let text = extract_text(&raw);
        for piece in ["A", "B", "C"] {
            assert!(text.contains(piece));
        }
    }

    #[test]
    fn malformed_document_is_rejected() {
        let raw = serde_json::json!({"metadata": {"title": 17}});
        assert!(PaperDocument::from_value(&raw).is_err());
    }
}
