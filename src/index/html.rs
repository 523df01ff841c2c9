use std::collections::HashMap;
use crate::analysis::tokenizer::{QueryMode, TextAnalyzer};
use crate::core::types::DocId;
use crate::index::hitlist::{Hitlist, MAX_POSITIONS, html_slot};

/// Zone texts of a web page, already separated by the extraction layer.
#[derive(Debug, Default, Clone)]
pub struct HtmlPage {
    pub url: String,
    pub title: String,
    pub meta_description: String,
    pub headings: String,
    pub body: String,
}

/// Split a URL into (netloc, path), dropping scheme, query and fragment.
pub fn split_url(url: &str) -> (&str, &str) {
    let rest = match url.find("://") {
        Some(i) => &url[i + 3..],
        None => url,
    };
    let rest = rest.split(['?', '#']).next().unwrap_or(rest);
    match rest.find('/') {
        Some(i) => (&rest[..i], &rest[i..]),
        None => (rest, ""),
    }
}

fn zone_counts(analyzer: &TextAnalyzer, text: &str) -> HashMap<String, u32> {
    let mut counts = HashMap::new();
    for tok in analyzer.tokenize_query(text, QueryMode::Space) {
        *counts.entry(tok).or_insert(0) += 1;
    }
    counts
}

/// Build hitlists for a web page: body tokens carry positions 0..N-1,
/// title/meta/heading occurrences add zone counts, and `total` spans
/// all four zones. `n_href` stays 0 (reserved).
pub fn build_hitlists(
    analyzer: &TextAnalyzer,
    doc_id: &DocId,
    page: &HtmlPage,
) -> HashMap<String, Hitlist> {
    let body_tokens = analyzer.tokenize_query(&page.body, QueryMode::Space);
    let doc_len = body_tokens.len() as u32;

    let mut positions: HashMap<String, Vec<u32>> = HashMap::new();
    let mut body_counts: HashMap<String, u32> = HashMap::new();
    for (pos, tok) in body_tokens.into_iter().enumerate() {
        let list = positions.entry(tok.clone()).or_default();
        if list.len() < MAX_POSITIONS {
            list.push(pos as u32);
        }
        *body_counts.entry(tok).or_insert(0) += 1;
    }

    let title_counts = zone_counts(analyzer, &page.title);
    let meta_counts = zone_counts(analyzer, &page.meta_description);
    let heading_counts = zone_counts(analyzer, &page.headings);

    let (netloc, path) = split_url(&page.url);

    let mut words: Vec<&String> = positions
        .keys()
        .chain(title_counts.keys())
        .chain(meta_counts.keys())
        .chain(heading_counts.keys())
        .collect();
    words.sort();
    words.dedup();

    let mut hitlists = HashMap::with_capacity(words.len());
    for word in words {
        let title = title_counts.get(word).copied().unwrap_or(0);
        let meta = meta_counts.get(word).copied().unwrap_or(0);
        let heading = heading_counts.get(word).copied().unwrap_or(0);
        let body = body_counts.get(word).copied().unwrap_or(0);
        let total = title + meta + heading + body;
        if total == 0 {
            continue;
        }

        let mut counters = vec![0u32; html_slot::WIDTH];
        counters[html_slot::TITLE] = title;
        counters[html_slot::META] = meta;
        counters[html_slot::HEADING] = heading;
        counters[html_slot::TOTAL] = total;
        counters[html_slot::IN_DOMAIN] = netloc.contains(word.as_str()) as u32;
        counters[html_slot::IN_URL] = path.contains(word.as_str()) as u32;
        counters[html_slot::DOC_LEN] = doc_len;

        let word_positions = positions.get(word).cloned().unwrap_or_default();
        hitlists.insert(
            word.clone(),
            Hitlist::new(doc_id.clone(), word_positions, counters),
        );
    }

    hitlists
}
