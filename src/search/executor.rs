use std::collections::{HashMap, HashSet};
use crate::core::types::{DocClass, DocId};
use crate::index::hitlist::{Hitlist, PostingList};
use crate::scoring::phrase::phrase_bonus;
use crate::scoring::scorer::{HitScorer, HtmlScorer, PaperScorer};
use crate::search::results::{SearchHit, sort_hits};

/// Tokenized query plus the fetched posting lists, one entry per
/// distinct token in first-seen order. Order matters: it fixes the
/// insertion order used as the ranking tie-break.
pub struct QueryContext {
    pub tokens_paper: Vec<String>,
    pub tokens_html: Vec<String>,
    pub hitlists: Vec<(String, PostingList)>,
}

/// Doc-id to URL resolution, routed on the class prefix.
pub struct UrlResolver<'a> {
    pub urls: &'a HashMap<String, String>,
    pub papers: &'a HashMap<String, (String, String)>,
}

impl UrlResolver<'_> {
    pub fn resolve(&self, doc_id: &DocId) -> String {
        match doc_id.class() {
            Some(DocClass::Paper) => self
                .papers
                .get(doc_id.ordinal())
                .map(|(_title, url)| url.clone())
                .unwrap_or_default(),
            Some(DocClass::Html) => self.urls.get(doc_id.ordinal()).cloned().unwrap_or_default(),
            None => String::new(),
        }
    }
}

fn class_intersection(
    ctx: &QueryContext,
    class_tokens: &[String],
    class: DocClass,
) -> HashSet<DocId> {
    let token_set: HashSet<&String> = class_tokens.iter().collect();
    let mut doc_sets: Vec<HashSet<DocId>> = ctx
        .hitlists
        .iter()
        .filter(|(token, _)| token_set.contains(token))
        .map(|(_, postings)| {
            postings
                .iter()
                .filter(|hit| hit.doc_id.class() == Some(class))
                .map(|hit| hit.doc_id.clone())
                .collect()
        })
        .collect();

    if doc_sets.is_empty() {
        return HashSet::new();
    }

    // Smallest set first keeps the running intersection small.
    doc_sets.sort_by_key(|s| s.len());
    let mut common = doc_sets.remove(0);
    for set in doc_sets {
        common.retain(|id| set.contains(id));
    }
    common
}

/// Per-class intersections over the class-appropriate token lists,
/// unioned across the two corpora.
pub fn intersect_doc_ids(ctx: &QueryContext) -> HashSet<DocId> {
    let mut common = HashSet::new();
    if !ctx.tokens_paper.is_empty() {
        common.extend(class_intersection(ctx, &ctx.tokens_paper, DocClass::Paper));
    }
    if !ctx.tokens_html.is_empty() {
        common.extend(class_intersection(ctx, &ctx.tokens_html, DocClass::Html));
    }
    common
}

/// Score every intersected document with its class scorer, add the
/// phrase bonus, fuse with the semantic score, and sort.
#[allow(clippy::too_many_arguments)]
pub fn rank_results(
    ctx: &QueryContext,
    common: &HashSet<DocId>,
    html_scorer: &HtmlScorer,
    paper_scorer: &PaperScorer,
    semantic_scores: &HashMap<DocId, f32>,
    semantic_weight: f64,
    resolver: &UrlResolver,
) -> Vec<SearchHit> {
    // Insertion-ordered doc -> (token, hitlist) groups.
    let mut order: Vec<DocId> = Vec::new();
    let mut grouped: HashMap<DocId, Vec<(&String, &Hitlist)>> = HashMap::new();
    for (token, postings) in &ctx.hitlists {
        for hit in postings {
            if common.contains(&hit.doc_id) {
                let entry = grouped.entry(hit.doc_id.clone()).or_default();
                if entry.is_empty() {
                    order.push(hit.doc_id.clone());
                }
                entry.push((token, hit));
            }
        }
    }

    let mut ranked = Vec::with_capacity(order.len());
    for doc_id in order {
        let Some(class) = doc_id.class() else { continue };
        let query_tokens = match class {
            DocClass::Paper => &ctx.tokens_paper,
            DocClass::Html => &ctx.tokens_html,
        };
        if query_tokens.is_empty() {
            continue;
        }

        let token_hits = &grouped[&doc_id];
        let mut word_scores: Vec<i64> = Vec::with_capacity(token_hits.len());
        let mut token_positions: HashMap<String, Vec<u32>> = HashMap::new();
        let mut all_positions: Vec<u32> = Vec::new();

        for (token, hit) in token_hits {
            let score = match class {
                DocClass::Paper => paper_scorer.score_hit(hit),
                DocClass::Html => html_scorer.score_hit(hit),
            };
            word_scores.push(score);
            token_positions
                .entry((*token).clone())
                .or_default()
                .extend(&hit.positions);
            all_positions.extend(&hit.positions);
        }

        let avg_word_score =
            word_scores.iter().sum::<i64>() as f64 / word_scores.len() as f64;
        let bonus = phrase_bonus(query_tokens, &token_positions);
        let keyword_score = avg_word_score + bonus as f64;
        let semantic_score = semantic_scores.get(&doc_id).copied().unwrap_or(0.0) as f64;
        let final_score = keyword_score + semantic_weight * semantic_score;

        ranked.push(SearchHit {
            url: resolver.resolve(&doc_id),
            doc_id,
            final_score,
            keyword_score,
            semantic_score,
            avg_word_score,
            phrase_bonus: bonus,
            positions: all_positions,
        });
    }

    sort_hits(&mut ranked);
    ranked
}

/// Results when the keyword intersection is empty but the semantic
/// layer is live: positive similarities only, keyword score 0.
pub fn semantic_only_results(
    semantic_scores: &HashMap<DocId, f32>,
    semantic_weight: f64,
    resolver: &UrlResolver,
) -> Vec<SearchHit> {
    let mut hits: Vec<SearchHit> = semantic_scores
        .iter()
        .filter(|&(_, &sim)| sim > 0.0)
        .map(|(doc_id, &sim)| SearchHit {
            doc_id: doc_id.clone(),
            final_score: semantic_weight * sim as f64,
            keyword_score: 0.0,
            semantic_score: sim as f64,
            avg_word_score: 0.0,
            phrase_bonus: 0,
            url: resolver.resolve(doc_id),
            positions: Vec::new(),
        })
        .collect();

    // Map iteration order is arbitrary; tie-break on doc id to keep
    // repeated queries byte-identical.
    hits.sort_by(|a, b| {
        b.final_score
            .partial_cmp(&a.final_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.doc_id.0.cmp(&b.doc_id.0))
    });
    hits
}
