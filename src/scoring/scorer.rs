use std::collections::HashMap;
use crate::analysis::tokenizer::TextAnalyzer;
use crate::index::hitlist::{Hitlist, html_slot, paper_slot};
use crate::index::html::split_url;
use crate::scoring::ranks::RankStore;

/// Per-hitlist keyword scorer. One implementation per document class,
/// selected by the doc-id prefix; an HTML scorer never sees a paper
/// hitlist and vice versa.
pub trait HitScorer {
    fn score_hit(&self, hit: &Hitlist) -> i64;
}

/// Zone-weighted scorer for web pages, with page and domain rank
/// added after clamping.
pub struct HtmlScorer<'a> {
    pub ranks: &'a RankStore,
    pub urls: &'a HashMap<String, String>,
}

impl HitScorer for HtmlScorer<'_> {
    fn score_hit(&self, hit: &Hitlist) -> i64 {
        let n_title = hit.counter(html_slot::TITLE) as f64;
        let n_meta = hit.counter(html_slot::META) as f64;
        let n_heading = hit.counter(html_slot::HEADING) as f64;
        let n_total = hit.counter(html_slot::TOTAL);
        let in_domain = hit.counter(html_slot::IN_DOMAIN) > 0;
        let in_url = hit.counter(html_slot::IN_URL) > 0;
        let doc_len = hit.counter(html_slot::DOC_LEN).max(1);

        let mut score = 0.0f64;

        // Zone weighting
        score += (n_title * 7.5).min(15.0);
        if in_domain {
            score += 10.0;
        }
        if in_url {
            score += 5.0;
        }
        score += (n_heading * 3.0).min(9.0);
        score += (n_meta * 2.0).min(6.0);

        // Position bonus
        if let Some(first) = hit.first_position() {
            score += 15.0 - (first / 7).min(15) as f64;
        }

        // Frequency with density penalty
        let zone_hits = hit.counter(html_slot::TITLE)
            + hit.counter(html_slot::HEADING)
            + hit.counter(html_slot::META);
        let body_hits = n_total.saturating_sub(zone_hits);
        let density = n_total as f64 / doc_len as f64;
        score += ((1.0 + body_hits as f64).ln() * 7.0).min(20.0);
        score *= 1.0 - density;

        let clamped = score.clamp(1.0, 80.0);

        let url = self
            .urls
            .get(hit.doc_id.ordinal())
            .map(String::as_str)
            .unwrap_or("");
        let (netloc, _) = split_url(url);
        (clamped + self.ranks.page_rank(url) + self.ranks.domain_rank(netloc)) as i64
    }
}

/// Golden-zone scorer for research papers, with citation rank added
/// after clamping.
pub struct PaperScorer<'a> {
    pub ranks: &'a RankStore,
    pub papers: &'a HashMap<String, (String, String)>,
    pub analyzer: &'a TextAnalyzer,
}

impl HitScorer for PaperScorer<'_> {
    fn score_hit(&self, hit: &Hitlist) -> i64 {
        let n_golden = hit.counter(paper_slot::GOLDEN) as f64;
        let n_body = hit.counter(paper_slot::BODY) as f64;
        let n_other = hit.counter(paper_slot::OTHER) as f64;
        let n_total = hit.counter(paper_slot::TOTAL);
        let doc_len = hit.counter(paper_slot::DOC_LEN).max(1);

        let mut score = 0.0f64;

        // Golden zone: title, abstract, authors
        score += (n_golden * 5.0).min(35.0);

        // Position bonus
        if let Some(first) = hit.first_position() {
            score += 15.0 - (first / 15).min(10) as f64;
        }

        // Body frequency with density penalty
        let density = n_total as f64 / doc_len as f64;
        let relevant_hits = n_body + n_other * 0.1;
        score += ((1.0 + relevant_hits).ln() * 10.0).min(40.0);
        score *= 1.0 - density;

        let clamped = score.clamp(1.0, 80.0);

        let title = self
            .papers
            .get(hit.doc_id.ordinal())
            .map(|(title, _url)| title.trim())
            .unwrap_or("");
        let normalized = self.analyzer.normalize_title(title);
        (clamped + self.ranks.citation_rank(&normalized)) as i64
    }
}
