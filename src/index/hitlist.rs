use serde::{Serialize, Deserialize};
use crate::core::types::DocId;

/// Position lists are capped; zone counters keep counting past the cap.
pub const MAX_POSITIONS: usize = 15;

/// Counter slots for HTML hitlists.
pub mod html_slot {
    pub const TITLE: usize = 0;
    pub const META: usize = 1;
    pub const HEADING: usize = 2;
    pub const TOTAL: usize = 3;
    pub const HREF: usize = 4; // reserved for anchor-text accounting
    pub const IN_DOMAIN: usize = 5;
    pub const IN_URL: usize = 6;
    pub const DOC_LEN: usize = 7;
    pub const WIDTH: usize = 8;
}

/// Counter slots for research-paper hitlists.
pub mod paper_slot {
    pub const GOLDEN: usize = 0;
    pub const BODY: usize = 1;
    pub const OTHER: usize = 2;
    pub const TOTAL: usize = 3;
    pub const DOC_LEN: usize = 4;
    pub const WIDTH: usize = 5;
}

/// Per-(word, document) record: token positions plus zone counters.
/// The counter layout depends on the document class of `doc_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hitlist {
    pub doc_id: DocId,
    pub positions: Vec<u32>,
    pub counters: Vec<u32>,
}

impl Hitlist {
    pub fn new(doc_id: DocId, positions: Vec<u32>, counters: Vec<u32>) -> Self {
        Hitlist { doc_id, positions, counters }
    }

    pub fn counter(&self, slot: usize) -> u32 {
        self.counters.get(slot).copied().unwrap_or(0)
    }

    pub fn first_position(&self) -> Option<u32> {
        self.positions.first().copied()
    }
}

/// All hitlists for one word. Order across base/delta/overlay layers is
/// not semantically meaningful; scoring operates per-hitlist.
pub type PostingList = Vec<Hitlist>;
