use serde::{Serialize, Deserialize};

/// Document class, routed from the one-character doc-id prefix.
/// The prefix is the only runtime discriminator between the two
/// corpora: it selects the scorer and the URL lookup table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocClass {
    Html,
    Paper,
}

impl DocClass {
    pub fn prefix(&self) -> char {
        match self {
            DocClass::Html => 'H',
            DocClass::Paper => 'P',
        }
    }
}

/// Typed document identifier: `H{n}` for web pages, `P{n}` for research
/// papers, with `n` assigned densely at ingest.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocId(pub String);

impl DocId {
    pub fn html(n: u64) -> Self {
        DocId(format!("H{}", n))
    }

    pub fn paper(n: u64) -> Self {
        DocId(format!("P{}", n))
    }

    pub fn class(&self) -> Option<DocClass> {
        match self.0.as_bytes().first() {
            Some(b'H') => Some(DocClass::Html),
            Some(b'P') => Some(DocClass::Paper),
            _ => None,
        }
    }

    /// Digits after the class prefix, as stored in the mapping tables.
    pub fn ordinal(&self) -> &str {
        &self.0[1..]
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DocId {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for DocId {
    fn from(s: &str) -> Self {
        DocId(s.to_string())
    }
}
