use std::collections::HashMap;
use std::path::Path;
use rayon::prelude::*;
use crate::core::error::{Error, Result};
use crate::core::types::DocId;
use crate::semantic::model::{IdfMap, WordVectors};
use crate::storage::{read_blob, write_blob_atomic};

/// Stacked per-document embeddings: HTML rows first, paper rows after,
/// appended only at the paper end. Row order is stable for the life of
/// the process, which is what makes row index -> doc id a pure function.
pub struct SemanticIndex {
    dim: usize,
    matrix: Vec<f32>, // row-major, n_rows x dim
    norms: Vec<f32>,  // zero norms clamped to 1
    n_html: usize,
    n_paper: usize,
}

impl SemanticIndex {
    pub fn new(dim: usize, html: Vec<Vec<f32>>, paper: Vec<Vec<f32>>) -> Result<Self> {
        let n_html = html.len();
        let n_paper = paper.len();

        let mut matrix = Vec::with_capacity((n_html + n_paper) * dim);
        for row in html.iter().chain(paper.iter()) {
            if row.len() != dim {
                return Err(Error::corrupt(format!(
                    "embedding row has {} values, expected {}",
                    row.len(),
                    dim
                )));
            }
            matrix.extend_from_slice(row);
        }

        let norms = matrix.chunks_exact(dim).map(row_norm).collect();

        Ok(SemanticIndex {
            dim,
            matrix,
            norms,
            n_html,
            n_paper,
        })
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn html_rows(&self) -> usize {
        self.n_html
    }

    pub fn paper_rows(&self) -> usize {
        self.n_paper
    }

    pub fn row_count(&self) -> usize {
        self.n_html + self.n_paper
    }

    pub fn doc_id_at(&self, row: usize) -> DocId {
        if row < self.n_html {
            DocId::html(row as u64)
        } else {
            DocId::paper((row - self.n_html) as u64)
        }
    }

    /// Cosine similarity of every document against the query vector in
    /// one pass over the matrix. A zero query vector yields nothing.
    pub fn score_all(&self, query_vec: &[f32]) -> HashMap<DocId, f32> {
        let query_norm = dot(query_vec, query_vec).sqrt();
        if query_norm == 0.0 {
            return HashMap::new();
        }

        let normalized: Vec<f32> = query_vec.iter().map(|v| v / query_norm).collect();
        let similarities: Vec<f32> = self
            .matrix
            .par_chunks_exact(self.dim)
            .zip(self.norms.par_iter())
            .map(|(row, &norm)| dot(row, &normalized) / norm)
            .collect();

        similarities
            .into_iter()
            .enumerate()
            .map(|(row, sim)| (self.doc_id_at(row), sim))
            .collect()
    }

    /// Append a paper row; the norm vector is extended in lockstep.
    pub fn push_paper_row(&mut self, row: &[f32]) -> Result<()> {
        if row.len() != self.dim {
            return Err(Error::internal(format!(
                "embedding row has {} values, expected {}",
                row.len(),
                self.dim
            )));
        }
        self.matrix.extend_from_slice(row);
        self.norms.push(row_norm(row));
        self.n_paper += 1;
        Ok(())
    }

    fn rows_in(&self, start: usize, end: usize) -> Vec<Vec<f32>> {
        (start..end)
            .map(|r| self.matrix[r * self.dim..(r + 1) * self.dim].to_vec())
            .collect()
    }

    pub fn save(&self, html_path: &Path, paper_path: &Path) -> Result<()> {
        let html = self.rows_in(0, self.n_html);
        let paper = self.rows_in(self.n_html, self.row_count());
        write_blob_atomic(html_path, &bincode::serialize(&html)?)?;
        write_blob_atomic(paper_path, &bincode::serialize(&paper)?)?;
        Ok(())
    }

    pub fn load_rows(path: &Path) -> Result<Vec<Vec<f32>>> {
        if !path.exists() {
            return Ok(Vec::new());
        }
        let payload = read_blob(path)?;
        Ok(bincode::deserialize(&payload)?)
    }
}

/// L2 norm with the zero clamp used for the cosine denominators.
fn row_norm(row: &[f32]) -> f32 {
    let norm = dot(row, row).sqrt();
    if norm == 0.0 { 1.0 } else { norm }
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// The loaded semantic stack: vocabulary vectors, IDF table and the
/// document matrix. Present only when every artifact loaded cleanly.
pub struct SemanticLayer {
    pub vectors: WordVectors,
    pub idf: IdfMap,
    pub index: SemanticIndex,
}

impl SemanticLayer {
    /// Embedding for a tokenized query or document.
    pub fn embed(&self, tokens: &[String]) -> Vec<f32> {
        self.vectors.weighted_embedding(tokens, &self.idf)
    }
}
