use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::Path;
use crate::core::error::{Error, Result};

/// IDF weights for the TF-IDF query embedding. Absent words weigh 0.
pub type IdfMap = HashMap<String, f32>;

pub fn load_idf_map(path: &Path) -> Result<IdfMap> {
    let bytes = fs::read(path)
        .map_err(|e| Error::not_found(format!("idf map {}: {}", path.display(), e)))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| Error::corrupt(format!("idf map {}: {}", path.display(), e)))
}

/// Pretrained word embeddings in word2vec text format: a `count dim`
/// header line followed by `word v1 .. vD` lines.
#[derive(Debug)]
pub struct WordVectors {
    pub dim: usize,
    vectors: HashMap<String, Vec<f32>>,
}

impl WordVectors {
    pub fn load_word2vec_text(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .map_err(|e| Error::not_found(format!("word vectors {}: {}", path.display(), e)))?;
        let mut lines = BufReader::new(file).lines();

        let header = lines
            .next()
            .ok_or_else(|| Error::corrupt(format!("word vectors {}: empty file", path.display())))??;
        let mut parts = header.split_whitespace();
        let count: usize = parse_field(parts.next(), path, "vector count")?;
        let dim: usize = parse_field(parts.next(), path, "vector dimension")?;

        let mut vectors = HashMap::with_capacity(count);
        for line in lines {
            let line = line?;
            if line.is_empty() {
                continue;
            }
            let mut fields = line.split_whitespace();
            let word = fields
                .next()
                .ok_or_else(|| Error::corrupt(format!("word vectors {}: blank entry", path.display())))?
                .to_string();
            let values: Vec<f32> = fields
                .map(|f| {
                    f.parse::<f32>().map_err(|e| {
                        Error::corrupt(format!("word vectors {}: {}: {}", path.display(), word, e))
                    })
                })
                .collect::<Result<_>>()?;
            if values.len() != dim {
                return Err(Error::corrupt(format!(
                    "word vectors {}: {} has {} values, expected {}",
                    path.display(),
                    word,
                    values.len(),
                    dim
                )));
            }
            vectors.insert(word, values);
        }

        Ok(WordVectors { dim, vectors })
    }

    pub fn get(&self, word: &str) -> Option<&[f32]> {
        self.vectors.get(word).map(|v| v.as_slice())
    }

    pub fn contains(&self, word: &str) -> bool {
        self.vectors.contains_key(word)
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// TF-IDF weighted mean of the token vectors. Tokens outside the
    /// vocabulary or without an IDF weight contribute nothing; if no
    /// token contributes, the zero vector comes back.
    pub fn weighted_embedding(&self, tokens: &[String], idf: &IdfMap) -> Vec<f32> {
        let total = tokens.len() as f32;
        let mut counts: HashMap<&str, f32> = HashMap::new();
        for tok in tokens {
            *counts.entry(tok.as_str()).or_insert(0.0) += 1.0;
        }

        let mut sum = vec![0.0f32; self.dim];
        let mut weight_total = 0.0f32;
        for (word, count) in counts {
            let Some(vector) = self.get(word) else { continue };
            let tf = count / total;
            let tfidf = tf * idf.get(word).copied().unwrap_or(0.0);
            for (acc, v) in sum.iter_mut().zip(vector) {
                *acc += v * tfidf;
            }
            weight_total += tfidf;
        }

        if weight_total == 0.0 {
            return vec![0.0; self.dim];
        }
        for acc in &mut sum {
            *acc /= weight_total;
        }
        sum
    }

    #[cfg(test)]
    pub fn from_map(dim: usize, vectors: HashMap<String, Vec<f32>>) -> Self {
        WordVectors { dim, vectors }
    }
}

fn parse_field(field: Option<&str>, path: &Path, what: &str) -> Result<usize> {
    field
        .and_then(|f| f.parse().ok())
        .ok_or_else(|| Error::corrupt(format!("word vectors {}: bad {}", path.display(), what)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn word2vec_text_loader() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("word_vectors.txt");
        fs::write(&path, "2 3\ngraph 1.0 0.0 0.5\nquantum -1.0 2.0 0.0\n").unwrap();

        let vectors = WordVectors::load_word2vec_text(&path).unwrap();
        assert_eq!(vectors.dim, 3);
        assert_eq!(vectors.len(), 2);
        assert_eq!(vectors.get("graph"), Some(&[1.0, 0.0, 0.5][..]));
        assert!(vectors.get("missing").is_none());
    }

    #[test]
    fn word2vec_dimension_mismatch_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("word_vectors.txt");
        fs::write(&path, "1 3\ngraph 1.0 0.0\n").unwrap();

        let err = WordVectors::load_word2vec_text(&path).unwrap_err();
        assert_eq!(err.kind, crate::core::error::ErrorKind::Corrupt);
    }

    #[test]
    fn weighted_embedding_mixes_by_tfidf() {
        let vectors = WordVectors::from_map(
            2,
            HashMap::from([
                ("a".to_string(), vec![1.0, 0.0]),
                ("b".to_string(), vec![0.0, 1.0]),
            ]),
        );
        let idf = IdfMap::from([("a".to_string(), 2.0), ("b".to_string(), 2.0)]);

        // tf(a) = 2/3, tf(b) = 1/3, equal idf: expect (2/3, 1/3) direction.
        let tokens = vec!["a".to_string(), "a".to_string(), "b".to_string()];
        let emb = vectors.weighted_embedding(&tokens, &idf);
        assert!((emb[0] - 2.0 / 3.0).abs() < 1e-6);
        assert!((emb[1] - 1.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn weighted_embedding_without_vocabulary_hits_is_zero() {
        let vectors = WordVectors::from_map(2, HashMap::new());
        let idf = IdfMap::new();
        let emb = vectors.weighted_embedding(&[String::from("nope")], &idf);
        assert_eq!(emb, vec![0.0, 0.0]);
    }
}
