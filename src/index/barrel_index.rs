use std::collections::HashMap;
use std::fs;
use std::path::Path;
use crate::core::error::{Error, Result};

/// Immutable word -> (barrel_id, word_index) lookup, produced by the
/// offline index build. Words missing here never reach the durable
/// keyword index at runtime.
#[derive(Debug)]
pub struct BarrelIndex {
    map: HashMap<String, (u32, u64)>,
}

impl BarrelIndex {
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = fs::read(path)
            .map_err(|e| Error::not_found(format!("barrel index {}: {}", path.display(), e)))?;
        let map: HashMap<String, (u32, u64)> = serde_json::from_slice(&bytes)
            .map_err(|e| Error::corrupt(format!("barrel index {}: {}", path.display(), e)))?;
        Ok(BarrelIndex { map })
    }

    pub fn from_map(map: HashMap<String, (u32, u64)>) -> Self {
        BarrelIndex { map }
    }

    pub fn get(&self, word: &str) -> Option<(u32, u64)> {
        self.map.get(word).copied()
    }

    pub fn contains(&self, word: &str) -> bool {
        self.map.contains_key(word)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}
