use std::collections::HashMap;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use memmap2::Mmap;
use crate::core::error::{Error, Result};
use crate::index::hitlist::PostingList;

/// Plain read-only barrel: one mmap'd posting file plus its offsets
/// table. Used by offline tooling; the live service reads through
/// `LsmBarrel`, which layers a delta on the same base format.
pub struct MmapBarrel {
    pub dir: PathBuf,
    offsets: HashMap<String, (u64, u64)>,
    mmap: Option<Mmap>,
}

impl MmapBarrel {
    pub fn open(dir: &Path) -> Result<Self> {
        let offsets_path = dir.join("offsets.json");
        let postings_path = dir.join("postings.bin");

        let offsets: HashMap<String, (u64, u64)> = serde_json::from_slice(
            &fs::read(&offsets_path)
                .map_err(|e| Error::not_found(format!("{}: {}", offsets_path.display(), e)))?,
        )
        .map_err(|e| Error::corrupt(format!("{}: {}", offsets_path.display(), e)))?;

        let file = File::open(&postings_path)
            .map_err(|e| Error::not_found(format!("{}: {}", postings_path.display(), e)))?;
        let mmap = if file.metadata()?.len() > 0 {
            Some(unsafe { Mmap::map(&file)? })
        } else {
            None
        };

        Ok(MmapBarrel {
            dir: dir.to_path_buf(),
            offsets,
            mmap,
        })
    }

    pub fn get(&self, word_index: u64) -> Result<PostingList> {
        let Some(&(offset, len)) = self.offsets.get(&word_index.to_string()) else {
            return Ok(Vec::new());
        };
        let Some(mmap) = &self.mmap else {
            return Ok(Vec::new());
        };

        let start = offset as usize;
        let end = start + len as usize;
        let span = mmap
            .get(start..end)
            .ok_or_else(|| Error::corrupt(format!("posting span out of bounds in {}", self.dir.display())))?;
        bincode::deserialize(span)
            .map_err(|e| Error::corrupt(format!("posting blob in {}: {}", self.dir.display(), e)))
    }

    pub fn word_count(&self) -> usize {
        self.offsets.len()
    }
}
