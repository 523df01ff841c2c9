use std::collections::{BTreeSet, HashMap};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use memmap2::Mmap;
use parking_lot::RwLock;
use crate::core::error::{Error, Result};
use crate::index::hitlist::PostingList;
use crate::storage::write_json_atomic;

/// Commit sentinel for compaction. Present on disk only between the
/// point where the new base is fully written and the point where the
/// delta has been cleared; `recover` rolls the swap forward when it
/// finds one, and discards stray temp files when it does not.
const COMPACTION_MARKER: &str = "compaction.commit";

type BaseOffsets = HashMap<String, (u64, u64)>;
type DeltaOffsets = HashMap<String, Vec<(u64, u64)>>;

#[derive(Debug)]
struct BaseStore {
    offsets: BaseOffsets,
    mmap: Option<Mmap>,
}

#[derive(Debug)]
struct DeltaStore {
    offsets: DeltaOffsets,
    // Readers clone the Arc and keep reading their snapshot while an
    // append publishes a fresh map.
    mmap: Option<Arc<Mmap>>,
}

/// Log-structured barrel: an immutable mmap'd base posting file plus an
/// append-only delta file. A word's posting list is the concatenation
/// of its base record and every delta record.
#[derive(Debug)]
pub struct LsmBarrel {
    pub dir: PathBuf,
    base: RwLock<BaseStore>,
    delta: RwLock<DeltaStore>,
}

impl LsmBarrel {
    pub fn open(dir: &Path) -> Result<Self> {
        Self::recover(dir)?;

        let base_postings = dir.join("postings.bin");
        let base_offsets_path = dir.join("offsets.json");
        if !base_postings.exists() || !base_offsets_path.exists() {
            return Err(Error::not_found(format!(
                "base barrel files not found in {}",
                dir.display()
            )));
        }

        let offsets: BaseOffsets = serde_json::from_slice(&fs::read(&base_offsets_path)?)
            .map_err(|e| Error::corrupt(format!("{}: {}", base_offsets_path.display(), e)))?;
        let base_mmap = map_file(&base_postings)?;

        let delta_offsets_path = dir.join("delta_offsets.json");
        let delta_offsets: DeltaOffsets = if delta_offsets_path.exists() {
            serde_json::from_slice(&fs::read(&delta_offsets_path)?)
                .map_err(|e| Error::corrupt(format!("{}: {}", delta_offsets_path.display(), e)))?
        } else {
            DeltaOffsets::new()
        };
        let delta_postings = dir.join("delta_postings.bin");
        let delta_mmap = if delta_postings.exists() {
            map_file(&delta_postings)?.map(Arc::new)
        } else {
            None
        };

        Ok(LsmBarrel {
            dir: dir.to_path_buf(),
            base: RwLock::new(BaseStore { offsets, mmap: base_mmap }),
            delta: RwLock::new(DeltaStore { offsets: delta_offsets, mmap: delta_mmap }),
        })
    }

    /// Write a fresh base barrel (no delta). Offline build and tests.
    pub fn create(dir: &Path, entries: &[(u64, PostingList)]) -> Result<()> {
        fs::create_dir_all(dir)?;

        let mut offsets = BaseOffsets::new();
        let mut file = File::create(dir.join("postings.bin"))?;
        let mut cursor = 0u64;
        for (word_index, postings) in entries {
            let blob = bincode::serialize(postings)?;
            file.write_all(&blob)?;
            offsets.insert(word_index.to_string(), (cursor, blob.len() as u64));
            cursor += blob.len() as u64;
        }
        file.sync_all()?;

        write_json_atomic(&dir.join("offsets.json"), &offsets)
    }

    /// Base record (if any) followed by every delta record (if any).
    pub fn get(&self, word_index: u64) -> Result<PostingList> {
        let key = word_index.to_string();
        // Base before delta, same order as compaction, so a reader
        // never sees a record in neither layer.
        let base = self.base.read();
        let delta = self.delta.read();

        let mut postings = decode_base(&base, &self.dir, &key)?;
        postings.extend(decode_delta(&delta, &self.dir, &key)?);
        Ok(postings)
    }

    /// Append a batch of postings for one word to the delta file. The
    /// offsets table is persisted only after the bytes are durable, so
    /// a crash in between leaves invisible orphan bytes, never a torn
    /// record.
    pub fn append_delta(&self, word_index: u64, postings: &PostingList) -> Result<()> {
        let blob = bincode::serialize(postings)?;

        let mut delta = self.delta.write();
        let delta_postings = self.dir.join("delta_postings.bin");
        let cursor = fs::metadata(&delta_postings).map(|m| m.len()).unwrap_or(0);

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&delta_postings)?;
        file.write_all(&blob)?;
        file.sync_all()?;

        delta
            .offsets
            .entry(word_index.to_string())
            .or_default()
            .push((cursor, blob.len() as u64));
        write_json_atomic(&self.dir.join("delta_offsets.json"), &delta.offsets)?;

        // Publish a fresh map covering the appended bytes.
        delta.mmap = map_file(&delta_postings)?.map(Arc::new);
        Ok(())
    }

    /// Merge delta into base and clear the delta. Takes both write
    /// locks; callers schedule this only in maintenance windows.
    pub fn compact(&self) -> Result<()> {
        let mut base = self.base.write();
        let mut delta = self.delta.write();

        let keys: BTreeSet<String> = base
            .offsets
            .keys()
            .chain(delta.offsets.keys())
            .cloned()
            .collect();

        let mut merged: Vec<(String, PostingList)> = Vec::with_capacity(keys.len());
        for key in keys {
            let mut postings = decode_base(&base, &self.dir, &key)?;
            postings.extend(decode_delta(&delta, &self.dir, &key)?);
            merged.push((key, postings));
        }

        // Unmap before the base file is replaced.
        base.mmap = None;

        let base_postings = self.dir.join("postings.bin");
        let base_offsets_path = self.dir.join("offsets.json");
        let postings_tmp = self.dir.join("postings.bin.tmp");
        let offsets_tmp = self.dir.join("offsets.json.tmp");

        let mut new_offsets = BaseOffsets::new();
        {
            let mut file = File::create(&postings_tmp)?;
            let mut cursor = 0u64;
            for (key, postings) in &merged {
                let blob = bincode::serialize(postings)?;
                file.write_all(&blob)?;
                new_offsets.insert(key.clone(), (cursor, blob.len() as u64));
                cursor += blob.len() as u64;
            }
            file.sync_all()?;
        }
        fs::write(&offsets_tmp, serde_json::to_vec(&new_offsets)?)?;

        // Commit point: from here recovery rolls forward.
        let marker = self.dir.join(COMPACTION_MARKER);
        fs::write(&marker, b"")?;
        fs::rename(&postings_tmp, &base_postings)?;
        fs::rename(&offsets_tmp, &base_offsets_path)?;
        clear_delta(&self.dir)?;
        fs::remove_file(&marker)?;

        base.offsets = new_offsets;
        base.mmap = map_file(&base_postings)?;
        delta.offsets.clear();
        delta.mmap = None;

        println!("Compacted barrel {}", self.dir.display());
        Ok(())
    }

    /// Finish or discard an interrupted compaction before opening.
    fn recover(dir: &Path) -> Result<()> {
        let marker = dir.join(COMPACTION_MARKER);
        let postings_tmp = dir.join("postings.bin.tmp");
        let offsets_tmp = dir.join("offsets.json.tmp");

        if marker.exists() {
            println!("Finishing interrupted compaction in {}", dir.display());
            if postings_tmp.exists() {
                fs::rename(&postings_tmp, dir.join("postings.bin"))?;
            }
            if offsets_tmp.exists() {
                fs::rename(&offsets_tmp, dir.join("offsets.json"))?;
            }
            clear_delta(dir)?;
            fs::remove_file(&marker)?;
        } else {
            // Partial new base that never reached the commit point.
            if postings_tmp.exists() {
                fs::remove_file(&postings_tmp)?;
            }
            if offsets_tmp.exists() {
                fs::remove_file(&offsets_tmp)?;
            }
        }
        Ok(())
    }

    /// Number of words with at least one delta record.
    pub fn delta_word_count(&self) -> usize {
        self.delta.read().offsets.len()
    }
}

fn clear_delta(dir: &Path) -> Result<()> {
    File::create(dir.join("delta_postings.bin"))?;
    write_json_atomic(&dir.join("delta_offsets.json"), &DeltaOffsets::new())
}

fn map_file(path: &Path) -> Result<Option<Mmap>> {
    let file = File::open(path)?;
    if file.metadata()?.len() == 0 {
        return Ok(None);
    }
    Ok(Some(unsafe { Mmap::map(&file)? }))
}

fn decode_span(mmap: &Mmap, dir: &Path, offset: u64, len: u64) -> Result<PostingList> {
    let start = offset as usize;
    let end = start + len as usize;
    let span = mmap
        .get(start..end)
        .ok_or_else(|| Error::corrupt(format!("posting span out of bounds in {}", dir.display())))?;
    bincode::deserialize(span)
        .map_err(|e| Error::corrupt(format!("posting blob in {}: {}", dir.display(), e)))
}

fn decode_base(base: &BaseStore, dir: &Path, key: &str) -> Result<PostingList> {
    let Some(&(offset, len)) = base.offsets.get(key) else {
        return Ok(Vec::new());
    };
    let Some(mmap) = &base.mmap else {
        return Ok(Vec::new());
    };
    decode_span(mmap, dir, offset, len)
}

fn decode_delta(delta: &DeltaStore, dir: &Path, key: &str) -> Result<PostingList> {
    let Some(records) = delta.offsets.get(key) else {
        return Ok(Vec::new());
    };
    let Some(mmap) = &delta.mmap else {
        return Ok(Vec::new());
    };
    let mut postings = Vec::new();
    for &(offset, len) in records {
        postings.extend(decode_span(mmap, dir, offset, len)?);
    }
    Ok(postings)
}
