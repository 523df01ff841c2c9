use std::fs;
use std::path::PathBuf;
use crate::core::error::Result;
use crate::core::types::DocId;

/// Directory structure under the data root.
#[derive(Debug, Clone)]
pub struct StorageLayout {
    pub data_dir: PathBuf,
    pub barrels_dir: PathBuf,   // barrel_<id>/ directories + barrels_index.json
    pub rankings_dir: PathBuf,  // static rank tables
    pub semantic_dir: PathBuf,  // embeddings + idf map
    pub mappings_dir: PathBuf,  // doc-id/url and paper-info tables
    pub models_dir: PathBuf,    // word vector model
    pub temp_dir: PathBuf,      // raw ingested documents
}

impl StorageLayout {
    pub fn new(data_dir: PathBuf) -> Result<Self> {
        let layout = StorageLayout {
            barrels_dir: data_dir.join("barrels"),
            rankings_dir: data_dir.join("rankings"),
            semantic_dir: data_dir.join("semantic"),
            mappings_dir: data_dir.join("mappings"),
            models_dir: data_dir.join("models"),
            temp_dir: data_dir.join("temp"),
            data_dir,
        };

        fs::create_dir_all(&layout.barrels_dir)?;
        fs::create_dir_all(&layout.rankings_dir)?;
        fs::create_dir_all(&layout.semantic_dir)?;
        fs::create_dir_all(&layout.mappings_dir)?;
        fs::create_dir_all(&layout.models_dir)?;
        fs::create_dir_all(&layout.temp_dir)?;

        Ok(layout)
    }

    pub fn barrels_index_path(&self) -> PathBuf {
        self.barrels_dir.join("barrels_index.json")
    }

    pub fn barrel_dir(&self, barrel_id: u32) -> PathBuf {
        self.barrels_dir.join(format!("barrel_{}", barrel_id))
    }

    pub fn page_rank_path(&self) -> PathBuf {
        self.rankings_dir.join("page_rank_dict.json")
    }

    pub fn domain_rank_path(&self) -> PathBuf {
        self.rankings_dir.join("domain_rank_dict.json")
    }

    pub fn citation_ranks_path(&self) -> PathBuf {
        self.rankings_dir.join("citation_ranks.json")
    }

    pub fn idf_map_path(&self) -> PathBuf {
        self.semantic_dir.join("idf_map.json")
    }

    pub fn html_embeddings_path(&self) -> PathBuf {
        self.semantic_dir.join("html_embeddings.bin")
    }

    pub fn json_embeddings_path(&self) -> PathBuf {
        self.semantic_dir.join("json_embeddings.bin")
    }

    pub fn word_vectors_path(&self) -> PathBuf {
        self.models_dir.join("word_vectors.txt")
    }

    pub fn url_map_path(&self) -> PathBuf {
        self.mappings_dir.join("ind_to_url.json")
    }

    pub fn paper_info_path(&self) -> PathBuf {
        self.mappings_dir.join("rps_info.json")
    }

    pub fn word_cache_path(&self) -> PathBuf {
        self.data_dir.join("word_cache.bin")
    }

    pub fn state_path(&self) -> PathBuf {
        self.data_dir.join("engine_state.json")
    }

    pub fn temp_paper_path(&self, doc_id: &DocId) -> PathBuf {
        self.temp_dir.join(format!("{}.json", doc_id))
    }
}
