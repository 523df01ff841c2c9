use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Config {
    pub data_dir: PathBuf,

    // Word-posting cache
    pub word_cache_size: usize,            // LRU capacity
    pub cache_auto_save_interval: usize,   // Snapshot after this many updates

    // Search defaults
    pub default_semantic_weight: f64,
    pub default_use_semantic: bool,

    // Background delta-merge policy
    pub merge_check_interval_secs: u64,    // Maintenance thread wake period
    pub merge_pending_threshold: usize,    // Pending hitlists before a barrel is merged
}

impl Default for Config {
    fn default() -> Self {
        Config {
            data_dir: PathBuf::from("./data"),

            word_cache_size: 500,
            cache_auto_save_interval: 50,

            default_semantic_weight: 20.0,
            default_use_semantic: true,

            merge_check_interval_secs: 30,
            merge_pending_threshold: 16,
        }
    }
}

impl Config {
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Config {
            data_dir: data_dir.into(),
            ..Config::default()
        }
    }
}
