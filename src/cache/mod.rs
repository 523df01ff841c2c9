pub mod word_cache;
