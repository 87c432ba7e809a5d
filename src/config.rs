//! Configuration for blobkv
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;

/// Main configuration for a blobkv store
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Working directory holding both files
    /// Internal structure:
    ///   {data_dir}/
    ///     ├── storage.bin      (append-only payloads)
    ///     └── index.bin        (memory-mapped hash index)
    pub data_dir: PathBuf,

    /// Payloads longer than this (in bytes) are compressed before storing
    pub compression_threshold: u64,

    /// zstd compression level
    pub compression_level: i32,

    /// Maximum size of the storage file in bytes (0 = unlimited).
    /// Declared for compatibility, not enforced.
    pub max_storage_file: u64,

    /// Maximum size of the index file in bytes (0 = unlimited).
    /// Declared for compatibility, not enforced.
    pub max_index_file: u64,

    // -------------------------------------------------------------------------
    // Index Configuration
    // -------------------------------------------------------------------------
    /// Fraction of index capacity that triggers growth, in `[0, 1]`
    pub index_load_factor: f32,

    // -------------------------------------------------------------------------
    // Cache Configuration
    // -------------------------------------------------------------------------
    /// Max number of decompressed payloads kept in the read cache
    pub cache_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./blobkv_data"),
            compression_threshold: 4096,
            compression_level: 3,
            max_storage_file: 0,
            max_index_file: 0,
            index_load_factor: crate::index::DEFAULT_LOAD_FACTOR,
            cache_capacity: crate::cache::DEFAULT_CAPACITY,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the working directory (root for both files)
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Set the compression threshold (in bytes)
    pub fn compression_threshold(mut self, bytes: u64) -> Self {
        self.config.compression_threshold = bytes;
        self
    }

    /// Set the zstd compression level
    pub fn compression_level(mut self, level: i32) -> Self {
        self.config.compression_level = level;
        self
    }

    /// Set the declared maximum storage file size (in bytes)
    pub fn max_storage_file(mut self, bytes: u64) -> Self {
        self.config.max_storage_file = bytes;
        self
    }

    /// Set the declared maximum index file size (in bytes)
    pub fn max_index_file(mut self, bytes: u64) -> Self {
        self.config.max_index_file = bytes;
        self
    }

    /// Set the index load factor
    pub fn index_load_factor(mut self, load_factor: f32) -> Self {
        self.config.index_load_factor = load_factor;
        self
    }

    /// Set the read cache capacity (entry count)
    pub fn cache_capacity(mut self, count: usize) -> Self {
        self.config.cache_capacity = count;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
