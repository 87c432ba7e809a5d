//! Engine Module
//!
//! The blob store that coordinates the index, the data file and the cache.
//!
//! ## Responsibilities
//! - Validate streams against caller hints (length, MD5)
//! - Compress payloads above the configured threshold
//! - Reserve the key before writing bytes, attach the location after
//! - Serve reads through the bounded cache

use std::fs;
use std::io::{Cursor, Read, Seek, SeekFrom};
use std::path::Path;

use bytes::Bytes;

use crate::cache::{BoundedCache, MemoryBudget, SystemMemory};
use crate::config::Config;
use crate::error::{BlobError, Result};
use crate::hash;
use crate::index::{IndexData, IndexFile};
use crate::storage::{compression, DataFile, StreamInfo, INDEX_FILE_NAME, STORAGE_FILE_NAME};

/// File-backed key → blob store
///
/// ## Concurrency Model
///
/// All methods take `&self`; share the store across threads with `Arc`.
///
/// - **Index**: reservations and growth are serialized by the index lock,
///   lookups share it
/// - **Data file**: offset allocation + append is atomic under its own lock,
///   reads use a separate handle
/// - **Cache**: admission uses its own lock; loads run unlocked
///
/// ## Failure Model
///
/// `add` is atomic at reservation granularity only. If it fails after the key
/// was reserved, the key stays present with no data and `get` reports
/// `NotFound` for it. Bytes already appended are not reclaimed.
pub struct BlobStore {
    config: Config,
    data: DataFile,
    index: IndexFile,
    cache: BoundedCache,
}

impl BlobStore {
    /// Open or create a store, budgeting the cache from system memory
    pub fn open(config: Config) -> Result<Self> {
        Self::open_with_budget(config, SystemMemory::new())
    }

    /// Open with the default config in the given directory
    pub fn open_path(path: &Path) -> Result<Self> {
        Self::open(Config::builder().data_dir(path).build())
    }

    /// Open or create a store with an explicit cache budget
    ///
    /// On startup:
    /// 1. Create the working directory
    /// 2. Open and lock the data file
    /// 3. Open, lock and verify the index
    /// 4. Start with an empty cache
    pub fn open_with_budget(config: Config, budget: impl MemoryBudget + 'static) -> Result<Self> {
        fs::create_dir_all(&config.data_dir)?;

        if config.max_storage_file != 0 || config.max_index_file != 0 {
            tracing::debug!(
                max_storage_file = config.max_storage_file,
                max_index_file = config.max_index_file,
                "File size limits are declared but not enforced"
            );
        }

        let data = DataFile::open(config.data_dir.join(STORAGE_FILE_NAME))?;
        let index = IndexFile::open_with_load_factor(
            config.data_dir.join(INDEX_FILE_NAME),
            config.index_load_factor,
        )?;
        let cache = BoundedCache::with_capacity(budget, config.cache_capacity);

        tracing::info!(
            data_dir = %config.data_dir.display(),
            entries = index.entries_count(),
            data_len = data.len(),
            "Opened blob store"
        );

        Ok(Self {
            config,
            data,
            index,
            cache,
        })
    }

    /// Store the full contents of `stream` under `key`
    ///
    /// Steps:
    /// 1. Reject an empty key or an empty stream
    /// 2. Check the declared length and MD5, then rewind
    /// 3. Reserve the key (fails fast on `DuplicateKey`)
    /// 4. Compress unless already compressed or not above the threshold
    /// 5. Append to the data file and attach the location
    pub fn add<R: Read + Seek>(&self, key: &str, stream: &mut R, info: &StreamInfo) -> Result<()> {
        if key.is_empty() {
            return Err(BlobError::InvalidArgument("key is empty".to_string()));
        }

        let length = stream.seek(SeekFrom::End(0))?;
        stream.rewind()?;
        if length == 0 {
            return Err(BlobError::InvalidArgument(format!("stream for {:?} is empty", key)));
        }

        if let Some(expected) = info.length {
            if expected != length {
                return Err(BlobError::Inconsistent(format!(
                    "declared length {} but stream has {} bytes",
                    expected, length
                )));
            }
        }

        let (digest, _) = hash::digest_reader(stream)?;
        if let Some(expected) = &info.hash {
            if expected.as_slice() != digest.as_slice() {
                return Err(BlobError::Inconsistent(format!(
                    "declared hash {} but stream hashes to {}",
                    hex::encode(expected),
                    hex::encode(digest)
                )));
            }
        }
        stream.rewind()?;

        let compress = !info.is_compressed && length > self.config.compression_threshold;
        let handle = self.index.reserve(key)?;

        let stored = self.prepare(stream, length, compress).and_then(|payload| {
            let offset = self.data.append(&payload)?;
            Ok(IndexData::new(
                offset,
                payload.len() as u64,
                compress || info.is_compressed,
            ))
        });

        let location = match stored {
            Ok(location) => location,
            Err(e) => {
                tracing::warn!(key, error = %e, "Add failed after reservation; key has no data");
                self.index.abandon(handle);
                return Err(e);
            }
        };
        self.index.attach(handle, location)?;

        tracing::debug!(
            key,
            length,
            stored = location.size,
            offset = location.offset,
            compressed = location.is_compressed,
            "Added blob"
        );

        Ok(())
    }

    /// Store an in-memory buffer under `key`
    pub fn add_bytes(&self, key: &str, data: &[u8], info: &StreamInfo) -> Result<()> {
        self.add(key, &mut Cursor::new(data), info)
    }

    /// Independent reader over the (decompressed) payload of `key`
    pub fn get(&self, key: &str) -> Result<Cursor<Bytes>> {
        Ok(Cursor::new(self.get_bytes(key)?))
    }

    /// Payload of `key` as shared bytes
    pub fn get_bytes(&self, key: &str) -> Result<Bytes> {
        self.cache.get_or_load(key, |key| self.load(key))
    }

    /// Whether `key` was added (including keys reserved without data)
    pub fn contains(&self, key: &str) -> Result<bool> {
        self.index.contains(key)
    }

    /// Sync the data file and flush the index without closing
    pub fn flush(&self) -> Result<()> {
        self.data.sync()?;
        self.index.flush()
    }

    /// Close the store gracefully
    ///
    /// Syncs the data file, flushes and unmaps the index, then releases both
    /// file locks.
    pub fn close(self) -> Result<()> {
        self.data.sync()?;
        self.index.flush()?;
        self.index.close();

        tracing::info!(data_dir = %self.config.data_dir.display(), "Closed blob store");
        Ok(())
    }

    /// Cache loader: index lookup, ranged read, optional decompression
    fn load(&self, key: &str) -> Result<Bytes> {
        let location = self.index.lookup(key)?;
        if location.is_empty() {
            return Err(BlobError::NotFound(key.to_string()));
        }

        let raw = self.data.read_at(location.offset, location.size)?;
        let payload = if location.is_compressed {
            compression::decompress(&raw)?
        } else {
            raw
        };

        Ok(Bytes::from(payload))
    }

    fn prepare<R: Read>(&self, stream: &mut R, length: u64, compress: bool) -> Result<Vec<u8>> {
        if compress {
            return compression::compress(stream, self.config.compression_level);
        }

        let mut payload = Vec::with_capacity(length as usize);
        stream.read_to_end(&mut payload)?;
        Ok(payload)
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// Get the data directory path
    pub fn data_dir(&self) -> &Path {
        &self.config.data_dir
    }

    /// Number of keys in the index (reserved ones included)
    pub fn entries_count(&self) -> u64 {
        self.index.entries_count()
    }

    /// Current length of the data file in bytes
    pub fn data_file_len(&self) -> u64 {
        self.data.len()
    }

    /// Number of cached payloads
    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    /// Bytes held by the cache
    pub fn cache_resident_bytes(&self) -> u64 {
        self.cache.resident_bytes()
    }

    /// Total record capacity of the index
    pub fn index_capacity(&self) -> u64 {
        self.index.capacity()
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }
}
