//! Storage Module
//!
//! Append-only payload file plus the per-stream hints callers supply.
//!
//! ## Responsibilities
//! - Allocate offsets and append payloads (one writer at a time)
//! - Read exact byte ranges back for the read path
//! - Compress and decompress payloads (zstd)
//!
//! ## File Format
//! ```text
//! ┌──────────────┬──────────────┬──────────────┬─────┐
//! │ Payload 1    │ Payload 2    │ Payload 3    │ ... │
//! │ (raw | zstd) │ (raw | zstd) │ (raw | zstd) │     │
//! └──────────────┴──────────────┴──────────────┴─────┘
//! ```
//! No headers or delimiters; boundaries live only in the index. Ranges are
//! never rewritten, so offsets strictly increase.

pub mod compression;
mod data_file;

pub use data_file::DataFile;

/// Payload file name inside the working directory
pub const STORAGE_FILE_NAME: &str = "storage.bin";

/// Index file name inside the working directory
pub const INDEX_FILE_NAME: &str = "index.bin";

/// Caller-supplied hints about a stream passed to `add`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamInfo {
    /// Expected stream length; a mismatch fails with `Inconsistent`
    pub length: Option<u64>,

    /// Expected MD5 of the stream; a mismatch fails with `Inconsistent`
    pub hash: Option<Vec<u8>>,

    /// The stream is already a zstd frame; store it as is
    pub is_compressed: bool,
}

impl StreamInfo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_length(mut self, length: u64) -> Self {
        self.length = Some(length);
        self
    }

    pub fn with_hash(mut self, hash: impl Into<Vec<u8>>) -> Self {
        self.hash = Some(hash.into());
        self
    }

    pub fn compressed(mut self) -> Self {
        self.is_compressed = true;
        self
    }
}
