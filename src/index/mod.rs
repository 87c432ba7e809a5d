//! Index Module
//!
//! Persistent open-addressing hash table mapping keys to payload locations,
//! stored directly in a memory-mapped file.
//!
//! ## Responsibilities
//! - Reserve a record for a new key (fails on duplicates)
//! - Attach a payload location to a reserved record
//! - Point lookups and existence checks
//! - Online growth (double + rehash) with handle relocation
//! - Structural verification on open
//!
//! ## File Format
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │ Block 0 (512 records)                                     │
//! │ ┌───────────────┬──────────────────────┬────────────────┐ │
//! │ │ Hash (16)     │ Size|Compressed (8)  │ Offset (8)     │ │
//! │ └───────────────┴──────────────────────┴────────────────┘ │
//! │ ... repeated, occupied records packed at block start ...  │
//! ├───────────────────────────────────────────────────────────┤
//! │ Block 1                                                   │
//! ├───────────────────────────────────────────────────────────┤
//! │ ...                                                       │
//! └───────────────────────────────────────────────────────────┘
//! ```
//! No header: the file length alone determines the block count. It is always
//! `INITIAL_SIZE * 2^n`. Bit 63 of the size word flags compressed payloads.

mod file;
mod record;
mod regions;

pub use file::IndexFile;
pub use record::{home_block, index_mask, Record};

// =============================================================================
// Shared Constants
// =============================================================================

/// Size of one record in bytes: hash (16) + size/flag (8) + offset (8)
pub const RECORD_SIZE: u64 = 32;

/// Records per block (probe runs never leave their home block)
pub const RECORDS_PER_BLOCK: u64 = 512;

/// Block size in bytes
pub const BLOCK_SIZE: u64 = RECORD_SIZE * RECORDS_PER_BLOCK;

/// Records in a freshly created index
pub const INITIAL_RECORDS: u64 = 2048;

/// Length of a freshly created index file in bytes
pub const INITIAL_SIZE: u64 = INITIAL_RECORDS * RECORD_SIZE;

/// Default fraction of capacity that triggers growth
pub const DEFAULT_LOAD_FACTOR: f32 = 0.8;

/// Bit flagging a compressed payload in the size word
pub(crate) const COMPRESSED_FLAG: u64 = 1 << 63;

// =============================================================================
// Location Metadata
// =============================================================================

/// Where a payload lives in the data file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IndexData {
    pub offset: u64,
    pub size: u64,
    pub is_compressed: bool,
}

impl IndexData {
    /// Key reserved, no data attached yet
    pub const EMPTY: IndexData = IndexData {
        offset: 0,
        size: 0,
        is_compressed: false,
    };

    pub fn new(offset: u64, size: u64, is_compressed: bool) -> Self {
        Self {
            offset,
            size,
            is_compressed,
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::EMPTY
    }
}

/// Opaque reservation returned by [`IndexFile::reserve`].
///
/// Valid for exactly one [`IndexFile::attach`]. Growth between the two calls
/// relocates the record; the handle keeps pointing at it.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct SlotHandle {
    ticket: u64,
}

impl SlotHandle {
    pub(crate) fn new(ticket: u64) -> Self {
        Self { ticket }
    }

    pub(crate) fn ticket(&self) -> u64 {
        self.ticket
    }
}
