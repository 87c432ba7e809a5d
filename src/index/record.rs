//! Index Record
//!
//! Fixed-width little-endian encoding of one index record, independent of
//! in-memory layout.

use crate::hash::KeyHash;

use super::{IndexData, BLOCK_SIZE, COMPRESSED_FLAG, RECORD_SIZE};

// Field offsets within a record
const OFF_HASH_HIGH: usize = 0;
const OFF_HASH_LOW: usize = 8;
const OFF_SIZE: usize = 16;
const OFF_OFFSET: usize = 24;

/// Block size expressed in 8-byte words; the bucket mask works in words
const BLOCK_WORDS: u64 = BLOCK_SIZE / 8;

/// One decoded index record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Record {
    pub hash: KeyHash,
    pub size_and_flag: u64,
    pub offset: u64,
}

impl Record {
    /// A freshly reserved record: hash set, no location
    pub fn reserved(hash: KeyHash) -> Self {
        Self {
            hash,
            size_and_flag: 0,
            offset: 0,
        }
    }

    pub fn decode(bytes: &[u8]) -> Self {
        Self {
            hash: KeyHash {
                high: read_u64(bytes, OFF_HASH_HIGH),
                low: read_u64(bytes, OFF_HASH_LOW),
            },
            size_and_flag: read_u64(bytes, OFF_SIZE),
            offset: read_u64(bytes, OFF_OFFSET),
        }
    }

    pub fn encode(&self, out: &mut [u8]) {
        out[OFF_HASH_HIGH..OFF_HASH_HIGH + 8].copy_from_slice(&self.hash.high.to_le_bytes());
        out[OFF_HASH_LOW..OFF_HASH_LOW + 8].copy_from_slice(&self.hash.low.to_le_bytes());
        out[OFF_SIZE..OFF_SIZE + 8].copy_from_slice(&self.size_and_flag.to_le_bytes());
        out[OFF_OFFSET..OFF_OFFSET + 8].copy_from_slice(&self.offset.to_le_bytes());
    }

    /// Empty sentinel: both hash words zero
    pub fn is_empty(&self) -> bool {
        self.hash.is_empty()
    }

    pub fn set_location(&mut self, data: &IndexData) {
        self.size_and_flag = if data.is_compressed {
            data.size | COMPRESSED_FLAG
        } else {
            data.size
        };
        self.offset = data.offset;
    }

    pub fn location(&self) -> IndexData {
        IndexData {
            offset: self.offset,
            size: self.size_and_flag & !COMPRESSED_FLAG,
            is_compressed: self.size_and_flag & COMPRESSED_FLAG != 0,
        }
    }
}

/// Read only the hash words of an encoded record
pub(crate) fn decode_hash(bytes: &[u8]) -> KeyHash {
    KeyHash {
        high: read_u64(bytes, OFF_HASH_HIGH),
        low: read_u64(bytes, OFF_HASH_LOW),
    }
}

/// Bucket mask for a table of `blocks` blocks (power of two).
///
/// Selects the block-number bits of a hash word addressed in 8-byte units.
pub fn index_mask(blocks: u64) -> u64 {
    (blocks - 1) * BLOCK_WORDS
}

/// Home block of `hash` under `mask`
pub fn home_block(hash: &KeyHash, mask: u64) -> u64 {
    (hash.high & mask) / BLOCK_WORDS
}

fn read_u64(bytes: &[u8], at: usize) -> u64 {
    let mut word = [0u8; 8];
    word.copy_from_slice(&bytes[at..at + 8]);
    u64::from_le_bytes(word)
}

const _: () = assert!(RECORD_SIZE as usize == OFF_OFFSET + 8);
