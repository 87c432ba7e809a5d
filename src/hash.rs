//! Hashing
//!
//! MD5 is used twice: to place keys in the index and to verify the
//! content hash a caller may declare for a stream.

use std::io::{self, Read};

use md5::{Digest, Md5};

/// Size of a digest in bytes
pub const DIGEST_SIZE: usize = 16;

/// 128-bit key hash split into the two words stored in an index record.
///
/// `high` is the first eight digest bytes read little-endian; it selects the
/// home block. The all-zero hash is reserved for the empty sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyHash {
    pub high: u64,
    pub low: u64,
}

impl KeyHash {
    /// Hash a string key
    pub fn of(key: &str) -> Self {
        let digest: [u8; DIGEST_SIZE] = Md5::digest(key.as_bytes()).into();
        Self::from_digest(&digest)
    }

    pub fn from_digest(digest: &[u8; DIGEST_SIZE]) -> Self {
        let mut high = [0u8; 8];
        let mut low = [0u8; 8];
        high.copy_from_slice(&digest[0..8]);
        low.copy_from_slice(&digest[8..16]);
        Self {
            high: u64::from_le_bytes(high),
            low: u64::from_le_bytes(low),
        }
    }

    /// True for the empty sentinel value
    pub fn is_empty(&self) -> bool {
        self.high == 0 && self.low == 0
    }
}

/// Digest everything `reader` yields, returning the digest and byte count
pub fn digest_reader<R: Read + ?Sized>(reader: &mut R) -> io::Result<([u8; DIGEST_SIZE], u64)> {
    let mut hasher = Md5::new();
    let total = io::copy(reader, &mut hasher)?;

    let digest: [u8; DIGEST_SIZE] = hasher.finalize().into();
    Ok((digest, total))
}

/// Digest an in-memory buffer
pub fn digest_bytes(data: &[u8]) -> [u8; DIGEST_SIZE] {
    Md5::digest(data).into()
}
