//! Compression support for stored payloads

use std::io::Read;

use crate::error::Result;

/// Compress everything `source` yields into a zstd frame
pub fn compress<R: Read>(source: R, level: i32) -> Result<Vec<u8>> {
    Ok(zstd::stream::encode_all(source, level)?)
}

/// Decompress a zstd frame
pub fn decompress(data: &[u8]) -> Result<Vec<u8>> {
    Ok(zstd::stream::decode_all(data)?)
}
