//! Mapped Regions
//!
//! Registry of memory-mapped windows over the index file, sorted by file
//! offset. Growth maps only the new tail, so the table is addressed through
//! `(file offset) -> (region, local offset)` instead of one contiguous map.

use std::fs::File;
use std::io;

use memmap2::{MmapMut, MmapOptions};

/// One mapped window `[base, base + len)` of the index file
struct MappedRegion {
    base: u64,
    map: MmapMut,
}

impl MappedRegion {
    fn map(file: &File, base: u64, len: u64) -> io::Result<Self> {
        // Safety: the file is exclusively locked by this process for as long
        // as the region lives, and it is never truncated below `base + len`.
        let map = unsafe {
            MmapOptions::new()
                .offset(base)
                .len(len as usize)
                .map_mut(file)?
        };
        Ok(Self { base, map })
    }

    fn end(&self) -> u64 {
        self.base + self.map.len() as u64
    }
}

/// Sorted, gap-free list of mapped regions covering the whole file
pub(super) struct RegionMap {
    regions: Vec<MappedRegion>,
}

impl RegionMap {
    /// Map `[0, len)` of `file` as a single region
    pub fn new(file: &File, len: u64) -> io::Result<Self> {
        Ok(Self {
            regions: vec![MappedRegion::map(file, 0, len)?],
        })
    }

    /// Map the tail `[len(), len() + extra)` after the file was extended
    pub fn extend(&mut self, file: &File, extra: u64) -> io::Result<()> {
        let base = self.len();
        self.regions.push(MappedRegion::map(file, base, extra)?);
        Ok(())
    }

    /// Total mapped length in bytes
    pub fn len(&self) -> u64 {
        self.regions.last().map(|r| r.end()).unwrap_or(0)
    }

    pub fn region_count(&self) -> usize {
        self.regions.len()
    }

    /// Borrow `len` bytes at file offset `at` (must not straddle regions)
    pub fn slice(&self, at: u64, len: u64) -> &[u8] {
        let region = &self.regions[self.locate(at)];
        let local = (at - region.base) as usize;
        &region.map[local..local + len as usize]
    }

    /// Mutable variant of [`RegionMap::slice`]
    pub fn slice_mut(&mut self, at: u64, len: u64) -> &mut [u8] {
        let idx = self.locate(at);
        let region = &mut self.regions[idx];
        let local = (at - region.base) as usize;
        &mut region.map[local..local + len as usize]
    }

    /// Overwrite every region from a buffer spanning the whole file
    pub fn copy_from(&mut self, buffer: &[u8]) {
        for region in &mut self.regions {
            let start = region.base as usize;
            let end = start + region.map.len();
            region.map.copy_from_slice(&buffer[start..end]);
        }
    }

    /// Force dirty pages of every region to disk
    pub fn flush(&self) -> io::Result<()> {
        for region in &self.regions {
            region.map.flush()?;
        }
        Ok(())
    }

    fn locate(&self, at: u64) -> usize {
        // Last region whose base is <= at
        self.regions.partition_point(|r| r.base <= at) - 1
    }
}
