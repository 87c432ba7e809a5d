//! Index File
//!
//! Memory-mapped hash table with online growth.
//!
//! ## Probing
//! A key's 128-bit hash selects a home block via `hash.high & index_mask`.
//! Records are probed linearly inside that block only; the first empty
//! record ends the run. Nothing is ever removed, so occupied records stay
//! packed at the start of each block.
//!
//! ## Reservations
//! `reserve` and `attach` are separate calls so the payload can be written
//! in between. Each reservation gets a ticket; the ticket → record map is
//! rewritten by growth, so a handle always resolves to the record's current
//! position and is consumed by `attach`.

use std::collections::HashMap;
use std::fs::{File, OpenOptions, TryLockError};
use std::path::{Path, PathBuf};

use parking_lot::RwLock;

use crate::error::{BlobError, Result};
use crate::hash::KeyHash;

use super::record::{decode_hash, home_block, index_mask, Record};
use super::regions::RegionMap;
use super::{
    IndexData, SlotHandle, BLOCK_SIZE, COMPRESSED_FLAG, DEFAULT_LOAD_FACTOR, INITIAL_SIZE,
    RECORDS_PER_BLOCK, RECORD_SIZE,
};

const NAME: &str = "IndexFile";

/// Persistent key → location index
///
/// ## Concurrency:
/// - `reserve`, `attach` and growth take the write lock
/// - `lookup`, `contains` and `flush` share the read lock
/// - Growth runs inside `reserve`, so it excludes every other operation
pub struct IndexFile {
    path: PathBuf,
    load_factor: f32,

    /// `None` once closed
    state: RwLock<Option<IndexState>>,
}

/// Everything released on close
struct IndexState {
    regions: RegionMap,

    /// Holds the exclusive OS lock
    file: File,

    blocks: u64,
    index_mask: u64,
    entries: u64,

    next_ticket: u64,

    /// Outstanding reservations: ticket → current record position
    pending: HashMap<u64, u64>,
}

enum Probe {
    Found(u64),
    Vacant(u64),
    BlockFull,
}

impl IndexFile {
    /// Open or create an index with the default load factor
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_load_factor(path, DEFAULT_LOAD_FACTOR)
    }

    /// Open or create an index file
    ///
    /// On open:
    /// 1. Take an exclusive lock on the file (fails with `IoConflict`)
    /// 2. Size a new file to `INITIAL_SIZE`, or validate an existing length
    /// 3. Map the file and verify every occupied record sits in its home block
    pub fn open_with_load_factor(path: impl AsRef<Path>, load_factor: f32) -> Result<Self> {
        if !(0.0..=1.0).contains(&load_factor) {
            return Err(BlobError::InvalidArgument(format!(
                "load factor {} is outside [0, 1]",
                load_factor
            )));
        }

        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;

        match file.try_lock() {
            Ok(()) => {}
            Err(TryLockError::WouldBlock) => {
                return Err(BlobError::IoConflict(path.display().to_string()));
            }
            Err(TryLockError::Error(e)) => return Err(e.into()),
        }

        let mut len = file.metadata()?.len();
        if len == 0 {
            file.set_len(INITIAL_SIZE)?;
            len = INITIAL_SIZE;
        } else if len % INITIAL_SIZE != 0 || !(len / INITIAL_SIZE).is_power_of_two() {
            return Err(BlobError::CorruptSize(len));
        }

        let regions = RegionMap::new(&file, len)?;
        let blocks = len / BLOCK_SIZE;

        let mut state = IndexState {
            regions,
            file,
            blocks,
            index_mask: index_mask(blocks),
            entries: 0,
            next_ticket: 0,
            pending: HashMap::new(),
        };
        state.verify()?;

        tracing::info!(
            path = %path.display(),
            blocks = state.blocks,
            entries = state.entries,
            "Opened index"
        );

        Ok(Self {
            path,
            load_factor,
            state: RwLock::new(Some(state)),
        })
    }

    /// Reserve a record for `key`
    ///
    /// Returns a handle for the paired [`IndexFile::attach`]. Fails with
    /// `DuplicateKey` when the key is already present. Growth triggered by
    /// this reservation has already happened when the handle is returned.
    pub fn reserve(&self, key: &str) -> Result<SlotHandle> {
        let hash = KeyHash::of(key);
        if hash.is_empty() {
            return Err(BlobError::InvalidArgument(format!(
                "key {:?} hashes to the reserved empty value",
                key
            )));
        }

        let mut guard = self.state.write();
        let state = guard.as_mut().ok_or(BlobError::Disposed(NAME))?;

        loop {
            match state.probe(&hash) {
                Probe::Found(_) => return Err(BlobError::DuplicateKey(key.to_string())),
                Probe::Vacant(pos) => {
                    state.write_record(pos, &Record::reserved(hash));
                    state.entries += 1;

                    let ticket = state.next_ticket;
                    state.next_ticket += 1;
                    state.pending.insert(ticket, pos);

                    if state.entries as f64 >= state.capacity() as f64 * self.load_factor as f64 {
                        if let Err(e) = state.grow() {
                            // The record stays reserved, but no handle will ever attach it
                            state.pending.remove(&ticket);
                            tracing::warn!(key, error = %e, "Growth failed after reservation");
                            return Err(e);
                        }
                    }
                    return Ok(SlotHandle::new(ticket));
                }
                Probe::BlockFull => {
                    tracing::debug!(key, "Home block full, growing before reserve");
                    state.grow()?;
                }
            }
        }
    }

    /// Attach a payload location to a reserved record
    ///
    /// Consumes the handle; its record is resolved through the relocation map,
    /// so growth since `reserve` is transparent.
    pub fn attach(&self, handle: SlotHandle, data: IndexData) -> Result<()> {
        if data.size & COMPRESSED_FLAG != 0 {
            return Err(BlobError::InvalidArgument(format!(
                "payload size {} does not fit in 63 bits",
                data.size
            )));
        }

        let mut guard = self.state.write();
        let state = guard.as_mut().ok_or(BlobError::Disposed(NAME))?;

        let pos = state.pending.remove(&handle.ticket()).ok_or_else(|| {
            BlobError::InvalidArgument("unknown or already attached slot handle".to_string())
        })?;

        let mut record = state.read_record(pos);
        record.set_location(&data);
        state.write_record(pos, &record);

        Ok(())
    }

    /// Forget a reservation that will never be attached
    ///
    /// The record stays reserved with no data; only the handle is dropped.
    pub fn abandon(&self, handle: SlotHandle) {
        if let Some(state) = self.state.write().as_mut() {
            state.pending.remove(&handle.ticket());
        }
    }

    /// Location stored for `key`
    ///
    /// A reserved key without data yields [`IndexData::EMPTY`].
    pub fn lookup(&self, key: &str) -> Result<IndexData> {
        let hash = KeyHash::of(key);
        let guard = self.state.read();
        let state = guard.as_ref().ok_or(BlobError::Disposed(NAME))?;

        match state.probe(&hash) {
            Probe::Found(pos) => Ok(state.read_record(pos).location()),
            Probe::Vacant(_) | Probe::BlockFull => Err(BlobError::NotFound(key.to_string())),
        }
    }

    /// Whether `key` has a record (with or without data)
    pub fn contains(&self, key: &str) -> Result<bool> {
        let hash = KeyHash::of(key);
        let guard = self.state.read();
        let state = guard.as_ref().ok_or(BlobError::Disposed(NAME))?;

        Ok(matches!(state.probe(&hash), Probe::Found(_)))
    }

    /// Force mapped pages to durable storage
    pub fn flush(&self) -> Result<()> {
        let guard = self.state.read();
        let state = guard.as_ref().ok_or(BlobError::Disposed(NAME))?;

        state.regions.flush()?;
        state.file.sync_all()?;
        Ok(())
    }

    /// Unmap every region and release the file (idempotent)
    pub fn close(&self) {
        if let Some(state) = self.state.write().take() {
            if !state.pending.is_empty() {
                tracing::warn!(
                    pending = state.pending.len(),
                    "Closing index with reserved records that never received data"
                );
            }
            tracing::info!(path = %self.path.display(), entries = state.entries, "Closed index");
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Number of occupied records (0 once closed)
    pub fn entries_count(&self) -> u64 {
        self.state.read().as_ref().map(|s| s.entries).unwrap_or(0)
    }

    /// Total record capacity (0 once closed)
    pub fn capacity(&self) -> u64 {
        self.state.read().as_ref().map(|s| s.capacity()).unwrap_or(0)
    }

    /// Number of mapped regions (one per growth plus the initial map)
    pub fn region_count(&self) -> usize {
        self.state
            .read()
            .as_ref()
            .map(|s| s.regions.region_count())
            .unwrap_or(0)
    }

    pub fn is_closed(&self) -> bool {
        self.state.read().is_none()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load_factor(&self) -> f32 {
        self.load_factor
    }
}

impl IndexState {
    fn capacity(&self) -> u64 {
        self.blocks * RECORDS_PER_BLOCK
    }

    fn read_record(&self, pos: u64) -> Record {
        Record::decode(self.regions.slice(pos * RECORD_SIZE, RECORD_SIZE))
    }

    fn write_record(&mut self, pos: u64, record: &Record) {
        record.encode(self.regions.slice_mut(pos * RECORD_SIZE, RECORD_SIZE));
    }

    fn probe(&self, hash: &KeyHash) -> Probe {
        let first = home_block(hash, self.index_mask) * RECORDS_PER_BLOCK;

        for pos in first..first + RECORDS_PER_BLOCK {
            let stored = decode_hash(self.regions.slice(pos * RECORD_SIZE, RECORD_SIZE));
            if stored.is_empty() {
                return Probe::Vacant(pos);
            }
            if stored == *hash {
                return Probe::Found(pos);
            }
        }

        Probe::BlockFull
    }

    /// Count entries and check each occupied record sits in its home block
    fn verify(&mut self) -> Result<()> {
        let mut entries = 0;

        for block in 0..self.blocks {
            let first = block * RECORDS_PER_BLOCK;
            for pos in first..first + RECORDS_PER_BLOCK {
                let hash = decode_hash(self.regions.slice(pos * RECORD_SIZE, RECORD_SIZE));
                if hash.is_empty() {
                    break;
                }
                if home_block(&hash, self.index_mask) != block {
                    return Err(BlobError::CorruptIndex(format!(
                        "record {} belongs to block {} but sits in block {}",
                        pos,
                        home_block(&hash, self.index_mask),
                        block
                    )));
                }
                entries += 1;
            }
        }

        self.entries = entries;
        Ok(())
    }

    /// Double the file and rehash every live record into the new layout
    ///
    /// The new layout is built in memory, then copied over all regions in one
    /// pass. Pending reservations are redirected to their new positions.
    fn grow(&mut self) -> Result<()> {
        let old_len = self.regions.len();
        let new_len = old_len
            .checked_mul(2)
            .ok_or_else(|| BlobError::InvalidArgument("index size overflow".to_string()))?;

        self.file.set_len(new_len)?;
        if let Err(e) = self.regions.extend(&self.file, new_len - old_len) {
            // Keep the on-disk length consistent with the mapped table
            let _ = self.file.set_len(old_len);
            return Err(e.into());
        }

        let new_blocks = self.blocks * 2;
        let new_mask = index_mask(new_blocks);
        let mut buffer = vec![0u8; new_len as usize];

        let mut pending_at: HashMap<u64, u64> =
            self.pending.iter().map(|(&ticket, &pos)| (pos, ticket)).collect();
        let mut moved = 0u64;
        let mut relocated = 0usize;

        for block in 0..self.blocks {
            let first = block * RECORDS_PER_BLOCK;
            for pos in first..first + RECORDS_PER_BLOCK {
                let src = self.regions.slice(pos * RECORD_SIZE, RECORD_SIZE);
                let hash = decode_hash(src);
                if hash.is_empty() {
                    break;
                }

                let target = vacant_in(&buffer, home_block(&hash, new_mask)).ok_or_else(|| {
                    BlobError::CorruptIndex(format!("block overflow while rehashing record {}", pos))
                })?;
                let at = (target * RECORD_SIZE) as usize;
                buffer[at..at + RECORD_SIZE as usize].copy_from_slice(src);
                moved += 1;

                if let Some(ticket) = pending_at.remove(&pos) {
                    self.pending.insert(ticket, target);
                    relocated += 1;
                }
            }
        }

        self.regions.copy_from(&buffer);
        self.blocks = new_blocks;
        self.index_mask = new_mask;

        tracing::info!(
            old_len,
            new_len,
            blocks = new_blocks,
            moved,
            relocated,
            "Grew index"
        );

        Ok(())
    }
}

/// First empty record of `block` in a raw table buffer
fn vacant_in(buffer: &[u8], block: u64) -> Option<u64> {
    let first = block * RECORDS_PER_BLOCK;
    (first..first + RECORDS_PER_BLOCK).find(|&pos| {
        let at = (pos * RECORD_SIZE) as usize;
        decode_hash(&buffer[at..at + RECORD_SIZE as usize]).is_empty()
    })
}
