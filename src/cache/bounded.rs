//! Bounded Cache
//!
//! FIFO cache bounded by entry count and a sampled byte budget.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;

use crate::error::Result;

use super::{MemoryBudget, DEFAULT_CAPACITY};

/// Memory-aware read cache
///
/// ## Concurrency:
/// - One lock guards the map, the admission queue and the byte count
/// - Loaders run outside the lock; concurrent misses on the same key may
///   each run the loader, and only the first result is admitted
pub struct BoundedCache {
    capacity: usize,
    budget: Arc<dyn MemoryBudget>,
    state: Mutex<CacheState>,
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<String, Bytes>,

    /// Admission order, oldest first
    order: VecDeque<String>,

    /// Sum of cached payload lengths
    resident: u64,
}

impl BoundedCache {
    /// Cache with the default capacity
    pub fn new(budget: impl MemoryBudget + 'static) -> Self {
        Self::with_capacity(budget, DEFAULT_CAPACITY)
    }

    /// Cache holding at most `capacity` entries (at least one)
    pub fn with_capacity(budget: impl MemoryBudget + 'static, capacity: usize) -> Self {
        Self::with_shared_budget(Arc::new(budget), capacity)
    }

    pub fn with_shared_budget(budget: Arc<dyn MemoryBudget>, capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            budget,
            state: Mutex::new(CacheState::default()),
        }
    }

    /// Cached bytes for `key`, or the loader's result
    ///
    /// On a miss the loader runs unlocked. Afterwards the oldest entries are
    /// evicted while the cache is at capacity or the new item would exceed
    /// the budget; the item is admitted only if it then fits and no racing
    /// load admitted the key first. The loaded bytes are returned either way.
    pub fn get_or_load<F>(&self, key: &str, loader: F) -> Result<Bytes>
    where
        F: FnOnce(&str) -> Result<Bytes>,
    {
        if let Some(hit) = self.state.lock().entries.get(key) {
            return Ok(hit.clone());
        }

        let value = loader(key)?;
        self.admit(key, &value);
        Ok(value)
    }

    fn admit(&self, key: &str, value: &Bytes) {
        let incoming = value.len() as u64;
        let mut state = self.state.lock();
        let mut evicted = 0usize;

        while state.entries.len() >= self.capacity
            || state.resident + incoming > self.budget.available()
        {
            let Some(oldest) = state.order.pop_front() else {
                break;
            };
            if let Some(old) = state.entries.remove(&oldest) {
                state.resident -= old.len() as u64;
            }
            evicted += 1;
        }

        let admitted = state.resident + incoming <= self.budget.available()
            && !state.entries.contains_key(key);
        if admitted {
            state.entries.insert(key.to_string(), value.clone());
            state.order.push_back(key.to_string());
            state.resident += incoming;
        }

        tracing::debug!(
            key,
            bytes = incoming,
            evicted,
            admitted,
            resident = state.resident,
            "Cache admission"
        );
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Cached bytes without loading or reordering
    pub fn peek(&self, key: &str) -> Option<Bytes> {
        self.state.lock().entries.get(key).cloned()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.state.lock().entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sum of cached payload lengths in bytes
    pub fn resident_bytes(&self) -> u64 {
        self.state.lock().resident
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Drop every cached entry
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.entries.clear();
        state.order.clear();
        state.resident = 0;
    }
}
