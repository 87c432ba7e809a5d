//! Cache Module
//!
//! In-memory read cache of decompressed payloads.
//!
//! ## Responsibilities
//! - Serve repeated reads without touching the data file
//! - Bound resident entries by count and by a sampled memory budget
//! - Evict strictly in admission order (FIFO; hits do not reorder)
//!
//! Nothing here is persisted; the cache starts empty on every open.

mod bounded;
mod budget;

pub use bounded::BoundedCache;
pub use budget::{MemoryBudget, SystemMemory};

/// Default maximum number of cached payloads
pub const DEFAULT_CAPACITY: usize = 128;
