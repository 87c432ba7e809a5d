//! # blobkv
//!
//! An embedded, file-backed key → blob store with:
//! - A memory-mapped, growable open-addressing hash index
//! - An append-only data file with optional zstd compression
//! - MD5 integrity checks against caller-declared hashes
//! - A FIFO read cache bounded by count and available memory
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        BlobStore                            │
//! │              add / get / contains / close                   │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┼─────────────────────┐
//!          │            │                     │
//!          ▼            ▼                     ▼
//!   ┌─────────────┐ ┌─────────────┐   ┌──────────────┐
//!   │ BoundedCache│ │  IndexFile  │   │   DataFile   │
//!   │   (FIFO)    │ │   (mmap)    │   │  (append)    │
//!   └─────────────┘ └─────────────┘   └──────────────┘
//! ```
//!
//! `add` reserves the key in the index, appends the payload, then attaches
//! its location. `get` goes through the cache; a miss looks the key up,
//! reads the range and decompresses it.

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;
pub mod hash;

pub mod index;
pub mod cache;
pub mod storage;
pub mod engine;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{BlobError, Result};
pub use config::Config;
pub use engine::BlobStore;
pub use index::{IndexData, IndexFile, SlotHandle};
pub use cache::{BoundedCache, MemoryBudget, SystemMemory};
pub use storage::StreamInfo;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of blobkv
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
