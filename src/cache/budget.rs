//! Memory Budget
//!
//! Byte ceiling for the read cache, re-sampled at every eviction decision.

use parking_lot::Mutex;
use sysinfo::System;

/// Source of the cache's byte budget
pub trait MemoryBudget: Send + Sync {
    /// Bytes the cache may keep resident right now
    fn available(&self) -> u64;
}

impl<F> MemoryBudget for F
where
    F: Fn() -> u64 + Send + Sync,
{
    fn available(&self) -> u64 {
        self()
    }
}

/// Budget derived from the OS available-memory figure
pub struct SystemMemory {
    system: Mutex<System>,
    fraction: f64,
}

impl SystemMemory {
    /// Fraction of available memory handed to the cache by default
    pub const DEFAULT_FRACTION: f64 = 0.8;

    pub fn new() -> Self {
        Self::with_fraction(Self::DEFAULT_FRACTION)
    }

    pub fn with_fraction(fraction: f64) -> Self {
        Self {
            system: Mutex::new(System::new()),
            fraction: fraction.clamp(0.0, 1.0),
        }
    }
}

impl Default for SystemMemory {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBudget for SystemMemory {
    fn available(&self) -> u64 {
        let mut system = self.system.lock();
        system.refresh_memory();
        let budget = (system.available_memory() as f64 * self.fraction) as u64;
        if budget == 0 {
            tracing::warn!("Available memory reported as zero; cache admits nothing");
        }
        budget
    }
}
