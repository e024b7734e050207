//! Byte accounting for FAB storage.
//!
//! The arena does not own memory; it counts it. Every [`Fab`](crate::Fab)
//! created through an arena takes a [`Lease`] for its byte size and returns
//! it on drop, so the arena always knows the live total and the highest
//! total ever reached.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Debug, Default)]
struct Counters {
    live: AtomicUsize,
    high_water: AtomicUsize,
}

/// Shared byte counter for FAB allocations on one rank.
///
/// Cloning is cheap and every clone reports into the same counters.
#[derive(Clone, Debug, Default)]
pub struct FabArena {
    counters: Arc<Counters>,
}

impl FabArena {
    /// A fresh arena with zero bytes recorded.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an allocation of `bytes`; released when the lease drops.
    pub fn lease(&self, bytes: usize) -> Lease {
        let live = self.counters.live.fetch_add(bytes, Ordering::Relaxed) + bytes;
        self.counters.high_water.fetch_max(live, Ordering::Relaxed);
        Lease {
            counters: Arc::clone(&self.counters),
            bytes,
        }
    }

    /// Bytes currently held by live FABs.
    pub fn live_bytes(&self) -> usize {
        self.counters.live.load(Ordering::Relaxed)
    }

    /// High-water mark of bytes held by FABs since the arena was created.
    pub fn heap_space_used(&self) -> usize {
        self.counters.high_water.load(Ordering::Relaxed)
    }
}

/// An outstanding allocation recorded in a [`FabArena`].
#[derive(Debug)]
pub struct Lease {
    counters: Arc<Counters>,
    bytes: usize,
}

impl Lease {
    /// Take another lease of the same size from the same arena.
    pub fn renew(&self) -> Self {
        FabArena {
            counters: Arc::clone(&self.counters),
        }
        .lease(self.bytes)
    }
}

impl Drop for Lease {
    fn drop(&mut self) {
        self.counters.live.fetch_sub(self.bytes, Ordering::Relaxed);
    }
}
