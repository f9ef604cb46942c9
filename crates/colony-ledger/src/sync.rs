//! Buffered pool synchronisation for observers.
//!
//! Observers (dashboards, remote clients) keep a copy of the pool. Instead
//! of pushing every change, the ledger records the latest amount of each
//! changed item and flushes the batch once per sync interval.

use std::collections::BTreeMap;

use colony_types::{Item, ResourceStack, ResourceSync};

/// Pending observer updates.
#[derive(Debug, Clone)]
pub struct SyncBuffer {
    interval_ticks: u64,
    reset: bool,
    changed: BTreeMap<Item, u32>,
}

impl SyncBuffer {
    /// Create a buffer that flushes every `interval_ticks` ticks. An
    /// interval of zero is treated as one.
    pub const fn new(interval_ticks: u64) -> Self {
        Self {
            interval_ticks: if interval_ticks == 0 { 1 } else { interval_ticks },
            reset: false,
            changed: BTreeMap::new(),
        }
    }

    /// The flush interval in ticks.
    pub const fn interval_ticks(&self) -> u64 {
        self.interval_ticks
    }

    /// Record the new pool amount of `item`.
    pub fn record(&mut self, item: &Item, amount: u32) {
        self.changed.insert(item.clone(), amount);
    }

    /// Request that observers drop their copy before the next batch.
    pub fn mark_reset(&mut self) {
        self.reset = true;
    }

    /// Whether anything is waiting to be flushed.
    pub fn is_dirty(&self) -> bool {
        self.reset || !self.changed.is_empty()
    }

    /// Flush if `tick` falls on the sync interval and something changed.
    pub fn poll(&mut self, tick: u64) -> Option<ResourceSync> {
        if tick.checked_rem(self.interval_ticks) == Some(0) {
            self.flush()
        } else {
            None
        }
    }

    /// Drain the buffer unconditionally. Returns `None` when clean.
    pub fn flush(&mut self) -> Option<ResourceSync> {
        if !self.is_dirty() {
            return None;
        }
        let reset = core::mem::take(&mut self.reset);
        let items = core::mem::take(&mut self.changed)
            .into_iter()
            .map(|(item, amount)| ResourceStack { item, amount })
            .collect();
        Some(ResourceSync { reset, items })
    }
}

impl Default for SyncBuffer {
    fn default() -> Self {
        Self::new(1)
    }
}
