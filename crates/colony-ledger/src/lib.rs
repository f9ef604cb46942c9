//! Reservable resource ledger for the colony task engine.
//!
//! The colony owns one shared stock of items (the *pool*). Before a task is
//! created, the materials it will need are moved out of the pool into a
//! per-task *reservation*. Each successful placement consumes exactly one
//! reserved unit; whatever remains is returned to the pool when the task
//! ends, whichever way it ends.
//!
//! # Architecture
//!
//! - [`ledger`] -- The [`ResourceLedger`]: pool, reservations, consumption.
//! - [`sync`] -- The [`SyncBuffer`] batching pool changes for observers.
//! - [`conservation`] -- Conservation check and anomaly detection.
//!
//! # Conservation Law
//!
//! For every item I, at any point between operations:
//!
//! ```text
//! credited(I) == pool(I) + sum(reserved(task, I)) + consumed(I)
//! ```
//!
//! `reserve` and `return_all` only move units between the pool and a
//! reservation; `consume_one` moves one unit from a reservation into the
//! consumed total. A violation produces a [`LedgerAnomaly`]. The ledger
//! never panics; it returns errors.
//!
//! # Tools
//!
//! Some items are used without being used up (fire starters, buckets).
//! They are exempt from availability checks, never reserved, and consuming
//! them is a no-op.
//!
//! # Usage
//!
//! ```
//! use colony_ledger::{ResourceLedger, conservation::ConservationResult};
//! use colony_types::{Item, ResourceStack, TaskId};
//!
//! let mut ledger = ResourceLedger::with_default_tools();
//! let planks = Item::new("oak_planks");
//! let task = TaskId::new();
//!
//! ledger.credit(&planks, 10);
//! ledger.reserve(task, &[ResourceStack::new("oak_planks", 4)]).ok();
//! ledger.consume_one(task, &planks).ok();
//! ledger.return_all(task);
//!
//! assert_eq!(ledger.pool_amount(&planks), 9);
//! assert_eq!(ledger.verify_conservation(1), ConservationResult::Balanced);
//! ```

pub mod conservation;
pub mod ledger;
pub mod sync;

// Re-export primary types at crate root.
pub use conservation::ConservationResult;
pub use ledger::{DEFAULT_TOOL_ITEMS, ResourceLedger};
pub use sync::SyncBuffer;

use std::collections::BTreeMap;

use colony_types::{Item, TaskId};

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can occur when reserving or consuming resources.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// The pool cannot cover a reservation request.
    #[error("insufficient {item}: requested {requested}, available {available}")]
    ResourceInsufficient {
        /// The first item that could not be covered.
        item: Item,
        /// Total amount of the item requested.
        requested: u32,
        /// Amount currently in the pool.
        available: u32,
    },

    /// A consumption was attempted against an exhausted reservation.
    #[error("task {task_id} has no reserved {item} left")]
    NothingReserved {
        /// The task whose reservation was empty.
        task_id: TaskId,
        /// The item that was requested.
        item: Item,
    },
}

// ---------------------------------------------------------------------------
// Anomaly type
// ---------------------------------------------------------------------------

/// A conservation law violation detected during verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerAnomaly {
    /// The tick where the anomaly was detected.
    pub tick: u64,
    /// Per-item imbalance: (`credited`, `accounted`) where `accounted` is
    /// pool plus reserved plus consumed.
    pub imbalances: BTreeMap<Item, (u64, u64)>,
    /// Human-readable description of the anomaly.
    pub message: String,
}

impl core::fmt::Display for LedgerAnomaly {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.message)
    }
}
