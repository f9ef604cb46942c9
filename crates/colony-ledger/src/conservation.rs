//! Conservation law verification for the resource ledger.
//!
//! Units enter the ledger only through `credit` (starting stock, dug
//! blocks, restores) and leave only through `consume_one`. Every other
//! operation moves units between the pool and reservations. So for each
//! item I:
//!
//! ```text
//! credited(I) == pool(I) + reserved(I) + consumed(I)
//! ```
//!
//! The ledger maintains this by construction; the check catches future
//! bookkeeping bugs. A violation produces a [`LedgerAnomaly`].

use std::collections::{BTreeMap, BTreeSet};

use colony_types::Item;

use crate::LedgerAnomaly;

/// The result of a conservation check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConservationResult {
    /// Every item balances.
    Balanced,
    /// One or more items do not balance.
    Anomaly(LedgerAnomaly),
}

impl ConservationResult {
    /// Whether the check passed.
    pub const fn is_balanced(&self) -> bool {
        matches!(self, Self::Balanced)
    }
}

/// Compare the credited total of every item with what the ledger can
/// account for (pool plus reserved plus consumed).
///
/// Items missing from one map count as zero on that side.
pub fn verify_conservation(
    tick: u64,
    credited: &BTreeMap<Item, u64>,
    accounted: &BTreeMap<Item, u64>,
) -> ConservationResult {
    let all_items: BTreeSet<&Item> = credited.keys().chain(accounted.keys()).collect();

    let mut imbalances: BTreeMap<Item, (u64, u64)> = BTreeMap::new();
    for item in all_items {
        let total_credited = credited.get(item).copied().unwrap_or(0);
        let total_accounted = accounted.get(item).copied().unwrap_or(0);
        if total_credited != total_accounted {
            imbalances.insert(item.clone(), (total_credited, total_accounted));
        }
    }

    if imbalances.is_empty() {
        ConservationResult::Balanced
    } else {
        let count = imbalances.len();
        ConservationResult::Anomaly(LedgerAnomaly {
            tick,
            imbalances,
            message: format!(
                "LEDGER_ANOMALY at tick {tick}: conservation law violated for {count} item(s)",
            ),
        })
    }
}
