//! The colony stock: a global pool plus per-task reservations.
//!
//! # Design
//!
//! - **All-or-nothing**: [`ResourceLedger::reserve`] either moves every
//!   requested amount or moves nothing.
//! - **Never negative**: amounts are unsigned and every decrement is
//!   checked first.
//! - **Idempotent return**: [`ResourceLedger::return_all`] on a task with
//!   nothing reserved is a no-op.
//! - **Totals**: credited and consumed totals are kept alongside the pool
//!   so the conservation law can be checked at any time.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, info};

use colony_types::{Item, ResourceStack, ResourceSync, TaskId};

use crate::conservation::{ConservationResult, verify_conservation};
use crate::sync::SyncBuffer;
use crate::LedgerError;

/// Items used without being used up.
pub const DEFAULT_TOOL_ITEMS: [&str; 3] = ["flint_and_steel", "water_bucket", "lava_bucket"];

/// The colony's shared, reservable stock of items.
#[derive(Debug, Default)]
pub struct ResourceLedger {
    /// Items exempt from reservation and consumption.
    tools: BTreeSet<Item>,
    /// Unreserved stock.
    pool: BTreeMap<Item, u32>,
    /// Reserved stock per task.
    reservations: BTreeMap<TaskId, BTreeMap<Item, u32>>,
    /// Everything ever credited, per item.
    credited: BTreeMap<Item, u64>,
    /// Everything ever consumed, per item.
    consumed: BTreeMap<Item, u64>,
    /// Pool changes not yet pushed to observers.
    sync: SyncBuffer,
}

impl ResourceLedger {
    /// Create an empty ledger with the given tool items.
    pub fn new(tools: impl IntoIterator<Item = Item>) -> Self {
        Self {
            tools: tools.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Create an empty ledger with [`DEFAULT_TOOL_ITEMS`].
    pub fn with_default_tools() -> Self {
        Self::new(DEFAULT_TOOL_ITEMS.iter().map(|name| Item::new(*name)))
    }

    /// Replace the observer sync buffer (e.g. to change its interval).
    #[must_use]
    pub fn with_sync_interval(mut self, interval_ticks: u64) -> Self {
        self.sync = SyncBuffer::new(interval_ticks);
        self
    }

    /// Whether `item` is a tool.
    pub fn is_tool(&self, item: &Item) -> bool {
        self.tools.contains(item)
    }

    /// Amount of `item` in the unreserved pool.
    pub fn pool_amount(&self, item: &Item) -> u32 {
        self.pool.get(item).copied().unwrap_or(0)
    }

    /// Amount of `item` reserved for `task_id`.
    pub fn reserved_amount(&self, task_id: TaskId, item: &Item) -> u32 {
        self.reservations
            .get(&task_id)
            .and_then(|items| items.get(item))
            .copied()
            .unwrap_or(0)
    }

    /// Whether `task_id` holds any reserved units.
    pub fn has_reservation(&self, task_id: TaskId) -> bool {
        self.reservations
            .get(&task_id)
            .is_some_and(|items| items.values().any(|amount| *amount > 0))
    }

    /// Add `amount` units of `item` to the pool. Always succeeds; the pool
    /// saturates at `u32::MAX`.
    pub fn credit(&mut self, item: &Item, amount: u32) {
        if amount == 0 {
            return;
        }
        let slot = self.pool.entry(item.clone()).or_insert(0);
        let before = *slot;
        *slot = slot.saturating_add(amount);
        let added = u64::from(slot.saturating_sub(before));
        let total = self.credited.entry(item.clone()).or_insert(0);
        *total = total.saturating_add(added);
        let now = *slot;
        self.sync.record(item, now);
        debug!(item = %item, amount, pool = now, "Resource credited");
    }

    /// Whether the pool can cover `items`. Tools always count as present.
    pub fn has_items(&self, items: &[ResourceStack]) -> bool {
        self.first_shortfall(&self.merge_request(items)).is_none()
    }

    /// Move `items` from the pool into `task_id`'s reservation.
    ///
    /// Duplicate items in the request are summed. Tools are skipped. If any
    /// item cannot be covered, nothing is moved.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::ResourceInsufficient`] naming the first item
    /// (in item order) that the pool cannot cover.
    pub fn reserve(&mut self, task_id: TaskId, items: &[ResourceStack]) -> Result<(), LedgerError> {
        let request = self.merge_request(items);
        if let Some((item, requested, available)) = self.first_shortfall(&request) {
            return Err(LedgerError::ResourceInsufficient {
                item,
                requested,
                available,
            });
        }

        let reservation = self.reservations.entry(task_id).or_default();
        for (item, amount) in &request {
            if let Some(slot) = self.pool.get_mut(item) {
                *slot = slot.saturating_sub(*amount);
                self.sync.record(item, *slot);
            }
            let held = reservation.entry(item.clone()).or_insert(0);
            *held = held.saturating_add(*amount);
        }

        info!(
            task_id = %task_id,
            items = request.len(),
            units = request.values().map(|a| u64::from(*a)).sum::<u64>(),
            "Resources reserved"
        );
        Ok(())
    }

    /// Use up one reserved unit of `item` for `task_id`. Tools are a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::NothingReserved`] if the task has no unit of
    /// `item` left; nothing changes in that case.
    pub fn consume_one(&mut self, task_id: TaskId, item: &Item) -> Result<(), LedgerError> {
        if self.is_tool(item) {
            return Ok(());
        }

        let slot = self
            .reservations
            .get_mut(&task_id)
            .and_then(|items| items.get_mut(item))
            .filter(|amount| **amount > 0)
            .ok_or_else(|| LedgerError::NothingReserved {
                task_id,
                item: item.clone(),
            })?;
        *slot = slot.saturating_sub(1);

        let total = self.consumed.entry(item.clone()).or_insert(0);
        *total = total.saturating_add(1);
        Ok(())
    }

    /// Return every unit still reserved for `task_id` to the pool.
    ///
    /// Returns the stacks that were moved; empty if the task held nothing.
    pub fn return_all(&mut self, task_id: TaskId) -> Vec<ResourceStack> {
        let Some(reservation) = self.reservations.remove(&task_id) else {
            return Vec::new();
        };

        let mut returned = Vec::new();
        for (item, amount) in reservation {
            if amount == 0 {
                continue;
            }
            let slot = self.pool.entry(item.clone()).or_insert(0);
            *slot = slot.saturating_add(amount);
            self.sync.record(&item, *slot);
            returned.push(ResourceStack { item, amount });
        }

        if !returned.is_empty() {
            info!(task_id = %task_id, stacks = returned.len(), "Reservation returned");
        }
        returned
    }

    /// Non-empty pool amounts, in item order, for persistence.
    pub fn pool_stacks(&self) -> Vec<ResourceStack> {
        self.pool
            .iter()
            .filter(|(_, amount)| **amount > 0)
            .map(|(item, amount)| ResourceStack {
                item: item.clone(),
                amount: *amount,
            })
            .collect()
    }

    /// Pool plus every live reservation, per item, for persistence.
    ///
    /// Restoring these stacks is equivalent to cancelling every task and
    /// returning its reservation.
    pub fn stock_stacks(&self) -> Vec<ResourceStack> {
        let mut stock: BTreeMap<Item, u32> = BTreeMap::new();
        let held = self
            .pool
            .iter()
            .chain(self.reservations.values().flat_map(|items| items.iter()));
        for (item, amount) in held {
            let total = stock.entry(item.clone()).or_insert(0);
            *total = total.saturating_add(*amount);
        }
        stock
            .into_iter()
            .filter(|(_, amount)| *amount > 0)
            .map(|(item, amount)| ResourceStack { item, amount })
            .collect()
    }

    /// Replace the whole ledger state with a persisted pool.
    ///
    /// Reservations and totals are cleared (in-flight tasks are not
    /// persisted) and observers receive a full reset on the next flush.
    pub fn restore_pool(&mut self, stacks: &[ResourceStack]) {
        self.pool.clear();
        self.reservations.clear();
        self.credited.clear();
        self.consumed.clear();
        self.sync = SyncBuffer::new(self.sync.interval_ticks());
        self.sync.mark_reset();
        for stack in stacks {
            self.credit(&stack.item, stack.amount);
        }
        info!(stacks = stacks.len(), "Resource pool restored");
    }

    /// Flush buffered pool changes if `tick` falls on the sync interval.
    pub fn poll_sync(&mut self, tick: u64) -> Option<ResourceSync> {
        self.sync.poll(tick)
    }

    /// Check `credited == pool + reserved + consumed` for every item.
    pub fn verify_conservation(&self, tick: u64) -> ConservationResult {
        let mut accounted: BTreeMap<Item, u64> = BTreeMap::new();
        let held = self
            .pool
            .iter()
            .chain(self.reservations.values().flat_map(|items| items.iter()))
            .map(|(item, amount)| (item, u64::from(*amount)))
            .chain(self.consumed.iter().map(|(item, amount)| (item, *amount)));
        for (item, amount) in held {
            let total = accounted.entry(item.clone()).or_insert(0);
            *total = total.saturating_add(amount);
        }
        verify_conservation(tick, &self.credited, &accounted)
    }

    /// Sum duplicate entries and drop tools and zero amounts.
    fn merge_request(&self, items: &[ResourceStack]) -> BTreeMap<Item, u32> {
        let mut request: BTreeMap<Item, u32> = BTreeMap::new();
        for stack in items {
            if stack.amount == 0 || self.is_tool(&stack.item) {
                continue;
            }
            let amount = request.entry(stack.item.clone()).or_insert(0);
            *amount = amount.saturating_add(stack.amount);
        }
        request
    }

    /// The first item the pool cannot cover, with requested and available
    /// amounts.
    fn first_shortfall(&self, request: &BTreeMap<Item, u32>) -> Option<(Item, u32, u32)> {
        request.iter().find_map(|(item, requested)| {
            let available = self.pool_amount(item);
            (available < *requested).then(|| (item.clone(), *requested, available))
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn stocked(entries: &[(&str, u32)]) -> ResourceLedger {
        let mut ledger = ResourceLedger::with_default_tools();
        for (name, amount) in entries {
            ledger.credit(&Item::new(*name), *amount);
        }
        ledger
    }

    fn item(name: &str) -> Item {
        Item::new(name)
    }

    #[test]
    fn credit_increases_pool() {
        let ledger = stocked(&[("stone", 3), ("stone", 4)]);
        assert_eq!(ledger.pool_amount(&item("stone")), 7);
    }

    #[test]
    fn reserve_is_all_or_nothing() {
        let mut ledger = stocked(&[("stone", 10), ("glass", 1)]);
        let task = TaskId::new();
        let result = ledger.reserve(
            task,
            &[ResourceStack::new("stone", 5), ResourceStack::new("glass", 2)],
        );

        match result {
            Err(LedgerError::ResourceInsufficient {
                item: short,
                requested,
                available,
            }) => {
                assert_eq!(short, item("glass"));
                assert_eq!(requested, 2);
                assert_eq!(available, 1);
            }
            other => panic!("expected ResourceInsufficient, got {other:?}"),
        }
        assert_eq!(ledger.pool_amount(&item("stone")), 10);
        assert_eq!(ledger.pool_amount(&item("glass")), 1);
        assert!(!ledger.has_reservation(task));
    }

    #[test]
    fn duplicate_request_entries_are_summed() {
        let mut ledger = stocked(&[("stone", 3)]);
        let task = TaskId::new();
        let result = ledger.reserve(
            task,
            &[ResourceStack::new("stone", 2), ResourceStack::new("stone", 2)],
        );
        assert!(result.is_err());
        assert_eq!(ledger.pool_amount(&item("stone")), 3);
    }

    #[test]
    fn reserve_then_return_restores_pool() {
        let mut ledger = stocked(&[("stone", 10), ("oak_planks", 6)]);
        let before = ledger.pool_stacks();
        let task = TaskId::new();
        ledger
            .reserve(
                task,
                &[ResourceStack::new("stone", 4), ResourceStack::new("oak_planks", 6)],
            )
            .unwrap();
        assert_eq!(ledger.pool_amount(&item("oak_planks")), 0);
        assert_eq!(ledger.reserved_amount(task, &item("stone")), 4);

        let returned = ledger.return_all(task);
        assert_eq!(returned.len(), 2);
        assert_eq!(ledger.pool_stacks(), before);
    }

    #[test]
    fn stock_includes_live_reservations() {
        let mut ledger = stocked(&[("stone", 10), ("oak_planks", 2)]);
        let task = TaskId::new();
        ledger
            .reserve(
                task,
                &[ResourceStack::new("stone", 4), ResourceStack::new("oak_planks", 2)],
            )
            .unwrap();
        ledger.consume_one(task, &item("stone")).unwrap();

        assert_eq!(ledger.pool_stacks(), vec![ResourceStack::new("stone", 6)]);
        assert_eq!(
            ledger.stock_stacks(),
            vec![ResourceStack::new("oak_planks", 2), ResourceStack::new("stone", 9)]
        );
    }

    #[test]
    fn return_all_is_idempotent() {
        let mut ledger = stocked(&[("stone", 2)]);
        let task = TaskId::new();
        ledger.reserve(task, &[ResourceStack::new("stone", 2)]).unwrap();
        assert_eq!(ledger.return_all(task).len(), 1);
        assert!(ledger.return_all(task).is_empty());
        assert_eq!(ledger.pool_amount(&item("stone")), 2);
    }

    #[test]
    fn consume_one_never_goes_negative() {
        let mut ledger = stocked(&[("stone", 2)]);
        let task = TaskId::new();
        ledger.reserve(task, &[ResourceStack::new("stone", 1)]).unwrap();

        assert!(ledger.consume_one(task, &item("stone")).is_ok());
        assert!(matches!(
            ledger.consume_one(task, &item("stone")),
            Err(LedgerError::NothingReserved { .. })
        ));
        assert_eq!(ledger.reserved_amount(task, &item("stone")), 0);
        assert_eq!(ledger.pool_amount(&item("stone")), 1);
    }

    #[test]
    fn consume_lowers_total_by_exactly_one() {
        let mut ledger = stocked(&[("stone", 5)]);
        let task = TaskId::new();
        ledger.reserve(task, &[ResourceStack::new("stone", 3)]).unwrap();
        ledger.consume_one(task, &item("stone")).unwrap();
        ledger.return_all(task);
        assert_eq!(ledger.pool_amount(&item("stone")), 4);
        assert!(ledger.verify_conservation(1).is_balanced());
    }

    #[test]
    fn tools_are_never_reserved_or_consumed() {
        let mut ledger = stocked(&[]);
        let task = TaskId::new();
        let request = [ResourceStack::new("water_bucket", 3)];
        assert!(ledger.has_items(&request));
        ledger.reserve(task, &request).unwrap();
        assert!(!ledger.has_reservation(task));
        assert!(ledger.consume_one(task, &item("water_bucket")).is_ok());
        assert!(ledger.verify_conservation(1).is_balanced());
    }

    #[test]
    fn restore_replaces_state_and_requests_reset() {
        let mut ledger = stocked(&[("stone", 5)]);
        let task = TaskId::new();
        ledger.reserve(task, &[ResourceStack::new("stone", 2)]).unwrap();
        let _ = ledger.poll_sync(1);

        ledger.restore_pool(&[ResourceStack::new("dirt", 9)]);
        assert_eq!(ledger.pool_amount(&item("stone")), 0);
        assert_eq!(ledger.pool_amount(&item("dirt")), 9);
        assert!(!ledger.has_reservation(task));
        assert!(ledger.verify_conservation(2).is_balanced());

        let sync = ledger.poll_sync(2).unwrap();
        assert!(sync.reset);
        assert_eq!(sync.items, vec![ResourceStack::new("dirt", 9)]);
    }

    #[test]
    fn sync_carries_latest_pool_amounts() {
        let mut ledger = stocked(&[("stone", 5)]).with_sync_interval(10);
        ledger.credit(&item("stone"), 5);
        let task = TaskId::new();
        ledger.reserve(task, &[ResourceStack::new("stone", 4)]).unwrap();
        assert_eq!(ledger.poll_sync(9), None);
        let sync = ledger.poll_sync(10).unwrap();
        assert_eq!(sync.items, vec![ResourceStack::new("stone", 6)]);
    }
}
