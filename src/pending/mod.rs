// SPDX-License-Identifier: AGPL-3.0-or-later

//! The pending table (`rx_info` in kinetic-c): the listener-local
//! registry of outstanding operations awaiting a reply or deadline
//! (spec.md §3, §4.C).
//!
//! Implementation is a dense, fixed-capacity array with a freelist of
//! unused slots, exactly as kinetic-c's `rx_info_t rx_info[MAX_PENDING_MESSAGES]`
//! plus `rx_info_freelist`. The slot id is an internal compactness trick
//! only; correlation always happens on the 64-bit ack sequence carried by
//! the wire response, never on the slot id.

use tokio::time::Instant;

use crate::op::Operation;

struct Slot {
    active: bool,
    deadline: Option<Instant>,
    op: Option<Operation>,
}

/// Fixed-capacity table of in-flight operations.
///
/// Invariant (spec.md §8): `info_available() + in_use() == capacity()`
/// at all times.
pub struct PendingTable {
    slots: Vec<Slot>,
    freelist: Vec<u16>,
    in_use: usize,
}

/// Returned by [`PendingTable::acquire`] when every slot is occupied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableFull;

impl PendingTable {
    pub fn new(capacity: u16) -> Self {
        let capacity = capacity as usize;
        let mut slots = Vec::with_capacity(capacity);
        let mut freelist = Vec::with_capacity(capacity);
        for i in (0..capacity).rev() {
            slots.push(Slot {
                active: false,
                deadline: None,
                op: None,
            });
            freelist.push(i as u16);
        }
        Self {
            slots,
            freelist,
            in_use: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn in_use(&self) -> usize {
        self.in_use
    }

    pub fn info_available(&self) -> usize {
        self.capacity() - self.in_use
    }

    /// Allocates a slot for `op`, with an absolute `deadline` (`None`
    /// meaning "no timeout", spec.md §8 boundary case). On failure `op`
    /// is handed back unharmed so the caller can still complete it.
    pub fn acquire(&mut self, op: Operation, deadline: Option<Instant>) -> Result<u16, (Operation, TableFull)> {
        let Some(id) = self.freelist.pop() else {
            return Err((op, TableFull));
        };
        let slot = &mut self.slots[id as usize];
        slot.active = true;
        slot.deadline = deadline;
        slot.op = Some(op);
        self.in_use += 1;
        Ok(id)
    }

    /// Releases a slot, returning the operation it held (if still
    /// active). Safe to call twice; the second call is a no-op.
    pub fn release(&mut self, id: u16) -> Option<Operation> {
        let slot = self.slots.get_mut(id as usize)?;
        if !slot.active {
            return None;
        }
        slot.active = false;
        slot.deadline = None;
        self.in_use -= 1;
        let op = slot.op.take();
        self.freelist.push(id);
        op
    }

    /// O(n) scan over the outstanding operations (bounded by capacity,
    /// spec.md §4.C) looking for the one whose sequence number matches
    /// `ack_sequence`. Returns the slot id on a hit; the caller then
    /// calls [`Self::release`] to take ownership of the operation.
    pub fn lookup(&self, ack_sequence: u64) -> Option<u16> {
        self.slots.iter().enumerate().find_map(|(id, slot)| {
            if slot.active && slot.op.as_ref().is_some_and(|op| op.sequence == ack_sequence) {
                Some(id as u16)
            } else {
                None
            }
        })
    }

    /// Drains every slot whose deadline has passed as of `now`, per
    /// `tick_handler` (spec.md §4.F). `deadline == None` never expires.
    pub fn drain_expired(&mut self, now: Instant) -> Vec<Operation> {
        let expired_ids: Vec<u16> = self
            .slots
            .iter()
            .enumerate()
            .filter_map(|(id, slot)| {
                let expired = slot.active && slot.deadline.is_some_and(|d| now >= d);
                expired.then_some(id as u16)
            })
            .collect();
        expired_ids
            .into_iter()
            .filter_map(|id| self.release(id))
            .collect()
    }

    /// Drops every outstanding operation unconditionally (session
    /// close, spec.md §5 "An operation in-flight at session close fails
    /// with CONN_CLOSED").
    pub fn drain_all(&mut self) -> Vec<Operation> {
        let ids: Vec<u16> = self
            .slots
            .iter()
            .enumerate()
            .filter_map(|(id, slot)| slot.active.then_some(id as u16))
            .collect();
        ids.into_iter().filter_map(|id| self.release(id)).collect()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::op::OperationKind;

    fn dummy_op(seq: u64) -> Operation {
        Operation::for_test(seq, OperationKind::Noop)
    }

    #[tokio::test]
    async fn capacity_invariant_holds_across_acquire_release() {
        let mut table = PendingTable::new(4);
        assert_eq!(table.info_available() + table.in_use(), 4);

        let id = table.acquire(dummy_op(1), None).expect("room available");
        assert_eq!(table.info_available() + table.in_use(), 4);
        assert_eq!(table.in_use(), 1);

        table.release(id);
        assert_eq!(table.info_available() + table.in_use(), 4);
        assert_eq!(table.in_use(), 0);
    }

    #[tokio::test]
    async fn acquire_fails_when_full() {
        let mut table = PendingTable::new(2);
        table.acquire(dummy_op(1), None).expect("slot 1");
        table.acquire(dummy_op(2), None).expect("slot 2");
        let (returned, TableFull) = table.acquire(dummy_op(3), None).expect_err("table full");
        assert_eq!(returned.sequence, 3);
    }

    #[tokio::test]
    async fn lookup_misses_on_unknown_or_already_completed_sequence() {
        let mut table = PendingTable::new(4);
        let id = table.acquire(dummy_op(42), None).expect("room");
        assert_eq!(table.lookup(42), Some(id));
        assert_eq!(table.lookup(43), None);

        table.release(id);
        assert_eq!(table.lookup(42), None);
    }

    #[tokio::test]
    async fn drain_expired_only_takes_timed_out_entries() {
        let mut table = PendingTable::new(4);
        let now = Instant::now();
        let soon = now + Duration::from_millis(1);
        let later = now + Duration::from_secs(60);

        table.acquire(dummy_op(1), Some(soon)).expect("room");
        table.acquire(dummy_op(2), Some(later)).expect("room");

        tokio::time::sleep(Duration::from_millis(5)).await;
        let expired = table.drain_expired(Instant::now());
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].sequence, 1);
        assert_eq!(table.in_use(), 1);
    }
}
