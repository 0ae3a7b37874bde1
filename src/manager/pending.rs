// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! The outstanding-operation table.
//!
//! Every submitted SQE carries a `user_data` value that is really just an
//! index into this table, recovered when its CQE arrives. Same
//! lowest-free-index discipline as [`crate::pfd::PfdTable`] and
//! [`crate::manager::registry::Registry`] — keeps the table dense, and
//! keeps `user_data` values small enough to never need more than the low
//! 32 bits of the field `io_uring` gives us.

use std::{cmp::Reverse, collections::BinaryHeap};

use crate::request::RequestData;

#[derive(Debug, Default)]
pub struct PendingTable {
    slots: Vec<Option<RequestData>>,
    free: BinaryHeap<Reverse<usize>>,
}

impl PendingTable {
    #[must_use]
    pub fn new() -> Self {
        PendingTable { slots: Vec::new(), free: BinaryHeap::new() }
    }

    /// Stores `data`, returning the `user_data` value to stamp onto its SQE.
    pub fn insert(&mut self, data: RequestData) -> u64 {
        let idx = if let Some(Reverse(idx)) = self.free.pop() {
            self.slots[idx] = Some(data);
            idx
        } else {
            let idx = self.slots.len();
            self.slots.push(Some(data));
            idx
        };
        idx as u64
    }

    /// Removes and returns the request data for a completed `user_data`.
    /// `None` means a completion arrived for a `user_data` this table never
    /// issued — a bug, not a stale-pfd situation (those are detected via
    /// the pfd generation check after this call succeeds).
    pub fn take(&mut self, user_data: u64) -> Option<RequestData> {
        let idx = usize::try_from(user_data).ok()?;
        let slot = self.slots.get_mut(idx)?.take()?;
        self.free.push(Reverse(idx));
        Some(slot)
    }

    /// Mutable access to an already-inserted slot, used to backfill scratch
    /// storage once the SQE that needs it has been built.
    pub fn slot_mut(&mut self, user_data: u64) -> Option<&mut RequestData> {
        let idx = usize::try_from(user_data).ok()?;
        self.slots.get_mut(idx)?.as_mut()
    }

    /// `user_data` values for every still-outstanding operation, in
    /// ascending order. Used to issue one cancellation per in-flight
    /// operation during shutdown.
    pub fn live_user_data(&self) -> Vec<u64> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.as_ref().map(|_| i as u64))
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
