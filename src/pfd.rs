// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! The pseudo-descriptor (pfd) table.
//!
//! Each live kernel descriptor is addressed indirectly through a small
//! table slot rather than by its raw fd, so completions can be matched
//! against a generation counter and stale ones (from a slot since reused)
//! dropped rather than misapplied.

use std::{cmp::Reverse, collections::BinaryHeap, os::fd::RawFd};

/// What kind of underlying kernel descriptor a pfd wraps. Drives which
/// graceful-close path `close_pfd` takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FdType {
    LocalFile,
    NetworkSocket,
    EventSignal,
}

/// One slot in the pseudo-descriptor table.
#[derive(Debug)]
pub struct PfdSlot {
    pub fd: RawFd,
    pub fd_type: FdType,
    pub generation: u32,
    pub submitted_requests: u32,
    /// Set once the `SHUT_RDWR` step of graceful close has completed.
    pub shutdown_done: bool,
    /// Set once the zero-byte drain read of graceful close has completed.
    pub last_read_zero: bool,
    /// Set when `close_pfd` has been invoked; the slot is only actually
    /// freed once `submitted_requests` drains to zero afterwards.
    pub being_freed: bool,
}

impl PfdSlot {
    fn fresh(fd: RawFd, fd_type: FdType, generation: u32) -> Self {
        PfdSlot {
            fd,
            fd_type,
            generation,
            submitted_requests: 0,
            shutdown_done: false,
            last_read_zero: false,
            being_freed: false,
        }
    }
}

/// A stable logical handle identifying a table slot plus the generation it
/// was issued at. Completions carry a snapshot of this; the table is the
/// authority on whether that snapshot is still current.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PseudoFd {
    pub index: u32,
    pub generation: u32,
}

/// Owns every live and freed pseudo-descriptor slot for one `EventManager`.
/// Allocation always prefers the lowest free index, so the table stays
/// densely packed instead of spreading out over time.
#[derive(Debug, Default)]
pub struct PfdTable {
    slots: Vec<Option<PfdSlot>>,
    free: BinaryHeap<Reverse<usize>>,
}

impl PfdTable {
    #[must_use]
    pub fn new() -> Self {
        PfdTable { slots: Vec::new(), free: BinaryHeap::new() }
    }

    /// Registers a freshly obtained kernel descriptor, reusing the
    /// lowest-indexed free slot if one exists. The returned pfd's
    /// generation is one past whatever occupied that slot last.
    pub fn insert(&mut self, fd: RawFd, fd_type: FdType) -> PseudoFd {
        if let Some(Reverse(idx)) = self.free.pop() {
            let prior_generation = self.slots[idx].as_ref().map_or(0, |s| s.generation);
            let generation = prior_generation.wrapping_add(1);
            self.slots[idx] = Some(PfdSlot::fresh(fd, fd_type, generation));
            PseudoFd { index: idx as u32, generation }
        } else {
            let idx = self.slots.len();
            self.slots.push(Some(PfdSlot::fresh(fd, fd_type, 0)));
            PseudoFd { index: idx as u32, generation: 0 }
        }
    }

    #[must_use]
    pub fn get(&self, pfd: PseudoFd) -> Option<&PfdSlot> {
        self.slots.get(pfd.index as usize)?.as_ref().filter(|s| s.generation == pfd.generation)
    }

    #[must_use]
    pub fn get_mut(&mut self, pfd: PseudoFd) -> Option<&mut PfdSlot> {
        self.slots
            .get_mut(pfd.index as usize)?
            .as_mut()
            .filter(|s| s.generation == pfd.generation)
    }

    /// Returns `true` if `pfd`'s generation still matches the slot it was
    /// issued against. A stale completion is one for which this returns
    /// `false`.
    #[must_use]
    pub fn is_current(&self, pfd: PseudoFd) -> bool {
        self.get(pfd).is_some()
    }

    /// Marks a slot free for reuse. The caller is responsible for having
    /// already closed the underlying fd.
    pub fn free(&mut self, index: u32) {
        self.slots[index as usize] = None;
        self.free.push(Reverse(index as usize));
    }

    /// Iterates every currently-live pfd, used by shutdown phase 1 to issue
    /// a cancellation per outstanding fd.
    pub fn live_indices(&self) -> impl Iterator<Item = u32> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.as_ref().map(|_| i as u32))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocation_prefers_lowest_free_index() {
        let mut table = PfdTable::new();
        let a = table.insert(10, FdType::LocalFile);
        let b = table.insert(11, FdType::LocalFile);
        let _c = table.insert(12, FdType::LocalFile);
        assert_eq!((a.index, b.index), (0, 1));

        table.free(a.index);
        table.free(b.index);

        // Lowest freed index (0) must be reused first, even though 1 was
        // freed second.
        let d = table.insert(99, FdType::LocalFile);
        assert_eq!(d.index, 0);
        assert_eq!(d.generation, 1);
    }

    #[test]
    fn stale_generation_is_not_current() {
        let mut table = PfdTable::new();
        let p1 = table.insert(5, FdType::NetworkSocket);
        table.free(p1.index);
        let p2 = table.insert(6, FdType::NetworkSocket);
        assert_eq!(p2.index, p1.index);
        assert_ne!(p2.generation, p1.generation);
        assert!(!table.is_current(p1));
        assert!(table.is_current(p2));
    }
}
