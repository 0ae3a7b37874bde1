// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! The registered-coroutine table.
//!
//! Every task handed to [`crate::manager::EventManager::register_coro`]
//! lives here for as long as it might still be driven, addressed by a
//! [`CoroKey`] stored back on the task itself (via
//! [`crate::task::Task::set_metadata`]) so completion handling and shutdown
//! can look a task up by the same lowest-free-index discipline the pfd
//! table uses.

use std::{cmp::Reverse, collections::BinaryHeap};

use crate::task::Task;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CoroKey(pub u32);

#[derive(Debug, Default)]
pub struct Registry {
    slots: Vec<Option<Task>>,
    free: BinaryHeap<Reverse<usize>>,
}

impl Registry {
    #[must_use]
    pub fn new() -> Self {
        Registry { slots: Vec::new(), free: BinaryHeap::new() }
    }

    /// Registers `task`, reusing the lowest-indexed free slot if one
    /// exists, and stamps the assigned key back onto the task's metadata.
    pub fn insert(&mut self, task: Task) -> CoroKey {
        let index = if let Some(Reverse(idx)) = self.free.pop() {
            self.slots[idx] = Some(task.clone());
            idx
        } else {
            let idx = self.slots.len();
            self.slots.push(Some(task.clone()));
            idx
        };
        task.set_metadata(index as u32);
        CoroKey(index as u32)
    }

    #[must_use]
    pub fn get(&self, key: CoroKey) -> Option<&Task> {
        self.slots.get(key.0 as usize)?.as_ref()
    }

    pub fn remove(&mut self, key: CoroKey) {
        let idx = key.0 as usize;
        if idx < self.slots.len() && self.slots[idx].is_some() {
            self.slots[idx] = None;
            self.free.push(Reverse(idx));
        }
    }

    /// All still-registered tasks, in ascending key order. Used to drive
    /// cancellation during shutdown.
    pub fn iter(&self) -> impl Iterator<Item = (CoroKey, &Task)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|task| (CoroKey(i as u32), task)))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registration_reuses_the_lowest_freed_key() {
        let mut registry = Registry::new();
        let a = registry.insert(Task::from_future(async { 1 }));
        let b = registry.insert(Task::from_future(async { 2 }));
        assert_eq!((a.0, b.0), (0, 1));

        registry.remove(a);
        let c = registry.insert(Task::from_future(async { 3 }));
        assert_eq!(c.0, 0);
    }
}
