// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Tunables for one [`crate::manager::EventManager`] instance.

/// Construction-time configuration for an event manager. All managers
/// configured with `share_ring: true` attach to the same process-wide ring
/// (see [`crate::ring`]); the first one to start owns its lifetime.
#[derive(Debug, Clone)]
pub struct EventManagerConfig {
    /// Submission/completion queue depth requested from the kernel. Rounded
    /// up to the next power of two by `io_uring` itself.
    pub queue_depth: u32,
    /// Attach to the shared process-wide ring via `IORING_SETUP_ATTACH_WQ`
    /// instead of creating an independent one.
    pub share_ring: bool,
}

impl Default for EventManagerConfig {
    fn default() -> Self {
        EventManagerConfig { queue_depth: 256, share_ring: true }
    }
}

impl EventManagerConfig {
    #[must_use]
    pub fn with_queue_depth(mut self, queue_depth: u32) -> Self {
        self.queue_depth = queue_depth;
        self
    }

    #[must_use]
    pub fn without_shared_ring(mut self) -> Self {
        self.share_ring = false;
        self
    }
}
