// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! The process-wide shared work queue.
//!
//! `io_uring` lets a newly created ring attach to an existing ring's async
//! worker pool via `IORING_SETUP_ATTACH_WQ`, so multiple independent rings
//! (and therefore multiple [`crate::manager::EventManager`]s) can share one
//! pool of kernel worker threads instead of each spinning up their own.
//! The first manager to ask for a shared ring becomes the anchor; every
//! later one attaches to it. A mutex-guarded refcount tracks how many
//! managers are currently attached so the anchor's identity can be
//! released once nobody needs it any more.

use std::{os::fd::AsRawFd, sync::Mutex};

struct AnchorState {
    fd: i32,
    refcount: u32,
}

static ANCHOR: Mutex<Option<AnchorState>> = Mutex::new(None);

/// Builds a ring with `entries` submission-queue slots. If `share_ring` is
/// set and an anchor ring already exists, attaches to its work queue;
/// otherwise builds independently, and if `share_ring`, becomes the new
/// anchor.
pub fn build_ring(entries: u32, share_ring: bool) -> std::io::Result<io_uring::IoUring> {
    let mut guard = ANCHOR.lock().expect("shared ring anchor mutex poisoned");

    if share_ring {
        if let Some(anchor) = guard.as_mut() {
            let ring = io_uring::IoUring::builder().setup_attach_wq(anchor.fd).build(entries)?;
            anchor.refcount += 1;
            return Ok(ring);
        }
    }

    let ring = io_uring::IoUring::builder().build(entries)?;
    if share_ring {
        *guard = Some(AnchorState { fd: ring.as_raw_fd(), refcount: 1 });
    }
    Ok(ring)
}

/// Releases this manager's claim on the shared work queue. Once the last
/// attached manager releases, the anchor slot is cleared so the next
/// manager to ask for a shared ring starts a fresh one.
pub fn release_ring(share_ring: bool) {
    if !share_ring {
        return;
    }
    let mut guard = ANCHOR.lock().expect("shared ring anchor mutex poisoned");
    if let Some(anchor) = guard.as_mut() {
        anchor.refcount = anchor.refcount.saturating_sub(1);
        if anchor.refcount == 0 {
            *guard = None;
        }
    }
}
