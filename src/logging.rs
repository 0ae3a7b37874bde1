// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! `tracing`-based diagnostics.
//!
//! One `fmt` layer, filtered by `RUST_LOG` (falling back to `info` for this
//! crate's own target, `warn` otherwise). Call [`init`] once near the start
//! of a binary; library code just uses the `tracing` macros directly and
//! never touches this module.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Installs a global `tracing` subscriber. Safe to call more than once —
/// later calls are a no-op, matching `tracing`'s own "first one wins"
/// global-default semantics.
pub fn init() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,uring_tasks=info"));

    let fmt_layer = tracing_subscriber::fmt::layer().with_target(true).with_thread_ids(true);

    let _ = tracing_subscriber::registry().with(filter).with(fmt_layer).try_init();
}
