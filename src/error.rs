// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Error taxonomy for the crate.
//!
//! Two distinct kinds of failure get two distinct types. [`SystemError`] is
//! recoverable and response-carried: it travels inline inside
//! [`crate::response::IoResponse`] and is never returned as an `Err`.
//! [`EventManagerError`] is fatal and construction-time: a
//! `thiserror`-derived enum returned from the handful of calls that can
//! genuinely fail outside of the normal completion path (ring setup,
//! attach-to-work-queue).

use std::fmt;

use crate::errno::Errno;

/// Recoverable, response-carried errors. Branch on this; never matched
/// against with the expectation that it indicates a bug.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemError {
    /// No error occurred.
    None,
    /// The ring had no free submission-queue entry when the awaitable was
    /// constructed.
    SubmissionQueueFull,
    /// The event manager has already left the `LIVING` state.
    ManagerDyingOrDead,
    /// A read of zero bytes was requested; treated as a caller bug rather
    /// than a legitimate no-op.
    ZeroByteReadRejected,
    /// `close_pfd` was called twice (concurrently or sequentially without an
    /// intervening free) on the same pseudo-descriptor.
    PfdDoubleClose,
    /// The kernel rejected the `io_uring_submit` call itself (distinct from
    /// an operation completing with a negative result).
    SubmitFailed(Errno),
    /// The operation completed and the kernel reported a negative result.
    Kernel(Errno),
}

impl SystemError {
    /// `true` for [`SystemError::None`].
    #[must_use]
    pub fn is_ok(self) -> bool {
        matches!(self, SystemError::None)
    }

    /// Builds a [`SystemError`] from a raw `io_uring` completion result:
    /// non-negative is success, negative is `-errno`. `-ECANCELED` is a
    /// normal shutdown outcome, not mapped to anything special here —
    /// callers observe it as any other `Kernel` error.
    #[must_use]
    pub fn from_cqe_result(res: i32) -> Self {
        if res >= 0 {
            SystemError::None
        } else {
            SystemError::Kernel(Errno::from_raw(-res))
        }
    }
}

impl fmt::Display for SystemError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SystemError::None => write!(f, "no error"),
            SystemError::SubmissionQueueFull => write!(f, "submission queue full"),
            SystemError::ManagerDyingOrDead => write!(f, "event manager is dying or dead"),
            SystemError::ZeroByteReadRejected => write!(f, "reads of zero bytes are not allowed"),
            SystemError::PfdDoubleClose => write!(f, "pfd closed more than once"),
            SystemError::SubmitFailed(e) => write!(f, "io_uring_submit failed: {e}"),
            SystemError::Kernel(e) => write!(f, "operation failed: {e}"),
        }
    }
}

impl std::error::Error for SystemError {}

/// Fatal, constructor-time failures. These are the only errors in the crate
/// that are ever propagated as `Err` rather than folded into a response.
#[derive(Debug, thiserror::Error)]
pub enum EventManagerError {
    #[error("failed to initialize io_uring with {entries} entries: {source}")]
    RingInit {
        entries: u32,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to attach to the shared work queue (fd {wq_fd}): {source}")]
    AttachWorkQueue {
        wq_fd: i32,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to create the internal kill eventfd: {0}")]
    KillEventFdCreate(#[source] std::io::Error),

    #[error("pseudo-descriptor {0} is not registered")]
    UnknownPfd(u32),
}

pub type EventManagerResult<T> = Result<T, EventManagerError>;
