// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Thin wrapper over the host's errno catalog.
//!
//! Rather than re-deriving one enum variant per errno, this borrows
//! `rustix::io::Errno`, which already wraps a raw `c_int` and knows how to
//! render itself (`strerror`-backed `Display`) and how to compare against
//! the standard named constants.

use std::fmt;

/// A raw, non-negative errno value recovered from a negative `io_uring`
/// completion result (`res < 0` ⇒ `res.unsigned_abs()` is the errno).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Errno(rustix::io::Errno);

impl Errno {
    /// Builds an `Errno` from a positive raw value (e.g. `-res` where `res`
    /// was a negative `io_uring` completion result).
    #[must_use]
    pub fn from_raw(raw: i32) -> Self {
        Errno(rustix::io::Errno::from_raw_os_error(raw))
    }

    #[must_use]
    pub fn raw(self) -> i32 {
        self.0.raw_os_error()
    }

    #[must_use]
    pub fn is_canceled(self) -> bool {
        self.0 == rustix::io::Errno::CANCELED
    }

    #[must_use]
    pub fn is_would_block(self) -> bool {
        self.0 == rustix::io::Errno::WOULDBLOCK || self.0 == rustix::io::Errno::AGAIN
    }
}

impl From<rustix::io::Errno> for Errno {
    fn from(e: rustix::io::Errno) -> Self {
        Errno(e)
    }
}

impl From<std::io::Error> for Errno {
    fn from(e: std::io::Error) -> Self {
        match e.raw_os_error() {
            Some(raw) => Errno::from_raw(raw),
            None => Errno::from_raw(rustix::io::Errno::IO.raw_os_error()),
        }
    }
}

impl fmt::Display for Errno {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.0, self.raw())
    }
}
