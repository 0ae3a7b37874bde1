// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Opcode-specific completion packs and the [`IoResponse`] wrapper.
//!
//! Every pack carries a `SystemError` slot, `None` on success.

use crate::{error::SystemError, pfd::PseudoFd};

#[derive(Debug, Clone, Default)]
pub struct ReadPack {
    pub bytes_read: usize,
    pub buf: Vec<u8>,
    pub error: Option<SystemError>,
}

#[derive(Debug, Clone, Default)]
pub struct WritePack {
    pub bytes_written: usize,
    pub error: Option<SystemError>,
}

#[derive(Debug, Clone, Default)]
pub struct ReadvPack {
    pub bytes_read: usize,
    pub bufs: Vec<Vec<u8>>,
    pub error: Option<SystemError>,
}

#[derive(Debug, Clone, Default)]
pub struct WritevPack {
    pub bytes_written: usize,
    pub error: Option<SystemError>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptPack {
    pub new_pfd: Option<PseudoFd>,
    pub error: Option<SystemError>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ConnectPack {
    pub error: Option<SystemError>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ClosePack {
    pub error: Option<SystemError>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ShutdownPack {
    pub error: Option<SystemError>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct OpenAtPack {
    pub new_pfd: Option<PseudoFd>,
    pub error: Option<SystemError>,
}

/// The subset of `struct statx` fields callers actually need: size, mode,
/// and the mtime, rather than the full kernel struct.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatxRecord {
    pub size: u64,
    pub mode: u32,
    pub mtime_sec: i64,
    pub mtime_nsec: u32,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StatxPack {
    pub record: StatxRecord,
    pub error: Option<SystemError>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct UnlinkAtPack {
    pub error: Option<SystemError>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RenameAtPack {
    pub error: Option<SystemError>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct EventPack {
    pub error: Option<SystemError>,
}

/// Opcode-tagged response union stored in
/// [`crate::channel::CommunicationChannel`].
#[derive(Debug, Clone)]
pub enum ResponsePack {
    Read(ReadPack),
    Write(WritePack),
    Readv(ReadvPack),
    Writev(WritevPack),
    Accept(AcceptPack),
    Connect(ConnectPack),
    Close(ClosePack),
    Shutdown(ShutdownPack),
    OpenAt(OpenAtPack),
    Statx(StatxPack),
    UnlinkAt(UnlinkAtPack),
    RenameAt(RenameAtPack),
    Event(EventPack),
}

/// What an [`crate::awaitable::IoAwaitable`] yields: a submission-time
/// error (if the ring itself rejected the request), and — only if
/// submission succeeded — the opcode-specific completion pack.
#[derive(Debug, Clone)]
pub struct IoResponse<Pack> {
    /// Non-[`SystemError::None`] only if the awaitable never reached the
    /// kernel at all (queue full, or `io_uring_submit` itself failed).
    pub submission_error: SystemError,
    pub pack: Option<Pack>,
}

impl<Pack> IoResponse<Pack> {
    #[must_use]
    pub fn submission_failed(error: SystemError) -> Self {
        IoResponse { submission_error: error, pack: None }
    }

    #[must_use]
    pub fn completed(pack: Pack) -> Self {
        IoResponse { submission_error: SystemError::None, pack: Some(pack) }
    }

    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.submission_error.is_ok()
    }
}

/// Helper used when the kernel-side `statx` support is unavailable and the
/// pack has to be synthesized from a blocking fallback.
impl StatxRecord {
    #[must_use]
    pub fn from_stat(meta: &std::fs::Metadata) -> Self {
        use std::os::unix::fs::MetadataExt;
        StatxRecord {
            size: meta.size(),
            mode: meta.mode(),
            mtime_sec: meta.mtime(),
            mtime_nsec: meta.mtime_nsec() as u32,
        }
    }
}
