// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Opcode tags and their parameter packs.
//!
//! The operation space is modeled as a tagged variant: each [`Opcode`] names
//! one kind of request, and [`RequestParams`] carries the matching
//! parameter pack for whichever one is in flight.

use std::os::fd::RawFd;

use crate::pfd::PseudoFd;

/// Every I/O intent this runtime knows how to submit. `Event` is the
/// internal eventfd-read primitive backing both the manager's own
/// kill-signal and the public generic event-signalling surface tasks can
/// await directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    Read,
    Write,
    Readv,
    Writev,
    Accept,
    Connect,
    Close,
    Shutdown,
    OpenAt,
    Statx,
    UnlinkAt,
    RenameAt,
    Event,
}

#[derive(Debug, Clone)]
pub struct ReadParams {
    pub fd: RawFd,
    pub len: usize,
}

#[derive(Debug, Clone)]
pub struct WriteParams {
    pub fd: RawFd,
    pub buf: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct ReadvParams {
    pub fd: RawFd,
    pub lens: Vec<usize>,
}

#[derive(Debug, Clone)]
pub struct WritevParams {
    pub fd: RawFd,
    pub bufs: Vec<Vec<u8>>,
}

#[derive(Debug, Clone, Copy)]
pub struct AcceptParams {
    pub listener_fd: RawFd,
}

#[derive(Debug, Clone)]
pub struct ConnectParams {
    pub fd: RawFd,
    pub addr: std::net::SocketAddr,
}

#[derive(Debug, Clone, Copy)]
pub struct CloseParams {
    pub fd: RawFd,
}

#[derive(Debug, Clone, Copy)]
pub struct ShutdownParams {
    pub fd: RawFd,
    pub how: ShutdownHow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownHow {
    Read,
    Write,
    Both,
}

#[derive(Debug, Clone)]
pub struct OpenAtParams {
    pub dir_fd: RawFd,
    pub path: std::ffi::CString,
    pub flags: i32,
    /// `0666`-style mode bits. Callers must pass an explicit value; this
    /// type never supplies a default since one only matters when `flags`
    /// includes `O_CREAT`.
    pub mode: u32,
}

#[derive(Debug, Clone)]
pub struct StatxParams {
    pub dir_fd: RawFd,
    pub path: std::ffi::CString,
    pub flags: i32,
    pub mask: u32,
}

#[derive(Debug, Clone)]
pub struct UnlinkAtParams {
    pub dir_fd: RawFd,
    pub path: std::ffi::CString,
    pub flags: i32,
}

#[derive(Debug, Clone)]
pub struct RenameAtParams {
    pub old_dir_fd: RawFd,
    pub old_path: std::ffi::CString,
    pub new_dir_fd: RawFd,
    pub new_path: std::ffi::CString,
    pub flags: u32,
}

#[derive(Debug, Clone, Copy)]
pub struct EventParams {
    pub fd: RawFd,
}

/// The opcode-tagged parameter union stored in [`crate::channel::CommunicationChannel`].
#[derive(Debug, Clone)]
pub enum RequestParams {
    Read(ReadParams),
    Write(WriteParams),
    Readv(ReadvParams),
    Writev(WritevParams),
    Accept(AcceptParams),
    Connect(ConnectParams),
    Close(CloseParams),
    Shutdown(ShutdownParams),
    OpenAt(OpenAtParams),
    Statx(StatxParams),
    UnlinkAt(UnlinkAtParams),
    RenameAt(RenameAtParams),
    Event(EventParams),
}

impl RequestParams {
    #[must_use]
    pub fn opcode(&self) -> Opcode {
        match self {
            RequestParams::Read(_) => Opcode::Read,
            RequestParams::Write(_) => Opcode::Write,
            RequestParams::Readv(_) => Opcode::Readv,
            RequestParams::Writev(_) => Opcode::Writev,
            RequestParams::Accept(_) => Opcode::Accept,
            RequestParams::Connect(_) => Opcode::Connect,
            RequestParams::Close(_) => Opcode::Close,
            RequestParams::Shutdown(_) => Opcode::Shutdown,
            RequestParams::OpenAt(_) => Opcode::OpenAt,
            RequestParams::Statx(_) => Opcode::Statx,
            RequestParams::UnlinkAt(_) => Opcode::UnlinkAt,
            RequestParams::RenameAt(_) => Opcode::RenameAt,
            RequestParams::Event(_) => Opcode::Event,
        }
    }
}

/// Per-in-flight-operation bookkeeping owned by the driver while the
/// operation is outstanding, recovered from the completion's `user_data`.
/// `resume_key` is a clone of the task handle to resume on completion — a
/// cheap `Rc` bump, and one that survives the task being moved around since
/// there is nothing to move: the handle already points at the heap-resident
/// task state.
pub struct RequestData {
    pub opcode: Opcode,
    pub pfd: PseudoFd,
    pub resume_key: crate::task::Task,
    /// Opcode-specific scratch owned for the lifetime of the kernel
    /// operation: the read/write buffer, the `iovec` backing storage, the
    /// `sockaddr_storage` + length for accept, the path `CString`s, etc.
    pub scratch: RequestScratch,
}

/// Ancillary heap allocations whose lifetime must span the kernel
/// operation. Freed by the completion handler on both the live and the
/// stale-completion path.
pub enum RequestScratch {
    Buffer(Vec<u8>),
    Vectored(Vec<Vec<u8>>),
    Accept { addr: Box<libc::sockaddr_storage>, addr_len: libc::socklen_t },
    /// The kernel reads this pointer for the lifetime of an in-flight
    /// `connect`, so it has to be kept alive the same way an accept's
    /// output buffer does.
    Connect { addr: Box<libc::sockaddr_storage>, addr_len: libc::socklen_t },
    Paths(Vec<std::ffi::CString>),
    /// `statx` writes its result into this buffer; read back once the
    /// completion arrives.
    Statx(Box<libc::statx>),
    None,
}
