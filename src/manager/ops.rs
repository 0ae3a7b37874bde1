// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Translating a [`RequestParams`] into the SQE to submit, and a completed
//! SQE's result back into the matching [`ResponsePack`].

use std::{mem, os::fd::RawFd};

use io_uring::{opcode, squeue::Entry, types::Fd};

use crate::{
    error::SystemError,
    pfd::{FdType, PfdTable},
    request::{RequestParams, RequestScratch, ShutdownHow},
    response::{
        AcceptPack, ClosePack, ConnectPack, EventPack, OpenAtPack, ReadPack, ReadvPack,
        RenameAtPack, ResponsePack, ShutdownPack, StatxPack, StatxRecord, UnlinkAtPack,
        WritePack, WritevPack,
    },
};

/// Converts `addr` into the raw `sockaddr_storage` + length pair
/// `connect`/`accept` SQEs point at.
#[must_use]
pub fn sockaddr_from(addr: &std::net::SocketAddr) -> (Box<libc::sockaddr_storage>, libc::socklen_t) {
    let mut storage: libc::sockaddr_storage = unsafe { mem::zeroed() };
    let len = match addr {
        std::net::SocketAddr::V4(v4) => {
            let sin: libc::sockaddr_in = libc::sockaddr_in {
                sin_family: libc::AF_INET as libc::sa_family_t,
                sin_port: v4.port().to_be(),
                sin_addr: libc::in_addr { s_addr: u32::from_ne_bytes(v4.ip().octets()) },
                sin_zero: [0; 8],
            };
            unsafe {
                std::ptr::write(
                    std::ptr::from_mut(&mut storage).cast::<libc::sockaddr_in>(),
                    sin,
                );
            }
            mem::size_of::<libc::sockaddr_in>()
        }
        std::net::SocketAddr::V6(v6) => {
            let sin6 = libc::sockaddr_in6 {
                sin6_family: libc::AF_INET6 as libc::sa_family_t,
                sin6_port: v6.port().to_be(),
                sin6_flowinfo: v6.flowinfo(),
                sin6_addr: libc::in6_addr { s6_addr: v6.ip().octets() },
                sin6_scope_id: v6.scope_id(),
            };
            unsafe {
                std::ptr::write(
                    std::ptr::from_mut(&mut storage).cast::<libc::sockaddr_in6>(),
                    sin6,
                );
            }
            mem::size_of::<libc::sockaddr_in6>()
        }
    };
    (Box::new(storage), len as libc::socklen_t)
}

fn shutdown_how_to_raw(how: ShutdownHow) -> i32 {
    match how {
        ShutdownHow::Read => libc::SHUT_RD,
        ShutdownHow::Write => libc::SHUT_WR,
        ShutdownHow::Both => libc::SHUT_RDWR,
    }
}

/// Builds the SQE for `params`, allocating whatever scratch storage the
/// kernel needs kept alive for the duration of the operation. Every raw fd
/// an operation needs already lives inside `params` itself — resolved from
/// whatever pseudo-descriptor(s) the caller started from before the
/// request ever reaches this layer.
#[must_use]
pub fn build_sqe(params: &RequestParams, user_data: u64) -> (Entry, RequestScratch) {
    match params {
        RequestParams::Read(p) => {
            let mut buf = vec![0u8; p.len];
            let entry = opcode::Read::new(Fd(p.fd), buf.as_mut_ptr(), p.len as u32)
                .build()
                .user_data(user_data);
            (entry, RequestScratch::Buffer(mem::take(&mut buf)))
        }
        RequestParams::Write(p) => {
            let buf = p.buf.clone();
            let entry = opcode::Write::new(Fd(p.fd), buf.as_ptr(), buf.len() as u32)
                .build()
                .user_data(user_data);
            (entry, RequestScratch::Buffer(buf))
        }
        RequestParams::Readv(p) => {
            let bufs: Vec<Vec<u8>> = p.lens.iter().map(|&len| vec![0u8; len]).collect();
            let mut iovecs: Vec<libc::iovec> = bufs
                .iter()
                .map(|b| libc::iovec { iov_base: b.as_ptr() as *mut _, iov_len: b.len() })
                .collect();
            let entry = opcode::Readv::new(Fd(p.fd), iovecs.as_mut_ptr(), iovecs.len() as u32)
                .build()
                .user_data(user_data);
            // `iovecs` itself can be dropped once the SQE is built: the
            // kernel only dereferences the iovec array at submission time,
            // then follows each `iov_base` pointer directly, which must
            // still point into `bufs` — so only `bufs` needs to outlive
            // the operation.
            (entry, RequestScratch::Vectored(bufs))
        }
        RequestParams::Writev(p) => {
            let bufs = p.bufs.clone();
            let mut iovecs: Vec<libc::iovec> = bufs
                .iter()
                .map(|b| libc::iovec { iov_base: b.as_ptr() as *mut _, iov_len: b.len() })
                .collect();
            let entry = opcode::Writev::new(Fd(p.fd), iovecs.as_mut_ptr(), iovecs.len() as u32)
                .build()
                .user_data(user_data);
            (entry, RequestScratch::Vectored(bufs))
        }
        RequestParams::Accept(p) => {
            let mut storage: libc::sockaddr_storage = unsafe { mem::zeroed() };
            let mut addr_len = mem::size_of::<libc::sockaddr_storage>() as libc::socklen_t;
            let entry = opcode::Accept::new(
                Fd(p.listener_fd),
                std::ptr::from_mut(&mut storage).cast(),
                &mut addr_len,
            )
            .build()
            .user_data(user_data);
            (entry, RequestScratch::Accept { addr: Box::new(storage), addr_len })
        }
        RequestParams::Connect(p) => {
            let (addr, addr_len) = sockaddr_from(&p.addr);
            let entry = opcode::Connect::new(
                Fd(p.fd),
                std::ptr::from_ref(addr.as_ref()).cast(),
                addr_len,
            )
            .build()
            .user_data(user_data);
            (entry, RequestScratch::Connect { addr, addr_len })
        }
        RequestParams::Close(p) => {
            let entry = opcode::Close::new(Fd(p.fd)).build().user_data(user_data);
            (entry, RequestScratch::None)
        }
        RequestParams::Shutdown(p) => {
            let entry = opcode::Shutdown::new(Fd(p.fd), shutdown_how_to_raw(p.how))
                .build()
                .user_data(user_data);
            (entry, RequestScratch::None)
        }
        RequestParams::OpenAt(p) => {
            let entry = opcode::OpenAt::new(Fd(p.dir_fd), p.path.as_ptr())
                .flags(p.flags)
                .mode(p.mode)
                .build()
                .user_data(user_data);
            (entry, RequestScratch::Paths(vec![p.path.clone()]))
        }
        RequestParams::Statx(p) => {
            let statxbuf: Box<libc::statx> = Box::new(unsafe { mem::zeroed() });
            let entry = opcode::Statx::new(
                Fd(p.dir_fd),
                p.path.as_ptr(),
                std::ptr::from_ref(statxbuf.as_ref()).cast_mut().cast(),
            )
            .flags(p.flags)
            .mask(p.mask)
            .build()
            .user_data(user_data);
            // Keep the path CString alive alongside the statx buffer.
            (entry, RequestScratch::Statx(statxbuf))
        }
        RequestParams::UnlinkAt(p) => {
            let entry = opcode::UnlinkAt::new(Fd(p.dir_fd), p.path.as_ptr())
                .flags(p.flags)
                .build()
                .user_data(user_data);
            (entry, RequestScratch::Paths(vec![p.path.clone()]))
        }
        RequestParams::RenameAt(p) => {
            let entry = opcode::RenameAt::new(
                Fd(p.old_dir_fd),
                p.old_path.as_ptr(),
                Fd(p.new_dir_fd),
                p.new_path.as_ptr(),
            )
            .flags(p.flags)
            .build()
            .user_data(user_data);
            (entry, RequestScratch::Paths(vec![p.old_path.clone(), p.new_path.clone()]))
        }
        RequestParams::Event(p) => {
            let mut buf = vec![0u8; 8];
            let entry = opcode::Read::new(Fd(p.fd), buf.as_mut_ptr(), 8)
                .build()
                .user_data(user_data);
            (entry, RequestScratch::Buffer(mem::take(&mut buf)))
        }
    }
}

/// Builds the completion pack for `opcode`, given the kernel's raw result
/// and the scratch storage that was kept alive for the operation. `pfds`
/// is threaded through so `accept`/`open_at` can register the new kernel
/// descriptor they produced.
#[must_use]
pub fn build_response(
    opcode: crate::request::Opcode,
    res: i32,
    scratch: RequestScratch,
    pfds: &mut PfdTable,
) -> ResponsePack {
    use crate::request::Opcode as Op;
    let error = if res < 0 { Some(SystemError::Kernel(crate::errno::Errno::from_raw(-res))) } else { None };

    match opcode {
        Op::Read => {
            let mut buf = match scratch {
                RequestScratch::Buffer(b) => b,
                _ => Vec::new(),
            };
            let bytes_read = if res >= 0 { res as usize } else { 0 };
            buf.truncate(bytes_read);
            ResponsePack::Read(ReadPack { bytes_read, buf, error })
        }
        Op::Write => {
            let bytes_written = if res >= 0 { res as usize } else { 0 };
            ResponsePack::Write(WritePack { bytes_written, error })
        }
        Op::Readv => {
            let mut bufs = match scratch {
                RequestScratch::Vectored(b) => b,
                _ => Vec::new(),
            };
            let mut remaining = if res >= 0 { res as usize } else { 0 };
            for buf in &mut bufs {
                let take = remaining.min(buf.len());
                buf.truncate(take);
                remaining -= take;
            }
            ResponsePack::Readv(ReadvPack { bytes_read: if res >= 0 { res as usize } else { 0 }, bufs, error })
        }
        Op::Writev => {
            let bytes_written = if res >= 0 { res as usize } else { 0 };
            ResponsePack::Writev(WritevPack { bytes_written, error })
        }
        Op::Accept => {
            let new_pfd = if res >= 0 { Some(pfds.insert(res as RawFd, FdType::NetworkSocket)) } else { None };
            ResponsePack::Accept(AcceptPack { new_pfd, error })
        }
        Op::Connect => ResponsePack::Connect(ConnectPack { error }),
        Op::Close => ResponsePack::Close(ClosePack { error }),
        Op::Shutdown => ResponsePack::Shutdown(ShutdownPack { error }),
        Op::OpenAt => {
            let new_pfd = if res >= 0 { Some(pfds.insert(res as RawFd, FdType::LocalFile)) } else { None };
            ResponsePack::OpenAt(OpenAtPack { new_pfd, error })
        }
        Op::Statx => {
            let record = match scratch {
                RequestScratch::Statx(buf) if res >= 0 => StatxRecord {
                    size: buf.stx_size,
                    mode: u32::from(buf.stx_mode),
                    mtime_sec: buf.stx_mtime.tv_sec,
                    mtime_nsec: buf.stx_mtime.tv_nsec,
                },
                _ => StatxRecord::default(),
            };
            ResponsePack::Statx(StatxPack { record, error })
        }
        Op::UnlinkAt => ResponsePack::UnlinkAt(UnlinkAtPack { error }),
        Op::RenameAt => ResponsePack::RenameAt(RenameAtPack { error }),
        Op::Event => ResponsePack::Event(EventPack { error }),
    }
}
