// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Per-opcode awaitable constructors: the public surface task bodies
//! actually call.

use std::{os::fd::RawFd, rc::Rc};

use super::IoAwaitable;
use crate::{
    manager::EventManager,
    pfd::PseudoFd,
    request::{
        AcceptParams, CloseParams, ConnectParams, EventParams, OpenAtParams, ReadParams,
        ReadvParams, RenameAtParams, RequestParams, ShutdownHow, ShutdownParams, StatxParams,
        UnlinkAtParams, WriteParams, WritevParams,
    },
    response::{
        AcceptPack, ClosePack, ConnectPack, EventPack, OpenAtPack, ReadPack, ReadvPack,
        RenameAtPack, ResponsePack, ShutdownPack, StatxPack, UnlinkAtPack, WritePack, WritevPack,
    },
    task::Task,
};

macro_rules! unwrap_pack {
    ($variant:ident) => {
        |pack: ResponsePack| match pack {
            ResponsePack::$variant(p) => p,
            other => panic!(concat!("expected ", stringify!($variant), " pack, got {:?}"), other),
        }
    };
}

/// Resolves a pseudo-descriptor to the raw fd a `RequestParams` variant
/// needs to carry. A stale or unknown pfd resolves to `-1` rather than
/// failing here: `submit_request` already rejects the request based on
/// pfd currency, so the kernel never actually sees this value.
fn raw_fd(manager: &EventManager, pfd: PseudoFd) -> RawFd {
    manager.raw_fd_of(pfd).unwrap_or(-1)
}

pub async fn read(manager: &Rc<EventManager>, me: &Task, pfd: PseudoFd, len: usize) -> crate::response::IoResponse<ReadPack> {
    let fd = raw_fd(manager, pfd);
    IoAwaitable::new(
        manager.clone(),
        me.clone(),
        pfd,
        RequestParams::Read(ReadParams { fd, len }),
        unwrap_pack!(Read),
    )
    .await
}

pub async fn write(
    manager: &Rc<EventManager>,
    me: &Task,
    pfd: PseudoFd,
    buf: Vec<u8>,
) -> crate::response::IoResponse<WritePack> {
    let fd = raw_fd(manager, pfd);
    IoAwaitable::new(
        manager.clone(),
        me.clone(),
        pfd,
        RequestParams::Write(WriteParams { fd, buf }),
        unwrap_pack!(Write),
    )
    .await
}

pub async fn readv(
    manager: &Rc<EventManager>,
    me: &Task,
    pfd: PseudoFd,
    lens: Vec<usize>,
) -> crate::response::IoResponse<ReadvPack> {
    let fd = raw_fd(manager, pfd);
    IoAwaitable::new(
        manager.clone(),
        me.clone(),
        pfd,
        RequestParams::Readv(ReadvParams { fd, lens }),
        unwrap_pack!(Readv),
    )
    .await
}

pub async fn writev(
    manager: &Rc<EventManager>,
    me: &Task,
    pfd: PseudoFd,
    bufs: Vec<Vec<u8>>,
) -> crate::response::IoResponse<WritevPack> {
    let fd = raw_fd(manager, pfd);
    IoAwaitable::new(
        manager.clone(),
        me.clone(),
        pfd,
        RequestParams::Writev(WritevParams { fd, bufs }),
        unwrap_pack!(Writev),
    )
    .await
}

pub async fn accept(
    manager: &Rc<EventManager>,
    me: &Task,
    listener_pfd: PseudoFd,
) -> crate::response::IoResponse<AcceptPack> {
    let listener_fd = raw_fd(manager, listener_pfd);
    IoAwaitable::new(
        manager.clone(),
        me.clone(),
        listener_pfd,
        RequestParams::Accept(AcceptParams { listener_fd }),
        unwrap_pack!(Accept),
    )
    .await
}

pub async fn connect(
    manager: &Rc<EventManager>,
    me: &Task,
    pfd: PseudoFd,
    addr: std::net::SocketAddr,
) -> crate::response::IoResponse<ConnectPack> {
    let fd = raw_fd(manager, pfd);
    IoAwaitable::new(
        manager.clone(),
        me.clone(),
        pfd,
        RequestParams::Connect(ConnectParams { fd, addr }),
        unwrap_pack!(Connect),
    )
    .await
}

pub async fn close(manager: &Rc<EventManager>, me: &Task, pfd: PseudoFd) -> crate::response::IoResponse<ClosePack> {
    let fd = raw_fd(manager, pfd);
    IoAwaitable::new(
        manager.clone(),
        me.clone(),
        pfd,
        RequestParams::Close(CloseParams { fd }),
        unwrap_pack!(Close),
    )
    .await
}

pub async fn shutdown(
    manager: &Rc<EventManager>,
    me: &Task,
    pfd: PseudoFd,
    how: ShutdownHow,
) -> crate::response::IoResponse<ShutdownPack> {
    let fd = raw_fd(manager, pfd);
    IoAwaitable::new(
        manager.clone(),
        me.clone(),
        pfd,
        RequestParams::Shutdown(ShutdownParams { fd, how }),
        unwrap_pack!(Shutdown),
    )
    .await
}

pub async fn open_at(
    manager: &Rc<EventManager>,
    me: &Task,
    dir_pfd: PseudoFd,
    path: std::ffi::CString,
    flags: i32,
    mode: u32,
) -> crate::response::IoResponse<OpenAtPack> {
    let dir_fd = raw_fd(manager, dir_pfd);
    IoAwaitable::new(
        manager.clone(),
        me.clone(),
        dir_pfd,
        RequestParams::OpenAt(OpenAtParams { dir_fd, path, flags, mode }),
        unwrap_pack!(OpenAt),
    )
    .await
}

pub async fn statx(
    manager: &Rc<EventManager>,
    me: &Task,
    dir_pfd: PseudoFd,
    path: std::ffi::CString,
    flags: i32,
    mask: u32,
) -> crate::response::IoResponse<StatxPack> {
    let dir_fd = raw_fd(manager, dir_pfd);
    IoAwaitable::new(
        manager.clone(),
        me.clone(),
        dir_pfd,
        RequestParams::Statx(StatxParams { dir_fd, path, flags, mask }),
        unwrap_pack!(Statx),
    )
    .await
}

pub async fn unlink_at(
    manager: &Rc<EventManager>,
    me: &Task,
    dir_pfd: PseudoFd,
    path: std::ffi::CString,
    flags: i32,
) -> crate::response::IoResponse<UnlinkAtPack> {
    let dir_fd = raw_fd(manager, dir_pfd);
    IoAwaitable::new(
        manager.clone(),
        me.clone(),
        dir_pfd,
        RequestParams::UnlinkAt(UnlinkAtParams { dir_fd, path, flags }),
        unwrap_pack!(UnlinkAt),
    )
    .await
}

pub async fn rename_at(
    manager: &Rc<EventManager>,
    me: &Task,
    old_dir_pfd: PseudoFd,
    old_path: std::ffi::CString,
    new_dir_pfd: PseudoFd,
    new_path: std::ffi::CString,
    flags: u32,
) -> crate::response::IoResponse<RenameAtPack> {
    let old_dir_fd = raw_fd(manager, old_dir_pfd);
    let new_dir_fd = raw_fd(manager, new_dir_pfd);
    IoAwaitable::new(
        manager.clone(),
        me.clone(),
        old_dir_pfd,
        RequestParams::RenameAt(RenameAtParams {
            old_dir_fd,
            old_path,
            new_dir_fd,
            new_path,
            flags,
        }),
        unwrap_pack!(RenameAt),
    )
    .await
}

pub async fn wait_event(manager: &Rc<EventManager>, me: &Task, pfd: PseudoFd) -> crate::response::IoResponse<EventPack> {
    let fd = raw_fd(manager, pfd);
    IoAwaitable::new(
        manager.clone(),
        me.clone(),
        pfd,
        RequestParams::Event(EventParams { fd }),
        unwrap_pack!(Event),
    )
    .await
}

/// Graceful socket teardown: `shutdown(SHUT_RDWR)`, drain with a zero-byte
/// read until it returns `0`, then `close`. Mirrors the three-step dance a
/// plain `close(2)` on a socket with unread data would skip.
pub async fn close_pfd_gracefully(manager: &Rc<EventManager>, me: &Task, pfd: PseudoFd) -> ClosePack {
    manager.begin_close(pfd).ok();

    if manager.pfd_type(pfd) == Some(crate::pfd::FdType::NetworkSocket) {
        let _ = shutdown(manager, me, pfd, ShutdownHow::Both).await;
        loop {
            let drained = read(manager, me, pfd, 1).await;
            match drained.pack {
                Some(p) if p.bytes_read == 0 => break,
                Some(_) => continue,
                None => break,
            }
        }
    }

    let result = close(manager, me, pfd).await;
    manager.finish_close(pfd);
    result.pack.unwrap_or_default()
}

/// Fire-and-forget: submits `pfd`'s next event-read and, once it
/// completes, hands the result to `handler` without the caller needing to
/// `.await` anything itself. Internally this just spawns a tiny task —
/// there is no separate callback-dispatch mechanism to keep in sync with
/// the awaitable one.
pub fn poll_event(manager: &Rc<EventManager>, pfd: PseudoFd, handler: impl FnOnce(EventPack) + 'static) {
    let manager = manager.clone();
    let task = Task::new(move |me| async move {
        let response = wait_event(&manager, &me, pfd).await;
        handler(response.pack.unwrap_or_default());
        0
    });
    manager.register_coro(task);
}
