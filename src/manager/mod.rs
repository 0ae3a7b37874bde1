// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! The driver: owns the kernel ring, the pseudo-descriptor table, the
//! registered-coroutine table, and the completion loop.
//!
//! Everything here runs on one thread against `&self` — interior
//! mutability (`RefCell`/`Cell`) stands in for the locking a
//! multi-threaded driver would need, since there is exactly one thread
//! ever touching the ring.

pub mod ops;
pub mod pending;
pub mod registry;

use std::{cell::{Cell, RefCell}, os::fd::RawFd};

use io_uring::opcode;
use io_uring::types::Fd;

use crate::{
    config::EventManagerConfig,
    error::{EventManagerError, EventManagerResult, SystemError},
    pfd::{FdType, PfdTable, PseudoFd},
    request::{Opcode, RequestData, RequestParams, RequestScratch},
    task::Task,
};

use self::{pending::PendingTable, registry::Registry};

/// `user_data` reserved for the kill-eventfd watcher; never handed out by
/// [`PendingTable::insert`], which only ever returns small dense indices.
const KILL_USER_DATA: u64 = u64::MAX;
/// `user_data` for `AsyncCancel` SQEs themselves — their own completion
/// carries no operation to resume, just a result code nobody currently
/// inspects.
const CANCEL_USER_DATA: u64 = u64::MAX - 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LifeState {
    NotStarted,
    Living,
    DyingPhase1,
    DyingPhase2Cancelling,
    Dead,
}

pub struct EventManager {
    ring: RefCell<io_uring::IoUring>,
    config: EventManagerConfig,
    life_state: Cell<LifeState>,
    pfds: RefCell<PfdTable>,
    registry: RefCell<Registry>,
    pending: RefCell<PendingTable>,
    kill_pfd: PseudoFd,
    kill_read_buf: RefCell<Option<Box<[u8; 8]>>>,
}

impl EventManager {
    pub fn new(config: EventManagerConfig) -> EventManagerResult<Self> {
        let ring = crate::ring::build_ring(config.queue_depth, config.share_ring)
            .map_err(|source| EventManagerError::RingInit { entries: config.queue_depth, source })?;

        let kill_fd = rustix::event::eventfd(0, rustix::event::EventfdFlags::empty())
            .map_err(|e| EventManagerError::KillEventFdCreate(e.into()))?;
        let mut pfds = PfdTable::new();
        // The pfd table stores a raw fd and is responsible for closing it
        // later, so ownership moves out of the `OwnedFd` wrapper here.
        let kill_pfd = pfds.insert(std::os::fd::IntoRawFd::into_raw_fd(kill_fd), FdType::EventSignal);

        Ok(EventManager {
            ring: RefCell::new(ring),
            config,
            life_state: Cell::new(LifeState::NotStarted),
            pfds: RefCell::new(pfds),
            registry: RefCell::new(Registry::new()),
            pending: RefCell::new(PendingTable::new()),
            kill_pfd,
            kill_read_buf: RefCell::new(None),
        })
    }

    #[must_use]
    pub fn life_state(&self) -> LifeState {
        self.life_state.get()
    }

    #[must_use]
    pub fn is_dying_or_dead(&self) -> bool {
        self.life_state.get() >= LifeState::DyingPhase1
    }

    /// Transitions `NOT_STARTED -> LIVING` and arms the kill-eventfd watch.
    ///
    /// # Panics
    /// Panics if called more than once.
    pub fn start(&self) {
        assert_eq!(self.life_state.get(), LifeState::NotStarted, "EventManager::start called twice");
        self.life_state.set(LifeState::Living);
        self.arm_kill_watch();
    }

    fn arm_kill_watch(&self) {
        let fd = self.pfds.borrow().get(self.kill_pfd).expect("kill pfd missing").fd;
        let mut buf: Box<[u8; 8]> = Box::new([0; 8]);
        let entry = opcode::Read::new(Fd(fd), buf.as_mut_ptr(), 8).build().user_data(KILL_USER_DATA);
        *self.kill_read_buf.borrow_mut() = Some(buf);
        unsafe {
            self.ring.borrow_mut().submission().push(&entry).expect("submission queue full arming kill watch");
        }
        self.ring.borrow_mut().submit().expect("io_uring_submit failed arming kill watch");
    }

    /// Wakes the blocking completion loop and begins the shutdown sequence.
    /// Safe to call from anywhere that can reach this manager; the actual
    /// state transition happens on the driver thread once the eventfd read
    /// completes.
    pub fn kill(&self) -> EventManagerResult<()> {
        let fd = self.pfds.borrow().get(self.kill_pfd).expect("kill pfd missing").fd;
        let borrowed = unsafe { rustix::fd::BorrowedFd::borrow_raw(fd) };
        let one: u64 = 1;
        rustix::io::write(borrowed, &one.to_ne_bytes())
            .map_err(|e| EventManagerError::KillEventFdCreate(e.into()))?;
        Ok(())
    }

    /// Runs the completion loop until shutdown reaches `DEAD`.
    pub fn run(&self) -> EventManagerResult<()> {
        while self.life_state.get() != LifeState::Dead {
            self.ring
                .borrow_mut()
                .submit_and_wait(1)
                .map_err(|source| EventManagerError::RingInit { entries: self.config.queue_depth, source })?;

            let completions: Vec<(u64, i32)> = {
                let mut ring = self.ring.borrow_mut();
                ring.completion().map(|cqe| (cqe.user_data(), cqe.result())).collect()
            };
            for (user_data, res) in completions {
                self.handle_completion(user_data, res);
            }

            if self.life_state.get() == LifeState::DyingPhase2Cancelling && self.pending.borrow().is_empty() {
                self.life_state.set(LifeState::Dead);
            }
        }
        Ok(())
    }

    fn handle_completion(&self, user_data: u64, res: i32) {
        if user_data == KILL_USER_DATA {
            self.begin_shutdown();
            return;
        }
        if user_data == CANCEL_USER_DATA {
            return;
        }

        let Some(data) = self.pending.borrow_mut().take(user_data) else {
            tracing::warn!(user_data, "completion for an unknown user_data");
            return;
        };

        if !self.pfds.borrow().is_current(data.pfd) {
            // The pfd was reused since this operation was submitted; the
            // scratch storage is simply dropped here and nothing is
            // delivered anywhere.
            tracing::debug!(pfd = data.pfd.index, "dropping stale completion");
            return;
        }

        let pack = {
            let mut pfds = self.pfds.borrow_mut();
            ops::build_response(data.opcode, res, data.scratch, &mut pfds)
        };
        data.resume_key.resume_with_response(data.opcode, pack);
    }

    fn begin_shutdown(&self) {
        if self.life_state.get() != LifeState::Living {
            return;
        }
        self.life_state.set(LifeState::DyingPhase1);

        let outstanding = self.pending.borrow().live_user_data();
        {
            let mut ring = self.ring.borrow_mut();
            for user_data in outstanding {
                let entry = opcode::AsyncCancel::new(user_data).build().user_data(CANCEL_USER_DATA);
                unsafe {
                    let _ = ring.submission().push(&entry);
                }
            }
            let _ = ring.submit();
        }

        self.life_state.set(LifeState::DyingPhase2Cancelling);
        if self.pending.borrow().is_empty() {
            self.life_state.set(LifeState::Dead);
        }
    }

    /// Registers a kernel fd obtained outside the ring (e.g. `socket(2)`,
    /// a listener accepted elsewhere) and returns its pseudo-descriptor.
    pub fn pass_fd_to_event_manager(&self, fd: RawFd, fd_type: FdType) -> PseudoFd {
        self.pfds.borrow_mut().insert(fd, fd_type)
    }

    /// Registers a task with the driver and runs it until its first
    /// suspension point (or completion, if it never suspends).
    pub fn register_coro(&self, task: Task) -> registry::CoroKey {
        let key = self.registry.borrow_mut().insert(task.clone());
        if task.start().is_none() {
            self.registry.borrow_mut().remove(key);
        }
        key
    }

    /// Submits one I/O operation on behalf of `task`, to be resumed with
    /// its [`crate::response::ResponsePack`] once the completion arrives
    /// (or dropped silently if `task`'s pfd is reused before then).
    pub fn submit_request(&self, task: Task, pfd: PseudoFd, params: RequestParams) -> SystemError {
        if self.life_state.get() != LifeState::Living {
            return SystemError::ManagerDyingOrDead;
        }
        if let RequestParams::Read(p) = &params {
            if p.len == 0 {
                return SystemError::ZeroByteReadRejected;
            }
        }

        if self.pfds.borrow().get(pfd).is_none() {
            return SystemError::Kernel(crate::errno::Errno::from_raw(libc::EBADF));
        }

        let opcode = params.opcode();
        let placeholder =
            RequestData { opcode, pfd, resume_key: task, scratch: RequestScratch::None };
        let user_data = self.pending.borrow_mut().insert(placeholder);

        let (entry, scratch) = ops::build_sqe(&params, user_data);
        if let Some(slot) = self.pending.borrow_mut().slot_mut(user_data) {
            slot.scratch = scratch;
        }

        let pushed = unsafe { self.ring.borrow_mut().submission().push(&entry) };
        if pushed.is_err() {
            self.pending.borrow_mut().take(user_data);
            return SystemError::SubmissionQueueFull;
        }

        match self.ring.borrow_mut().submit() {
            Ok(_) => SystemError::None,
            Err(e) => {
                self.pending.borrow_mut().take(user_data);
                SystemError::SubmitFailed(e.into())
            }
        }
    }

    /// Marks a pfd as being closed. The caller (normally
    /// [`crate::awaitable::close_pfd`]) drives the shutdown/drain/close
    /// state machine itself and calls [`Self::finish_close`] once the
    /// underlying fd has actually been closed.
    pub fn begin_close(&self, pfd: PseudoFd) -> Result<(), SystemError> {
        let mut pfds = self.pfds.borrow_mut();
        match pfds.get_mut(pfd) {
            Some(slot) if slot.being_freed => Err(SystemError::PfdDoubleClose),
            Some(slot) => {
                slot.being_freed = true;
                Ok(())
            }
            None => Err(SystemError::Kernel(crate::errno::Errno::from_raw(libc::EBADF))),
        }
    }

    pub fn finish_close(&self, pfd: PseudoFd) {
        self.pfds.borrow_mut().free(pfd.index);
    }

    #[must_use]
    pub fn pfd_type(&self, pfd: PseudoFd) -> Option<FdType> {
        self.pfds.borrow().get(pfd).map(|s| s.fd_type)
    }

    /// Resolves a pseudo-descriptor to the raw kernel fd it currently
    /// wraps. Needed wherever a request's parameter pack has to carry the
    /// raw fd directly (e.g. `RenameAt`'s second directory argument).
    #[must_use]
    pub fn raw_fd_of(&self, pfd: PseudoFd) -> Option<RawFd> {
        self.pfds.borrow().get(pfd).map(|s| s.fd)
    }
}

impl Drop for EventManager {
    fn drop(&mut self) {
        crate::ring::release_ring(self.config.share_ring);
    }
}
