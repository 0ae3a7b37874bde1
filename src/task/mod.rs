// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! The stackless-coroutine abstraction: a boxed, explicitly-driven future
//! with a heap-resident status cell and fault capture.
//!
//! A [`Task`] is a cheap handle (an `Rc` clone) around the actual future
//! and its bookkeeping. Driving it never happens through a real executor's
//! wake-up machinery — [`Task::start`], [`Task::resume`], and
//! [`Task::resume_with_response`] poll the inner future directly, under a
//! no-op waker, exactly when the owning driver decides to. A task is also
//! itself a [`Future`]: one task's body can simply `.await` another, and
//! ordinary Rust future composition takes care of resuming the right frame
//! at the right time without any extra bookkeeping.

mod status;

use std::{
    cell::{Cell, RefCell},
    future::Future,
    panic::{AssertUnwindSafe, catch_unwind},
    pin::Pin,
    rc::{Rc, Weak},
    task::{Context, Poll, Waker},
};

pub use status::TaskStatus;

use crate::{
    channel::CommunicationChannel,
    request::Opcode,
    response::ResponsePack,
};

struct TaskInner {
    channel: RefCell<CommunicationChannel>,
    status: RefCell<TaskStatus>,
    awaiter: RefCell<Option<Waker>>,
    metadata: Cell<Option<u32>>,
    fault: RefCell<Option<Box<dyn std::any::Any + Send>>>,
    body: RefCell<Option<Pin<Box<dyn Future<Output = i64>>>>>,
    started: Cell<bool>,
}

/// A handle to a running (or not-yet-started) coroutine.
///
/// Cloning a `Task` is cheap and shares the same underlying state — this is
/// how a suspended operation's [`crate::request::RequestData`] keeps a way
/// to resume the task that issued it without the table/index indirection a
/// non-reference-counted runtime would need.
#[derive(Clone)]
pub struct Task {
    inner: Rc<TaskInner>,
}

impl Task {
    /// Builds a task from a closure that receives a handle to the very
    /// task it is building the body for — `async move { manager.read(&me,
    /// ...).await }`-style bodies need `me` to hand to an awaitable as its
    /// resume key, and the task doesn't exist yet when the future is
    /// constructed. `Rc::new_cyclic` ties the knot: the `Weak` it hands out
    /// is only upgraded the first time the body is actually polled, by
    /// which point the `Rc` is fully built.
    #[must_use]
    pub fn new<F, Fut>(make_body: F) -> Self
    where
        F: FnOnce(Task) -> Fut + 'static,
        Fut: Future<Output = i64> + 'static,
    {
        let inner = Rc::new_cyclic(|weak: &Weak<TaskInner>| {
            let weak_for_body = weak.clone();
            let body_future = async move {
                let me = Task {
                    inner: weak_for_body.upgrade().expect("task dropped before its first poll"),
                };
                make_body(me).await
            };
            TaskInner {
                channel: RefCell::new(CommunicationChannel::new()),
                status: RefCell::new(TaskStatus::default()),
                awaiter: RefCell::new(None),
                metadata: Cell::new(None),
                fault: RefCell::new(None),
                body: RefCell::new(Some(Box::pin(body_future))),
                started: Cell::new(false),
            }
        });
        Task { inner }
    }

    /// Builds a task whose body doesn't need a handle to itself — the
    /// common case for pure-compute tasks with no I/O awaitables.
    #[must_use]
    pub fn from_future<Fut>(body: Fut) -> Self
    where
        Fut: Future<Output = i64> + 'static,
    {
        Task::new(move |_me| body)
    }

    #[must_use]
    pub fn is_done(&self) -> bool {
        self.inner.status.borrow().done
    }

    #[must_use]
    pub fn return_code(&self) -> Option<i64> {
        let status = self.inner.status.borrow();
        status.done.then_some(status.return_code)
    }

    pub fn set_metadata(&self, index: u32) {
        self.inner.metadata.set(Some(index));
    }

    #[must_use]
    pub fn metadata(&self) -> Option<u32> {
        self.inner.metadata.get()
    }

    /// Publishes a request onto this task's channel. Called by the body
    /// itself (via an awaitable) before suspending, never by the driver.
    pub fn with_channel<R>(&self, f: impl FnOnce(&mut CommunicationChannel) -> R) -> R {
        f(&mut self.inner.channel.borrow_mut())
    }

    /// Starts the task for the first time. Returns `Some(self)` if it
    /// suspended (there is more work to drive later), or `None` if it ran
    /// to completion on the very first poll.
    ///
    /// # Panics
    /// Panics if called more than once on the same task.
    pub fn start(&self) -> Option<Task> {
        assert!(!self.inner.started.replace(true), "Task::start called twice");
        self.reraise_stored_fault();
        self.drive_once()
    }

    /// Resumes the task without first depositing a response — used for
    /// cancellation/wake paths where the body will observe nothing new on
    /// its channel.
    pub fn resume(&self) -> Option<Task> {
        self.reraise_stored_fault();
        self.drive_once()
    }

    /// Deposits a response on this task's channel, then resumes it.
    pub fn resume_with_response(&self, opcode: Opcode, pack: ResponsePack) -> Option<Task> {
        self.inner.channel.borrow_mut().publish_response(opcode, pack);
        self.resume()
    }

    fn reraise_stored_fault(&self) {
        if let Some(payload) = self.inner.fault.borrow_mut().take() {
            std::panic::resume_unwind(payload);
        }
    }

    fn drive_once(&self) -> Option<Task> {
        let waker = futures_util::task::noop_waker();
        let mut cx = Context::from_waker(&waker);
        let mut this = self.clone();
        match catch_unwind(AssertUnwindSafe(|| Pin::new(&mut this).poll(&mut cx))) {
            Ok(Poll::Ready(_)) => None,
            Ok(Poll::Pending) => Some(self.clone()),
            Err(payload) => std::panic::resume_unwind(payload),
        }
    }
}

impl Future for Task {
    type Output = i64;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<i64> {
        let inner = self.inner.clone();

        {
            let status = inner.status.borrow();
            if status.done {
                return Poll::Ready(status.return_code);
            }
        }
        *inner.awaiter.borrow_mut() = Some(cx.waker().clone());

        // Marks the task done-with-a-placeholder-code on unwind, so a fault
        // inside the body still leaves the status cell in a terminal state
        // rather than "forever pending" for anyone still holding a handle.
        struct FinalizeOnUnwind<'a> {
            inner: &'a TaskInner,
            disarmed: bool,
        }
        impl Drop for FinalizeOnUnwind<'_> {
            fn drop(&mut self) {
                if !self.disarmed {
                    self.inner.status.borrow_mut().done = true;
                    if let Some(waker) = self.inner.awaiter.borrow_mut().take() {
                        waker.wake();
                    }
                }
            }
        }
        let mut guard = FinalizeOnUnwind { inner: &inner, disarmed: false };

        let mut body_slot = inner.body.borrow_mut();
        let body = body_slot.as_mut().expect("Task polled after it already finalized");
        let poll = body.as_mut().poll(cx);
        drop(body_slot);

        guard.disarmed = true;

        match poll {
            Poll::Ready(code) => {
                *inner.status.borrow_mut() = TaskStatus { done: true, return_code: code };
                if let Some(waker) = inner.awaiter.borrow_mut().take() {
                    waker.wake();
                }
                Poll::Ready(code)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a_finished_task_resolves_immediately() {
        let task = Task::from_future(async { 2 });
        assert!(task.start().is_none());
        assert_eq!(task.return_code(), Some(2));
    }

    #[test]
    fn nested_task_composition_resolves_through_to_the_outer_return_code() {
        // C awaits B awaits A, none of them touching any I/O awaitable —
        // ordinary future composition should thread the result straight
        // through, with no custom resume plumbing needed.
        let a = Task::from_future(async { 2 });
        let b = Task::from_future(async move { a.await + 1 });
        let c = Task::from_future(async move { b.await + 1 });
        assert!(c.start().is_none());
        assert_eq!(c.return_code(), Some(4));
    }

    #[test]
    fn a_task_that_panics_is_still_marked_done() {
        let task = Task::from_future(async {
            panic!("boom");
        });
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| task.start()));
        assert!(result.is_err());
        assert!(task.is_done());
    }
}
