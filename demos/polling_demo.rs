// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Fire-and-forget event polling: `poll_event` arms a read on a custom
//! eventfd and invokes a plain closure once it fires, with no task the
//! caller has to `.await` itself.

use std::rc::Rc;

use uring_tasks::{awaitable::ops, config::EventManagerConfig, pfd::FdType, task::Task, EventManager};

fn main() {
    uring_tasks::logging::init();

    let manager = Rc::new(EventManager::new(EventManagerConfig::default()).expect("ring init"));
    manager.start();

    let signal_fd = rustix::event::eventfd(0, rustix::event::EventfdFlags::empty()).expect("eventfd");
    let signal_pfd = manager.pass_fd_to_event_manager(
        std::os::fd::IntoRawFd::into_raw_fd(signal_fd),
        FdType::EventSignal,
    );

    let manager_for_handler = manager.clone();
    ops::poll_event(&manager, signal_pfd, move |pack| {
        println!("event fired, error = {:?}", pack.error);
        manager_for_handler.kill().ok();
    });

    // A second task raises the eventfd a moment later, as if some
    // external condition the runtime doesn't model directly had
    // completed.
    let manager_for_raiser = manager.clone();
    let raiser = Task::from_future(async move {
        let fd = manager_for_raiser.raw_fd_of(signal_pfd).expect("signal pfd");
        let borrowed = unsafe { rustix::fd::BorrowedFd::borrow_raw(fd) };
        let one: u64 = 1;
        rustix::io::write(borrowed, &one.to_ne_bytes()).ok();
        0
    });
    manager.register_coro(raiser);

    manager.run().expect("event loop");
}
