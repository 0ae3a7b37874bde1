// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Integration tests that need a live kernel ring: round-trip I/O, an
//! accept that returns a pseudo-descriptor rather than a raw fd, and
//! shutdown cancelling an operation still in flight.

use std::{os::fd::AsRawFd, rc::Rc};

use pretty_assertions::assert_eq;
use uring_tasks::{awaitable::ops, config::EventManagerConfig, pfd::FdType, task::Task, EventManager};

#[test]
fn write_then_read_round_trips_through_the_ring() {
    let manager = Rc::new(EventManager::new(EventManagerConfig::default()).unwrap());
    manager.start();

    let tmp = tempfile::NamedTempFile::new().unwrap();
    let path = tmp.path().to_path_buf();
    let cwd_pfd = manager.pass_fd_to_event_manager(libc::AT_FDCWD, FdType::LocalFile);

    let manager_for_task = manager.clone();
    let task = Task::new(move |me| {
        let manager = manager_for_task;
        async move {
            let open_path = std::ffi::CString::new(path.to_str().unwrap()).unwrap();
            let opened = ops::open_at(&manager, &me, cwd_pfd, open_path, libc::O_RDWR, 0o644).await;
            let file_pfd = opened.pack.unwrap().new_pfd.unwrap();

            let written = ops::write(&manager, &me, file_pfd, b"round trip".to_vec()).await;
            assert_eq!(written.pack.unwrap().bytes_written, 10);

            let read_back = ops::read(&manager, &me, file_pfd, 10).await;
            assert_eq!(read_back.pack.unwrap().buf, b"round trip");

            ops::close(&manager, &me, file_pfd).await;
            manager.kill().unwrap();
            0
        }
    });
    manager.register_coro(task);
    manager.run().unwrap();
}

#[test]
fn accept_yields_a_pseudo_descriptor_not_a_raw_fd() {
    let manager = Rc::new(EventManager::new(EventManagerConfig::default()).unwrap());
    manager.start();

    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let listener_pfd = manager.pass_fd_to_event_manager(listener.as_raw_fd(), FdType::NetworkSocket);

    let manager_for_task = manager.clone();
    let accept_task = Task::new(move |me| {
        let manager = manager_for_task;
        async move {
            let accepted = ops::accept(&manager, &me, listener_pfd).await;
            let pack = accepted.pack.unwrap();
            let new_pfd = pack.new_pfd.expect("accept should succeed");

            // The pack hands back a PseudoFd (a table index + generation)
            // in its own slot, distinct from the listener's — never the
            // kernel's raw fd integer directly.
            assert_ne!(new_pfd.index, listener_pfd.index);
            assert!(manager.raw_fd_of(new_pfd).is_some());

            ops::close(&manager, &me, new_pfd).await;
            manager.kill().unwrap();
            0
        }
    });
    manager.register_coro(accept_task);

    // Connect from a second, independent std socket so the kernel has
    // something to accept.
    let _client = std::net::TcpStream::connect(addr).unwrap();

    manager.run().unwrap();
}

#[test]
fn killing_the_manager_cancels_an_in_flight_read() {
    let manager = Rc::new(EventManager::new(EventManagerConfig::default()).unwrap());
    manager.start();

    // A pipe whose read end never has data written to it: the read stays
    // outstanding until shutdown cancels it.
    let mut fds: [i32; 2] = [0; 2];
    assert_eq!(unsafe { libc::pipe(fds.as_mut_ptr()) }, 0);
    let [read_raw_fd, _write_raw_fd] = fds;
    let pipe_pfd = manager.pass_fd_to_event_manager(read_raw_fd, FdType::LocalFile);

    let manager_for_task = manager.clone();
    let stuck_reader = Task::new(move |me| {
        let manager = manager_for_task;
        async move {
            let read = ops::read(&manager, &me, pipe_pfd, 8).await;
            let error = read.pack.and_then(|p| p.error);
            match error {
                Some(uring_tasks::SystemError::Kernel(e)) => assert!(e.is_canceled()),
                other => panic!("expected a canceled kernel error, got {other:?}"),
            }
            0
        }
    });
    manager.register_coro(stuck_reader);

    manager.kill().unwrap();
    manager.run().unwrap();
}
