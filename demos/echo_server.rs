// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! A tiny echo server: one root task loops on `accept`, and spawns one
//! child task per connection that reads, writes the same bytes back, and
//! closes. Exits after serving a fixed number of connections so it can
//! run unattended as a demo rather than forever.

use std::{os::fd::AsRawFd, rc::Rc};

use uring_tasks::{awaitable::ops, config::EventManagerConfig, pfd::FdType, task::Task, EventManager};

const CONNECTIONS_TO_SERVE: u32 = 3;

fn main() {
    uring_tasks::logging::init();

    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("local_addr");
    println!("echo server listening on {addr}");

    let manager = Rc::new(EventManager::new(EventManagerConfig::default()).expect("ring init"));
    manager.start();

    let listener_pfd = manager.pass_fd_to_event_manager(listener.as_raw_fd(), FdType::NetworkSocket);

    let manager_for_task = manager.clone();
    let accept_loop = Task::new(move |me| {
        let manager = manager_for_task;
        async move {
            for _ in 0..CONNECTIONS_TO_SERVE {
                let accepted = ops::accept(&manager, &me, listener_pfd).await;
                let Some(conn_pfd) = accepted.pack.and_then(|p| p.new_pfd) else {
                    eprintln!("accept failed: {:?}", accepted.submission_error);
                    continue;
                };

                let manager = manager.clone();
                let conn_task = Task::new(move |me| {
                    let manager = manager;
                    async move {
                        let read = ops::read(&manager, &me, conn_pfd, 4096).await;
                        if let Some(pack) = read.pack {
                            if pack.bytes_read > 0 {
                                let _ = ops::write(&manager, &me, conn_pfd, pack.buf).await;
                            }
                        }
                        ops::close_pfd_gracefully(&manager, &me, conn_pfd).await;
                        0
                    }
                });
                manager.register_coro(conn_task);
            }
            manager.kill().ok();
            0
        }
    });
    manager.register_coro(accept_loop);

    // Keep `listener`'s fd open for the duration of the run; the ring
    // operates on the raw fd directly and never takes ownership of it.
    manager.run().expect("event loop");
    drop(listener);
}
