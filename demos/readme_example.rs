// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Write a handful of bytes to a temp file through the ring, then read
//! them straight back. The smallest possible task body: one `open_at`,
//! one `write`, one `read`, one `close`.

use std::rc::Rc;

use uring_tasks::{
    awaitable::ops, config::EventManagerConfig, pfd::FdType, task::Task, EventManager,
};

fn main() {
    uring_tasks::logging::init();

    let manager = Rc::new(EventManager::new(EventManagerConfig::default()).expect("ring init"));
    manager.start();

    let cwd_pfd = manager.pass_fd_to_event_manager(libc::AT_FDCWD, FdType::LocalFile);
    let path = std::env::temp_dir().join("uring_tasks_readme_example.txt");
    let open_path = std::ffi::CString::new(path.to_str().unwrap()).unwrap();

    let manager_for_task = manager.clone();
    let task = Task::new(move |me| {
        let manager = manager_for_task;
        async move {
            let opened = ops::open_at(
                &manager,
                &me,
                cwd_pfd,
                open_path,
                libc::O_CREAT | libc::O_RDWR | libc::O_TRUNC,
                0o644,
            )
            .await;
            let Some(file_pfd) = opened.pack.and_then(|p| p.new_pfd) else {
                eprintln!("open_at failed: {:?}", opened.submission_error);
                manager.kill().ok();
                return 1;
            };

            let written = ops::write(&manager, &me, file_pfd, b"hello io_uring\n".to_vec()).await;
            println!("wrote {} bytes", written.pack.map_or(0, |p| p.bytes_written));

            let read_back = ops::read(&manager, &me, file_pfd, 64).await;
            if let Some(pack) = read_back.pack {
                println!("read back: {:?}", String::from_utf8_lossy(&pack.buf));
            }

            ops::close(&manager, &me, file_pfd).await;
            manager.kill().ok();
            0
        }
    });
    manager.register_coro(task);

    manager.run().expect("event loop");
}
