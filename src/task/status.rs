// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! The status cell: the one piece of task state that external observers may
//! still want to read after the task's own future has dropped.
//!
//! [`crate::task::Task`] holds its [`TaskStatus`] behind an `Rc`, so any
//! clone of the task handle — in particular the one embedded in an
//! in-flight [`crate::request::RequestData`] — keeps the cell alive for as
//! long as it needs to be read, with no dangling-pointer case to guard
//! against.

#[derive(Debug, Clone, Copy, Default)]
pub struct TaskStatus {
    pub done: bool,
    pub return_code: i64,
}
