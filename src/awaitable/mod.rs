// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! The generic per-operation awaitable.
//!
//! One shape handles every opcode: on first poll, submit the request and
//! suspend; on the next poll (the driver having deposited a response on
//! this task's channel and resumed it), consume the response and resolve.
//! The per-opcode surface in [`ops`] only supplies the parameter pack and
//! the function that pulls the right variant back out of
//! [`crate::response::ResponsePack`].

pub mod ops;

use std::{
    future::Future,
    pin::Pin,
    rc::Rc,
    task::{Context, Poll},
};

use crate::{
    manager::EventManager,
    pfd::PseudoFd,
    request::{Opcode, RequestParams},
    response::{IoResponse, ResponsePack},
    task::Task,
};

pub struct IoAwaitable<Pack> {
    manager: Rc<EventManager>,
    me: Task,
    pfd: PseudoFd,
    opcode: Opcode,
    params: Option<RequestParams>,
    extract: fn(ResponsePack) -> Pack,
}

impl<Pack> IoAwaitable<Pack> {
    pub fn new(
        manager: Rc<EventManager>,
        me: Task,
        pfd: PseudoFd,
        params: RequestParams,
        extract: fn(ResponsePack) -> Pack,
    ) -> Self {
        let opcode = params.opcode();
        IoAwaitable { manager, me, pfd, opcode, params: Some(params), extract }
    }
}

impl<Pack> Future for IoAwaitable<Pack> {
    type Output = IoResponse<Pack>;

    fn poll(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();

        if let Some(params) = this.params.take() {
            let error = this.manager.submit_request(this.me.clone(), this.pfd, params);
            return if error.is_ok() {
                Poll::Pending
            } else {
                Poll::Ready(IoResponse::submission_failed(error))
            };
        }

        let opcode = this.opcode;
        match this.me.with_channel(|c| c.consume_response(opcode)) {
            Some(pack) => Poll::Ready(IoResponse::completed((this.extract)(pack))),
            // Resumed for a reason other than our own response landing
            // (shouldn't happen given one outstanding op per task, but
            // cheap to tolerate): stay suspended.
            None => Poll::Pending,
        }
    }
}
