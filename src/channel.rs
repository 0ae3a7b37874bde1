// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! The per-task request/response rendezvous.
//!
//! Each direction holds at most one opcode-tagged value at a time:
//! `Option<(Opcode, RequestParams)>` / `Option<(Opcode, ResponsePack)>`. A
//! task publishes a request and suspends; the driver consumes it, performs
//! the operation, and publishes a response for the task to consume on
//! resumption.

use crate::{request::{Opcode, RequestParams}, response::ResponsePack};

/// A single-slot-per-direction mailbox between a running task and its
/// driver. Never accessed concurrently: the channel lives inside a task
/// that is either currently running (so only it touches the channel) or
/// suspended (so only the driver touches it).
#[derive(Debug, Default)]
pub struct CommunicationChannel {
    request: Option<(Opcode, RequestParams)>,
    response: Option<(Opcode, ResponsePack)>,
}

impl CommunicationChannel {
    #[must_use]
    pub fn new() -> Self {
        CommunicationChannel { request: None, response: None }
    }

    /// Stores a request, overwriting any previous unread one.
    pub fn publish_request(&mut self, opcode: Opcode, params: RequestParams) {
        self.request = Some((opcode, params));
    }

    /// Removes and returns the stored request if its opcode matches;
    /// otherwise leaves the slot untouched and returns `None`.
    pub fn consume_request(&mut self, opcode: Opcode) -> Option<RequestParams> {
        match &self.request {
            Some((stored_opcode, _)) if *stored_opcode == opcode => {
                self.request.take().map(|(_, params)| params)
            }
            _ => None,
        }
    }

    #[must_use]
    pub fn current_request_opcode(&self) -> Option<Opcode> {
        self.request.as_ref().map(|(op, _)| *op)
    }

    pub fn publish_response(&mut self, opcode: Opcode, pack: ResponsePack) {
        self.response = Some((opcode, pack));
    }

    /// Removes and returns the stored response if its opcode matches.
    /// A mismatch returns `None` and leaves the slot populated rather than
    /// clearing it, so a later call with the right opcode can still claim
    /// it.
    pub fn consume_response(&mut self, opcode: Opcode) -> Option<ResponsePack> {
        match &self.response {
            Some((stored_opcode, _)) if *stored_opcode == opcode => {
                self.response.take().map(|(_, pack)| pack)
            }
            _ => None,
        }
    }

    #[must_use]
    pub fn current_response_opcode(&self) -> Option<Opcode> {
        self.response.as_ref().map(|(op, _)| *op)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::ReadParams;

    #[test]
    fn publish_then_consume_clears_the_slot() {
        let mut channel = CommunicationChannel::new();
        channel.publish_request(
            Opcode::Write,
            RequestParams::Write(crate::request::WriteParams { fd: 7, buf: vec![1, 2, 3] }),
        );

        assert!(channel.consume_request(Opcode::Read).is_none());
        let got = channel.consume_request(Opcode::Write);
        assert!(matches!(got, Some(RequestParams::Write(ref w)) if w.fd == 7 && w.buf.len() == 3));
        assert!(channel.consume_request(Opcode::Write).is_none());
    }

    #[test]
    fn mismatched_opcode_leaves_the_slot_populated() {
        let mut channel = CommunicationChannel::new();
        channel.publish_request(
            Opcode::Read,
            RequestParams::Read(ReadParams { fd: 1, len: 8 }),
        );
        assert!(channel.consume_request(Opcode::Write).is_none());
        assert_eq!(channel.current_request_opcode(), Some(Opcode::Read));
        assert!(channel.consume_request(Opcode::Read).is_some());
    }
}
