//! FIFO message queue.
//!
//! Not synchronized on its own: it lives inside the relay's single guarded
//! core next to the lifecycle state, so one lock covers both.

use crate::message::Message;
use std::collections::VecDeque;

#[derive(Debug, Default)]
pub struct MessageQueue {
    messages: VecDeque<Message>,
    next_seq: u64,
}

impl MessageQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `text` at the tail and returns its sequence number.
    pub fn push(&mut self, text: String) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.messages.push_back(Message::new(seq, text));
        seq
    }

    pub fn pop(&mut self) -> Option<Message> {
        self.messages.pop_front()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Total number of messages ever pushed.
    pub fn enqueued(&self) -> u64 {
        self.next_seq
    }
}
