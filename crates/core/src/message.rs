// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! User message and the single pending-message slot.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// A message submitted by the user for the managed function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserMessage {
    pub content: String,
    /// Set once the handler has handed the message to an execution.
    pub consumed: bool,
    pub received_at_ms: u64,
}

impl UserMessage {
    pub fn new(content: impl Into<String>, received_at_ms: u64) -> Self {
        Self { content: content.into(), consumed: false, received_at_ms }
    }
}

/// At most one pending message.
///
/// `put` supersedes any previous un-consumed message; `consume` marks
/// the message consumed and leaves the slot empty.
#[derive(Default)]
pub struct MessageSlot {
    inner: Mutex<Option<UserMessage>>,
}

impl MessageSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&self, message: UserMessage) {
        let mut slot = self.inner.lock();
        if let Some(old) = slot.replace(message) {
            tracing::debug!(received_at_ms = old.received_at_ms, "pending message superseded");
        }
    }

    pub fn consume(&self) -> Option<UserMessage> {
        let mut message = self.inner.lock().take()?;
        message.consumed = true;
        Some(message)
    }

    /// Non-destructive read (status surfaces).
    pub fn peek(&self) -> Option<UserMessage> {
        self.inner.lock().clone()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_none()
    }
}

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;
