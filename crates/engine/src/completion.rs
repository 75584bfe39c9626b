// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! One-shot close-on-arrival completion event.
//!
//! `Start`/`Stop` wait on these; completing is idempotent and waking is
//! level-triggered, so a waiter that arrives after completion returns
//! immediately.

use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Notify;

#[derive(Default)]
pub(crate) struct Completion {
    done: AtomicBool,
    notify: Notify,
}

impl Completion {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the event complete and wake every current waiter.
    pub fn complete(&self) {
        if !self.done.swap(true, Ordering::Release) {
            self.notify.notify_waiters();
        }
    }

    pub fn is_complete(&self) -> bool {
        self.done.load(Ordering::Acquire)
    }

    /// Wait until [`complete`](Self::complete) has been called.
    pub async fn wait(&self) {
        let mut notified = std::pin::pin!(self.notify.notified());
        loop {
            if self.is_complete() {
                return;
            }
            // Register interest before the re-check so a complete()
            // racing between check and await cannot be missed.
            notified.as_mut().enable();
            if self.is_complete() {
                return;
            }
            notified.as_mut().await;
            notified.set(self.notify.notified());
        }
    }
}

#[cfg(test)]
#[path = "completion_tests.rs"]
mod tests;
