// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Root cancellation context for one supervisor.
//!
//! Watch producers and execution deadlines are children of the current
//! root token, so cancelling it tears the whole tree down. Cleanup
//! rotates in a fresh root (still a child of the construction-time
//! parent) for the next session.

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

pub(crate) struct RootContext {
    parent: CancellationToken,
    current: Mutex<CancellationToken>,
}

impl RootContext {
    pub fn new(parent: CancellationToken) -> Self {
        let current = parent.child_token();
        Self { parent, current: Mutex::new(current) }
    }

    /// Clone of the current root token.
    pub fn current(&self) -> CancellationToken {
        self.current.lock().clone()
    }

    /// Install a fresh root and return the old one (still uncancelled).
    pub fn rotate(&self) -> CancellationToken {
        let fresh = self.parent.child_token();
        std::mem::replace(&mut self.current.lock(), fresh)
    }
}
