// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Prioritized signal mailboxes and the wake notifier.
//!
//! One bounded FIFO per signal variant. Enqueue to a full mailbox
//! suspends the sender; a signal is never dropped. Every enqueue pulses
//! the shared [`Notify`]. The pulse is lossy and only a hint: the
//! reducer drains all mailboxes whenever it wakes.

use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::sync::Notify;
use vigil_core::{LifecycleSig, Signal, UserSig, VarSig};

/// Sender half, cloned into producers and the facade.
#[derive(Clone)]
pub(crate) struct SignalQueue {
    var_tx: mpsc::Sender<VarSig>,
    user_tx: mpsc::Sender<UserSig>,
    lifecycle_tx: mpsc::Sender<LifecycleSig>,
    wake: Arc<Notify>,
}

/// Receiver half, owned by the reducer task.
pub(crate) struct Mailboxes {
    pub var: mpsc::Receiver<VarSig>,
    pub user: mpsc::Receiver<UserSig>,
    pub lifecycle: mpsc::Receiver<LifecycleSig>,
    pub wake: Arc<Notify>,
}

/// The reducer is gone; the signal could not be delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct QueueClosed;

pub(crate) fn signal_queue(capacity: usize) -> (SignalQueue, Mailboxes) {
    let capacity = capacity.max(1);
    let (var_tx, var_rx) = mpsc::channel(capacity);
    let (user_tx, user_rx) = mpsc::channel(capacity);
    let (lifecycle_tx, lifecycle_rx) = mpsc::channel(capacity);
    let wake = Arc::new(Notify::new());
    (
        SignalQueue { var_tx, user_tx, lifecycle_tx, wake: Arc::clone(&wake) },
        Mailboxes { var: var_rx, user: user_rx, lifecycle: lifecycle_rx, wake },
    )
}

impl SignalQueue {
    /// Route a signal to the mailbox of its variant.
    pub async fn send(&self, signal: Signal) -> Result<(), QueueClosed> {
        match signal {
            Signal::Var(sig) => self.send_var(sig).await,
            Signal::User(sig) => self.send_user(sig).await,
            Signal::Lifecycle(sig) => self.send_lifecycle(sig).await,
        }
    }

    pub async fn send_var(&self, sig: VarSig) -> Result<(), QueueClosed> {
        self.var_tx.send(sig).await.map_err(|_| QueueClosed)?;
        self.wake.notify_one();
        Ok(())
    }

    pub async fn send_user(&self, sig: UserSig) -> Result<(), QueueClosed> {
        self.user_tx.send(sig).await.map_err(|_| QueueClosed)?;
        self.wake.notify_one();
        Ok(())
    }

    pub async fn send_lifecycle(&self, sig: LifecycleSig) -> Result<(), QueueClosed> {
        self.lifecycle_tx.send(sig).await.map_err(|_| QueueClosed)?;
        self.wake.notify_one();
        Ok(())
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
