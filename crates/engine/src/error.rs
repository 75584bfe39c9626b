// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Errors surfaced by the supervisor facade.

use thiserror::Error;
use vigil_core::SupState;

#[derive(Debug, Error)]
pub enum SupervisorError {
    /// `start` called before `manage`.
    #[error("no managed function registered")]
    NotManaged,

    #[error("supervisor already started")]
    AlreadyStarted,

    /// The supervisor was never started or has halted.
    #[error("supervisor is not running")]
    NotRunning,

    #[error("supervisor already stopped")]
    AlreadyStopped,

    /// Initialization ended in a halted state instead of `Ready`.
    #[error("start failed: supervisor halted in state {0}")]
    StartFailed(SupState),

    /// A watch name was registered twice in one session.
    #[error("watch already registered: {0}")]
    DuplicateWatch(String),

    /// The reducer task is gone; no signal can be delivered.
    #[error("signal queue closed")]
    QueueClosed,
}
