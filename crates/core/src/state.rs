// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Supervisor state machine: states and the lifecycle transition matrix.

use serde::{Deserialize, Serialize};

/// State of a supervisor instance.
///
/// Exactly one state holds at any instant. `Crashed` is terminal; a
/// `Stopped` supervisor can be restarted through `InitRun`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SupState {
    /// Idle, waiting for input
    Ready,
    /// Managed function executing because of a signal
    Running,
    /// First-time execution, awaiting watch initialization
    InitRun,
    /// Clean shutdown, restartable
    Stopped,
    /// Terminated, non-restartable
    Killed,
    /// Terminal, unrecoverable
    Crashed,
    /// Between backoff and a retry attempt
    WaitRecover,
}

crate::simple_display! {
    SupState {
        Ready => "ready",
        Running => "running",
        InitRun => "init_run",
        Stopped => "stopped",
        Killed => "killed",
        Crashed => "crashed",
        WaitRecover => "wait_recover",
    }
}

impl SupState {
    /// No transition ever leaves this state.
    pub fn is_terminal(self) -> bool {
        matches!(self, SupState::Crashed)
    }

    /// Stopped, killed, or crashed: the supervisor no longer accepts work.
    pub fn is_halted(self) -> bool {
        matches!(self, SupState::Stopped | SupState::Killed | SupState::Crashed)
    }

    /// States in which the supervisor still owns live resources
    /// (watches, pending executions) that cleanup must tear down.
    pub fn is_active(self) -> bool {
        !self.is_halted()
    }
}

/// Verdict for a requested lifecycle transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    /// Transition is valid and should be taken
    Accept,
    /// Benign no-op (same-state request)
    Ignore,
    /// Invalid edge; recorded as a fault
    Reject,
}

/// The lifecycle transition matrix.
///
/// Only consulted for `LifecycleSig` reduction. `Ready -> Running` is
/// rejected here because that edge belongs to VarSig/UserSig reduction.
pub fn lifecycle_edge(from: SupState, to: SupState) -> Edge {
    use SupState::*;

    // WaitRecover may re-enter itself (another recovery round); every
    // other same-state request is a benign no-op.
    if from == to {
        return if from == WaitRecover { Edge::Accept } else { Edge::Ignore };
    }

    let ok = match from {
        Ready => matches!(to, InitRun | Stopped | Killed | Crashed | WaitRecover),
        Running => matches!(to, Ready | InitRun | Stopped | Killed | Crashed | WaitRecover),
        InitRun => matches!(to, Ready | Running | Stopped | Killed | Crashed | WaitRecover),
        Stopped => matches!(to, InitRun | Killed | Crashed | WaitRecover),
        Killed => matches!(to, Crashed | WaitRecover),
        WaitRecover => matches!(to, InitRun | Crashed),
        Crashed => false,
    };
    if ok {
        Edge::Accept
    } else {
        Edge::Reject
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
