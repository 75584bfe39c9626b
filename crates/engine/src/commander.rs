// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pure mapping from state transitions to effects.

use serde::Serialize;
use vigil_core::{EffectKind, SupState};

/// A side-effecting action the handler performs in response to a
/// state transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Effect {
    /// Run the managed function for a signal
    Run,
    /// First-time run awaiting watch initialization
    InitRun,
    /// Tear down watches and executions, run the user cleanup, then
    /// land in `target`
    Cleanup { target: SupState },
    /// Terminate without cleanup (already cleaned up)
    Kill,
    /// Crash without cleanup (already cleaned up)
    Crash,
    /// Count failures, back off, and retry (or crash out)
    Recover,
}

impl Effect {
    pub fn name(&self) -> &'static str {
        match self {
            Effect::Run => "run",
            Effect::InitRun => "init_run",
            Effect::Cleanup { .. } => "cleanup",
            Effect::Kill => "kill",
            Effect::Crash => "crash",
            Effect::Recover => "recover",
        }
    }

    /// Tag recorded in the effect-result log.
    pub fn kind(&self) -> EffectKind {
        match self {
            Effect::Run => EffectKind::Run,
            Effect::InitRun => EffectKind::InitRun,
            Effect::Cleanup { .. } => EffectKind::Cleanup,
            Effect::Kill => EffectKind::Kill,
            Effect::Crash => EffectKind::Crash,
            Effect::Recover => EffectKind::Recover,
        }
    }
}

/// Decide the effect for an accepted transition `prev -> next`.
///
/// Pure; returns `None` for transitions with no side effect (e.g.
/// `Running -> Ready`).
pub(crate) fn decide(prev: SupState, next: SupState) -> Option<Effect> {
    use SupState::*;
    match (prev, next) {
        (Ready | InitRun, Running) => Some(Effect::Run),
        (prev, InitRun) if prev != InitRun => Some(Effect::InitRun),
        // Halting from an active state runs cleanup first.
        (Ready | Running | InitRun | WaitRecover, Stopped | Killed | Crashed) => {
            Some(Effect::Cleanup { target: next })
        }
        (Stopped, Killed) => Some(Effect::Kill),
        (Stopped | Killed, Crashed) => Some(Effect::Crash),
        (_, WaitRecover) => Some(Effect::Recover),
        _ => None,
    }
}

#[cfg(test)]
#[path = "commander_tests.rs"]
mod tests;
