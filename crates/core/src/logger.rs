// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded in-memory logs for observability and failure-history lookups.
//!
//! Three ring buffers, each capped at `max_log_entries`: reduce actions,
//! effect results, and faults. The effect-result stream doubles as the
//! failure history the recovery policy counts against.

use crate::state::SupState;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::VecDeque;

/// Tag for an executed effect, recorded with its outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectKind {
    Run,
    InitRun,
    Cleanup,
    Kill,
    Crash,
    Recover,
}

crate::simple_display! {
    EffectKind {
        Run => "run",
        InitRun => "init_run",
        Cleanup => "cleanup",
        Kill => "kill",
        Crash => "crash",
        Recover => "recover",
    }
}

/// One processed signal: `prev -> next` with a one-line signal summary.
#[derive(Debug, Clone, Serialize)]
pub struct ReduceRecord {
    pub at_ms: u64,
    pub prev: SupState,
    pub signal: String,
    pub next: SupState,
}

/// Outcome of one executed effect.
#[derive(Debug, Clone, Serialize)]
pub struct EffectRecord {
    pub at_ms: u64,
    pub kind: EffectKind,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Recoverable faults: logged, never fatal.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case", tag = "fault")]
pub enum Fault {
    /// A lifecycle signal requested an invalid edge.
    StateTransition { from: SupState, to: SupState, reason: String },
    /// A watch producer failed (e.g. its factory errored); retried on
    /// the next tick.
    Watch { name: String, phase: &'static str, message: String },
    /// An update function failed; that step is skipped.
    Update { name: String, message: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct FaultRecord {
    pub at_ms: u64,
    #[serde(flatten)]
    pub fault: Fault,
}

pub struct SupLogger {
    cap: usize,
    reduces: Mutex<VecDeque<ReduceRecord>>,
    effects: Mutex<VecDeque<EffectRecord>>,
    faults: Mutex<VecDeque<FaultRecord>>,
}

impl SupLogger {
    pub fn new(cap: usize) -> Self {
        let cap = cap.max(1);
        Self {
            cap,
            reduces: Mutex::new(VecDeque::with_capacity(cap.min(64))),
            effects: Mutex::new(VecDeque::with_capacity(cap.min(64))),
            faults: Mutex::new(VecDeque::with_capacity(cap.min(64))),
        }
    }

    pub fn log_reduce(&self, prev: SupState, signal: impl Into<String>, next: SupState, at_ms: u64) {
        let signal = signal.into();
        tracing::debug!(prev = %prev, next = %next, signal = %signal, "reduce");
        push_capped(&mut self.reduces.lock(), self.cap, ReduceRecord { at_ms, prev, signal, next });
    }

    pub fn log_effect(&self, kind: EffectKind, success: bool, error: Option<String>, at_ms: u64) {
        match &error {
            Some(err) if !success => tracing::warn!(effect = %kind, error = %err, "effect failed"),
            Some(err) => tracing::info!(effect = %kind, note = %err, "effect completed"),
            None => tracing::debug!(effect = %kind, "effect completed"),
        }
        push_capped(&mut self.effects.lock(), self.cap, EffectRecord { at_ms, kind, success, error });
    }

    pub fn log_fault(&self, fault: Fault, at_ms: u64) {
        match &fault {
            Fault::StateTransition { from, to, reason } => {
                tracing::warn!(from = %from, to = %to, reason = %reason, "invalid transition");
            }
            Fault::Watch { name, phase, message } => {
                tracing::warn!(watch = %name, phase, error = %message, "watch fault");
            }
            Fault::Update { name, message } => {
                tracing::warn!(var = %name, error = %message, "update fault");
            }
        }
        push_capped(&mut self.faults.lock(), self.cap, FaultRecord { at_ms, fault });
    }

    /// Last `n` reduce records, oldest first.
    pub fn recent_reduces(&self, n: usize) -> Vec<ReduceRecord> {
        recent(&self.reduces.lock(), n)
    }

    pub fn recent_effects(&self, n: usize) -> Vec<EffectRecord> {
        recent(&self.effects.lock(), n)
    }

    pub fn recent_faults(&self, n: usize) -> Vec<FaultRecord> {
        recent(&self.faults.lock(), n)
    }

    pub fn reduce_count(&self) -> usize {
        self.reduces.lock().len()
    }

    /// Length of the trailing run of failed execution results.
    ///
    /// Only `Run` and `InitRun` records participate: other effect kinds
    /// are skipped, and the count stops at the first successful
    /// execution. This is the `N` of the recovery policy.
    pub fn consecutive_run_failures(&self) -> u32 {
        let effects = self.effects.lock();
        let mut n = 0;
        for record in effects.iter().rev() {
            match record.kind {
                EffectKind::Run | EffectKind::InitRun => {
                    if record.success {
                        break;
                    }
                    n += 1;
                }
                _ => {}
            }
        }
        n
    }
}

fn push_capped<T>(buf: &mut VecDeque<T>, cap: usize, record: T) {
    if buf.len() == cap {
        buf.pop_front();
    }
    buf.push_back(record);
}

fn recent<T: Clone>(buf: &VecDeque<T>, n: usize) -> Vec<T> {
    let skip = buf.len().saturating_sub(n);
    buf.iter().skip(skip).cloned().collect()
}

#[cfg(test)]
#[path = "logger_tests.rs"]
mod tests;
