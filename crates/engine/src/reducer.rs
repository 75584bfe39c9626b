// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The reducer task: exclusive owner of state-machine mutations.
//!
//! Blocks on the wake notifier, then drains whatever is selectable in
//! priority order (lifecycle, then user, then variable signals). Each
//! signal is processed atomically: reduce, log, map the transition to
//! an effect, execute it, and consume any follow-up lifecycle signals
//! before touching the queue again.

use crate::commander::decide;
use crate::handler::EffectHandler;
use crate::queue::Mailboxes;
use crate::supervisor::SupervisorShared;
use indexmap::IndexMap;
use std::sync::Arc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use vigil_core::{
    lifecycle_edge, Clock, Edge, Fault, LifecycleSig, SupState, SystemClock, UserSig, VarSig,
    VarValue,
};

/// Outcome of one selection attempt.
enum Step {
    Processed,
    Nothing,
}

pub(crate) struct Reducer {
    shared: Arc<SupervisorShared>,
    boxes: Mailboxes,
    handler: EffectHandler,
    state: SupState,
    state_tx: watch::Sender<SupState>,
    shutdown: CancellationToken,
    clock: SystemClock,
}

impl Reducer {
    pub fn new(
        shared: Arc<SupervisorShared>,
        boxes: Mailboxes,
        handler: EffectHandler,
        state_tx: watch::Sender<SupState>,
        shutdown: CancellationToken,
    ) -> Self {
        Self { shared, boxes, handler, state: SupState::Ready, state_tx, shutdown, clock: SystemClock }
    }

    pub async fn run(mut self) {
        tracing::debug!(watcher = %self.shared.watcher_id, "reducer started");
        loop {
            // Drain before sleeping so signals enqueued before the task
            // was polled are not stranded behind a spent wake pulse.
            while let Step::Processed = self.try_process_one().await {}

            let wake = Arc::clone(&self.boxes.wake);
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    tracing::debug!(watcher = %self.shared.watcher_id, "reducer shutdown");
                    return;
                }
                _ = wake.notified() => {}
            }
        }
    }

    /// Take the highest-priority selectable signal, if any.
    ///
    /// Lifecycle signals are selectable in every non-terminal state;
    /// user signals only in `Ready`; variable signals in `Ready` and
    /// `InitRun`. Unselectable signals stay in their mailboxes.
    async fn try_process_one(&mut self) -> Step {
        if !self.state.is_terminal() {
            if let Ok(sig) = self.boxes.lifecycle.try_recv() {
                self.process_lifecycle_chain(sig).await;
                return Step::Processed;
            }
        }
        if self.state == SupState::Ready {
            if let Ok(sig) = self.boxes.user.try_recv() {
                self.process_user(sig).await;
                return Step::Processed;
            }
        }
        if matches!(self.state, SupState::Ready | SupState::InitRun) {
            if let Ok(sig) = self.boxes.var.try_recv() {
                self.process_var(sig).await;
                return Step::Processed;
            }
        }
        Step::Nothing
    }

    /// Consume a lifecycle signal and any follow-ups the resulting
    /// effects emit. The chain never yields to other signals.
    async fn process_lifecycle_chain(&mut self, first: LifecycleSig) {
        let mut pending = Some(first);
        while let Some(sig) = pending.take() {
            let prev = self.state;
            match lifecycle_edge(prev, sig.target) {
                Edge::Accept => {
                    if sig.target == SupState::InitRun {
                        // A fresh init session starts from an empty store.
                        self.shared.store.clear();
                    }
                    self.set_state(sig.target);
                    self.shared.logger.log_reduce(prev, sig.summary(), self.state, sig.at_ms);
                    if let Some(effect) = decide(prev, self.state) {
                        pending = self.handler.execute(effect).await;
                    }
                }
                Edge::Ignore => {
                    self.shared.logger.log_reduce(
                        prev,
                        format!("{} [ignored]", sig.summary()),
                        prev,
                        sig.at_ms,
                    );
                }
                Edge::Reject => {
                    self.shared.logger.log_fault(
                        Fault::StateTransition {
                            from: prev,
                            to: sig.target,
                            reason: sig.reason.clone(),
                        },
                        sig.at_ms,
                    );
                    self.shared.logger.log_reduce(
                        prev,
                        format!("{} [rejected]", sig.summary()),
                        prev,
                        sig.at_ms,
                    );
                }
            }
        }
    }

    /// User message: overwrite the slot and start a run.
    async fn process_user(&mut self, sig: UserSig) {
        let prev = self.state;
        self.shared.slot.put(sig.message.clone());
        self.set_state(SupState::Running);
        self.shared.logger.log_reduce(prev, "user message", self.state, sig.at_ms);
        self.run_commander(prev, self.state).await;
    }

    /// Variable signal: drain everything pending, apply as one batch,
    /// and run only if an update was accepted.
    async fn process_var(&mut self, head: VarSig) {
        let prev = self.state;
        let at_ms = head.at_ms;

        let mut batch = vec![head];
        while let Ok(sig) = self.boxes.var.try_recv() {
            batch.push(sig);
        }
        let total = batch.len();
        let accepted = self.apply_var_batch(batch);

        let next = match prev {
            SupState::Ready if accepted > 0 => SupState::Running,
            _ => prev,
        };
        self.set_state(next);
        self.shared.logger.log_reduce(
            prev,
            format!("var batch ({total} signals, {accepted} accepted)"),
            next,
            at_ms,
        );

        // Atomic InitRun -> Ready: the synthesized transition runs
        // before the commander sees the original signal.
        if prev == SupState::InitRun
            && self.state == SupState::InitRun
            && self.shared.registry.all_initialized(&self.shared.store)
        {
            let sig = LifecycleSig::new(SupState::Ready, "init complete", self.clock.epoch_ms());
            self.process_lifecycle_chain(sig).await;
        }

        self.run_commander(prev, next).await;
    }

    /// Group drained signals by name and fold each group.
    ///
    /// Flow groups keep only the last signal (its update ignores the
    /// previous value); tick groups apply in arrival order, threading
    /// each result into the next. A failing step is logged and skipped.
    /// Returns the number of names with an accepted change; all results
    /// commit in one batch write.
    fn apply_var_batch(&self, batch: Vec<VarSig>) -> usize {
        let mut groups: IndexMap<String, Vec<VarSig>> = IndexMap::new();
        for sig in batch {
            groups.entry(sig.name.clone()).or_default().push(sig);
        }

        let mut commits: Vec<(String, VarValue)> = Vec::new();
        for (name, sigs) in groups {
            let Some(first) = sigs.first() else { continue };
            let current = self.shared.store.get(&name);

            if first.state_independent {
                let Some(last) = sigs.last() else { continue };
                match (last.update)(current.as_ref()) {
                    Ok(update) if update.changed => commits.push((name, update.value)),
                    Ok(_) => {}
                    Err(err) => {
                        self.shared.logger.log_fault(
                            Fault::Update { name: name.clone(), message: err.to_string() },
                            last.at_ms,
                        );
                    }
                }
                continue;
            }

            let mut value = current;
            let mut changed = false;
            for sig in &sigs {
                match (sig.update)(value.as_ref()) {
                    Ok(update) => {
                        if update.changed {
                            changed = true;
                        }
                        value = Some(update.value);
                    }
                    Err(err) => {
                        self.shared.logger.log_fault(
                            Fault::Update { name: name.clone(), message: err.to_string() },
                            sig.at_ms,
                        );
                    }
                }
            }
            if changed {
                if let Some(value) = value {
                    commits.push((name, value));
                }
            }
        }

        let accepted = commits.len();
        self.shared.store.batch_set(commits);
        accepted
    }

    /// Map a non-lifecycle transition to its effect and consume any
    /// follow-up chain.
    async fn run_commander(&mut self, prev: SupState, next: SupState) {
        if let Some(effect) = decide(prev, next) {
            if let Some(follow) = self.handler.execute(effect).await {
                self.process_lifecycle_chain(follow).await;
            }
        }
    }

    fn set_state(&mut self, next: SupState) {
        if self.state != next {
            tracing::info!(prev = %self.state, next = %next, "state transition");
        }
        self.state = next;
        let _ = self.state_tx.send(next);
    }
}

#[cfg(test)]
#[path = "reducer_tests.rs"]
mod tests;
