// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Effect execution: run, init-run, cleanup, kill, crash, recover.
//!
//! The handler runs synchronously inside the reducer task; only the
//! managed function itself is spawned, so its deadline stays
//! enforceable. Each handler call may return a follow-up lifecycle
//! signal which the reducer consumes before any queued signal.

use crate::commander::Effect;
use crate::context::ExecContext;
use crate::supervisor::SupervisorShared;
use futures_util::future::BoxFuture;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinError;
use vigil_core::{Clock, EffectKind, LifecycleSig, RunError, SupState, SystemClock, UserMessage};

/// Boxed managed (or cleanup) function.
pub(crate) type ManagedFn =
    Arc<dyn Fn(Arc<ExecContext>) -> BoxFuture<'static, Result<(), RunError>> + Send + Sync>;

/// Hard cap on the user cleanup function.
const CLEANUP_TIMEOUT: Duration = Duration::from_secs(300);

pub(crate) struct EffectHandler {
    shared: Arc<SupervisorShared>,
    ctx: Arc<ExecContext>,
    managed: ManagedFn,
    cleanup: Option<ManagedFn>,
    clock: SystemClock,
}

impl EffectHandler {
    pub fn new(
        shared: Arc<SupervisorShared>,
        ctx: Arc<ExecContext>,
        managed: ManagedFn,
        cleanup: Option<ManagedFn>,
    ) -> Self {
        Self { shared, ctx, managed, cleanup, clock: SystemClock }
    }

    /// Execute one effect; an optional follow-up signal continues the
    /// transition chain.
    pub async fn execute(&self, effect: Effect) -> Option<LifecycleSig> {
        tracing::debug!(effect = effect.name(), "executing effect");
        match effect {
            Effect::Run => self.run_script().await,
            Effect::InitRun => self.init_run_script().await,
            Effect::Cleanup { target } => self.clear_run_script(target).await,
            Effect::Kill => {
                self.log(EffectKind::Kill, true, None);
                Some(self.sig(SupState::Killed, "kill requested"))
            }
            Effect::Crash => {
                self.log(EffectKind::Crash, true, None);
                Some(self.sig(SupState::Crashed, "crash requested"))
            }
            Effect::Recover => self.recover().await,
        }
    }

    /// Run the managed function for a signal.
    async fn run_script(&self) -> Option<LifecycleSig> {
        let message = self.shared.slot.consume();
        let outcome = self.invoke_managed(message).await;
        self.route_outcome(EffectKind::Run, outcome)
    }

    /// Two-phase initialization.
    ///
    /// Phase 1 invokes the managed function once with no message so it
    /// declares its watches; a `VarNotInitialized` return is expected.
    /// Phase 2 reports `Ready` only when no initialization remains; if
    /// watches are still warming up, the reducer synthesizes the
    /// `Ready` transition as the last variable arrives.
    async fn init_run_script(&self) -> Option<LifecycleSig> {
        match self.invoke_managed(None).await {
            Ok(()) => self.log(EffectKind::InitRun, true, None),
            Err(RunError::VarNotInitialized(name)) => {
                self.log(EffectKind::InitRun, true, Some(format!("awaiting variable {name}")));
            }
            Err(RunError::Stop(reason)) => {
                self.log(EffectKind::InitRun, true, Some(format!("stop requested: {reason}")));
                return Some(self.sig(SupState::Stopped, reason));
            }
            Err(RunError::Kill(reason)) => {
                self.log(EffectKind::InitRun, true, Some(format!("kill requested: {reason}")));
                return Some(self.sig(SupState::Killed, reason));
            }
            Err(err @ RunError::Crash { .. }) => {
                let reason = err.to_string();
                self.log(EffectKind::InitRun, true, Some(reason.clone()));
                return Some(self.sig(SupState::Crashed, reason));
            }
            Err(err) => {
                self.log(EffectKind::InitRun, false, Some(err.to_string()));
                return Some(self.failure_policy());
            }
        }

        if self.shared.registry.is_empty() {
            return Some(self.sig(SupState::Ready, "init complete (no watches)"));
        }
        if self.shared.registry.all_initialized(&self.shared.store) {
            return Some(self.sig(SupState::Ready, "init complete"));
        }
        // Remain in InitRun; incoming VarSigs finish the job.
        None
    }

    /// Tear down the session and run the user cleanup, then land in
    /// `target`.
    async fn clear_run_script(&self, target: SupState) -> Option<LifecycleSig> {
        // Cancelling the old root ends every watch producer and any
        // in-flight execution deadline; the fresh root hosts cleanup
        // and any later restart.
        let old_root = self.shared.root.rotate();
        old_root.cancel();
        self.shared.registry.clear();

        if let Some(cleanup) = &self.cleanup {
            let token = self.shared.root.current().child_token();
            self.ctx.begin_cleanup(token.clone());
            let task = tokio::spawn((cleanup)(Arc::clone(&self.ctx)));
            let outcome = match tokio::time::timeout(CLEANUP_TIMEOUT, task).await {
                Ok(joined) => flatten_join(joined),
                Err(_) => {
                    token.cancel();
                    Err(RunError::failure(format!(
                        "cleanup timed out after {}s",
                        CLEANUP_TIMEOUT.as_secs()
                    )))
                }
            };
            match outcome {
                Ok(()) => self.log(EffectKind::Cleanup, true, None),
                Err(err) => self.log(EffectKind::Cleanup, false, Some(err.to_string())),
            }
        } else {
            self.log(EffectKind::Cleanup, true, None);
        }

        self.shared.cleanup_done.complete();
        Some(self.sig(target, "cleanup complete"))
    }

    /// Count the failure run, then either crash out or back off and
    /// retry through `InitRun`.
    async fn recover(&self) -> Option<LifecycleSig> {
        let policy = &self.shared.config.recovery;
        let failures = self.shared.logger.consecutive_run_failures();
        if failures >= policy.max_consecutive_failures {
            self.log(EffectKind::Recover, false, Some("max consecutive failures".into()));
            return Some(self.sig(
                SupState::Crashed,
                format!("{failures} consecutive failures (max {})", policy.max_consecutive_failures),
            ));
        }

        let attempt = failures.saturating_sub(policy.min_consecutive_failures);
        let delay = policy.retry_delay(attempt);
        self.log(EffectKind::Recover, true, None);
        tracing::info!(failures, delay_ms = delay.as_millis() as u64, "recovery backoff");
        tokio::time::sleep(delay).await;
        Some(self.sig(SupState::InitRun, "recovery attempt"))
    }

    /// Invoke the managed function in its own task with a fresh child
    /// deadline. The deadline wins races against completion.
    async fn invoke_managed(&self, message: Option<UserMessage>) -> Result<(), RunError> {
        let run_token = self.shared.root.current().child_token();
        self.ctx.begin_run(run_token.clone(), message);

        let timeout = self.shared.config.default_timeout;
        let task = tokio::spawn((self.managed)(Arc::clone(&self.ctx)));
        tokio::select! {
            biased;
            _ = tokio::time::sleep(timeout) => {
                // The task may outlive this decision, but its context
                // is cancelled so cooperating calls inside abort.
                run_token.cancel();
                Err(RunError::failure(format!(
                    "execution timed out after {}ms",
                    timeout.as_millis()
                )))
            }
            joined = task => flatten_join(joined),
        }
    }

    /// Map an execution outcome to the follow-up lifecycle signal.
    fn route_outcome(&self, kind: EffectKind, outcome: Result<(), RunError>) -> Option<LifecycleSig> {
        match outcome {
            Ok(()) => {
                self.log(kind, true, None);
                Some(self.sig(SupState::Ready, "ok"))
            }
            Err(RunError::Stop(reason)) => {
                self.log(kind, true, Some(format!("stop requested: {reason}")));
                Some(self.sig(SupState::Stopped, reason))
            }
            Err(RunError::Kill(reason)) => {
                self.log(kind, true, Some(format!("kill requested: {reason}")));
                Some(self.sig(SupState::Killed, reason))
            }
            Err(err @ RunError::Crash { .. }) => {
                let reason = err.to_string();
                self.log(kind, true, Some(reason.clone()));
                Some(self.sig(SupState::Crashed, reason))
            }
            Err(err) => {
                self.log(kind, false, Some(err.to_string()));
                Some(self.failure_policy())
            }
        }
    }

    /// Suppression below the minimum, `WaitRecover` at or above.
    ///
    /// The failing result is already in the log, so the count includes
    /// the current failure. Suppression does not sleep: the next
    /// incoming signal paces the retry.
    fn failure_policy(&self) -> LifecycleSig {
        let policy = &self.shared.config.recovery;
        let failures = self.shared.logger.consecutive_run_failures();
        if failures < policy.min_consecutive_failures {
            self.sig(
                SupState::Ready,
                format!("failure suppressed ({failures}/{})", policy.min_consecutive_failures),
            )
        } else {
            self.sig(SupState::WaitRecover, format!("{failures} consecutive failures"))
        }
    }

    fn log(&self, kind: EffectKind, success: bool, error: Option<String>) {
        self.shared.logger.log_effect(kind, success, error, self.clock.epoch_ms());
    }

    fn sig(&self, target: SupState, reason: impl Into<String>) -> LifecycleSig {
        LifecycleSig::new(target, reason, self.clock.epoch_ms())
    }
}

/// Collapse a join result, turning panics into ordinary failures.
fn flatten_join(joined: Result<Result<(), RunError>, JoinError>) -> Result<(), RunError> {
    match joined {
        Ok(outcome) => outcome,
        Err(err) if err.is_panic() => Err(RunError::failure(panic_message(err))),
        Err(_) => Err(RunError::failure("execution task cancelled")),
    }
}

fn panic_message(err: JoinError) -> String {
    let payload = err.into_panic();
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panic: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panic: {s}")
    } else {
        "panic: <non-string payload>".to_string()
    }
}

#[cfg(test)]
#[path = "handler_tests.rs"]
mod tests;
