// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Public facade: construction, `manage`, `start`/`stop`, messaging,
//! and status accessors.

use crate::completion::Completion;
use crate::context::ExecContext;
use crate::error::SupervisorError;
use crate::handler::{EffectHandler, ManagedFn};
use crate::memo::MemoCache;
use crate::queue::{signal_queue, Mailboxes, SignalQueue};
use crate::reducer::Reducer;
use crate::root::RootContext;
use crate::watch::WatchRegistry;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use vigil_core::{
    Clock, LifecycleSig, MessageSlot, RunError, Signal, SupLogger, SupState, SupervisorConfig,
    SystemClock, UserSig, VarStore, WatcherId,
};

/// State shared between the facade, the reducer/handler, watch
/// producers, and the execution context.
pub(crate) struct SupervisorShared {
    pub(crate) config: SupervisorConfig,
    pub(crate) env: Arc<HashMap<String, String>>,
    pub(crate) store: VarStore,
    pub(crate) slot: MessageSlot,
    pub(crate) memo: MemoCache,
    pub(crate) registry: WatchRegistry,
    pub(crate) logger: Arc<SupLogger>,
    pub(crate) root: RootContext,
    pub(crate) queue: SignalQueue,
    pub(crate) cleanup_done: Completion,
    pub(crate) watcher_id: WatcherId,
}

/// Serializable snapshot of a supervisor's condition.
#[derive(Debug, Clone, Serialize)]
pub struct StatusSummary {
    pub watcher_id: WatcherId,
    pub name: String,
    pub state: SupState,
    pub watch_names: Vec<String>,
    pub consecutive_failures: u32,
    pub pending_message: bool,
    pub memo_entries: usize,
    /// Whether session teardown has already run.
    pub cleaned_up: bool,
}

/// A reactive execution supervisor for one managed function.
pub struct Supervisor {
    shared: Arc<SupervisorShared>,
    name: String,
    managed: Option<ManagedFn>,
    cleanup: Option<ManagedFn>,
    mailboxes: Mutex<Option<Mailboxes>>,
    state_tx: Mutex<Option<watch::Sender<SupState>>>,
    state_rx: watch::Receiver<SupState>,
    shutdown: CancellationToken,
    started: AtomicBool,
    reducer_task: Mutex<Option<JoinHandle<()>>>,
    clock: SystemClock,
}

impl Supervisor {
    pub fn new(config: SupervisorConfig, env: HashMap<String, String>) -> Self {
        Self::with_parent(config, env, CancellationToken::new())
    }

    /// Construct under a parent cancellation token: cancelling the
    /// parent tears down watches and the reducer task.
    pub fn with_parent(
        config: SupervisorConfig,
        env: HashMap<String, String>,
        parent: CancellationToken,
    ) -> Self {
        let watcher_id = WatcherId::new();
        let (queue, mailboxes) = signal_queue(config.signal_chan_capacity);
        let logger = Arc::new(SupLogger::new(config.max_log_entries));
        let registry = WatchRegistry::new(queue.clone(), Arc::clone(&logger));
        let memo = MemoCache::new(config.max_memo_entries);
        let root = RootContext::new(parent.clone());
        let (state_tx, state_rx) = watch::channel(SupState::Ready);

        let shared = Arc::new(SupervisorShared {
            config,
            env: Arc::new(env),
            store: VarStore::new(),
            slot: MessageSlot::new(),
            memo,
            registry,
            logger,
            root,
            queue,
            cleanup_done: Completion::new(),
            watcher_id,
        });

        tracing::info!(watcher = %watcher_id, "supervisor constructed");
        Self {
            shared,
            name: String::new(),
            managed: None,
            cleanup: None,
            mailboxes: Mutex::new(Some(mailboxes)),
            state_tx: Mutex::new(Some(state_tx)),
            state_rx,
            shutdown: parent.child_token(),
            started: AtomicBool::new(false),
            reducer_task: Mutex::new(None),
            clock: SystemClock,
        }
    }

    /// Register the managed function. Must precede [`start`](Self::start).
    pub fn manage<F, Fut>(mut self, name: impl Into<String>, f: F) -> ManagedBuilder
    where
        F: Fn(Arc<ExecContext>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), RunError>> + Send + 'static,
    {
        self.name = name.into();
        self.managed = Some(Arc::new(move |ctx| Box::pin(f(ctx))));
        ManagedBuilder { supervisor: self }
    }

    /// Spawn the reducer and drive initialization; blocks until the
    /// supervisor is `Ready` or has halted (an error).
    pub async fn start(&self) -> Result<(), SupervisorError> {
        let Some(managed) = self.managed.clone() else {
            return Err(SupervisorError::NotManaged);
        };
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(SupervisorError::AlreadyStarted);
        }
        let Some(mailboxes) = self.mailboxes.lock().take() else {
            return Err(SupervisorError::AlreadyStarted);
        };
        let Some(state_tx) = self.state_tx.lock().take() else {
            return Err(SupervisorError::AlreadyStarted);
        };

        let ctx = Arc::new(ExecContext::new(
            self.shared.watcher_id,
            self.name.clone(),
            Arc::clone(&self.shared.env),
        ));
        ctx.attach(&self.shared);

        let handler =
            EffectHandler::new(Arc::clone(&self.shared), ctx, managed, self.cleanup.clone());
        let reducer = Reducer::new(
            Arc::clone(&self.shared),
            mailboxes,
            handler,
            state_tx,
            self.shutdown.clone(),
        );
        *self.reducer_task.lock() = Some(tokio::spawn(reducer.run()));

        // Subscribe before the init request so no transition can slip
        // between the enqueue and the first `changed` observation.
        let mut rx = self.state_rx.clone();
        self.send_lifecycle(SupState::InitRun, "start").await?;

        loop {
            rx.changed().await.map_err(|_| SupervisorError::QueueClosed)?;
            let state = *rx.borrow_and_update();
            if state == SupState::Ready {
                tracing::info!(watcher = %self.shared.watcher_id, "supervisor ready");
                return Ok(());
            }
            if state.is_halted() {
                return Err(SupervisorError::StartFailed(state));
            }
        }
    }

    /// Graceful stop: request `Stopped`, wait for cleanup and the halt,
    /// then cancel every watch and the root context.
    pub async fn stop(&self) -> Result<(), SupervisorError> {
        if !self.started.load(Ordering::SeqCst) {
            return Err(SupervisorError::NotRunning);
        }
        if self.state().is_halted() {
            return Err(SupervisorError::AlreadyStopped);
        }

        self.send_lifecycle(SupState::Stopped, "stop requested").await?;
        self.shared.cleanup_done.wait().await;

        let mut rx = self.state_rx.clone();
        loop {
            let state = *rx.borrow_and_update();
            if state.is_halted() {
                break;
            }
            rx.changed().await.map_err(|_| SupervisorError::QueueClosed)?;
        }

        self.shared.registry.clear();
        self.shared.root.current().cancel();
        self.shutdown.cancel();
        tracing::info!(watcher = %self.shared.watcher_id, "supervisor stopped");
        Ok(())
    }

    /// Enqueue a user message for the managed function.
    pub async fn send_message(&self, content: impl Into<String>) -> Result<(), SupervisorError> {
        if !self.started.load(Ordering::SeqCst) || self.state().is_halted() {
            return Err(SupervisorError::NotRunning);
        }
        self.shared
            .queue
            .send(Signal::User(UserSig::new(content, self.clock.epoch_ms())))
            .await
            .map_err(|_| SupervisorError::QueueClosed)
    }

    pub fn state(&self) -> SupState {
        *self.state_rx.borrow()
    }

    pub fn get_env(&self, key: &str) -> Option<String> {
        self.shared.env.get(key).cloned()
    }

    pub fn logger(&self) -> Arc<SupLogger> {
        Arc::clone(&self.shared.logger)
    }

    pub fn watcher_id(&self) -> WatcherId {
        self.shared.watcher_id
    }

    pub fn status(&self) -> StatusSummary {
        StatusSummary {
            watcher_id: self.shared.watcher_id,
            name: self.name.clone(),
            state: self.state(),
            watch_names: self.shared.registry.names(),
            consecutive_failures: self.shared.logger.consecutive_run_failures(),
            pending_message: !self.shared.slot.is_empty(),
            memo_entries: self.shared.memo.len(),
            cleaned_up: self.shared.cleanup_done.is_complete(),
        }
    }

    async fn send_lifecycle(
        &self,
        target: SupState,
        reason: &str,
    ) -> Result<(), SupervisorError> {
        self.shared
            .queue
            .send(Signal::Lifecycle(LifecycleSig::new(target, reason, self.clock.epoch_ms())))
            .await
            .map_err(|_| SupervisorError::QueueClosed)
    }
}

/// Intermediate builder returned by [`Supervisor::manage`]; bind the
/// cleanup function (or skip it) to get the supervisor back.
pub struct ManagedBuilder {
    supervisor: Supervisor,
}

impl ManagedBuilder {
    /// Register the cleanup function invoked during teardown.
    pub fn cleanup<F, Fut>(mut self, f: F) -> Supervisor
    where
        F: Fn(Arc<ExecContext>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), RunError>> + Send + 'static,
    {
        self.supervisor.cleanup = Some(Arc::new(move |ctx| Box::pin(f(ctx))));
        self.supervisor
    }

    /// No cleanup function; teardown only cancels watches.
    pub fn no_cleanup(self) -> Supervisor {
        self.supervisor
    }
}

#[cfg(test)]
#[path = "supervisor_tests.rs"]
mod tests;
