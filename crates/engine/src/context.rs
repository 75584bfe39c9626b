// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Execution context handed to the managed function.
//!
//! One context object persists for the supervisor's lifetime; the
//! handler re-points its cancellation token and current message at the
//! start of each run. The supervisor itself is reachable only through a
//! weak handle, which breaks the construction-time reference cycle.

use crate::supervisor::SupervisorShared;
use futures_util::Stream;
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use vigil_core::{RunError, UpdateError, UpdateFn, UserMessage, VarValue, WatcherId};

pub struct ExecContext {
    watcher_id: WatcherId,
    watcher_name: String,
    env: Arc<HashMap<String, String>>,
    kv: RwLock<HashMap<String, Value>>,
    message: RwLock<Option<UserMessage>>,
    cancel: RwLock<CancellationToken>,
    supervisor: Mutex<Weak<SupervisorShared>>,
}

impl ExecContext {
    pub(crate) fn new(
        watcher_id: WatcherId,
        watcher_name: impl Into<String>,
        env: Arc<HashMap<String, String>>,
    ) -> Self {
        Self {
            watcher_id,
            watcher_name: watcher_name.into(),
            env,
            kv: RwLock::new(HashMap::new()),
            message: RwLock::new(None),
            cancel: RwLock::new(CancellationToken::new()),
            supervisor: Mutex::new(Weak::new()),
        }
    }

    /// Stash the opaque back-handle once the shared state exists.
    pub(crate) fn attach(&self, shared: &Arc<SupervisorShared>) {
        *self.supervisor.lock() = Arc::downgrade(shared);
    }

    /// Point the context at a new execution.
    pub(crate) fn begin_run(&self, cancel: CancellationToken, message: Option<UserMessage>) {
        *self.cancel.write() = cancel;
        *self.message.write() = message;
    }

    /// Point the context at the cleanup invocation.
    pub(crate) fn begin_cleanup(&self, cancel: CancellationToken) {
        self.begin_run(cancel, None);
    }

    fn shared(&self) -> Option<Arc<SupervisorShared>> {
        let shared = self.supervisor.lock().upgrade();
        if shared.is_none() {
            tracing::warn!(watcher = %self.watcher_id, "supervisor handle dropped");
        }
        shared
    }

    // === identity and environment ===

    pub fn watcher_id(&self) -> WatcherId {
        self.watcher_id
    }

    pub fn watcher_name(&self) -> &str {
        &self.watcher_name
    }

    /// Environment variables are frozen at construction.
    pub fn env(&self, key: &str) -> Option<String> {
        self.env.get(key).cloned()
    }

    /// The user message that triggered this run, if any.
    pub fn message(&self) -> Option<UserMessage> {
        self.message.read().clone()
    }

    /// Clone of this run's cancellation token.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.read().clone()
    }

    /// Suspend until the current run is cancelled (deadline or teardown).
    pub async fn cancelled(&self) {
        let token = self.cancel_token();
        token.cancelled().await;
    }

    // === per-session key/value store ===

    pub fn get(&self, key: &str) -> Option<Value> {
        self.kv.read().get(key).cloned()
    }

    pub fn set(&self, key: impl Into<String>, value: Value) {
        self.kv.write().insert(key.into(), value);
    }

    /// Replace the value under `key` with `f(deep copy of current)`.
    ///
    /// Returns exactly the value stored. The callback runs without any
    /// lock held; concurrent updates to the same key are last-writer-wins.
    pub fn update(&self, key: &str, f: impl FnOnce(Option<Value>) -> Value) -> Value {
        let snapshot = self.kv.read().get(key).cloned();
        let next = f(snapshot);
        self.kv.write().insert(key.to_string(), next.clone());
        next
    }

    // === watch primitives ===

    /// Declare a tick watch and read its current value.
    ///
    /// The first call for `name` registers a producer that polls
    /// `factory` every `interval`; later calls only read the store.
    /// Returns `None` until the variable is initialized.
    pub fn watch_tick<F>(&self, name: &str, interval: Duration, factory: F) -> Option<VarValue>
    where
        F: Fn() -> Result<UpdateFn, UpdateError> + Send + Sync + 'static,
    {
        let shared = self.shared()?;
        if !shared.registry.contains(name) {
            let parent = shared.root.current();
            if let Err(err) = shared.registry.register_tick(name, interval, Arc::new(factory), parent)
            {
                // Lost a registration race; fall through to the read.
                tracing::debug!(watch = name, error = %err, "tick registration skipped");
            }
        }
        shared.store.get(name)
    }

    /// Declare a flow watch fed by `source` and read its current value.
    pub fn watch_flow<S>(&self, name: &str, source: S) -> Option<VarValue>
    where
        S: Stream<Item = VarValue> + Send + 'static,
    {
        let shared = self.shared()?;
        if !shared.registry.contains(name) {
            let parent = shared.root.current();
            if let Err(err) = shared.registry.register_flow(name, source, parent) {
                tracing::debug!(watch = name, error = %err, "flow registration skipped");
            }
        }
        shared.store.get(name)
    }

    // === memo ===

    /// One-shot cache: compute on first use, then return the stored
    /// value until [`clear_memo`](Self::clear_memo).
    pub fn memo(
        &self,
        key: &str,
        factory: impl FnOnce() -> Result<VarValue, RunError>,
    ) -> Result<VarValue, RunError> {
        let shared = self
            .shared()
            .ok_or_else(|| RunError::failure("supervisor handle dropped"))?;
        shared.memo.get_or_create(key, factory)
    }

    pub fn clear_memo(&self, key: &str) -> bool {
        self.shared().map(|shared| shared.memo.clear(key)).unwrap_or(false)
    }
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod tests;
