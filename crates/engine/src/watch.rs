// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Watch registry and the tick/flow producer tasks.
//!
//! Each watched variable is owned by exactly one handle. Producers are
//! tokio tasks bound to a child of the supervisor's root cancellation
//! token; cancelling the root during cleanup tears all of them down.

use crate::error::SupervisorError;
use crate::queue::SignalQueue;
use futures_util::{Stream, StreamExt};
use indexmap::IndexMap;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use vigil_core::{
    Clock, Fault, SupLogger, SystemClock, UpdateError, UpdateFn, VarSig, VarStore, VarValue,
};

/// Factory polled by a tick producer to build the next update function.
pub(crate) type TickFactory = Arc<dyn Fn() -> Result<UpdateFn, UpdateError> + Send + Sync>;

struct WatchHandle {
    cancel: CancellationToken,
}

pub(crate) struct WatchRegistry {
    inner: Mutex<IndexMap<String, WatchHandle>>,
    queue: SignalQueue,
    logger: Arc<SupLogger>,
    clock: SystemClock,
}

impl WatchRegistry {
    pub fn new(queue: SignalQueue, logger: Arc<SupLogger>) -> Self {
        Self { inner: Mutex::new(IndexMap::new()), queue, logger, clock: SystemClock }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.inner.lock().contains_key(name)
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// Declared watch names, in registration order.
    pub fn names(&self) -> Vec<String> {
        self.inner.lock().keys().cloned().collect()
    }

    /// True when every declared watch has an accepted store value.
    pub fn all_initialized(&self, store: &VarStore) -> bool {
        let names = self.names();
        store.initialized(&names)
    }

    /// Cancel every producer and forget all handles.
    pub fn clear(&self) {
        let mut map = self.inner.lock();
        for (name, handle) in map.drain(..) {
            tracing::debug!(watch = %name, "watch cancelled");
            handle.cancel.cancel();
        }
    }

    /// Register a tick watch and start its producer.
    ///
    /// Errors if `name` is already owned by a handle in this session.
    pub fn register_tick(
        &self,
        name: &str,
        interval: Duration,
        factory: TickFactory,
        parent: CancellationToken,
    ) -> Result<(), SupervisorError> {
        let cancel = self.claim(name, &format!("tick every {:?}", interval), parent)?;
        let producer = TickProducer {
            name: name.to_string(),
            interval,
            factory,
            cancel,
            queue: self.queue.clone(),
            logger: Arc::clone(&self.logger),
            clock: self.clock,
        };
        tokio::spawn(producer.run());
        Ok(())
    }

    /// Register a flow watch and start forwarding `source`.
    pub fn register_flow<S>(
        &self,
        name: &str,
        source: S,
        parent: CancellationToken,
    ) -> Result<(), SupervisorError>
    where
        S: Stream<Item = VarValue> + Send + 'static,
    {
        let cancel = self.claim(name, "flow", parent)?;
        let producer = FlowProducer {
            name: name.to_string(),
            cancel,
            queue: self.queue.clone(),
            clock: self.clock,
        };
        tokio::spawn(producer.run(source));
        Ok(())
    }

    fn claim(
        &self,
        name: &str,
        kind: &str,
        parent: CancellationToken,
    ) -> Result<CancellationToken, SupervisorError> {
        let mut map = self.inner.lock();
        if map.contains_key(name) {
            return Err(SupervisorError::DuplicateWatch(name.to_string()));
        }
        let cancel = parent.child_token();
        tracing::info!(watch = %name, kind = %kind, "watch registered");
        map.insert(name.to_string(), WatchHandle { cancel: cancel.clone() });
        Ok(cancel)
    }
}

struct TickProducer {
    name: String,
    interval: Duration,
    factory: TickFactory,
    cancel: CancellationToken,
    queue: SignalQueue,
    logger: Arc<SupLogger>,
    clock: SystemClock,
}

impl TickProducer {
    async fn run(self) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = ticker.tick() => {
                    if !self.poll_once().await {
                        break;
                    }
                }
            }
        }
        tracing::debug!(watch = %self.name, "tick producer exited");
    }

    /// Returns false when the reducer is gone and the producer should exit.
    async fn poll_once(&self) -> bool {
        let update = match (self.factory)() {
            Ok(update) => update,
            Err(err) => {
                self.logger.log_fault(
                    Fault::Watch {
                        name: self.name.clone(),
                        phase: "factory",
                        message: err.to_string(),
                    },
                    self.clock.epoch_ms(),
                );
                return true;
            }
        };
        let sig = VarSig::new(self.name.clone(), update, self.clock.epoch_ms());
        self.queue.send_var(sig).await.is_ok()
    }
}

struct FlowProducer {
    name: String,
    cancel: CancellationToken,
    queue: SignalQueue,
    clock: SystemClock,
}

impl FlowProducer {
    async fn run<S>(self, source: S)
    where
        S: Stream<Item = VarValue> + Send + 'static,
    {
        let mut source = std::pin::pin!(source);
        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                element = source.next() => {
                    let Some(element) = element else {
                        tracing::debug!(watch = %self.name, "flow source exhausted");
                        break;
                    };
                    let sig = VarSig::flow(self.name.clone(), element, self.clock.epoch_ms());
                    if self.queue.send_var(sig).await.is_err() {
                        break;
                    }
                }
            }
        }
        tracing::debug!(watch = %self.name, "flow producer exited");
    }
}

#[cfg(test)]
#[path = "watch_tests.rs"]
mod tests;
