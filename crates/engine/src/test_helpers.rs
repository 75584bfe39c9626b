// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared construction helpers for this crate's unit tests.

use crate::completion::Completion;
use crate::context::ExecContext;
use crate::handler::{EffectHandler, ManagedFn};
use crate::memo::MemoCache;
use crate::queue::{signal_queue, Mailboxes};
use crate::root::RootContext;
use crate::supervisor::SupervisorShared;
use crate::watch::WatchRegistry;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use vigil_core::{
    MessageSlot, RunError, SupLogger, SupervisorConfig, VarStore, WatcherId,
};

/// Build shared state (and the reducer's mailboxes) for a config.
pub(crate) fn shared_with(config: SupervisorConfig) -> (Arc<SupervisorShared>, Mailboxes) {
    let (queue, boxes) = signal_queue(config.signal_chan_capacity);
    let logger = Arc::new(SupLogger::new(config.max_log_entries));
    let registry = WatchRegistry::new(queue.clone(), Arc::clone(&logger));
    let memo = MemoCache::new(config.max_memo_entries);
    let shared = Arc::new(SupervisorShared {
        config,
        env: Arc::new(HashMap::new()),
        store: VarStore::new(),
        slot: MessageSlot::new(),
        memo,
        registry,
        logger,
        root: RootContext::new(CancellationToken::new()),
        queue,
        cleanup_done: Completion::new(),
        watcher_id: WatcherId::new(),
    });
    (shared, boxes)
}

/// Attached execution context for `shared`.
pub(crate) fn context_for(shared: &Arc<SupervisorShared>) -> Arc<ExecContext> {
    let ctx = Arc::new(ExecContext::new(
        shared.watcher_id,
        "test-watcher",
        Arc::clone(&shared.env),
    ));
    ctx.attach(shared);
    ctx
}

/// Managed function that always succeeds, counting invocations.
pub(crate) fn managed_counting() -> (ManagedFn, Arc<AtomicU32>) {
    let calls = Arc::new(AtomicU32::new(0));
    let seen = Arc::clone(&calls);
    let f: ManagedFn = Arc::new(move |_ctx| {
        seen.fetch_add(1, Ordering::SeqCst);
        Box::pin(async { Ok(()) })
    });
    (f, calls)
}

/// Managed function that always fails with `message`.
pub(crate) fn managed_failing(message: &str) -> ManagedFn {
    let message = message.to_string();
    Arc::new(move |_ctx| {
        let message = message.clone();
        Box::pin(async move { Err(RunError::failure(message)) })
    })
}

/// Handler over `shared` with the given functions.
pub(crate) fn handler_with(
    shared: &Arc<SupervisorShared>,
    managed: ManagedFn,
    cleanup: Option<ManagedFn>,
) -> EffectHandler {
    EffectHandler::new(Arc::clone(shared), context_for(shared), managed, cleanup)
}
