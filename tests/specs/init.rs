// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Initialization scenarios: no watches, staged watch warm-up.

use crate::support::{no_env, spec_config};
use std::sync::Arc;
use std::time::Duration;
use vigil_core::{EffectKind, RunError, SupState, UpdateFn, VarUpdate, VarValue};
use vigil_engine::Supervisor;

#[tokio::test]
async fn init_with_no_watches_reaches_ready_in_one_cycle() {
    let supervisor = Supervisor::new(spec_config(), no_env())
        .manage("noop", |_ctx| async { Ok(()) })
        .no_cleanup();

    supervisor.start().await.expect("start succeeds");
    assert_eq!(supervisor.state(), SupState::Ready);

    let effects = supervisor.logger().recent_effects(10);
    assert_eq!(effects[0].kind, EffectKind::InitRun);
    assert!(effects[0].success);
    let reduces = supervisor.logger().recent_reduces(10);
    assert!(
        reduces.iter().any(|r| r.next == SupState::Ready && r.signal.contains("init complete")),
        "ready transition recorded"
    );
}

#[tokio::test(start_paused = true)]
async fn init_waits_for_every_declared_watch() {
    fn counter(start: u64) -> impl Fn() -> Result<UpdateFn, vigil_core::UpdateError> {
        move || {
            Ok(Arc::new(move |prev: Option<&VarValue>| {
                let current = prev.and_then(|v| v.extract::<u64>()).unwrap_or(start);
                Ok(VarUpdate::changed(VarValue::new(current + 1)))
            }) as UpdateFn)
        }
    }

    let supervisor = Supervisor::new(spec_config(), no_env())
        .manage("dual", |ctx| async move {
            let fast = ctx.watch_tick("fast", Duration::from_millis(10), counter(0));
            let slow = ctx.watch_tick("slow", Duration::from_millis(500), counter(100));
            match (fast, slow) {
                (Some(_), Some(_)) => Ok(()),
                (None, _) => Err(RunError::var_not_initialized("fast")),
                (_, None) => Err(RunError::var_not_initialized("slow")),
            }
        })
        .no_cleanup();

    supervisor.start().await.expect("start succeeds");
    assert_eq!(supervisor.state(), SupState::Ready);

    let status = supervisor.status();
    assert_eq!(status.watch_names, vec!["fast".to_string(), "slow".to_string()]);

    // Exactly one synthesized ready transition, after both watches fed.
    let ready_transitions: Vec<_> = supervisor
        .logger()
        .recent_reduces(50)
        .into_iter()
        .filter(|r| r.prev == SupState::InitRun && r.next == SupState::Ready)
        .collect();
    assert_eq!(ready_transitions.len(), 1);
}

#[tokio::test]
async fn context_values_persist_across_runs() {
    let observed = Arc::new(parking_lot::Mutex::new(0_i64));
    let probe = Arc::clone(&observed);
    let supervisor = Supervisor::new(spec_config(), no_env())
        .manage("counter", move |ctx| {
            let probe = Arc::clone(&probe);
            async move {
                let stored = ctx.update("runs", |prev| {
                    let n = prev.and_then(|v| v.as_i64()).unwrap_or(0);
                    serde_json::json!(n + 1)
                });
                *probe.lock() = stored.as_i64().unwrap_or(0);
                Ok(())
            }
        })
        .no_cleanup();

    supervisor.start().await.expect("start");
    for _ in 0..3 {
        supervisor.send_message("tick").await.expect("send");
    }

    // Initialization ran once, each message once more; the per-session
    // store carried the count across runs.
    tokio::time::timeout(Duration::from_secs(5), async {
        while *observed.lock() < 4 {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("kv store accumulated across runs");
}
