// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Flow watches, batching, and memoization end to end.

use crate::support::{no_env, spec_config};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use vigil_core::{RunError, VarValue};
use vigil_engine::Supervisor;

/// Adapt an mpsc receiver into a flow source.
fn flow_source(
    mut rx: tokio::sync::mpsc::Receiver<VarValue>,
) -> impl futures_util::Stream<Item = VarValue> + Send + 'static {
    futures_util::stream::poll_fn(move |cx| rx.poll_recv(cx))
}

#[tokio::test]
async fn flow_elements_drive_runs_with_last_value_winning() {
    let (tx, rx) = tokio::sync::mpsc::channel::<VarValue>(32);
    let seen = Arc::new(parking_lot::Mutex::new(Vec::<u64>::new()));
    let probe = Arc::clone(&seen);
    let source = parking_lot::Mutex::new(Some(flow_source(rx)));

    let supervisor = Supervisor::new(spec_config(), no_env())
        .manage("ticker", move |ctx| {
            let probe = Arc::clone(&probe);
            let source = source.lock().take();
            async move {
                let price = match source {
                    Some(source) => ctx.watch_flow("price", source),
                    None => ctx.watch_flow("price", futures_util::stream::empty()),
                };
                match price.and_then(|v| v.extract::<u64>()) {
                    Some(price) => {
                        probe.lock().push(price);
                        Ok(())
                    }
                    None => Err(RunError::var_not_initialized("price")),
                }
            }
        })
        .no_cleanup();

    // Initialization blocks on the first element.
    let start = supervisor.start();
    tx.send(VarValue::new(10_u64)).await.expect("feed");
    start.await.expect("start succeeds");

    tx.send(VarValue::new(11_u64)).await.expect("feed");
    tokio::time::timeout(Duration::from_secs(5), async {
        while seen.lock().last() != Some(&11) {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("flow element observed");
}

#[tokio::test]
async fn burst_of_flow_elements_coalesces_to_the_latest() {
    let (tx, rx) = tokio::sync::mpsc::channel::<VarValue>(256);
    let seen = Arc::new(parking_lot::Mutex::new(Vec::<u64>::new()));
    let probe = Arc::clone(&seen);
    let source = parking_lot::Mutex::new(Some(flow_source(rx)));

    let supervisor = Supervisor::new(spec_config(), no_env())
        .manage("burst", move |ctx| {
            let probe = Arc::clone(&probe);
            let source = source.lock().take();
            async move {
                let level = match source {
                    Some(source) => ctx.watch_flow("level", source),
                    None => ctx.watch_flow("level", futures_util::stream::empty()),
                };
                match level.and_then(|v| v.extract::<u64>()) {
                    Some(level) => {
                        probe.lock().push(level);
                        // Linger so the burst piles up behind this run.
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        Ok(())
                    }
                    None => Err(RunError::var_not_initialized("level")),
                }
            }
        })
        .no_cleanup();

    let start = supervisor.start();
    tx.send(VarValue::new(0_u64)).await.expect("feed");
    start.await.expect("start succeeds");

    for level in 1..=100_u64 {
        tx.send(VarValue::new(level)).await.expect("feed");
    }
    tokio::time::timeout(Duration::from_secs(5), async {
        while seen.lock().last() != Some(&100) {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("burst settled on the last element");

    // Coalescing means far fewer runs than elements.
    assert!(seen.lock().len() < 100, "burst was batched, saw {} runs", seen.lock().len());
}

#[tokio::test]
async fn memo_computes_once_until_cleared() {
    let computations = Arc::new(AtomicU32::new(0));
    let runs = Arc::new(AtomicU32::new(0));
    let computed = Arc::clone(&computations);
    let ran = Arc::clone(&runs);

    let supervisor = Supervisor::new(spec_config(), no_env())
        .manage("memoized", move |ctx| {
            let computed = Arc::clone(&computed);
            let ran = Arc::clone(&ran);
            async move {
                let run = ran.fetch_add(1, Ordering::SeqCst);
                let client = ctx.memo("client", || {
                    computed.fetch_add(1, Ordering::SeqCst);
                    Ok(VarValue::new("session-1".to_string()))
                })?;
                assert_eq!(client.extract::<String>().as_deref(), Some("session-1"));
                if run == 2 {
                    ctx.clear_memo("client");
                }
                Ok(())
            }
        })
        .no_cleanup();

    supervisor.start().await.expect("start");
    for _ in 0..3 {
        supervisor.send_message("poke").await.expect("send");
    }
    tokio::time::timeout(Duration::from_secs(5), async {
        while runs.load(Ordering::SeqCst) < 4 {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("four runs");

    // Runs 0..=2 shared one computation; run 2 cleared, run 3 recomputed.
    assert_eq!(computations.load(Ordering::SeqCst), 2);
}
