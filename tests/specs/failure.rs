// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Suppression, recovery, and crash-out scenarios.

use crate::support::{no_env, spec_config, wait_for_state};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use vigil_core::{EffectKind, RunError, SupState};
use vigil_engine::{Supervisor, SupervisorError};

type ManagedFuture = futures_util::future::BoxFuture<'static, Result<(), RunError>>;

/// Managed function failing on the first `failures` invocations.
fn flaky(
    failures: u32,
) -> (impl Fn(Arc<vigil_engine::ExecContext>) -> ManagedFuture + Send + Sync + 'static, Arc<AtomicU32>)
{
    let calls = Arc::new(AtomicU32::new(0));
    let seen = Arc::clone(&calls);
    let f = move |_ctx: Arc<vigil_engine::ExecContext>| {
        let n = seen.fetch_add(1, Ordering::SeqCst) + 1;
        let fut: ManagedFuture = Box::pin(async move {
            if n <= failures {
                Err(RunError::failure(format!("failure {n}")))
            } else {
                Ok(())
            }
        });
        fut
    };
    (f, calls)
}

#[tokio::test]
async fn suppression_then_recovery_then_success() {
    let (managed, calls) = flaky(4);
    let supervisor = Supervisor::new(spec_config(), no_env()).manage("flaky", managed).no_cleanup();

    // Call 1 fails during init but is suppressed; start still lands Ready.
    supervisor.start().await.expect("suppressed init failure still starts");
    assert_eq!(supervisor.state(), SupState::Ready);

    // Call 2: suppressed again. Call 3: crosses the threshold, enters
    // recovery, and the retry loop (calls 4, 5) runs to completion.
    supervisor.send_message("retry").await.expect("send");
    supervisor.send_message("retry").await.expect("send");

    tokio::time::timeout(Duration::from_secs(5), async {
        while calls.load(Ordering::SeqCst) < 5 {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("five invocations");
    wait_for_state(&supervisor, SupState::Ready).await;

    let effects = supervisor.logger().recent_effects(50);
    let recovers = effects.iter().filter(|e| e.kind == EffectKind::Recover).count();
    assert_eq!(recovers, 2, "one recover per backoff cycle");
    assert_eq!(supervisor.logger().consecutive_run_failures(), 0);
}

#[tokio::test]
async fn sustained_failure_crashes_the_supervisor() {
    let (managed, _calls) = flaky(u32::MAX);
    let supervisor =
        Supervisor::new(spec_config(), no_env()).manage("doomed", managed).no_cleanup();

    supervisor.start().await.expect("early failures are suppressed");

    supervisor.send_message("poke").await.expect("send");
    supervisor.send_message("poke").await.expect("send");
    wait_for_state(&supervisor, SupState::Crashed).await;

    // Crashed is terminal: no interaction is accepted and the log goes quiet.
    assert!(matches!(
        supervisor.send_message("too late").await,
        Err(SupervisorError::NotRunning)
    ));
    let settled = supervisor.logger().reduce_count();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(supervisor.logger().reduce_count(), settled, "no further reduce actions");

    let effects = supervisor.logger().recent_effects(50);
    let crash_recover = effects
        .iter()
        .find(|e| e.kind == EffectKind::Recover && !e.success)
        .expect("final recover refused");
    assert_eq!(crash_recover.error.as_deref(), Some("max consecutive failures"));
}

#[tokio::test]
async fn recovery_reinitializes_through_init_run() {
    let (managed, _calls) = flaky(3);
    let supervisor =
        Supervisor::new(spec_config(), no_env()).manage("healer", managed).no_cleanup();

    supervisor.start().await.expect("start");
    supervisor.send_message("a").await.expect("send");
    supervisor.send_message("b").await.expect("send");
    wait_for_state(&supervisor, SupState::Ready).await;

    // The recovery retry went WaitRecover -> InitRun -> Ready.
    let reduces = supervisor.logger().recent_reduces(50);
    assert!(reduces
        .iter()
        .any(|r| r.prev == SupState::WaitRecover && r.next == SupState::InitRun));
    assert!(reduces
        .iter()
        .any(|r| r.prev == SupState::Running && r.next == SupState::WaitRecover));
}
