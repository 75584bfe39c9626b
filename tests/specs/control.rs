// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Control-error routing: stop, kill, and crash requested by user code.

use crate::support::{no_env, spec_config, wait_for_state};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use vigil_core::{EffectKind, RunError, SupState};
use vigil_engine::{Supervisor, SupervisorError};

type ManagedFuture = futures_util::future::BoxFuture<'static, Result<(), RunError>>;

/// Managed function that succeeds with no message and returns `err`
/// for any user message.
fn stop_on_message(
    err: fn() -> RunError,
) -> impl Fn(Arc<vigil_engine::ExecContext>) -> ManagedFuture + Send + Sync + 'static {
    move |ctx: Arc<vigil_engine::ExecContext>| {
        let fut: ManagedFuture = Box::pin(async move {
            match ctx.message() {
                Some(_) => Err(err()),
                None => Ok(()),
            }
        });
        fut
    }
}

#[tokio::test]
async fn stop_error_halts_cleanly_and_runs_cleanup() {
    let cleanups = Arc::new(AtomicU32::new(0));
    let probe = Arc::clone(&cleanups);
    let supervisor = Supervisor::new(spec_config(), no_env())
        .manage("finisher", stop_on_message(|| RunError::stop("done")))
        .cleanup(move |_ctx| {
            probe.fetch_add(1, Ordering::SeqCst);
            async { Ok(()) }
        });

    supervisor.start().await.expect("start");
    supervisor.send_message("finish").await.expect("send");
    wait_for_state(&supervisor, SupState::Stopped).await;

    assert_eq!(cleanups.load(Ordering::SeqCst), 1);
    let reduces = supervisor.logger().recent_reduces(50);
    assert!(reduces.iter().any(|r| r.prev == SupState::Running && r.next == SupState::Stopped));
    let effects = supervisor.logger().recent_effects(50);
    assert!(effects.iter().any(|e| e.kind == EffectKind::Cleanup && e.success));

    // The supervisor already stopped itself.
    assert!(matches!(supervisor.stop().await, Err(SupervisorError::AlreadyStopped)));
    assert_eq!(cleanups.load(Ordering::SeqCst), 1, "cleanup ran exactly once");
}

#[tokio::test]
async fn kill_error_halts_without_restart() {
    let supervisor = Supervisor::new(spec_config(), no_env())
        .manage("killer", stop_on_message(|| RunError::kill("fatal operator request")))
        .no_cleanup();

    supervisor.start().await.expect("start");
    supervisor.send_message("die").await.expect("send");
    wait_for_state(&supervisor, SupState::Killed).await;

    assert!(matches!(supervisor.send_message("anyone?").await, Err(SupervisorError::NotRunning)));
}

#[tokio::test]
async fn crash_error_is_terminal() {
    let supervisor = Supervisor::new(spec_config(), no_env())
        .manage("crasher", stop_on_message(|| RunError::crash("corrupted book")))
        .no_cleanup();

    supervisor.start().await.expect("start");
    supervisor.send_message("boom").await.expect("send");
    wait_for_state(&supervisor, SupState::Crashed).await;

    let settled = supervisor.logger().reduce_count();
    assert!(matches!(supervisor.stop().await, Err(SupervisorError::AlreadyStopped)));
    assert_eq!(supervisor.logger().reduce_count(), settled);
}

#[tokio::test]
async fn stopped_supervisors_report_already_stopped() {
    let supervisor = Supervisor::new(spec_config(), no_env())
        .manage("idler", |_ctx| async { Ok(()) })
        .no_cleanup();

    supervisor.start().await.expect("start");
    supervisor.stop().await.expect("first stop");
    assert!(matches!(supervisor.stop().await, Err(SupervisorError::AlreadyStopped)));
}
