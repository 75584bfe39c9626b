// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared helpers for the scenario specs.

use std::collections::HashMap;
use std::time::Duration;
use vigil_core::{SupState, SupervisorConfig};
use vigil_engine::Supervisor;

/// Config tuned for specs: short timeouts, tiny backoffs.
pub fn spec_config() -> SupervisorConfig {
    let recovery = vigil_core::RecoveryPolicy::default()
        .min_consecutive_failures(3)
        .max_consecutive_failures(6)
        .base_retry_delay(Duration::from_millis(10))
        .max_retry_delay(Duration::from_millis(100));
    SupervisorConfig::default()
        .default_timeout(Duration::from_millis(500))
        .recovery(recovery)
}

/// Wait (bounded) until the supervisor reports `state`.
pub async fn wait_for_state(supervisor: &Supervisor, state: SupState) {
    let deadline = Duration::from_secs(5);
    tokio::time::timeout(deadline, async {
        while supervisor.state() != state {
            tokio::task::yield_now().await;
        }
    })
    .await
    .unwrap_or_else(|_| {
        panic!("supervisor never reached {state}, still {}", supervisor.state())
    });
}

pub fn no_env() -> HashMap<String, String> {
    HashMap::new()
}
