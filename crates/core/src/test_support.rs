// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared helpers and proptest strategies for this crate's tests and,
//! via the `test-support` feature, for other crates' tests.

use crate::state::SupState;

/// Every supervisor state, for exhaustive matrix checks.
pub const ALL_STATES: [SupState; 7] = [
    SupState::Ready,
    SupState::Running,
    SupState::InitRun,
    SupState::Stopped,
    SupState::Killed,
    SupState::Crashed,
    SupState::WaitRecover,
];

/// Strategy yielding an arbitrary supervisor state.
pub fn arb_state() -> impl proptest::strategy::Strategy<Value = SupState> {
    proptest::sample::select(ALL_STATES.to_vec())
}
