// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! vigil-core: domain types for the vigil execution supervisor
//!
//! Everything in this crate is runtime-agnostic: states, signals, the
//! watched-variable store, the message slot, configuration, errors, and
//! the bounded in-memory logger. The async half lives in `vigil-engine`.

pub mod macros;

pub mod clock;
pub mod config;
pub mod error;
pub mod id;
pub mod logger;
pub mod message;
pub mod signal;
pub mod state;
pub mod store;
pub mod value;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use clock::{Clock, FakeClock, SystemClock};
pub use config::{ConfigError, RecoveryPolicy, SupervisorConfig};
pub use error::RunError;
pub use id::WatcherId;
pub use logger::{EffectKind, EffectRecord, Fault, FaultRecord, ReduceRecord, SupLogger};
pub use message::{MessageSlot, UserMessage};
pub use signal::{LifecycleSig, Priority, Signal, UserSig, VarSig};
pub use state::{lifecycle_edge, Edge, SupState};
pub use store::VarStore;
pub use value::{UpdateError, UpdateFn, VarUpdate, VarValue};
