// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error taxonomy for managed and cleanup functions.
//!
//! The control variants (`Stop`, `Kill`, `Crash`) are requested state
//! transitions encoded as errors because they originate deep inside
//! user code; the effect handler routes them to lifecycle signals and
//! never feeds them to the failure pipeline.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RunError {
    /// Graceful stop; the supervisor remains restartable.
    #[error("stop requested: {0}")]
    Stop(String),

    /// Terminal, non-restartable termination.
    #[error("kill requested: {0}")]
    Kill(String),

    /// Unrecoverable failure; the supervisor crashes.
    #[error("crash: {reason}")]
    Crash {
        reason: String,
        #[source]
        cause: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A watched variable has no value yet. Expected during the first
    /// init-run invocation; an ordinary failure anywhere else.
    #[error("variable not initialized: {0}")]
    VarNotInitialized(String),

    /// Ordinary failure, subject to the suppression/recovery policy.
    #[error("{0}")]
    Failure(String),
}

impl RunError {
    pub fn stop(reason: impl Into<String>) -> Self {
        RunError::Stop(reason.into())
    }

    pub fn kill(reason: impl Into<String>) -> Self {
        RunError::Kill(reason.into())
    }

    pub fn crash(reason: impl Into<String>) -> Self {
        RunError::Crash { reason: reason.into(), cause: None }
    }

    pub fn crash_with(
        reason: impl Into<String>,
        cause: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        RunError::Crash { reason: reason.into(), cause: Some(Box::new(cause)) }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        RunError::Failure(message.into())
    }

    pub fn var_not_initialized(name: impl Into<String>) -> Self {
        RunError::VarNotInitialized(name.into())
    }

    /// Control errors are transitions, not failures.
    pub fn is_control(&self) -> bool {
        matches!(self, RunError::Stop(_) | RunError::Kill(_) | RunError::Crash { .. })
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
