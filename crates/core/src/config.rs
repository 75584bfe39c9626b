// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Supervisor configuration.
//!
//! All durations serialize as integer milliseconds. Fields default
//! individually, so a partial TOML document overlays the defaults.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Suppression / recovery / crash policy for consecutive failures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecoveryPolicy {
    /// Failures below this count stay in `Ready` (suppression phase).
    pub min_consecutive_failures: u32,
    /// Failures at this count crash the supervisor.
    pub max_consecutive_failures: u32,
    #[serde(with = "duration_ms")]
    pub base_retry_delay: Duration,
    #[serde(with = "duration_ms")]
    pub max_retry_delay: Duration,
    /// Explicit overrides for the first post-recovery attempts.
    #[serde(with = "duration_ms_list")]
    pub lightweight_retry_delays: Vec<Duration>,
}

impl Default for RecoveryPolicy {
    fn default() -> Self {
        Self {
            min_consecutive_failures: 3,
            max_consecutive_failures: 6,
            base_retry_delay: Duration::from_millis(500),
            max_retry_delay: Duration::from_secs(30),
            lightweight_retry_delays: Vec::new(),
        }
    }
}

impl RecoveryPolicy {
    crate::setters! {
        set {
            min_consecutive_failures: u32,
            max_consecutive_failures: u32,
            base_retry_delay: Duration,
            max_retry_delay: Duration,
            lightweight_retry_delays: Vec<Duration>,
        }
    }

    /// Backoff delay for post-recovery attempt `k` (zero-based).
    ///
    /// The explicit list overrides the first few attempts; afterwards
    /// the base delay doubles per attempt, capped at `max_retry_delay`.
    pub fn retry_delay(&self, attempt: u32) -> Duration {
        if let Some(d) = self.lightweight_retry_delays.get(attempt as usize) {
            return *d;
        }
        let doubled = self.base_retry_delay.saturating_mul(1_u32 << attempt.min(16));
        doubled.min(self.max_retry_delay)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SupervisorConfig {
    /// Deadline for each managed-function invocation.
    #[serde(with = "duration_ms")]
    pub default_timeout: Duration,
    /// Capacity of each signal mailbox. Enqueue to a full mailbox
    /// suspends the producer, so provision generously.
    pub signal_chan_capacity: usize,
    /// Ring-buffer cap per log stream.
    pub max_log_entries: usize,
    /// Memo cache cap; values computed past the cap are not cached.
    pub max_memo_entries: usize,
    pub recovery: RecoveryPolicy,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            default_timeout: Duration::from_secs(30),
            signal_chan_capacity: 64,
            max_log_entries: 256,
            max_memo_entries: 128,
            recovery: RecoveryPolicy::default(),
        }
    }
}

impl SupervisorConfig {
    crate::setters! {
        set {
            default_timeout: Duration,
            signal_chan_capacity: usize,
            max_log_entries: usize,
            max_memo_entries: usize,
            recovery: RecoveryPolicy,
        }
    }

    /// Overlay a (possibly partial) TOML document on the defaults.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.signal_chan_capacity == 0 {
            return Err(ConfigError::Invalid("signal_chan_capacity must be positive".into()));
        }
        if self.recovery.min_consecutive_failures == 0 {
            return Err(ConfigError::Invalid("min_consecutive_failures must be positive".into()));
        }
        if self.recovery.max_consecutive_failures < self.recovery.min_consecutive_failures {
            return Err(ConfigError::Invalid(
                "max_consecutive_failures must be >= min_consecutive_failures".into(),
            ));
        }
        Ok(())
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, s: S) -> Result<S::Ok, S::Error> {
        (duration.as_millis() as u64).serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let millis = u64::deserialize(d)?;
        Ok(Duration::from_millis(millis))
    }
}

mod duration_ms_list {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(list: &[Duration], s: S) -> Result<S::Ok, S::Error> {
        list.iter().map(|d| d.as_millis() as u64).collect::<Vec<_>>().serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<Duration>, D::Error> {
        let millis = Vec::<u64>::deserialize(d)?;
        Ok(millis.into_iter().map(Duration::from_millis).collect())
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
