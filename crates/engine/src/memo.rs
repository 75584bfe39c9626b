// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! One-shot memo cache.
//!
//! Values are computed at most once per key and live until explicitly
//! cleared. The factory runs outside the cache lock; if two computations
//! race, the first insert wins and the loser's value is discarded.

use parking_lot::Mutex;
use std::collections::HashMap;
use vigil_core::{RunError, VarValue};

pub(crate) struct MemoCache {
    cap: usize,
    inner: Mutex<HashMap<String, VarValue>>,
}

impl MemoCache {
    pub fn new(cap: usize) -> Self {
        Self { cap: cap.max(1), inner: Mutex::new(HashMap::new()) }
    }

    /// Return the cached value for `key`, computing it on first use.
    pub fn get_or_create(
        &self,
        key: &str,
        factory: impl FnOnce() -> Result<VarValue, RunError>,
    ) -> Result<VarValue, RunError> {
        if let Some(value) = self.inner.lock().get(key) {
            return Ok(value.clone());
        }

        let computed = factory()?;

        let mut map = self.inner.lock();
        if let Some(existing) = map.get(key) {
            // Lost a create race; keep the first writer's value.
            return Ok(existing.clone());
        }
        if map.len() >= self.cap {
            tracing::warn!(key, cap = self.cap, "memo cache full, value not cached");
            return Ok(computed);
        }
        map.insert(key.to_string(), computed.clone());
        Ok(computed)
    }

    /// Remove the entry for `key`; returns whether one existed.
    pub fn clear(&self, key: &str) -> bool {
        self.inner.lock().remove(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }
}

#[cfg(test)]
#[path = "memo_tests.rs"]
mod tests;
