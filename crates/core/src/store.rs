// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Watched-variable store: name -> last-accepted value.
//!
//! A variable is "initialized" once it has any accepted value. Absent
//! entries read as `None`.

use crate::value::VarValue;
use parking_lot::RwLock;
use std::collections::HashMap;

#[derive(Default)]
pub struct VarStore {
    inner: RwLock<HashMap<String, VarValue>>,
}

impl VarStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current value of `name`, `None` until initialized.
    pub fn get(&self, name: &str) -> Option<VarValue> {
        self.inner.read().get(name).cloned()
    }

    pub fn set(&self, name: impl Into<String>, value: VarValue) {
        self.inner.write().insert(name.into(), value);
    }

    /// Commit a whole batch under one write lock.
    pub fn batch_set(&self, entries: Vec<(String, VarValue)>) {
        if entries.is_empty() {
            return;
        }
        let mut map = self.inner.write();
        for (name, value) in entries {
            map.insert(name, value);
        }
    }

    pub fn clear(&self) {
        self.inner.write().clear();
    }

    /// True when every listed name has an accepted value.
    ///
    /// Vacuously true for an empty list.
    pub fn initialized(&self, names: &[String]) -> bool {
        let map = self.inner.read();
        names.iter().all(|n| map.contains_key(n))
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
