// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Opaque dynamic values for the watched-variable store.
//!
//! Each watched variable has its own semantic type; the store treats
//! values opaquely. Update functions downcast at their boundary via
//! [`VarValue::downcast_ref`].

use std::any::Any;
use std::sync::Arc;
use thiserror::Error;

/// Type-erased envelope for a watched-variable value.
///
/// Cloning is cheap (`Arc` bump). The concrete type name is captured at
/// construction for diagnostics only.
#[derive(Clone)]
pub struct VarValue {
    inner: Arc<dyn Any + Send + Sync>,
    type_name: &'static str,
}

impl VarValue {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self { inner: Arc::new(value), type_name: std::any::type_name::<T>() }
    }

    /// Borrow the contained value as `T`, if that is its concrete type.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.inner.downcast_ref::<T>()
    }

    /// Clone the contained value out of the envelope.
    pub fn extract<T: Any + Clone>(&self) -> Option<T> {
        self.downcast_ref::<T>().cloned()
    }

    pub fn is<T: Any>(&self) -> bool {
        self.inner.is::<T>()
    }

    /// Concrete type name captured at construction (diagnostics only).
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl std::fmt::Debug for VarValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "VarValue<{}>", self.type_name)
    }
}

/// Result of one update-function application.
#[derive(Debug, Clone)]
pub struct VarUpdate {
    pub value: VarValue,
    /// Whether the store should accept `value` as a change.
    pub changed: bool,
}

impl VarUpdate {
    pub fn changed(value: VarValue) -> Self {
        Self { value, changed: true }
    }

    pub fn unchanged(value: VarValue) -> Self {
        Self { value, changed: false }
    }
}

/// Error from an update function; logged and skipped, never fatal.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct UpdateError(pub String);

impl UpdateError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Update function shipped inside a `VarSig`.
///
/// Receives the last-accepted value of the target variable (`None`
/// until initialized) and produces the next value plus a changed flag.
pub type UpdateFn = Arc<dyn Fn(Option<&VarValue>) -> Result<VarUpdate, UpdateError> + Send + Sync>;

/// Build the constant update function used by flow watches: ignores the
/// previous value and unconditionally reports `element` as changed.
pub fn constant_update(element: VarValue) -> UpdateFn {
    Arc::new(move |_prev: Option<&VarValue>| Ok(VarUpdate::changed(element.clone())))
}

#[cfg(test)]
#[path = "value_tests.rs"]
mod tests;
