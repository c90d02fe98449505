// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Thread-scoped staging of the next component value.
//!
//! Each thread sees only its own staged value. A value queued on one thread
//! is invisible to a construction running on another: that construction
//! falls back to the default.
//!
//! Entries are keyed by [`ThreadId`] and removed when the value is taken. A
//! thread that stages a value and exits without constructing leaves its entry
//! behind, since thread ids are never reused; such threads should call
//! [`RawComponentKey::clear_next`](crate::key::RawComponentKey::clear_next)
//! before exiting.

use crate::value::Value;
use dashmap::DashMap;
use std::fmt;
use std::sync::Arc;
use std::thread::{self, ThreadId};

/// Supplier of the value used when nothing is staged.
pub type DefaultSupplier = Arc<dyn Fn() -> Value + Send + Sync>;

pub(crate) struct StagingSlot {
    staged: DashMap<ThreadId, Value>,
    default: DefaultSupplier,
}

impl StagingSlot {
    pub(crate) fn new(default: DefaultSupplier) -> Self {
        Self {
            staged: DashMap::new(),
            default,
        }
    }

    /// Stage `value` for the calling thread, replacing any earlier one.
    pub(crate) fn stage(&self, value: Value) {
        self.staged.insert(thread::current().id(), value);
    }

    /// Take the calling thread's value, or the default.
    pub(crate) fn take(&self) -> Value {
        match self.staged.remove(&thread::current().id()) {
            Some((_, value)) => value,
            None => (self.default)(),
        }
    }

    /// Remove the calling thread's entry.
    pub(crate) fn clear(&self) {
        self.staged.remove(&thread::current().id());
    }

    pub(crate) fn staged_threads(&self) -> usize {
        self.staged.len()
    }

    /// Calling thread's staged value, if any.
    pub(crate) fn peek(&self) -> Option<Value> {
        self.staged
            .get(&thread::current().id())
            .map(|entry| entry.value().clone())
    }

    pub(crate) fn default_value(&self) -> Value {
        (self.default)()
    }
}

impl fmt::Debug for StagingSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StagingSlot")
            .field("staged_threads", &self.staged_threads())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot() -> StagingSlot {
        StagingSlot::new(Arc::new(|| Value::from("none")))
    }

    #[test]
    fn test_take_is_read_once() {
        let slot = slot();
        slot.stage(Value::from("hi"));
        assert_eq!(slot.peek(), Some(Value::from("hi")));
        assert_eq!(slot.take(), Value::from("hi"));
        assert_eq!(slot.take(), Value::from("none"));
        assert_eq!(slot.peek(), None);
    }

    #[test]
    fn test_stage_replaces() {
        let slot = slot();
        slot.stage(Value::from("a"));
        slot.stage(Value::from("b"));
        assert_eq!(slot.take(), Value::from("b"));
    }

    #[test]
    fn test_clear_releases_exiting_thread_entry() {
        let slot = slot();
        thread::scope(|s| {
            s.spawn(|| {
                slot.stage(Value::from("abandoned"));
                slot.clear();
            });
            s.spawn(|| slot.stage(Value::from("leaked")));
        });
        assert_eq!(slot.staged_threads(), 1);
        assert_eq!(slot.take(), Value::from("none"));
    }

    #[test]
    fn test_other_thread_sees_default() {
        let slot = slot();
        slot.stage(Value::from("mine"));
        thread::scope(|s| {
            s.spawn(|| assert_eq!(slot.take(), Value::from("none")));
        });
        assert_eq!(slot.take(), Value::from("mine"));
    }
}
