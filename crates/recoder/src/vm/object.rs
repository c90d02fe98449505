// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Heap objects and field handles.

use super::Class;
use crate::value::Value;
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;

/// Heap instance of a linked class.
pub struct Object {
    class: Arc<Class>,
    fields: RwLock<Vec<Value>>,
}

/// Shared reference to a heap object. Equality is identity.
#[derive(Clone)]
pub struct ObjectRef(Arc<Object>);

impl ObjectRef {
    /// Allocate an instance with every field at its default value.
    pub(crate) fn alloc(class: Arc<Class>) -> Self {
        let fields = class.field_defaults();
        Self(Arc::new(Object {
            class,
            fields: RwLock::new(fields),
        }))
    }

    pub fn class(&self) -> &Arc<Class> {
        &self.0.class
    }

    pub fn class_name(&self) -> &str {
        self.0.class.name()
    }

    /// Read a field slot.
    pub fn field(&self, slot: usize) -> Option<Value> {
        self.0.fields.read().get(slot).cloned()
    }

    /// Read a field by name.
    pub fn field_by_name(&self, name: &str) -> Option<Value> {
        self.0.class.field_slot(name).and_then(|slot| self.field(slot))
    }

    pub(crate) fn set_field(&self, slot: usize, value: Value) -> bool {
        match self.0.fields.write().get_mut(slot) {
            Some(cell) => {
                *cell = value;
                true
            }
            None => false,
        }
    }

    /// Identity hash, stable for the object's lifetime.
    pub fn identity_hash(&self) -> i32 {
        let addr = Arc::as_ptr(&self.0) as usize as u64;
        ((addr >> 4) ^ (addr >> 36)) as i32
    }

    pub fn ptr_eq(&self, other: &ObjectRef) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for ObjectRef {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{:x}", self.class_name(), self.identity_hash())
    }
}

/// Read handle for one instance field, the accessor bound into component keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldHandle {
    owner: String,
    name: String,
    slot: usize,
}

impl FieldHandle {
    pub(crate) fn new(owner: impl Into<String>, name: impl Into<String>, slot: usize) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
            slot,
        }
    }

    /// Internal name of the declaring class.
    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Read the field from `object`; `None` if the object is not an instance of the owner.
    pub fn read(&self, object: &ObjectRef) -> Option<Value> {
        if !object.class().is_subclass_of(&self.owner) {
            return None;
        }
        object.field(self.slot)
    }
}
