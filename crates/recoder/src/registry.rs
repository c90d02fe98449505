// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Component key registry.
//!
//! Maps each target type to its ordered list of pending keys and tracks, per
//! type, whether the rewrite pass has run. Also holds the bidirectional map
//! between keys and the synthetic field names chosen for them, which
//! generated static initializers use to find their key.
//!
//! Types are sharded in a [`DashMap`]; each type entry has its own lock,
//! held by the rewrite pass for the whole edit of that type, so distinct
//! types rewrite concurrently.

use crate::key::{ComponentKey, KeyId, RawComponentKey};
use crate::value::ComponentValue;
use crate::vm::Class;
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

/// Rewrite progress of one type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RewriteState {
    /// Keys registered, pass not run yet.
    Pending,
    /// Pass applied.
    Rewritten,
    /// Preconditions unmet; the type was left unmodified for good.
    Aborted,
}

#[derive(Debug)]
pub(crate) struct TypeKeys {
    pub(crate) keys: Vec<Arc<RawComponentKey>>,
    pub(crate) state: RewriteState,
}

#[derive(Debug, Default)]
struct NameTable {
    by_name: HashMap<String, Arc<RawComponentKey>>,
    by_key: HashMap<KeyId, String>,
}

/// Registry of component keys.
#[derive(Debug, Default)]
pub struct ComponentKeyRegistry {
    types: DashMap<String, Arc<Mutex<TypeKeys>>>,
    names: RwLock<NameTable>,
}

static GLOBAL: OnceLock<Arc<ComponentKeyRegistry>> = OnceLock::new();

impl ComponentKeyRegistry {
    /// Independent registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide registry.
    pub fn global() -> Arc<ComponentKeyRegistry> {
        Arc::clone(GLOBAL.get_or_init(|| Arc::new(ComponentKeyRegistry::new())))
    }

    /// Register `key` for its target type and return it.
    ///
    /// Registering the same key twice is a no-op. A key registered after its
    /// type was rewritten is kept but never applied.
    pub fn register<T: ComponentValue>(&self, key: ComponentKey<T>) -> ComponentKey<T> {
        self.register_raw(key.raw());
        key
    }

    /// Erased form of [`register`](Self::register).
    pub fn register_raw(&self, key: &Arc<RawComponentKey>) {
        let target = key.target_type_name().to_string();
        let entry = self.entry(&target);
        let mut entry = entry.lock();

        if entry.keys.iter().any(|k| Arc::ptr_eq(k, key)) {
            log::debug!(
                "[registry] {}.{} already registered",
                target,
                key.field_name()
            );
            return;
        }
        if entry
            .keys
            .iter()
            .any(|k| k.field_name() == key.field_name())
        {
            // Two backing fields will be generated; not an error.
            log::debug!(
                "[registry] duplicate component name '{}' on {}",
                key.field_name(),
                target
            );
        }
        if entry.state != RewriteState::Pending {
            log::warn!(
                "[registry] {} already processed ({:?}); component '{}' will not be applied",
                target,
                entry.state,
                key.field_name()
            );
        }

        entry.keys.push(Arc::clone(key));
        entry
            .keys
            .sort_by(|a, b| a.field_name().cmp(b.field_name()));
        log::debug!(
            "[registry] registered {}.{} ({} pending)",
            target,
            key.field_name(),
            entry.keys.len()
        );
    }

    /// Keys of a type, in field-name order. Accepts any name spelling.
    pub fn get_for_class(&self, type_name: &str) -> Vec<Arc<RawComponentKey>> {
        let name = crate::names::to_internal_name(type_name);
        let Some(entry) = self.type_keys(&name) else {
            return Vec::new();
        };
        let keys = entry.lock().keys.clone();
        keys
    }

    /// Keys of a loaded type.
    pub fn get_for_type(&self, class: &Class) -> Vec<Arc<RawComponentKey>> {
        self.get_for_class(class.name())
    }

    /// Rewrite state of a type; `None` if no key was ever registered for it.
    pub fn state_of(&self, type_name: &str) -> Option<RewriteState> {
        let name = crate::names::to_internal_name(type_name);
        let entry = self.types.get(&name).map(|e| Arc::clone(e.value()))?;
        let state = entry.lock().state;
        Some(state)
    }

    /// Number of types with registered keys.
    pub fn type_count(&self) -> usize {
        self.types.len()
    }

    fn entry(&self, internal_name: &str) -> Arc<Mutex<TypeKeys>> {
        Arc::clone(
            self.types
                .entry(internal_name.to_string())
                .or_insert_with(|| {
                    Arc::new(Mutex::new(TypeKeys {
                        keys: Vec::new(),
                        state: RewriteState::Pending,
                    }))
                })
                .value(),
        )
    }

    /// Type entry for the rewrite pass, without creating one.
    pub(crate) fn type_keys(&self, internal_name: &str) -> Option<Arc<Mutex<TypeKeys>>> {
        self.types.get(internal_name).map(|e| Arc::clone(e.value()))
    }

    /// Record the synthetic field name chosen for `key`.
    ///
    /// Returns `false` and leaves the table untouched if the key or the name
    /// is already recorded.
    pub(crate) fn register_name_for_key(&self, key: &Arc<RawComponentKey>, name: &str) -> bool {
        let mut names = self.names.write();
        if names.by_key.contains_key(&key.id()) || names.by_name.contains_key(name) {
            log::warn!(
                "[registry] synthetic name for {}.{} already recorded",
                key.target_type_name(),
                key.field_name()
            );
            return false;
        }
        names.by_key.insert(key.id(), name.to_string());
        names.by_name.insert(name.to_string(), Arc::clone(key));
        true
    }

    /// Key whose backing field is named `name`.
    pub(crate) fn get_key_for_name(&self, name: &str) -> Option<Arc<RawComponentKey>> {
        self.names.read().by_name.get(name).cloned()
    }

    /// Synthetic field name recorded for `key`.
    pub(crate) fn get_name_for_key(&self, key: &RawComponentKey) -> Option<String> {
        self.names.read().by_key.get(&key.id()).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    fn key(field: &str) -> ComponentKey<Value> {
        ComponentKey::typed(field, "com/example/Point")
    }

    #[test]
    fn test_sorted_by_field_name() {
        let registry = ComponentKeyRegistry::new();
        for field in ["zeta", "alpha", "mid"] {
            registry.register(key(field));
        }
        let names: Vec<_> = registry
            .get_for_class("com.example.Point")
            .iter()
            .map(|k| k.field_name().to_string())
            .collect();
        assert_eq!(names, vec!["alpha", "mid", "zeta"]);
        assert_eq!(registry.state_of("Lcom/example/Point;"), Some(RewriteState::Pending));
    }

    #[test]
    fn test_same_key_twice_ignored() {
        let registry = ComponentKeyRegistry::new();
        let k = registry.register(key("a"));
        registry.register(k.clone());
        assert_eq!(registry.get_for_class("com/example/Point").len(), 1);

        // Distinct keys with the same name are both kept.
        registry.register(key("a"));
        assert_eq!(registry.get_for_class("com/example/Point").len(), 2);
    }

    #[test]
    fn test_unknown_type_is_empty() {
        let registry = ComponentKeyRegistry::new();
        assert!(registry.get_for_class("Nope").is_empty());
        assert_eq!(registry.state_of("Nope"), None);
        assert_eq!(registry.type_count(), 0);
    }

    #[test]
    fn test_snapshot_is_detached() {
        let registry = ComponentKeyRegistry::new();
        registry.register(key("a"));
        let mut snapshot = registry.get_for_class("com/example/Point");
        snapshot.clear();
        assert_eq!(registry.get_for_class("com/example/Point").len(), 1);
    }

    #[test]
    fn test_name_table_bidirectional_and_once() {
        let registry = ComponentKeyRegistry::new();
        let k = registry.register(key("a"));
        assert!(registry.register_name_for_key(k.raw(), "keyedField-1"));
        assert!(!registry.register_name_for_key(k.raw(), "keyedField-2"));
        let found = registry.get_key_for_name("keyedField-1").expect("key");
        assert!(Arc::ptr_eq(&found, k.raw()));
        assert_eq!(
            registry.get_name_for_key(k.raw()).as_deref(),
            Some("keyedField-1")
        );
        assert!(registry.get_key_for_name("keyedField-2").is_none());
    }

    #[test]
    fn test_global_is_shared() {
        let a = ComponentKeyRegistry::global();
        let b = ComponentKeyRegistry::global();
        assert!(Arc::ptr_eq(&a, &b));
    }
}
