// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Component keys.
//!
//! A [`ComponentKey<T>`] is the runtime handle for one externally declared
//! component of a record type. It is created and registered before the type
//! is linked; once the rewrite pass has run and the type's static initializer
//! has bound the accessor, it reads the component from instances and stages
//! the value the next construction on the calling thread will store.
//!
//! The typed handle is a thin wrapper over an erased [`RawComponentKey`],
//! which is what the registry and generated code deal with.

mod staging;

pub use staging::DefaultSupplier;

use crate::value::{ComponentValue, Value};
use crate::vm::FieldHandle;
use staging::StagingSlot;
use std::fmt;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use thiserror::Error;

/// Component key errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    #[error("instance of {found} is not a {target}")]
    KeyMismatch { target: String, found: String },

    #[error("component '{field}' of {target} is not bound: type not rewritten or not initialized")]
    UnboundAccessor { field: String, target: String },

    #[error("value of type {found} is not assignable to component '{field}' of type {expected}")]
    InvalidComponentValue {
        field: String,
        expected: String,
        found: String,
    },

    #[error("cannot read component '{field}' of a null instance")]
    NullInstance { field: String },

    #[error("component '{field}' holds a {found}, expected {expected}")]
    UnexpectedValue {
        field: String,
        expected: String,
        found: String,
    },

    #[error("accessor of component '{field}' of {target} is already bound")]
    AccessorAlreadyBound { field: String, target: String },
}

static NEXT_KEY_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique key identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KeyId(u64);

/// Type-erased component key.
pub struct RawComponentKey {
    id: KeyId,
    field_name: String,
    target_type_name: String,
    component_type_name: String,
    component_type: OnceLock<String>,
    accessor: OnceLock<FieldHandle>,
    staging: StagingSlot,
}

/// Resolve a component type name in any spelling to the runtime type name
/// its values have. Primitives resolve to their box.
fn resolve_component_type(name: &str) -> String {
    use crate::classfile::FieldType;
    let primitive = match name {
        "boolean" | "Z" => Some(FieldType::Boolean),
        "byte" | "B" => Some(FieldType::Byte),
        "char" | "C" => Some(FieldType::Char),
        "short" | "S" => Some(FieldType::Short),
        "int" | "I" => Some(FieldType::Int),
        "long" | "J" => Some(FieldType::Long),
        "float" | "F" => Some(FieldType::Float),
        "double" | "D" => Some(FieldType::Double),
        _ => None,
    };
    match primitive {
        Some(ty) => crate::value::boxed_type_name(&ty).into_owned(),
        None if name.starts_with('[') => name.replace('.', "/"),
        None => crate::names::to_internal_name(name),
    }
}

impl RawComponentKey {
    pub fn new(
        field_name: &str,
        target_type_name: &str,
        component_type_name: &str,
        default: DefaultSupplier,
    ) -> Self {
        Self {
            id: KeyId(NEXT_KEY_ID.fetch_add(1, Ordering::Relaxed)),
            field_name: field_name.to_string(),
            target_type_name: crate::names::to_internal_name(target_type_name),
            component_type_name: component_type_name.to_string(),
            component_type: OnceLock::new(),
            accessor: OnceLock::new(),
            staging: StagingSlot::new(default),
        }
    }

    pub fn id(&self) -> KeyId {
        self.id
    }

    /// Public-facing component name.
    pub fn field_name(&self) -> &str {
        &self.field_name
    }

    /// Internal name of the type this component attaches to.
    pub fn target_type_name(&self) -> &str {
        &self.target_type_name
    }

    /// Component type as declared.
    pub fn component_type_name(&self) -> &str {
        &self.component_type_name
    }

    /// Runtime type of component values, resolved on first use.
    pub fn component_type(&self) -> &str {
        self.component_type
            .get_or_init(|| resolve_component_type(&self.component_type_name))
    }

    /// Whether the accessor has been bound.
    pub fn is_bound(&self) -> bool {
        self.accessor.get().is_some()
    }

    /// Read the stored component value from `instance`.
    pub fn get_value(&self, instance: &Value) -> Result<Value, KeyError> {
        let object = match instance {
            Value::Null => {
                return Err(KeyError::NullInstance {
                    field: self.field_name.clone(),
                })
            }
            Value::Object(obj) if obj.class().is_subclass_of(&self.target_type_name) => obj,
            other => {
                return Err(KeyError::KeyMismatch {
                    target: self.target_type_name.clone(),
                    found: other.type_label(),
                })
            }
        };
        let accessor = self.accessor.get().ok_or_else(|| KeyError::UnboundAccessor {
            field: self.field_name.clone(),
            target: self.target_type_name.clone(),
        })?;
        accessor.read(object).ok_or_else(|| KeyError::KeyMismatch {
            target: accessor.owner().to_string(),
            found: object.class_name().to_string(),
        })
    }

    /// Stage `value` for the next construction on the calling thread.
    ///
    /// A rejected value leaves the thread's staged value unchanged.
    pub fn queue_value(&self, value: Value) -> Result<(), KeyError> {
        self.check_value(&value)?;
        self.staging.stage(value);
        Ok(())
    }

    /// Whether `value` could be staged, without staging it.
    pub fn check_value(&self, value: &Value) -> Result<(), KeyError> {
        if value.is_instance_of(self.component_type()) {
            return Ok(());
        }
        Err(KeyError::InvalidComponentValue {
            field: self.field_name.clone(),
            expected: self.component_type().to_string(),
            found: value.type_label(),
        })
    }

    /// Drop the calling thread's staged value, if any.
    pub fn clear_next(&self) {
        self.staging.clear();
    }

    /// Take the calling thread's staged value, or the default. Read-once.
    pub(crate) fn get_next(&self) -> Value {
        self.staging.take()
    }

    /// Calling thread's staged value without consuming it.
    pub fn peek_next(&self) -> Option<Value> {
        self.staging.peek()
    }

    /// Value a construction without staging stores.
    pub fn default_value(&self) -> Value {
        self.staging.default_value()
    }

    /// Bind the accessor. Called once from the rewritten type's static initializer.
    pub(crate) fn provide_getter(&self, handle: FieldHandle) -> Result<(), KeyError> {
        self.accessor
            .set(handle)
            .map_err(|_| KeyError::AccessorAlreadyBound {
                field: self.field_name.clone(),
                target: self.target_type_name.clone(),
            })?;
        log::debug!(
            "[recoder] bound accessor for {}.{}",
            self.target_type_name,
            self.field_name
        );
        Ok(())
    }
}

impl fmt::Debug for RawComponentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentKey")
            .field("id", &self.id.0)
            .field("field_name", &self.field_name)
            .field("target", &self.target_type_name)
            .field("component_type", &self.component_type_name)
            .field("bound", &self.is_bound())
            .finish()
    }
}

/// Typed component key.
pub struct ComponentKey<T> {
    raw: Arc<RawComponentKey>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for ComponentKey<T> {
    fn clone(&self) -> Self {
        Self {
            raw: Arc::clone(&self.raw),
            _marker: PhantomData,
        }
    }
}

impl<T> fmt::Debug for ComponentKey<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.raw, f)
    }
}

impl<T> PartialEq for ComponentKey<T> {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.raw, &other.raw)
    }
}

impl<T> Eq for ComponentKey<T> {}

impl<T: ComponentValue> ComponentKey<T> {
    fn with_supplier_value(
        field_name: &str,
        target: &str,
        component_type: &str,
        default: DefaultSupplier,
    ) -> Self {
        Self {
            raw: Arc::new(RawComponentKey::new(field_name, target, component_type, default)),
            _marker: PhantomData,
        }
    }

    /// Key whose default is null.
    pub fn create(field_name: &str, target: &str, component_type: &str) -> Self {
        Self::with_supplier_value(field_name, target, component_type, Arc::new(|| Value::Null))
    }

    /// Key with a fixed default.
    pub fn create_with_default(
        field_name: &str,
        target: &str,
        component_type: &str,
        default: T,
    ) -> Self
    where
        T: Clone,
    {
        let key = Self::create_with_supplier(field_name, target, component_type, move || {
            default.clone()
        });
        let sample = key.raw.default_value();
        if !sample.is_null() && !sample.is_instance_of(key.raw.component_type()) {
            log::warn!(
                "[recoder] default of {}.{} is a {}, not a {}",
                key.raw.target_type_name(),
                field_name,
                sample.type_label(),
                key.raw.component_type()
            );
        }
        key
    }

    /// Key whose default is computed per construction.
    pub fn create_with_supplier<F>(
        field_name: &str,
        target: &str,
        component_type: &str,
        supplier: F,
    ) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self::with_supplier_value(
            field_name,
            target,
            component_type,
            Arc::new(move || supplier().into_value()),
        )
    }

    /// Key whose component type is `T`'s runtime type; default null.
    pub fn typed(field_name: &str, target: &str) -> Self {
        Self::create(field_name, target, T::type_name())
    }

    /// Key whose component type is `T`'s runtime type, with a fixed default.
    pub fn typed_with_default(field_name: &str, target: &str, default: T) -> Self
    where
        T: Clone,
    {
        Self::create_with_default(field_name, target, T::type_name(), default)
    }

    pub fn raw(&self) -> &Arc<RawComponentKey> {
        &self.raw
    }

    pub fn field_name(&self) -> &str {
        self.raw.field_name()
    }

    pub fn target_type_name(&self) -> &str {
        self.raw.target_type_name()
    }

    pub fn component_type(&self) -> &str {
        self.raw.component_type()
    }

    pub fn is_bound(&self) -> bool {
        self.raw.is_bound()
    }

    /// Read the component from `instance`.
    ///
    /// # Errors
    ///
    /// - [`KeyError::NullInstance`] for null
    /// - [`KeyError::KeyMismatch`] if the instance is not of the target type
    /// - [`KeyError::UnboundAccessor`] before the type is rewritten and initialized
    /// - [`KeyError::UnexpectedValue`] if the stored value is not a `T`
    pub fn get(&self, instance: &Value) -> Result<T, KeyError> {
        let value = self.raw.get_value(instance)?;
        T::from_value(&value).ok_or_else(|| KeyError::UnexpectedValue {
            field: self.raw.field_name.clone(),
            expected: T::type_name().to_string(),
            found: value.type_label(),
        })
    }

    /// Like [`get`](Self::get), with mismatched or null instances and stored
    /// nulls reported as `None`.
    pub fn get_or_null(&self, instance: &Value) -> Result<Option<T>, KeyError> {
        let value = match self.raw.get_value(instance) {
            Ok(value) => value,
            Err(KeyError::KeyMismatch { .. } | KeyError::NullInstance { .. }) => return Ok(None),
            Err(err) => return Err(err),
        };
        if value.is_null() {
            return Ok(None);
        }
        T::from_value(&value)
            .map(Some)
            .ok_or_else(|| KeyError::UnexpectedValue {
                field: self.raw.field_name.clone(),
                expected: T::type_name().to_string(),
                found: value.type_label(),
            })
    }

    /// Optional-returning read; same outcomes as [`get_or_null`](Self::get_or_null).
    pub fn get_optional(&self, instance: &Value) -> Result<Option<T>, KeyError> {
        self.get_or_null(instance)
    }

    /// Stage `value` for the next construction of the target type on this thread.
    ///
    /// # Errors
    ///
    /// [`KeyError::InvalidComponentValue`] if `value` is null or not of the
    /// component type; the previously staged value is kept.
    pub fn queue_next(&self, value: T) -> Result<(), KeyError> {
        self.raw.queue_value(value.into_value())
    }
}

impl<T> From<ComponentKey<T>> for Arc<RawComponentKey> {
    fn from(key: ComponentKey<T>) -> Self {
        key.raw
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_component_type_resolution() {
        assert_eq!(resolve_component_type("int"), "java/lang/Integer");
        assert_eq!(resolve_component_type("J"), "java/lang/Long");
        assert_eq!(resolve_component_type("java.lang.String"), "java/lang/String");
        assert_eq!(resolve_component_type("Ljava/lang/String;"), "java/lang/String");
        assert_eq!(resolve_component_type("[I"), "[I");
    }

    #[test]
    fn test_names_normalized() {
        let key: ComponentKey<String> =
            ComponentKey::create("label", "com.example.Point", "java.lang.String");
        assert_eq!(key.target_type_name(), "com/example/Point");
        assert_eq!(key.component_type(), "java/lang/String");
        assert!(!key.is_bound());
    }

    #[test]
    fn test_get_before_binding() {
        let key: ComponentKey<String> = ComponentKey::typed("label", "Point");
        assert!(matches!(
            key.get(&Value::Null),
            Err(KeyError::NullInstance { .. })
        ));
        assert!(matches!(
            key.get(&Value::from("not an object")),
            Err(KeyError::KeyMismatch { .. })
        ));
        assert_eq!(key.get_or_null(&Value::Null), Ok(None));
        assert_eq!(key.get_optional(&Value::Int(1)), Ok(None));
    }

    #[test]
    fn test_queue_rejects_wrong_type_and_keeps_staged() {
        let key: ComponentKey<Value> = ComponentKey::create("label", "Point", "java.lang.String");
        key.queue_next(Value::from("kept")).unwrap();
        let err = key.queue_next(Value::Int(3)).unwrap_err();
        assert!(matches!(err, KeyError::InvalidComponentValue { .. }));
        assert!(matches!(
            key.queue_next(Value::Null),
            Err(KeyError::InvalidComponentValue { .. })
        ));
        assert_eq!(key.raw().get_next(), Value::from("kept"));
        assert!(key.raw().get_next().is_null());
    }

    #[test]
    fn test_check_value_does_not_stage() {
        let key: ComponentKey<Value> = ComponentKey::create("label", "Point", "java.lang.String");
        key.raw().check_value(&Value::from("ok")).unwrap();
        assert!(key.raw().peek_next().is_none());
        assert!(matches!(
            key.raw().check_value(&Value::Null),
            Err(KeyError::InvalidComponentValue { .. })
        ));
    }

    #[test]
    fn test_clear_next_drops_staged_value() {
        let key: ComponentKey<String> =
            ComponentKey::typed_with_default("label", "Point", "none".to_string());
        key.queue_next("staged".to_string()).unwrap();
        key.raw().clear_next();
        assert!(key.raw().peek_next().is_none());
        assert_eq!(key.raw().get_next(), Value::from("none"));
    }

    #[test]
    fn test_supplier_called_per_take() {
        use std::sync::atomic::AtomicI32;
        let counter = Arc::new(AtomicI32::new(0));
        let c = Arc::clone(&counter);
        let key: ComponentKey<i32> = ComponentKey::create_with_supplier("n", "Point", "int", move || {
            c.fetch_add(1, Ordering::SeqCst)
        });
        assert_eq!(key.raw().get_next(), Value::Int(0));
        assert_eq!(key.raw().get_next(), Value::Int(1));
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_provide_getter_once() {
        let key: ComponentKey<String> = ComponentKey::typed("label", "Point");
        key.raw()
            .provide_getter(FieldHandle::new("Point", "f", 0))
            .unwrap();
        assert!(key.is_bound());
        assert!(matches!(
            key.raw().provide_getter(FieldHandle::new("Point", "f", 0)),
            Err(KeyError::AccessorAlreadyBound { .. })
        ));
    }

    #[test]
    fn test_ids_unique() {
        let a: ComponentKey<Value> = ComponentKey::typed("a", "T");
        let b: ComponentKey<Value> = ComponentKey::typed("a", "T");
        assert_ne!(a.raw().id(), b.raw().id());
        assert_ne!(a, b);
        assert_eq!(a.clone(), a);
    }
}
