// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Runtime values and their conversion to Rust types.

use crate::config::{METHOD_HANDLE, OBJECT, STRING};
use crate::key::RawComponentKey;
use crate::vm::{FieldHandle, ObjectRef};
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

pub const BOOLEAN: &str = "java/lang/Boolean";
pub const BYTE: &str = "java/lang/Byte";
pub const CHARACTER: &str = "java/lang/Character";
pub const SHORT: &str = "java/lang/Short";
pub const INTEGER: &str = "java/lang/Integer";
pub const LONG: &str = "java/lang/Long";
pub const FLOAT: &str = "java/lang/Float";
pub const DOUBLE: &str = "java/lang/Double";

const NUMBER: &str = "java/lang/Number";
const COMPARABLE: &str = "java/lang/Comparable";
const SERIALIZABLE: &str = "java/io/Serializable";
const CHAR_SEQUENCE: &str = "java/lang/CharSequence";

/// Supertypes of builtin runtime types, `java/lang/Object` excluded.
fn builtin_supertypes(name: &str) -> &'static [&'static str] {
    match name {
        STRING => &[CHAR_SEQUENCE, COMPARABLE, SERIALIZABLE],
        BYTE | SHORT | INTEGER | LONG | FLOAT | DOUBLE => &[NUMBER, COMPARABLE, SERIALIZABLE],
        BOOLEAN | CHARACTER => &[COMPARABLE, SERIALIZABLE],
        NUMBER => &[SERIALIZABLE],
        _ => &[],
    }
}

/// Box type of a primitive descriptor, the type itself otherwise.
pub fn boxed_type_name(ty: &crate::classfile::FieldType) -> Cow<'static, str> {
    use crate::classfile::FieldType;
    match ty {
        FieldType::Boolean => Cow::Borrowed(BOOLEAN),
        FieldType::Byte => Cow::Borrowed(BYTE),
        FieldType::Char => Cow::Borrowed(CHARACTER),
        FieldType::Short => Cow::Borrowed(SHORT),
        FieldType::Int => Cow::Borrowed(INTEGER),
        FieldType::Long => Cow::Borrowed(LONG),
        FieldType::Float => Cow::Borrowed(FLOAT),
        FieldType::Double => Cow::Borrowed(DOUBLE),
        FieldType::Object(name) => Cow::Owned(name.clone()),
        FieldType::Array(_) => Cow::Owned(ty.to_string()),
    }
}

/// A runtime value.
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Byte(i8),
    Short(i16),
    Char(char),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Str(Arc<str>),
    Object(ObjectRef),
    /// Component key, as seen by generated code.
    Key(Arc<RawComponentKey>),
    /// Field read handle.
    Handle(FieldHandle),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Self::Object(obj) => Some(obj),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i32> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Internal name of the runtime type; `None` for null.
    pub fn runtime_type_name(&self) -> Option<&str> {
        Some(match self {
            Self::Null => return None,
            Self::Bool(_) => BOOLEAN,
            Self::Byte(_) => BYTE,
            Self::Short(_) => SHORT,
            Self::Char(_) => CHARACTER,
            Self::Int(_) => INTEGER,
            Self::Long(_) => LONG,
            Self::Float(_) => FLOAT,
            Self::Double(_) => DOUBLE,
            Self::Str(_) => STRING,
            Self::Object(obj) => obj.class_name(),
            Self::Key(_) => crate::config::COMPONENT_KEY,
            Self::Handle(_) => METHOD_HANDLE,
        })
    }

    /// Runtime type name for diagnostics (`null` for null).
    pub fn type_label(&self) -> String {
        self.runtime_type_name().unwrap_or("null").to_string()
    }

    /// Whether this value is a non-null instance of `type_name` (any spelling).
    pub fn is_instance_of(&self, type_name: &str) -> bool {
        let target = crate::names::to_internal_name(type_name);
        if self.is_null() {
            return false;
        }
        if target == OBJECT {
            return true;
        }
        if let Self::Object(obj) = self {
            return obj.class().is_subclass_of(&target);
        }
        match self.runtime_type_name() {
            Some(name) => name == target || builtin_supertypes(name).contains(&target.as_str()),
            None => false,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Byte(a), Self::Byte(b)) => a == b,
            (Self::Short(a), Self::Short(b)) => a == b,
            (Self::Char(a), Self::Char(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Long(a), Self::Long(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a.to_bits() == b.to_bits(),
            (Self::Double(a), Self::Double(b)) => a.to_bits() == b.to_bits(),
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::Object(a), Self::Object(b)) => a.ptr_eq(b),
            (Self::Key(a), Self::Key(b)) => Arc::ptr_eq(a, b),
            (Self::Handle(a), Self::Handle(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(v) => write!(f, "{}", v),
            Self::Byte(v) => write!(f, "{}B", v),
            Self::Short(v) => write!(f, "{}S", v),
            Self::Char(v) => write!(f, "{:?}", v),
            Self::Int(v) => write!(f, "{}", v),
            Self::Long(v) => write!(f, "{}L", v),
            Self::Float(v) => write!(f, "{}F", v),
            Self::Double(v) => write!(f, "{}D", v),
            Self::Str(v) => write!(f, "{:?}", v),
            Self::Object(obj) => write!(f, "{:?}", obj),
            Self::Key(key) => write!(f, "ComponentKey({})", key.field_name()),
            Self::Handle(handle) => write!(f, "handle {}.{}", handle.owner(), handle.name()),
        }
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Str(Arc::from(v))
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Str(Arc::from(v))
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Long(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Double(v)
    }
}

impl From<ObjectRef> for Value {
    fn from(v: ObjectRef) -> Self {
        Self::Object(v)
    }
}

/// Rust type usable as the value type of a component key.
pub trait ComponentValue: Sized + Send + Sync + 'static {
    /// Internal name of the runtime type values of `Self` have.
    fn type_name() -> &'static str;

    fn into_value(self) -> Value;

    /// Convert back; `None` if `value` does not represent a `Self`.
    fn from_value(value: &Value) -> Option<Self>;
}

macro_rules! primitive_component_value {
    ($ty:ty, $variant:ident, $name:expr) => {
        impl ComponentValue for $ty {
            fn type_name() -> &'static str {
                $name
            }

            fn into_value(self) -> Value {
                Value::$variant(self)
            }

            fn from_value(value: &Value) -> Option<Self> {
                match value {
                    Value::$variant(v) => Some(*v),
                    _ => None,
                }
            }
        }
    };
}

primitive_component_value!(bool, Bool, BOOLEAN);
primitive_component_value!(i8, Byte, BYTE);
primitive_component_value!(i16, Short, SHORT);
primitive_component_value!(char, Char, CHARACTER);
primitive_component_value!(i32, Int, INTEGER);
primitive_component_value!(i64, Long, LONG);
primitive_component_value!(f32, Float, FLOAT);
primitive_component_value!(f64, Double, DOUBLE);

impl ComponentValue for String {
    fn type_name() -> &'static str {
        STRING
    }

    fn into_value(self) -> Value {
        Value::from(self)
    }

    fn from_value(value: &Value) -> Option<Self> {
        value.as_str().map(str::to_string)
    }
}

impl ComponentValue for ObjectRef {
    fn type_name() -> &'static str {
        OBJECT
    }

    fn into_value(self) -> Value {
        Value::Object(self)
    }

    fn from_value(value: &Value) -> Option<Self> {
        value.as_object().cloned()
    }
}

/// Untyped access: any value, including null.
impl ComponentValue for Value {
    fn type_name() -> &'static str {
        OBJECT
    }

    fn into_value(self) -> Value {
        self
    }

    fn from_value(value: &Value) -> Option<Self> {
        Some(value.clone())
    }
}

/// Nullable access: null maps to `None`.
impl<T: ComponentValue> ComponentValue for Option<T> {
    fn type_name() -> &'static str {
        T::type_name()
    }

    fn into_value(self) -> Value {
        self.map_or(Value::Null, T::into_value)
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Null => Some(None),
            other => T::from_value(other).map(Some),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classfile::FieldType;

    #[test]
    fn test_builtin_assignability() {
        let s = Value::from("hi");
        assert!(s.is_instance_of("java.lang.String"));
        assert!(s.is_instance_of("java/lang/CharSequence"));
        assert!(s.is_instance_of("Ljava/lang/Object;"));
        assert!(!s.is_instance_of(INTEGER));

        let i = Value::Int(3);
        assert!(i.is_instance_of(INTEGER));
        assert!(i.is_instance_of("java/lang/Number"));
        assert!(!i.is_instance_of(LONG));
        assert!(!Value::Null.is_instance_of(OBJECT));
    }

    #[test]
    fn test_component_value_conversions() {
        assert_eq!(String::from_value(&Value::from("a")), Some("a".to_string()));
        assert_eq!(i32::from_value(&Value::from("a")), None);
        assert_eq!(i64::from_value(&42i64.into_value()), Some(42));
        assert_eq!(Option::<String>::from_value(&Value::Null), Some(None));
        assert_eq!(Option::<i32>::type_name(), INTEGER);
        assert!(None::<i32>.into_value().is_null());
        assert_eq!(Value::from_value(&Value::Int(1)), Some(Value::Int(1)));
    }

    #[test]
    fn test_boxed_type_name() {
        assert_eq!(boxed_type_name(&FieldType::Int), INTEGER);
        assert_eq!(boxed_type_name(&FieldType::object("a.b.C")), "a/b/C");
        assert_eq!(boxed_type_name(&FieldType::Array(Box::new(FieldType::Int))), "[I");
    }

    #[test]
    fn test_float_equality_is_bitwise() {
        assert_eq!(Value::Double(f64::NAN), Value::Double(f64::NAN));
        assert_ne!(Value::Double(0.0), Value::Double(-0.0));
    }
}
