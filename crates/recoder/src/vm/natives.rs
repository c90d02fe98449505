// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Native methods and record derived-method semantics.
//!
//! Hashes and string forms follow the platform conventions records are
//! specified against, so derived values match what the same record would
//! produce on a JVM.

use super::{Runtime, VmError};
use crate::classfile::{MethodRef, ObjectMethod, ObjectMethodsCall};
use crate::config::{
    CHECK_VALUE, COMPONENT_KEY, COMPONENT_KEY_REGISTRY, GET_KEY_FOR_NAME, GET_NEXT, INIT,
    OBJECT, PROVIDE_GETTER, QUEUE_NEXT, RECORD,
};
use crate::value::Value;
use std::sync::Arc;

pub(super) type Native = fn(&Runtime, Vec<Value>) -> Result<Option<Value>, VmError>;

/// Native implementation of `target`, if it has one.
pub(super) fn lookup(target: &MethodRef) -> Option<Native> {
    match (target.owner.as_str(), target.name.as_str()) {
        (RECORD | OBJECT, INIT) => Some(base_init),
        (COMPONENT_KEY_REGISTRY, GET_KEY_FOR_NAME) => Some(get_key_for_name),
        (COMPONENT_KEY, PROVIDE_GETTER) => Some(provide_getter),
        (COMPONENT_KEY, CHECK_VALUE) => Some(check_value),
        (COMPONENT_KEY, QUEUE_NEXT) => Some(queue_next),
        (COMPONENT_KEY, GET_NEXT) => Some(get_next),
        _ => None,
    }
}

fn base_init(_: &Runtime, _: Vec<Value>) -> Result<Option<Value>, VmError> {
    Ok(None)
}

fn arg<'a>(args: &'a [Value], index: usize, method: &str) -> Result<&'a Value, VmError> {
    args.get(index).ok_or_else(|| VmError::StackUnderflow {
        method: method.to_string(),
    })
}

fn key_receiver<'a>(
    args: &'a [Value],
    method: &str,
) -> Result<&'a Arc<crate::key::RawComponentKey>, VmError> {
    match arg(args, 0, method)? {
        Value::Key(key) => Ok(key),
        Value::Null => Err(VmError::NullPointer {
            context: method.to_string(),
        }),
        other => Err(VmError::TypeMismatch {
            expected: "component key",
            found: other.type_label(),
            context: method.to_string(),
        }),
    }
}

fn get_key_for_name(rt: &Runtime, args: Vec<Value>) -> Result<Option<Value>, VmError> {
    let name = match arg(&args, 0, GET_KEY_FOR_NAME)? {
        Value::Str(name) => name.clone(),
        other => {
            return Err(VmError::TypeMismatch {
                expected: "string",
                found: other.type_label(),
                context: GET_KEY_FOR_NAME.into(),
            })
        }
    };
    rt.registry()
        .get_key_for_name(&name)
        .map(|key| Some(Value::Key(key)))
        .ok_or_else(|| VmError::UnknownKey(name.to_string()))
}

fn provide_getter(_: &Runtime, args: Vec<Value>) -> Result<Option<Value>, VmError> {
    let key = key_receiver(&args, PROVIDE_GETTER)?;
    match arg(&args, 1, PROVIDE_GETTER)? {
        Value::Handle(handle) => {
            key.provide_getter(handle.clone())?;
            Ok(None)
        }
        other => Err(VmError::TypeMismatch {
            expected: "field handle",
            found: other.type_label(),
            context: PROVIDE_GETTER.into(),
        }),
    }
}

fn check_value(_: &Runtime, args: Vec<Value>) -> Result<Option<Value>, VmError> {
    let key = key_receiver(&args, CHECK_VALUE)?;
    key.check_value(arg(&args, 1, CHECK_VALUE)?)?;
    Ok(None)
}

fn queue_next(_: &Runtime, args: Vec<Value>) -> Result<Option<Value>, VmError> {
    let key = key_receiver(&args, QUEUE_NEXT)?;
    key.queue_value(arg(&args, 1, QUEUE_NEXT)?.clone())?;
    Ok(None)
}

fn get_next(_: &Runtime, args: Vec<Value>) -> Result<Option<Value>, VmError> {
    let key = key_receiver(&args, GET_NEXT)?;
    Ok(Some(key.get_next()))
}

// =======================================================================
// Platform value conventions
// =======================================================================

/// `String.hashCode` over UTF-16 code units.
pub(crate) fn string_hash(s: &str) -> i32 {
    s.encode_utf16()
        .fold(0i32, |h, unit| h.wrapping_mul(31).wrapping_add(i32::from(unit)))
}

fn float_bits(v: f32) -> i32 {
    if v.is_nan() {
        0x7fc0_0000
    } else {
        v.to_bits() as i32
    }
}

fn long_hash(v: i64) -> i32 {
    let bits = v as u64;
    (bits ^ (bits >> 32)) as i32
}

fn double_hash(v: f64) -> i32 {
    let bits = if v.is_nan() {
        0x7ff8_0000_0000_0000
    } else {
        v.to_bits()
    };
    (bits ^ (bits >> 32)) as i32
}

/// Decimal text of a floating point value: `plain` and `exp` are the
/// shortest round-trip renderings of the same number.
fn float_text(plain: String, exp: String, magnitude: f64, nan: bool, negative: bool) -> String {
    if nan {
        return "NaN".into();
    }
    if magnitude.is_infinite() {
        return if negative { "-Infinity" } else { "Infinity" }.into();
    }
    if magnitude == 0.0 || (1e-3..1e7).contains(&magnitude) {
        if plain.contains('.') {
            plain
        } else {
            format!("{}.0", plain)
        }
    } else {
        let (mantissa, exponent) = exp.split_once('e').unwrap_or((exp.as_str(), "0"));
        if mantissa.contains('.') {
            format!("{}E{}", mantissa, exponent)
        } else {
            format!("{}.0E{}", mantissa, exponent)
        }
    }
}

fn double_text(v: f64) -> String {
    float_text(
        format!("{}", v),
        format!("{:e}", v),
        v.abs(),
        v.is_nan(),
        v.is_sign_negative(),
    )
}

fn single_text(v: f32) -> String {
    float_text(
        format!("{}", v),
        format!("{:e}", v),
        f64::from(v.abs()),
        v.is_nan(),
        v.is_sign_negative(),
    )
}

/// Hash of a non-object value.
fn primitive_hash(value: &Value) -> i32 {
    match value {
        Value::Null => 0,
        Value::Bool(true) => 1231,
        Value::Bool(false) => 1237,
        Value::Byte(v) => i32::from(*v),
        Value::Short(v) => i32::from(*v),
        Value::Char(v) => *v as i32,
        Value::Int(v) => *v,
        Value::Long(v) => long_hash(*v),
        Value::Float(v) => float_bits(*v),
        Value::Double(v) => double_hash(*v),
        Value::Str(s) => string_hash(s),
        Value::Object(obj) => obj.identity_hash(),
        Value::Key(key) => (Arc::as_ptr(key) as usize >> 4) as i32,
        Value::Handle(handle) => string_hash(handle.name()),
    }
}

/// String form of a non-object value.
fn primitive_text(value: &Value) -> String {
    match value {
        Value::Null => "null".into(),
        Value::Bool(v) => v.to_string(),
        Value::Byte(v) => v.to_string(),
        Value::Short(v) => v.to_string(),
        Value::Char(v) => v.to_string(),
        Value::Int(v) => v.to_string(),
        Value::Long(v) => v.to_string(),
        Value::Float(v) => single_text(*v),
        Value::Double(v) => double_text(*v),
        Value::Str(s) => s.to_string(),
        Value::Object(obj) => format!(
            "{}@{:x}",
            crate::names::to_binary_name(obj.class_name()),
            obj.identity_hash()
        ),
        Value::Key(key) => format!("ComponentKey[{}]", key.field_name()),
        Value::Handle(handle) => format!("MethodHandle[{}.{}]", handle.owner(), handle.name()),
    }
}

/// `Float.compare == 0` style equality for non-objects.
fn primitive_equals(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Float(x), Value::Float(y)) => float_bits(*x) == float_bits(*y),
        (Value::Double(x), Value::Double(y)) => {
            (x.is_nan() && y.is_nan()) || x.to_bits() == y.to_bits()
        }
        _ => a == b,
    }
}

/// `equals`, `hashCode` or `toString` of a value whose class does not define it.
pub(super) fn object_default(
    _: &Runtime,
    target: &MethodRef,
    args: &[Value],
    _depth: usize,
) -> Result<Option<Value>, VmError> {
    let Some(receiver) = args.first() else {
        return Ok(None);
    };
    for method in ObjectMethod::ALL {
        if target.name == method.method_name() && target.descriptor == method.method_descriptor() {
            let result = match method {
                ObjectMethod::Equals => {
                    let other = arg(args, 1, "equals")?;
                    Value::Bool(primitive_equals(receiver, other))
                }
                ObjectMethod::HashCode => Value::Int(primitive_hash(receiver)),
                ObjectMethod::ToString => Value::from(primitive_text(receiver)),
            };
            return Ok(Some(result));
        }
    }
    Ok(None)
}

fn value_hash(rt: &Runtime, value: &Value, depth: usize) -> Result<i32, VmError> {
    match value {
        Value::Object(_) => {
            let target = MethodRef::new(
                crate::classfile::InvokeKind::Virtual,
                OBJECT,
                ObjectMethod::HashCode.method_name(),
                ObjectMethod::HashCode.method_descriptor(),
            );
            match rt.invoke(&target, vec![value.clone()], depth + 1)? {
                Some(Value::Int(h)) => Ok(h),
                other => Err(unexpected_result("hashCode", other)),
            }
        }
        other => Ok(primitive_hash(other)),
    }
}

fn value_text(rt: &Runtime, value: &Value, depth: usize) -> Result<String, VmError> {
    match value {
        Value::Object(_) => {
            let target = MethodRef::new(
                crate::classfile::InvokeKind::Virtual,
                OBJECT,
                ObjectMethod::ToString.method_name(),
                ObjectMethod::ToString.method_descriptor(),
            );
            match rt.invoke(&target, vec![value.clone()], depth + 1)? {
                Some(Value::Str(s)) => Ok(s.to_string()),
                other => Err(unexpected_result("toString", other)),
            }
        }
        other => Ok(primitive_text(other)),
    }
}

fn value_equals(rt: &Runtime, a: &Value, b: &Value, depth: usize) -> Result<bool, VmError> {
    match (a, b) {
        (Value::Object(x), Value::Object(y)) if x.ptr_eq(y) => Ok(true),
        (Value::Object(_), Value::Null) | (Value::Null, Value::Object(_)) => Ok(false),
        (Value::Object(_), _) => {
            let target = MethodRef::new(
                crate::classfile::InvokeKind::Virtual,
                OBJECT,
                ObjectMethod::Equals.method_name(),
                ObjectMethod::Equals.method_descriptor(),
            );
            match rt.invoke(&target, vec![a.clone(), b.clone()], depth + 1)? {
                Some(Value::Bool(eq)) => Ok(eq),
                other => Err(unexpected_result("equals", other)),
            }
        }
        _ => Ok(primitive_equals(a, b)),
    }
}

fn unexpected_result(context: &str, found: Option<Value>) -> VmError {
    VmError::TypeMismatch {
        expected: "a derived-method result",
        found: found.map_or_else(|| "void".to_string(), |v| v.type_label()),
        context: context.to_string(),
    }
}

fn read_getters(
    call: &ObjectMethodsCall,
    object: &super::ObjectRef,
) -> Result<Vec<Value>, VmError> {
    call.getters
        .iter()
        .map(|getter| {
            object
                .field_by_name(&getter.name)
                .ok_or_else(|| VmError::NoSuchField {
                    class: object.class_name().to_string(),
                    name: getter.name.clone(),
                })
        })
        .collect()
}

/// Execute a derived-method dispatch. `args` is the receiver, plus the
/// other object for equals.
pub(super) fn object_methods(
    rt: &Runtime,
    call: &ObjectMethodsCall,
    args: &[Value],
    depth: usize,
) -> Result<Value, VmError> {
    let context = format!("{} {}", call.method, call.record);
    let receiver = match arg(args, 0, &context)? {
        Value::Object(obj) => obj,
        Value::Null => return Err(VmError::NullPointer { context }),
        other => {
            return Err(VmError::TypeMismatch {
                expected: "record instance",
                found: other.type_label(),
                context,
            })
        }
    };
    let values = read_getters(call, receiver)?;

    match call.method {
        ObjectMethod::ToString => {
            let names = call.component_names();
            let mut parts = Vec::with_capacity(values.len());
            for (i, value) in values.iter().enumerate() {
                let name = names.get(i).copied().unwrap_or("");
                parts.push(format!("{}={}", name, value_text(rt, value, depth)?));
            }
            Ok(Value::from(format!(
                "{}[{}]",
                crate::names::simple_name(&call.record),
                parts.join(", ")
            )))
        }
        ObjectMethod::HashCode => {
            let mut hash = 0i32;
            for value in &values {
                hash = hash
                    .wrapping_mul(31)
                    .wrapping_add(value_hash(rt, value, depth)?);
            }
            Ok(Value::Int(hash))
        }
        ObjectMethod::Equals => {
            let other = match arg(args, 1, &context)? {
                Value::Object(obj) if obj.class_name() == receiver.class_name() => obj,
                _ => return Ok(Value::Bool(false)),
            };
            if other.ptr_eq(receiver) {
                return Ok(Value::Bool(true));
            }
            let other_values = read_getters(call, other)?;
            for (a, b) in values.iter().zip(&other_values) {
                if !value_equals(rt, a, b, depth)? {
                    return Ok(Value::Bool(false));
                }
            }
            Ok(Value::Bool(true))
        }
    }
}
