// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Instruction set of method bodies.
//!
//! A small operand-stack code model. Local slot 0 holds the receiver of
//! instance methods and constructors, parameters follow one slot each.

use crate::classfile::{FieldType, MethodDescriptor};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Reference to a field of some owner type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldRef {
    /// Internal name of the owner.
    pub owner: String,
    pub name: String,
    pub descriptor: FieldType,
}

impl FieldRef {
    pub fn new(owner: impl Into<String>, name: impl Into<String>, descriptor: FieldType) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
            descriptor,
        }
    }
}

impl fmt::Display for FieldRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}:{}", self.owner, self.name, self.descriptor)
    }
}

/// How a method is dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvokeKind {
    /// No receiver.
    Static,
    /// Looked up on the receiver's runtime class.
    Virtual,
    /// Exact owner, no lookup (constructors, super calls).
    Special,
}

/// Reference to a method of some owner type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MethodRef {
    pub owner: String,
    pub name: String,
    pub descriptor: MethodDescriptor,
    pub kind: InvokeKind,
}

impl MethodRef {
    pub fn new(
        kind: InvokeKind,
        owner: impl Into<String>,
        name: impl Into<String>,
        descriptor: MethodDescriptor,
    ) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
            descriptor,
            kind,
        }
    }

    /// Number of operand stack entries consumed (receiver included).
    pub fn stack_arity(&self) -> usize {
        self.descriptor.params.len() + usize::from(self.kind != InvokeKind::Static)
    }
}

impl fmt::Display for MethodRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}{}", self.owner, self.name, self.descriptor)
    }
}

/// Constant operand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Constant {
    Null,
    Bool(bool),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Str(String),
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(v) => write!(f, "{}", v),
            Self::Int(v) => write!(f, "{}", v),
            Self::Long(v) => write!(f, "{}L", v),
            Self::Float(v) => write!(f, "{}F", v),
            Self::Double(v) => write!(f, "{}D", v),
            Self::Str(v) => write!(f, "{:?}", v),
        }
    }
}

/// Derived structural method computed by an [`ObjectMethodsCall`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectMethod {
    Equals,
    HashCode,
    ToString,
}

impl ObjectMethod {
    /// All three, in dispatch-lookup order.
    pub const ALL: [ObjectMethod; 3] = [Self::Equals, Self::HashCode, Self::ToString];

    /// Name of the method that carries this dispatch.
    pub fn method_name(self) -> &'static str {
        match self {
            Self::Equals => "equals",
            Self::HashCode => "hashCode",
            Self::ToString => "toString",
        }
    }

    /// Descriptor of the method that carries this dispatch.
    pub fn method_descriptor(self) -> MethodDescriptor {
        match self {
            Self::Equals => {
                MethodDescriptor::new(vec![FieldType::any_object()], Some(FieldType::Boolean))
            }
            Self::HashCode => MethodDescriptor::returning(FieldType::Int),
            Self::ToString => MethodDescriptor::returning(FieldType::object(crate::config::STRING)),
        }
    }
}

impl fmt::Display for ObjectMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.method_name())
    }
}

/// Derived-method dispatch descriptor.
///
/// Computes equality, hash or string form of `record` from the ordered
/// `getters`. `names` is the `;`-separated list of component names used by the
/// string form, aligned with `getters`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectMethodsCall {
    pub method: ObjectMethod,
    /// Internal name of the record type.
    pub record: String,
    pub names: String,
    pub getters: Vec<FieldRef>,
}

impl ObjectMethodsCall {
    pub fn new(method: ObjectMethod, record: impl Into<String>) -> Self {
        Self {
            method,
            record: record.into(),
            names: String::new(),
            getters: Vec::new(),
        }
    }

    /// Append one component, keeping the existing order.
    pub fn push_component(&mut self, display_name: &str, getter: FieldRef) {
        if !self.names.is_empty() {
            self.names.push(';');
        }
        self.names.push_str(display_name);
        self.getters.push(getter);
    }

    /// Split names list.
    pub fn component_names(&self) -> Vec<&str> {
        if self.names.is_empty() {
            Vec::new()
        } else {
            self.names.split(';').collect()
        }
    }

    /// Operand stack entries consumed (receiver, plus the other object for equals).
    pub fn stack_arity(&self) -> usize {
        match self.method {
            ObjectMethod::Equals => 2,
            ObjectMethod::HashCode | ObjectMethod::ToString => 1,
        }
    }
}

/// One instruction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Insn {
    /// Push local slot.
    Load { slot: u16 },
    /// Push constant.
    Const { value: Constant },
    /// Push a read handle for an instance field.
    FieldHandle { field: FieldRef },
    /// Pop object, push its field.
    GetField { field: FieldRef },
    /// Pop value and object, store field.
    PutField { field: FieldRef },
    /// Push static field.
    GetStatic { field: FieldRef },
    /// Pop value, store static field.
    PutStatic { field: FieldRef },
    /// Pop receiver (unless static) and arguments, push result unless void.
    Invoke { method: MethodRef },
    /// Derived-method dispatch.
    ObjectMethods { call: ObjectMethodsCall },
    /// Check top of stack is null or an instance of the type.
    CheckCast { class: String },
    Dup,
    Pop,
    /// Return from a void method.
    Return,
    /// Pop and return a value.
    ReturnValue,
}

impl Insn {
    pub fn load(slot: u16) -> Self {
        Self::Load { slot }
    }

    pub fn constant(value: Constant) -> Self {
        Self::Const { value }
    }

    pub fn str(value: impl Into<String>) -> Self {
        Self::Const {
            value: Constant::Str(value.into()),
        }
    }

    pub fn invoke(method: MethodRef) -> Self {
        Self::Invoke { method }
    }

    pub fn is_return(&self) -> bool {
        matches!(self, Self::Return | Self::ReturnValue)
    }
}

impl fmt::Display for Insn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Load { slot } => write!(f, "load {}", slot),
            Self::Const { value } => write!(f, "ldc {}", value),
            Self::FieldHandle { field } => write!(f, "ldc handle getfield {}", field),
            Self::GetField { field } => write!(f, "getfield {}", field),
            Self::PutField { field } => write!(f, "putfield {}", field),
            Self::GetStatic { field } => write!(f, "getstatic {}", field),
            Self::PutStatic { field } => write!(f, "putstatic {}", field),
            Self::Invoke { method } => {
                let op = match method.kind {
                    InvokeKind::Static => "invokestatic",
                    InvokeKind::Virtual => "invokevirtual",
                    InvokeKind::Special => "invokespecial",
                };
                write!(f, "{} {}", op, method)
            }
            Self::ObjectMethods { call } => {
                write!(f, "objectmethods {} {} \"{}\"", call.method, call.record, call.names)?;
                for getter in &call.getters {
                    write!(f, " {}", getter.name)?;
                }
                Ok(())
            }
            Self::CheckCast { class } => write!(f, "checkcast {}", class),
            Self::Dup => f.write_str("dup"),
            Self::Pop => f.write_str("pop"),
            Self::Return => f.write_str("return"),
            Self::ReturnValue => f.write_str("areturn"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_component_keeps_order() {
        let mut call = ObjectMethodsCall::new(ObjectMethod::ToString, "Point");
        assert!(call.component_names().is_empty());
        call.push_component("x", FieldRef::new("Point", "x", FieldType::Int));
        call.push_component("y", FieldRef::new("Point", "y", FieldType::Int));
        call.push_component("label", FieldRef::new("Point", "f-1", FieldType::any_object()));
        assert_eq!(call.names, "x;y;label");
        assert_eq!(call.component_names(), vec!["x", "y", "label"]);
        assert_eq!(call.getters[2].name, "f-1");
    }

    #[test]
    fn test_stack_arity() {
        let virt = MethodRef::new(
            InvokeKind::Virtual,
            "recoder/ComponentKey",
            "queueNext",
            MethodDescriptor::void_with(vec![FieldType::any_object()]),
        );
        assert_eq!(virt.stack_arity(), 2);
        let stat = MethodRef {
            kind: InvokeKind::Static,
            ..virt
        };
        assert_eq!(stat.stack_arity(), 1);
    }

    #[test]
    fn test_display() {
        let insn = Insn::GetField {
            field: FieldRef::new("Point", "x", FieldType::Int),
        };
        assert_eq!(insn.to_string(), "getfield Point.x:I");
        assert_eq!(Insn::str("a").to_string(), "ldc \"a\"");
        assert!(Insn::ReturnValue.is_return());
        assert!(!Insn::Dup.is_return());
    }
}
