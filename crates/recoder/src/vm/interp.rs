// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Operand-stack interpreter.

use super::{natives, Class, FieldHandle, ObjectRef, Runtime, VmError};
use crate::classfile::{Constant, Insn, InvokeKind, MethodDef, MethodRef};
use crate::config::MAX_CALL_DEPTH;
use crate::value::Value;
use std::sync::Arc;

fn constant_value(constant: &Constant) -> Value {
    match constant {
        Constant::Null => Value::Null,
        Constant::Bool(v) => Value::Bool(*v),
        Constant::Int(v) => Value::Int(*v),
        Constant::Long(v) => Value::Long(*v),
        Constant::Float(v) => Value::Float(*v),
        Constant::Double(v) => Value::Double(*v),
        Constant::Str(v) => Value::from(v.as_str()),
    }
}

struct Frame<'a> {
    class: &'a Class,
    method: &'a MethodDef,
    stack: Vec<Value>,
}

impl Frame<'_> {
    fn location(&self) -> String {
        format!(
            "{}.{}{}",
            self.class.name(),
            self.method.name,
            self.method.descriptor
        )
    }

    fn pop(&mut self) -> Result<Value, VmError> {
        match self.stack.pop() {
            Some(value) => Ok(value),
            None => Err(VmError::StackUnderflow {
                method: self.location(),
            }),
        }
    }

    fn pop_n(&mut self, n: usize) -> Result<Vec<Value>, VmError> {
        if self.stack.len() < n {
            return Err(VmError::StackUnderflow {
                method: self.location(),
            });
        }
        let at = self.stack.len() - n;
        Ok(self.stack.split_off(at))
    }

    fn pop_object(&mut self) -> Result<ObjectRef, VmError> {
        match self.pop()? {
            Value::Object(obj) => Ok(obj),
            Value::Null => Err(VmError::NullPointer {
                context: self.location(),
            }),
            other => Err(VmError::TypeMismatch {
                expected: "object",
                found: other.type_label(),
                context: self.location(),
            }),
        }
    }
}

impl Runtime {
    /// Interpret `method` of `class` with the given locals.
    pub(crate) fn execute(
        &self,
        class: &Arc<Class>,
        method: &MethodDef,
        locals: Vec<Value>,
        depth: usize,
    ) -> Result<Option<Value>, VmError> {
        let mut frame = Frame {
            class,
            method,
            stack: Vec::new(),
        };

        for insn in &method.code {
            match insn {
                Insn::Load { slot } => {
                    let value = locals.get(usize::from(*slot)).cloned().ok_or_else(|| {
                        VmError::BadLocal {
                            method: frame.location(),
                            slot: *slot,
                        }
                    })?;
                    frame.stack.push(value);
                }
                Insn::Const { value } => frame.stack.push(constant_value(value)),
                Insn::FieldHandle { field } => {
                    let owner = self.resolve(&field.owner)?;
                    let slot = owner.field_slot(&field.name).ok_or_else(|| {
                        VmError::NoSuchField {
                            class: field.owner.clone(),
                            name: field.name.clone(),
                        }
                    })?;
                    frame.stack.push(Value::Handle(FieldHandle::new(
                        owner.name(),
                        field.name.as_str(),
                        slot,
                    )));
                }
                Insn::GetField { field } => {
                    let object = frame.pop_object()?;
                    let value = object.field_by_name(&field.name).ok_or_else(|| {
                        VmError::NoSuchField {
                            class: object.class_name().to_string(),
                            name: field.name.clone(),
                        }
                    })?;
                    frame.stack.push(value);
                }
                Insn::PutField { field } => {
                    let value = frame.pop()?;
                    let object = frame.pop_object()?;
                    let stored = object
                        .class()
                        .field_slot(&field.name)
                        .is_some_and(|slot| object.set_field(slot, value));
                    if !stored {
                        return Err(VmError::NoSuchField {
                            class: object.class_name().to_string(),
                            name: field.name.clone(),
                        });
                    }
                }
                Insn::GetStatic { field } => {
                    let owner = self.resolve(&field.owner)?;
                    let value = owner.static_value(&field.name).ok_or_else(|| {
                        VmError::NoSuchField {
                            class: field.owner.clone(),
                            name: field.name.clone(),
                        }
                    })?;
                    frame.stack.push(value);
                }
                Insn::PutStatic { field } => {
                    let value = frame.pop()?;
                    let owner = self.resolve(&field.owner)?;
                    if !owner.set_static(&field.name, value) {
                        return Err(VmError::NoSuchField {
                            class: field.owner.clone(),
                            name: field.name.clone(),
                        });
                    }
                }
                Insn::Invoke { method: target } => {
                    let args = frame.pop_n(target.stack_arity())?;
                    if let Some(result) = self.invoke(target, args, depth)? {
                        frame.stack.push(result);
                    }
                }
                Insn::ObjectMethods { call } => {
                    let args = frame.pop_n(call.stack_arity())?;
                    let result = natives::object_methods(self, call, &args, depth)?;
                    frame.stack.push(result);
                }
                Insn::CheckCast { class: target } => {
                    let top = frame.stack.last().ok_or_else(|| VmError::StackUnderflow {
                        method: frame.location(),
                    })?;
                    if !top.is_null() && !top.is_instance_of(target) {
                        return Err(VmError::ClassCast {
                            expected: target.clone(),
                            found: top.type_label(),
                        });
                    }
                }
                Insn::Dup => {
                    let top = frame.stack.last().cloned().ok_or_else(|| {
                        VmError::StackUnderflow {
                            method: frame.location(),
                        }
                    })?;
                    frame.stack.push(top);
                }
                Insn::Pop => {
                    frame.pop()?;
                }
                Insn::Return => return Ok(None),
                Insn::ReturnValue => return frame.pop().map(Some),
            }
        }

        Err(VmError::FellOffEnd {
            method: frame.location(),
        })
    }

    /// Dispatch a call. `args` holds the receiver first for instance calls.
    pub(crate) fn invoke(
        &self,
        target: &MethodRef,
        args: Vec<Value>,
        depth: usize,
    ) -> Result<Option<Value>, VmError> {
        if depth >= MAX_CALL_DEPTH {
            return Err(VmError::StackOverflow(MAX_CALL_DEPTH));
        }

        match target.kind {
            InvokeKind::Static | InvokeKind::Special => {
                if let Some(native) = natives::lookup(target) {
                    return native(self, args);
                }
                let class = self.resolve(&target.owner)?;
                let method = class
                    .definition()
                    .find_method(&target.name, &target.descriptor)
                    .filter(|m| m.is_static() == (target.kind == InvokeKind::Static))
                    .ok_or_else(|| no_such_method(target))?;
                if target.kind == InvokeKind::Special && args.first().is_some_and(Value::is_null) {
                    return Err(VmError::NullPointer {
                        context: target.to_string(),
                    });
                }
                self.execute(&class, method, args, depth + 1)
            }
            InvokeKind::Virtual => {
                let receiver = args.first().ok_or_else(|| VmError::StackUnderflow {
                    method: target.to_string(),
                })?;
                match receiver {
                    Value::Null => Err(VmError::NullPointer {
                        context: target.to_string(),
                    }),
                    Value::Object(obj) => {
                        let class = Arc::clone(obj.class());
                        if let Some(method) = class.find_virtual(&target.name, &target.descriptor) {
                            return self.execute(&class, method, args, depth + 1);
                        }
                        natives::object_default(self, target, &args, depth)?
                            .map(Some)
                            .ok_or_else(|| no_such_method(target))
                    }
                    _ => {
                        if let Some(native) = natives::lookup(target) {
                            return native(self, args);
                        }
                        natives::object_default(self, target, &args, depth)?
                            .map(Some)
                            .ok_or_else(|| no_such_method(target))
                    }
                }
            }
        }
    }
}

fn no_such_method(target: &MethodRef) -> VmError {
    VmError::NoSuchMethod {
        class: target.owner.clone(),
        name: target.name.clone(),
        descriptor: target.descriptor.to_string(),
    }
}
