// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Minimal host runtime.
//!
//! Plays the class-loading pipeline for [`ClassDef`]s: runs the registered
//! [`ClassTransformer`]s on each definition, links it, publishes it and runs
//! its static initializer once. Instances are created and methods invoked
//! through an operand-stack interpreter ([`interp`]) with natives for the
//! record base type and the component key library ([`natives`]).
//!
//! # Example
//!
//! ```ignore
//! let mut runtime = Runtime::new(ComponentKeyRegistry::global());
//! recoder::install(&mut runtime, RecoderConfig::default());
//! let point = runtime.define_class(point_def)?;
//! let p = runtime.construct(&point, vec![Value::Int(1), Value::Int(2)])?;
//! println!("{}", runtime.to_string(&p)?);
//! ```

mod interp;
mod natives;
mod object;

pub use object::{FieldHandle, Object, ObjectRef};

use crate::classfile::{ClassDef, FieldType, InvokeKind, MethodDef, MethodDescriptor, MethodRef, ObjectMethod};
use crate::config::{INIT, OBJECT, RECORD};
use crate::key::KeyError;
use crate::registry::ComponentKeyRegistry;
use crate::value::Value;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Runtime errors.
#[derive(Debug, Error)]
pub enum VmError {
    #[error("class {0} is already defined")]
    DuplicateClass(String),

    #[error("class {0} is not loaded")]
    UnknownClass(String),

    #[error("no method {class}.{name}{descriptor}")]
    NoSuchMethod {
        class: String,
        name: String,
        descriptor: String,
    },

    #[error("no field {class}.{name}")]
    NoSuchField { class: String, name: String },

    #[error("no constructor of {class} accepts {args} argument(s) of the given types")]
    NoMatchingConstructor { class: String, args: usize },

    #[error("static initialization of {class} failed: {source}")]
    Initialization {
        class: String,
        #[source]
        source: Box<VmError>,
    },

    #[error("operand stack underflow in {method}")]
    StackUnderflow { method: String },

    #[error("call depth limit {0} exceeded")]
    StackOverflow(usize),

    #[error("no local slot {slot} in {method}")]
    BadLocal { method: String, slot: u16 },

    #[error("null dereference in {context}")]
    NullPointer { context: String },

    #[error("expected {expected}, found {found} in {context}")]
    TypeMismatch {
        expected: &'static str,
        found: String,
        context: String,
    },

    #[error("{found} cannot be cast to {expected}")]
    ClassCast { expected: String, found: String },

    #[error("no component key registered for synthetic name '{0}'")]
    UnknownKey(String),

    #[error("{method} ended without returning")]
    FellOffEnd { method: String },

    #[error(transparent)]
    Key(#[from] KeyError),
}

/// Error type transformers report.
pub type TransformError = Box<dyn std::error::Error + Send + Sync>;

/// Hook run on every definition before it is linked.
pub trait ClassTransformer: Send + Sync {
    /// Name for diagnostics.
    fn name(&self) -> &str;

    /// Edit `class` in place. Returns whether anything changed.
    ///
    /// On error the runtime discards any partial edit and links the
    /// definition as it was before this transformer ran.
    fn transform(&self, class: &mut ClassDef) -> Result<bool, TransformError>;
}

/// A linked class.
pub struct Class {
    def: ClassDef,
    super_class: Option<Arc<Class>>,
    /// Instance field types by slot, inherited fields first.
    instance_fields: Vec<FieldType>,
    field_slots: HashMap<String, usize>,
    statics: RwLock<HashMap<String, Value>>,
}

fn default_value(ty: &FieldType) -> Value {
    match ty {
        FieldType::Boolean => Value::Bool(false),
        FieldType::Byte => Value::Byte(0),
        FieldType::Char => Value::Char('\0'),
        FieldType::Short => Value::Short(0),
        FieldType::Int => Value::Int(0),
        FieldType::Long => Value::Long(0),
        FieldType::Float => Value::Float(0.0),
        FieldType::Double => Value::Double(0.0),
        FieldType::Object(_) | FieldType::Array(_) => Value::Null,
    }
}

/// Whether `value` can be passed for a parameter of type `ty`.
fn accepts(ty: &FieldType, value: &Value) -> bool {
    match (ty, value) {
        (FieldType::Boolean, Value::Bool(_))
        | (FieldType::Byte, Value::Byte(_))
        | (FieldType::Char, Value::Char(_))
        | (FieldType::Short, Value::Short(_))
        | (FieldType::Int, Value::Int(_))
        | (FieldType::Long, Value::Long(_))
        | (FieldType::Float, Value::Float(_))
        | (FieldType::Double, Value::Double(_)) => true,
        (FieldType::Object(_) | FieldType::Array(_), Value::Null) => true,
        (FieldType::Object(name), value) => value.is_instance_of(name),
        _ => false,
    }
}

impl Class {
    fn link(def: ClassDef, super_class: Option<Arc<Class>>) -> Self {
        let mut instance_fields = Vec::new();
        let mut field_slots = HashMap::new();
        if let Some(parent) = &super_class {
            instance_fields.extend(parent.instance_fields.iter().cloned());
            field_slots.extend(parent.field_slots.iter().map(|(k, v)| (k.clone(), *v)));
        }
        let mut statics = HashMap::new();
        for field in &def.fields {
            if field.is_static() {
                statics.insert(field.name.clone(), default_value(&field.descriptor));
            } else {
                field_slots.insert(field.name.clone(), instance_fields.len());
                instance_fields.push(field.descriptor.clone());
            }
        }
        Self {
            def,
            super_class,
            instance_fields,
            field_slots,
            statics: RwLock::new(statics),
        }
    }

    /// Internal name.
    pub fn name(&self) -> &str {
        &self.def.name
    }

    /// Definition as linked (after transformers).
    pub fn definition(&self) -> &ClassDef {
        &self.def
    }

    pub fn super_class(&self) -> Option<&Arc<Class>> {
        self.super_class.as_ref()
    }

    /// Whether this class is `type_name` or inherits from it.
    pub fn is_subclass_of(&self, type_name: &str) -> bool {
        if type_name == OBJECT {
            return true;
        }
        let mut current = Some(self);
        let mut last_super = None;
        while let Some(class) = current {
            if class.name() == type_name {
                return true;
            }
            last_super = Some(class.def.super_name.as_str());
            current = class.super_class.as_deref();
        }
        // Chain ends at a builtin base such as java/lang/Record.
        last_super == Some(type_name)
    }

    pub fn field_slot(&self, name: &str) -> Option<usize> {
        self.field_slots.get(name).copied()
    }

    pub(crate) fn field_defaults(&self) -> Vec<Value> {
        self.instance_fields.iter().map(default_value).collect()
    }

    pub fn static_value(&self, name: &str) -> Option<Value> {
        self.statics.read().get(name).cloned()
    }

    pub(crate) fn set_static(&self, name: &str, value: Value) -> bool {
        match self.statics.write().get_mut(name) {
            Some(cell) => {
                *cell = value;
                true
            }
            None => false,
        }
    }

    /// Instance method by name and descriptor, searching super classes.
    pub fn find_virtual(&self, name: &str, descriptor: &MethodDescriptor) -> Option<&MethodDef> {
        let mut current = Some(self);
        while let Some(class) = current {
            if let Some(method) = class.def.find_method(name, descriptor) {
                if !method.is_static() && !method.is_constructor() {
                    return Some(method);
                }
            }
            current = class.super_class.as_deref();
        }
        None
    }
}

impl fmt::Debug for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Class")
            .field("name", &self.def.name)
            .field("super", &self.def.super_name)
            .field("fields", &self.instance_fields.len())
            .field("methods", &self.def.methods.len())
            .finish()
    }
}

/// One declared component of an instance.
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentSnapshot {
    pub name: String,
    /// Public name of a synthetic component.
    pub facing_name: Option<String>,
    pub value: Value,
}

impl ComponentSnapshot {
    pub fn display_name(&self) -> &str {
        self.facing_name.as_deref().unwrap_or(&self.name)
    }
}

/// The host runtime.
pub struct Runtime {
    registry: Arc<ComponentKeyRegistry>,
    classes: RwLock<HashMap<String, Arc<Class>>>,
    transformers: Vec<Box<dyn ClassTransformer>>,
}

impl Runtime {
    pub fn new(registry: Arc<ComponentKeyRegistry>) -> Self {
        Self {
            registry,
            classes: RwLock::new(HashMap::new()),
            transformers: Vec::new(),
        }
    }

    /// Registry that generated code resolves keys from.
    pub fn registry(&self) -> &Arc<ComponentKeyRegistry> {
        &self.registry
    }

    /// Add a transformer; transformers run in insertion order.
    pub fn add_transformer(&mut self, transformer: Box<dyn ClassTransformer>) {
        log::debug!("[vm] transformer '{}' added", transformer.name());
        self.transformers.push(transformer);
    }

    /// Loaded class by name in any spelling.
    pub fn class(&self, name: &str) -> Option<Arc<Class>> {
        let name = crate::names::to_internal_name(name);
        self.classes.read().get(&name).cloned()
    }

    pub(crate) fn resolve(&self, name: &str) -> Result<Arc<Class>, VmError> {
        self.classes
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| VmError::UnknownClass(name.to_string()))
    }

    /// Transform, link, publish and initialize a definition.
    pub fn define_class(&self, mut def: ClassDef) -> Result<Arc<Class>, VmError> {
        if self.classes.read().contains_key(&def.name) {
            return Err(VmError::DuplicateClass(def.name));
        }

        for transformer in &self.transformers {
            let before = def.clone();
            match transformer.transform(&mut def) {
                Ok(true) => log::debug!("[vm] {} transformed {}", transformer.name(), def.name),
                Ok(false) => {}
                Err(err) => {
                    log::warn!(
                        "[vm] transformer '{}' failed on {}: {}; loading it unmodified",
                        transformer.name(),
                        before.name,
                        err
                    );
                    def = before;
                }
            }
        }

        let super_class = match def.super_name.as_str() {
            OBJECT | RECORD => None,
            other => Some(self.resolve(other)?),
        };
        let name = def.name.clone();
        let class = Arc::new(Class::link(def, super_class));

        {
            let mut classes = self.classes.write();
            if classes.contains_key(&name) {
                return Err(VmError::DuplicateClass(name));
            }
            classes.insert(name.clone(), Arc::clone(&class));
        }

        // Published first so the initializer can reach its own statics.
        if let Some(clinit) = class.def.static_initializer() {
            if let Err(err) = self.execute(&class, clinit, Vec::new(), 0) {
                self.classes.write().remove(&name);
                log::warn!("[vm] initialization of {} failed: {}", name, err);
                return Err(VmError::Initialization {
                    class: name,
                    source: Box::new(err),
                });
            }
        }

        log::debug!("[vm] loaded {}", name);
        Ok(class)
    }

    /// Create an instance with the first constructor accepting `args`.
    pub fn construct(&self, class: &Arc<Class>, args: Vec<Value>) -> Result<Value, VmError> {
        let descriptor = class
            .def
            .constructors()
            .find(|ctor| {
                ctor.descriptor.params.len() == args.len()
                    && ctor
                        .descriptor
                        .params
                        .iter()
                        .zip(&args)
                        .all(|(ty, value)| accepts(ty, value))
            })
            .map(|ctor| ctor.descriptor.clone())
            .ok_or_else(|| VmError::NoMatchingConstructor {
                class: class.name().to_string(),
                args: args.len(),
            })?;
        self.construct_with(class, &descriptor, args)
    }

    /// Create an instance with an explicit constructor.
    pub fn construct_with(
        &self,
        class: &Arc<Class>,
        descriptor: &MethodDescriptor,
        args: Vec<Value>,
    ) -> Result<Value, VmError> {
        let ctor = class.def.find_method(INIT, descriptor).ok_or_else(|| {
            VmError::NoSuchMethod {
                class: class.name().to_string(),
                name: INIT.to_string(),
                descriptor: descriptor.to_string(),
            }
        })?;
        let object = ObjectRef::alloc(Arc::clone(class));
        let mut locals = Vec::with_capacity(args.len() + 1);
        locals.push(Value::Object(object.clone()));
        locals.extend(args);
        self.execute(class, ctor, locals, 0)?;
        Ok(Value::Object(object))
    }

    /// Invoke an instance method on `receiver`.
    pub fn invoke_virtual(
        &self,
        receiver: &Value,
        name: &str,
        descriptor: &MethodDescriptor,
        args: Vec<Value>,
    ) -> Result<Option<Value>, VmError> {
        let owner = receiver.runtime_type_name().unwrap_or(OBJECT).to_string();
        let target = MethodRef::new(InvokeKind::Virtual, owner, name, descriptor.clone());
        let mut stack_args = Vec::with_capacity(args.len() + 1);
        stack_args.push(receiver.clone());
        stack_args.extend(args);
        self.invoke(&target, stack_args, 0)
    }

    /// Invoke a static method.
    pub fn invoke_static(
        &self,
        class: &Arc<Class>,
        name: &str,
        descriptor: &MethodDescriptor,
        args: Vec<Value>,
    ) -> Result<Option<Value>, VmError> {
        let target = MethodRef::new(InvokeKind::Static, class.name(), name, descriptor.clone());
        self.invoke(&target, args, 0)
    }

    fn invoke_derived(
        &self,
        receiver: &Value,
        method: ObjectMethod,
        args: Vec<Value>,
    ) -> Result<Value, VmError> {
        let context = format!("{}.{}", receiver.type_label(), method);
        self.invoke_virtual(receiver, method.method_name(), &method.method_descriptor(), args)?
            .ok_or(VmError::TypeMismatch {
                expected: "a return value",
                found: "void".into(),
                context,
            })
    }

    /// `receiver.equals(other)`.
    pub fn equals(&self, receiver: &Value, other: &Value) -> Result<bool, VmError> {
        match self.invoke_derived(receiver, ObjectMethod::Equals, vec![other.clone()])? {
            Value::Bool(b) => Ok(b),
            other => Err(VmError::TypeMismatch {
                expected: "boolean",
                found: other.type_label(),
                context: "equals".into(),
            }),
        }
    }

    /// `receiver.hashCode()`.
    pub fn hash_code(&self, receiver: &Value) -> Result<i32, VmError> {
        match self.invoke_derived(receiver, ObjectMethod::HashCode, Vec::new())? {
            Value::Int(h) => Ok(h),
            other => Err(VmError::TypeMismatch {
                expected: "int",
                found: other.type_label(),
                context: "hashCode".into(),
            }),
        }
    }

    /// `receiver.toString()`.
    pub fn to_string(&self, receiver: &Value) -> Result<String, VmError> {
        match self.invoke_derived(receiver, ObjectMethod::ToString, Vec::new())? {
            Value::Str(s) => Ok(s.to_string()),
            other => Err(VmError::TypeMismatch {
                expected: "string",
                found: other.type_label(),
                context: "toString".into(),
            }),
        }
    }

    /// Declared components of `instance` with their current values, read
    /// through the component accessors.
    pub fn component_values(&self, instance: &Value) -> Result<Vec<ComponentSnapshot>, VmError> {
        let object = match instance {
            Value::Object(obj) => obj,
            Value::Null => {
                return Err(VmError::NullPointer {
                    context: "component_values".into(),
                })
            }
            other => {
                return Err(VmError::TypeMismatch {
                    expected: "object",
                    found: other.type_label(),
                    context: "component_values".into(),
                })
            }
        };
        let class = Arc::clone(object.class());
        let mut out = Vec::with_capacity(class.def.components.len());
        for comp in &class.def.components {
            let accessor = MethodDescriptor::returning(comp.descriptor.clone());
            let value = if class.find_virtual(&comp.name, &accessor).is_some() {
                self.invoke_virtual(instance, &comp.name, &accessor, Vec::new())?
                    .unwrap_or_default()
            } else {
                object
                    .field_by_name(&comp.name)
                    .ok_or_else(|| VmError::NoSuchField {
                        class: class.name().to_string(),
                        name: comp.name.clone(),
                    })?
            };
            out.push(ComponentSnapshot {
                name: comp.name.clone(),
                facing_name: comp.facing_name.clone(),
                value,
            });
        }
        Ok(out)
    }
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("classes", &self.classes.read().len())
            .field("transformers", &self.transformers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classfile::{AccessFlags, Insn, RecordBuilder};

    fn runtime() -> Runtime {
        Runtime::new(Arc::new(ComponentKeyRegistry::new()))
    }

    fn point() -> ClassDef {
        RecordBuilder::new("com/example/Point")
            .component("x", FieldType::Int)
            .component("y", FieldType::Int)
            .build()
    }

    #[test]
    fn test_record_derived_methods() {
        let rt = runtime();
        let class = rt.define_class(point()).unwrap();
        let a = rt.construct(&class, vec![Value::Int(1), Value::Int(2)]).unwrap();
        let b = rt.construct(&class, vec![Value::Int(1), Value::Int(2)]).unwrap();
        let c = rt.construct(&class, vec![Value::Int(2), Value::Int(1)]).unwrap();

        assert_eq!(rt.to_string(&a).unwrap(), "Point[x=1, y=2]");
        assert!(rt.equals(&a, &b).unwrap());
        assert!(!rt.equals(&a, &c).unwrap());
        assert!(!rt.equals(&a, &Value::Null).unwrap());
        // 31 * (31 * 0 + 1) + 2
        assert_eq!(rt.hash_code(&a).unwrap(), 33);
        assert_eq!(rt.hash_code(&a).unwrap(), rt.hash_code(&b).unwrap());
    }

    #[test]
    fn test_duplicate_class_rejected() {
        let rt = runtime();
        rt.define_class(point()).unwrap();
        assert!(matches!(
            rt.define_class(point()),
            Err(VmError::DuplicateClass(_))
        ));
    }

    #[test]
    fn test_no_matching_constructor() {
        let rt = runtime();
        let class = rt.define_class(point()).unwrap();
        assert!(matches!(
            rt.construct(&class, vec![Value::from("x"), Value::Int(2)]),
            Err(VmError::NoMatchingConstructor { .. })
        ));
    }

    #[test]
    fn test_component_values() {
        let rt = runtime();
        let class = rt.define_class(point()).unwrap();
        let p = rt.construct(&class, vec![Value::Int(3), Value::Int(4)]).unwrap();
        let values = rt.component_values(&p).unwrap();
        assert_eq!(values.len(), 2);
        assert_eq!(values[0].display_name(), "x");
        assert_eq!(values[1].value, Value::Int(4));
    }

    #[test]
    fn test_failing_transformer_leaves_definition() {
        struct Breaks;
        impl ClassTransformer for Breaks {
            fn name(&self) -> &str {
                "breaks"
            }
            fn transform(&self, class: &mut ClassDef) -> Result<bool, TransformError> {
                class.methods.clear();
                Err("broken".into())
            }
        }

        let mut rt = runtime();
        rt.add_transformer(Box::new(Breaks));
        let class = rt.define_class(point()).unwrap();
        assert!(!class.definition().methods.is_empty());
    }

    #[test]
    fn test_static_initializer_runs_once() {
        let def = RecordBuilder::new("Counter")
            .static_initializer(vec![
                Insn::constant(crate::classfile::Constant::Int(7)),
                Insn::PutStatic {
                    field: crate::classfile::FieldRef::new("Counter", "SEVEN", FieldType::Int),
                },
            ])
            .build();
        let mut def = def;
        def.fields.push(crate::classfile::FieldDef::new(
            "SEVEN",
            FieldType::Int,
            AccessFlags::STATIC | AccessFlags::FINAL,
        ));
        let rt = runtime();
        let class = rt.define_class(def).unwrap();
        assert_eq!(class.static_value("SEVEN"), Some(Value::Int(7)));
    }

    #[test]
    fn test_failed_initializer_unpublishes() {
        let def = RecordBuilder::new("Broken")
            .static_initializer(vec![Insn::GetStatic {
                field: crate::classfile::FieldRef::new("Broken", "MISSING", FieldType::Int),
            }])
            .build();
        let rt = runtime();
        assert!(matches!(
            rt.define_class(def),
            Err(VmError::Initialization { .. })
        ));
        assert!(rt.class("Broken").is_none());
    }

    #[test]
    fn test_subclass_chain() {
        let rt = runtime();
        let class = rt.define_class(point()).unwrap();
        assert!(class.is_subclass_of("com/example/Point"));
        assert!(class.is_subclass_of(RECORD));
        assert!(class.is_subclass_of(OBJECT));
        assert!(!class.is_subclass_of("java/lang/String"));
    }
}
