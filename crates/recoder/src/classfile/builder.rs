// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Record definition builder.
//!
//! Produces a [`ClassDef`] shaped the way a record compiler emits one, so the
//! rewrite pass and the runtime can be driven without a class-file reader.

use super::{
    AccessFlags, ClassDef, ComponentDef, FieldDef, FieldRef, FieldType, Insn, InvokeKind,
    MethodDef, MethodDescriptor, MethodRef, ObjectMethod, ObjectMethodsCall,
};
use crate::config::{CLINIT, INIT, RECORD};

/// Fluent builder for record definitions.
///
/// ```ignore
/// let point = RecordBuilder::new("com.example.Point")
///     .component("x", FieldType::Int)
///     .component("y", FieldType::Int)
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct RecordBuilder {
    name: String,
    components: Vec<ComponentDef>,
    derived: Vec<ObjectMethod>,
    static_init: Option<Vec<Insn>>,
    extra_methods: Vec<MethodDef>,
}

impl RecordBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: crate::names::to_internal_name(name),
            components: Vec::new(),
            derived: ObjectMethod::ALL.to_vec(),
            static_init: None,
            extra_methods: Vec::new(),
        }
    }

    /// Append a component.
    pub fn component(mut self, name: &str, descriptor: FieldType) -> Self {
        self.components.push(ComponentDef::new(name, descriptor));
        self
    }

    /// Do not generate the given derived method.
    pub fn without(mut self, method: ObjectMethod) -> Self {
        self.derived.retain(|m| *m != method);
        self
    }

    /// Add an explicit static initializer; a trailing `return` is appended if missing.
    pub fn static_initializer(mut self, mut code: Vec<Insn>) -> Self {
        if !code.last().is_some_and(Insn::is_return) {
            code.push(Insn::Return);
        }
        self.static_init = Some(code);
        self
    }

    /// Declare an additional constructor with a hand-written body.
    pub fn constructor(mut self, descriptor: MethodDescriptor, code: Vec<Insn>) -> Self {
        self.extra_methods.push(MethodDef::new(
            INIT,
            descriptor,
            AccessFlags::PUBLIC,
            code,
        ));
        self
    }

    /// Declare an arbitrary extra method.
    pub fn method(mut self, method: MethodDef) -> Self {
        self.extra_methods.push(method);
        self
    }

    pub fn build(self) -> ClassDef {
        let mut class = ClassDef {
            name: self.name.clone(),
            super_name: RECORD.to_string(),
            access: AccessFlags::PUBLIC | AccessFlags::FINAL | AccessFlags::RECORD,
            components: self.components.clone(),
            fields: Vec::new(),
            methods: Vec::new(),
        };

        for comp in &self.components {
            class.fields.push(FieldDef::new(
                comp.name.clone(),
                comp.descriptor.clone(),
                AccessFlags::PRIVATE | AccessFlags::FINAL,
            ));
        }

        if let Some(code) = self.static_init.clone() {
            class.methods.push(MethodDef::new(
                CLINIT,
                MethodDescriptor::void(),
                AccessFlags::STATIC,
                code,
            ));
        }

        class.methods.push(self.canonical_constructor());

        for comp in &self.components {
            class.methods.push(MethodDef::new(
                comp.name.clone(),
                MethodDescriptor::returning(comp.descriptor.clone()),
                AccessFlags::PUBLIC,
                vec![
                    Insn::load(0),
                    Insn::GetField {
                        field: self.field_ref(comp),
                    },
                    Insn::ReturnValue,
                ],
            ));
        }

        // Compilers emit these three in this order.
        for method in [
            ObjectMethod::ToString,
            ObjectMethod::HashCode,
            ObjectMethod::Equals,
        ] {
            if self.derived.contains(&method) {
                class.methods.push(self.derived_method(method));
            }
        }

        class.methods.extend(self.extra_methods);
        class
    }

    fn field_ref(&self, comp: &ComponentDef) -> FieldRef {
        FieldRef::new(self.name.clone(), comp.name.clone(), comp.descriptor.clone())
    }

    fn canonical_constructor(&self) -> MethodDef {
        let mut code = vec![
            Insn::load(0),
            Insn::invoke(MethodRef::new(
                InvokeKind::Special,
                RECORD,
                INIT,
                MethodDescriptor::void(),
            )),
        ];
        for (i, comp) in self.components.iter().enumerate() {
            code.push(Insn::load(0));
            code.push(Insn::load((i + 1) as u16));
            code.push(Insn::PutField {
                field: self.field_ref(comp),
            });
        }
        code.push(Insn::Return);

        let descriptor = MethodDescriptor::void_with(
            self.components.iter().map(|c| c.descriptor.clone()).collect(),
        );
        MethodDef::new(INIT, descriptor, AccessFlags::PUBLIC, code)
    }

    fn derived_method(&self, method: ObjectMethod) -> MethodDef {
        let mut call = ObjectMethodsCall::new(method, self.name.clone());
        for comp in &self.components {
            call.push_component(&comp.name, self.field_ref(comp));
        }
        let mut code = vec![Insn::load(0)];
        if method == ObjectMethod::Equals {
            code.push(Insn::load(1));
        }
        code.push(Insn::ObjectMethods { call });
        code.push(Insn::ReturnValue);
        MethodDef::new(
            method.method_name(),
            method.method_descriptor(),
            AccessFlags::PUBLIC | AccessFlags::FINAL,
            code,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point() -> RecordBuilder {
        RecordBuilder::new("Point")
            .component("x", FieldType::Int)
            .component("y", FieldType::Int)
    }

    #[test]
    fn test_canonical_constructor_shape() {
        let class = point().build();
        let ctor = class
            .find_method(INIT, &MethodDescriptor::void_with(vec![FieldType::Int, FieldType::Int]))
            .expect("canonical constructor");
        assert_eq!(ctor.code.len(), 2 + 3 * 2 + 1);
        assert_eq!(ctor.last_return(), Some(ctor.code.len() - 1));
    }

    #[test]
    fn test_derived_methods_and_dispatch() {
        let class = point().build();
        let to_string = class
            .find_method("toString", &ObjectMethod::ToString.method_descriptor())
            .expect("toString");
        let call = to_string
            .code
            .iter()
            .find_map(|insn| match insn {
                Insn::ObjectMethods { call } => Some(call),
                _ => None,
            })
            .expect("dispatch");
        assert_eq!(call.names, "x;y");
        assert_eq!(call.getters.len(), 2);
    }

    #[test]
    fn test_without_and_static_initializer() {
        let class = point()
            .without(ObjectMethod::HashCode)
            .static_initializer(vec![])
            .build();
        assert!(class
            .find_method("hashCode", &ObjectMethod::HashCode.method_descriptor())
            .is_none());
        let clinit = class.static_initializer().expect("clinit");
        assert_eq!(clinit.code, vec![Insn::Return]);
    }

    #[test]
    fn test_empty_record() {
        let class = RecordBuilder::new("Unit").build();
        assert!(class.components.is_empty());
        let ctor = class.constructors().next().expect("constructor");
        assert!(ctor.descriptor.params.is_empty());
    }
}
