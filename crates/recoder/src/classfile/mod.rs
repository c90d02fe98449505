// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Type definition model.
//!
//! A [`ClassDef`] is the compiled, linkable description of one type: its
//! record components, fields and method bodies. The rewrite pass edits it as
//! plain data before the host runtime links it.
//!
//! # Layout of a compiled record
//!
//! ```text
//! final record Point extends java/lang/Record
//!   component x: I
//!   component y: I
//!   private final x: I
//!   private final y: I
//!   public <init>(II)V          canonical constructor
//!   public x()I                 accessor per component
//!   public toString()Ljava/lang/String;   objectmethods toString ...
//!   public hashCode()I                    objectmethods hashCode ...
//!   public equals(Ljava/lang/Object;)Z    objectmethods equals ...
//! ```

pub mod builder;
pub mod descriptor;
pub mod disasm;
pub mod insn;

pub use builder::RecordBuilder;
pub use descriptor::{DescriptorError, FieldType, MethodDescriptor};
pub use insn::{
    Constant, FieldRef, Insn, InvokeKind, MethodRef, ObjectMethod, ObjectMethodsCall,
};

use crate::config::{CLINIT, INIT, OBJECT, RECORD};
use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Access and property flags of types and members.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct AccessFlags: u16 {
        const PUBLIC = 0x0001;
        const PRIVATE = 0x0002;
        const STATIC = 0x0008;
        const FINAL = 0x0010;
        const SYNTHETIC = 0x1000;
        const RECORD = 0x4000;
    }
}

/// Declared record component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentDef {
    pub name: String,
    pub descriptor: FieldType,
    /// Public name for introspection when `name` is synthetic.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub facing_name: Option<String>,
}

impl ComponentDef {
    pub fn new(name: impl Into<String>, descriptor: FieldType) -> Self {
        Self {
            name: name.into(),
            descriptor,
            facing_name: None,
        }
    }

    /// Name shown to readers of the component list.
    pub fn display_name(&self) -> &str {
        self.facing_name.as_deref().unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    pub descriptor: FieldType,
    pub access: AccessFlags,
}

impl FieldDef {
    pub fn new(name: impl Into<String>, descriptor: FieldType, access: AccessFlags) -> Self {
        Self {
            name: name.into(),
            descriptor,
            access,
        }
    }

    pub fn is_static(&self) -> bool {
        self.access.contains(AccessFlags::STATIC)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodDef {
    pub name: String,
    pub descriptor: MethodDescriptor,
    pub access: AccessFlags,
    pub code: Vec<Insn>,
}

impl MethodDef {
    pub fn new(
        name: impl Into<String>,
        descriptor: MethodDescriptor,
        access: AccessFlags,
        code: Vec<Insn>,
    ) -> Self {
        Self {
            name: name.into(),
            descriptor,
            access,
            code,
        }
    }

    pub fn is_static(&self) -> bool {
        self.access.contains(AccessFlags::STATIC)
    }

    pub fn is_constructor(&self) -> bool {
        self.name == INIT
    }

    /// Index of the last return instruction.
    pub fn last_return(&self) -> Option<usize> {
        self.code.iter().rposition(Insn::is_return)
    }
}

/// One type definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassDef {
    /// Internal name.
    pub name: String,
    /// Internal name of the super type.
    pub super_name: String,
    pub access: AccessFlags,
    #[serde(default)]
    pub components: Vec<ComponentDef>,
    #[serde(default)]
    pub fields: Vec<FieldDef>,
    #[serde(default)]
    pub methods: Vec<MethodDef>,
}

impl ClassDef {
    /// Empty public class extending `java/lang/Object`.
    pub fn new(name: &str) -> Self {
        Self {
            name: crate::names::to_internal_name(name),
            super_name: OBJECT.to_string(),
            access: AccessFlags::PUBLIC,
            components: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
        }
    }

    /// Whether the direct super type is the record base.
    pub fn is_record(&self) -> bool {
        self.super_name == RECORD
    }

    pub fn binary_name(&self) -> String {
        crate::names::to_binary_name(&self.name)
    }

    pub fn simple_name(&self) -> &str {
        crate::names::simple_name(&self.name)
    }

    /// Component descriptors in declaration order (the canonical constructor shape).
    pub fn component_descriptors(&self) -> Vec<FieldType> {
        self.components.iter().map(|c| c.descriptor.clone()).collect()
    }

    pub fn find_field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn find_method(&self, name: &str, descriptor: &MethodDescriptor) -> Option<&MethodDef> {
        self.methods
            .iter()
            .find(|m| m.name == name && &m.descriptor == descriptor)
    }

    pub fn find_method_index(&self, name: &str, descriptor: &MethodDescriptor) -> Option<usize> {
        self.methods
            .iter()
            .position(|m| m.name == name && &m.descriptor == descriptor)
    }

    pub fn constructors(&self) -> impl Iterator<Item = &MethodDef> {
        self.methods.iter().filter(|m| m.is_constructor())
    }

    pub fn static_initializer(&self) -> Option<&MethodDef> {
        self.find_method(CLINIT, &MethodDescriptor::void())
    }
}
