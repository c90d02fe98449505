// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Locate the constructs the rewrite pass edits.
//!
//! Every lookup here is read-only; the pass resolves all anchors before it
//! touches the definition.

use crate::classfile::{ClassDef, FieldType, Insn, MethodDescriptor, ObjectMethod};
use crate::config::{CLINIT, INIT};

/// Position of a derived-method dispatch descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchSite {
    pub method: ObjectMethod,
    pub method_index: usize,
    pub insn_index: usize,
}

/// Everything the pass needs, resolved up front.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Anchors {
    pub canonical_ctor: usize,
    /// Last return of the canonical constructor.
    pub ctor_return: usize,
    /// Static initializer and its last return; `None` means one is synthesized.
    pub clinit: Option<(usize, usize)>,
    pub dispatch: Vec<DispatchSite>,
    pub extended_ctor: MethodDescriptor,
}

/// Canonical constructor: parameter types exactly the component descriptors, in order.
pub fn find_canonical_constructor(class: &ClassDef) -> Option<usize> {
    let params = class.component_descriptors();
    class
        .methods
        .iter()
        .position(|m| m.is_constructor() && m.descriptor.params == params)
}

pub fn find_static_initializer(class: &ClassDef) -> Option<usize> {
    class.find_method_index(CLINIT, &MethodDescriptor::void())
}

/// Dispatch descriptor computing `method` for this class, searched in every method body.
pub fn find_dispatch(class: &ClassDef, method: ObjectMethod) -> Option<DispatchSite> {
    class
        .methods
        .iter()
        .enumerate()
        .find_map(|(method_index, m)| {
            m.code.iter().position(|insn| match insn {
                Insn::ObjectMethods { call } => call.method == method && call.record == class.name,
                _ => false,
            })
            .map(|insn_index| DispatchSite {
                method,
                method_index,
                insn_index,
            })
        })
}

/// Descriptor of the constructor taking one extra `Object` per key.
pub fn extended_constructor_descriptor(class: &ClassDef, key_count: usize) -> MethodDescriptor {
    MethodDescriptor::void_with(class.component_descriptors())
        .with_appended_params(key_count, &FieldType::any_object())
}

/// Whether a constructor with `descriptor` already exists.
pub fn has_constructor(class: &ClassDef, descriptor: &MethodDescriptor) -> bool {
    class.find_method(INIT, descriptor).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classfile::{Insn, RecordBuilder};

    fn point() -> RecordBuilder {
        RecordBuilder::new("Point")
            .component("x", FieldType::Int)
            .component("y", FieldType::Int)
    }

    #[test]
    fn test_canonical_among_several_constructors() {
        let class = point()
            .constructor(
                MethodDescriptor::void_with(vec![FieldType::Int]),
                vec![Insn::Return],
            )
            .build();
        let idx = find_canonical_constructor(&class).expect("canonical");
        assert_eq!(
            class.methods[idx].descriptor.params,
            vec![FieldType::Int, FieldType::Int]
        );
    }

    #[test]
    fn test_canonical_missing() {
        let mut class = point().build();
        class.methods.retain(|m| !m.is_constructor());
        assert_eq!(find_canonical_constructor(&class), None);
    }

    #[test]
    fn test_dispatch_sites() {
        let class = point().without(ObjectMethod::Equals).build();
        let site = find_dispatch(&class, ObjectMethod::HashCode).expect("hashCode");
        assert_eq!(class.methods[site.method_index].name, "hashCode");
        assert!(matches!(
            class.methods[site.method_index].code[site.insn_index],
            Insn::ObjectMethods { .. }
        ));
        assert!(find_dispatch(&class, ObjectMethod::Equals).is_none());
    }

    #[test]
    fn test_extended_descriptor() {
        let class = point().build();
        let desc = extended_constructor_descriptor(&class, 1);
        assert_eq!(desc.to_string(), "(IILjava/lang/Object;)V");
        assert!(!has_constructor(&class, &desc));
        assert!(find_static_initializer(&class).is_none());
    }
}
