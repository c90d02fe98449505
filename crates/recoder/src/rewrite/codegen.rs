// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Code emitted into rewritten records.
//!
//! Generated code refers to keys only through the synthetic field name and
//! the registry lookup, so a rewritten definition is plain data.

use crate::classfile::{
    AccessFlags, FieldRef, FieldType, Insn, InvokeKind, MethodDef, MethodDescriptor, MethodRef,
};
use crate::config::{
    CHECK_VALUE, COMPONENT_KEY, COMPONENT_KEY_REGISTRY, GET_KEY_FOR_NAME, GET_NEXT, INIT,
    METHOD_HANDLE, PROVIDE_GETTER, QUEUE_NEXT, STRING,
};

/// Synthetic names chosen for one key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntheticNames {
    /// Backing instance field (also the accessor method name).
    pub field: String,
    /// Static slot holding the key.
    pub slot: String,
}

fn key_type() -> FieldType {
    FieldType::object(COMPONENT_KEY)
}

pub fn backing_field_ref(owner: &str, names: &SyntheticNames) -> FieldRef {
    FieldRef::new(owner, names.field.clone(), FieldType::any_object())
}

pub fn key_slot_ref(owner: &str, names: &SyntheticNames) -> FieldRef {
    FieldRef::new(owner, names.slot.clone(), key_type())
}

/// Static initializer block: resolve the key by field name, keep it in the
/// static slot, bind an accessor for the backing field.
pub fn static_init_block(owner: &str, names: &SyntheticNames) -> Vec<Insn> {
    vec![
        Insn::str(names.field.clone()),
        Insn::invoke(MethodRef::new(
            InvokeKind::Static,
            COMPONENT_KEY_REGISTRY,
            GET_KEY_FOR_NAME,
            MethodDescriptor::new(vec![FieldType::object(STRING)], Some(key_type())),
        )),
        Insn::Dup,
        Insn::PutStatic {
            field: key_slot_ref(owner, names),
        },
        Insn::FieldHandle {
            field: backing_field_ref(owner, names),
        },
        Insn::invoke(MethodRef::new(
            InvokeKind::Virtual,
            COMPONENT_KEY,
            PROVIDE_GETTER,
            MethodDescriptor::void_with(vec![FieldType::object(METHOD_HANDLE)]),
        )),
    ]
}

/// Canonical constructor block: `this.<field> = <slot>.getNext()`.
pub fn constructor_block(owner: &str, names: &SyntheticNames) -> Vec<Insn> {
    vec![
        Insn::load(0),
        Insn::GetStatic {
            field: key_slot_ref(owner, names),
        },
        Insn::invoke(MethodRef::new(
            InvokeKind::Virtual,
            COMPONENT_KEY,
            GET_NEXT,
            MethodDescriptor::returning(FieldType::any_object()),
        )),
        Insn::PutField {
            field: backing_field_ref(owner, names),
        },
    ]
}

/// Public accessor named after the backing field.
pub fn accessor(owner: &str, names: &SyntheticNames) -> MethodDef {
    MethodDef::new(
        names.field.clone(),
        MethodDescriptor::returning(FieldType::any_object()),
        AccessFlags::PUBLIC | AccessFlags::SYNTHETIC,
        vec![
            Insn::load(0),
            Insn::GetField {
                field: backing_field_ref(owner, names),
            },
            Insn::ReturnValue,
        ],
    )
}

/// `<slot>.<method>(<extra argument>)` for every key.
fn per_key_calls(owner: &str, original: usize, keys: &[SyntheticNames], method: &str) -> Vec<Insn> {
    keys.iter()
        .enumerate()
        .flat_map(|(i, names)| {
            [
                Insn::GetStatic {
                    field: key_slot_ref(owner, names),
                },
                Insn::load((original + 1 + i) as u16),
                Insn::invoke(MethodRef::new(
                    InvokeKind::Virtual,
                    COMPONENT_KEY,
                    method,
                    MethodDescriptor::void_with(vec![FieldType::any_object()]),
                )),
            ]
        })
        .collect()
}

/// Constructor taking the original parameters plus one `Object` per key.
///
/// Checks every extra argument against its key, then queues them all and
/// delegates to the canonical constructor. A rejected argument fails the
/// call before any key has a staged value.
pub fn extended_constructor(
    owner: &str,
    canonical: &MethodDescriptor,
    extended: MethodDescriptor,
    keys: &[SyntheticNames],
) -> MethodDef {
    let original = canonical.params.len();
    let mut code = Vec::with_capacity(keys.len() * 6 + original + 3);
    code.extend(per_key_calls(owner, original, keys, CHECK_VALUE));
    code.extend(per_key_calls(owner, original, keys, QUEUE_NEXT));
    for slot in 0..=original {
        code.push(Insn::load(slot as u16));
    }
    code.push(Insn::invoke(MethodRef::new(
        InvokeKind::Special,
        owner,
        INIT,
        canonical.clone(),
    )));
    code.push(Insn::Return);

    MethodDef::new(INIT, extended, AccessFlags::PUBLIC | AccessFlags::SYNTHETIC, code)
}

/// `static {}` with nothing but a return.
pub fn empty_static_initializer() -> MethodDef {
    MethodDef::new(
        crate::config::CLINIT,
        MethodDescriptor::void(),
        AccessFlags::STATIC,
        vec![Insn::Return],
    )
}
