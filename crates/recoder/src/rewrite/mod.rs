// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Record rewrite pass.
//!
//! Adds the components registered for a record type to its definition,
//! before the definition is linked. For every pending key, in registry
//! order, the pass adds:
//!
//! - a component carrying the key's public name, backed by a private
//!   `Object` field with a synthetic name
//! - a static slot holding the key, filled by the static initializer, which
//!   also binds the key's accessor to the backing field
//! - a store of the key's staged value into the backing field at the end of
//!   the canonical constructor
//! - the backing field in the equals/hashCode/toString dispatch descriptors
//! - a public accessor named after the backing field
//!
//! and finally a constructor taking one extra `Object` per key, which stages
//! the extra arguments and delegates to the canonical constructor.
//!
//! Every anchor is located before anything is edited: a definition the pass
//! cannot handle is left exactly as compiled, and the type is marked aborted.
//! A type is processed at most once per registry.

pub mod codegen;
pub mod locator;

use crate::classfile::{
    AccessFlags, ClassDef, ComponentDef, FieldDef, FieldType, Insn, MethodDescriptor,
    ObjectMethod,
};
use crate::config::{RecoderConfig, COMPONENT_KEY};
use crate::key::RawComponentKey;
use crate::registry::{ComponentKeyRegistry, RewriteState};
use crate::vm::{ClassTransformer, TransformError};
use codegen::SyntheticNames;
use locator::Anchors;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

/// Reasons a type cannot be rewritten. The type is left unmodified.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RewriteError {
    #[error("{class}: no canonical constructor {descriptor}")]
    NoCanonicalConstructor { class: String, descriptor: String },

    #[error("{class}: {method} has no return instruction")]
    MissingReturn { class: String, method: String },

    #[error("{class}: no {method} dispatch descriptor")]
    MissingDispatch { class: String, method: ObjectMethod },

    #[error("{class}: constructor {descriptor} already exists")]
    ConstructorExists { class: String, descriptor: String },

    #[error("{class}: component '{field}' was already applied to a type")]
    KeyAlreadyApplied { class: String, field: String },
}

/// One component added by the pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AddedComponent {
    pub facing_name: String,
    pub field_name: String,
    pub slot_name: String,
    pub component_type: String,
}

/// What a successful rewrite did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RewriteSummary {
    pub class: String,
    pub components: Vec<AddedComponent>,
    pub extended_constructor: MethodDescriptor,
    pub dispatch: Vec<ObjectMethod>,
    pub synthesized_clinit: bool,
}

/// Result of running the pass on one definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RewriteOutcome {
    /// Not a record.
    NotATarget,
    /// No keys registered for the type.
    NoPendingKeys,
    /// Already rewritten or aborted against this registry.
    AlreadyProcessed(RewriteState),
    Rewritten(RewriteSummary),
}

/// The pass, bound to a registry and configuration.
#[derive(Debug, Clone)]
pub struct RecordTransformer {
    registry: Arc<ComponentKeyRegistry>,
    config: RecoderConfig,
}

impl RecordTransformer {
    pub fn new(registry: Arc<ComponentKeyRegistry>, config: RecoderConfig) -> Self {
        Self { registry, config }
    }

    pub fn config(&self) -> &RecoderConfig {
        &self.config
    }

    /// Run the pass on `class`.
    ///
    /// # Errors
    ///
    /// A [`RewriteError`] when preconditions are unmet; `class` is untouched
    /// and the type is marked [`RewriteState::Aborted`].
    pub fn rewrite(&self, class: &mut ClassDef) -> Result<RewriteOutcome, RewriteError> {
        if !class.is_record() {
            return Ok(RewriteOutcome::NotATarget);
        }
        let Some(entry) = self.registry.type_keys(&class.name) else {
            return Ok(RewriteOutcome::NoPendingKeys);
        };
        // Held for the whole edit: one rewrite per type at a time.
        let mut entry = entry.lock();
        if entry.keys.is_empty() {
            return Ok(RewriteOutcome::NoPendingKeys);
        }
        if entry.state != RewriteState::Pending {
            log::debug!(
                "[rewrite] {} already processed ({:?}), skipping",
                class.name,
                entry.state
            );
            return Ok(RewriteOutcome::AlreadyProcessed(entry.state));
        }
        let keys = entry.keys.clone();

        let anchors = match self.locate(class, &keys) {
            Ok(anchors) => anchors,
            Err(err) => {
                entry.state = RewriteState::Aborted;
                log::warn!("[rewrite] aborted: {}", err);
                return Err(err);
            }
        };

        let names: Vec<SyntheticNames> = keys.iter().map(|_| self.synthetic_names(class)).collect();
        for (key, names) in keys.iter().zip(&names) {
            // Generated static initializers resolve the key by this name.
            if !self.registry.register_name_for_key(key, &names.field) {
                entry.state = RewriteState::Aborted;
                let err = RewriteError::KeyAlreadyApplied {
                    class: class.name.clone(),
                    field: key.field_name().to_string(),
                };
                log::warn!("[rewrite] aborted: {}", err);
                return Err(err);
            }
        }

        let summary = apply(class, &anchors, &keys, &names);
        entry.state = RewriteState::Rewritten;
        drop(entry);
        log::info!(
            "[rewrite] {}: added {} component(s) [{}]",
            class.name,
            summary.components.len(),
            summary
                .components
                .iter()
                .map(|c| c.facing_name.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );

        if let Some(dir) = &self.config.export_dir {
            if let Err(err) = crate::export::export_class(dir, class) {
                log::warn!("[rewrite] export of {} failed: {}", class.name, err);
            }
        }

        Ok(RewriteOutcome::Rewritten(summary))
    }

    fn locate(
        &self,
        class: &ClassDef,
        keys: &[Arc<RawComponentKey>],
    ) -> Result<Anchors, RewriteError> {
        let canonical_ctor = locator::find_canonical_constructor(class).ok_or_else(|| {
            RewriteError::NoCanonicalConstructor {
                class: class.name.clone(),
                descriptor: MethodDescriptor::void_with(class.component_descriptors()).to_string(),
            }
        })?;
        let ctor = &class.methods[canonical_ctor];
        let ctor_return = ctor.last_return().ok_or_else(|| RewriteError::MissingReturn {
            class: class.name.clone(),
            method: format!("{}{}", ctor.name, ctor.descriptor),
        })?;

        let clinit = match locator::find_static_initializer(class) {
            Some(index) => {
                let method = &class.methods[index];
                let ret = method.last_return().ok_or_else(|| RewriteError::MissingReturn {
                    class: class.name.clone(),
                    method: format!("{}{}", method.name, method.descriptor),
                })?;
                Some((index, ret))
            }
            None => None,
        };

        let mut dispatch = Vec::new();
        for method in ObjectMethod::ALL {
            match locator::find_dispatch(class, method) {
                Some(site) => dispatch.push(site),
                None if self.config.require_dispatch => {
                    return Err(RewriteError::MissingDispatch {
                        class: class.name.clone(),
                        method,
                    })
                }
                None => log::debug!("[rewrite] {}: no {} dispatch, not extended", class.name, method),
            }
        }

        let extended_ctor = locator::extended_constructor_descriptor(class, keys.len());
        if locator::has_constructor(class, &extended_ctor) {
            return Err(RewriteError::ConstructorExists {
                class: class.name.clone(),
                descriptor: extended_ctor.to_string(),
            });
        }

        if let Some(key) = keys
            .iter()
            .find(|key| self.registry.get_name_for_key(key).is_some())
        {
            return Err(RewriteError::KeyAlreadyApplied {
                class: class.name.clone(),
                field: key.field_name().to_string(),
            });
        }

        Ok(Anchors {
            canonical_ctor,
            ctor_return,
            clinit,
            dispatch,
            extended_ctor,
        })
    }

    fn synthetic_names(&self, class: &ClassDef) -> SyntheticNames {
        loop {
            let id = Uuid::new_v4();
            let names = SyntheticNames {
                field: format!("{}{}", self.config.field_prefix, id),
                slot: format!("{}{}", self.config.key_slot_prefix, id),
            };
            if class.find_field(&names.field).is_none()
                && class.find_field(&names.slot).is_none()
                && self.registry.get_key_for_name(&names.field).is_none()
            {
                return names;
            }
        }
    }
}

/// Perform the edit. Anchors are valid for `class`; nothing here can fail.
fn apply(
    class: &mut ClassDef,
    anchors: &Anchors,
    keys: &[Arc<RawComponentKey>],
    names: &[SyntheticNames],
) -> RewriteSummary {
    let owner = class.name.clone();
    let canonical = class.methods[anchors.canonical_ctor].descriptor.clone();
    let mut components = Vec::with_capacity(keys.len());

    for (key, names) in keys.iter().zip(names) {
        class.components.push(ComponentDef {
            name: names.field.clone(),
            descriptor: FieldType::any_object(),
            facing_name: Some(key.field_name().to_string()),
        });
        class.fields.push(FieldDef::new(
            names.field.clone(),
            FieldType::any_object(),
            AccessFlags::PRIVATE | AccessFlags::FINAL | AccessFlags::SYNTHETIC,
        ));
        class.fields.push(FieldDef::new(
            names.slot.clone(),
            FieldType::object(COMPONENT_KEY),
            AccessFlags::PUBLIC | AccessFlags::STATIC | AccessFlags::FINAL | AccessFlags::SYNTHETIC,
        ));
        components.push(AddedComponent {
            facing_name: key.field_name().to_string(),
            field_name: names.field.clone(),
            slot_name: names.slot.clone(),
            component_type: key.component_type().to_string(),
        });
    }

    // Dispatch first: the splices below shift instruction indices.
    for site in &anchors.dispatch {
        if let Insn::ObjectMethods { call } =
            &mut class.methods[site.method_index].code[site.insn_index]
        {
            for (key, names) in keys.iter().zip(names) {
                call.push_component(key.field_name(), codegen::backing_field_ref(&owner, names));
            }
        }
    }

    let (clinit_index, clinit_return) = match anchors.clinit {
        Some(found) => found,
        None => {
            class.methods.push(codegen::empty_static_initializer());
            (class.methods.len() - 1, 0)
        }
    };
    let init_block: Vec<Insn> = names
        .iter()
        .flat_map(|n| codegen::static_init_block(&owner, n))
        .collect();
    class.methods[clinit_index]
        .code
        .splice(clinit_return..clinit_return, init_block);

    let ctor_block: Vec<Insn> = names
        .iter()
        .flat_map(|n| codegen::constructor_block(&owner, n))
        .collect();
    class.methods[anchors.canonical_ctor]
        .code
        .splice(anchors.ctor_return..anchors.ctor_return, ctor_block);

    for n in names {
        class.methods.push(codegen::accessor(&owner, n));
    }

    class.methods.insert(
        0,
        codegen::extended_constructor(&owner, &canonical, anchors.extended_ctor.clone(), names),
    );

    RewriteSummary {
        class: owner,
        components,
        extended_constructor: anchors.extended_ctor.clone(),
        dispatch: anchors.dispatch.iter().map(|s| s.method).collect(),
        synthesized_clinit: anchors.clinit.is_none(),
    }
}

impl ClassTransformer for RecordTransformer {
    fn name(&self) -> &str {
        "recoder"
    }

    fn transform(&self, class: &mut ClassDef) -> Result<bool, TransformError> {
        match self.rewrite(class) {
            Ok(RewriteOutcome::Rewritten(_)) => Ok(true),
            Ok(_) => Ok(false),
            Err(err) => Err(Box::new(err)),
        }
    }
}
