// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # recoder
//!
//! Load-time augmentation of record types with externally declared
//! components.
//!
//! Records are immutable value types whose equality, hash and string form are
//! derived from a fixed list of components. This crate lets code that does
//! not own a record declare extra components for it. Before the record is
//! linked, the rewrite pass edits its definition so instances carry the new
//! components, include them in the derived methods, and can be built with or
//! without values for them.
//!
//! ## Quick Start
//!
//! ```ignore
//! use recoder::{ComponentKey, ComponentKeyRegistry, RecoderConfig, Runtime, Value};
//!
//! let registry = ComponentKeyRegistry::global();
//! let label = registry.register(ComponentKey::<String>::create_with_default(
//!     "label", "com.example.Point", "java.lang.String", "none".to_string(),
//! ));
//!
//! let mut runtime = Runtime::new(registry);
//! recoder::install(&mut runtime, RecoderConfig::default());
//! let point = runtime.define_class(point_def)?;
//!
//! label.queue_next("hi".to_string())?;
//! let p = runtime.construct(&point, vec![Value::Int(1), Value::Int(2)])?;
//! assert_eq!(label.get(&p)?, "hi");
//! ```
//!
//! ## Modules
//!
//! - [`key`] - component keys and thread-scoped staging
//! - [`registry`] - pending keys per type and rewrite state
//! - [`rewrite`] - the rewrite pass
//! - [`classfile`] - the type definition model the pass edits
//! - [`vm`] - host runtime linking and running definitions
//! - [`entrypoint`] - start-up registration callbacks
//! - [`config`] - constants and runtime configuration

pub mod classfile;
pub mod config;
pub mod entrypoint;
pub mod export;
pub mod key;
pub mod names;
pub mod registry;
pub mod rewrite;
pub mod value;
pub mod vm;

pub use config::{ConfigError, RecoderConfig};
pub use entrypoint::{install, run_entrypoints};
pub use key::{ComponentKey, KeyError, RawComponentKey};
pub use registry::{ComponentKeyRegistry, RewriteState};
pub use rewrite::{RecordTransformer, RewriteError, RewriteOutcome, RewriteSummary};
pub use value::{ComponentValue, Value};
pub use vm::{Class, ClassTransformer, ObjectRef, Runtime, VmError};
