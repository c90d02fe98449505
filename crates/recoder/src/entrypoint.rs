// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Start-up registration callbacks.
//!
//! Crates declaring components submit a callback with
//! [`component_entrypoint!`](crate::component_entrypoint); the callbacks are
//! collected at link time and run, in id order, before any record is loaded.
//!
//! ```ignore
//! fn register(registry: &ComponentKeyRegistry) {
//!     registry.register(ComponentKey::<String>::typed("label", "com.example.Point"));
//! }
//!
//! recoder::component_entrypoint!("example:labels", register);
//! ```

use crate::config::{RecoderConfig, ENTRYPOINT_KEY};
use crate::registry::ComponentKeyRegistry;
use crate::rewrite::RecordTransformer;
use crate::vm::Runtime;
use std::sync::Arc;

#[doc(hidden)]
pub use inventory;

/// One registration callback.
pub struct ComponentEntrypoint {
    /// Unique id, also the run order.
    pub id: &'static str,
    pub register: fn(&ComponentKeyRegistry),
}

inventory::collect!(ComponentEntrypoint);

/// Submit a registration callback.
#[macro_export]
macro_rules! component_entrypoint {
    ($id:expr, $register:expr) => {
        $crate::entrypoint::inventory::submit! {
            $crate::entrypoint::ComponentEntrypoint {
                id: $id,
                register: $register,
            }
        }
    };
}

/// All collected callbacks, in id order.
pub fn entrypoints() -> Vec<&'static ComponentEntrypoint> {
    let mut all: Vec<_> = inventory::iter::<ComponentEntrypoint>.into_iter().collect();
    all.sort_by_key(|e| e.id);
    all
}

/// Run every collected callback against `registry`. Returns how many ran.
pub fn run_entrypoints(registry: &ComponentKeyRegistry) -> usize {
    let all = entrypoints();
    for entry in &all {
        log::debug!("[recoder] {} entrypoint '{}'", ENTRYPOINT_KEY, entry.id);
        (entry.register)(registry);
    }
    all.len()
}

/// Register all components and hook the rewrite pass into `runtime`.
pub fn install(runtime: &mut Runtime, config: RecoderConfig) {
    log::info!("[recoder] registering components");
    let registry = Arc::clone(runtime.registry());
    let ran = run_entrypoints(&registry);
    runtime.add_transformer(Box::new(RecordTransformer::new(registry, config)));
    log::info!(
        "[recoder] {} entrypoint(s) run, {} type(s) pending",
        ran,
        runtime.registry().type_count()
    );
}
