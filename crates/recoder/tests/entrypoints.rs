// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Start-up callbacks collected with `component_entrypoint!`.

use recoder::classfile::{FieldType, RecordBuilder};
use recoder::entrypoint::entrypoints;
use recoder::{ComponentKey, ComponentKeyRegistry, RecoderConfig, Runtime, Value};
use std::sync::Arc;

fn register_colour(registry: &ComponentKeyRegistry) {
    registry.register(ComponentKey::<String>::typed_with_default(
        "colour",
        "demo.Tagged",
        "plain".to_string(),
    ));
}

fn register_weight(registry: &ComponentKeyRegistry) {
    registry.register(ComponentKey::<i32>::create_with_default(
        "weight",
        "demo/Tagged",
        "int",
        0,
    ));
}

recoder::component_entrypoint!("test:weight", register_weight);
recoder::component_entrypoint!("test:colour", register_colour);

#[test]
fn test_entrypoints_sorted_by_id() {
    let ids: Vec<_> = entrypoints().iter().map(|e| e.id).collect();
    assert_eq!(ids, vec!["test:colour", "test:weight"]);
}

#[test]
fn test_install_registers_and_rewrites() {
    let mut runtime = Runtime::new(Arc::new(ComponentKeyRegistry::new()));
    recoder::install(&mut runtime, RecoderConfig::default());

    let keys = runtime.registry().get_for_class("demo/Tagged");
    let names: Vec<_> = keys.iter().map(|k| k.field_name()).collect();
    assert_eq!(names, vec!["colour", "weight"]);

    let class = runtime
        .define_class(
            RecordBuilder::new("demo.Tagged")
                .component("id", FieldType::Long)
                .build(),
        )
        .unwrap();
    let obj = runtime.construct(&class, vec![Value::Long(5)]).unwrap();
    assert_eq!(
        runtime.to_string(&obj).unwrap(),
        "Tagged[id=5, colour=plain, weight=0]"
    );
    assert!(keys.iter().all(|k| k.is_bound()));
}

#[test]
fn test_run_entrypoints_counts() {
    let registry = ComponentKeyRegistry::new();
    assert_eq!(recoder::run_entrypoints(&registry), 2);
    assert_eq!(registry.get_for_class("demo.Tagged").len(), 2);
}
