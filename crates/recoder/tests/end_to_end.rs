// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Register, rewrite, load and use an augmented record.

use recoder::classfile::{ClassDef, FieldType, RecordBuilder};
use recoder::{
    ComponentKey, ComponentKeyRegistry, KeyError, RecoderConfig, RecordTransformer, RewriteState,
    Runtime, Value,
};
use std::sync::Arc;

fn point() -> ClassDef {
    RecordBuilder::new("com.example.Point")
        .component("x", FieldType::Int)
        .component("y", FieldType::Int)
        .build()
}

fn other() -> ClassDef {
    RecordBuilder::new("com.example.Other")
        .component("v", FieldType::Int)
        .build()
}

struct Fixture {
    runtime: Runtime,
    added: ComponentKey<String>,
}

fn fixture(config: RecoderConfig) -> Fixture {
    let registry = Arc::new(ComponentKeyRegistry::new());
    let added = registry.register(ComponentKey::create_with_default(
        "addedField",
        "com.example.Point",
        "java.lang.String",
        "none".to_string(),
    ));
    let mut runtime = Runtime::new(Arc::clone(&registry));
    runtime.add_transformer(Box::new(RecordTransformer::new(registry, config)));
    Fixture { runtime, added }
}

fn ints(values: &[i32]) -> Vec<Value> {
    values.iter().copied().map(Value::Int).collect()
}

#[test]
fn test_default_then_staged_then_default() {
    let fx = fixture(RecoderConfig::default());
    let point = fx.runtime.define_class(point()).unwrap();

    let p1 = fx.runtime.construct(&point, ints(&[1, 2])).unwrap();
    assert_eq!(fx.added.get_or_null(&p1).unwrap().as_deref(), Some("none"));

    fx.added.queue_next("hi".to_string()).unwrap();
    let p2 = fx.runtime.construct(&point, ints(&[3, 4])).unwrap();
    assert_eq!(fx.added.get(&p2).unwrap(), "hi");

    let p3 = fx.runtime.construct(&point, ints(&[5, 6])).unwrap();
    assert_eq!(fx.added.get(&p3).unwrap(), "none");
}

#[test]
fn test_derived_methods_include_new_component() {
    let fx = fixture(RecoderConfig::default());
    let point = fx.runtime.define_class(point()).unwrap();

    let a = fx.runtime.construct(&point, ints(&[1, 2])).unwrap();
    assert_eq!(
        fx.runtime.to_string(&a).unwrap(),
        "Point[x=1, y=2, addedField=none]"
    );
    // 31 * 33 + "none".hashCode()
    assert_eq!(fx.runtime.hash_code(&a).unwrap(), 1023 + 3_387_192);

    fx.added.queue_next("tagged".to_string()).unwrap();
    let b = fx.runtime.construct(&point, ints(&[1, 2])).unwrap();
    let c = fx.runtime.construct(&point, ints(&[1, 2])).unwrap();
    assert!(!fx.runtime.equals(&a, &b).unwrap());
    assert!(fx.runtime.equals(&a, &c).unwrap());
}

#[test]
fn test_extended_constructor() {
    let fx = fixture(RecoderConfig::default());
    let point = fx.runtime.define_class(point()).unwrap();

    let p = fx
        .runtime
        .construct(&point, vec![Value::Int(7), Value::Int(8), Value::from("direct")])
        .unwrap();
    assert_eq!(fx.added.get(&p).unwrap(), "direct");
    assert_eq!(
        fx.runtime.to_string(&p).unwrap(),
        "Point[x=7, y=8, addedField=direct]"
    );

    // Wrong-typed extra argument is rejected by the key.
    let err = fx
        .runtime
        .construct(&point, vec![Value::Int(7), Value::Int(8), Value::Int(9)])
        .unwrap_err();
    assert!(matches!(
        err,
        recoder::VmError::Key(KeyError::InvalidComponentValue { .. })
    ));
}

#[test]
fn test_unrelated_and_null_instances() {
    let fx = fixture(RecoderConfig::default());
    fx.runtime.define_class(point()).unwrap();
    let other_class = fx.runtime.define_class(other()).unwrap();
    let o = fx.runtime.construct(&other_class, ints(&[1])).unwrap();

    assert_eq!(fx.added.get_or_null(&o), Ok(None));
    assert_eq!(fx.added.get_optional(&Value::Null), Ok(None));
    assert!(matches!(fx.added.get(&o), Err(KeyError::KeyMismatch { .. })));
    assert!(matches!(
        fx.added.get(&Value::Null),
        Err(KeyError::NullInstance { .. })
    ));
}

#[test]
fn test_wrong_type_keeps_staged_value() {
    let registry = Arc::new(ComponentKeyRegistry::new());
    let untyped = registry.register(ComponentKey::<Value>::create(
        "addedField",
        "com.example.Point",
        "java.lang.String",
    ));
    let mut runtime = Runtime::new(Arc::clone(&registry));
    runtime.add_transformer(Box::new(RecordTransformer::new(
        registry,
        RecoderConfig::default(),
    )));
    let point = runtime.define_class(point()).unwrap();

    untyped.queue_next(Value::from("kept")).unwrap();
    assert!(matches!(
        untyped.queue_next(Value::Int(1)),
        Err(KeyError::InvalidComponentValue { .. })
    ));
    let p = runtime.construct(&point, ints(&[1, 2])).unwrap();
    assert_eq!(untyped.get(&p).unwrap(), Value::from("kept"));

    // No default: a plain construction stores null.
    let q = runtime.construct(&point, ints(&[1, 2])).unwrap();
    assert_eq!(untyped.get(&q).unwrap(), Value::Null);
    assert_eq!(untyped.get_or_null(&q), Ok(None));
}

#[test]
fn test_unbound_before_loading() {
    let fx = fixture(RecoderConfig::default());
    let unrewritten = Runtime::new(Arc::new(ComponentKeyRegistry::new()));
    let point = unrewritten.define_class(point()).unwrap();
    let p = unrewritten.construct(&point, ints(&[1, 2])).unwrap();
    assert!(matches!(
        fx.added.get(&p),
        Err(KeyError::UnboundAccessor { .. })
    ));
    assert!(!fx.added.is_bound());
}

#[test]
fn test_component_values_report_facing_name() {
    let fx = fixture(RecoderConfig::default());
    let point = fx.runtime.define_class(point()).unwrap();
    let p = fx.runtime.construct(&point, ints(&[1, 2])).unwrap();

    let values = fx.runtime.component_values(&p).unwrap();
    let names: Vec<_> = values.iter().map(|c| c.display_name().to_string()).collect();
    assert_eq!(names, vec!["x", "y", "addedField"]);
    assert!(values[2].name.starts_with("keyedField-"));
    assert_eq!(values[2].value, Value::from("none"));
}

#[test]
fn test_late_registration_is_not_applied() {
    let registry = Arc::new(ComponentKeyRegistry::new());
    registry.register(ComponentKey::<Value>::typed("early", "com.example.Point"));
    let mut runtime = Runtime::new(Arc::clone(&registry));
    runtime.add_transformer(Box::new(RecordTransformer::new(
        Arc::clone(&registry),
        RecoderConfig::default(),
    )));
    let point = runtime.define_class(point()).unwrap();

    let late = registry.register(ComponentKey::<Value>::typed("late", "com.example.Point"));
    assert_eq!(registry.get_for_class("com.example.Point").len(), 2);
    assert_eq!(
        registry.state_of("com.example.Point"),
        Some(RewriteState::Rewritten)
    );
    let p = runtime.construct(&point, ints(&[1, 2])).unwrap();
    assert!(matches!(late.get(&p), Err(KeyError::UnboundAccessor { .. })));
    assert_eq!(point.definition().components.len(), 3);
}

#[test]
fn test_aborted_type_loads_unmodified() {
    let fx = fixture(RecoderConfig::default());
    let mut def = point();
    def.methods.retain(|m| !m.is_constructor());
    let before = def.clone();
    let class = fx.runtime.define_class(def).unwrap();
    assert_eq!(class.definition(), &before);
    assert_eq!(
        fx.runtime.registry().state_of("com.example.Point"),
        Some(RewriteState::Aborted)
    );
}

#[test]
fn test_export_directory() {
    let dir = tempfile::tempdir().unwrap();
    let fx = fixture(RecoderConfig {
        export_dir: Some(dir.path().to_path_buf()),
        ..RecoderConfig::default()
    });
    fx.runtime.define_class(point()).unwrap();

    let listing = std::fs::read_to_string(dir.path().join("com.example.Point.txt")).unwrap();
    assert!(listing.contains("(facing addedField)"));
    assert!(dir.path().join("com.example.Point.json").exists());

    // Types without keys are not exported.
    fx.runtime.define_class(other()).unwrap();
    assert!(!dir.path().join("com.example.Other.json").exists());
}

fn single_int(name: &str) -> ClassDef {
    RecordBuilder::new(name)
        .component("x", FieldType::Int)
        .build()
}

#[test]
fn test_rejected_extended_construction_stages_nothing() {
    let registry = Arc::new(ComponentKeyRegistry::new());
    let a = registry.register(ComponentKey::<String>::typed_with_default(
        "a",
        "demo.P",
        "a-default".to_string(),
    ));
    let b = registry.register(ComponentKey::<String>::typed_with_default(
        "b",
        "demo.P",
        "b-default".to_string(),
    ));
    let mut runtime = Runtime::new(Arc::clone(&registry));
    runtime.add_transformer(Box::new(RecordTransformer::new(
        registry,
        RecoderConfig::default(),
    )));
    let class = runtime.define_class(single_int("demo.P")).unwrap();

    // `a` accepts its argument, `b` rejects it.
    let err = runtime
        .construct(
            &class,
            vec![Value::Int(1), Value::from("from failed call"), Value::Int(9)],
        )
        .unwrap_err();
    assert!(matches!(
        err,
        recoder::VmError::Key(KeyError::InvalidComponentValue { ref field, .. }) if field == "b"
    ));
    assert!(a.raw().peek_next().is_none());

    let plain = runtime.construct(&class, vec![Value::Int(2)]).unwrap();
    assert_eq!(a.get(&plain).unwrap(), "a-default");
    assert_eq!(b.get(&plain).unwrap(), "b-default");

    // A null extra argument is rejected the same way.
    assert!(runtime
        .construct(&class, vec![Value::Int(3), Value::Null, Value::from("b")])
        .is_err());
    assert!(b.raw().peek_next().is_none());
}

#[test]
fn test_duplicate_component_names_get_independent_fields() {
    let registry = Arc::new(ComponentKeyRegistry::new());
    let first = registry.register(ComponentKey::<String>::typed_with_default(
        "tag",
        "demo.Tagged",
        "one".to_string(),
    ));
    let second = registry.register(ComponentKey::<String>::typed_with_default(
        "tag",
        "demo.Tagged",
        "two".to_string(),
    ));
    let mut runtime = Runtime::new(Arc::clone(&registry));
    runtime.add_transformer(Box::new(RecordTransformer::new(
        registry,
        RecoderConfig::default(),
    )));
    let class = runtime.define_class(single_int("demo.Tagged")).unwrap();

    let backing: Vec<_> = class
        .definition()
        .components
        .iter()
        .filter(|c| c.facing_name.as_deref() == Some("tag"))
        .map(|c| c.name.clone())
        .collect();
    assert_eq!(backing.len(), 2);
    assert_ne!(backing[0], backing[1]);

    let plain = runtime.construct(&class, vec![Value::Int(1)]).unwrap();
    assert_eq!(first.get(&plain).unwrap(), "one");
    assert_eq!(second.get(&plain).unwrap(), "two");

    second.queue_next("staged".to_string()).unwrap();
    let staged = runtime.construct(&class, vec![Value::Int(1)]).unwrap();
    assert_eq!(first.get(&staged).unwrap(), "one");
    assert_eq!(second.get(&staged).unwrap(), "staged");

    // Same-named keys keep their registration order.
    assert_eq!(
        runtime.to_string(&staged).unwrap(),
        "Tagged[x=1, tag=one, tag=staged]"
    );
    assert!(!runtime.equals(&plain, &staged).unwrap());
}
