// -*- coding: utf-8 -*-
// ------------------------------------------------------------------------------------------------
// Copyright © 2026, fablab authors.
// Licensed under either of Apache License, Version 2.0, or MIT license, at your option.
// Please see the LICENSE-APACHE or LICENSE-MIT files in this distribution for license details.
// ------------------------------------------------------------------------------------------------

use fablab::node::TypePath;
use fablab::value::Class;
use fablab::value::Dict;
use fablab::value::Value;
use pretty_assertions::assert_eq;

use crate::util::foo_class;
use crate::util::list;
use crate::util::push;

#[test]
fn debug_output_stops_at_cycles() {
    let root = list(vec![1.into()]);
    push(&root, root.clone());
    assert_eq!(format!("{:?}", root), "[1, [...]]");

    let holder = list(vec![]);
    let tuple = Value::tuple(vec![holder.clone()]);
    push(&holder, tuple.clone());
    assert_eq!(format!("{:?}", tuple), "([(...)],)");
}

#[test]
fn debug_output_of_dicts_and_objects() {
    let dict = Value::dict(vec![("a".into(), 1.into()), (2.into(), 2.5.into())]);
    assert_eq!(format!("{:?}", dict), r#"{"a": 1, 2: 2.5}"#);

    let (class, _) = foo_class();
    let object = class.instantiate(&["x".into()]);
    assert_eq!(format!("{:?}", Value::from(object)), r#"models.Foo(a="x", b=2)"#);
    assert_eq!(format!("{:?}", Value::from(class)), "<class models.Foo>");
}

#[test]
fn equality_is_structural() {
    assert_eq!(
        list(vec![1.into(), "a".into()]),
        list(vec![1.into(), "a".into()])
    );
    assert_ne!(list(vec![1.into()]), Value::tuple(vec![1.into()]));
    assert_ne!(Value::from(1), Value::from(1.0));
}

#[test]
fn dict_equality_ignores_order() {
    let a = Value::dict(vec![("x".into(), 1.into()), ("y".into(), 2.into())]);
    let b = Value::dict(vec![("y".into(), 2.into()), ("x".into(), 1.into())]);
    assert_eq!(a, b);
}

#[test]
fn equality_terminates_on_cycles() {
    let a = list(vec![1.into()]);
    push(&a, a.clone());
    let b = list(vec![1.into()]);
    push(&b, b.clone());
    assert_eq!(a, b);

    let c = list(vec![2.into()]);
    push(&c, c.clone());
    assert_ne!(a, c);
}

#[test]
fn identity_is_per_allocation() {
    let a = list(vec![]);
    let b = list(vec![]);
    assert!(a.same_object(&a.clone()));
    assert!(!a.same_object(&b));
    assert!(!Value::from("s").same_object(&Value::from("s")));
    assert!(Value::from(1).identity().is_none());
    assert!(a.identity().is_some());
}

#[test]
fn dict_insert_replaces_in_place() {
    let mut dict = Dict::new();
    assert!(dict.insert("a".into(), 1.into()).is_none());
    dict.insert("b".into(), 2.into());
    assert_eq!(dict.insert("a".into(), 3.into()), Some(Value::from(1)));
    assert_eq!(
        dict.keys().cloned().collect::<Vec<_>>(),
        vec![Value::from("a"), Value::from("b")]
    );
    assert_eq!(dict.get(&"a".into()), Some(&Value::from(3)));
}

#[test]
fn allocating_skips_the_initializer() {
    let (class, calls) = foo_class();
    let raw = class.allocate();
    assert_eq!(calls.get(), 0);
    assert!(raw.fields().is_empty());
    let built = class.instantiate(&[]);
    assert_eq!(calls.get(), 1);
    assert_eq!(built.get("b"), Some(Value::from(2)));
}

#[test]
fn object_fields_keep_assignment_order() {
    let class = Class::new(TypePath::new("models", "Bare"));
    let object = class.allocate();
    object.set("z", 1.into());
    object.set("a", 2.into());
    assert_eq!(object.set("z", 3.into()), Some(Value::from(1)));
    assert_eq!(
        object.fields().iter().map(|(name, _)| name).collect::<Vec<_>>(),
        vec!["z", "a"]
    );
}

#[test]
fn opaque_values_can_be_inspected() {
    let value = Value::opaque(42_u8);
    assert_eq!(value.kind_name(), "u8");
    let opaque = match &value {
        Value::Opaque(opaque) => opaque,
        _ => panic!("expected an opaque value"),
    };
    assert_eq!(opaque.downcast_ref::<u8>(), Some(&42));
}
