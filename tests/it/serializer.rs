// -*- coding: utf-8 -*-
// ------------------------------------------------------------------------------------------------
// Copyright © 2026, fablab authors.
// Licensed under either of Apache License, Version 2.0, or MIT license, at your option.
// Please see the LICENSE-APACHE or LICENSE-MIT files in this distribution for license details.
// ------------------------------------------------------------------------------------------------

use fablab::node::Literal;
use fablab::node::MemoId;
use fablab::node::Node;
use fablab::node::TypePath;
use fablab::value::Class;
use fablab::value::Value;
use fablab::SaveError;
use fablab::Serializer;
use pretty_assertions::assert_eq;

use crate::util::foo_class;
use crate::util::init_logging;
use crate::util::list;
use crate::util::push;

fn int(value: i64) -> Node {
    Literal::Int(value).into()
}

fn float(value: f64) -> Node {
    Literal::Float(value).into()
}

fn string(value: &str) -> Node {
    Literal::Str(value.to_string()).into()
}

#[test]
fn literals_save_as_themselves() -> anyhow::Result<()> {
    init_logging();
    assert_eq!(fablab::save(&Value::from(1))?, int(1));
    assert_eq!(fablab::save(&Value::from(1.234))?, float(1.234));
    assert_eq!(fablab::save(&Value::from("hello"))?, string("hello"));
    Ok(())
}

#[test]
fn list_of_literals_gets_one_memo_id() -> anyhow::Result<()> {
    let value = list(vec![1.into(), 2.3.into(), 2.3.into(), 1.into()]);
    assert_eq!(
        fablab::save(&value)?,
        Node::List {
            memo_id: MemoId(0),
            items: vec![int(1), float(2.3), float(2.3), int(1)],
        }
    );
    Ok(())
}

#[test]
fn nested_tuples_are_numbered_in_preorder() -> anyhow::Result<()> {
    let inner = Value::tuple(vec![3.into(), 4.into()]);
    let outer = Value::tuple(vec![1.into(), 2.into(), inner]);
    assert_eq!(
        fablab::save(&outer)?,
        Node::Tuple {
            memo_id: MemoId(0),
            items: vec![
                int(1),
                int(2),
                Node::Tuple {
                    memo_id: MemoId(1),
                    items: vec![int(3), int(4)],
                },
            ],
        }
    );
    Ok(())
}

#[test]
fn memo_ids_are_dense_and_follow_first_sighting() -> anyhow::Result<()> {
    let a = list(vec![]);
    let b = list(vec![a.clone()]);
    let c = Value::dict(vec![("x".into(), b.clone())]);
    let root = list(vec![b.clone(), c, a.clone()]);
    assert_eq!(
        fablab::save(&root)?,
        Node::List {
            memo_id: MemoId(0),
            items: vec![
                Node::List {
                    memo_id: MemoId(1),
                    items: vec![Node::List {
                        memo_id: MemoId(2),
                        items: vec![],
                    }],
                },
                Node::Dict {
                    memo_id: MemoId(3),
                    items: vec![(string("x"), Node::Reference(MemoId(1)))],
                },
                Node::Reference(MemoId(2)),
            ],
        }
    );
    Ok(())
}

#[test]
fn shared_objects_are_saved_once() -> anyhow::Result<()> {
    let shared = list(vec![1.into()]);
    let root = list(vec![shared.clone(), shared]);
    assert_eq!(
        fablab::save(&root)?,
        Node::List {
            memo_id: MemoId(0),
            items: vec![
                Node::List {
                    memo_id: MemoId(1),
                    items: vec![int(1)],
                },
                Node::Reference(MemoId(1)),
            ],
        }
    );
    Ok(())
}

#[test]
fn self_containing_list_refers_to_itself() -> anyhow::Result<()> {
    let root = list(vec![1.into()]);
    push(&root, root.clone());
    assert_eq!(
        fablab::save(&root)?,
        Node::List {
            memo_id: MemoId(0),
            items: vec![int(1), Node::Reference(MemoId(0))],
        }
    );
    Ok(())
}

#[test]
fn equal_strings_are_not_deduplicated() -> anyhow::Result<()> {
    let word = Value::from("same");
    let root = list(vec![word.clone(), word]);
    assert_eq!(
        fablab::save(&root)?,
        Node::List {
            memo_id: MemoId(0),
            items: vec![string("same"), string("same")],
        }
    );
    Ok(())
}

#[test]
fn types_are_written_at_every_occurrence() -> anyhow::Result<()> {
    let class = Class::new(TypePath::new("models", "Foo"));
    let root = list(vec![class.clone().into(), class.into(), list(vec![])]);
    let path = TypePath::new("models", "Foo");
    assert_eq!(
        fablab::save(&root)?,
        Node::List {
            memo_id: MemoId(0),
            items: vec![
                Node::Type(path.clone()),
                Node::Type(path),
                Node::List {
                    memo_id: MemoId(1),
                    items: vec![],
                },
            ],
        }
    );
    Ok(())
}

#[test]
fn instances_save_their_fields_in_order() -> anyhow::Result<()> {
    let (class, _) = foo_class();
    let object = class.instantiate(&[1.5.into(), 7.into()]);
    object.set("c", "three".into());
    assert_eq!(
        fablab::save(&object.into())?,
        Node::Instance {
            type_path: TypePath::new("models", "Foo"),
            memo_id: MemoId(0),
            attributes: vec![
                (string("a"), float(1.5)),
                (string("b"), int(7)),
                (string("c"), string("three")),
            ],
        }
    );
    Ok(())
}

#[test]
fn dict_keys_may_be_composite() -> anyhow::Result<()> {
    let key = Value::tuple(vec![1.into(), 2.into()]);
    let root = Value::dict(vec![(key, "pair".into())]);
    assert_eq!(
        fablab::save(&root)?,
        Node::Dict {
            memo_id: MemoId(0),
            items: vec![(
                Node::Tuple {
                    memo_id: MemoId(1),
                    items: vec![int(1), int(2)],
                },
                string("pair"),
            )],
        }
    );
    Ok(())
}

#[test]
fn opaque_values_cannot_be_saved() {
    struct Socket;
    let root = list(vec![1.into(), Value::opaque(Socket)]);
    match fablab::save(&root) {
        Err(SaveError::UnsupportedValue(name)) => assert!(name.ends_with("Socket"), "{}", name),
        other => panic!("expected UnsupportedValue, got {:?}", other),
    }
}

#[test]
fn serializer_can_be_reused() -> anyhow::Result<()> {
    let shared = list(vec![]);
    let root = list(vec![shared.clone(), shared]);
    let mut serializer = Serializer::new();
    let first = serializer.save(&root)?;
    let second = serializer.save(&root)?;
    assert_eq!(first, second);
    Ok(())
}

#[test]
fn saving_leaves_the_input_untouched() -> anyhow::Result<()> {
    let root = list(vec![1.into(), Value::dict(vec![("a".into(), 2.into())])]);
    push(&root, root.clone());
    let before = format!("{:?}", root);
    fablab::save(&root)?;
    assert_eq!(format!("{:?}", root), before);
    Ok(())
}
