// -*- coding: utf-8 -*-
// ------------------------------------------------------------------------------------------------
// Copyright © 2026, fablab authors.
// Licensed under either of Apache License, Version 2.0, or MIT license, at your option.
// Please see the LICENSE-APACHE or LICENSE-MIT files in this distribution for license details.
// ------------------------------------------------------------------------------------------------

use std::rc::Rc;

use fablab::node::Literal;
use fablab::node::MemoId;
use fablab::node::Node;
use fablab::node::TypePath;
use fablab::registry::NoRegistry;
use fablab::registry::RegistryError;
use fablab::value::Value;
use fablab::Builder;
use fablab::Config;
use fablab::LoadError;
use pretty_assertions::assert_eq;

use crate::util::foo_class;
use crate::util::init_logging;
use crate::util::registry_with;

fn int(value: i64) -> Node {
    Literal::Int(value).into()
}

fn string(value: &str) -> Node {
    Literal::Str(value.to_string()).into()
}

#[test]
fn literals_load_as_themselves() -> anyhow::Result<()> {
    init_logging();
    assert_eq!(fablab::load(&int(7), &NoRegistry)?.as_int(), Some(7));
    assert_eq!(
        fablab::load(&Literal::Float(0.5).into(), &NoRegistry)?.as_float(),
        Some(0.5)
    );
    assert_eq!(
        fablab::load(&string("seven"), &NoRegistry)?.as_str(),
        Some("seven")
    );
    Ok(())
}

#[test]
fn list_can_contain_itself() -> anyhow::Result<()> {
    let tree = Node::List {
        memo_id: MemoId(0),
        items: vec![int(1), Node::Reference(MemoId(0))],
    };
    let loaded = fablab::load(&tree, &NoRegistry)?;
    let list = loaded.as_list().expect("root should be a list").borrow();
    assert_eq!(list.len(), 2);
    assert_eq!(list[0].as_int(), Some(1));
    assert!(list[1].same_object(&loaded));
    Ok(())
}

#[test]
fn dict_value_can_refer_to_the_dict() -> anyhow::Result<()> {
    let tree = Node::Dict {
        memo_id: MemoId(0),
        items: vec![
            (string("self"), Node::Reference(MemoId(0))),
            (int(1), string("one")),
        ],
    };
    let loaded = fablab::load(&tree, &NoRegistry)?;
    let dict = loaded.as_dict().expect("root should be a dict").borrow();
    assert_eq!(dict.len(), 2);
    assert!(dict
        .get(&"self".into())
        .expect("missing key")
        .same_object(&loaded));
    assert_eq!(dict.get(&1.into()).and_then(Value::as_str), Some("one"));
    Ok(())
}

#[test]
fn list_inside_tuple_can_refer_to_the_tuple() -> anyhow::Result<()> {
    // (1, 2, [1, 2, <the tuple>], 3, 4)
    let tree = Node::Tuple {
        memo_id: MemoId(0),
        items: vec![
            int(1),
            int(2),
            Node::List {
                memo_id: MemoId(1),
                items: vec![int(1), int(2), Node::Reference(MemoId(0))],
            },
            int(3),
            int(4),
        ],
    };
    let loaded = fablab::load(&tree, &NoRegistry)?;
    let tuple = loaded.as_tuple().expect("root should be a tuple");
    assert_eq!(tuple.len(), 5);
    let list = tuple[2].as_list().expect("third item should be a list").borrow();
    assert_eq!(list.len(), 3);
    assert!(list[2].same_object(&loaded));
    Ok(())
}

#[test]
fn list_inside_nested_tuples_can_refer_to_the_outer_tuple() -> anyhow::Result<()> {
    // (((<the outer tuple>,),),)
    let tree = Node::Tuple {
        memo_id: MemoId(0),
        items: vec![Node::Tuple {
            memo_id: MemoId(1),
            items: vec![Node::List {
                memo_id: MemoId(2),
                items: vec![Node::Reference(MemoId(0))],
            }],
        }],
    };
    let loaded = fablab::load(&tree, &NoRegistry)?;
    let inner = &loaded.as_tuple().expect("root should be a tuple")[0];
    let list = inner.as_tuple().expect("item should be a tuple")[0]
        .as_list()
        .expect("item should be a list")
        .borrow();
    assert!(list[0].same_object(&loaded));
    Ok(())
}

#[test]
fn tuple_cannot_directly_contain_itself() {
    let tree = Node::Tuple {
        memo_id: MemoId(0),
        items: vec![int(1), Node::Reference(MemoId(0))],
    };
    assert_eq!(
        fablab::load(&tree, &NoRegistry).err(),
        Some(LoadError::UnresolvedReference(MemoId(0)))
    );
}

#[test]
fn dangling_reference_is_an_error() {
    let tree = Node::List {
        memo_id: MemoId(0),
        items: vec![Node::Reference(MemoId(5))],
    };
    assert_eq!(
        fablab::load(&tree, &NoRegistry).err(),
        Some(LoadError::UnresolvedReference(MemoId(5)))
    );
}

#[test]
fn reused_memo_id_is_an_error() {
    let tree = Node::List {
        memo_id: MemoId(0),
        items: vec![Node::List {
            memo_id: MemoId(0),
            items: vec![],
        }],
    };
    assert_eq!(
        fablab::load(&tree, &NoRegistry).err(),
        Some(LoadError::DuplicateMemoId(MemoId(0)))
    );
}

#[test]
fn unknown_class_is_an_error() {
    let path = TypePath::new("models", "Missing");
    let tree = Node::Instance {
        type_path: path.clone(),
        memo_id: MemoId(0),
        attributes: vec![],
    };
    assert_eq!(
        fablab::load(&tree, &NoRegistry).err(),
        Some(LoadError::TypeResolution(RegistryError::UnknownType(path)))
    );
}

#[test]
fn field_names_must_be_strings() {
    let (class, _) = foo_class();
    let registry = registry_with(&[&class]);
    let tree = Node::Instance {
        type_path: class.path().clone(),
        memo_id: MemoId(0),
        attributes: vec![(int(1), int(2))],
    };
    assert_eq!(
        fablab::load(&tree, &registry).err(),
        Some(LoadError::InvalidFieldName("1".to_string()))
    );
}

#[test]
fn instances_are_restored_without_running_the_initializer() -> anyhow::Result<()> {
    let (class, calls) = foo_class();
    let registry = registry_with(&[&class]);
    let tree = Node::Instance {
        type_path: class.path().clone(),
        memo_id: MemoId(0),
        attributes: vec![
            (string("a"), Literal::Float(1.5).into()),
            (string("me"), Node::Reference(MemoId(0))),
        ],
    };
    let loaded = fablab::load(&tree, &registry)?;
    assert_eq!(calls.get(), 0);
    let object = loaded.as_object().expect("root should be an object");
    assert!(Rc::ptr_eq(object.class(), &class));
    assert_eq!(object.get("a").and_then(|a| a.as_float()), Some(1.5));
    assert!(object.get("b").is_none());
    assert!(object
        .get("me")
        .expect("missing field")
        .same_object(&loaded));
    Ok(())
}

#[test]
fn types_resolve_through_the_registry() -> anyhow::Result<()> {
    let (class, _) = foo_class();
    let registry = registry_with(&[&class]);
    let tree = Node::Type(class.path().clone());
    let loaded = fablab::load(&tree, &registry)?;
    assert!(Rc::ptr_eq(loaded.as_class().expect("should be a class"), &class));
    Ok(())
}

#[test]
fn builder_can_be_reused() -> anyhow::Result<()> {
    let tree = Node::List {
        memo_id: MemoId(0),
        items: vec![Node::Reference(MemoId(0))],
    };
    let mut builder = Builder::new(&NoRegistry);
    let first = builder.load(&tree)?;
    let second = builder.load(&tree)?;
    assert!(!first.same_object(&second));
    Ok(())
}

#[test]
fn reference_into_an_earlier_siblings_contents() -> anyhow::Result<()> {
    // [[[]], <the innermost list>]
    let tree = Node::List {
        memo_id: MemoId(0),
        items: vec![
            Node::List {
                memo_id: MemoId(1),
                items: vec![Node::List {
                    memo_id: MemoId(2),
                    items: vec![],
                }],
            },
            Node::Reference(MemoId(2)),
        ],
    };
    let loaded = fablab::load(&tree, &NoRegistry)?;
    let items = loaded.as_list().expect("root should be a list").borrow();
    let middle = items[0].as_list().expect("item should be a list").borrow();
    assert!(middle[0].same_object(&items[1]));
    Ok(())
}

fn list_node(memo_id: usize, items: Vec<Node>) -> Node {
    Node::List {
        memo_id: MemoId(memo_id),
        items,
    }
}

#[test]
fn reference_to_a_list_queued_after_the_current_one() -> anyhow::Result<()> {
    // (l1, [l3], l3) where l1 = [<the tuple>]
    let tree = Node::Tuple {
        memo_id: MemoId(0),
        items: vec![
            list_node(1, vec![Node::Reference(MemoId(0))]),
            list_node(2, vec![list_node(3, vec![])]),
            Node::Reference(MemoId(3)),
        ],
    };
    let config = Config::default().with_collect_stats(true);
    let mut builder = Builder::with_config(&NoRegistry, config);
    let loaded = builder.load(&tree)?;
    let tuple = loaded.as_tuple().expect("root should be a tuple");
    let l1 = tuple[0].as_list().expect("item should be a list").borrow();
    assert!(l1[0].same_object(&loaded));
    let l2 = tuple[1].as_list().expect("item should be a list").borrow();
    assert!(l2[0].same_object(&tuple[2]));

    let stats = builder.stats().expect("stats should be collected");
    assert_eq!(stats.nodes.count(), 6);
    assert_eq!(stats.deferred_jobs, 3);
    Ok(())
}

#[test]
fn objects_fetched_ahead_are_filled_once() -> anyhow::Result<()> {
    // [[x], x, x[0]] where x = ([7],)
    let tree = list_node(
        0,
        vec![
            list_node(
                1,
                vec![Node::Tuple {
                    memo_id: MemoId(2),
                    items: vec![list_node(3, vec![int(7)])],
                }],
            ),
            Node::Reference(MemoId(2)),
            Node::Reference(MemoId(3)),
        ],
    );
    let config = Config::default().with_collect_stats(true);
    let mut builder = Builder::with_config(&NoRegistry, config);
    let loaded = builder.load(&tree)?;
    let items = loaded.as_list().expect("root should be a list").borrow();
    let x = items[1].as_tuple().expect("item should be a tuple");
    assert_eq!(x.len(), 1);
    assert!(x[0].same_object(&items[2]));
    assert_eq!(
        items[2].as_list().expect("item should be a list").borrow().len(),
        1
    );
    let first = items[0].as_list().expect("item should be a list").borrow();
    assert!(first[0].same_object(&items[1]));

    let stats = builder.stats().expect("stats should be collected");
    assert_eq!(stats.nodes.count(), 7);
    assert_eq!(stats.deferred_jobs, 3);
    Ok(())
}

#[test]
fn reference_to_a_later_node_is_fetched_ahead() -> anyhow::Result<()> {
    let tree = list_node(0, vec![Node::Reference(MemoId(1)), list_node(1, vec![])]);
    let loaded = fablab::load(&tree, &NoRegistry)?;
    let items = loaded.as_list().expect("root should be a list").borrow();
    assert!(items[0].same_object(&items[1]));
    Ok(())
}

#[test]
fn tuple_reached_through_its_own_items_ahead_of_time() {
    // The reference fetches the second tuple ahead, which in turn needs the first, still open.
    let tree = Node::Tuple {
        memo_id: MemoId(0),
        items: vec![
            Node::Reference(MemoId(1)),
            Node::Tuple {
                memo_id: MemoId(1),
                items: vec![Node::Reference(MemoId(0))],
            },
        ],
    };
    assert_eq!(
        fablab::load(&tree, &NoRegistry).err(),
        Some(LoadError::UnresolvedReference(MemoId(0)))
    );
}
