// -*- coding: utf-8 -*-
// ------------------------------------------------------------------------------------------------
// Copyright © 2026, fablab authors.
// Licensed under either of Apache License, Version 2.0, or MIT license, at your option.
// Please see the LICENSE-APACHE or LICENSE-MIT files in this distribution for license details.
// ------------------------------------------------------------------------------------------------

//! The tagged node tree that both the [`Serializer`][crate::serializer::Serializer] and the
//! [`Builder`][crate::builder::Builder] speak.
//!
//! A node tree is the intermediate form between a live object graph and its text encoding.
//! Every composite node carries the [`MemoId`][] it was assigned when the serializer first met
//! the object, and every later occurrence of that object is written as a
//! [`Reference`][Node::Reference] to it.
//!
//! ```text
//! Tuple #0
//!   ├── 1
//!   ├── 2
//!   └── List #1
//!         ├── 1
//!         ├── 2
//!         └── Reference #0    (closes the cycle back to the tuple)
//! ```
//!
//! Memo ids are dense and assigned in pre-order, so a reference always points at a node that
//! appears earlier in the tree: either a finished sibling or one of its own open ancestors.
//!
//! Dropping a tree never recurses, however deep it is.  Cloning, comparing, and formatting one
//! do.

use std::fmt::Display;

use itertools::Itertools;
use thiserror::Error;

/// The index an object receives the first time it is saved.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct MemoId(pub usize);

impl MemoId {
    pub fn as_usize(self) -> usize {
        self.0
    }
}

impl Display for MemoId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The namespace-qualified name of a class.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct TypePath {
    pub module: String,
    pub name: String,
}

impl TypePath {
    pub fn new<M: Into<String>, N: Into<String>>(module: M, name: N) -> TypePath {
        TypePath {
            module: module.into(),
            name: name.into(),
        }
    }
}

impl Display for TypePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.module, self.name)
    }
}

/// A scalar that is written by value and never deduplicated.
#[derive(Clone, Debug, PartialEq)]
pub enum Literal {
    Int(i64),
    Float(f64),
    Str(String),
}

/// One serialized value or back-reference.
#[derive(Clone, Debug, PartialEq)]
pub enum Node {
    Literal(Literal),
    /// A back-pointer to an object introduced earlier in the tree.
    Reference(MemoId),
    List {
        memo_id: MemoId,
        items: Vec<Node>,
    },
    Tuple {
        memo_id: MemoId,
        items: Vec<Node>,
    },
    Dict {
        memo_id: MemoId,
        items: Vec<(Node, Node)>,
    },
    /// Names a class itself rather than an instance of it.
    Type(TypePath),
    Instance {
        type_path: TypePath,
        memo_id: MemoId,
        attributes: Vec<(Node, Node)>,
    },
}

impl Node {
    pub fn tag(&self) -> NodeTag {
        match self {
            Node::Literal(_) => NodeTag::Literal,
            Node::Reference(_) => NodeTag::Reference,
            Node::List { .. } => NodeTag::List,
            Node::Tuple { .. } => NodeTag::Tuple,
            Node::Dict { .. } => NodeTag::Dict,
            Node::Type(_) => NodeTag::Type,
            Node::Instance { .. } => NodeTag::Instance,
        }
    }

    /// Returns the memo id this node introduces, if any.  References point at a memo id but do
    /// not introduce one.
    pub fn memo_id(&self) -> Option<MemoId> {
        match self {
            Node::List { memo_id, .. }
            | Node::Tuple { memo_id, .. }
            | Node::Dict { memo_id, .. }
            | Node::Instance { memo_id, .. } => Some(*memo_id),
            _ => None,
        }
    }
}

impl Node {
    /// Detaches this node's children, leaving it without any.  Pairs are flattened.
    fn take_children(&mut self) -> Vec<Node> {
        match self {
            Node::List { items, .. } | Node::Tuple { items, .. } => std::mem::take(items),
            Node::Dict { items, .. }
            | Node::Instance {
                attributes: items, ..
            } => std::mem::take(items)
                .into_iter()
                .flat_map(|(key, value)| vec![key, value])
                .collect(),
            _ => Vec::new(),
        }
    }
}

// Trees can nest far deeper than the call stack allows, so they are torn down with a worklist.
impl Drop for Node {
    fn drop(&mut self) {
        let mut pending = self.take_children();
        while let Some(mut node) = pending.pop() {
            pending.append(&mut node.take_children());
        }
    }
}

impl From<Literal> for Node {
    fn from(literal: Literal) -> Node {
        Node::Literal(literal)
    }
}

/// The kind of a [`Node`][], without its payload.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum NodeTag {
    Literal,
    Reference,
    List,
    Tuple,
    Dict,
    Type,
    Instance,
}

impl Display for NodeTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            NodeTag::Literal => "literal",
            NodeTag::Reference => "reference",
            NodeTag::List => "list",
            NodeTag::Tuple => "tuple",
            NodeTag::Dict => "dict",
            NodeTag::Type => "type",
            NodeTag::Instance => "class_instance",
        };
        f.write_str(name)
    }
}

/// A flattened key/value sequence had an odd number of entries.
#[derive(Clone, Copy, Debug, Eq, Error, PartialEq)]
#[error("key/value sequence has odd length {0}")]
pub struct MalformedPairSequence(pub usize);

/// Re-pairs a flattened `[k0, v0, k1, v1, ...]` sequence two at a time, in order.
pub fn into_pairs<T>(flat: Vec<T>) -> Result<Vec<(T, T)>, MalformedPairSequence> {
    if flat.len() % 2 != 0 {
        return Err(MalformedPairSequence(flat.len()));
    }
    Ok(flat.into_iter().tuples().collect())
}
