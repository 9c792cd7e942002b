// -*- coding: utf-8 -*-
// ------------------------------------------------------------------------------------------------
// Copyright © 2026, fablab authors.
// Licensed under either of Apache License, Version 2.0, or MIT license, at your option.
// Please see the LICENSE-APACHE or LICENSE-MIT files in this distribution for license details.
// ------------------------------------------------------------------------------------------------

//! Saving a live object graph as a node tree.
//!
//! The serializer walks the graph depth-first.  Each composite object is given the next
//! [`MemoId`][crate::node::MemoId] _before_ its contents are visited, so that a child which points back at one of
//! its ancestors finds that ancestor already in the memo and is written as a
//! [`Reference`][Node::Reference].
//!
//! Literals (integers, floats, and strings) and classes never enter the memo.  They are written
//! out in full at every occurrence.
//!
//! ## Scopes
//!
//! Nodes are emitted onto an accumulator.  Visiting the contents of a container pushes a fresh
//! accumulator, so that when the container's children are done, the accumulator holds exactly
//! those children and nothing from the enclosing level.
//!
//! ```text
//! save([1, (2, 3)])
//!
//!   scope 0: [List #0]
//!   scope 1:   [1, Tuple #1]          ← children of #0
//!   scope 2:         [2, 3]           ← children of #1
//! ```
//!
//! The walk keeps its own stack of open containers instead of recursing, so how deeply a graph
//! can nest is limited by memory rather than by the call stack.

use log::debug;
use log::trace;
use thiserror::Error;

use crate::config::Config;
use crate::memo::SaveMemo;
use crate::node::into_pairs;
use crate::node::Literal;
use crate::node::MalformedPairSequence;
use crate::node::MemoId;
use crate::node::Node;
use crate::node::NodeTag;
use crate::node::TypePath;
use crate::stats::Stats;
use crate::value::Value;

#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum SaveError {
    /// The value has no encoder and no field mapping to fall back on.
    #[error("cannot save value of type {0}")]
    UnsupportedValue(String),
    #[error(transparent)]
    MalformedPairSequence(#[from] MalformedPairSequence),
}

/// Turns object graphs into node trees.
///
/// A serializer can be reused; every call to [`save`][Serializer::save] starts from an empty
/// memo.
#[derive(Default)]
pub struct Serializer {
    config: Config,
    memo: SaveMemo,
    stats: Option<Stats>,
}

impl Serializer {
    pub fn new() -> Serializer {
        Serializer::default()
    }

    pub fn with_config(config: Config) -> Serializer {
        Serializer {
            config,
            ..Serializer::default()
        }
    }

    /// Statistics from the most recent call to [`save`][Serializer::save], if the config asked
    /// for them.
    pub fn stats(&self) -> Option<&Stats> {
        self.stats.as_ref()
    }

    pub fn save(&mut self, value: &Value) -> Result<Node, SaveError> {
        self.memo.clear();
        self.stats = if self.config.collect_stats() {
            Some(Stats::default())
        } else {
            None
        };

        let root = self.save_graph(value)?;
        debug!(
            "saved {} objects into the memo{}",
            self.memo.len(),
            self.stats
                .as_ref()
                .map(|s| format!(", {} nodes", s.nodes.count()))
                .unwrap_or_default(),
        );
        Ok(root)
    }

    /// Walks the graph with an explicit stack of open composites.  `current` is the innermost
    /// one; `parents` holds the rest, outermost first.
    fn save_graph(&mut self, root: &Value) -> Result<Node, SaveError> {
        let mut current = match self.visit(root)? {
            Visit::Done(node) => {
                self.record(node.tag(), 0);
                return Ok(node);
            }
            Visit::Open(frame) => frame,
        };
        let mut parents: Vec<Frame> = Vec::new();
        loop {
            if let Some(child) = current.children.next() {
                match self.visit(&child)? {
                    Visit::Done(node) => {
                        self.record(node.tag(), parents.len() + 1);
                        current.items.push(node);
                    }
                    Visit::Open(frame) => parents.push(std::mem::replace(&mut current, frame)),
                }
                continue;
            }
            match parents.pop() {
                Some(parent) => {
                    let node = std::mem::replace(&mut current, parent).finish()?;
                    self.record(node.tag(), parents.len() + 1);
                    current.items.push(node);
                }
                None => {
                    let node = current.finish()?;
                    self.record(node.tag(), 0);
                    return Ok(node);
                }
            }
        }
    }

    /// Saves a value that needs no children of its own, or opens a frame for one that does.
    fn visit(&mut self, value: &Value) -> Result<Visit, SaveError> {
        match value {
            Value::Int(value) => return Ok(Visit::Done(Literal::Int(*value).into())),
            Value::Float(value) => return Ok(Visit::Done(Literal::Float(*value).into())),
            Value::Str(value) => return Ok(Visit::Done(Literal::Str(value.to_string()).into())),
            Value::Type(class) => return Ok(Visit::Done(Node::Type(class.path().clone()))),
            Value::Opaque(opaque) => {
                return Err(SaveError::UnsupportedValue(opaque.type_name().to_string()))
            }
            _ => {}
        }

        let identity = match value.identity() {
            Some(identity) => identity,
            None => return Err(SaveError::UnsupportedValue(value.kind_name().to_string())),
        };
        let (memo_id, is_new) = self.memo.get_or_insert(identity);
        if !is_new {
            trace!("{} seen before, saving a reference", memo_id);
            return Ok(Visit::Done(Node::Reference(memo_id)));
        }

        trace!("saving {} as {}", value.kind_name(), memo_id);
        let (shell, children) = match value {
            Value::List(list) => (Shell::List(memo_id), list.borrow().clone()),
            Value::Tuple(tuple) => (Shell::Tuple(memo_id), tuple.to_vec()),
            Value::Dict(dict) => (
                Shell::Dict(memo_id),
                dict.borrow()
                    .iter()
                    .flat_map(|(key, value)| vec![key.clone(), value.clone()])
                    .collect(),
            ),
            Value::Object(object) => (
                Shell::Instance(object.class().path().clone(), memo_id),
                object
                    .fields()
                    .iter()
                    .flat_map(|(name, value)| vec![Value::from(name), value.clone()])
                    .collect(),
            ),
            _ => return Err(SaveError::UnsupportedValue(value.kind_name().to_string())),
        };
        Ok(Visit::Open(Frame {
            shell,
            items: Vec::with_capacity(children.len()),
            children: children.into_iter(),
        }))
    }

    fn record(&mut self, tag: NodeTag, depth: usize) {
        if let Some(stats) = &mut self.stats {
            stats.record_node(tag, depth);
        }
    }
}

enum Visit {
    Done(Node),
    Open(Frame),
}

/// A composite whose children are still being saved.
///
/// `items` is the frame's own scope: it receives exactly this composite's children, in order,
/// and nothing from the levels around it.  Dict entries and instance fields are flattened to
/// alternating keys and values until the frame is finished.
struct Frame {
    shell: Shell,
    children: std::vec::IntoIter<Value>,
    items: Vec<Node>,
}

/// What a frame turns into once its children are done.
enum Shell {
    List(MemoId),
    Tuple(MemoId),
    Dict(MemoId),
    Instance(TypePath, MemoId),
}

impl Frame {
    fn finish(self) -> Result<Node, SaveError> {
        let items = self.items;
        let node = match self.shell {
            Shell::List(memo_id) => Node::List { memo_id, items },
            Shell::Tuple(memo_id) => Node::Tuple { memo_id, items },
            Shell::Dict(memo_id) => Node::Dict {
                memo_id,
                items: into_pairs(items)?,
            },
            Shell::Instance(type_path, memo_id) => Node::Instance {
                type_path,
                memo_id,
                attributes: into_pairs(items)?,
            },
        };
        Ok(node)
    }
}
