// -*- coding: utf-8 -*-
// ------------------------------------------------------------------------------------------------
// Copyright © 2026, fablab authors.
// Licensed under either of Apache License, Version 2.0, or MIT license, at your option.
// Please see the LICENSE-APACHE or LICENSE-MIT files in this distribution for license details.
// ------------------------------------------------------------------------------------------------

//! # fablab: pickling object graphs into plain JSON
//!
//! This crate saves an arbitrary object graph (lists, tuples, dicts, class instances, and the
//! scalars inside them) as a tree of JSON-compatible nodes, and loads an equivalent graph back
//! from that tree.  Unlike a naive tree encoding, it preserves _identity_: an object reachable
//! along two paths is saved once and loaded as one object, and graphs with cycles load with the
//! same cycles.
//!
//! ## Quick example
//!
//! ```
//! use fablab::registry::NoRegistry;
//! use fablab::value::Value;
//!
//! // inner = [1, 2]; outer = (1, 2, inner, 3, 4); inner.append(outer)
//! let inner = Value::list(vec![1.into(), 2.into()]);
//! let outer = Value::tuple(vec![1.into(), 2.into(), inner.clone(), 3.into(), 4.into()]);
//! inner.as_list().unwrap().borrow_mut().push(outer.clone());
//!
//! let text = fablab::dumps(&outer).unwrap();
//! let loaded = fablab::loads(&text, &NoRegistry).unwrap();
//!
//! let tuple = loaded.as_tuple().unwrap();
//! let list = tuple[2].as_list().unwrap().borrow();
//! assert!(list[2].same_object(&loaded));
//! ```
//!
//! ## How it works
//!
//! There are two engines, one per direction, that share the [`node`][] vocabulary:
//!
//! - The [`Serializer`][] walks a [`Value`][] graph and emits a [`Node`][] tree.  Each composite
//!   object gets a memo id the first time it is seen; every later sighting becomes a reference to
//!   that id.
//! - The [`Builder`][] walks a node tree and allocates objects.  Mutable containers and class
//!   instances are allocated _empty_ and registered in the memo before their contents are
//!   loaded, with the loading deferred to a job queue.  That ordering is what lets a reference
//!   inside an object point back at the object itself.
//!
//! The [`wire`][] module turns node trees into JSON and back.  Classes are named in the tree by
//! module and name, and resolved while loading through a [`Registry`][registry::Registry] that
//! the caller supplies.
//!
//! ## What is preserved
//!
//! Every list, tuple, dict, and class instance is saved once, however many places refer to it,
//! and loads as one object.  A reference may point at an object that the loader has not reached
//! yet, such as a list nested inside an earlier sibling's contents; the loader then builds that
//! object ahead of its turn.  Neither engine recurses on the call stack, so a graph nested
//! hundreds of thousands of levels deep can be saved to a [`Node`][] tree and loaded back.
//!
//! ## What is not preserved
//!
//! Integers, floats, and strings are saved by value at every occurrence.  Two positions holding
//! the same string load as two equal strings, not as one shared string.
//!
//! A tuple that contains itself with no list, dict, or instance in between cannot be built by
//! any language with immutable tuples, and fails to load with
//! [`LoadError::UnresolvedReference`][].
//!
//! The JSON form is limited to [`wire::MAX_DEPTH`][] levels of nesting; deeper trees fail with
//! [`WireError::NestingTooDeep`][].

use thiserror::Error;

#[macro_use]
mod debugging;
pub mod builder;
mod config;
pub mod memo;
pub mod node;
pub mod registry;
pub mod serializer;
pub mod stats;
pub mod value;
pub mod wire;

pub use crate::builder::Builder;
pub use crate::builder::LoadError;
pub use crate::config::Config;
pub use crate::node::Node;
pub use crate::serializer::SaveError;
pub use crate::serializer::Serializer;
pub use crate::value::Value;
pub use crate::wire::WireError;

use crate::registry::Registry;

/// Any failure of the JSON entry points.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Save(#[from] SaveError),
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error(transparent)]
    Wire(#[from] WireError),
}

/// Saves an object graph as a node tree.
pub fn save(value: &Value) -> Result<Node, SaveError> {
    Serializer::new().save(value)
}

/// Loads an object graph from a node tree, resolving classes through `registry`.
pub fn load(node: &Node, registry: &dyn Registry) -> Result<Value, LoadError> {
    Builder::new(registry).load(node)
}

/// Saves an object graph as a JSON string.
pub fn dumps(value: &Value) -> Result<String, Error> {
    dumps_with_config(value, Config::default())
}

/// Saves an object graph as a JSON string, indented if `config` asks for pretty output.
///
/// With `collect_stats` set, the totals are written to the `debug` log.  Use a [`Serializer`][]
/// of your own to read them as a [`Stats`][stats::Stats] value.
pub fn dumps_with_config(value: &Value, config: Config) -> Result<String, Error> {
    let node = Serializer::with_config(config).save(value)?;
    Ok(wire::to_string(&node, config.pretty())?)
}

/// Loads an object graph from a JSON string produced by [`dumps`][].
pub fn loads(text: &str, registry: &dyn Registry) -> Result<Value, Error> {
    loads_with_config(text, registry, Config::default())
}

/// Loads an object graph from a JSON string, with the builder configured by `config`.
///
/// With `collect_stats` set, the totals are written to the `debug` log.  Use a [`Builder`][] of
/// your own to read them as a [`Stats`][stats::Stats] value.
pub fn loads_with_config(
    text: &str,
    registry: &dyn Registry,
    config: Config,
) -> Result<Value, Error> {
    let node = wire::from_str(text)?;
    Ok(Builder::with_config(registry, config).load(&node)?)
}
