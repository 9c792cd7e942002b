// -*- coding: utf-8 -*-
// ------------------------------------------------------------------------------------------------
// Copyright © 2026, fablab authors.
// Licensed under either of Apache License, Version 2.0, or MIT license, at your option.
// Please see the LICENSE-APACHE or LICENSE-MIT files in this distribution for license details.
// ------------------------------------------------------------------------------------------------

//! Loading a node tree back into a live object graph.
//!
//! ## Placeholders first, contents later
//!
//! A reference can point at an object whose node is still open, such as a list that contains
//! itself.  For that reference to resolve, the object has to exist before its contents are
//! loaded.  The builder therefore splits every mutable composite into two steps:
//!
//! 1. **Allocate.**  An empty list, an empty dict, or a raw class instance with no fields is
//!    created and registered in the memo under the node's memo id.  No constructor runs.
//! 2. **Fill.**  A deferred job is queued that will later load the node's contents and put them
//!    into the placeholder.
//!
//! Jobs are kept in levels.  A fill job loads its contents with a fresh level of its own and
//! runs every job those contents queue before the placeholder is filled, so a container is
//! complete by the time the job that fills it is done.  The root level is drained by
//! [`Builder::load`][] before it returns.
//!
//! ## Tuples
//!
//! A tuple cannot change once it exists, so it cannot be a placeholder.  Its items are loaded
//! right away, in a child scope, and the tuple is registered only once they are all there.
//! Mutable items inside it are allocated as placeholders in the usual way, but their fill jobs
//! join the enclosing level and so run _after_ the tuple has been registered.  That is what lets
//! a list inside a tuple refer back to the tuple:
//!
//! ```text
//! Tuple #0 [1, 2, List #1 [1, 2, Reference #0], 3, 4]
//!
//!   load Tuple #0
//!     load 1, 2
//!     allocate List #1, queue fill(#1)
//!     load 3, 4
//!   register Tuple #0 = (1, 2, [], 3, 4)
//!   run fill(#1): load 1, 2, Reference #0  → the tuple
//! ```
//!
//! A tuple can still never close a cycle on its own: a reference to a tuple from _inside_ its
//! own items, with no list, dict, or instance in between, fails with
//! [`LoadError::UnresolvedReference`][].
//!
//! ## Fetching ahead
//!
//! A reference may name an object whose node sits inside a container that has not been filled
//! yet, such as a list that appears in an earlier sibling's contents.  When a reference misses
//! the memo, the builder finds the node that introduces the memo id and builds just that object
//! ahead of its turn: a list, dict, or instance is allocated and registered without queueing its
//! fill, and a tuple is built from items that are fetched ahead the same way.  When the walk
//! later reaches the node in its proper place, it reuses the object and queues the fill then, so
//! no job ever runs before its level is drained.
//!
//! ```text
//! Tuple #0 [List #1 [Reference #0], List #2 [List #3 []], Reference #3]
//!
//!   load Tuple #0
//!     allocate List #1, queue fill(#1)
//!     allocate List #2, queue fill(#2)
//!     Reference #3 misses: allocate List #3 ahead of its turn
//!   register Tuple #0
//!   run fill(#1): Reference #0  → the tuple
//!   run fill(#2): List #3 is already allocated, queue fill(#3)
//! ```
//!
//! ## No recursion
//!
//! The builder keeps its own stack of frames instead of recursing, so a tree nested thousands
//! of levels deep loads without exhausting the call stack.

use std::cell::RefCell;
use std::collections::HashMap;
use std::collections::HashSet;
use std::collections::VecDeque;
use std::rc::Rc;

use log::debug;
use log::trace;
use thiserror::Error;

use crate::config::Config;
use crate::memo::LoadMemo;
use crate::node::into_pairs;
use crate::node::Literal;
use crate::node::MalformedPairSequence;
use crate::node::MemoId;
use crate::node::Node;
use crate::node::NodeTag;
use crate::registry::Registry;
use crate::registry::RegistryError;
use crate::stats::Stats;
use crate::value::Dict;
use crate::value::Object;
use crate::value::Value;

#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum LoadError {
    #[error("reference to unknown object {0}")]
    UnresolvedReference(MemoId),
    #[error("object {0} is defined more than once")]
    DuplicateMemoId(MemoId),
    #[error("field name must be a string, found {0}")]
    InvalidFieldName(String),
    #[error(transparent)]
    MalformedPairSequence(#[from] MalformedPairSequence),
    #[error(transparent)]
    TypeResolution(#[from] RegistryError),
}

/// Turns node trees into object graphs, resolving class names through a [`Registry`][].
pub struct Builder<'r> {
    registry: &'r dyn Registry,
    config: Config,
    stats: Option<Stats>,
}

impl<'r> Builder<'r> {
    pub fn new(registry: &'r dyn Registry) -> Builder<'r> {
        Builder::with_config(registry, Config::default())
    }

    pub fn with_config(registry: &'r dyn Registry, config: Config) -> Builder<'r> {
        Builder {
            registry,
            config,
            stats: None,
        }
    }

    /// Statistics from the most recent call to [`load`][Builder::load], if the config asked for
    /// them.
    pub fn stats(&self) -> Option<&Stats> {
        self.stats.as_ref()
    }

    pub fn load(&mut self, root: &Node) -> Result<Value, LoadError> {
        let mut session = Session::new(self.registry, root, self.config.collect_stats());
        let result = session.run();
        debug!(
            "loaded {} objects into the memo{}",
            session.memo.len(),
            session
                .stats
                .as_ref()
                .map(|s| format!(", {} deferred jobs", s.deferred_jobs))
                .unwrap_or_default(),
        );
        self.stats = session.stats.take();
        result
    }
}

/// The children of one node, in load order.  Pairs are walked key first.
#[derive(Clone, Copy)]
enum Children<'n> {
    Items(&'n [Node]),
    Pairs(&'n [(Node, Node)]),
}

impl<'n> Children<'n> {
    fn of(node: &'n Node) -> Children<'n> {
        match node {
            Node::List { items, .. } | Node::Tuple { items, .. } => Children::Items(items),
            Node::Dict { items, .. } => Children::Pairs(items),
            Node::Instance { attributes, .. } => Children::Pairs(attributes),
            _ => Children::Items(Default::default()),
        }
    }

    fn len(self) -> usize {
        match self {
            Children::Items(items) => items.len(),
            Children::Pairs(pairs) => pairs.len() * 2,
        }
    }

    fn get(self, index: usize) -> Option<&'n Node> {
        match self {
            Children::Items(items) => items.get(index),
            Children::Pairs(pairs) => pairs.get(index / 2).map(|(key, value)| {
                if index % 2 == 0 {
                    key
                } else {
                    value
                }
            }),
        }
    }

    fn iter(self) -> impl Iterator<Item = &'n Node> {
        (0..self.len()).filter_map(move |index| self.get(index))
    }
}

/// An allocated object that is still waiting for its contents.
enum Placeholder {
    List(Rc<RefCell<Vec<Value>>>),
    Dict(Rc<RefCell<Dict>>),
    Object(Rc<Object>),
}

impl Placeholder {
    fn value(&self) -> Value {
        match self {
            Placeholder::List(list) => Value::List(list.clone()),
            Placeholder::Dict(dict) => Value::Dict(dict.clone()),
            Placeholder::Object(object) => Value::Object(object.clone()),
        }
    }
}

/// A deferred fill of a placeholder that has already been allocated and registered.
struct Job<'n> {
    placeholder: Placeholder,
    children: Children<'n>,
    /// The tree depth of the placeholder's children.
    depth: usize,
}

/// Whether a scope is loading nodes in their proper place or fetching them ahead of it.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Mode {
    Load,
    Prefetch,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum TupleBuild {
    /// Built in its proper place.
    Load,
    /// Built ahead of its turn.  `put` says whether the parent scope takes the value, which it
    /// does not when the fetch was started by a reference that will simply look again.
    Prefetch { put: bool },
    /// Already built ahead of its turn; the walk passes through its items to queue their fills.
    Revisit,
}

/// Who a scope's values are handed to when it closes.
enum Owner<'n> {
    Root,
    Fill(Job<'n>),
    Tuple { memo_id: MemoId, build: TupleBuild },
}

impl Owner<'_> {
    fn mode(&self) -> Mode {
        match self {
            Owner::Tuple {
                build: TupleBuild::Prefetch { .. },
                ..
            } => Mode::Prefetch,
            _ => Mode::Load,
        }
    }
}

/// What to do with a job level once it is empty.
enum Finish<'n> {
    Root,
    Fill(Job<'n>),
}

enum Frame<'n> {
    /// Loads a node's children one at a time into a scope of their own.
    Scope {
        owner: Owner<'n>,
        children: Children<'n>,
        next: usize,
        depth: usize,
        values: Vec<Value>,
    },
    /// Runs the jobs at the current level, then fills the placeholder the level belongs to.
    Drain { finish: Finish<'n>, values: Vec<Value> },
}

impl<'n> Frame<'n> {
    fn scope(owner: Owner<'n>, children: Children<'n>, depth: usize) -> Frame<'n> {
        Frame::Scope {
            owner,
            children,
            next: 0,
            depth,
            values: Vec::with_capacity(children.len()),
        }
    }
}

/// The next thing the innermost frame wants done.
enum Action<'n> {
    Step {
        node: &'n Node,
        depth: usize,
        mode: Mode,
    },
    Close,
    Drain,
}

enum Step {
    /// The node's value is ready.
    Value(Value),
    /// A scope was opened for the node's items; its value arrives when that scope closes.
    Entered,
    /// The node was a reference that missed, and its target is now being fetched ahead.  Look
    /// again once the frames above have run.
    Retry,
}

/// An object that was built ahead of its turn and has not been reached in its proper place.
enum Prefetched {
    Placeholder(Placeholder),
    Tuple,
}

/// The state of one load call.
struct Session<'r, 'n> {
    registry: &'r dyn Registry,
    root: &'n Node,
    memo: LoadMemo,
    frames: Vec<Frame<'n>>,
    jobs: VecDeque<Job<'n>>,
    meta_jobs: Vec<VecDeque<Job<'n>>>,
    /// Tuples whose items are being loaded.
    open_tuples: HashSet<MemoId>,
    prefetched: HashMap<MemoId, Prefetched>,
    /// Every node that introduces a memo id, built on the first reference that misses.
    index: Option<HashMap<MemoId, &'n Node>>,
    stats: Option<Stats>,
}

impl<'r, 'n> Session<'r, 'n> {
    fn new(registry: &'r dyn Registry, root: &'n Node, collect_stats: bool) -> Session<'r, 'n> {
        Session {
            registry,
            root,
            memo: LoadMemo::new(),
            frames: Vec::new(),
            jobs: VecDeque::new(),
            meta_jobs: Vec::new(),
            open_tuples: HashSet::new(),
            prefetched: HashMap::new(),
            index: None,
            stats: if collect_stats {
                Some(Stats::default())
            } else {
                None
            },
        }
    }

    fn run(&mut self) -> Result<Value, LoadError> {
        let root = Children::Items(std::slice::from_ref(self.root));
        self.frames.push(Frame::scope(Owner::Root, root, 0));
        let mut values = self.work()?;
        // The root scope holds exactly the root node.
        Ok(values.remove(0))
    }

    /// Runs frames until none are left, and returns the values of the root scope.
    fn work(&mut self) -> Result<Vec<Value>, LoadError> {
        let mut root = Vec::new();
        while let Some(frame) = self.frames.last_mut() {
            let action = match frame {
                Frame::Scope {
                    owner,
                    children,
                    next,
                    depth,
                    ..
                } => match children.get(*next) {
                    Some(node) => Action::Step {
                        node,
                        depth: *depth,
                        mode: owner.mode(),
                    },
                    None => Action::Close,
                },
                Frame::Drain { .. } => Action::Drain,
            };
            match action {
                Action::Step { node, depth, mode } => {
                    let at = self.frames.len() - 1;
                    let step = self.step(node, depth, mode)?;
                    if let Step::Retry = step {
                        continue;
                    }
                    if mode == Mode::Load {
                        self.record(node.tag(), depth);
                    }
                    if let Some(Frame::Scope { next, .. }) = self.frames.get_mut(at) {
                        *next += 1;
                    }
                    if let Step::Value(value) = step {
                        self.put(value);
                    }
                }
                Action::Close => {
                    if let Some(Frame::Scope { owner, values, .. }) = self.frames.pop() {
                        self.close(owner, values)?;
                    }
                }
                Action::Drain => match self.jobs.pop_front() {
                    Some(job) => {
                        if let Some(stats) = &mut self.stats {
                            stats.deferred_jobs += 1;
                        }
                        self.push_jobs();
                        let (children, depth) = (job.children, job.depth);
                        self.frames
                            .push(Frame::scope(Owner::Fill(job), children, depth));
                    }
                    None => {
                        if let Some(Frame::Drain { finish, values }) = self.frames.pop() {
                            match finish {
                                Finish::Root => root = values,
                                Finish::Fill(job) => {
                                    self.pop_jobs();
                                    self.fill(job, values)?;
                                }
                            }
                        }
                    }
                },
            }
        }
        Ok(root)
    }

    fn step(&mut self, node: &'n Node, depth: usize, mode: Mode) -> Result<Step, LoadError> {
        match node {
            Node::Literal(Literal::Int(value)) => Ok(Step::Value(Value::Int(*value))),
            Node::Literal(Literal::Float(value)) => Ok(Step::Value(Value::Float(*value))),
            Node::Literal(Literal::Str(value)) => Ok(Step::Value(Value::from(value.as_str()))),
            Node::Type(path) => Ok(Step::Value(Value::Type(self.registry.resolve(path)?))),
            Node::Reference(memo_id) => match self.memo.get(*memo_id) {
                Some(value) => Ok(Step::Value(value.clone())),
                None => {
                    self.prefetch(*memo_id)?;
                    Ok(Step::Retry)
                }
            },
            Node::Tuple { memo_id, items } => self.enter_tuple(*memo_id, items, depth, mode),
            Node::List { memo_id, items } => {
                self.enter_placeholder(*memo_id, Children::of(node), depth, mode, || {
                    Ok(Placeholder::List(Rc::new(RefCell::new(Vec::with_capacity(
                        items.len(),
                    )))))
                })
            }
            Node::Dict { memo_id, .. } => {
                self.enter_placeholder(*memo_id, Children::of(node), depth, mode, || {
                    Ok(Placeholder::Dict(Rc::new(RefCell::new(Dict::new()))))
                })
            }
            Node::Instance {
                type_path, memo_id, ..
            } => {
                let registry = self.registry;
                self.enter_placeholder(*memo_id, Children::of(node), depth, mode, || {
                    Ok(Placeholder::Object(registry.resolve(type_path)?.allocate()))
                })
            }
        }
    }

    /// Allocates and registers a list, dict, or instance.  In load mode its fill is queued at
    /// the current level; when fetching ahead the fill is held back until the walk reaches the
    /// node in its proper place.
    fn enter_placeholder<F>(
        &mut self,
        memo_id: MemoId,
        children: Children<'n>,
        depth: usize,
        mode: Mode,
        allocate: F,
    ) -> Result<Step, LoadError>
    where
        F: FnOnce() -> Result<Placeholder, LoadError>,
    {
        let placeholder = match self.prefetched.remove(&memo_id) {
            Some(Prefetched::Placeholder(placeholder)) => placeholder,
            Some(Prefetched::Tuple) => return Err(LoadError::DuplicateMemoId(memo_id)),
            None => {
                let placeholder = allocate()?;
                self.register(memo_id, placeholder.value())?;
                placeholder
            }
        };
        let value = placeholder.value();
        match mode {
            Mode::Load => self.defer(Job {
                placeholder,
                children,
                depth: depth + 1,
            }),
            Mode::Prefetch => {
                self.prefetched
                    .insert(memo_id, Prefetched::Placeholder(placeholder));
            }
        }
        Ok(Step::Value(value))
    }

    fn enter_tuple(
        &mut self,
        memo_id: MemoId,
        items: &'n [Node],
        depth: usize,
        mode: Mode,
    ) -> Result<Step, LoadError> {
        let build = match (self.prefetched.get(&memo_id), mode) {
            (Some(Prefetched::Tuple), Mode::Prefetch) => {
                return self.lookup(memo_id).map(Step::Value)
            }
            (Some(Prefetched::Tuple), Mode::Load) => {
                self.prefetched.remove(&memo_id);
                TupleBuild::Revisit
            }
            (Some(Prefetched::Placeholder(_)), _) => {
                return Err(LoadError::DuplicateMemoId(memo_id))
            }
            (None, Mode::Load) => TupleBuild::Load,
            (None, Mode::Prefetch) => TupleBuild::Prefetch { put: true },
        };
        self.open_tuple(memo_id, items, build, depth + 1)?;
        Ok(Step::Entered)
    }

    fn open_tuple(
        &mut self,
        memo_id: MemoId,
        items: &'n [Node],
        build: TupleBuild,
        depth: usize,
    ) -> Result<(), LoadError> {
        if build != TupleBuild::Revisit && !self.open_tuples.insert(memo_id) {
            return Err(LoadError::DuplicateMemoId(memo_id));
        }
        let owner = Owner::Tuple { memo_id, build };
        self.frames
            .push(Frame::scope(owner, Children::Items(items), depth));
        Ok(())
    }

    fn close(&mut self, owner: Owner<'n>, values: Vec<Value>) -> Result<(), LoadError> {
        let (memo_id, build) = match owner {
            Owner::Root => {
                self.frames.push(Frame::Drain {
                    finish: Finish::Root,
                    values,
                });
                return Ok(());
            }
            Owner::Fill(job) => {
                self.frames.push(Frame::Drain {
                    finish: Finish::Fill(job),
                    values,
                });
                return Ok(());
            }
            Owner::Tuple { memo_id, build } => (memo_id, build),
        };
        if build == TupleBuild::Revisit {
            let value = self.lookup(memo_id)?;
            self.put(value);
            return Ok(());
        }
        self.open_tuples.remove(&memo_id);
        trace!("registering tuple {} with {} items", memo_id, values.len());
        let value = self.register(memo_id, Value::tuple(values))?;
        match build {
            TupleBuild::Prefetch { put } => {
                self.prefetched.insert(memo_id, Prefetched::Tuple);
                if put {
                    self.put(value);
                }
            }
            _ => self.put(value),
        }
        Ok(())
    }

    /// Builds the object a missed reference names, ahead of its turn.  A tuple is opened as a
    /// scope of its own; anything else is ready by the time this returns.
    fn prefetch(&mut self, memo_id: MemoId) -> Result<(), LoadError> {
        if self.open_tuples.contains(&memo_id) {
            return Err(LoadError::UnresolvedReference(memo_id));
        }
        let node = self
            .find(memo_id)
            .ok_or(LoadError::UnresolvedReference(memo_id))?;
        trace!("{} not loaded yet, fetching it ahead of its turn", memo_id);
        match node {
            Node::Tuple { items, .. } => {
                self.open_tuple(memo_id, items, TupleBuild::Prefetch { put: false }, 0)
            }
            _ => self.step(node, 0, Mode::Prefetch).map(|_| ()),
        }
    }

    fn find(&mut self, memo_id: MemoId) -> Option<&'n Node> {
        let root = self.root;
        self.index
            .get_or_insert_with(|| index_tree(root))
            .get(&memo_id)
            .copied()
    }

    fn lookup(&self, memo_id: MemoId) -> Result<Value, LoadError> {
        self.memo
            .get(memo_id)
            .cloned()
            .ok_or(LoadError::UnresolvedReference(memo_id))
    }

    fn register(&mut self, memo_id: MemoId, value: Value) -> Result<Value, LoadError> {
        if !self.memo.insert(memo_id, value.clone()) {
            return Err(LoadError::DuplicateMemoId(memo_id));
        }
        Ok(value)
    }

    fn fill(&mut self, job: Job<'n>, values: Vec<Value>) -> Result<(), LoadError> {
        match job.placeholder {
            Placeholder::List(list) => list.borrow_mut().extend(values),
            Placeholder::Dict(dict) => {
                // Build the mapping before borrowing the placeholder, since key comparison may
                // need to look inside it.
                let filled = into_pairs(values)?.into_iter().collect::<Dict>();
                *dict.borrow_mut() = filled;
            }
            Placeholder::Object(object) => {
                for (name, value) in into_pairs(values)? {
                    match name {
                        Value::Str(name) => {
                            object.set(name, value);
                        }
                        other => return Err(LoadError::InvalidFieldName(format!("{:?}", other))),
                    }
                }
            }
        }
        copious_debugging!(
            "filled placeholder, {} jobs pending at level {}",
            self.jobs.len(),
            self.meta_jobs.len()
        );
        Ok(())
    }

    fn defer(&mut self, job: Job<'n>) {
        self.jobs.push_back(job);
        copious_debugging!(
            "queued job, {} pending at level {}",
            self.jobs.len(),
            self.meta_jobs.len()
        );
    }

    fn record(&mut self, tag: NodeTag, depth: usize) {
        if let Some(stats) = &mut self.stats {
            stats.record_node(tag, depth);
        }
    }

    fn put(&mut self, value: Value) {
        if let Some(Frame::Scope { values, .. }) = self.frames.last_mut() {
            values.push(value);
        }
    }

    fn push_jobs(&mut self) {
        self.meta_jobs.push(std::mem::take(&mut self.jobs));
    }

    fn pop_jobs(&mut self) {
        self.jobs = self.meta_jobs.pop().unwrap_or_default();
    }
}

/// Maps every memo id in a tree to the node that introduces it.
fn index_tree(root: &Node) -> HashMap<MemoId, &Node> {
    let mut index = HashMap::new();
    let mut pending = vec![root];
    while let Some(node) = pending.pop() {
        if let Some(memo_id) = node.memo_id() {
            index.entry(memo_id).or_insert(node);
        }
        pending.extend(Children::of(node).iter());
    }
    index
}
