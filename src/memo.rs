// -*- coding: utf-8 -*-
// ------------------------------------------------------------------------------------------------
// Copyright © 2026, fablab authors.
// Licensed under either of Apache License, Version 2.0, or MIT license, at your option.
// Please see the LICENSE-APACHE or LICENSE-MIT files in this distribution for license details.
// ------------------------------------------------------------------------------------------------

//! Identity memo tables, one for each direction.
//!
//! While saving, [`SaveMemo`][] maps object identities to the memo ids they were given, in the
//! order the objects were first seen.  While loading, [`LoadMemo`][] maps memo ids back to the
//! objects that were allocated for them.  Both tables live for a single save or load call.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use crate::node::MemoId;
use crate::value::Identity;
use crate::value::Value;

/// Assigns dense memo ids to object identities, starting at 0.
#[derive(Default)]
pub struct SaveMemo {
    ids: HashMap<Identity, MemoId>,
}

impl SaveMemo {
    /// Creates an empty memo.  The first identity inserted gets memo id 0.
    pub fn new() -> SaveMemo {
        SaveMemo::default()
    }

    /// Returns the memo id an identity was given, if it has been seen.
    pub fn get(&self, identity: Identity) -> Option<MemoId> {
        self.ids.get(&identity).copied()
    }

    /// Returns the memo id of an identity, assigning the next free one if it has not been seen.
    /// The flag is `true` when the id was assigned by this call.
    pub fn get_or_insert(&mut self, identity: Identity) -> (MemoId, bool) {
        let next = MemoId(self.ids.len());
        match self.ids.entry(identity) {
            Entry::Occupied(entry) => (*entry.get(), false),
            Entry::Vacant(entry) => (*entry.insert(next), true),
        }
    }

    /// Returns how many identities have been given memo ids, which is also the next id to be
    /// handed out.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Forgets every identity, so that numbering starts again from 0.
    pub fn clear(&mut self) {
        self.ids.clear();
    }
}

/// Maps memo ids to the objects allocated for them.
///
/// An entry is added as soon as an object exists, which for lists, dicts, and instances is
/// before any of their contents have been loaded.
#[derive(Default)]
pub struct LoadMemo {
    objects: HashMap<MemoId, Value>,
}

impl LoadMemo {
    pub fn new() -> LoadMemo {
        LoadMemo::default()
    }

    /// Returns the object registered under a memo id.  For a list, dict, or instance this may
    /// be a placeholder whose contents have not been loaded yet.
    pub fn get(&self, memo_id: MemoId) -> Option<&Value> {
        self.objects.get(&memo_id)
    }

    /// Registers an object.  Returns `false`, leaving the table untouched, if the memo id is
    /// already taken.
    pub fn insert(&mut self, memo_id: MemoId, value: Value) -> bool {
        match self.objects.entry(memo_id) {
            Entry::Occupied(_) => false,
            Entry::Vacant(entry) => {
                entry.insert(value);
                true
            }
        }
    }

    /// Returns how many objects have been registered.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}
