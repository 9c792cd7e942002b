// -*- coding: utf-8 -*-
// ------------------------------------------------------------------------------------------------
// Copyright © 2026, fablab authors.
// Licensed under either of Apache License, Version 2.0, or MIT license, at your option.
// Please see the LICENSE-APACHE or LICENSE-MIT files in this distribution for license details.
// ------------------------------------------------------------------------------------------------

//! Traversal statistics.
//!
//! When [`Config::collect_stats`][crate::Config::collect_stats] is set, the serializer and the
//! builder record a [`Stats`][] value describing the node tree they walked: how many nodes of
//! each kind, how many deferred jobs ran, and how deep the tree went.
//!
//! ```
//! use fablab::stats::FrequencyDistribution;
//!
//! let mut dist = FrequencyDistribution::default();
//! dist.record("list");
//! dist.record("dict");
//! dist.record("list");
//!
//! assert_eq!(dist.count(), 3);
//! assert_eq!(dist.unique(), 2);
//! assert_eq!(dist.get(&"list"), 2);
//! ```

use std::collections::HashMap;
use std::hash::Hash;

use itertools::Itertools;

use crate::node::NodeTag;

/// Tracks how often each distinct value has been recorded.
#[derive(Clone, Debug)]
pub struct FrequencyDistribution<T>
where
    T: Eq + Hash,
{
    values: HashMap<T, usize>,
    total: usize,
}

// A derived impl would require `T: Default`.
impl<T: Eq + Hash> Default for FrequencyDistribution<T> {
    fn default() -> Self {
        FrequencyDistribution {
            values: HashMap::new(),
            total: 0,
        }
    }
}

impl<T: Eq + Hash> FrequencyDistribution<T> {
    /// Counts one more occurrence of a value.
    pub fn record(&mut self, value: T) {
        *self.values.entry(value).or_default() += 1;
        self.total += 1;
    }

    /// Returns the total number of values recorded.
    pub fn count(&self) -> usize {
        self.total
    }

    /// Returns the number of distinct values recorded.
    pub fn unique(&self) -> usize {
        self.values.len()
    }

    /// Returns how often a value was recorded.
    pub fn get(&self, value: &T) -> usize {
        self.values.get(value).copied().unwrap_or(0)
    }
}

impl<T: Eq + Hash + Ord> FrequencyDistribution<T> {
    /// Returns every recorded value with its count, in value order.
    pub fn sorted(&self) -> Vec<(&T, usize)> {
        self.values
            .iter()
            .map(|(value, count)| (value, *count))
            .sorted_by_key(|e| e.0)
            .collect()
    }
}

/// Merges another distribution's counts into this one.
impl<T> std::ops::AddAssign<Self> for FrequencyDistribution<T>
where
    T: Eq + Hash,
{
    fn add_assign(&mut self, rhs: Self) {
        for (value, count) in rhs.values {
            *self.values.entry(value).or_default() += count;
        }
        self.total += rhs.total;
    }
}

impl<T> std::ops::AddAssign<&Self> for FrequencyDistribution<T>
where
    T: Eq + Hash + Clone,
{
    fn add_assign(&mut self, rhs: &Self) {
        for (value, count) in &rhs.values {
            *self.values.entry(value.clone()).or_default() += count;
        }
        self.total += rhs.total;
    }
}

/// What one save or load call walked.
#[derive(Clone, Debug, Default)]
pub struct Stats {
    /// Nodes emitted (when saving) or consumed (when loading), by kind.
    pub nodes: FrequencyDistribution<NodeTag>,
    /// Deferred fill jobs run.  Always zero when saving.
    pub deferred_jobs: usize,
    /// The depth of the deepest node, where the root is at depth 0.
    pub max_depth: usize,
}

impl Stats {
    /// Counts a node of the given kind, found `depth` levels below the root.
    pub(crate) fn record_node(&mut self, tag: NodeTag, depth: usize) {
        self.nodes.record(tag);
        self.max_depth = self.max_depth.max(depth);
    }
}

/// Combines the statistics of two walks.  Counts add up; depth keeps the larger of the two.
impl std::ops::AddAssign<&Stats> for Stats {
    fn add_assign(&mut self, rhs: &Stats) {
        self.nodes += &rhs.nodes;
        self.deferred_jobs += rhs.deferred_jobs;
        self.max_depth = self.max_depth.max(rhs.max_depth);
    }
}
