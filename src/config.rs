// -*- coding: utf-8 -*-
// ------------------------------------------------------------------------------------------------
// Copyright © 2026, fablab authors.
// Licensed under either of Apache License, Version 2.0, or MIT license, at your option.
// Please see the LICENSE-APACHE or LICENSE-MIT files in this distribution for license details.
// ------------------------------------------------------------------------------------------------

/// Options shared by the serializer, the builder, and the JSON entry points.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Config {
    collect_stats: bool,
    pretty: bool,
}

impl Config {
    /// Whether to record [`Stats`][crate::stats::Stats] during a save or load.
    pub fn collect_stats(&self) -> bool {
        self.collect_stats
    }

    pub fn with_collect_stats(mut self, collect_stats: bool) -> Self {
        self.collect_stats = collect_stats;
        self
    }

    /// Whether [`dumps_with_config`][crate::dumps_with_config] pretty-prints its output.
    pub fn pretty(&self) -> bool {
        self.pretty
    }

    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }
}
