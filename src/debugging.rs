// -*- coding: utf-8 -*-
// ------------------------------------------------------------------------------------------------
// Copyright © 2026, fablab authors.
// Licensed under either of Apache License, Version 2.0, or MIT license, at your option.
// Please see the LICENSE-APACHE or LICENSE-MIT files in this distribution for license details.
// ------------------------------------------------------------------------------------------------

//! Very verbose tracing of the builder's job queue.
//!
//! [`copious_debugging!`][] prints to stderr like `eprintln!`, but only when the crate is built
//! with the `copious-debugging` feature.  Otherwise it expands to nothing, arguments included, so
//! it is safe to call on hot paths.
//!
//! ```bash
//! cargo test --features copious-debugging
//! ```
//!
//! Use the `log` crate for anything a user of the library might want to see; this macro is for
//! watching placeholders get filled while working on the builder itself.
//!
//! ```rust,ignore
//! copious_debugging!("queued job, {} pending at level {}", jobs.len(), level);
//! ```

/// Prints its arguments to stderr, formatted as by `eprintln!`.
#[cfg(feature = "copious-debugging")]
#[macro_export]
macro_rules! copious_debugging {
    ($($arg:tt)*) => {{ ::std::eprintln!($($arg)*); }}
}

/// Expands to nothing.  Build with the `copious-debugging` feature to see this output.
#[cfg(not(feature = "copious-debugging"))]
#[macro_export]
macro_rules! copious_debugging {
    ($($arg:tt)*) => {};
}
