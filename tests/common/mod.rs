//! Common fixtures for integration tests.
//!
//! Provides the sample components the tests mount and a harness
//! constructor that ignores the caller's environment.
//!
//! Note: Each integration test file compiles as a separate crate,
//! so not all helpers are used in every test file. We suppress
//! dead_code warnings at the module level.

#![allow(dead_code)]
#![allow(unused_imports)]

pub mod components;

pub use components::*;

use settle::{Harness, HarnessConfig, RenderedTree};

/// Harness with default settings, independent of `SETTLE_*` variables
pub fn harness() -> Harness {
    Harness::with_config(HarnessConfig::default())
}

/// Settled tree, panicking with the harness error otherwise
pub fn tree(harness: &Harness) -> RenderedTree {
    harness
        .current_tree()
        .unwrap_or_else(|e| panic!("tree should be settled: {e}"))
}
