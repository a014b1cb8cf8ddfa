//! Harness-wide constants
//!
//! Centralized definitions for environment variables, file naming and the
//! snapshot record format.

/// Environment variables read by [`crate::config::HarnessConfig::from_env`]
pub mod env {
    /// Baseline update mode: `no`, `new` or `always`
    pub const UPDATE: &str = "SETTLE_UPDATE";
    /// Alias for `SETTLE_UPDATE=always` when set to `1` or `true`
    pub const BLESS: &str = "BLESS";
    /// Directory holding baseline records
    pub const SNAPSHOT_DIR: &str = "SETTLE_SNAPSHOT_DIR";
    /// Log filter for the `settle` binary
    pub const LOG: &str = "SETTLE_LOG";
}

/// Snapshot record layout
pub mod record {
    /// First line of every record; bump the version when the layout changes
    pub const HEADER: &str = "# settle snapshot v1";
    /// Prefix of the line naming the test a record belongs to
    pub const TEST_PREFIX: &str = "# test: ";
    /// Baseline file extension
    pub const EXTENSION: &str = "snap";
    /// Pending (not yet accepted) record extension
    pub const PENDING_EXTENSION: &str = "snap.new";
    /// Default baseline directory, relative to the crate root
    pub const DEFAULT_DIR: &str = "tests/snapshots";
}

/// Tree conventions shared by components and queries
pub mod tree {
    /// Tag used for text nodes
    pub const TEXT_TAG: &str = "#text";
    /// Property holding a text node's content
    pub const TEXT_PROP: &str = "value";
    /// Property holding whitespace-separated class names
    pub const CLASS_PROP: &str = "className";
    /// Serialized form of a callable property
    pub const FUNCTION_REPR: &str = "[Function]";
}

/// Upper bound on flush rounds within a single settle loop
pub const DEFAULT_MAX_SETTLE_ROUNDS: usize = 10_000;
