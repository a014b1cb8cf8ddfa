//! Harness error taxonomy

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::renderer::TargetId;
use crate::snapshot::SnapshotDiff;

/// Errors reported by harness operations
///
/// Every variant is raised synchronously at the call that broke the contract.
/// A snapshot mismatch is not an error: see [`crate::snapshot::MatchResult`].
#[derive(Error, Debug)]
pub enum HarnessError {
    #[error("no component is mounted on target {0}")]
    NotMounted(TargetId),

    #[error("no `{event}` handler bound on <{tag}> or its ancestors")]
    NoHandler { event: String, tag: String },

    #[error("mock for `{0}` has already been restored")]
    MockRestored(String),

    #[error(
        "{updates} pending update(s) and {tasks} ready continuation(s) are not settled; \
         wrap the triggering code in `act`"
    )]
    UnsettledUpdate { updates: usize, tasks: usize },

    #[error("`{0}` is already intercepted; restore the active mock first")]
    AlreadyIntercepted(String),

    #[error("mount target {0} has been detached")]
    TargetDetached(TargetId),

    #[error("no node matches {0}")]
    NodeNotFound(String),

    #[error("expected exactly one node matching {query}, found {count}")]
    AmbiguousQuery { query: String, count: usize },

    #[error("rendered tree does not match the expected tree:\n{0}")]
    TreeMismatch(SnapshotDiff),

    #[error("no baseline for `{0}` and baseline updates are disabled")]
    MissingBaseline(String),

    #[error("updates did not settle within {0} flush rounds")]
    SettleLimit(usize),

    #[error("baseline {path} is corrupt: {reason}")]
    CorruptBaseline { path: PathBuf, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Convenience alias used throughout the crate
pub type Result<T, E = HarnessError> = std::result::Result<T, E>;
