//! Harness configuration
//!
//! Defaults suit a local test run. Everything can be overridden from the
//! environment, mirroring how snapshot tools are usually driven from CI:
//!
//! - `SETTLE_UPDATE=no|new|always` (or `BLESS=1` for `always`)
//! - `SETTLE_SNAPSHOT_DIR=<dir>`

use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::constants::{self, env, record};

/// When baselines may be written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UpdateMode {
    /// Never write; a missing baseline is an error (CI)
    No,
    /// Write missing baselines, park mismatches as pending records
    #[default]
    New,
    /// Overwrite mismatching baselines
    Always,
}

impl FromStr for UpdateMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "no" | "none" | "ci" => Ok(UpdateMode::No),
            "new" | "auto" => Ok(UpdateMode::New),
            "always" | "all" | "overwrite" => Ok(UpdateMode::Always),
            other => Err(format!("unknown update mode `{other}`")),
        }
    }
}

impl UpdateMode {
    /// Resolve from `SETTLE_UPDATE` / `BLESS`, falling back to the default
    pub fn from_env() -> Self {
        Self::resolve(
            std::env::var(env::UPDATE).ok().as_deref(),
            std::env::var(env::BLESS).ok().as_deref(),
        )
    }

    fn resolve(update: Option<&str>, bless: Option<&str>) -> Self {
        if bless.is_some_and(|v| v == "1" || v.eq_ignore_ascii_case("true")) {
            return UpdateMode::Always;
        }
        update
            .and_then(|v| v.parse().ok())
            .unwrap_or_default()
    }
}

/// Settings shared by a harness and its snapshot store
#[derive(Debug, Clone)]
pub struct HarnessConfig {
    /// Where baseline records live
    pub snapshot_dir: PathBuf,
    pub update_mode: UpdateMode,
    /// Flush rounds a single settle may take before giving up
    pub max_settle_rounds: usize,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            snapshot_dir: PathBuf::from(record::DEFAULT_DIR),
            update_mode: UpdateMode::default(),
            max_settle_rounds: constants::DEFAULT_MAX_SETTLE_ROUNDS,
        }
    }
}

impl HarnessConfig {
    /// Defaults with environment overrides applied
    pub fn from_env() -> Self {
        let mut config = Self {
            update_mode: UpdateMode::from_env(),
            ..Self::default()
        };
        if let Ok(dir) = std::env::var(env::SNAPSHOT_DIR) {
            config.snapshot_dir = PathBuf::from(dir);
        }
        config
    }

    /// Like [`HarnessConfig::from_env`], with the default snapshot directory
    /// anchored at a crate root (`env!("CARGO_MANIFEST_DIR")`)
    pub fn for_manifest_dir(manifest_dir: &str) -> Self {
        let mut config = Self::from_env();
        if config.snapshot_dir.is_relative() {
            config.snapshot_dir = Path::new(manifest_dir).join(&config.snapshot_dir);
        }
        config
    }

    pub fn with_snapshot_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.snapshot_dir = dir.into();
        self
    }

    pub fn with_update_mode(mut self, mode: UpdateMode) -> Self {
        self.update_mode = mode;
        self
    }

    pub fn with_max_settle_rounds(mut self, rounds: usize) -> Self {
        self.max_settle_rounds = rounds;
        self
    }
}
