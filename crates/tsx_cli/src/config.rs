//! Settings read from `tsx.toml`
//!
//! Every field is optional in the file; command-line flags win over it.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tsx_autotile::TieBreak;

/// File picked up from the working directory when `--config` is not given
pub const DEFAULT_CONFIG_FILE: &str = "tsx.toml";

/// How `resolve` chooses between equally good tiles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TieBreakMode {
    /// First tile in declaration order
    #[default]
    First,
    /// Highest probability weight
    Highest,
    /// Weighted random draw
    Random,
}

impl TieBreakMode {
    /// Deterministic resolver setting; `None` for random draws
    pub fn deterministic(self) -> Option<TieBreak> {
        match self {
            TieBreakMode::First => Some(TieBreak::FirstDeclared),
            TieBreakMode::Highest => Some(TieBreak::HighestProbability),
            TieBreakMode::Random => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Version for future migrations
    pub version: u32,
    pub tie_break: TieBreakMode,
    /// Seed for random tie-breaks; drawn from entropy when unset
    pub seed: Option<u64>,
    /// Level used when neither `-v` nor `-q` is given
    pub log_level: String,
    /// Wang set used by `resolve` when `--set` is omitted
    pub default_set: Option<String>,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            version: 1,
            tie_break: TieBreakMode::First,
            seed: None,
            log_level: "warn".to_string(),
            default_set: None,
        }
    }
}

impl CliConfig {
    pub fn from_toml(source: &str) -> Result<Self> {
        toml::from_str(source).context("invalid configuration")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::from_toml(&source).with_context(|| format!("in {}", path.display()))
    }

    /// Load an explicit config file, or `tsx.toml` in `dir` if there is one
    pub fn discover(explicit: Option<&Path>, dir: &Path) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        let fallback: PathBuf = dir.join(DEFAULT_CONFIG_FILE);
        if fallback.is_file() {
            Self::load(&fallback)
        } else {
            Ok(Self::default())
        }
    }
}
