//! Debrief configuration stored in `debrief.toml`.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::replay::DEFAULT_MAX_ITERATIONS;
use crate::tree::NodeId;

/// Default config file name, resolved against the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "debrief.toml";

/// Debrief configuration (TOML).
///
/// Intended to be edited by humans. Missing fields fall back to defaults and
/// command-line flags override what is set here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DebriefConfig {
    /// Hard cap on nodes visited by one replay call.
    pub max_iterations: usize,

    /// Root node; the minimum `id` in the tree when unset.
    pub root_id: Option<NodeId>,

    /// Cell values treated as empty (compared case-insensitively after trimming).
    pub empty_markers: Vec<String>,
}

pub fn default_empty_markers() -> Vec<String> {
    ["nan", ".nan", "null"]
        .into_iter()
        .map(str::to_string)
        .collect()
}

impl Default for DebriefConfig {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            root_id: None,
            empty_markers: default_empty_markers(),
        }
    }
}

impl DebriefConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_iterations == 0 {
            return Err(anyhow!("max_iterations must be > 0"));
        }
        if self
            .empty_markers
            .iter()
            .any(|marker| marker.trim().is_empty())
        {
            return Err(anyhow!("empty_markers must not contain blank entries"));
        }
        Ok(())
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `DebriefConfig::default()`.
pub fn load_config(path: &Path) -> Result<DebriefConfig> {
    if !path.exists() {
        debug!(path = %path.display(), "config missing, using defaults");
        let cfg = DebriefConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: DebriefConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("validate {}", path.display()))?;
    debug!(path = %path.display(), max_iterations = cfg.max_iterations, root_id = ?cfg.root_id, "config loaded");
    Ok(cfg)
}
