use std::{fs, path::Path};

use anyhow::{Context, Result};
use safepath_system_danger_field::DangerFieldTuning;
use safepath_system_pathfinding::{DistanceTuning, PathfinderTuning};
use serde::{Deserialize, Serialize};

/// Tuning for every system driven by the CLI, loaded from JSON.
///
/// Missing sections and fields keep their defaults.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct SafepathConfig {
    /// Snapping and A* limits.
    pub(crate) pathfinder: PathfinderTuning,
    /// Path-distance cache and budgets.
    pub(crate) distance: DistanceTuning,
    /// Danger-field rebuild cadence and scoring.
    pub(crate) danger_field: DangerFieldTuning,
}

impl SafepathConfig {
    /// Reads and validates a configuration file.
    pub(crate) fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("invalid config file {}", path.display()))
    }

    pub(crate) fn parse(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text).context("malformed JSON")?;
        config.pathfinder.validate()?;
        config.distance.validate()?;
        config.danger_field.validate()?;
        Ok(config)
    }
}
