//! Scheduler configuration.
//!
//! Defaults match the shipped tuning: autosave every 1.5 s of real
//! time, gated to the game scene, lifecycle saves off. The autosave
//! interval is clamped to a floor so a bad config file cannot turn the
//! timer into a busy loop.

use crate::error::SaveResult;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Floor for the autosave interval, in seconds.
pub const MIN_AUTOSAVE_INTERVAL_SECS: f64 = 0.2;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SaveConfig {
    /// Autosave period in seconds of real time.
    pub autosave_interval_secs: f64,
    /// When true, periodic autosaves only fire in `required_context`.
    pub autosave_only_in_context: bool,
    /// Context (scene) name the gate compares against.
    pub required_context: String,
    /// When true, `Background`/`Termination` lifecycle events trigger a
    /// forced save.
    pub handle_lifecycle_saves: bool,
    /// Minimum real time between lifecycle-forced saves, in seconds.
    pub lifecycle_cooldown_secs: f64,
}

impl Default for SaveConfig {
    fn default() -> Self {
        Self {
            autosave_interval_secs:   1.5,
            autosave_only_in_context: true,
            required_context:         "GameScene".to_string(),
            handle_lifecycle_saves:   false,
            lifecycle_cooldown_secs:  0.25,
        }
    }
}

impl SaveConfig {
    /// Load from a JSON file. Missing fields fall back to defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> SaveResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            anyhow::anyhow!("Cannot read {}: {e}", path.display())
        })?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Autosave period with the busy-loop floor applied.
    pub fn autosave_interval(&self) -> Duration {
        Duration::from_secs_f64(
            self.autosave_interval_secs.max(MIN_AUTOSAVE_INTERVAL_SECS),
        )
    }

    /// Lifecycle cooldown window, never negative.
    pub fn lifecycle_cooldown(&self) -> Duration {
        Duration::from_secs_f64(self.lifecycle_cooldown_secs.max(0.0))
    }
}
