//! Transient save signals.
//!
//! A request is not a persisted entity — it only carries where the
//! save came from and whether it may bypass the context gate.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a save attempt originated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaveOrigin {
    /// The repeating autosave timer.
    Periodic,
    /// `request_save` / `flush_now` from the host.
    Explicit,
    /// A host lifecycle event (backgrounding, termination).
    Lifecycle,
}

impl fmt::Display for SaveOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SaveOrigin::Periodic  => "periodic",
            SaveOrigin::Explicit  => "explicit",
            SaveOrigin::Lifecycle => "lifecycle",
        };
        f.write_str(name)
    }
}

/// One save signal submitted to the scheduler.
#[derive(Debug, Clone, Copy)]
pub struct SaveRequest {
    pub origin:      SaveOrigin,
    pub bypass_gate: bool,
}

impl SaveRequest {
    /// Autosave tick. Subject to the context gate.
    pub fn periodic() -> Self {
        Self { origin: SaveOrigin::Periodic, bypass_gate: false }
    }

    /// Host-requested save. Always bypasses the gate.
    pub fn explicit() -> Self {
        Self { origin: SaveOrigin::Explicit, bypass_gate: true }
    }

    /// Lifecycle-forced save. Always bypasses the gate; the scheduler
    /// additionally applies the cooldown window before submitting.
    pub fn lifecycle() -> Self {
        Self { origin: SaveOrigin::Lifecycle, bypass_gate: true }
    }
}

/// Host lifecycle notifications the scheduler reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleEvent {
    /// The app moved to the background (e.g. incoming call, app
    /// switch). Saves when lifecycle handling is enabled.
    Background,
    /// The app returned to the foreground. Never saves.
    Foreground,
    /// The process is about to exit. Saves when lifecycle handling is
    /// enabled.
    Termination,
}
