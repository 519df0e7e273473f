//! Session snapshot — everything needed to rebuild a play session.
//!
//! A snapshot is produced fresh by the host on every save attempt and
//! discarded afterwards; nothing here holds a retained identity.
//! Encoding is a single flat JSON record. Decode failure is a
//! recoverable signal, never a panic.

use crate::{
    error::SaveResult,
    types::{CategoryId, CollectionId, ItemId},
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A 2D vector with the precision the simulation runs at.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// One bubble on the field at capture time.
///
/// Bubbles still under the player's finger are not captured — the
/// provider filters them out — so `is_controlled_top` records whether
/// the bubble was the queued top piece when the session resumes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BubbleSnapshot {
    pub merge_level:       u32,
    pub position:          Vec2,
    pub velocity:          Vec2,
    pub is_controlled_top: bool,
}

/// The full session record persisted between runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub current_score:          u64,
    pub best_score:             u64,
    pub coins:                  u64,
    pub bubbles:                Vec<BubbleSnapshot>,
    pub category_progress:      HashMap<CategoryId, u32>,
    pub collection_completions: HashMap<CollectionId, bool>,
    pub booster_inventory:      HashMap<ItemId, u32>,
}

impl SessionSnapshot {
    /// True when the bubble field is empty. An empty field is
    /// indistinguishable from "simulation not ready yet", so such a
    /// snapshot must never overwrite a valid save.
    pub fn is_field_empty(&self) -> bool {
        self.bubbles.is_empty()
    }

    /// Encode to the on-disk JSON form.
    pub fn to_json(&self) -> SaveResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decode from the on-disk JSON form.
    pub fn from_json(text: &str) -> SaveResult<Self> {
        Ok(serde_json::from_str(text)?)
    }
}
