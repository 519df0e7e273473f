//! Shared primitive types used across the save subsystem.

/// Name of a runtime context (scene) reported by the host.
pub type ContextId = String;

/// Stable identifier for a progress category.
pub type CategoryId = String;

/// Stable identifier for a collection the player can complete.
pub type CollectionId = String;

/// Stable identifier for an inventory item (booster).
pub type ItemId = String;
