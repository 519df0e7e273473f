//! Snapshot provider trait — the seam between the scheduler and the
//! live simulation.
//!
//! RULE: The save subsystem never reaches into simulation objects.
//! It asks the provider for a snapshot, once per attempt, and treats
//! the result as opaque apart from the empty-field validity check.

use crate::snapshot::SessionSnapshot;

/// The capability the host hands to the scheduler for pulling live
/// session state.
pub trait SnapshotProvider: Send + Sync {
    /// Build a snapshot of the current session.
    ///
    /// Returns `None` when the session state is unavailable (e.g. the
    /// holder object is gone during teardown). The scheduler abandons
    /// the attempt with a warning; this is never fatal.
    fn capture(&self) -> Option<SessionSnapshot>;
}
