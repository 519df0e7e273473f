//! Session save/load core for BubblePop.
//!
//! Two components, bottom-up:
//!   - `store`     — the durable current/backup record pair on disk.
//!   - `scheduler` — the policy of when to write: periodic autosave,
//!                   explicit requests, lifecycle-forced saves, with
//!                   at-most-one write in flight and coalescing.
//!
//! RULES:
//!   - Only store.rs touches the on-disk files.
//!   - The scheduler is the only production caller of SaveStore::save.
//!   - The simulation is reached exclusively through SnapshotProvider.
//!   - Nothing in this crate ever aborts the host process; every
//!     failure in the save/load path degrades to a logged outcome.

pub mod config;
pub mod error;
pub mod provider;
pub mod request;
pub mod scheduler;
pub mod snapshot;
pub mod store;
pub mod timer;
pub mod types;
