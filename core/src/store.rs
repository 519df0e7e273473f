//! Durable save store — the current/backup record pair on disk.
//!
//! RULE: Only store.rs touches the on-disk files.
//! The scheduler decides *when* to save; this module guarantees a
//! reader always sees either the previous complete record or the new
//! complete record, never a partial one.
//!
//! Commit protocol (crash-atomic):
//!   1. Write the encoded record to `savegame.tmp` and fsync it.
//!   2. Copy `savegame.json` to `savegame.bak` (keeps one prior
//!      generation as a recovery fallback).
//!   3. Atomically rename `savegame.tmp` over `savegame.json`.
//!   4. Fsync the directory and clear any leftover staging file,
//!      both best-effort.
//!
//! There is no delete step before the rename: a crash between steps
//! always leaves a complete current record on disk.

use crate::{
    error::SaveResult,
    snapshot::SessionSnapshot,
};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Current record file name.
pub const SAVE_FILE: &str = "savegame.json";
/// Backup (previous generation) file name.
pub const BACKUP_FILE: &str = "savegame.bak";
/// Write-staging file name. Never read back; at most one writer exists.
pub const STAGING_FILE: &str = "savegame.tmp";

/// What a `save` call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// The record was committed as the new current generation.
    Written,
    /// The snapshot's bubble field was empty; nothing touched disk.
    SkippedEmpty,
}

pub struct SaveStore {
    save_path:      PathBuf,
    backup_path:    PathBuf,
    staging_path:   PathBuf,
    has_saved_data: bool,
    cached_payload: Option<String>,
}

impl SaveStore {
    /// Create a store rooted at `dir`. No I/O happens until the first
    /// save or load.
    pub fn new(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            save_path:      dir.join(SAVE_FILE),
            backup_path:    dir.join(BACKUP_FILE),
            staging_path:   dir.join(STAGING_FILE),
            has_saved_data: false,
            cached_payload: None,
        }
    }

    /// Whether a successful save has happened this session.
    pub fn has_saved_data(&self) -> bool {
        self.has_saved_data
    }

    /// The serialized form of the last record this session committed.
    pub fn cached_payload(&self) -> Option<&str> {
        self.cached_payload.as_deref()
    }

    /// Encode `snapshot` and commit it as the new current generation.
    ///
    /// Snapshots with an empty bubble field are rejected before any
    /// I/O — an empty field usually means the simulation has not
    /// finished loading, and persisting it would wipe a valid save.
    ///
    /// I/O failures are logged and surfaced as a non-fatal error; the
    /// store makes no retry within this call. The scheduler's next
    /// cycle is the retry mechanism.
    pub fn save(&mut self, snapshot: &SessionSnapshot) -> SaveResult<SaveOutcome> {
        if snapshot.is_field_empty() {
            log::info!("save: field snapshot is empty, skipping to avoid wiping a valid record");
            return Ok(SaveOutcome::SkippedEmpty);
        }

        let json = snapshot.to_json()?;

        let committed = self.commit(&json);

        // Clear any staging leftover no matter how the commit went.
        if self.staging_path.exists() {
            let _ = fs::remove_file(&self.staging_path);
        }

        match committed {
            Ok(()) => {
                self.has_saved_data = true;
                self.cached_payload = Some(json);
                Ok(SaveOutcome::Written)
            }
            Err(e) => {
                log::warn!("save: commit failed: {e}");
                Err(e.into())
            }
        }
    }

    fn commit(&self, json: &str) -> std::io::Result<()> {
        if let Some(parent) = self.save_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        // Stage the new record and force it to stable storage before
        // any rename becomes visible.
        {
            let mut file = File::create(&self.staging_path)?;
            file.write_all(json.as_bytes())?;
            file.flush()?;
            file.sync_all()?;
        }

        // Keep one prior generation as the recovery fallback.
        if self.save_path.exists() {
            fs::copy(&self.save_path, &self.backup_path)?;
        }

        // Atomic replace. No delete step: a crash on either side of
        // this rename leaves a complete current record in place.
        fs::rename(&self.staging_path, &self.save_path)?;

        if let Some(parent) = self.save_path.parent() {
            if let Ok(dir) = File::open(parent) {
                let _ = dir.sync_all();
            }
        }

        Ok(())
    }

    /// Read the newest decodable generation.
    ///
    /// A current record that is missing, unreadable, empty, or fails
    /// to decode falls back to the backup (logged as a degraded
    /// recovery). Both failing yields `None` — the caller starts a
    /// fresh session.
    pub fn load(&self) -> Option<SessionSnapshot> {
        if let Some(snapshot) = try_read(&self.save_path) {
            return Some(snapshot);
        }
        if let Some(snapshot) = try_read(&self.backup_path) {
            log::warn!("load: current record missing or corrupted, restored from backup");
            return Some(snapshot);
        }
        None
    }

    /// Whether any generation is present on disk. Does not decode.
    pub fn exists(&self) -> bool {
        self.save_path.exists() || self.backup_path.exists()
    }

    /// Best-effort removal of both generations. Individual failures
    /// are swallowed so a missing backup never blocks removing the
    /// current record. Idempotent.
    pub fn delete(&mut self) {
        for path in [&self.save_path, &self.backup_path] {
            if path.exists() {
                if let Err(e) = fs::remove_file(path) {
                    log::warn!("delete: could not remove {}: {e}", path.display());
                }
            }
        }
        self.has_saved_data = false;
        self.cached_payload = None;
    }
}

/// Read and decode one generation. Any failure means "unavailable" —
/// never an error the caller has to handle.
fn try_read(path: &Path) -> Option<SessionSnapshot> {
    if !path.exists() {
        return None;
    }
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) => {
            log::warn!("load: read failed from {}: {e}", path.display());
            return None;
        }
    };
    if text.trim().is_empty() {
        return None;
    }
    match SessionSnapshot::from_json(&text) {
        Ok(snapshot) => Some(snapshot),
        Err(e) => {
            log::warn!("load: decode failed from {}: {e}", path.display());
            None
        }
    }
}
