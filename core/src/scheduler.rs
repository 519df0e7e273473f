//! Save scheduler — decides *when* the store writes.
//!
//! State machine per instance: Idle -> Saving -> Idle, with a pending
//! flag that coalesces every request arriving mid-write into exactly
//! one follow-up.
//!
//! RULES:
//!   - At most one physical write is ever in flight. The Saving state
//!     is an atomic flag acquired by compare-exchange, so an autosave
//!     tick racing an explicit request cannot both start a write.
//!   - Requests that arrive while Saving set the pending flag instead
//!     of writing. On completion the follow-up is deferred to the
//!     timer thread (never re-entrant in the caller's stack) and runs
//!     against a fresh capture, not a queued copy.
//!   - Periodic ticks respect the context gate; explicit and
//!     lifecycle saves bypass it. Gated ticks are dropped outright.
//!   - Every failure is logged and non-fatal; the next cycle retries.
//!
//! The physical write blocks its calling thread for the duration of
//! one staged commit. With `start()` that thread is the timer worker;
//! hosts that must stay responsive should route explicit requests
//! through their own background context or accept the bounded stall.

use crate::{
    config::SaveConfig,
    error::SaveResult,
    provider::SnapshotProvider,
    request::{LifecycleEvent, SaveOrigin, SaveRequest},
    store::{SaveOutcome, SaveStore},
    timer::{RepeatingTimer, TimerFire, TimerNudge},
    types::ContextId,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

pub struct SaveScheduler {
    shared: Arc<SchedulerShared>,
    timer:  Option<RepeatingTimer>,
}

struct SchedulerShared {
    config:           SaveConfig,
    provider:         Arc<dyn SnapshotProvider>,
    store:            Mutex<SaveStore>,
    saving:           AtomicBool,
    pending:          AtomicBool,
    context:          Mutex<ContextId>,
    last_forced_save: Mutex<Option<Instant>>,
    followup:         Mutex<Option<TimerNudge>>,
}

impl SaveScheduler {
    /// Build a scheduler owning `store`. Nothing runs until `start()`
    /// or the first tick/request.
    pub fn new(
        store: SaveStore,
        provider: Arc<dyn SnapshotProvider>,
        config: SaveConfig,
    ) -> Self {
        Self {
            shared: Arc::new(SchedulerShared {
                config,
                provider,
                store:            Mutex::new(store),
                saving:           AtomicBool::new(false),
                pending:          AtomicBool::new(false),
                context:          Mutex::new(ContextId::new()),
                last_forced_save: Mutex::new(None),
                followup:         Mutex::new(None),
            }),
            timer: None,
        }
    }

    /// Start the autosave timer (interval clamped by the config).
    /// Idempotent while running.
    pub fn start(&mut self) -> SaveResult<()> {
        if self.timer.is_some() {
            return Ok(());
        }
        let shared = Arc::clone(&self.shared);
        let timer = RepeatingTimer::spawn(
            self.shared.config.autosave_interval(),
            move |fire| match fire {
                TimerFire::Interval => shared.submit(SaveRequest::periodic()),
                TimerFire::Nudge    => shared.submit(SaveRequest::explicit()),
            },
        )?;
        *lock(&self.shared.followup) = Some(timer.nudger());
        self.timer = Some(timer);
        Ok(())
    }

    /// Cancel the autosave timer and join its thread. An in-flight
    /// write runs to completion first. Idempotent.
    pub fn stop(&mut self) {
        *lock(&self.shared.followup) = None;
        if let Some(mut timer) = self.timer.take() {
            timer.stop();
        }
    }

    /// One cooperative autosave tick. Hosts without a background
    /// thread call this from their frame loop instead of `start()`.
    /// Subject to the context gate; a gated tick is a no-op and does
    /// not set the pending flag.
    pub fn autosave_tick(&self) {
        self.shared.submit(SaveRequest::periodic());
    }

    /// Save now, bypassing the context gate.
    pub fn request_save(&self) {
        self.shared.submit(SaveRequest::explicit());
    }

    /// Alias of `request_save` kept for call sites that flush before a
    /// risky transition (ad display, scene unload).
    pub fn flush_now(&self) {
        self.shared.submit(SaveRequest::explicit());
    }

    /// Gate-bypassing save limited by the lifecycle cooldown window.
    pub fn force_save(&self, reason: &str) {
        self.shared.force_save(reason);
    }

    /// Host lifecycle notification. `Background` and `Termination`
    /// trigger a forced save when lifecycle handling is enabled.
    pub fn on_lifecycle_event(&self, event: LifecycleEvent) {
        if !self.shared.config.handle_lifecycle_saves {
            return;
        }
        match event {
            LifecycleEvent::Background  => self.shared.force_save("background"),
            LifecycleEvent::Termination => self.shared.force_save("termination"),
            LifecycleEvent::Foreground  => {}
        }
    }

    /// Report the active context (scene). The gate compares it to the
    /// configured `required_context`.
    pub fn set_context(&self, context: impl Into<ContextId>) {
        *lock(&self.shared.context) = context.into();
    }

    /// Whether a physical write is in flight right now.
    pub fn is_saving(&self) -> bool {
        self.shared.saving.load(Ordering::Acquire)
    }

    /// Whether a follow-up save is queued behind the in-flight write.
    pub fn is_save_pending(&self) -> bool {
        self.shared.pending.load(Ordering::Acquire)
    }

    /// The owned store, for startup `load()` and explicit `delete()`.
    pub fn store(&self) -> &Mutex<SaveStore> {
        &self.shared.store
    }
}

impl Drop for SaveScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

impl SchedulerShared {
    fn submit(&self, request: SaveRequest) {
        if !request.bypass_gate && !self.context_allows() {
            // Gated ticks are dropped outright, never queued.
            return;
        }
        if self
            .saving
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            self.pending.store(true, Ordering::Release);
            log::debug!(
                "scheduler: {} save queued behind in-flight write",
                request.origin
            );
            return;
        }

        // The capture happens after this point, so this write also
        // covers any request that queued before it began.
        self.pending.store(false, Ordering::Release);
        self.write_once(request.origin);
        self.saving.store(false, Ordering::Release);

        if self.pending.load(Ordering::Acquire) {
            // Defer the follow-up to the timer thread. With no timer
            // running the flag stays set and the next submitted
            // request or tick absorbs it.
            let nudge = lock(&self.followup).clone();
            if let Some(nudge) = nudge {
                nudge.fire();
            }
        }
    }

    fn write_once(&self, origin: SaveOrigin) {
        let Some(snapshot) = self.provider.capture() else {
            log::warn!(
                "scheduler: snapshot provider unavailable, abandoning {origin} save"
            );
            return;
        };
        let mut store = lock(&self.store);
        match store.save(&snapshot) {
            Ok(SaveOutcome::Written) => {
                log::debug!("scheduler: {origin} save committed");
            }
            Ok(SaveOutcome::SkippedEmpty) => {}
            Err(e) => {
                log::debug!("scheduler: {origin} save failed, next cycle retries: {e}");
            }
        }
    }

    fn force_save(&self, reason: &str) {
        {
            let mut last = lock(&self.last_forced_save);
            if let Some(at) = *last {
                if at.elapsed() < self.config.lifecycle_cooldown() {
                    log::debug!("scheduler: forced save ({reason}) suppressed by cooldown");
                    return;
                }
            }
            *last = Some(Instant::now());
        }
        self.submit(SaveRequest::lifecycle());
    }

    fn context_allows(&self) -> bool {
        if !self.config.autosave_only_in_context {
            return true;
        }
        *lock(&self.context) == self.config.required_context
    }
}

/// Lock that survives a poisoned mutex: one panicked writer must not
/// disable saving for the rest of the session.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
