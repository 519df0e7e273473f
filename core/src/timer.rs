//! Cancelable repeating timer.
//!
//! Replaces the host engine's wait-then-fire coroutine: a named worker
//! thread fires a callback every period until `stop()` (or drop). A
//! `TimerNudge` handle wakes the worker early for a single
//! out-of-band fire — the scheduler uses it to run coalesced
//! follow-up saves without re-entering the caller's stack.

use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Why the callback is being invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerFire {
    /// The period elapsed.
    Interval,
    /// A `TimerNudge` requested an early fire.
    Nudge,
}

#[derive(Default)]
struct TimerState {
    stopped: bool,
    nudged:  bool,
}

struct TimerShared {
    state:  Mutex<TimerState>,
    signal: Condvar,
}

/// Handle for waking the timer ahead of its period. Cheap to clone.
#[derive(Clone)]
pub struct TimerNudge {
    shared: Arc<TimerShared>,
}

impl TimerNudge {
    /// Request one early fire. No-op once the timer is stopped.
    pub fn fire(&self) {
        lock(&self.shared.state).nudged = true;
        self.shared.signal.notify_one();
    }
}

pub struct RepeatingTimer {
    shared: Arc<TimerShared>,
    worker: Option<JoinHandle<()>>,
}

impl RepeatingTimer {
    /// Spawn the worker thread. `on_fire` runs on that thread; a fire
    /// that is still running when `stop()` is called runs to
    /// completion before the join returns.
    pub fn spawn<F>(period: Duration, mut on_fire: F) -> std::io::Result<Self>
    where
        F: FnMut(TimerFire) + Send + 'static,
    {
        let shared = Arc::new(TimerShared {
            state:  Mutex::new(TimerState::default()),
            signal: Condvar::new(),
        });
        let worker_shared = Arc::clone(&shared);

        let worker = thread::Builder::new()
            .name("autosave-timer".to_string())
            .spawn(move || {
                let mut deadline = Instant::now() + period;
                let mut state = lock(&worker_shared.state);
                loop {
                    if state.stopped {
                        break;
                    }
                    if state.nudged {
                        state.nudged = false;
                        drop(state);
                        on_fire(TimerFire::Nudge);
                        state = lock(&worker_shared.state);
                        continue;
                    }
                    let now = Instant::now();
                    if now >= deadline {
                        drop(state);
                        on_fire(TimerFire::Interval);
                        deadline = Instant::now() + period;
                        state = lock(&worker_shared.state);
                        continue;
                    }
                    // Spurious wakeups loop back through the checks.
                    let (guard, _) = worker_shared
                        .signal
                        .wait_timeout(state, deadline - now)
                        .unwrap_or_else(PoisonError::into_inner);
                    state = guard;
                }
            })?;

        Ok(Self { shared, worker: Some(worker) })
    }

    /// A handle for waking this timer early.
    pub fn nudger(&self) -> TimerNudge {
        TimerNudge { shared: Arc::clone(&self.shared) }
    }

    /// Stop the timer and join the worker. Idempotent.
    pub fn stop(&mut self) {
        lock(&self.shared.state).stopped = true;
        self.shared.signal.notify_one();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

impl Drop for RepeatingTimer {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Lock that survives a poisoned mutex: a panic in one fire must not
/// wedge every later save.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
