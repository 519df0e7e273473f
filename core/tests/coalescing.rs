//! Coalescing tests — at most one physical write in flight, requests
//! arriving mid-write collapse into exactly one follow-up, and the
//! follow-up reflects provider state at follow-up time.
//!
//! These tests use a provider that sleeps inside capture() to hold a
//! write in flight long enough to race requests against it, and spin
//! on observable state instead of trusting fixed sleeps.

use bubblepop_core::config::SaveConfig;
use bubblepop_core::provider::SnapshotProvider;
use bubblepop_core::scheduler::SaveScheduler;
use bubblepop_core::snapshot::{BubbleSnapshot, SessionSnapshot, Vec2};
use bubblepop_core::store::SaveStore;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tempfile::TempDir;

const CAPTURE_DELAY: Duration = Duration::from_millis(400);

/// Provider that holds each capture open for CAPTURE_DELAY and tracks
/// how many captures ran, and how many ran concurrently.
struct SlowProvider {
    score:      AtomicU64,
    captures:   AtomicUsize,
    active:     AtomicUsize,
    max_active: AtomicUsize,
}

impl SlowProvider {
    fn with_score(score: u64) -> Arc<Self> {
        Arc::new(Self {
            score:      AtomicU64::new(score),
            captures:   AtomicUsize::new(0),
            active:     AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
        })
    }

    fn set_score(&self, score: u64) {
        self.score.store(score, Ordering::SeqCst);
    }

    fn captures(&self) -> usize {
        self.captures.load(Ordering::SeqCst)
    }

    fn max_active(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }
}

impl SnapshotProvider for SlowProvider {
    fn capture(&self) -> Option<SessionSnapshot> {
        self.captures.fetch_add(1, Ordering::SeqCst);
        let now_active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now_active, Ordering::SeqCst);

        // Read the live state at capture time, then simulate a slow
        // capture so the write stays in flight.
        let score = self.score.load(Ordering::SeqCst);
        thread::sleep(CAPTURE_DELAY);

        self.active.fetch_sub(1, Ordering::SeqCst);
        Some(SessionSnapshot {
            current_score: score,
            bubbles: vec![BubbleSnapshot {
                merge_level:       1,
                position:          Vec2::ZERO,
                velocity:          Vec2::ZERO,
                is_controlled_top: false,
            }],
            ..Default::default()
        })
    }
}

/// Scheduler with the gate off and the periodic timer effectively
/// parked, so only explicit requests and follow-up nudges fire.
fn build_started_scheduler(
    dir: &TempDir,
    provider: Arc<SlowProvider>,
) -> Arc<SaveScheduler> {
    let _ = env_logger::builder().is_test(true).try_init();
    let config = SaveConfig {
        autosave_interval_secs: 3600.0,
        autosave_only_in_context: false,
        ..Default::default()
    };
    let mut scheduler =
        SaveScheduler::new(SaveStore::new(dir.path()), provider, config);
    scheduler.start().expect("start scheduler");
    Arc::new(scheduler)
}

fn loaded_score(scheduler: &SaveScheduler) -> Option<u64> {
    scheduler
        .store()
        .lock()
        .expect("store lock")
        .load()
        .map(|s| s.current_score)
}

/// Spin until `done` holds or five seconds pass.
fn wait_until(done: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if done() {
            return true;
        }
        thread::sleep(Duration::from_millis(10));
    }
    done()
}

/// N requests issued while one save is in flight produce exactly one
/// follow-up write — two physical writes total, never N+1.
#[test]
fn requests_during_flight_coalesce_into_one_followup() {
    let dir = tempfile::tempdir().expect("temp dir");
    let provider = SlowProvider::with_score(1);
    let scheduler = build_started_scheduler(&dir, Arc::clone(&provider));

    let writer = {
        let scheduler = Arc::clone(&scheduler);
        thread::spawn(move || scheduler.flush_now())
    };

    // Land five requests inside the in-flight window.
    assert!(
        wait_until(|| provider.captures() == 1),
        "first write never started"
    );
    for _ in 0..5 {
        scheduler.request_save();
    }
    assert!(
        scheduler.is_save_pending(),
        "requests during a write should queue a follow-up"
    );

    writer.join().expect("writer thread");
    assert!(
        wait_until(|| provider.captures() == 2 && !scheduler.is_saving()),
        "follow-up never ran"
    );

    // Settle, then confirm no third write sneaks in.
    thread::sleep(CAPTURE_DELAY);
    assert_eq!(
        provider.captures(),
        2,
        "five queued requests must coalesce into one follow-up"
    );
    assert_eq!(provider.max_active(), 1, "writes overlapped");
    assert!(!scheduler.is_save_pending());
}

/// The follow-up is not a queued copy: it captures whatever the
/// provider holds when the follow-up runs.
#[test]
fn followup_reflects_state_at_followup_time() {
    let dir = tempfile::tempdir().expect("temp dir");
    let provider = SlowProvider::with_score(1);
    let scheduler = build_started_scheduler(&dir, Arc::clone(&provider));

    let writer = {
        let scheduler = Arc::clone(&scheduler);
        thread::spawn(move || scheduler.flush_now())
    };

    assert!(
        wait_until(|| provider.captures() == 1),
        "first write never started"
    );
    provider.set_score(99);
    scheduler.request_save();

    writer.join().expect("writer thread");
    assert!(
        wait_until(|| provider.captures() == 2 && !scheduler.is_saving()),
        "follow-up never ran"
    );

    assert_eq!(
        loaded_score(&scheduler),
        Some(99),
        "follow-up must persist the state seen at follow-up time"
    );
}

/// Simultaneous explicit requests from several threads: one wins the
/// write, the rest collapse into a single follow-up.
#[test]
fn concurrent_requests_never_overlap_writes() {
    let dir = tempfile::tempdir().expect("temp dir");
    let provider = SlowProvider::with_score(5);
    let scheduler = build_started_scheduler(&dir, Arc::clone(&provider));

    let writers: Vec<_> = (0..4)
        .map(|_| {
            let scheduler = Arc::clone(&scheduler);
            thread::spawn(move || scheduler.flush_now())
        })
        .collect();
    for writer in writers {
        writer.join().expect("writer thread");
    }
    assert!(
        wait_until(|| !scheduler.is_saving() && !scheduler.is_save_pending()),
        "scheduler never drained"
    );
    thread::sleep(CAPTURE_DELAY);

    assert_eq!(provider.max_active(), 1, "two writes ran concurrently");
    assert!(
        provider.captures() <= 2,
        "four simultaneous requests must collapse to at most one write plus one \
         follow-up, got {}",
        provider.captures()
    );
    assert_eq!(loaded_score(&scheduler), Some(5));
}
