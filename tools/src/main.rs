//! save-runner: headless harness for the BubblePop save subsystem.
//!
//! Usage:
//!   save-runner --dir ./saves                      # inspect the record pair
//!   save-runner --dir ./saves --json               # dump the record as JSON
//!   save-runner --dir ./saves --delete             # remove both generations
//!   save-runner --dir ./saves --simulate --seconds 5 --interval 0.5

use anyhow::Result;
use bubblepop_core::{
    config::SaveConfig,
    provider::SnapshotProvider,
    request::LifecycleEvent,
    scheduler::SaveScheduler,
    snapshot::{BubbleSnapshot, SessionSnapshot, Vec2},
    store::SaveStore,
};
use std::env;
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let dir = args
        .windows(2)
        .find(|w| w[0] == "--dir")
        .map(|w| w[1].clone())
        .unwrap_or_else(|| "./saves".to_string());
    let delete = args.iter().any(|a| a == "--delete");
    let simulate = args.iter().any(|a| a == "--simulate");
    let json = args.iter().any(|a| a == "--json");
    let seconds = parse_arg(&args, "--seconds", 5u64);
    let interval = parse_arg(&args, "--interval", 0.5f64);

    const KNOWN_FLAGS: [&str; 6] =
        ["--dir", "--delete", "--simulate", "--json", "--seconds", "--interval"];
    for flag in args.iter().skip(1) {
        if flag.starts_with("--") && !KNOWN_FLAGS.contains(&flag.as_str()) {
            log::warn!("Unknown flag: {flag}");
        }
    }

    println!("BubblePop — save-runner");
    println!("  dir:      {dir}");
    if simulate {
        println!("  seconds:  {seconds}");
        println!("  interval: {interval}");
    }
    println!();

    if delete {
        let mut store = SaveStore::new(&dir);
        store.delete();
        println!("Deleted both generations under {dir}");
        return Ok(());
    }

    if simulate {
        run_simulation(&dir, seconds, interval)?;
    }

    let store = SaveStore::new(&dir);
    if json {
        match store.load() {
            Some(snapshot) => println!("{}", serde_json::to_string_pretty(&snapshot)?),
            None => println!("null"),
        }
        return Ok(());
    }

    print_summary(&store);
    Ok(())
}

/// Toy session whose state drifts on every capture, so consecutive
/// autosaves write observably different records.
struct DemoSession {
    state: Mutex<SessionSnapshot>,
}

impl DemoSession {
    fn new() -> Self {
        let bubbles = (0..6)
            .map(|i| BubbleSnapshot {
                merge_level:       1 + (i % 3),
                position:          Vec2::new(i as f32 * 0.8 - 2.0, 4.0),
                velocity:          Vec2::new(0.0, -0.5),
                is_controlled_top: false,
            })
            .collect();
        Self {
            state: Mutex::new(SessionSnapshot {
                bubbles,
                ..Default::default()
            }),
        }
    }
}

impl SnapshotProvider for DemoSession {
    fn capture(&self) -> Option<SessionSnapshot> {
        let mut state = self.state.lock().ok()?;
        state.current_score += 10;
        state.best_score = state.best_score.max(state.current_score);
        state.coins += 1;
        for bubble in &mut state.bubbles {
            bubble.position.y += bubble.velocity.y * 0.1;
        }
        Some(state.clone())
    }
}

fn run_simulation(dir: &str, seconds: u64, interval: f64) -> Result<()> {
    let config = SaveConfig {
        autosave_interval_secs: interval,
        handle_lifecycle_saves: true,
        ..Default::default()
    };
    let mut scheduler = SaveScheduler::new(
        SaveStore::new(dir),
        std::sync::Arc::new(DemoSession::new()),
        config,
    );

    scheduler.set_context("GameScene");
    scheduler.start()?;
    println!("Autosaving every {interval}s for {seconds}s...");
    thread::sleep(Duration::from_secs(seconds));

    // Simulate the host shutting down: one forced save, then teardown.
    scheduler.on_lifecycle_event(LifecycleEvent::Termination);
    scheduler.stop();
    println!("Simulation finished.");
    println!();
    Ok(())
}

fn print_summary(store: &SaveStore) {
    println!("=== SAVE SUMMARY ===");
    if !store.exists() {
        println!("  (no save present)");
        return;
    }
    match store.load() {
        Some(snapshot) => {
            println!("  current score: {}", snapshot.current_score);
            println!("  best score:    {}", snapshot.best_score);
            println!("  coins:         {}", snapshot.coins);
            println!("  bubbles:       {}", snapshot.bubbles.len());
            println!("  categories:    {}", snapshot.category_progress.len());
            println!("  collections:   {}", snapshot.collection_completions.len());
            println!("  boosters:      {}", snapshot.booster_inventory.len());
        }
        None => {
            println!("  (record pair present but neither generation decodes)");
        }
    }
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}
