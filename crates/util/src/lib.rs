//! Core type aliases, constants, and runtime utilities for tempo.
//!
//! This crate provides the foundational types and configuration parameters
//! used throughout the tempo workspace.
#![allow(dead_code)]

// ============================================================================
// TYPE ALIASES
// ============================================================================
/// Rewards, Q-values, and training targets.
pub type Score = f32;
/// Epsilon schedules, chance-walk continuation, sampling weights.
pub type Probability = f64;
/// One component of a state representation vector.
pub type Feature = i32;
/// Training iteration counter.
pub type Epoch = usize;
/// Monotonic identifier of a stored replay transition.
pub type TransitionId = i64;
/// Monotonic identifier of a finished self-play game.
pub type GameId = i64;

// ============================================================================
// STATE REPRESENTATION SHAPE
// Fixed schema shared by the encoder, the scorer, and the value network.
// ============================================================================
/// Features per minion vector (stats + ability flags).
pub const MINION_FEATURES: usize = 14;
/// Features per hand-card vector (kind one-hot + derived effect counts).
pub const CARD_FEATURES: usize = 14;
/// Features per board-summary vector (one side of the board).
pub const BOARD_FEATURES: usize = 15;
/// Minion slots per side; unfilled slots are zero-padded.
pub const MAX_SIDE_MINIONS: usize = 7;
/// Hand-card slots; unfilled slots are zero-padded.
pub const MAX_HAND_CARDS: usize = 10;
/// Sides per board summary (friendly, enemy).
pub const BOARD_SIDES: usize = 2;
/// Prior board summaries carried as history.
pub const HISTORY_LENGTH: usize = 3;
/// Length of the flattened representation fed to the value network.
pub const REP_FLAT_LEN: usize = MAX_HAND_CARDS * CARD_FEATURES
    + 2 * MAX_SIDE_MINIONS * MINION_FEATURES
    + BOARD_SIDES * BOARD_FEATURES
    + HISTORY_LENGTH * BOARD_SIDES * BOARD_FEATURES;

// ============================================================================
// REWARD SHAPING
// Terminal constants are contracts; the rest are tunable hyperparameters.
// ============================================================================
/// Reward for a transition that wins the game.
pub const WIN_SCORE: Score = 100.0;
/// Reward for a transition that loses the game.
pub const LOSS_SCORE: Score = -100.0;
/// Per-turn penalty discouraging aimless long games.
pub const TURN_DECAY: Score = 1.0;
/// Temporal-difference discount factor.
pub const GAMMA: Score = 0.99;

// ============================================================================
// SEARCH PARAMETERS
// ============================================================================
/// Simulations per action to classify it deterministic vs stochastic.
/// Known approximation: low-probability divergence can pass as deterministic.
pub const PROBE_SIMULATIONS: usize = 3;
/// Outcome samples added per chance-node expansion.
pub const CHANCE_SAMPLE_LOOPS: usize = 3;
/// Continuation probability of the random walk into chance subtrees.
/// Higher values bias expansion toward deeper subtrees.
pub const DESCEND_PROBABILITY: Probability = 0.5;
/// Wall-clock budget per turn, seconds.
pub const TURN_BUDGET_SECS: f64 = 5.0;

// ============================================================================
// EXPLORATION SCHEDULE
// Linear decay from max to min over the first EPSILON_DECAY_STEPS epochs.
// ============================================================================
pub const EPSILON_MAX: Probability = 0.5;
pub const EPSILON_MIN: Probability = 0.01;
pub const EPSILON_DECAY_STEPS: Epoch = 1000;

// ============================================================================
// REPLAY MEMORY
// ============================================================================
/// Maximum retained transitions; older rows are evicted on push.
pub const REPLAY_CAPACITY: i64 = 10_000;
/// Transitions per sampled training batch.
pub const BATCH_SIZE: usize = 50;

// ============================================================================
// TRAINING LOOP CADENCE
// All intervals are in epochs (one epoch = one round of self-play games).
// ============================================================================
/// Gradient batches per training pass.
pub const TRAIN_LOOPS: usize = 5;
/// Epochs between training passes.
pub const TRAIN_INTERVAL: Epoch = 1;
/// Epochs between model checkpoints.
pub const SAVE_INTERVAL: Epoch = 5;
/// Epochs between online -> target parameter syncs.
pub const SYNC_INTERVAL: Epoch = 25;
/// Epochs between benchmark matches against baseline players.
pub const BENCH_INTERVAL: Epoch = 50;
/// Games per benchmark opponent.
pub const BENCH_GAMES: usize = 20;
/// Hard cap on plies per self-play game before it is called a draw.
pub const MAX_GAME_PLIES: usize = 2048;

// ============================================================================
// RUNTIME UTILITIES
// ============================================================================
/// Initialize dual logging (terminal + file) with timestamped log files.
/// Creates `logs/` directory and writes DEBUG level to file, INFO to terminal.
#[cfg(feature = "server")]
pub fn log() {
    std::fs::create_dir_all("logs").expect("create logs directory");
    let config = simplelog::ConfigBuilder::new()
        .set_location_level(log::LevelFilter::Off)
        .set_target_level(log::LevelFilter::Off)
        .set_thread_level(log::LevelFilter::Off)
        .build();
    let time = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("time moves slow")
        .as_secs();
    let file = simplelog::WriteLogger::new(
        log::LevelFilter::Debug,
        config.clone(),
        std::fs::File::create(format!("logs/{}.log", time)).expect("create log file"),
    );
    let term = simplelog::TermLogger::new(
        log::LevelFilter::Info,
        config.clone(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    );
    simplelog::CombinedLogger::init(vec![term, file]).expect("initialize logger");
}

/// Register Ctrl+C handler for immediate (non-graceful) termination.
/// Use when you need hard shutdown without waiting for current batch.
#[cfg(feature = "server")]
pub fn kys() {
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.unwrap();
        println!();
        log::warn!("violent interrupt received, exiting immediately");
        std::process::exit(0);
    });
}

/// Global interrupt flag for graceful shutdown coordination.
#[cfg(feature = "server")]
static INTERRUPTED: std::sync::atomic::AtomicBool = std::sync::atomic::AtomicBool::new(false);
/// Optional training deadline from TRAIN_DURATION env var.
#[cfg(feature = "server")]
static DEADLINE: std::sync::OnceLock<std::time::Instant> = std::sync::OnceLock::new();
/// Check if graceful shutdown was requested (via stdin "Q") or deadline reached.
#[cfg(feature = "server")]
pub fn interrupted() -> bool {
    INTERRUPTED.load(std::sync::atomic::Ordering::Relaxed)
        || DEADLINE
            .get()
            .map_or(false, |d| std::time::Instant::now() >= *d)
}
/// No-op interrupt check when server feature disabled.
#[cfg(not(feature = "server"))]
pub fn interrupted() -> bool {
    false
}
/// Register graceful interrupt handler. Type "Q" + Enter to stop after current epoch.
/// Optionally set TRAIN_DURATION env var (e.g., "2h", "30m") for timed runs.
#[cfg(feature = "server")]
pub fn brb() {
    if let Ok(duration) = std::env::var("TRAIN_DURATION") {
        if let Some(deadline) = parse_duration(&duration) {
            let _ = DEADLINE.set(std::time::Instant::now() + deadline);
            log::info!("training will stop after {}", duration);
        }
    }
    std::thread::spawn(|| {
        loop {
            let ref mut buffer = String::new();
            if let Ok(_) = std::io::stdin().read_line(buffer) {
                if buffer.trim().to_uppercase() == "Q" {
                    log::warn!("graceful interrupt requested, finishing current epoch...");
                    INTERRUPTED.store(true, std::sync::atomic::Ordering::Relaxed);
                    break;
                }
            }
        }
    });
}
/// Parse duration string like "30s", "5m", "2h", "1d" into Duration.
#[cfg(feature = "server")]
fn parse_duration(s: &str) -> Option<std::time::Duration> {
    let s = s.trim();
    let (num, unit) = s.split_at(s.len().saturating_sub(1));
    let value: u64 = num.parse().ok()?;
    match unit {
        "s" => Some(std::time::Duration::from_secs(value)),
        "m" => Some(std::time::Duration::from_secs(value * 60)),
        "h" => Some(std::time::Duration::from_secs(value * 3600)),
        "d" => Some(std::time::Duration::from_secs(value * 86400)),
        _ => None,
    }
}
