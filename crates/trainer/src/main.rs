//! Training entry point.
//!
//! `trainer warmup` seeds the replay memory with exploratory self-play;
//! `trainer train` runs the full loop. Type "Q" + Enter for a graceful
//! stop after the current epoch, or set `TRAIN_DURATION` for timed runs.
mod trainer;

use clap::Parser;
use clap::Subcommand;
use trainer::Trainer;

#[derive(Parser)]
#[command(about = "Self-play training for the tempo card-game agent")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Seed the replay memory with maximum-exploration games.
    Warmup {
        /// Number of games to play into the replay store.
        #[arg(long, default_value_t = 100)]
        games: usize,
        /// Restore the latest checkpoint instead of starting fresh.
        #[arg(long)]
        load: bool,
    },
    /// Run the training loop from a warm replay memory.
    Train {
        /// First epoch (resume point).
        #[arg(long, default_value_t = 1)]
        start: usize,
        /// Epoch to stop before.
        #[arg(long, default_value_t = usize::MAX)]
        stop: usize,
    },
}

#[tokio::main]
async fn main() {
    tempo_core::log();
    tempo_core::brb();
    match Args::parse().command {
        Command::Warmup { games, load } => Trainer::new().await.warmup(games, load).await,
        Command::Train { start, stop } => Trainer::new().await.run(start, stop).await,
    }
}
