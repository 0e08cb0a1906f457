use std::sync::Arc;
use tempo_core::*;
use tempo_database::*;
use tempo_encoding::*;
use tempo_engine::*;
use tempo_players::*;
use tempo_scoring::*;

/// Self-play training orchestration.
///
/// Owns the shared value network and the replay store; everything else
/// (agents, searches, records) is per-game and lives inside the worker
/// tasks. Self-play games are CPU-bound and synchronous, so they run on
/// blocking tasks fanned out across cores, while replay I/O stays on
/// the async runtime.
pub struct Trainer {
    network: Arc<LinearValue>,
    replay: Replay,
    epsilon: Probability,
}

/// One worker's yield: the two per-seat transition sets of a clean game.
type Harvest = Option<[Vec<TransitionRecord>; 2]>;

impl Trainer {
    pub async fn new() -> Self {
        let client = db().await;
        Self {
            network: Arc::new(LinearValue::new()),
            replay: Replay::load(client).await,
            epsilon: EPSILON_MAX,
        }
    }

    fn scorer(&self) -> Scorer {
        Scorer::new(self.network.clone())
    }

    fn open(&self, load: bool) {
        self.network.open();
        if load {
            if let Err(e) = self.network.load() {
                log::warn!("no checkpoint restored, starting fresh: {:#}", e);
            }
        }
        self.network.sync();
    }

    fn finish(&self, epoch: Epoch) {
        if let Err(e) = self.network.save(epoch) {
            log::error!("failed to save final checkpoint: {:#}", e);
        }
        self.network.close();
        log::info!("final epoch: {}", epoch);
    }

    /// Seed the replay memory with `games` self-play games at maximum
    /// exploration, without any training passes.
    pub async fn warmup(&self, games: usize, load: bool) {
        self.open(load);
        let mut remaining = games;
        while remaining > 0 && !interrupted() {
            let round = remaining.min(num_cpus::get());
            let stored = self.selfplay(round).await;
            remaining -= round;
            log::info!("warmup: {} games stored, {} to go", stored, remaining);
        }
        self.finish(0);
    }

    /// The main loop: decay epsilon, self-play one round per core, and
    /// run the periodic train / sync / save / benchmark cadences.
    pub async fn run(&mut self, start: Epoch, stop: Epoch) {
        self.open(true);
        let mut epoch = start.max(1);
        while epoch < stop && !interrupted() {
            self.epsilon = (EPSILON_MAX
                - (EPSILON_MAX - EPSILON_MIN) * epoch as Probability
                    / EPSILON_DECAY_STEPS as Probability)
                .max(EPSILON_MIN);
            log::info!("==== epoch {} (epsilon {:.3}) ====", epoch, self.epsilon);
            self.selfplay(num_cpus::get()).await;
            if epoch % TRAIN_INTERVAL == 0 {
                self.train(epoch).await;
            }
            if epoch % SYNC_INTERVAL == 0 {
                log::info!("syncing online parameters to target");
                self.network.sync();
            }
            if epoch % SAVE_INTERVAL == 0 {
                if let Err(e) = self.network.save(epoch) {
                    log::error!("checkpoint failed: {:#}", e);
                }
            }
            if epoch % BENCH_INTERVAL == 0 {
                self.benchmark().await;
            }
            epoch += 1;
        }
        self.finish(epoch);
    }

    /// Fan one self-play game out per requested slot and push every
    /// clean game's transitions. Returns how many games were stored;
    /// draws, exceptions, and worker panics are dropped on the floor.
    async fn selfplay(&self, slots: usize) -> usize {
        let workers = (0..slots).map(|_| {
            let scorer = self.scorer();
            let epsilon = self.epsilon;
            tokio::task::spawn_blocking(move || training_game(scorer, epsilon))
        });
        let mut stored = 0;
        for outcome in futures::future::join_all(workers).await {
            match outcome {
                Err(e) => log::error!("self-play worker panicked: {}", e),
                Ok(None) => log::debug!("discarding game"),
                Ok(Some(seats)) => {
                    for transitions in seats.iter() {
                        if let Err(e) = self.replay.push(transitions).await {
                            log::error!("failed to store transitions: {:#}", e);
                        }
                    }
                    stored += 1;
                }
            }
        }
        stored
    }

    /// Sample, build double-Q targets, and step the online network,
    /// [`TRAIN_LOOPS`] batches per pass. Any failure abandons the pass
    /// without touching shared state.
    async fn train(&self, epoch: Epoch) {
        let scorer = self.scorer();
        for batch in 1..=TRAIN_LOOPS {
            let transitions = match self.replay.sample(BATCH_SIZE).await {
                Err(e) => {
                    log::warn!("sampling failed, abandoning training pass: {:#}", e);
                    return;
                }
                Ok(transitions) if transitions.is_empty() => {
                    log::warn!("replay memory came back empty, abandoning training pass");
                    return;
                }
                Ok(transitions) => transitions,
            };
            let targets = scorer.targets(&transitions);
            let actions = transitions
                .iter()
                .map(|t| t.action.clone())
                .collect::<Vec<GameRep>>();
            match self.network.train(&actions, &targets) {
                Ok(loss) => log::info!("epoch {}, batch {}: loss = {:.5}", epoch, batch, loss),
                Err(e) => log::error!("training step failed: {:#}", e),
            }
        }
    }

    /// Pit the greedy agent against the random baseline and log the
    /// observed win rate. Games with exceptions are excluded.
    async fn benchmark(&self) {
        let duels = (0..BENCH_GAMES).map(|_| {
            let scorer = self.scorer();
            tokio::task::spawn_blocking(move || {
                let mut hero = Agent::<Skirmish>::new(scorer);
                let mut fish = Rando;
                play(&mut hero, &mut fish, Skirmish::deal())
            })
        });
        let mut wins = 0;
        let mut games = 0;
        for outcome in futures::future::join_all(duels).await {
            match outcome {
                Err(e) => log::error!("benchmark worker panicked: {}", e),
                Ok(stats) if stats.exceptions.iter().any(|&n| n > 0) => {
                    log::warn!("benchmark game excluded for exceptions");
                }
                Ok(stats) => {
                    games += 1;
                    if stats.winner() == Some(Seat::First) {
                        wins += 1;
                    }
                }
            }
        }
        match games {
            0 => log::warn!("benchmark produced no clean games"),
            _ => log::info!(
                "benchmark vs random: {}/{} ({:.0}%)",
                wins,
                games,
                100.0 * wins as f64 / games as f64
            ),
        }
    }
}

/// Play one self-play game between two exploring agents and label both
/// seats' transitions with the outcome. `None` for games that must be
/// discarded: draws, exceptions, or anything without a clean winner.
fn training_game(scorer: Scorer, epsilon: Probability) -> Harvest {
    let mut first = Agent::<Skirmish>::new(scorer.clone()).exploring(epsilon);
    let mut second = Agent::<Skirmish>::new(scorer).exploring(epsilon);
    let stats = play(&mut first, &mut second, Skirmish::deal());
    let winner = stats.winner()?;
    Some([
        first.record().transitions(winner == Seat::First),
        second.record().transitions(winner == Seat::Second),
    ])
}
