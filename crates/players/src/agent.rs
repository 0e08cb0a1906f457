use rand::Rng;
use rand::SeedableRng;
use rand::rngs::SmallRng;
use rand::seq::IndexedRandom;
use std::time::Duration;
use std::time::Instant;
use tempo_core::*;
use tempo_encoding::*;
use tempo_engine::*;
use tempo_scoring::*;
use tempo_search::*;

/// The search-driven turn controller.
///
/// One agent plays one seat of one game. Each turn it starts a wall
/// clock, snapshots the turn-start representation into its game record,
/// and repeatedly asks its search forest for queued moves, rebuilding or
/// reusing trees with half the remaining budget until the engine's
/// reality and the queue agree. Exhaustion never stalls a turn: the
/// fallback is a uniformly random legal action and random play for the
/// rest of the turn.
///
/// Exploration is epsilon-greedy per turn: with probability epsilon the
/// turn abandons search results and plays uniformly at random, which is
/// what lets off-policy TD learning visit non-greedy lines. A discovered
/// guaranteed win overrides the coin.
pub struct Agent<S: State> {
    scorer: Scorer,
    record: GameRecord,
    search: Option<Search<S>>,
    encoder: Encoder,
    start: GameRep,
    watch: Option<Instant>,
    budget: Duration,
    epsilon: Probability,
    random_mode: bool,
    rng: SmallRng,
}

impl<S: State> Agent<S> {
    pub fn new(scorer: Scorer) -> Self {
        Self {
            scorer,
            record: GameRecord::new(),
            search: None,
            encoder: Encoder::default(),
            start: GameRep::default(),
            watch: None,
            budget: Duration::from_secs_f64(TURN_BUDGET_SECS),
            epsilon: 0.0,
            random_mode: false,
            rng: SmallRng::from_rng(&mut rand::rng()),
        }
    }

    /// Set the per-turn exploration probability.
    pub fn exploring(mut self, epsilon: Probability) -> Self {
        self.epsilon = epsilon;
        self
    }

    /// Override the per-turn wall-clock budget.
    pub fn budgeted(mut self, budget: Duration) -> Self {
        self.budget = budget;
        self
    }

    /// The running game record, read at game end for training.
    pub fn record(&self) -> &GameRecord {
        &self.record
    }
    /// Consume the agent, keeping only its record.
    pub fn into_record(self) -> GameRecord {
        self.record
    }
    /// Whether a search forest is currently held.
    pub fn searching(&self) -> bool {
        self.search.is_some()
    }

    /// First callback of a new turn: start the watch, snapshot the
    /// turn-start state into the record, drop last turn's forest, and
    /// flip the exploration coin.
    fn begin_turn(&mut self, state: &S) {
        self.watch = Some(Instant::now());
        self.search = None;
        self.encoder = Encoder::new(&self.record.last_boards(HISTORY_LENGTH));
        self.start = self.encoder.encode(state, false);
        if !self.record.push_state(self.start.clone()) {
            log::error!("turn-start state rejected by the game record");
        }
        self.random_mode = self.rng.random::<Probability>() < self.epsilon;
    }

    /// The chosen action ends the turn: record its resulting
    /// representation and the search frontier that chose it, and close
    /// out the turn state.
    fn finish_turn(&mut self, state: &S, action: &S::Action) {
        let result = state
            .simulate(action)
            .map(|next| self.encoder.encode(&next, true))
            .unwrap_or_else(|| self.encoder.encode(state, false));
        let summary = self.search.as_ref().map(Search::summary);
        if !self.record.push_action(result, summary) {
            log::error!("end-of-turn action rejected by the game record");
        }
        self.watch = None;
        self.search = None;
        self.random_mode = false;
    }
}

impl<S: State> Player<S> for Agent<S> {
    fn begin(&mut self) {
        self.record = GameRecord::new();
        self.search = None;
        self.watch = None;
        self.random_mode = false;
    }

    fn act(&mut self, state: &S) -> anyhow::Result<S::Action> {
        if self.watch.is_none() {
            self.begin_turn(state);
        }
        let opened = self.watch.expect("turn watch running");
        let mut chosen = None;
        loop {
            // follow the queue on a discovered win always, otherwise
            // only outside random mode
            if let Some(search) = self.search.as_mut() {
                if !self.random_mode || search.found_lethal() {
                    if let Some(action) = search.next_move(state) {
                        chosen = Some(action);
                        break;
                    }
                }
            }
            let elapsed = opened.elapsed();
            if elapsed >= self.budget {
                break;
            }
            // a random-mode turn searches once per ply, only so a
            // guaranteed win cannot be gambled away
            if self.random_mode && self.search.is_some() {
                break;
            }
            // reuse a sampled chance outcome when reality matches one,
            // otherwise root a fresh forest at the current state
            let reused = self.search.as_mut().is_some_and(|s| s.descend(state));
            if !reused {
                self.search = Some(Search::new(
                    state.clone(),
                    self.encoder.clone(),
                    self.scorer.clone(),
                    self.start.clone(),
                ));
            }
            let slice = self.budget.saturating_sub(elapsed) / 2;
            self.search.as_mut().expect("search just built").run(slice);
        }
        let action = match chosen {
            Some(action) => action,
            None => {
                // exhaustion or exploration: uniform random, and random
                // for the rest of the turn
                self.random_mode = true;
                self.search = None;
                let options = state.options();
                anyhow::ensure!(!options.is_empty(), "engine offered no legal actions");
                options
                    .choose(&mut self.rng)
                    .cloned()
                    .expect("non-empty options")
            }
        };
        if action.ends_turn() {
            self.finish_turn(state, &action);
        }
        Ok(action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;
    use std::sync::atomic::Ordering;

    /// Network stub that counts scoring calls.
    #[derive(Default)]
    struct Tally {
        scored: AtomicUsize,
    }
    impl Network for Tally {
        fn score(&self, _: bool, states: &[GameRep]) -> Vec<Score> {
            self.scored.fetch_add(1, Ordering::Relaxed);
            vec![0.0; states.len()]
        }
        fn train(&self, _: &[GameRep], _: &[Score]) -> anyhow::Result<Score> {
            Ok(0.0)
        }
        fn sync(&self) {}
        fn save(&self, _: Epoch) -> anyhow::Result<()> {
            Ok(())
        }
        fn load(&self) -> anyhow::Result<()> {
            Ok(())
        }
        fn open(&self) -> bool {
            true
        }
        fn close(&self) -> bool {
            true
        }
    }

    /// Minimal engine whose only option is ending the turn.
    #[derive(Clone)]
    struct Solo {
        turns: u8,
    }
    #[derive(Debug, Clone, PartialEq)]
    struct Pass;
    impl Action for Pass {
        fn ends_turn(&self) -> bool {
            true
        }
    }
    impl State for Solo {
        type Action = Pass;
        fn options(&self) -> Vec<Pass> {
            vec![Pass]
        }
        fn simulate(&self, _: &Pass) -> Option<Self> {
            Some(Solo {
                turns: self.turns + 1,
            })
        }
        fn end_turn(&self) -> Pass {
            Pass
        }
        fn to_move(&self) -> Seat {
            Seat::First
        }
        fn finished(&self) -> Option<Verdict> {
            None
        }
        fn summary(&self, _: Side) -> Summary {
            Summary {
                health: 30,
                graveyard_size: self.turns as Feature,
                ..Summary::default()
            }
        }
        fn minions(&self, _: Side) -> Vec<Minion> {
            Vec::new()
        }
        fn hand(&self, _: Side) -> Vec<CardInfo> {
            Vec::new()
        }
    }

    /// Engine with one lethal action and one filler action.
    #[derive(Clone)]
    struct Finisher {
        dead: bool,
    }
    #[derive(Debug, Clone, PartialEq)]
    enum Swing {
        Kill,
        Pass,
    }
    impl Action for Swing {
        fn ends_turn(&self) -> bool {
            matches!(self, Swing::Pass)
        }
    }
    impl State for Finisher {
        type Action = Swing;
        fn options(&self) -> Vec<Swing> {
            match self.dead {
                true => vec![Swing::Pass],
                false => vec![Swing::Kill, Swing::Pass],
            }
        }
        fn simulate(&self, action: &Swing) -> Option<Self> {
            match action {
                Swing::Kill => Some(Finisher { dead: true }),
                Swing::Pass => Some(self.clone()),
            }
        }
        fn end_turn(&self) -> Swing {
            Swing::Pass
        }
        fn to_move(&self) -> Seat {
            Seat::First
        }
        fn finished(&self) -> Option<Verdict> {
            self.dead.then_some(Verdict::Winner(Seat::First))
        }
        fn summary(&self, side: Side) -> Summary {
            Summary {
                health: match (side, self.dead) {
                    (Side::Enemy, true) => 0,
                    _ => 30,
                },
                ..Summary::default()
            }
        }
        fn minions(&self, _: Side) -> Vec<Minion> {
            Vec::new()
        }
        fn hand(&self, _: Side) -> Vec<CardInfo> {
            Vec::new()
        }
    }

    fn quick<S: State>(scorer: Scorer) -> Agent<S> {
        Agent::new(scorer).budgeted(Duration::from_millis(50))
    }

    #[test]
    fn forced_end_turn_skips_the_future_estimate() {
        let network = Arc::new(Tally::default());
        let mut agent = quick::<Solo>(Scorer::new(network.clone()));
        let action = agent.act(&Solo { turns: 0 }).unwrap();
        assert_eq!(action, Pass);
        assert_eq!(network.scored.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn end_turn_closes_out_the_record() {
        let mut agent = quick::<Solo>(Scorer::default());
        agent.act(&Solo { turns: 0 }).unwrap();
        assert_eq!(agent.record().positions(), 1);
        assert_eq!(agent.record().turns(), 1);
        agent.act(&Solo { turns: 1 }).unwrap();
        assert_eq!(agent.record().turns(), 2);
    }

    #[test]
    fn full_exploration_plays_legal_moves_without_keeping_trees() {
        let mut agent = quick::<Skirmish>(Scorer::default()).exploring(1.0);
        let mut game = Skirmish::deal();
        // early plies only, where no lethal line exists to override the coin
        for _ in 0..12 {
            if game.finished().is_some() {
                break;
            }
            let action = agent.act(&game).unwrap();
            assert!(game.options().contains(&action));
            assert!(!agent.searching());
            game = game.simulate(&action).expect("legal action");
        }
        assert!(agent.record().positions() > 0);
    }

    #[test]
    fn discovered_win_overrides_exploration() {
        let mut agent = quick::<Finisher>(Scorer::default()).exploring(1.0);
        let action = agent.act(&Finisher { dead: false }).unwrap();
        assert_eq!(action, Swing::Kill);
    }

    #[test]
    fn record_survives_into_transitions() {
        let mut agent = quick::<Solo>(Scorer::default());
        agent.act(&Solo { turns: 0 }).unwrap();
        agent.act(&Solo { turns: 1 }).unwrap();
        let transitions = agent.record().transitions(true);
        assert_eq!(transitions.len(), 2);
        assert_eq!(transitions[1].reward, WIN_SCORE);
    }
}
