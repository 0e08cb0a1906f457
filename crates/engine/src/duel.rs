use super::*;
use tempo_core::*;

/// A decision-making participant in a game.
pub trait Player<S: State> {
    /// Choose an action for the given position. An `Err` counts as an
    /// exception against this player's seat and forfeits the game.
    fn act(&mut self, state: &S) -> anyhow::Result<S::Action>;
    /// Called once before the first ply.
    fn begin(&mut self) {}
}

/// Per-seat outcome summary of one driven game.
///
/// Games with exceptions or draws are discarded from training data.
#[derive(Debug, Clone, Copy, Default)]
pub struct GameStats {
    pub wins: [u32; 2],
    pub exceptions: [u32; 2],
    pub plies: usize,
}

impl GameStats {
    /// True when this game must not contribute transitions: either seat
    /// raised, or nobody won.
    pub fn discard(&self) -> bool {
        self.exceptions.iter().any(|&n| n > 0) || self.wins.iter().all(|&n| n == 0)
    }
    /// The winning seat, if exactly one side won cleanly.
    pub fn winner(&self) -> Option<Seat> {
        match (self.discard(), self.wins) {
            (true, _) => None,
            (_, [1, 0]) => Some(Seat::First),
            (_, [0, 1]) => Some(Seat::Second),
            _ => None,
        }
    }
    fn conclude(&mut self, verdict: Verdict) {
        if let Verdict::Winner(seat) = verdict {
            self.wins[seat.index()] += 1;
        }
    }
    fn charge(&mut self, seat: Seat) {
        self.exceptions[seat.index()] += 1;
    }
}

/// Drive a full game between two players from the given root position.
///
/// The engine's own `simulate` is the transition function. A ply that
/// simulates to `None` mid-game is charged to the acting seat, as is a
/// player error; either aborts the game. Games exceeding
/// [`MAX_GAME_PLIES`] end as draws.
pub fn play<S: State>(
    first: &mut dyn Player<S>,
    second: &mut dyn Player<S>,
    root: S,
) -> GameStats {
    let mut stats = GameStats::default();
    let mut state = root;
    first.begin();
    second.begin();
    for _ in 0..MAX_GAME_PLIES {
        if let Some(verdict) = state.finished() {
            stats.conclude(verdict);
            return stats;
        }
        let seat = state.to_move();
        let player: &mut dyn Player<S> = match seat {
            Seat::First => first,
            Seat::Second => second,
        };
        let action = match player.act(&state) {
            Ok(action) => action,
            Err(e) => {
                log::warn!("player {:?} raised: {:#}", seat, e);
                stats.charge(seat);
                return stats;
            }
        };
        match state.simulate(&action) {
            Some(next) => state = next,
            None => {
                log::warn!("action {:?} by {:?} failed to simulate", action, seat);
                stats.charge(seat);
                return stats;
            }
        }
        stats.plies += 1;
    }
    log::debug!("game exhausted {} plies, calling it a draw", MAX_GAME_PLIES);
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::seq::IndexedRandom;

    /// Plays uniformly random legal actions.
    struct Chaotic;
    impl Player<Skirmish> for Chaotic {
        fn act(&mut self, state: &Skirmish) -> anyhow::Result<Move> {
            let ref mut rng = rand::rng();
            Ok(*state.options().choose(rng).expect("legal actions"))
        }
    }

    /// Raises on its first decision.
    struct Thrower;
    impl Player<Skirmish> for Thrower {
        fn act(&mut self, _: &Skirmish) -> anyhow::Result<Move> {
            anyhow::bail!("deliberate failure")
        }
    }

    #[test]
    fn random_duel_reaches_a_verdict_or_draw() {
        let stats = play(&mut Chaotic, &mut Chaotic, Skirmish::deal());
        assert_eq!(stats.exceptions, [0, 0]);
        assert!(stats.wins[0] + stats.wins[1] <= 1);
    }

    #[test]
    fn player_errors_charge_their_seat_and_discard_the_game() {
        let stats = play(&mut Thrower, &mut Chaotic, Skirmish::deal());
        assert_eq!(stats.exceptions, [1, 0]);
        assert!(stats.discard());
        assert_eq!(stats.winner(), None);
    }

    #[test]
    fn clean_wins_are_attributed_to_a_seat() {
        let mut stats = GameStats::default();
        stats.conclude(Verdict::Winner(Seat::Second));
        assert_eq!(stats.winner(), Some(Seat::Second));
        assert!(!stats.discard());
    }
}
