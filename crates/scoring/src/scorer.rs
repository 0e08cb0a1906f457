use super::*;
use std::sync::Arc;
use tempo_core::*;
use tempo_encoding::*;

// Hand-tuned coefficients over the 15 board-summary features, in vector
// order: health, base mana, remaining mana, hand size, board size, deck
// size, secret size, graveyard size, total attack, total health, taunt
// health, hero attack, weapon durability, power uses, hand cost.
// Tunable hyperparameters, not contracts.
#[rustfmt::skip]
pub const FRIENDLY_TURN_WEIGHTS: [Score; BOARD_FEATURES] = [
    0.01, 0.1, -0.1, 0.1, 0.2, 0.0, 0.2, 0.0, 0.01, 0.01, 0.01, 0.1, 0.025, 0.0, 0.0,
];
#[rustfmt::skip]
pub const ENEMY_TURN_WEIGHTS: [Score; BOARD_FEATURES] = [
    -0.01, -0.1, 0.0, -0.1, -0.2, 0.0, -0.2, 0.0, -0.01, -0.01, -0.01, -0.1, -0.025, 0.0, 0.0,
];
#[rustfmt::skip]
pub const FRIENDLY_TRANSITION_WEIGHTS: [Score; BOARD_FEATURES] = [
    0.01, 0.0, 0.0, 0.1, 0.2, 0.0, 0.2, 0.0, 0.01, 0.01, 0.01, 0.1, 0.025, 0.0, 0.0,
];
#[rustfmt::skip]
pub const ENEMY_TRANSITION_WEIGHTS: [Score; BOARD_FEATURES] = [
    -0.01, 0.0, 0.0, -0.1, -0.2, 0.0, -0.2, 0.0, -0.01, -0.01, -0.01, -0.1, -0.025, 0.0, 0.0,
];

fn dot(features: &SideVec, weights: &[Score; BOARD_FEATURES]) -> Score {
    features
        .iter()
        .zip(weights)
        .map(|(&x, w)| x as Score * w)
        .sum()
}

/// Turns positions into scalar training and search signals.
///
/// The immediate component is a fixed linear function of board summaries;
/// the future component delegates to the injected [`Network`]. Without a
/// network the future estimate is zero and the scorer degenerates to the
/// hand-crafted heuristic.
#[derive(Clone)]
pub struct Scorer {
    network: Option<Arc<dyn Network>>,
    gamma: Score,
}

impl Default for Scorer {
    fn default() -> Self {
        Self {
            network: None,
            gamma: GAMMA,
        }
    }
}

impl Scorer {
    pub fn new(network: Arc<dyn Network>) -> Self {
        Self {
            network: Some(network),
            ..Self::default()
        }
    }
    pub fn gamma(&self) -> Score {
        self.gamma
    }

    /// Reward for ending a turn on `end`, having started it on `start`.
    ///
    /// Terminal boundary first: a dead friendly hero is exactly
    /// [`LOSS_SCORE`] and a dead enemy hero exactly [`WIN_SCORE`], no
    /// matter what the other features say.
    pub fn turn_reward(_start: &GameRep, end: &GameRep) -> Score {
        if end.friendly_health() <= 0 {
            LOSS_SCORE
        } else if end.enemy_health() <= 0 {
            WIN_SCORE
        } else {
            dot(&end.board()[0], &FRIENDLY_TURN_WEIGHTS) + dot(&end.board()[1], &ENEMY_TURN_WEIGHTS)
        }
    }

    /// Reward accrued between taking `action` and observing `successor`
    /// at the start of the next own turn. Includes the flat per-turn
    /// decay so dragging games out is never free.
    pub fn transition_reward(action: &GameRep, successor: &GameRep) -> Score {
        if action.friendly_health() <= 0 || successor.friendly_health() <= 0 {
            LOSS_SCORE
        } else if action.enemy_health() <= 0 || successor.enemy_health() <= 0 {
            WIN_SCORE
        } else {
            dot(&successor.board()[0], &FRIENDLY_TRANSITION_WEIGHTS)
                + dot(&successor.board()[1], &ENEMY_TRANSITION_WEIGHTS)
                - TURN_DECAY
        }
    }

    /// Estimated discounted future reward of the given end-of-turn
    /// states. Zeros without a configured network.
    pub fn future(&self, states: &[GameRep], online: bool) -> Vec<Score> {
        match self.network.as_ref() {
            Some(network) => network.score(online, states),
            None => vec![0.0; states.len()],
        }
    }

    /// Q value of ending the turn on `end` from `start`: immediate turn
    /// reward plus estimated future reward.
    pub fn q(&self, start: &GameRep, end: &GameRep, online: bool) -> Score {
        Self::turn_reward(start, end) + self.future(std::slice::from_ref(end), online)[0]
    }

    /// Batched [`q`](Scorer::q) against a shared start state.
    pub fn q_many(&self, start: &GameRep, ends: &[GameRep], online: bool) -> Vec<Score> {
        ends.iter()
            .map(|end| Self::turn_reward(start, end))
            .zip(self.future(ends, online))
            .map(|(turn, future)| turn + future)
            .collect()
    }

    /// Double-Q training targets: stored reward for terminal transitions,
    /// else reward + gamma times the target-set score of the online-set
    /// arg-max over the recorded successor candidates. A missing or empty
    /// candidate set contributes nothing; sparse summaries are legitimate
    /// for trivial turns.
    pub fn targets(&self, transitions: &[TransitionRecord]) -> Vec<Score> {
        transitions
            .iter()
            .map(|t| match t.successor {
                None => t.reward,
                Some(_) => {
                    t.reward
                        + self.gamma
                            * t.summary
                                .as_ref()
                                .and_then(|s| s.double_q(self))
                                .unwrap_or(0.0)
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board(friendly_health: Feature, enemy_health: Feature) -> BoardVec {
        let mut board = BoardVec::default();
        board[0][0] = friendly_health;
        board[1][0] = enemy_health;
        board
    }

    #[test]
    fn dead_friendly_hero_is_exactly_the_loss_constant() {
        let start = GameRep::default();
        let mut end = board(0, 25);
        end[0][4] = 7; // a full board cannot soften a loss
        assert_eq!(Scorer::turn_reward(&start, &GameRep::from(end)), LOSS_SCORE);
    }

    #[test]
    fn dead_enemy_hero_is_exactly_the_win_constant() {
        let start = GameRep::default();
        let mut end = board(3, -2);
        end[1][4] = 7;
        assert_eq!(Scorer::turn_reward(&start, &GameRep::from(end)), WIN_SCORE);
    }

    #[test]
    fn loss_takes_precedence_over_win() {
        let start = GameRep::default();
        let end = GameRep::from(board(-1, -1));
        assert_eq!(Scorer::turn_reward(&start, &end), LOSS_SCORE);
    }

    #[test]
    fn ongoing_turn_reward_is_the_weighted_sum() {
        let start = GameRep::default();
        let end = GameRep::from(board(30, 25));
        let expected = 30.0 * FRIENDLY_TURN_WEIGHTS[0] + 25.0 * ENEMY_TURN_WEIGHTS[0];
        assert!((Scorer::turn_reward(&start, &end) - expected).abs() < 1e-6);
    }

    #[test]
    fn transition_reward_applies_turn_decay() {
        let action = GameRep::from(board(30, 25));
        let successor = GameRep::from(board(28, 25));
        let expected = 28.0 * FRIENDLY_TRANSITION_WEIGHTS[0] + 25.0 * ENEMY_TRANSITION_WEIGHTS[0]
            - TURN_DECAY;
        assert!((Scorer::transition_reward(&action, &successor) - expected).abs() < 1e-6);
    }

    #[test]
    fn terminal_transition_target_is_the_stored_reward() {
        let t = TransitionRecord {
            state: GameRep::default(),
            action: GameRep::from(board(10, -5)),
            reward: WIN_SCORE,
            successor: None,
            summary: None,
        };
        assert_eq!(Scorer::default().targets(&[t]), vec![WIN_SCORE]);
    }

    #[test]
    fn nonterminal_target_adds_discounted_successor_estimate() {
        let scorer = Scorer::default();
        let start = GameRep::from(board(20, 20));
        let better = GameRep::from(board(20, 10));
        let worse = GameRep::from(board(20, 19));
        let summary = SearchSummary::new(start.clone(), vec![worse.clone(), better.clone()]);
        let t = TransitionRecord {
            state: GameRep::default(),
            action: GameRep::from(board(20, 20)),
            reward: 1.5,
            successor: Some(GameRep::from(board(20, 18))),
            summary: Some(summary),
        };
        let expected = 1.5 + GAMMA * scorer.q(&start, &better, false);
        let got = scorer.targets(&[t])[0];
        assert!((got - expected).abs() < 1e-5);
    }

    #[test]
    fn empty_summary_degrades_to_reward() {
        let scorer = Scorer::default();
        let t = TransitionRecord {
            state: GameRep::default(),
            action: GameRep::default(),
            reward: 2.0,
            successor: Some(GameRep::default()),
            summary: Some(SearchSummary::new(GameRep::default(), Vec::new())),
        };
        assert_eq!(scorer.targets(&[t]), vec![2.0]);
    }
}
