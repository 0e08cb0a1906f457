use super::*;
use serde::Deserialize;
use serde::Serialize;
use tempo_core::*;
use tempo_encoding::*;

/// One unit of replay data: a (state, action) pair, the reward observed
/// between this action and the next own turn, and the successor context
/// needed for double-Q targets. Terminal transitions have no successor
/// and carry the fixed win/loss reward.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub state: GameRep,
    pub action: GameRep,
    pub reward: Score,
    pub successor: Option<GameRep>,
    pub summary: Option<SearchSummary>,
}

/// Ordered log of one game from one player's perspective.
///
/// States and actions alternate strictly: a state, then the action taken
/// from it, never two of a kind in a row. The push operations enforce the
/// alternation by refusing out-of-order pushes instead of corrupting the
/// record.
#[derive(Debug, Default)]
pub struct GameRecord {
    states: Vec<GameRep>,
    actions: Vec<GameRep>,
    summaries: Vec<Option<SearchSummary>>,
}

impl GameRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of completed (state, action) turns.
    pub fn turns(&self) -> usize {
        self.actions.len()
    }
    /// Number of recorded turn-start states.
    pub fn positions(&self) -> usize {
        self.states.len()
    }

    /// Record a turn-start state. Fails (returning `false`, touching
    /// nothing) unless every previous state already has its action.
    pub fn push_state(&mut self, state: GameRep) -> bool {
        if self.states.len() == self.actions.len() {
            self.states.push(state);
            true
        } else {
            false
        }
    }

    /// Record the action representation for the pending state, with the
    /// search summary that chose it. Fails unless exactly one state is
    /// awaiting its action.
    pub fn push_action(&mut self, action: GameRep, summary: Option<SearchSummary>) -> bool {
        if self.states.len() == self.actions.len() + 1 {
            self.actions.push(action);
            self.summaries.push(summary);
            true
        } else {
            false
        }
    }

    /// The last `n` recorded board summaries, oldest first. Feeds the
    /// encoder's history tensor.
    pub fn last_boards(&self, n: usize) -> Vec<BoardVec> {
        self.states
            .iter()
            .rev()
            .take(n)
            .rev()
            .map(|rep| *rep.board())
            .collect()
    }

    /// Label the game's turns with rewards and successor context.
    ///
    /// The final action carries the fixed win/loss reward; interior
    /// actions carry the shaped reward observed across the opponent's
    /// reply. Each transition's summary is the one recorded with the
    /// successor turn, since that is the frontier its target maximizes
    /// over.
    pub fn transitions(&self, won: bool) -> Vec<TransitionRecord> {
        (0..self.actions.len())
            .map(|i| {
                let last = i + 1 == self.actions.len();
                let successor = if last { None } else { self.states.get(i + 1).cloned() };
                let reward = match (last, successor.as_ref()) {
                    (true, _) => {
                        if won {
                            WIN_SCORE
                        } else {
                            LOSS_SCORE
                        }
                    }
                    (false, Some(next)) => Scorer::transition_reward(&self.actions[i], next),
                    (false, None) => 0.0,
                };
                TransitionRecord {
                    state: self.states[i].clone(),
                    action: self.actions[i].clone(),
                    reward,
                    successor,
                    summary: if last {
                        None
                    } else {
                        self.summaries.get(i + 1).cloned().flatten()
                    },
                }
            })
            .collect()
    }
}
