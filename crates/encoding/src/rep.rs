use serde::Deserialize;
use serde::Serialize;
use tempo_core::*;

/// One minion's feature row.
pub type MinionVec = [Feature; MINION_FEATURES];
/// One hand card's feature row.
pub type CardVec = [Feature; CARD_FEATURES];
/// One side's board-summary row.
pub type SideVec = [Feature; BOARD_FEATURES];
/// Both sides' summaries: friendly first, enemy second.
pub type BoardVec = [SideVec; BOARD_SIDES];

/// The fixed-shape representation of one game position.
///
/// Serves simultaneously as a dictionary key (derived `Eq` + `Hash` over
/// every component, so equality and hashing agree by construction) and as
/// network input (via [`flat`](GameRep::flat)). Shapes are enforced at the
/// type level; there is no malformed value to guard against.
///
/// Representations are immutable once built. The all-zero value stands in
/// for an absent or unknowable snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GameRep {
    hand: [CardVec; MAX_HAND_CARDS],
    friendly: [MinionVec; MAX_SIDE_MINIONS],
    enemy: [MinionVec; MAX_SIDE_MINIONS],
    board: BoardVec,
    history: [BoardVec; HISTORY_LENGTH],
}

impl GameRep {
    pub(crate) fn new(
        hand: [CardVec; MAX_HAND_CARDS],
        friendly: [MinionVec; MAX_SIDE_MINIONS],
        enemy: [MinionVec; MAX_SIDE_MINIONS],
        board: BoardVec,
        history: [BoardVec; HISTORY_LENGTH],
    ) -> Self {
        Self {
            hand,
            friendly,
            enemy,
            board,
            history,
        }
    }

    /// Both summary rows for this position.
    pub fn board(&self) -> &BoardVec {
        &self.board
    }
    /// Friendly hero health (+armor) feature.
    pub fn friendly_health(&self) -> Feature {
        self.board[0][0]
    }
    /// Enemy hero health (+armor) feature.
    pub fn enemy_health(&self) -> Feature {
        self.board[1][0]
    }

    /// Flattened feature vector for the value network, in stable order:
    /// hand, friendly minions, enemy minions, board, history.
    pub fn flat(&self) -> Vec<f32> {
        let mut flat = Vec::with_capacity(REP_FLAT_LEN);
        flat.extend(self.hand.iter().flatten().map(|&x| x as f32));
        flat.extend(self.friendly.iter().flatten().map(|&x| x as f32));
        flat.extend(self.enemy.iter().flatten().map(|&x| x as f32));
        flat.extend(self.board.iter().flatten().map(|&x| x as f32));
        flat.extend(
            self.history
                .iter()
                .flatten()
                .flatten()
                .map(|&x| x as f32),
        );
        debug_assert!(flat.len() == REP_FLAT_LEN);
        flat
    }
}

/// A representation carrying only summary rows; everything else zero.
/// Convenient for reward-function call sites and tests.
impl From<BoardVec> for GameRep {
    fn from(board: BoardVec) -> Self {
        Self {
            board,
            ..Self::default()
        }
    }
}

/// Dominance order over feature rows: the row whose first differing
/// component is larger sorts first. Structurally identical boards then
/// encode identically regardless of engine-side entity order.
pub(crate) fn dominance<const N: usize>(a: &[Feature; N], b: &[Feature; N]) -> std::cmp::Ordering {
    b.iter().cmp(a.iter())
}

/// Pad a row list to `R` slots with zeros and sort it by [`dominance`].
pub(crate) fn stack<const R: usize, const C: usize>(rows: Vec<[Feature; C]>) -> [[Feature; C]; R] {
    let mut stacked = [[0; C]; R];
    for (slot, row) in stacked.iter_mut().zip(rows.into_iter()) {
        *slot = row;
    }
    stacked.sort_by(dominance);
    stacked
}
