use super::*;
use tempo_engine::*;
use tempo_core::*;

/// Builds [`GameRep`]s from engine states.
///
/// The encoder is a pure function of the visible state, the perspective
/// flag, and the board history it was constructed with. Agents build one
/// per turn from their game record so every node encoded during that
/// turn shares the same history context.
#[derive(Debug, Clone, Default)]
pub struct Encoder {
    history: [BoardVec; HISTORY_LENGTH],
}

impl Encoder {
    /// Carry the last up-to-[`HISTORY_LENGTH`] board summaries, oldest
    /// first, front-padded with zero boards.
    pub fn new(boards: &[BoardVec]) -> Self {
        let mut history = [BoardVec::default(); HISTORY_LENGTH];
        let tail = boards.len().min(HISTORY_LENGTH);
        let skip = HISTORY_LENGTH - tail;
        for (slot, board) in history[skip..]
            .iter_mut()
            .zip(boards[boards.len() - tail..].iter())
        {
            *slot = *board;
        }
        Self { history }
    }

    /// Encode a state. `flipped` marks states reached by a turn-ending
    /// action, where the engine's player-to-move has already switched but
    /// the mover's side must stay "friendly" in the representation.
    ///
    /// Hidden zones (the enemy hand) encode as zero rows. Entity rows are
    /// sorted into dominance order so permutations of structurally equal
    /// boards cannot produce distinct keys.
    pub fn encode<S: State>(&self, state: &S, flipped: bool) -> GameRep {
        let friendly = if flipped { Side::Enemy } else { Side::Friendly };
        let enemy = friendly.flip();
        GameRep::new(
            stack(state.hand(friendly).iter().map(CardInfo::vector).collect()),
            stack(state.minions(friendly).iter().map(Minion::vector).collect()),
            stack(state.minions(enemy).iter().map(Minion::vector).collect()),
            Self::board(state, flipped),
            self.history,
        )
    }

    /// Just the two summary rows of a state, perspective-resolved.
    pub fn board<S: State>(state: &S, flipped: bool) -> BoardVec {
        let friendly = if flipped { Side::Enemy } else { Side::Friendly };
        [
            state.summary(friendly).vector(),
            state.summary(friendly.flip()).vector(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encoding_is_deterministic() {
        let game = Skirmish::deal();
        let encoder = Encoder::default();
        assert_eq!(encoder.encode(&game, false), encoder.encode(&game, false));
    }

    #[test]
    fn perspective_flip_swaps_summaries() {
        let game = Skirmish::deal();
        let straight = Encoder::board(&game, false);
        let flipped = Encoder::board(&game, true);
        assert_eq!(straight[0], flipped[1]);
        assert_eq!(straight[1], flipped[0]);
    }

    #[test]
    fn history_is_front_padded_oldest_first() {
        let mut a = BoardVec::default();
        a[0][0] = 1;
        let mut b = BoardVec::default();
        b[0][0] = 2;
        let game = Skirmish::deal();
        let short = Encoder::new(&[a, b]).encode(&game, false);
        let mut padded = [BoardVec::default(); HISTORY_LENGTH];
        padded[HISTORY_LENGTH - 2] = a;
        padded[HISTORY_LENGTH - 1] = b;
        let explicit = Encoder {
            history: padded,
        }
        .encode(&game, false);
        assert_eq!(short, explicit);
    }

    #[test]
    fn history_keeps_only_the_tail() {
        let boards = (0..5)
            .map(|i| {
                let mut board = BoardVec::default();
                board[0][0] = i;
                board
            })
            .collect::<Vec<_>>();
        let game = Skirmish::deal();
        let long = Encoder::new(&boards).encode(&game, false);
        let tail = Encoder::new(&boards[2..]).encode(&game, false);
        assert_eq!(long, tail);
    }

    #[test]
    fn distinct_histories_separate_equal_states() {
        let game = Skirmish::deal();
        let mut board = BoardVec::default();
        board[0][0] = 9;
        let a = Encoder::default().encode(&game, false);
        let b = Encoder::new(&[board]).encode(&game, false);
        assert_ne!(a, b);
    }
}
