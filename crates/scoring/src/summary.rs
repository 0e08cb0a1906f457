use super::*;
use serde::Deserialize;
use serde::Serialize;
use tempo_core::*;
use tempo_encoding::*;

/// Compact snapshot of one turn's search frontier: the turn-start state
/// and the end-of-turn candidates the search discovered. Persisted with
/// each transition so target computation can re-maximize over the
/// successor turn's choices long after the tree itself is gone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchSummary {
    start: GameRep,
    candidates: Vec<GameRep>,
}

impl SearchSummary {
    pub fn new(start: GameRep, candidates: Vec<GameRep>) -> Self {
        Self { start, candidates }
    }
    pub fn start(&self) -> &GameRep {
        &self.start
    }
    pub fn candidates(&self) -> &[GameRep] {
        &self.candidates
    }

    /// Arg-max candidate under the online parameter set, with its score.
    /// `None` when no candidates were recorded.
    pub fn best_online(&self, scorer: &Scorer) -> Option<(Score, &GameRep)> {
        scorer
            .q_many(&self.start, &self.candidates, true)
            .into_iter()
            .zip(self.candidates.iter())
            .max_by(|(a, _), (b, _)| a.total_cmp(b))
    }

    /// Double-Q estimate: select with the online set, evaluate the
    /// selection with the target set. `None` when no candidates were
    /// recorded.
    pub fn double_q(&self, scorer: &Scorer) -> Option<Score> {
        self.best_online(scorer)
            .map(|(_, best)| scorer.q(&self.start, best, false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rep(friendly: Feature, enemy: Feature) -> GameRep {
        let mut board = BoardVec::default();
        board[0][0] = friendly;
        board[1][0] = enemy;
        GameRep::from(board)
    }

    #[test]
    fn empty_candidates_yield_no_estimate() {
        let summary = SearchSummary::new(rep(30, 30), Vec::new());
        let scorer = Scorer::default();
        assert!(summary.best_online(&scorer).is_none());
        assert!(summary.double_q(&scorer).is_none());
    }

    #[test]
    fn best_online_picks_the_argmax() {
        let lethal = rep(10, 0);
        let meek = rep(10, 30);
        let summary = SearchSummary::new(rep(10, 30), vec![meek, lethal.clone()]);
        let scorer = Scorer::default();
        let (score, best) = summary.best_online(&scorer).unwrap();
        assert_eq!(best, &lethal);
        assert_eq!(score, WIN_SCORE);
    }
}
