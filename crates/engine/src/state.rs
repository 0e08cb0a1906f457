use super::*;

/// Absolute seat at the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Seat {
    First,
    Second,
}

impl Seat {
    pub fn rival(&self) -> Seat {
        match self {
            Seat::First => Seat::Second,
            Seat::Second => Seat::First,
        }
    }
    /// Index into per-seat arrays.
    pub fn index(&self) -> usize {
        match self {
            Seat::First => 0,
            Seat::Second => 1,
        }
    }
}

/// Board side relative to the state's player to move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Friendly,
    Enemy,
}

impl Side {
    pub fn flip(&self) -> Side {
        match self {
            Side::Friendly => Side::Enemy,
            Side::Enemy => Side::Friendly,
        }
    }
}

/// Outcome of a finished game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Winner(Seat),
    Draw,
}

/// An engine action.
///
/// Equality is used to re-validate queued actions against fresh option
/// lists, so it must be structural.
pub trait Action: Clone + PartialEq + std::fmt::Debug + Send {
    /// True for the action that ends the current player's turn.
    fn ends_turn(&self) -> bool;
}

/// A queryable game position supplied by the rules engine.
///
/// Implementations are snapshots: `simulate` never mutates the receiver,
/// and repeated calls on a stochastic action are free to diverge. That
/// divergence is exactly what the search layer probes for.
pub trait State: Clone + Send {
    type Action: Action;

    /// Legal actions for the player to move. Non-empty for unfinished
    /// states (at minimum the turn-ending action).
    fn options(&self) -> Vec<Self::Action>;
    /// Result of taking `action` from this position. `None` signals a
    /// buggy simulation; callers skip the action rather than retry.
    fn simulate(&self, action: &Self::Action) -> Option<Self>;
    /// The generic turn-ending action from this position.
    fn end_turn(&self) -> Self::Action;
    /// Whose turn it is.
    fn to_move(&self) -> Seat;
    /// Winner or draw once a defeat condition holds, `None` while ongoing.
    fn finished(&self) -> Option<Verdict>;

    /// Board summary for one side.
    fn summary(&self, side: Side) -> Summary;
    /// Board minions for one side, in engine order.
    fn minions(&self, side: Side) -> Vec<Minion>;
    /// Hand cards for one side. Hidden information (the enemy hand)
    /// comes back empty.
    fn hand(&self, side: Side) -> Vec<CardInfo>;
}
