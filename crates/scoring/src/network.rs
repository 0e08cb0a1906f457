use tempo_core::*;
use tempo_encoding::*;

/// Contract for the value-function approximator.
///
/// The approximator keeps two parameter sets of the same topology: the
/// "online" set, updated on every training step, and the "target" set,
/// synced from online at a slower cadence. Temporal-difference targets
/// read the target set so the regression target does not chase its own
/// updates.
///
/// Implementations own a single exclusive lock around every operation;
/// the underlying compute substrate is not assumed reentrant. All
/// scoring and training happens inside an [`open`](Network::open) /
/// [`close`](Network::close) session bracket.
pub trait Network: Send + Sync {
    /// Score states with the online (`true`) or target (`false`) set.
    fn score(&self, online: bool, states: &[GameRep]) -> Vec<Score>;
    /// One gradient step of the online set toward `targets`.
    /// Returns the pre-update batch loss.
    fn train(&self, states: &[GameRep], targets: &[Score]) -> anyhow::Result<Score>;
    /// Copy online parameters over the target parameters.
    fn sync(&self);
    /// Persist a checkpoint tagged with the training epoch.
    fn save(&self, tag: Epoch) -> anyhow::Result<()>;
    /// Restore the most recent checkpoint.
    fn load(&self) -> anyhow::Result<()>;
    /// Begin a session. Returns false if one was already running.
    fn open(&self) -> bool;
    /// End the session, releasing substrate resources. Returns false if
    /// none was running.
    fn close(&self) -> bool;
}
