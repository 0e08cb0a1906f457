use anyhow::Context;
use rand::seq::IndexedRandom;
use tempo_engine::*;

/// Baseline player that chooses uniformly from legal actions.
/// Seeds the replay memory during warmup and floors benchmarks.
pub struct Rando;

impl<S: State> Player<S> for Rando {
    fn act(&mut self, state: &S) -> anyhow::Result<S::Action> {
        let ref mut rng = rand::rng();
        state
            .options()
            .choose(rng)
            .cloned()
            .context("non empty legal actions conditional on being asked to move")
    }
}
