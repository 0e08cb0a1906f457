use super::*;
use petgraph::graph::NodeIndex;
use rand::Rng;
use rand::SeedableRng;
use rand::rngs::SmallRng;
use std::collections::VecDeque;
use std::time::Duration;
use std::time::Instant;
use tempo_core::*;
use tempo_encoding::*;
use tempo_engine::*;
use tempo_scoring::*;

/// One queued step of the derived action sequence: the representation
/// the engine must be showing for the step to apply, and the action to
/// take from it.
struct Step<S: State> {
    expected: GameRep,
    action: S::Action,
}

/// The search forest grown during one turn.
///
/// Owns every tree by id in one arena: tree 0 roots at the position the
/// search was opened on, and each sampled chance outcome roots a further
/// tree registered with its whole ancestor chain. All expansion is
/// wall-clock budgeted and degrades to best-effort; there is no
/// cancellation beyond the deadline checks.
pub struct Search<S: State> {
    trees: Vec<Tree<S>>,
    /// The tree current play descends from; moves forward through
    /// chance outcomes as reality resolves them.
    root: TreeId,
    /// Representation of the position the turn started on.
    start: GameRep,
    scorer: Scorer,
    encoder: Encoder,
    queue: VecDeque<Step<S>>,
    /// Last node of the most recently derived queue.
    terminal: Option<(TreeId, NodeIndex)>,
    rng: SmallRng,
}

impl<S: State> Search<S> {
    pub fn new(state: S, encoder: Encoder, scorer: Scorer, start: GameRep) -> Self {
        let tree = Tree::new(state, &encoder, false);
        Self {
            trees: vec![tree],
            root: 0,
            start,
            scorer,
            encoder,
            queue: VecDeque::new(),
            terminal: None,
            rng: SmallRng::from_rng(&mut rand::rng()),
        }
    }

    /// One thinking slice: fill the deterministic tree, spend what is
    /// left sampling chance outcomes, then derive the move queue from
    /// the best of what was found.
    pub fn run(&mut self, budget: Duration) {
        let opening = Instant::now();
        self.fill(self.root, opening + budget);
        let fill_time = opening.elapsed();
        let remaining = budget.saturating_sub(fill_time);
        let chances = self.trees[self.root].chances.len();
        let slice = remaining / (chances as u32 + 1);
        let slice = slice.max((slice + fill_time) / 2);
        let resumed = Instant::now();
        let mut loops = 0;
        // the loop cap cuts sampling off once it stops uncovering new
        // subtrees relative to how many already exist
        while self.lethal().is_none()
            && chances > 0
            && resumed.elapsed() < remaining
            && loops < self.trees[self.root].subtrees.len().pow(2) + chances
        {
            self.wander(slice);
            loops += 1;
        }
        self.requeue();
        debug_assert!(self.trees[self.root].check(&self.encoder));
    }

    /// Expand unexpanded deterministic nodes, popped at random, until
    /// the worklist drains, a lethal line is found, or the deadline
    /// passes. The deadline is waived while no end-turn candidate
    /// exists yet; a queue must never come back empty-handed for lack
    /// of patience.
    fn fill(&mut self, tree: TreeId, deadline: Instant) {
        loop {
            let encoder = &self.encoder;
            let focus = &mut self.trees[tree];
            if focus.lethal.is_some() || focus.worklist.is_empty() {
                break;
            }
            if Instant::now() >= deadline && !focus.end_turns.is_empty() {
                break;
            }
            let pick = self.rng.random_range(0..focus.worklist.len());
            let node = focus.worklist.swap_remove(pick);
            if let Some(winner) = focus.sprout(node, encoder) {
                focus.lethal = Some(winner);
            }
        }
    }

    /// One bounded round of stochastic exploration: walk down from the
    /// current root through percolated outcome subtrees with a fixed
    /// continuation probability (biasing effort toward shallower, more
    /// impactful chance events), then sample one chance node of the
    /// tree the walk stopped in.
    fn wander(&mut self, slice: Duration) {
        let mut current = self.root;
        while !self.trees[current].subtrees.is_empty()
            && self.rng.random::<Probability>() <= DESCEND_PROBABILITY
        {
            let subtrees = &self.trees[current].subtrees;
            current = subtrees[self.rng.random_range(0..subtrees.len())];
        }
        if self.trees[current].chances.is_empty() {
            return;
        }
        let pick = self.rng.random_range(0..self.trees[current].chances.len());
        let chance = self.trees[current].chances[pick];
        self.sample(current, chance, slice);
    }

    /// Draw [`CHANCE_SAMPLE_LOOPS`] outcomes of one chance node. Known
    /// outcomes bump their visit weight; novel outcomes root a fresh
    /// subtree, deterministically filled with a slice of the budget and
    /// registered with every ancestor tree.
    fn sample(&mut self, tree: TreeId, chance: NodeIndex, slice: Duration) {
        let Some((pred, action)) = self.trees[tree].incoming(chance) else {
            return;
        };
        let action = action.clone();
        let Some(state) = self.trees[tree].graph[pred].state().cloned() else {
            return;
        };
        let flipped = action.ends_turn();
        for _ in 0..CHANCE_SAMPLE_LOOPS {
            match state.simulate(&action) {
                None => log::debug!("chance action {:?} failed to simulate", action),
                Some(next) => {
                    let rep = self.encoder.encode(&next, flipped);
                    let known = match &mut self.trees[tree].graph[chance] {
                        SearchNode::Chance { outcomes } => match outcomes.get_mut(&rep) {
                            Some(outcome) => {
                                outcome.weight += 1;
                                true
                            }
                            None => false,
                        },
                        SearchNode::Deterministic { .. } => return,
                    };
                    if known {
                        continue;
                    }
                    let mut sub = Tree::new(next, &self.encoder, flipped);
                    sub.parent = Some(tree);
                    let id = self.trees.len();
                    self.trees.push(sub);
                    self.fill(id, Instant::now() + slice / CHANCE_SAMPLE_LOOPS as u32);
                    if let SearchNode::Chance { outcomes } = &mut self.trees[tree].graph[chance] {
                        outcomes.insert(
                            rep,
                            Outcome {
                                tree: id,
                                weight: 1,
                            },
                        );
                    }
                    let mut up = Some(tree);
                    while let Some(ancestor) = up {
                        self.trees[ancestor].subtrees.push(id);
                        up = self.trees[ancestor].parent;
                    }
                }
            }
        }
    }

    /// Best score discovered from the current root, with the node that
    /// scored it. Zero and no node when nothing scoreable was found.
    pub fn score(&self) -> (Score, Option<NodeIndex>) {
        self.score_tree(self.root)
    }

    fn score_tree(&self, id: TreeId) -> (Score, Option<NodeIndex>) {
        let tree = &self.trees[id];
        if let Some(lethal) = tree.lethal {
            return (WIN_SCORE, Some(lethal));
        }
        if tree.end_turns.is_empty() && tree.chances.is_empty() {
            return (0.0, None);
        }
        let mut best: (Score, Option<NodeIndex>) = (Score::NEG_INFINITY, None);
        for index in tree
            .end_turns
            .values()
            .copied()
            .chain(tree.chances.iter().copied())
        {
            let score = self.score_node(id, index);
            if score > best.0 {
                best = (score, Some(index));
            }
        }
        best
    }

    fn score_node(&self, id: TreeId, index: NodeIndex) -> Score {
        match &self.trees[id].graph[index] {
            SearchNode::Deterministic {
                class: Terminal::Lethal,
                ..
            } => WIN_SCORE,
            SearchNode::Deterministic {
                class: Terminal::Loss,
                ..
            } => LOSS_SCORE,
            SearchNode::Deterministic {
                class: Terminal::EndTurn,
                rep,
                ..
            } => self.scorer.q(&self.start, rep, true),
            SearchNode::Deterministic { .. } => 0.0,
            // expectation over the empirically observed outcome
            // distribution, each outcome valued at its subtree's best
            SearchNode::Chance { outcomes } => {
                let total: u32 = outcomes.values().map(|o| o.weight).sum();
                match total {
                    0 => 0.0,
                    _ => {
                        outcomes
                            .values()
                            .map(|o| o.weight as Score * self.score_tree(o.tree).0)
                            .sum::<Score>()
                            / total as Score
                    }
                }
            }
        }
    }

    /// Derive the action queue from root to the best discovered leaf:
    /// the lethal node when one exists, otherwise the best-scoring
    /// end-turn or chance node. Backtracks predecessor links and stores
    /// each step's expected predecessor representation.
    fn requeue(&mut self) {
        self.queue.clear();
        self.terminal = None;
        let tree = &self.trees[self.root];
        let terminal = match (tree.lethal, tree.end_turns.len(), tree.chances.len()) {
            (Some(node), _, _) => Some(node),
            // a forced hand needs no scoring
            (None, 1, 0) => tree.end_turns.values().copied().next(),
            _ => self.score_tree(self.root).1,
        };
        let Some(terminal) = terminal else {
            return;
        };
        self.terminal = Some((self.root, terminal));
        let tree = &self.trees[self.root];
        let mut steps = Vec::new();
        let mut current = terminal;
        while let Some((parent, action)) = tree.incoming(current) {
            let expected = tree.graph[parent]
                .rep()
                .expect("deterministic predecessor")
                .clone();
            steps.push(Step {
                expected,
                action: action.clone(),
            });
            current = parent;
        }
        debug_assert!(current == tree.root);
        steps.reverse();
        self.queue = steps.into();
    }

    /// The next queued action, if the engine's reality matches the
    /// queue's expectation and the action still simulates. An exhausted
    /// queue whose terminal node matches the input yields the generic
    /// end-turn action. `None` tells the caller to keep searching.
    pub fn next_move(&mut self, state: &S) -> Option<S::Action> {
        let rep = self.encoder.encode(state, false);
        if self.queue.is_empty() {
            let (tree, node) = self.terminal?;
            return match self.trees[tree].graph[node].rep() {
                Some(terminal) if *terminal == rep => Some(state.end_turn()),
                _ => None,
            };
        }
        let follow = self
            .queue
            .front()
            .is_some_and(|step| step.expected == rep && state.simulate(&step.action).is_some());
        match follow {
            true => self.queue.pop_front().map(|step| step.action),
            false => None,
        }
    }

    /// Reuse a sampled chance outcome: when the last derived queue ended
    /// on a chance node and the engine's actual state matches one of its
    /// sampled outcomes, that outcome's subtree becomes the current
    /// root. Returns false (leaving the search untouched) otherwise.
    pub fn descend(&mut self, state: &S) -> bool {
        let Some((tree, node)) = self.terminal else {
            return false;
        };
        let Some((_, action)) = self.trees[tree].incoming(node) else {
            return false;
        };
        let flipped = action.ends_turn();
        let SearchNode::Chance { outcomes } = &self.trees[tree].graph[node] else {
            return false;
        };
        let rep = self.encoder.encode(state, flipped);
        match outcomes.get(&rep) {
            Some(outcome) => {
                self.root = outcome.tree;
                self.queue.clear();
                self.terminal = None;
                true
            }
            None => false,
        }
    }

    /// Snapshot of the current root's end-of-turn frontier, persisted
    /// with transitions for later double-Q maximization.
    pub fn summary(&self) -> SearchSummary {
        let tree = &self.trees[self.root];
        let mut candidates: Vec<GameRep> = tree.end_turns.keys().cloned().collect();
        if let Some(node) = tree.lethal {
            if let Some(rep) = tree.graph[node].rep() {
                if !candidates.contains(rep) {
                    candidates.push(rep.clone());
                }
            }
        }
        SearchSummary::new(self.start.clone(), candidates)
    }

    pub fn found_lethal(&self) -> bool {
        self.lethal().is_some()
    }
    fn lethal(&self) -> Option<NodeIndex> {
        self.trees[self.root].lethal
    }
    /// Queued actions remaining to the derived leaf.
    pub fn queued(&self) -> usize {
        self.queue.len()
    }
    /// Distinct deterministic positions discovered in the current tree.
    pub fn positions(&self) -> usize {
        self.trees[self.root].nodes.len() + self.trees[self.root].end_turns.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;
    use std::sync::atomic::Ordering;

    #[derive(Debug, Clone, PartialEq)]
    struct MockAction {
        id: u8,
        end: bool,
    }
    impl Action for MockAction {
        fn ends_turn(&self) -> bool {
            self.end
        }
    }

    struct Rule {
        from: u8,
        action: MockAction,
        outcomes: Vec<u8>,
    }

    struct World {
        rules: Vec<Rule>,
        boards: std::collections::HashMap<u8, (Feature, Feature)>,
        sims: AtomicUsize,
    }

    /// Scripted engine: states are ids, transitions come from a rule
    /// table, and stochastic rules rotate through their outcomes on
    /// successive simulations.
    #[derive(Clone)]
    struct Mock {
        id: u8,
        world: Arc<World>,
    }

    impl Mock {
        fn world(rules: Vec<Rule>, boards: &[(u8, (Feature, Feature))]) -> Self {
            Mock {
                id: 0,
                world: Arc::new(World {
                    rules,
                    boards: boards.iter().copied().collect(),
                    sims: AtomicUsize::new(0),
                }),
            }
        }
        fn at(&self, id: u8) -> Self {
            Mock {
                id,
                world: self.world.clone(),
            }
        }
        fn sims(&self) -> usize {
            self.world.sims.load(Ordering::Relaxed)
        }
    }

    impl State for Mock {
        type Action = MockAction;
        fn options(&self) -> Vec<MockAction> {
            self.world
                .rules
                .iter()
                .filter(|r| r.from == self.id)
                .map(|r| r.action.clone())
                .collect()
        }
        fn simulate(&self, action: &MockAction) -> Option<Self> {
            let rule = self
                .world
                .rules
                .iter()
                .find(|r| r.from == self.id && r.action == *action)?;
            let turn = self.world.sims.fetch_add(1, Ordering::Relaxed);
            rule.outcomes
                .get(turn % rule.outcomes.len().max(1))
                .map(|&id| self.at(id))
        }
        fn end_turn(&self) -> MockAction {
            MockAction { id: 99, end: true }
        }
        fn to_move(&self) -> Seat {
            Seat::First
        }
        fn finished(&self) -> Option<Verdict> {
            None
        }
        fn summary(&self, side: Side) -> Summary {
            let (friendly, enemy) = *self.world.boards.get(&self.id).unwrap_or(&(30, 30));
            Summary {
                health: match side {
                    Side::Friendly => friendly,
                    Side::Enemy => enemy,
                },
                // stamp the state id on both rows so distinct mock
                // states never alias one representation
                graveyard_size: self.id as Feature,
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

    fn search(root: &Mock) -> Search<Mock> {
        let encoder = Encoder::default();
        let start = encoder.encode(root, false);
        Search::new(root.clone(), encoder, Scorer::default(), start)
    }

    fn act(id: u8) -> MockAction {
        MockAction { id, end: false }
    }
    fn end(id: u8) -> MockAction {
        MockAction { id, end: true }
    }

    #[test]
    fn one_step_lethal_queues_exactly_that_action() {
        let root = Mock::world(
            vec![
                Rule {
                    from: 0,
                    action: act(1),
                    outcomes: vec![10],
                },
                Rule {
                    from: 0,
                    action: end(99),
                    outcomes: vec![20],
                },
            ],
            &[(0, (30, 30)), (10, (30, 0)), (20, (25, 24))],
        );
        let mut search = search(&root);
        search.run(Duration::from_millis(50));
        assert!(search.found_lethal());
        assert_eq!(search.queued(), 1);
        assert_eq!(search.next_move(&root), Some(act(1)));
    }

    #[test]
    fn lethal_short_circuits_sibling_probing() {
        let root = Mock::world(
            vec![
                Rule {
                    from: 0,
                    action: act(1),
                    outcomes: vec![11],
                },
                Rule {
                    from: 0,
                    action: act(2),
                    outcomes: vec![10],
                },
                Rule {
                    from: 0,
                    action: act(3),
                    outcomes: vec![12],
                },
            ],
            &[(0, (30, 30)), (10, (30, 0)), (11, (30, 29)), (12, (30, 28))],
        );
        let mut search = search(&root);
        search.run(Duration::from_millis(50));
        assert!(search.found_lethal());
        // two options probed, the third never simulated
        assert_eq!(root.sims(), 2 * PROBE_SIMULATIONS);
    }

    #[test]
    fn equal_positions_share_one_node() {
        let root = Mock::world(
            vec![
                Rule {
                    from: 0,
                    action: act(1),
                    outcomes: vec![1],
                },
                Rule {
                    from: 0,
                    action: act(2),
                    outcomes: vec![2],
                },
                Rule {
                    from: 1,
                    action: act(3),
                    outcomes: vec![3],
                },
                Rule {
                    from: 2,
                    action: act(4),
                    outcomes: vec![3],
                },
            ],
            &[(0, (30, 30)), (1, (30, 25)), (2, (30, 20)), (3, (30, 15))],
        );
        let mut search = search(&root);
        search.run(Duration::ZERO);
        // diamond: 0, 1, 2, and one shared 3
        assert_eq!(search.positions(), 4);
    }

    #[test]
    fn queue_walks_the_engine_to_the_best_leaf() {
        let root = Mock::world(
            vec![
                Rule {
                    from: 0,
                    action: act(1),
                    outcomes: vec![1],
                },
                Rule {
                    from: 1,
                    action: act(2),
                    outcomes: vec![2],
                },
                Rule {
                    from: 2,
                    action: end(99),
                    outcomes: vec![3],
                },
            ],
            // end-turn outcomes encode flipped: state 3 stores the
            // opponent's view, so the mover keeps health 28
            &[(0, (30, 30)), (1, (30, 29)), (2, (30, 28)), (3, (20, 28))],
        );
        let mut search = search(&root);
        search.run(Duration::from_millis(50));
        assert_eq!(search.queued(), 3);
        assert_eq!(search.next_move(&root), Some(act(1)));
        assert_eq!(search.next_move(&root.at(1)), Some(act(2)));
        assert_eq!(search.next_move(&root.at(2)), Some(end(99)));
        // queue exhausted, and the root no longer matches the terminal
        assert_eq!(search.next_move(&root), None);
    }

    #[test]
    fn diverged_engine_state_yields_no_move() {
        let root = Mock::world(
            vec![
                Rule {
                    from: 0,
                    action: act(1),
                    outcomes: vec![1],
                },
                Rule {
                    from: 1,
                    action: end(99),
                    outcomes: vec![3],
                },
            ],
            &[(0, (30, 30)), (1, (30, 29)), (3, (20, 29))],
        );
        let mut search = search(&root);
        search.run(Duration::from_millis(50));
        // the engine surfaced a state the queue never expected
        assert_eq!(search.next_move(&root.at(1)), None);
        assert_eq!(search.next_move(&root), Some(act(1)));
    }

    #[test]
    fn stochastic_actions_sample_outcomes_and_support_reuse() {
        let root = Mock::world(
            vec![
                Rule {
                    from: 0,
                    action: act(9),
                    outcomes: vec![4, 5],
                },
                Rule {
                    from: 0,
                    action: end(99),
                    outcomes: vec![6],
                },
                Rule {
                    from: 4,
                    action: end(99),
                    outcomes: vec![7],
                },
                Rule {
                    from: 5,
                    action: end(99),
                    outcomes: vec![8],
                },
            ],
            &[
                (0, (30, 30)),
                (4, (30, 10)),
                (5, (30, 12)),
                // ending the turn immediately reads terribly for us...
                (6, (30, 5)),
                // ...while both gamble outcomes end well
                (7, (8, 28)),
                (8, (9, 28)),
            ],
        );
        let mut search = search(&root);
        search.run(Duration::from_millis(100));
        // the chance line outscores the meek immediate end turn
        assert_eq!(search.next_move(&root), Some(act(9)));
        assert_eq!(search.next_move(&root.at(4)), None);
        // reality resolved the gamble to outcome 4: reuse its subtree
        assert!(search.descend(&root.at(4)));
        search.run(Duration::from_millis(50));
        assert_eq!(search.next_move(&root.at(4)), Some(end(99)));
        // an unsampled state is not a subtree hit
        assert!(!search.descend(&root.at(0)));
    }

    #[test]
    fn barren_roots_queue_nothing() {
        let root = Mock::world(vec![], &[(0, (30, 30))]);
        let mut search = search(&root);
        search.run(Duration::from_millis(10));
        assert_eq!(search.queued(), 0);
        assert_eq!(search.next_move(&root), None);
        let (score, node) = search.score();
        assert_eq!(score, 0.0);
        assert!(node.is_none());
    }
}
