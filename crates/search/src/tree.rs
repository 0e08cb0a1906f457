use super::*;
use petgraph::graph::DiGraph;
use petgraph::graph::NodeIndex;
use std::collections::HashMap;
use tempo_core::*;
use tempo_encoding::*;
use tempo_engine::*;

/// One search tree: the deterministic reachable set from a single root
/// position, plus the chance nodes found at its frontier.
///
/// Nodes live in a petgraph arena and refer to one another by index;
/// the parent/child relation is the edge set, with each edge carrying
/// the engine action that crosses it. Deterministic positions are
/// deduplicated per tree through representation-keyed maps, so two
/// action orders reaching the same position share one node.
#[derive(Debug)]
pub struct Tree<S: State> {
    pub(crate) graph: DiGraph<SearchNode<S>, S::Action>,
    pub(crate) root: NodeIndex,
    /// Dedup map over non-end-turn deterministic nodes.
    pub(crate) nodes: HashMap<GameRep, NodeIndex>,
    /// Dedup map over end-turn leaf candidates.
    pub(crate) end_turns: HashMap<GameRep, NodeIndex>,
    pub(crate) chances: Vec<NodeIndex>,
    /// Nodes discovered but not yet expanded.
    pub(crate) worklist: Vec<NodeIndex>,
    /// First winning node found, if any.
    pub(crate) lethal: Option<NodeIndex>,
    /// Owning tree in the forest, for outcome percolation.
    pub(crate) parent: Option<TreeId>,
    /// Every descendant outcome tree, percolated up from all depths.
    pub(crate) subtrees: Vec<TreeId>,
    /// Whether the root was encoded perspective-flipped (it resulted
    /// from a turn-ending action).
    pub(crate) flipped: bool,
}

impl<S: State> Tree<S> {
    /// Root a tree at a position. `flipped` marks roots reached by a
    /// turn-ending action. Roots that are already terminal seed nothing.
    pub fn new(state: S, encoder: &Encoder, flipped: bool) -> Self {
        let rep = encoder.encode(&state, flipped);
        let class = Terminal::of(&rep, flipped);
        let mut graph = DiGraph::default();
        let root = graph.add_node(SearchNode::deterministic(state, rep.clone(), class));
        let mut tree = Self {
            graph,
            root,
            nodes: HashMap::from([(rep.clone(), root)]),
            end_turns: HashMap::new(),
            chances: Vec::new(),
            worklist: Vec::new(),
            lethal: None,
            parent: None,
            subtrees: Vec::new(),
            flipped,
        };
        match class {
            Terminal::Ongoing => tree.worklist.push(root),
            Terminal::EndTurn => {
                tree.end_turns.insert(rep, root);
            }
            Terminal::Lethal => tree.lethal = Some(root),
            Terminal::Loss => {}
        }
        tree
    }

    /// Discover the children of a node: probe every legal action
    /// [`PROBE_SIMULATIONS`] times, classify it deterministic or
    /// stochastic by representation agreement, and materialize the
    /// corresponding node unless the position is already known to this
    /// tree. Actions that fail to simulate are skipped.
    ///
    /// Returns the first Lethal child discovered; expansion stops on it
    /// immediately, leaving later siblings unprobed. A found winning
    /// line must not be second-guessed by further exploration.
    pub(crate) fn sprout(&mut self, at: NodeIndex, encoder: &Encoder) -> Option<NodeIndex> {
        let Some(state) = self.graph[at].state().cloned() else {
            return None;
        };
        for action in state.options() {
            let ends = action.ends_turn();
            let mut probe: Option<(S, GameRep)> = None;
            let mut stochastic = false;
            let mut broken = false;
            for _ in 0..PROBE_SIMULATIONS {
                match state.simulate(&action) {
                    None => {
                        broken = true;
                        break;
                    }
                    Some(next) => {
                        let rep = encoder.encode(&next, ends);
                        match probe.as_ref() {
                            None => probe = Some((next, rep)),
                            Some((_, first)) if *first != rep => {
                                stochastic = true;
                                break;
                            }
                            Some(_) => {}
                        }
                    }
                }
            }
            if broken {
                log::debug!("skipping unsimulatable action {:?}", action);
                continue;
            }
            if stochastic {
                let chance = self.graph.add_node(SearchNode::chance());
                self.graph.add_edge(at, chance, action);
                self.chances.push(chance);
                continue;
            }
            let Some((next, rep)) = probe else {
                continue;
            };
            let class = Terminal::of(&rep, ends);
            let known = match class {
                Terminal::EndTurn => self.end_turns.contains_key(&rep),
                _ => self.nodes.contains_key(&rep),
            };
            if known {
                continue;
            }
            let child = self
                .graph
                .add_node(SearchNode::deterministic(next, rep.clone(), class));
            self.graph.add_edge(at, child, action);
            match class {
                Terminal::EndTurn => {
                    self.end_turns.insert(rep, child);
                }
                _ => {
                    self.nodes.insert(rep, child);
                }
            }
            if class == Terminal::Lethal {
                return Some(child);
            }
            if class.expandable() {
                self.worklist.push(child);
            }
        }
        None
    }

    /// The action taken to reach a node from its predecessor.
    pub(crate) fn incoming(&self, at: NodeIndex) -> Option<(NodeIndex, &S::Action)> {
        use petgraph::visit::EdgeRef;
        self.graph
            .edges_directed(at, petgraph::Direction::Incoming)
            .next()
            .map(|edge| (edge.source(), edge.weight()))
    }

    /// Consistency diagnostics: map keys must be their nodes' reps, each
    /// rep must equal a fresh encoding of its node's state, the lethal
    /// cache must point at a Lethal node, and outcome weights must count
    /// at least one observation. Logs every violation it finds.
    pub(crate) fn check(&self, encoder: &Encoder) -> bool {
        let mut ok = true;
        for (key, &index) in self.nodes.iter().chain(self.end_turns.iter()) {
            match &self.graph[index] {
                SearchNode::Deterministic { state, rep, .. } => {
                    if rep != key {
                        log::error!("node rep is not its dedup key");
                        ok = false;
                    }
                    let flipped = match self.incoming(index) {
                        Some((_, action)) => action.ends_turn(),
                        None => self.flipped,
                    };
                    if encoder.encode(state, flipped) != *rep {
                        log::error!("node rep diverged from a fresh encoding of its state");
                        ok = false;
                    }
                }
                SearchNode::Chance { .. } => {
                    log::error!("chance node registered in a deterministic map");
                    ok = false;
                }
            }
        }
        if let Some(lethal) = self.lethal {
            if self.graph[lethal].class() != Some(Terminal::Lethal) {
                log::error!("cached lethal node is not lethal");
                ok = false;
            }
        }
        for &chance in self.chances.iter() {
            if let SearchNode::Chance { outcomes } = &self.graph[chance] {
                if outcomes.values().any(|o| o.weight < 1) {
                    log::error!("chance outcome with zero visit weight");
                    ok = false;
                }
            }
        }
        ok
    }
}
