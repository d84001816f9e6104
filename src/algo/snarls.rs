//! The integrated snarl finder: pipeline driver and the snarl/chain
//! emission state machine.
//!
//! After the adjacency merge, the 3-edge-connected merge, the cycle sweep
//! and the forest path search, each connected component is rooted at
//! whichever of its longest simple cycle or longest leaf-leaf path is
//! longer (ties go to the path), and a guided traversal of the cactus
//! emits every snarl bottom-up. Bridge paths are rewritten into synthetic
//! cycles on the fly, pinching apart any simple cycle they skip over, so
//! that by the end everything is decomposed into chains of snarls.

use fxhash::FxHashSet;
use log::debug;
use smallvec::SmallVec;

use crate::{
    algo::{
        cycles_in_cactus, longest_paths_in_forest, three_ec::three_edge_connected_component_merges,
        MergedAdjacencyGraph,
    },
    handle::*,
    ops::*,
    repr::NodeRanking,
};

/// Decomposes a bidirected sequence graph into a tree of snarls and
/// chains.
///
/// The finder never mutates the graph it reads; all working state lives in
/// per-run structures.
pub struct IntegratedSnarlFinder<'g, G> {
    graph: &'g G,
}

struct DecompFrame {
    is_snarl: bool,
    saw_children: bool,
    /// Stack index of the enclosing frame; the root frame of a component
    /// has none, and neither does it have bounds.
    parent: Option<usize>,
    bounds: Option<(Handle, Handle)>,
    todo: SmallVec<[Handle; 8]>,
}

impl DecompFrame {
    fn root() -> Self {
        DecompFrame {
            is_snarl: true,
            saw_children: false,
            parent: None,
            bounds: None,
            todo: SmallVec::new(),
        }
    }
}

impl<'g, G: SequenceGraph> IntegratedSnarlFinder<'g, G> {
    pub fn new(graph: &'g G) -> Self {
        Self { graph }
    }

    /// Runs the decomposition, invoking `iteratee` exactly once per snarl,
    /// trivial ones included, children strictly before parents. The first
    /// argument carries the bounds of the enclosing snarl, or `None` at
    /// the top level.
    pub fn for_each_snarl<F>(&self, mut iteratee: F)
    where
        F: FnMut(Option<(Handle, Handle)>, (Handle, Handle)),
    {
        let graph = self.graph;
        if graph.is_empty() {
            return;
        }

        let ranking = NodeRanking::new(graph);
        let mut cactus = MergedAdjacencyGraph::new(graph, &ranking);

        debug!("merging 3-edge-connected components");
        // The algorithm only reads the pre-merge structure, so the merges
        // can be collected and applied afterwards.
        let mut merges: Vec<(Handle, Handle)> = Vec::new();
        three_edge_connected_component_merges(
            |emit: &mut dyn FnMut(Handle)| cactus.for_each_head(|head| emit(head)),
            |node: Handle, emit: &mut dyn FnMut(Handle)| {
                cactus.for_each_member(node, |member| emit(cactus.find(member.flip())));
            },
            |a: Handle, b: Handle| merges.push((a, b)),
        );
        for (a, b) in merges {
            cactus.merge(a, b);
        }

        debug!("finding simple cycles");
        let cycles = cycles_in_cactus(&cactus);
        let mut longest_cycles = cycles.longest;
        let mut next_along_cycle = cycles.next_along_cycle;

        let mut forest = cactus.clone();
        for (&from, &to) in &next_along_cycle {
            forest.merge(from, to);
        }

        // Rooting order must agree between the forest search and the
        // emission loop, ties included, or a tree rooted at one of its
        // cycles could later be entered from another.
        longest_cycles.sort_unstable();

        debug!("finding longest bridge tree paths");
        let forest_paths = longest_paths_in_forest(&forest, &longest_cycles);
        let mut longest_paths = forest_paths.longest;
        let mut towards_deepest_leaf = forest_paths.deepest_child_edge;
        longest_paths.sort_unstable();

        let mut visited: FxHashSet<NodeId> = FxHashSet::default();
        let to_decompose = graph.node_count();
        let mut stack: Vec<DecompFrame> = Vec::new();

        while visited.len() < to_decompose {
            // Root the next uncovered component on its longest structure.
            let root_on_path = match (longest_cycles.last(), longest_paths.last()) {
                (None, None) => {
                    // Whatever is left lives in components whose every edge
                    // is a cactus self-loop; those nodes are contained
                    // trivial chains with nothing to emit.
                    for id in graph.node_ids() {
                        visited.insert(id);
                    }
                    continue;
                }
                (None, Some(_)) => true,
                (Some(_), None) => false,
                (Some(cycle), Some(path)) => cycle.0 <= path.0,
            };

            if root_on_path {
                let (_, path) = longest_paths.pop().unwrap();
                if visited.contains(&path[0].id()) {
                    continue;
                }
                debug!("rooting component at tip-tip path from {}", path[0]);
                // Point the deepest-leaf map along the path, making it the
                // backbone the traversal follows.
                for pair in path.windows(2) {
                    towards_deepest_leaf.insert(forest.find(pair[0]), pair[1]);
                }
                let mut root = DecompFrame::root();
                // Queue the path's first edge facing inward, toward the
                // new root at the start of the path.
                root.todo.push(path[0].flip());
                stack.push(root);
            } else {
                let (_, rep) = longest_cycles.pop().unwrap();
                if visited.contains(&rep.id()) {
                    continue;
                }
                debug!("rooting component at cycle through {rep}");
                // The cycle becomes a chain that starts and ends with the
                // same edge, under a boundary-less root snarl.
                stack.push(DecompFrame::root());
                stack.push(DecompFrame {
                    is_snarl: false,
                    saw_children: false,
                    parent: Some(0),
                    bounds: Some((rep, rep)),
                    todo: SmallVec::new(),
                });
            }

            while !stack.is_empty() {
                let top = stack.len() - 1;

                if let Some((start, end)) = stack[top].bounds {
                    if !stack[top].saw_children {
                        stack[top].saw_children = true;
                        let mut todo: SmallVec<[Handle; 8]> = SmallVec::new();

                        if stack[top].is_snarl {
                            visited.insert(start.id());
                            visited.insert(end.id());
                            assert_ne!(start, end, "snarl bounded by a single handle");

                            cactus.for_each_member(cactus.find(start), |inbound| {
                                if inbound == start || inbound.flip() == end {
                                    // Our own boundary; not content.
                                } else if forest.find(inbound.flip()) != forest.find(inbound) {
                                    // Bridge edge into another tree
                                    // component.
                                    todo.push(inbound);
                                } else if next_along_cycle.contains_key(&inbound) {
                                    // Incoming edge of a cycle.
                                    todo.push(inbound);
                                } else if cactus.find(inbound.flip()) == cactus.find(inbound) {
                                    // Self edge: an elided, trivial chain.
                                    visited.insert(inbound.id());
                                }
                            });
                        } else {
                            // Walk the cycle once, collecting the edge into
                            // each constituent snarl.
                            let mut seen: FxHashSet<Handle> = FxHashSet::default();
                            let mut here = start;
                            loop {
                                assert!(seen.insert(here), "chain loops over {here} twice");
                                todo.push(here);
                                here = next_along_cycle[&here];
                                if here == end {
                                    break;
                                }
                            }
                        }

                        stack[top].todo = todo;
                    }
                }

                let Some(task) = stack[top].todo.pop() else {
                    // Frame complete; snarls with bounds are reported now,
                    // after all of their children.
                    let frame = &stack[top];
                    if frame.is_snarl {
                        if let Some(bounds) = frame.bounds {
                            // The parent frame is our chain; the snarl
                            // enclosing it is that chain's parent.
                            let parent_bounds = frame
                                .parent
                                .and_then(|chain| stack[chain].parent)
                                .and_then(|grandparent| stack[grandparent].bounds);
                            iteratee(parent_bounds, bounds);
                        }
                    }
                    stack.pop();
                    continue;
                };

                if !stack[top].is_snarl {
                    // Chain member: the task edge reads into a constituent
                    // snarl, whose far bound is the next edge on the cycle.
                    let out_edge = next_along_cycle[&task];
                    stack.push(DecompFrame {
                        is_snarl: true,
                        saw_children: false,
                        parent: Some(top),
                        bounds: Some((task, out_edge)),
                        todo: SmallVec::new(),
                    });
                    continue;
                }

                if let Some(&outgoing) = next_along_cycle.get(&task) {
                    // A cycle inside this snarl becomes a child chain.
                    if outgoing == task {
                        // A one-edge cycle: both ends of the edge are
                        // already merged into this snarl, so it is a
                        // contained trivial chain, not a chain of snarls.
                        visited.insert(task.id());
                        continue;
                    }
                    if let Some((bs, be)) = stack[top].bounds {
                        assert_ne!(bs, outgoing, "chain would start at its snarl's bound");
                        assert_ne!(be, task, "chain would end at its snarl's bound");
                    }
                    stack.push(DecompFrame {
                        is_snarl: false,
                        saw_children: false,
                        parent: Some(top),
                        bounds: Some((outgoing, task)),
                        todo: SmallVec::new(),
                    });
                    continue;
                }

                // A bridge edge. Walk outward along the deepest-leaf map,
                // threading the bridge path into a synthetic cycle.
                let mut edge = task.flip();
                loop {
                    let forest_head = forest.find(edge);
                    let Some(&next) = towards_deepest_leaf.get(&forest_head) else {
                        break;
                    };

                    let here_cactus_head = cactus.find(edge);
                    let other_cactus_head = cactus.find(next.flip());
                    if here_cactus_head != other_cactus_head {
                        // The bridge path stepped over a cycle joining the
                        // two cactus components. Pinch that cycle in two so
                        // its halves become snarl alternatives, and close
                        // the components together.
                        let mut through_here: Option<Handle> = None;
                        let mut through_other: Option<Handle> = None;
                        cactus.for_each_member(here_cactus_head, |inbound| {
                            if !next_along_cycle.contains_key(&inbound) {
                                return;
                            }
                            let mut key = inbound;
                            loop {
                                if cactus.find(key) == other_cactus_head {
                                    assert!(
                                        through_here.is_none(),
                                        "multiple cycles cross one bridge step"
                                    );
                                    through_here = Some(inbound);
                                    through_other = Some(key);
                                    break;
                                }
                                key = next_along_cycle[&key];
                                if key == inbound {
                                    break;
                                }
                            }
                        });

                        let here_key =
                            through_here.expect("skipped cycle not found on any orbit");
                        let other_key = through_other.unwrap();
                        debug!("pinching cycle between {here_key} and {other_key}");
                        let here_succ = next_along_cycle[&here_key];
                        let other_succ = next_along_cycle[&other_key];
                        next_along_cycle.insert(here_key, other_succ);
                        next_along_cycle.insert(other_key, here_succ);

                        cactus.merge(here_cactus_head, other_cactus_head);
                    }

                    // Thread the bridge path into a cycle as we walk it.
                    next_along_cycle.insert(edge, next);
                    edge = next;
                }

                if edge == task.flip() {
                    // A one-edge bridge path: a contained self-loop rather
                    // than a real cycle.
                    visited.insert(edge.id());
                } else {
                    // Close the synthetic cycle: the last edge walked reads
                    // into the end component, and the cycle leaves back
                    // through the bridge edge we came in on.
                    next_along_cycle.insert(edge, task.flip());
                }

                // The far end of the bridge path joins this snarl; adopt
                // the cycles now incident to it (including the synthetic
                // one) and contain its self edges.
                let mut inherited: SmallVec<[Handle; 8]> = SmallVec::new();
                cactus.for_each_member(cactus.find(edge), |inbound| {
                    if next_along_cycle.contains_key(&inbound) {
                        inherited.push(inbound);
                    } else if cactus.find(inbound.flip()) == cactus.find(inbound) {
                        visited.insert(inbound.id());
                    }
                });
                stack[top].todo.extend(inherited);
                cactus.merge(edge, task);
            }
        }
    }
}

/// Snarl decomposition as a method on any graph exposing the required
/// capabilities.
pub trait SnarlDecomposition: SequenceGraph + Sized {
    /// Runs the integrated snarl finder over the graph. See
    /// [`IntegratedSnarlFinder::for_each_snarl`].
    fn for_each_snarl_postorder<F>(&self, iteratee: F)
    where
        F: FnMut(Option<(Handle, Handle)>, (Handle, Handle)),
    {
        IntegratedSnarlFinder::new(self).for_each_snarl(iteratee)
    }
}

impl<G: SequenceGraph + Sized> SnarlDecomposition for G {}

#[cfg(test)]
mod test {
    use super::*;
    use crate::repr::HashGraph;
    use itertools::Itertools;

    fn h(id: u64) -> Handle {
        Handle::forward_of(NodeId::new(id))
    }

    type Emitted = Vec<(Option<(Handle, Handle)>, (Handle, Handle))>;

    fn decompose(g: &HashGraph) -> Emitted {
        let mut out: Emitted = Vec::new();
        g.for_each_snarl_postorder(|parent, bounds| out.push((parent, bounds)));
        out
    }

    /// The unordered pair of node ids bounding a snarl.
    fn id_pair((a, b): (Handle, Handle)) -> (u64, u64) {
        let (x, y) = (a.id().raw(), b.id().raw());
        (x.min(y), x.max(y))
    }

    /// Every child must be emitted strictly before its parent.
    fn assert_postorder(emitted: &Emitted) {
        for (i, (parent, _)) in emitted.iter().enumerate() {
            if let Some(parent_bounds) = parent {
                let parent_pos = emitted
                    .iter()
                    .position(|(_, bounds)| bounds == parent_bounds)
                    .expect("parent bounds never emitted");
                assert!(parent_pos > i, "parent emitted before child");
            }
        }
    }

    #[test]
    fn linear_graph_gives_trivial_snarls() {
        // S1: 1 - 2 - 3 in series.
        let mut g = HashGraph::new();
        for id in 1..=3 {
            g.add_node(NodeId::new(id), "ACGT");
        }
        g.add_edge(h(1), h(2));
        g.add_edge(h(2), h(3));

        let emitted = decompose(&g);
        assert_eq!(emitted.len(), 2);
        assert!(emitted.iter().all(|(parent, _)| parent.is_none()));

        let pairs: Vec<_> = emitted.iter().map(|&(_, b)| id_pair(b)).sorted().collect();
        assert_eq!(pairs, vec![(1, 2), (2, 3)]);
    }

    #[test]
    fn bubble_gives_one_snarl() {
        // S2: 1 branches into 2 and 3, rejoining at 4. The branch nodes
        // are contained trivial chains of the bubble snarl.
        let mut g = HashGraph::new();
        for id in 1..=4 {
            g.add_node(NodeId::new(id), "ACGT");
        }
        g.add_edge(h(1), h(2));
        g.add_edge(h(1), h(3));
        g.add_edge(h(2), h(4));
        g.add_edge(h(3), h(4));

        let emitted = decompose(&g);
        assert_eq!(emitted.len(), 1);
        let (parent, bounds) = emitted[0];
        assert!(parent.is_none());
        assert_eq!(id_pair(bounds), (1, 4));
    }

    #[test]
    fn cycle_gives_one_chain_of_trivial_snarls() {
        // S3: 1 -> 2 -> 3 -> 1: one chain with three constituent snarls
        // and no enclosing snarl.
        let mut g = HashGraph::new();
        for id in 1..=3 {
            g.add_node(NodeId::new(id), "ACGT");
        }
        g.add_edge(h(1), h(2));
        g.add_edge(h(2), h(3));
        g.add_edge(h(3), h(1));

        let emitted = decompose(&g);
        assert_eq!(emitted.len(), 3);
        assert!(emitted.iter().all(|(parent, _)| parent.is_none()));

        // The three snarls tile the cycle: each node appears in exactly
        // two boundary pairs.
        let pairs: Vec<_> = emitted.iter().map(|&(_, b)| id_pair(b)).sorted().collect();
        assert_eq!(pairs, vec![(1, 2), (1, 3), (2, 3)]);
    }

    #[test]
    fn nested_bubble_is_emitted_before_outer() {
        // S4: an outer bubble between 1 and 4 whose one branch is itself a
        // chain 2a -> 2b; long anchors make the tip-tip path win.
        let mut g = HashGraph::new();
        g.add_node(NodeId::new(1), "ACGTACGTAC");
        g.add_node(NodeId::new(2), "ACGT"); // 2a
        g.add_node(NodeId::new(5), "ACGT"); // 2b
        g.add_node(NodeId::new(3), "ACGT");
        g.add_node(NodeId::new(4), "ACGTACGTAC");
        g.add_edge(h(1), h(2));
        g.add_edge(h(2), h(5));
        g.add_edge(h(5), h(4));
        g.add_edge(h(1), h(3));
        g.add_edge(h(3), h(4));

        let emitted = decompose(&g);
        assert_postorder(&emitted);
        assert_eq!(emitted.len(), 2);

        let (inner_parent, inner_bounds) = emitted[0];
        let (outer_parent, outer_bounds) = emitted[1];
        assert_eq!(id_pair(inner_bounds), (2, 5));
        assert_eq!(id_pair(outer_bounds), (1, 4));
        assert!(outer_parent.is_none());
        assert_eq!(inner_parent, Some(outer_bounds));
    }

    #[test]
    fn edgeless_graph_emits_nothing() {
        // Property 6: isolated nodes are contained, not snarls.
        let mut g = HashGraph::new();
        for id in 1..=3 {
            g.add_node(NodeId::new(id), "ACGT");
        }

        let emitted = decompose(&g);
        assert!(emitted.is_empty());
    }

    #[test]
    fn self_loop_only_node_emits_nothing() {
        let mut g = HashGraph::new();
        g.add_node(NodeId::new(1), "ACGT");
        g.add_edge(h(1), h(1).flip());

        let emitted = decompose(&g);
        assert!(emitted.is_empty());
    }

    #[test]
    fn two_cycles_sharing_an_adjacency_nest() {
        // Property 8: two simple cycles joined at a single adjacency
        // component; one becomes the top-level chain, the other a child
        // chain inside one of its snarls.
        let mut g = HashGraph::new();
        for id in 1..=6 {
            g.add_node(NodeId::new(id), "ACGT");
        }
        g.add_edge(h(1), h(2));
        g.add_edge(h(2), h(3));
        g.add_edge(h(3), h(1));
        g.add_edge(h(4), h(5));
        g.add_edge(h(5), h(6));
        g.add_edge(h(6), h(4));
        // Joining edge: the end of 1 meets the start of 4 in one
        // adjacency component.
        g.add_edge(h(1), h(4));

        let emitted = decompose(&g);
        assert_postorder(&emitted);
        // The rooting cycle becomes a full chain of three snarls; the
        // other cycle hangs off the shared component as a chain of two
        // (its wrap-around runs through the enclosing snarl itself).
        assert_eq!(emitted.len(), 5);

        let top = emitted
            .iter()
            .filter(|(parent, _)| parent.is_none())
            .count();
        let nested: Vec<_> = emitted
            .iter()
            .filter_map(|&(parent, _)| parent)
            .unique()
            .collect();
        assert_eq!(top, 3);
        // All nested snarls sit inside the same enclosing snarl.
        assert_eq!(nested.len(), 1);
    }

    #[test]
    fn decomposition_is_deterministic() {
        let build = || {
            let mut g = HashGraph::new();
            for id in 1..=6 {
                g.add_node(NodeId::new(id), "ACGT");
            }
            g.add_edge(h(1), h(2));
            g.add_edge(h(1), h(3));
            g.add_edge(h(2), h(4));
            g.add_edge(h(3), h(4));
            g.add_edge(h(4), h(5));
            g.add_edge(h(5), h(6));
            g
        };

        let first = decompose(&build());
        let second = decompose(&build());
        assert_eq!(first, second);
    }

    #[test]
    fn bridged_cycle_contains_dangling_tail() {
        // A cycle with a tail: 1 -> 2 -> 3 -> 1 plus 3 -> 4. The cycle
        // outweighs the tail, so the tail node is contained by one of the
        // cycle's snarls.
        let mut g = HashGraph::new();
        for id in 1..=3 {
            g.add_node(NodeId::new(id), "ACGTACGT");
        }
        g.add_node(NodeId::new(4), "AC");
        g.add_edge(h(1), h(2));
        g.add_edge(h(2), h(3));
        g.add_edge(h(3), h(1));
        g.add_edge(h(3), h(4));

        let emitted = decompose(&g);
        assert_postorder(&emitted);
        // Just the cycle's chain: three snarls, no snarl for the tail.
        assert_eq!(emitted.len(), 3);
        assert!(emitted
            .iter()
            .all(|&(_, b)| b.0.id().raw() != 4 && b.1.id().raw() != 4));
    }
}
