//! Simple-cycle sweep over a cactus graph.
//!
//! A DFS over the merged adjacency graph that finds every simple cycle,
//! records the successor relation `next_along_cycle` around each one, and
//! reports the longest cycle per connected component. Because the graph is
//! a cactus after the 3-edge-connected merges, no two simple cycles share
//! an edge, so each back edge closes a unique cycle and every stack walk
//! covers fresh edges; total work stays linear.

use fxhash::FxHashMap;
use log::debug;
use smallvec::SmallVec;

use crate::{algo::MergedAdjacencyGraph, handle::*, ops::*};

/// The outcome of the cycle sweep.
pub(crate) struct SimpleCycles {
    /// Per connected component with at least one nonempty cycle: the total
    /// base length of its longest simple cycle and an edge on that cycle.
    pub longest: Vec<(usize, Handle)>,
    /// For every edge on any simple cycle (viewed inward to its component),
    /// the edge that follows it around the cycle.
    pub next_along_cycle: FxHashMap<Handle, Handle>,
}

struct SweepFrame {
    /// The edge followed to reach this frame's component (for the root of a
    /// component search, the component's head itself).
    here: Handle,
    todo: SmallVec<[Handle; 4]>,
    expanded: bool,
}

/// Finds all simple cycles of the cactus. See [`SimpleCycles`].
pub(crate) fn cycles_in_cactus<G, R>(cactus: &MergedAdjacencyGraph<'_, G, R>) -> SimpleCycles
where
    G: SequenceGraph,
    R: NodeRanks,
{
    let mut longest: Vec<(usize, Handle)> = Vec::new();
    let mut next_along_cycle: FxHashMap<Handle, Handle> = FxHashMap::default();

    // Stack depth doubles as the visit marker: anything visited and
    // reachable again must still be on the stack, or it would have reached
    // us first.
    let mut visited_frame: FxHashMap<Handle, usize> = FxHashMap::default();
    let mut stack: Vec<SweepFrame> = Vec::new();

    cactus.for_each_head(|component_root| {
        if visited_frame.contains_key(&component_root) {
            return;
        }
        debug!("root simple cycle search at {component_root}");

        stack.push(SweepFrame {
            here: component_root,
            todo: SmallVec::new(),
            expanded: false,
        });

        // Longest cycle seen in this connected component so far.
        let mut best: Option<(usize, Handle)> = None;

        while !stack.is_empty() {
            let depth = stack.len() - 1;
            let frame_here = stack[depth].here;
            let frame_head = cactus.find(frame_here);

            if !stack[depth].expanded {
                stack[depth].expanded = true;
                visited_frame.insert(frame_head, depth);

                // Queue each member flipped, so entries read inward to the
                // component they lead to; skip the edge we arrived on
                // unless this is the root of the component search.
                let is_root = depth == 0;
                let mut todo: SmallVec<[Handle; 4]> = SmallVec::new();
                cactus.for_each_member(frame_head, |member| {
                    if member != frame_here || is_root {
                        todo.push(member.flip());
                    }
                });
                stack[depth].todo = todo;
            }

            let Some(edge_into) = stack[depth].todo.pop() else {
                stack.pop();
                continue;
            };
            let connected_head = cactus.find(edge_into);

            match visited_frame.get(&connected_head) {
                None => {
                    stack.push(SweepFrame {
                        here: edge_into,
                        todo: SmallVec::new(),
                        expanded: false,
                    });
                }
                Some(&connected_depth) if depth > connected_depth => {
                    // A back edge up the stack: it closes a unique simple
                    // cycle. Walk the stack from just above the frame it
                    // reaches, measuring and linking as we go. The arrival
                    // frame itself is not on the cycle.
                    let mut cycle_len = cactus.len_of(edge_into);
                    let mut prev_edge = edge_into;
                    for frame in &stack[connected_depth + 1..] {
                        cycle_len += cactus.len_of(frame.here);
                        next_along_cycle.insert(prev_edge, frame.here);
                        prev_edge = frame.here;
                    }
                    next_along_cycle.insert(prev_edge, edge_into);

                    if cycle_len > best.map_or(0, |(len, _)| len) {
                        best = Some((cycle_len, edge_into));
                    }
                }
                // Edges to the same depth (self-loops on a component) or
                // down the stack were already handled from the other side.
                Some(_) => {}
            }
        }

        if let Some(record) = best {
            debug!("longest cycle in component: {} bp", record.0);
            longest.push(record);
        }
    });

    SimpleCycles {
        longest,
        next_along_cycle,
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::repr::{HashGraph, NodeRanking};
    use itertools::Itertools;

    fn h(id: u64) -> Handle {
        Handle::forward_of(NodeId::new(id))
    }

    fn sweep(g: &HashGraph) -> (Vec<(usize, Handle)>, FxHashMap<Handle, Handle>) {
        let ranking = NodeRanking::new(g);
        let cactus = MergedAdjacencyGraph::new(g, &ranking);
        let cycles = cycles_in_cactus(&cactus);
        (cycles.longest, cycles.next_along_cycle)
    }

    /// Follows the successor relation from `start` until it returns,
    /// yielding the node ids on the orbit.
    fn orbit(next: &FxHashMap<Handle, Handle>, start: Handle) -> Vec<NodeId> {
        let mut out = vec![start.id()];
        let mut cur = next[&start];
        while cur != start {
            out.push(cur.id());
            cur = next[&cur];
        }
        out
    }

    #[test]
    fn no_cycles_in_linear_graph() {
        let mut g = HashGraph::new();
        for id in 1..=3 {
            g.add_node(NodeId::new(id), "ACGT");
        }
        g.add_edge(h(1), h(2));
        g.add_edge(h(2), h(3));

        let (longest, next) = sweep(&g);
        assert!(longest.is_empty());
        assert!(next.is_empty());
    }

    #[test]
    fn single_cycle_is_found_once() {
        // 1 -> 2 -> 3 -> 1
        let mut g = HashGraph::new();
        for id in 1..=3 {
            g.add_node(NodeId::new(id), "ACGT");
        }
        g.add_edge(h(1), h(2));
        g.add_edge(h(2), h(3));
        g.add_edge(h(3), h(1));

        let (longest, next) = sweep(&g);
        assert_eq!(longest.len(), 1);
        assert_eq!(longest[0].0, 12);
        assert_eq!(next.len(), 3);

        let ids = orbit(&next, longest[0].1);
        assert_eq!(
            ids.iter().copied().sorted().collect_vec(),
            vec![NodeId::new(1), NodeId::new(2), NodeId::new(3)]
        );
    }

    #[test]
    fn bubble_has_one_two_edge_cycle() {
        // 1 branches into 2 and 3, rejoining at 4: in the cactus the two
        // branch nodes form one simple cycle of two edges.
        let mut g = HashGraph::new();
        g.add_node(NodeId::new(1), "ACGT");
        g.add_node(NodeId::new(2), "AC");
        g.add_node(NodeId::new(3), "ACG");
        g.add_node(NodeId::new(4), "ACGT");
        g.add_edge(h(1), h(2));
        g.add_edge(h(1), h(3));
        g.add_edge(h(2), h(4));
        g.add_edge(h(3), h(4));

        let (longest, next) = sweep(&g);
        assert_eq!(longest.len(), 1);
        assert_eq!(longest[0].0, 5);
        assert_eq!(next.len(), 2);

        let ids = orbit(&next, longest[0].1);
        assert_eq!(
            ids.iter().copied().sorted().collect_vec(),
            vec![NodeId::new(2), NodeId::new(3)]
        );
    }

    #[test]
    fn self_loop_is_not_a_cycle() {
        let mut g = HashGraph::new();
        g.add_node(NodeId::new(1), "ACGT");
        g.add_edge(h(1), h(1));

        let (longest, next) = sweep(&g);
        assert!(longest.is_empty());
        assert!(next.is_empty());
    }

    #[test]
    fn two_components_get_separate_records() {
        // A 3-cycle over nodes 1..3 and a 2-cycle (parallel edges) over 4,5.
        let mut g = HashGraph::new();
        for id in 1..=5 {
            g.add_node(NodeId::new(id), "ACGT");
        }
        g.add_edge(h(1), h(2));
        g.add_edge(h(2), h(3));
        g.add_edge(h(3), h(1));
        g.add_edge(h(4), h(5));
        g.add_edge(h(4).flip(), h(5).flip());

        let (longest, next) = sweep(&g);
        assert_eq!(longest.len(), 2);
        assert_eq!(next.len(), 5);
        let lens = longest.iter().map(|&(len, _)| len).sorted().collect_vec();
        assert_eq!(lens, vec![8, 12]);
    }
}
