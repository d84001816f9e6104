//! Longest leaf-leaf paths in the bridge forest.
//!
//! For every tree of the forest, finds the longest path between two leaves
//! (in total base length) and the edge list realizing it, and fills in the
//! deepest-child map used by the emission pass to walk into bridge trees
//! without revisiting DFS state.
//!
//! Roots are tried first at the components the longest simple cycles were
//! merged into, so that when a cycle out-lengths every leaf-leaf path in
//! its tree, the deepest-child relationships already hang off that cycle.
//! When a leaf-leaf path wins instead, the deepest-child map is rewritten
//! along the stretch from the DFS root to the path's convergence point so
//! everything dangles off the path.

use fxhash::FxHashMap;
use log::debug;
use smallvec::SmallVec;

use crate::{algo::MergedAdjacencyGraph, handle::*, ops::*};

/// The outcome of the forest sweep.
pub(crate) struct ForestPaths {
    /// Per tree whose longest leaf-leaf path is at least as long as the
    /// simple cycle it was rooted from (if any): total base length and the
    /// ordered edges of that path. Trees with no edges produce no record.
    pub longest: Vec<(usize, Vec<Handle>)>,
    /// For each component head, the first edge on a longest path downward
    /// to a leaf in its subtree.
    pub deepest_child_edge: FxHashMap<Handle, Handle>,
}

#[derive(Clone, Copy)]
struct PathRecord {
    /// Edge to traverse to get back to the parent's component.
    parent_edge: Handle,
    /// Length of the deepest path to a leaf from here, including the edge
    /// followed to here from the parent. Filled in on completion.
    leaf_path_length: usize,
    /// Edge to the second-deepest child, forming the longest leaf-leaf
    /// path converging here together with the deepest child.
    second_deepest_child_edge: Option<Handle>,
    /// Head at which the longest leaf-leaf path in this subtree converges.
    /// Pointing at ourselves with no second-deepest child means there is no
    /// such path yet.
    longest_subtree_path_root: Handle,
    longest_subtree_path_length: usize,
}

struct PathFrame {
    here: Handle,
    todo: SmallVec<[Handle; 4]>,
    expanded: bool,
}

struct ForestSearch<'a, 'g, G, R> {
    forest: &'a MergedAdjacencyGraph<'g, G, R>,
    records: FxHashMap<Handle, PathRecord>,
    deepest_child_edge: FxHashMap<Handle, Handle>,
    longest: Vec<(usize, Vec<Handle>)>,
}

impl<G, R> ForestSearch<'_, '_, G, R>
where
    G: SequenceGraph,
    R: NodeRanks,
{
    /// Folds a completed child (reached over `child_edge`, with the given
    /// leaf path length) into the parent's deepest / second-deepest slots.
    fn bubble_into_parent(&mut self, parent_head: Handle, child_edge: Handle, child_len: usize) {
        let Some(&incumbent) = self.deepest_child_edge.get(&parent_head) else {
            self.deepest_child_edge.insert(parent_head, child_edge);
            return;
        };

        let incumbent_len = self.records[&self.forest.find(incumbent)].leaf_path_length;
        let parent_second = self.records[&parent_head].second_deepest_child_edge;

        if incumbent_len < child_len {
            // Demote the incumbent to second-best.
            self.deepest_child_edge.insert(parent_head, child_edge);
            self.records
                .get_mut(&parent_head)
                .unwrap()
                .second_deepest_child_edge = Some(incumbent);
        } else {
            let beats_second = match parent_second {
                None => true,
                Some(second) => {
                    self.records[&self.forest.find(second)].leaf_path_length < child_len
                }
            };
            if beats_second {
                self.records
                    .get_mut(&parent_head)
                    .unwrap()
                    .second_deepest_child_edge = Some(child_edge);
            }
        }
    }

    /// Follows the deepest-child map from the component `start` reads into,
    /// appending the chain of edges to `path`.
    fn trace_deepest(&self, start: Handle, path: &mut Vec<Handle>) {
        path.push(start);
        let mut head = self.forest.find(start);
        while let Some(&next) = self.deepest_child_edge.get(&head) {
            path.push(next);
            head = self.forest.find(next);
        }
    }

    fn try_root(&mut self, traversal_root: Handle, root_cycle_length: usize) {
        if self.records.contains_key(&traversal_root) {
            return;
        }
        debug!("root bridge tree traversal at {traversal_root}");

        let mut stack: Vec<PathFrame> = vec![PathFrame {
            here: traversal_root,
            todo: SmallVec::new(),
            expanded: false,
        }];

        while !stack.is_empty() {
            let depth = stack.len() - 1;
            let frame_here = stack[depth].here;
            let frame_head = self.forest.find(frame_here);

            if !stack[depth].expanded {
                stack[depth].expanded = true;
                self.records.insert(
                    frame_head,
                    PathRecord {
                        parent_edge: frame_here.flip(),
                        leaf_path_length: 0,
                        second_deepest_child_edge: None,
                        longest_subtree_path_root: frame_head,
                        longest_subtree_path_length: 0,
                    },
                );

                let mut todo: SmallVec<[Handle; 4]> = SmallVec::new();
                self.forest.for_each_member(frame_head, |member| {
                    let flipped = member.flip();
                    // Self-loops on a tree component are not tree edges.
                    if self.forest.find(flipped) != frame_head {
                        todo.push(flipped);
                    }
                });
                stack[depth].todo = todo;
            }

            if let Some(edge_into) = stack[depth].todo.pop() {
                if !self.records.contains_key(&self.forest.find(edge_into)) {
                    stack.push(PathFrame {
                        here: edge_into,
                        todo: SmallVec::new(),
                        expanded: false,
                    });
                }
                continue;
            }

            // All children done; fold this frame into the search state.
            if depth > 0 {
                let mut leaf_len = self.forest.len_of(frame_here);
                if let Some(&dce) = self.deepest_child_edge.get(&frame_head) {
                    leaf_len += self.records[&self.forest.find(dce)].leaf_path_length;
                }
                self.records.get_mut(&frame_head).unwrap().leaf_path_length = leaf_len;

                let parent_head = self.forest.find(stack[depth - 1].here);
                self.bubble_into_parent(parent_head, frame_here, leaf_len);
            }

            let record = self.records[&frame_head];
            if let Some(second) = record.second_deepest_child_edge {
                // Two leaf paths converge here.
                let deepest = self.deepest_child_edge[&frame_head];
                let here_len = self.records[&self.forest.find(deepest)].leaf_path_length
                    + self.records[&self.forest.find(second)].leaf_path_length;
                if record.longest_subtree_path_root == frame_head
                    || here_len > record.longest_subtree_path_length
                {
                    let rec = self.records.get_mut(&frame_head).unwrap();
                    rec.longest_subtree_path_root = frame_head;
                    rec.longest_subtree_path_length = here_len;
                }
            }

            let record = self.records[&frame_head];
            if depth > 0 && record.longest_subtree_path_length > 0 {
                // Offer the best convergence point at or under us to the
                // parent.
                let parent_head = self.forest.find(stack[depth - 1].here);
                let parent = self.records[&parent_head];
                if parent.longest_subtree_path_root == parent_head
                    || parent.longest_subtree_path_length < record.longest_subtree_path_length
                {
                    let prec = self.records.get_mut(&parent_head).unwrap();
                    prec.longest_subtree_path_root = record.longest_subtree_path_root;
                    prec.longest_subtree_path_length = record.longest_subtree_path_length;
                }
            }

            if depth == 0 {
                self.finish_root(frame_head, root_cycle_length);
            }

            stack.pop();
        }
    }

    /// Handles completion of a traversal root: decides whether the longest
    /// leaf-leaf path beats the rooting cycle, and if so materializes it
    /// and re-roots the deepest-child map along it.
    fn finish_root(&mut self, root_head: Handle, root_cycle_length: usize) {
        let record = self.records[&root_head];

        // A root with a single child is itself a leaf, so the path down to
        // its deepest leaf is a leaf-leaf path ending here.
        if record.second_deepest_child_edge.is_none() {
            if let Some(&deepest) = self.deepest_child_edge.get(&root_head) {
                let candidate = self.records[&self.forest.find(deepest)].leaf_path_length;
                if record.longest_subtree_path_root == root_head
                    || candidate > record.longest_subtree_path_length
                {
                    let rec = self.records.get_mut(&root_head).unwrap();
                    rec.longest_subtree_path_root = root_head;
                    rec.longest_subtree_path_length = candidate;
                }
            }
        }

        let record = self.records[&root_head];
        if record.longest_subtree_path_length == 0
            || record.longest_subtree_path_length < root_cycle_length
        {
            // No leaf-leaf path, or the rooting cycle wins; keep the
            // cycle-seeded orientation.
            return;
        }

        let path_root = record.longest_subtree_path_root;
        debug!(
            "tree path of {} bp converges at {path_root}",
            record.longest_subtree_path_length
        );

        // Materialize the path: walk down the second-deepest side, turn
        // that into the leading half (reversed, edges flipped), then walk
        // down the deepest side.
        let mut path: Vec<Handle> = Vec::new();
        if let Some(second) = self.records[&path_root].second_deepest_child_edge {
            self.trace_deepest(second, &mut path);
            path.reverse();
            for edge in &mut path {
                *edge = edge.flip();
            }
        }
        if let Some(&deepest) = self.deepest_child_edge.get(&path_root) {
            self.trace_deepest(deepest, &mut path);
        }
        self.longest
            .push((record.longest_subtree_path_length, path));

        // Re-root the deepest-child map along the stretch from the old DFS
        // root down to the convergence point, so the relationships point
        // outward from the path.
        let mut convergence_to_old_root: Vec<Handle> = Vec::new();
        let mut cursor = path_root;
        while cursor != root_head {
            let parent_edge = self.records[&cursor].parent_edge;
            convergence_to_old_root.push(parent_edge);
            cursor = self.forest.find(parent_edge);
        }

        while let Some(parent_child_edge) = convergence_to_old_root.pop() {
            // The former parent becomes the child of the node below it.
            let child_head = self.forest.find(parent_child_edge);
            let parent_head = self.forest.find(parent_child_edge.flip());

            // The child's deepest child cannot be its new parent.
            let mut child_deepest = self.deepest_child_edge.get(&child_head).copied();
            if let Some(d) = child_deepest {
                if self.forest.find(d) == parent_head {
                    let second = self.records[&child_head].second_deepest_child_edge;
                    if let Some(s) = second {
                        self.deepest_child_edge.insert(child_head, s);
                        self.records
                            .get_mut(&child_head)
                            .unwrap()
                            .second_deepest_child_edge = None;
                        child_deepest = Some(s);
                    } else {
                        self.deepest_child_edge.remove(&child_head);
                        child_deepest = None;
                    }
                }
            }

            let mut leaf_len = self.forest.len_of(parent_child_edge);
            if let Some(d) = child_deepest {
                leaf_len += self.records[&self.forest.find(d)].leaf_path_length;
            }
            self.records.get_mut(&child_head).unwrap().leaf_path_length = leaf_len;

            self.bubble_into_parent(parent_head, parent_child_edge, leaf_len);
        }
    }
}

/// Finds the longest leaf-leaf path of every tree in the bridge forest and
/// the deepest-child map. See [`ForestPaths`].
///
/// `longest_simple_cycles` must be sorted ascending by `(length, edge)`;
/// roots are tried longest-first.
pub(crate) fn longest_paths_in_forest<G, R>(
    forest: &MergedAdjacencyGraph<'_, G, R>,
    longest_simple_cycles: &[(usize, Handle)],
) -> ForestPaths
where
    G: SequenceGraph,
    R: NodeRanks,
{
    let mut search = ForestSearch {
        forest,
        records: FxHashMap::default(),
        deepest_child_edge: FxHashMap::default(),
        longest: Vec::new(),
    };

    // Try cycle roots longest-first, so every tree is rooted at the same
    // cycle the emission pass will pick for it. If the tree ends up rooted
    // by that cycle, the deepest-child map already points the right way.
    for &(cycle_len, rep) in longest_simple_cycles.iter().rev() {
        search.try_root(forest.find(rep), cycle_len);
    }
    forest.for_each_head(|head| search.try_root(head, 0));

    ForestPaths {
        longest: search.longest,
        deepest_child_edge: search.deepest_child_edge,
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::algo::cycles_in_cactus;
    use crate::repr::{HashGraph, NodeRanking};
    use itertools::Itertools;

    fn h(id: u64) -> Handle {
        Handle::forward_of(NodeId::new(id))
    }

    /// Runs the full pre-emission pipeline far enough to get forest paths.
    fn forest_paths(g: &HashGraph) -> ForestPaths {
        let ranking = NodeRanking::new(g);
        let cactus = MergedAdjacencyGraph::new(g, &ranking);
        let cycles = cycles_in_cactus(&cactus);
        let mut forest = cactus.clone();
        for (&from, &to) in &cycles.next_along_cycle {
            forest.merge(from, to);
        }
        longest_paths_in_forest(&forest, &cycles.longest)
    }

    /// Asserts that consecutive path edges depart the component the
    /// previous edge arrived in.
    fn assert_path_consistent(g: &HashGraph, path: &[Handle]) {
        let ranking = NodeRanking::new(g);
        let cactus = MergedAdjacencyGraph::new(g, &ranking);
        let cycles = cycles_in_cactus(&cactus);
        let mut forest = cactus.clone();
        for (&from, &to) in &cycles.next_along_cycle {
            forest.merge(from, to);
        }
        for pair in path.windows(2) {
            assert_eq!(forest.find(pair[0]), forest.find(pair[1].flip()));
        }
    }

    #[test]
    fn linear_graph_longest_path_spans_everything() {
        let mut g = HashGraph::new();
        for id in 1..=3 {
            g.add_node(NodeId::new(id), "ACGT");
        }
        g.add_edge(h(1), h(2));
        g.add_edge(h(2), h(3));

        let paths = forest_paths(&g);
        assert_eq!(paths.longest.len(), 1);
        let (len, path) = &paths.longest[0];
        assert_eq!(*len, 12);
        assert_eq!(path.len(), 3);
        assert_eq!(
            path.iter().map(|e| e.id()).sorted().collect_vec(),
            vec![NodeId::new(1), NodeId::new(2), NodeId::new(3)]
        );
        assert_path_consistent(&g, path);
    }

    #[test]
    fn isolated_node_is_a_one_edge_tree() {
        let mut g = HashGraph::new();
        g.add_node(NodeId::new(1), "ACGT");

        let paths = forest_paths(&g);
        assert_eq!(paths.longest.len(), 1);
        let (len, path) = &paths.longest[0];
        assert_eq!(*len, 4);
        assert_eq!(path.len(), 1);
        assert_eq!(path[0].id(), NodeId::new(1));
    }

    #[test]
    fn branching_tree_picks_the_longest_pair() {
        // 1 - 2 - 3 with 4 hanging off node 2's end; node 4 is short, so
        // the longest leaf-leaf path runs 1..3.
        let mut g = HashGraph::new();
        g.add_node(NodeId::new(1), "ACGT");
        g.add_node(NodeId::new(2), "ACGT");
        g.add_node(NodeId::new(3), "ACGT");
        g.add_node(NodeId::new(4), "AC");
        g.add_edge(h(1), h(2));
        g.add_edge(h(2), h(3));
        g.add_edge(h(2), h(4));

        let paths = forest_paths(&g);
        assert_eq!(paths.longest.len(), 1);
        let (len, path) = &paths.longest[0];
        assert_eq!(*len, 12);
        assert_eq!(
            path.iter().map(|e| e.id()).sorted().collect_vec(),
            vec![NodeId::new(1), NodeId::new(2), NodeId::new(3)]
        );
        assert_path_consistent(&g, path);
    }

    #[test]
    fn bubble_path_beats_its_cycle() {
        // Bubble with long anchors: the tip-tip path through the bubble
        // outweighs the cycle of the two branch nodes.
        let mut g = HashGraph::new();
        g.add_node(NodeId::new(1), "ACGT");
        g.add_node(NodeId::new(2), "AC");
        g.add_node(NodeId::new(3), "ACG");
        g.add_node(NodeId::new(4), "ACGT");
        g.add_edge(h(1), h(2));
        g.add_edge(h(1), h(3));
        g.add_edge(h(2), h(4));
        g.add_edge(h(3), h(4));

        let paths = forest_paths(&g);
        assert_eq!(paths.longest.len(), 1);
        let (len, path) = &paths.longest[0];
        assert_eq!(*len, 8);
        assert_eq!(path.len(), 2);
        assert_eq!(
            path.iter().map(|e| e.id()).sorted().collect_vec(),
            vec![NodeId::new(1), NodeId::new(4)]
        );
        assert_path_consistent(&g, path);
    }

    #[test]
    fn cycle_only_component_keeps_cycle_rooting() {
        // 1 -> 2 -> 3 -> 1: the whole component is one cycle; no tree path
        // can beat it, so no path record is produced.
        let mut g = HashGraph::new();
        for id in 1..=3 {
            g.add_node(NodeId::new(id), "ACGT");
        }
        g.add_edge(h(1), h(2));
        g.add_edge(h(2), h(3));
        g.add_edge(h(3), h(1));

        let paths = forest_paths(&g);
        assert!(paths.longest.is_empty());
    }
}
