/*!
# Three-Edge-Connected Component Merges

Tsin's absorb-eject algorithm for 3-edge-connected components, driven
through callbacks so it can run over any multigraph the caller can
enumerate, with no graph representation of its own.

The caller supplies three things: a node enumerator, a per-node incident
edge enumerator, and a merge sink. Multi-edges must be delivered as-is —
parallel edges are exactly what distinguishes 2-edge-connected from
3-edge-connected here. Self-loops are tolerated and ignored.

The DFS keeps, per live node, an absorb path threaded through `path_next`.
Finishing a child either ejects it (effective degree ≤ 2: its component is
complete) or hands its path to the parent, which absorbs it or grafts it
depending on low-point order; back edges absorb path segments directly.
Every absorption reports one merge pair to the sink; nodes never absorbed
remain singleton components.
*/

use std::hash::Hash;

use fxhash::FxHashMap;
use log::debug;

const NO_PARENT: usize = usize::MAX;

struct TsinFrame {
    node: usize,
    parent: usize,
    edge_i: usize,
    parent_skipped: bool,
}

struct TsinSearch<'f, F: FnMut(usize, usize)> {
    adj: Vec<Vec<usize>>,
    visited: Vec<bool>,
    pre: Vec<usize>,
    low: Vec<usize>,
    deg: Vec<i64>,
    path_next: Vec<Option<usize>>,
    clock: usize,
    on_merge: &'f mut F,
}

impl<F: FnMut(usize, usize)> TsinSearch<'_, F> {
    fn new(adj: Vec<Vec<usize>>, on_merge: &mut F) -> TsinSearch<'_, F> {
        let n = adj.len();
        TsinSearch {
            adj,
            visited: vec![false; n],
            pre: vec![0; n],
            low: vec![0; n],
            deg: vec![0; n],
            path_next: vec![None; n],
            clock: 0,
            on_merge,
        }
    }

    fn run(mut self) {
        for root in 0..self.adj.len() {
            if !self.visited[root] {
                self.search(root);
            }
        }
    }

    /// Absorbs `y` into `w`'s component.
    fn absorb(&mut self, w: usize, y: usize) {
        (self.on_merge)(w, y);
        let delta = self.deg[y] - 2;
        self.deg[w] += delta;
    }

    /// Absorbs an entire path, starting at `head`, into `w`.
    fn absorb_all(&mut self, w: usize, head: Option<usize>) {
        let mut x = head;
        while let Some(y) = x {
            x = self.path_next[y];
            self.absorb(w, y);
        }
    }

    /// Absorbs the part of `w`'s own path below `w` whose pre-order numbers
    /// do not exceed `bound` (the span covered by an incoming back edge).
    fn absorb_below_upto(&mut self, w: usize, bound: usize) {
        let mut x = self.path_next[w];
        while let Some(y) = x {
            if self.pre[y] > bound {
                break;
            }
            x = self.path_next[y];
            self.absorb(w, y);
        }
        self.path_next[w] = x;
    }

    fn discover(&mut self, v: usize) {
        self.visited[v] = true;
        self.pre[v] = self.clock;
        self.low[v] = self.clock;
        self.clock += 1;
        self.deg[v] = self.adj[v].len() as i64;
        self.path_next[v] = None;
    }

    fn search(&mut self, root: usize) {
        self.discover(root);
        let mut stack = vec![TsinFrame {
            node: root,
            parent: NO_PARENT,
            edge_i: 0,
            parent_skipped: false,
        }];

        'dfs: while !stack.is_empty() {
            let top = stack.len() - 1;
            let w = stack[top].node;

            while stack[top].edge_i < self.adj[w].len() {
                let v = self.adj[w][stack[top].edge_i];
                stack[top].edge_i += 1;

                if v == stack[top].parent && !stack[top].parent_skipped {
                    // Exactly one occurrence is the tree edge; any parallel
                    // copies are genuine back edges.
                    stack[top].parent_skipped = true;
                    continue;
                }

                if !self.visited[v] {
                    self.discover(v);
                    stack.push(TsinFrame {
                        node: v,
                        parent: w,
                        edge_i: 0,
                        parent_skipped: false,
                    });
                    continue 'dfs;
                }

                if self.pre[v] < self.pre[w] {
                    // Outgoing back edge to an ancestor.
                    if self.pre[v] < self.low[w] {
                        let below = self.path_next[w];
                        self.absorb_all(w, below);
                        self.path_next[w] = None;
                        self.low[w] = self.pre[v];
                    }
                } else {
                    // Incoming back edge from a finished descendant: the
                    // edge closes a cycle over the path segment down to it.
                    self.deg[w] -= 2;
                    self.absorb_below_upto(w, self.pre[v]);
                }
            }

            let finished = stack.pop().unwrap();
            if finished.parent == NO_PARENT {
                continue;
            }
            let (w, u) = (finished.parent, finished.node);

            let mut u_path = Some(u);
            if self.deg[u] <= 2 {
                // u is separated by a cut of at most two edges; its
                // component is complete and it leaves its own path.
                let delta = self.deg[u] - 2;
                self.deg[w] += delta;
                u_path = self.path_next[u];
            }

            if self.low[w] <= self.low[u] {
                self.absorb_all(w, u_path);
            } else {
                self.low[w] = self.low[u];
                let below = self.path_next[w];
                self.absorb_all(w, below);
                self.path_next[w] = u_path;
            }
        }
    }
}

/// Computes the 3-edge-connected components of a multigraph presented
/// through callbacks, reporting each component as a sequence of pairwise
/// merges.
///
/// - `for_each_node` must call its argument once per node.
/// - `for_each_edge` must call its argument once per incident edge end of
///   the given node (multi-edges repeated, self-loops allowed).
/// - `on_merge` receives `(a, b)` pairs; the union of all pairs describes
///   the components.
pub fn three_edge_connected_component_merges<N, FN, FE, FM>(
    mut for_each_node: FN,
    mut for_each_edge: FE,
    mut on_merge: FM,
) where
    N: Copy + Eq + Hash,
    FN: FnMut(&mut dyn FnMut(N)),
    FE: FnMut(N, &mut dyn FnMut(N)),
    FM: FnMut(N, N),
{
    // Densify the node space first; the search itself runs on flat arrays.
    let mut ids: Vec<N> = Vec::new();
    let mut index: FxHashMap<N, usize> = FxHashMap::default();
    for_each_node(&mut |node| {
        index.entry(node).or_insert_with(|| {
            ids.push(node);
            ids.len() - 1
        });
    });

    let mut adj: Vec<Vec<usize>> = vec![Vec::new(); ids.len()];
    for (i, &node) in ids.iter().enumerate() {
        let mut neighbors = Vec::new();
        for_each_edge(node, &mut |other| {
            let j = index[&other];
            // Self-loops cannot take part in any 2-cut; drop them here so
            // they do not distort effective degrees.
            if j != i {
                neighbors.push(j);
            }
        });
        adj[i] = neighbors;
    }

    debug!(
        "3ecc search over {} nodes, {} edge ends",
        adj.len(),
        adj.iter().map(|a| a.len()).sum::<usize>()
    );

    let mut merge_dense = |a: usize, b: usize| on_merge(ids[a], ids[b]);
    TsinSearch::new(adj, &mut merge_dense).run();
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::utils::UnionFind;
    use itertools::Itertools;

    /// Runs the algorithm over an explicit edge list and returns the
    /// resulting components, sorted.
    fn components(n: usize, edges: &[(usize, usize)]) -> Vec<Vec<usize>> {
        let mut adj: Vec<Vec<usize>> = vec![Vec::new(); n];
        for &(a, b) in edges {
            adj[a].push(b);
            if a != b {
                adj[b].push(a);
            }
        }

        let mut uf = UnionFind::new(n);
        three_edge_connected_component_merges(
            |emit| (0..n).for_each(emit),
            |node, emit| adj[node].iter().copied().for_each(emit),
            |a, b| {
                uf.union(a, b);
            },
        );

        let mut comps: Vec<Vec<usize>> = (0..n)
            .into_group_map_by(|&x| uf.find(x))
            .into_values()
            .map(|mut c| {
                c.sort_unstable();
                c
            })
            .collect();
        comps.sort();
        comps
    }

    #[test]
    fn triangle_has_no_merges() {
        let comps = components(3, &[(0, 1), (1, 2), (2, 0)]);
        assert_eq!(comps, vec![vec![0], vec![1], vec![2]]);
    }

    #[test]
    fn theta_multigraph_merges() {
        // Two nodes joined by three parallel edges are 3-edge-connected.
        let comps = components(2, &[(0, 1), (0, 1), (0, 1)]);
        assert_eq!(comps, vec![vec![0, 1]]);
    }

    #[test]
    fn double_edge_is_not_enough() {
        let comps = components(2, &[(0, 1), (0, 1)]);
        assert_eq!(comps, vec![vec![0], vec![1]]);
    }

    #[test]
    fn doubled_square_is_one_component() {
        let comps = components(
            4,
            &[
                (0, 1),
                (0, 1),
                (1, 2),
                (1, 2),
                (2, 3),
                (2, 3),
                (3, 0),
                (3, 0),
            ],
        );
        assert_eq!(comps, vec![vec![0, 1, 2, 3]]);
    }

    #[test]
    fn k4_is_one_component() {
        let comps = components(4, &[(0, 1), (0, 2), (0, 3), (1, 2), (1, 3), (2, 3)]);
        assert_eq!(comps, vec![vec![0, 1, 2, 3]]);
    }

    #[test]
    fn bridge_separates_k4s() {
        // Two K4s joined by a single bridge edge stay separate components.
        let mut edges = vec![(0, 1), (0, 2), (0, 3), (1, 2), (1, 3), (2, 3)];
        edges.extend([(4, 5), (4, 6), (4, 7), (5, 6), (5, 7), (6, 7)]);
        edges.push((3, 4));

        let comps = components(8, &edges);
        assert_eq!(comps, vec![vec![0, 1, 2, 3], vec![4, 5, 6, 7]]);
    }

    #[test]
    fn self_loops_are_ignored() {
        let comps = components(2, &[(0, 0), (0, 1), (0, 1), (0, 1), (1, 1)]);
        assert_eq!(comps, vec![vec![0, 1]]);
    }

    #[test]
    fn disconnected_nodes_stay_alone() {
        let comps = components(3, &[(0, 1), (0, 1), (0, 1)]);
        assert_eq!(comps, vec![vec![0, 1], vec![2]]);
    }
}
