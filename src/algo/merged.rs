//! The merged adjacency graph: a union-find over oriented node ends.
//!
//! Handles live at union-find index `(rank - 1) * 2 + is_reverse`, so the
//! structure needs a dense node ranking next to the graph. Merging every
//! edge's two inward handles yields the adjacency components; the same
//! structure then absorbs the 3-edge-connected merges (making it a cactus
//! graph) and, in a second copy, the cycle merges (making it the bridge
//! forest). Group structure is monotone: unions accumulate, nothing splits.

use crate::{handle::*, ops::*, utils::UnionFind};

/// A graph of merged adjacency components over a backing sequence graph.
///
/// Nodes of this derived multigraph are components of oriented node ends;
/// its edges are exactly the backing graph's nodes, each connecting the
/// components its two ends belong to. Every component is represented by a
/// head handle elected by the union-find; callers must not depend on head
/// identity across merges.
///
/// Cloning yields an independent structure with the same groups, used to
/// derive the bridge forest from the cactus.
pub struct MergedAdjacencyGraph<'a, G, R> {
    graph: &'a G,
    ranking: &'a R,
    uf: UnionFind,
}

impl<G, R> Clone for MergedAdjacencyGraph<'_, G, R> {
    fn clone(&self) -> Self {
        Self {
            graph: self.graph,
            ranking: self.ranking,
            uf: self.uf.clone(),
        }
    }
}

impl<'a, G, R> MergedAdjacencyGraph<'a, G, R>
where
    G: SequenceGraph,
    R: NodeRanks,
{
    fn uf_index(&self, h: Handle) -> usize {
        (self.ranking.id_to_rank(h.id()) - 1) * 2 + h.is_reverse() as usize
    }

    fn uf_handle(&self, index: usize) -> Handle {
        Handle::new(self.ranking.rank_to_id(index / 2 + 1), index % 2 == 1)
    }

    /// Builds the adjacency components of the backing graph: every edge
    /// `(a, b)` merges `a` with `flip(b)`, the two handles reading into the
    /// adjacency the edge creates.
    pub fn new(graph: &'a G, ranking: &'a R) -> Self {
        let mut merged = Self {
            graph,
            ranking,
            uf: UnionFind::new(graph.node_count() * 2),
        };

        for Edge(a, b) in graph.edges() {
            merged.merge(a, b.flip());
        }

        merged
    }

    /// Merges the components the two handles read into.
    pub fn merge(&mut self, into_a: Handle, into_b: Handle) {
        self.uf.union(self.uf_index(into_a), self.uf_index(into_b));
    }

    /// Returns the head handle of the component `into` reads into.
    pub fn find(&self, into: Handle) -> Handle {
        self.uf_handle(self.uf.find(self.uf_index(into)))
    }

    /// Returns the base-pair length of the node under a handle.
    pub fn len_of(&self, h: Handle) -> usize {
        self.graph.len_of(h)
    }

    /// Calls `f` once per component head.
    ///
    /// Heads are visited in union-find index order, which makes the
    /// visitation order deterministic for a fixed merge history.
    pub fn for_each_head(&self, mut f: impl FnMut(Handle)) {
        let mut seen = vec![false; self.uf.len()];
        for i in 0..self.uf.len() {
            let head = self.uf.find(i);
            if !seen[head] {
                seen[head] = true;
                f(self.uf_handle(head));
            }
        }
    }

    /// Calls `f` with every member of the component containing `head`,
    /// including the head itself.
    pub fn for_each_member(&self, head: Handle, mut f: impl FnMut(Handle)) {
        for index in self.uf.members(self.uf_index(head)) {
            f(self.uf_handle(index));
        }
    }

    /// Calls `f` with `(head, member)` for every non-head member of every
    /// component. Single-member components produce no calls.
    pub fn for_each_membership(&self, mut f: impl FnMut(Handle, Handle)) {
        self.for_each_head(|head| {
            let head_index = self.uf.find(self.uf_index(head));
            for index in self.uf.members(head_index) {
                if index != head_index {
                    f(head, self.uf_handle(index));
                }
            }
        });
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::repr::{HashGraph, NodeRanking};
    use fxhash::FxHashSet;
    use itertools::Itertools;

    fn h(id: u64) -> Handle {
        Handle::forward_of(NodeId::new(id))
    }

    /// 1 -> 2 -> 3 in series.
    fn linear() -> HashGraph {
        let mut g = HashGraph::new();
        for id in 1..=3 {
            g.add_node(NodeId::new(id), "ACGT");
        }
        g.add_edge(h(1), h(2));
        g.add_edge(h(2), h(3));
        g
    }

    #[test]
    fn adjacency_components_of_linear_graph() {
        let g = linear();
        let ranking = NodeRanking::new(&g);
        let merged = MergedAdjacencyGraph::new(&g, &ranking);

        // {1+, 2-}, {2+, 3-}, {1-}, {3+}
        assert_eq!(merged.find(h(1)), merged.find(h(2).flip()));
        assert_eq!(merged.find(h(2)), merged.find(h(3).flip()));
        assert_ne!(merged.find(h(1)), merged.find(h(2)));
        assert_ne!(merged.find(h(1).flip()), merged.find(h(3)));

        let mut heads = Vec::new();
        merged.for_each_head(|head| heads.push(head));
        assert_eq!(heads.len(), 4);
        assert_eq!(heads.iter().unique().count(), 4);
    }

    #[test]
    fn members_cover_every_handle_once() {
        let g = linear();
        let ranking = NodeRanking::new(&g);
        let merged = MergedAdjacencyGraph::new(&g, &ranking);

        let mut all: Vec<Handle> = Vec::new();
        merged.for_each_head(|head| {
            merged.for_each_member(head, |member| {
                assert_eq!(merged.find(member), merged.find(head));
                all.push(member);
            });
        });

        assert_eq!(all.len(), 6);
        assert_eq!(all.iter().unique().count(), 6);
    }

    #[test]
    fn membership_pairs_skip_heads() {
        let g = linear();
        let ranking = NodeRanking::new(&g);
        let merged = MergedAdjacencyGraph::new(&g, &ranking);

        let mut heads: FxHashSet<Handle> = FxHashSet::default();
        merged.for_each_head(|head| {
            heads.insert(head);
        });

        let mut pairs = 0;
        merged.for_each_membership(|head, member| {
            assert!(heads.contains(&head));
            assert!(!heads.contains(&member));
            assert_eq!(merged.find(member), head);
            pairs += 1;
        });
        // Two two-member components contribute one non-head member each.
        assert_eq!(pairs, 2);
    }

    #[test]
    fn clone_is_independent() {
        let g = linear();
        let ranking = NodeRanking::new(&g);
        let merged = MergedAdjacencyGraph::new(&g, &ranking);

        let mut forest = merged.clone();
        forest.merge(h(1), h(2));

        assert_eq!(forest.find(h(1)), forest.find(h(2)));
        assert_ne!(merged.find(h(1)), merged.find(h(2)));
    }
}
