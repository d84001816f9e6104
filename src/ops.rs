/*!
# Graph Operations

Capability traits for read access to bidirected sequence graphs.

The snarl finder does not own a graph representation; it consumes any type
that can enumerate its nodes and edges and report node sequence lengths
([`SequenceGraph`]). Dense node ranking is a separate capability
([`NodeRanks`]) that is composed at construction time, usually via the
[`NodeRanking`](crate::repr::NodeRanking) overlay, so that plain graph
types do not have to maintain rank bookkeeping they never use.

# Examples
```
use vargraphs::prelude::*;

let mut g = HashGraph::new();
let n1 = g.add_node(NodeId::new(1), "ACGT");
let n2 = g.add_node(NodeId::new(2), "TT");
g.add_edge(n1, n2);

assert_eq!(g.node_count(), 2);
assert_eq!(g.node_len(NodeId::new(1)), 4);
assert_eq!(g.edges().count(), 1);
```
*/

use crate::handle::*;

/// Read access to the nodes and edges of a bidirected sequence graph.
///
/// Implemented by every graph representation the snarl finder can run on.
pub trait SequenceGraph {
    /// Iterator over all node ids in the graph.
    ///
    /// Returned by [`SequenceGraph::node_ids`].
    type NodeIter<'a>: Iterator<Item = NodeId> + 'a
    where
        Self: 'a;

    /// Iterator over all edges in the graph, each reported once in its
    /// canonical orientation.
    ///
    /// Returned by [`SequenceGraph::edges`].
    type EdgeIter<'a>: Iterator<Item = Edge> + 'a
    where
        Self: 'a;

    /// Returns the number of nodes in the graph.
    fn node_count(&self) -> usize;

    /// Returns `true` if a node with the given id exists.
    fn has_node(&self, id: NodeId) -> bool;

    /// Returns the sequence length of a node, in bases.
    ///
    /// **Panics if the node does not exist.**
    fn node_len(&self, id: NodeId) -> usize;

    /// Returns the sequence length of the node under a handle, in bases.
    ///
    /// **Panics if the node does not exist.**
    #[inline]
    fn len_of(&self, h: Handle) -> usize {
        self.node_len(h.id())
    }

    /// Returns an iterator over all node ids.
    fn node_ids(&self) -> Self::NodeIter<'_>;

    /// Returns an iterator over all edges, each exactly once.
    fn edges(&self) -> Self::EdgeIter<'_>;

    /// Returns `true` if the graph has no nodes.
    fn is_empty(&self) -> bool {
        self.node_count() == 0
    }
}

/// Dense 1-based ranking of node ids.
///
/// Ranks are contiguous in `1..=node_count`, so rank-derived indices can
/// address flat arrays. The ranking is a snapshot: it stays valid only as
/// long as the node set it was built from does not change.
pub trait NodeRanks {
    /// Returns the number of ranked nodes.
    fn rank_count(&self) -> usize;

    /// Maps a node id to its dense 1-based rank.
    ///
    /// **Panics if the id was not part of the ranked node set.**
    fn id_to_rank(&self, id: NodeId) -> usize;

    /// Maps a dense 1-based rank back to its node id.
    ///
    /// **Panics if `rank == 0` or `rank > rank_count()`.**
    fn rank_to_id(&self, rank: usize) -> NodeId;
}
