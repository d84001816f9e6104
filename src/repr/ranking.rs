//! Dense node ranking over a graph snapshot.

use fxhash::FxHashMap;
use itertools::Itertools;

use crate::{handle::NodeId, ops::*};

/// A dense 1-based id↔rank overlay.
///
/// Built once from a graph's node set; ranks follow ascending id order, so
/// the ranking is deterministic regardless of the graph's internal
/// iteration order. Stale after any node addition or removal.
pub struct NodeRanking {
    by_rank: Vec<NodeId>,
    by_id: FxHashMap<NodeId, usize>,
}

impl NodeRanking {
    /// Builds the ranking for the given graph's current node set.
    pub fn new<G: SequenceGraph>(graph: &G) -> Self {
        let by_rank = graph.node_ids().sorted_unstable().collect_vec();
        let by_id = by_rank
            .iter()
            .enumerate()
            .map(|(i, &id)| (id, i + 1))
            .collect();

        Self { by_rank, by_id }
    }
}

impl NodeRanks for NodeRanking {
    fn rank_count(&self) -> usize {
        self.by_rank.len()
    }

    fn id_to_rank(&self, id: NodeId) -> usize {
        self.by_id[&id]
    }

    fn rank_to_id(&self, rank: usize) -> NodeId {
        self.by_rank[rank - 1]
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::repr::HashGraph;

    #[test]
    fn ranks_are_dense_and_sorted() {
        let mut g = HashGraph::new();
        for id in [30u64, 10, 20] {
            g.add_node(NodeId::new(id), "A");
        }

        let ranking = NodeRanking::new(&g);
        assert_eq!(ranking.rank_count(), 3);
        assert_eq!(ranking.rank_to_id(1), NodeId::new(10));
        assert_eq!(ranking.rank_to_id(2), NodeId::new(20));
        assert_eq!(ranking.rank_to_id(3), NodeId::new(30));
        for rank in 1..=3 {
            assert_eq!(ranking.id_to_rank(ranking.rank_to_id(rank)), rank);
        }
    }
}
