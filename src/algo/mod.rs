/*!
# Snarl Decomposition

The integrated snarl finder: a three-pass decomposition of a bidirected
sequence graph into a tree of snarls and chains.

1. [`MergedAdjacencyGraph`] collapses adjacency components into the nodes
   of a derived multigraph whose edges are the original graph's nodes.
2. [`three_edge_connected_component_merges`](three_ec::three_edge_connected_component_merges)
   further collapses 3-edge-connected nodes, leaving a cactus graph.
3. [`cycles`] and [`bridge_paths`] chart the cactus's simple cycles and the
   bridge forest's longest leaf-leaf paths, and [`snarls`] walks the result
   emitting every snarl, children before parents.

Use the [`SnarlDecomposition`] extension trait for the whole pipeline:

```
use vargraphs::prelude::*;

let mut g = HashGraph::new();
let a = g.add_node(NodeId::new(1), "ACGT");
let b = g.add_node(NodeId::new(2), "ACGT");
g.add_edge(a, b);

let mut snarls = Vec::new();
g.for_each_snarl_postorder(|parent, bounds| {
    snarls.push((parent, bounds));
});
```
*/

mod bridge_paths;
mod cycles;
mod merged;
mod snarls;
pub mod three_ec;

pub(crate) use bridge_paths::*;
pub(crate) use cycles::*;
pub use merged::MergedAdjacencyGraph;
pub use snarls::{IntegratedSnarlFinder, SnarlDecomposition};
