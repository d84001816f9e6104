/*!
`vargraphs` provides the two coordination cores of a variation-graph
toolkit:

- the **integrated snarl finder**: a read-only decomposition of a
  bidirected sequence graph into a hierarchical tree of *snarls*
  (generalized bubbles) and *chains*, suitable for site-level analysis;
- the **graph region synchronizer**: a reader/writer layer that hands out
  exclusive ownership of contextual subregions of a shared mutable graph,
  keeping cached path indexes current as lock holders apply edits.

# Representation

Nodes carry a stable 64-bit [`NodeId`](handle::NodeId) and a base
sequence. A [`Handle`](handle::Handle) is one oriented end of a node,
packed into a single `u64`; an [`Edge`](handle::Edge) connects two
handles. Graph access is trait-based (see [`ops`]): the snarl finder runs
on anything implementing [`SequenceGraph`](ops::SequenceGraph), with dense
node ranking composed on top as a separate capability. One concrete
representation, [`HashGraph`](repr::HashGraph), is provided; the
synchronizer operates on it directly.

# Decomposition

The snarl finder works in three passes over an immutable graph: adjacency
components are collapsed into a derived multigraph, 3-edge-connected
components are merged to leave a cactus graph, and a guided traversal of
the cactus's cycles and bridge trees emits every snarl child-before-parent
(see [`algo`]). All DFS routines use explicit stacks; input graphs may be
deep.

# Usage

```
use vargraphs::prelude::*;

let mut g = HashGraph::new();
let a = g.add_node(NodeId::new(1), "ACGT");
let b = g.add_node(NodeId::new(2), "ACGT");
g.add_edge(a, b);

g.for_each_snarl_postorder(|parent, (start, end)| {
    println!("snarl {start}..{end}, parent {parent:?}");
});
```

# When to use

This crate covers graph-topology decomposition and region locking only.
There is no alignment, mapping or variant calling here, no file formats,
and the snarl finder never mutates the graph it reads.
*/

pub mod algo;
pub mod handle;
pub mod ops;
pub mod repr;
pub mod sync;
pub mod utils;

/// Core value types, graph capability traits, the concrete representation
/// and the snarl decomposition entry points.
pub mod prelude {
    pub use super::{algo::*, handle::*, ops::*, repr::*};
}
