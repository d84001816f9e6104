//! A hash-table backed mutable bidirected sequence graph with embedded
//! named paths.
//!
//! Edges are stored symmetrically per handle side: `Edge(a, b)` is recorded
//! under `a` (continuations from `a`) and under `b.flip()` (continuations
//! from the other direction), so `follow_edges` is a single lookup for
//! either traversal direction.

use std::collections::{hash_map, VecDeque};

use fxhash::{FxHashMap, FxHashSet};

use crate::{handle::*, ops::*, repr::edit::*};

/// A mutable bidirected sequence graph.
#[derive(Clone, Default)]
pub struct HashGraph {
    sequences: FxHashMap<NodeId, String>,
    edges_from: FxHashMap<Handle, Vec<Handle>>,
    edge_count: usize,
    paths: FxHashMap<String, Vec<Handle>>,
    max_id: u64,
}

fn complement(base: u8) -> u8 {
    match base {
        b'A' => b'T',
        b'T' => b'A',
        b'C' => b'G',
        b'G' => b'C',
        b'a' => b't',
        b't' => b'a',
        b'c' => b'g',
        b'g' => b'c',
        other => other,
    }
}

pub(crate) fn revcomp(seq: &str) -> String {
    seq.bytes().rev().map(|b| complement(b) as char).collect()
}

impl HashGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a node with the given id and sequence, returning its forward
    /// handle.
    ///
    /// **Panics if the id is already in use.**
    pub fn add_node(&mut self, id: NodeId, seq: &str) -> Handle {
        let prev = self.sequences.insert(id, seq.to_owned());
        assert!(prev.is_none(), "node {id} already exists");
        self.max_id = self.max_id.max(id.raw());
        Handle::forward_of(id)
    }

    /// Adds a node with a fresh id above every id seen so far.
    pub fn create_node(&mut self, seq: &str) -> NodeId {
        let id = NodeId::new(self.max_id + 1);
        self.add_node(id, seq);
        id
    }

    /// Returns the sequence of a node.
    pub fn node_seq(&self, id: NodeId) -> &str {
        &self.sequences[&id]
    }

    /// Returns the sequence read along a handle (reverse complemented for
    /// reverse handles).
    pub fn handle_seq(&self, h: Handle) -> String {
        let seq = self.node_seq(h.id());
        if h.is_reverse() {
            revcomp(seq)
        } else {
            seq.to_owned()
        }
    }

    /// Adds the edge `(a, b)`. A no-op if the edge already exists.
    ///
    /// **Panics if either node does not exist.**
    pub fn add_edge(&mut self, a: Handle, b: Handle) {
        assert!(self.has_node(a.id()), "edge endpoint {a} missing");
        assert!(self.has_node(b.id()), "edge endpoint {b} missing");

        if self.has_edge(a, b) {
            return;
        }

        self.edges_from.entry(a).or_default().push(b);
        // The reversed traversal of the same attachment, unless that is the
        // record we just wrote.
        if Edge(a, b) != Edge(a, b).reverse() {
            self.edges_from.entry(b.flip()).or_default().push(a.flip());
        }
        self.edge_count += 1;
    }

    /// Returns `true` if the edge `(a, b)` (in either traversal direction)
    /// exists.
    pub fn has_edge(&self, a: Handle, b: Handle) -> bool {
        self.edges_from
            .get(&a)
            .is_some_and(|outs| outs.contains(&b))
    }

    /// Removes the edge `(a, b)` if present.
    pub fn remove_edge(&mut self, a: Handle, b: Handle) {
        if !self.has_edge(a, b) {
            return;
        }
        if let Some(outs) = self.edges_from.get_mut(&a) {
            outs.retain(|&h| h != b);
        }
        if Edge(a, b) != Edge(a, b).reverse() {
            if let Some(outs) = self.edges_from.get_mut(&b.flip()) {
                outs.retain(|&h| h != a.flip());
            }
        }
        self.edge_count -= 1;
    }

    /// Iterates the handles reachable by continuing past the end of `h`.
    pub fn follow_edges(&self, h: Handle) -> impl Iterator<Item = Handle> + '_ {
        self.edges_from
            .get(&h)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
            .iter()
            .copied()
    }

    /// Returns the number of edges incident to the end of `h`.
    pub fn degree(&self, h: Handle) -> usize {
        self.edges_from.get(&h).map_or(0, |v| v.len())
    }

    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    // ---------- Paths ----------

    /// Creates an empty embedded path.
    ///
    /// **Panics if the name is taken.**
    pub fn create_path(&mut self, name: &str) {
        let prev = self.paths.insert(name.to_owned(), Vec::new());
        assert!(prev.is_none(), "path {name:?} already exists");
    }

    /// Appends a step to an embedded path.
    pub fn append_step(&mut self, name: &str, h: Handle) {
        self.paths
            .get_mut(name)
            .unwrap_or_else(|| panic!("unknown path {name:?}"))
            .push(h);
    }

    /// Returns the steps of an embedded path, if it exists.
    pub fn path(&self, name: &str) -> Option<&[Handle]> {
        self.paths.get(name).map(|v| v.as_slice())
    }

    pub fn has_path(&self, name: &str) -> bool {
        self.paths.contains_key(name)
    }

    /// Returns the concatenated sequence of an embedded path.
    pub fn path_sequence(&self, name: &str) -> Option<String> {
        let steps = self.paths.get(name)?;
        Some(steps.iter().map(|&h| self.handle_seq(h)).collect())
    }

    // ---------- Mutation ----------

    /// Splits a node into two at `offset` bases, rewiring incident edges
    /// and rewriting every embedded path step through it. Both halves get
    /// fresh ids; the old id is retired. Returns `(left, right)`.
    ///
    /// **Panics if the node is missing or the offset is not strictly
    /// inside its sequence.**
    pub fn divide_node(&mut self, id: NodeId, offset: usize) -> (NodeId, NodeId) {
        let seq = self
            .sequences
            .get(&id)
            .unwrap_or_else(|| panic!("cannot divide missing node {id}"))
            .clone();
        assert!(
            offset > 0 && offset < seq.len(),
            "divide offset {offset} not inside node {id} of length {}",
            seq.len()
        );

        // Capture incident edges before touching anything. Scanning both of
        // the node's own records sees every incident edge, with edges into
        // the node appearing in their reversed traversal.
        let mut incident: Vec<Edge> = Vec::new();
        for side in [Handle::forward_of(id), Handle::new(id, true)] {
            for t in self.follow_edges(side) {
                incident.push(Edge(side, t));
            }
        }

        for &Edge(a, b) in &incident {
            self.remove_edge(a, b);
        }
        self.sequences.remove(&id);

        let left = self.create_node(&seq[..offset]);
        let right = self.create_node(&seq[offset..]);
        let (left_fwd, right_fwd) = (Handle::forward_of(left), Handle::forward_of(right));

        // Leaving the old node's end now leaves `right`; leaving its start
        // (reverse orientation) now leaves `left`. Entering forward means
        // entering `left`; entering reverse means entering `right`.
        let map_source = |h: Handle| {
            if h.id() != id {
                h
            } else if h.is_reverse() {
                Handle::new(left, true)
            } else {
                right_fwd
            }
        };
        let map_target = |h: Handle| {
            if h.id() != id {
                h
            } else if h.is_reverse() {
                Handle::new(right, true)
            } else {
                left_fwd
            }
        };

        for &Edge(a, b) in &incident {
            self.add_edge(map_source(a), map_target(b));
        }
        self.add_edge(left_fwd, right_fwd);

        for steps in self.paths.values_mut() {
            let mut rewritten = Vec::with_capacity(steps.len());
            for &step in steps.iter() {
                if step.id() != id {
                    rewritten.push(step);
                } else if step.is_reverse() {
                    rewritten.push(Handle::new(right, true));
                    rewritten.push(Handle::new(left, true));
                } else {
                    rewritten.push(left_fwd);
                    rewritten.push(right_fwd);
                }
            }
            *steps = rewritten;
        }

        (left, right)
    }

    /// Applies an edit described against existing nodes and returns the
    /// translations it caused, division records first.
    ///
    /// Supported operations: full-node matches and sequence insertions at a
    /// node offset. Insertions in the interior of a node divide it; the
    /// novel node is spliced into the edited path only.
    ///
    /// **Panics if an operation names a missing node or an out-of-range
    /// offset.**
    pub fn apply_edit(&mut self, edit: &EditPath) -> Vec<Translation> {
        let mut translations = Vec::new();

        for op in &edit.ops {
            let EditOp::Insert { node, offset, seq } = op else {
                continue;
            };
            let (node, offset, seq) = (*node, *offset, seq.as_str());
            let old_seq = self.node_seq(node).to_owned();
            assert!(offset <= old_seq.len(), "insert offset past node {node}");

            let novel = self.create_node(seq);
            let novel_fwd = Handle::forward_of(novel);

            if offset == 0 {
                // Prepend: splice the novel node in front of the target.
                self.add_edge(novel_fwd, Handle::forward_of(node));
                self.splice_into_path(&edit.path, node, &[novel, node]);
                translations.push(Translation {
                    path: Some(edit.path.clone()),
                    from: vec![TransMapping::forward(node, old_seq.clone())],
                    to: vec![
                        TransMapping::forward(novel, seq),
                        TransMapping::forward(node, old_seq),
                    ],
                });
            } else if offset == old_seq.len() {
                self.add_edge(Handle::forward_of(node), novel_fwd);
                self.splice_into_path(&edit.path, node, &[node, novel]);
                translations.push(Translation {
                    path: Some(edit.path.clone()),
                    from: vec![TransMapping::forward(node, old_seq.clone())],
                    to: vec![
                        TransMapping::forward(node, old_seq),
                        TransMapping::forward(novel, seq),
                    ],
                });
            } else {
                let (left, right) = self.divide_node(node, offset);
                let left_seq = self.node_seq(left).to_owned();
                let right_seq = self.node_seq(right).to_owned();

                translations.push(Translation {
                    path: None,
                    from: vec![TransMapping::forward(node, old_seq)],
                    to: vec![
                        TransMapping::forward(left, left_seq.clone()),
                        TransMapping {
                            node: right,
                            offset,
                            is_reverse: false,
                            seq: right_seq.clone(),
                        },
                    ],
                });

                self.add_edge(Handle::forward_of(left), novel_fwd);
                self.add_edge(novel_fwd, Handle::forward_of(right));
                self.splice_into_path_pair(&edit.path, left, right, novel);

                translations.push(Translation {
                    path: Some(edit.path.clone()),
                    from: vec![
                        TransMapping::forward(left, left_seq.clone()),
                        TransMapping::forward(right, right_seq.clone()),
                    ],
                    to: vec![
                        TransMapping::forward(left, left_seq),
                        TransMapping::forward(novel, seq),
                        TransMapping::forward(right, right_seq),
                    ],
                });
            }
        }

        translations
    }

    /// Replaces the first forward step over `at` in the named path with the
    /// given run of forward steps.
    fn splice_into_path(&mut self, path: &str, at: NodeId, replacement: &[NodeId]) {
        let Some(steps) = self.paths.get_mut(path) else {
            return;
        };
        if let Some(pos) = steps
            .iter()
            .position(|&h| h.id() == at && !h.is_reverse())
        {
            steps.splice(
                pos..pos + 1,
                replacement.iter().map(|&id| Handle::forward_of(id)),
            );
        }
    }

    /// Inserts `novel` between the first adjacent `left`,`right` forward
    /// steps in the named path (the pair a division just produced).
    fn splice_into_path_pair(&mut self, path: &str, left: NodeId, right: NodeId, novel: NodeId) {
        let Some(steps) = self.paths.get_mut(path) else {
            return;
        };
        if let Some(pos) = steps.windows(2).position(|w| {
            w[0] == Handle::forward_of(left) && w[1] == Handle::forward_of(right)
        }) {
            steps.insert(pos + 1, Handle::forward_of(novel));
        }
    }

    // ---------- Context extraction ----------

    /// Extracts the subgraph within `context_bases` of the given node,
    /// measured in sequence traversed, together with the periphery: the ids
    /// of nodes adjacent to the context but outside it.
    ///
    /// The extracted subgraph carries no paths. With `reflect`, traversal
    /// additionally turns around at graph tips.
    pub fn context_subgraph(
        &self,
        center: NodeId,
        context_bases: usize,
        reflect: bool,
    ) -> (HashGraph, FxHashSet<NodeId>) {
        let mut included: FxHashSet<NodeId> = FxHashSet::default();
        included.insert(center);

        // Most remaining bases seen per traversal direction.
        let mut best: FxHashMap<Handle, usize> = FxHashMap::default();
        let mut frontier: VecDeque<(Handle, usize)> = VecDeque::new();
        for side in [Handle::forward_of(center), Handle::new(center, true)] {
            best.insert(side, context_bases);
            frontier.push_back((side, context_bases));
        }

        while let Some((h, remaining)) = frontier.pop_front() {
            let mut at_tip = true;
            for next in self.follow_edges(h) {
                at_tip = false;
                let cost = self.node_len(next.id());
                if cost > remaining {
                    continue;
                }
                let left_over = remaining - cost;
                if best.get(&next).is_some_and(|&b| b >= left_over) {
                    continue;
                }
                best.insert(next, left_over);
                included.insert(next.id());
                frontier.push_back((next, left_over));
            }
            if reflect && at_tip && !best.get(&h.flip()).is_some_and(|&b| b >= remaining) {
                best.insert(h.flip(), remaining);
                frontier.push_back((h.flip(), remaining));
            }
        }

        let mut context = HashGraph::new();
        for &id in &included {
            context.add_node(id, self.node_seq(id));
        }
        let mut periphery: FxHashSet<NodeId> = FxHashSet::default();
        for &id in &included {
            for side in [Handle::forward_of(id), Handle::new(id, true)] {
                for next in self.follow_edges(side) {
                    if included.contains(&next.id()) {
                        context.add_edge(side, next);
                    } else {
                        periphery.insert(next.id());
                    }
                }
            }
        }

        (context, periphery)
    }
}

// ---------- Capability traits ----------

/// Iterator over all edges of a [`HashGraph`], each in canonical form.
///
/// Returned by [`SequenceGraph::edges`].
pub struct HashGraphEdges<'a> {
    outer: hash_map::Iter<'a, Handle, Vec<Handle>>,
    cur: Option<(Handle, std::slice::Iter<'a, Handle>)>,
}

impl Iterator for HashGraphEdges<'_> {
    type Item = Edge;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some((from, targets)) = &mut self.cur {
                for &to in targets.by_ref() {
                    let edge = Edge(*from, to);
                    // Each attachment has two stored traversals; emit the
                    // canonical one.
                    if edge.is_normalized() {
                        return Some(edge);
                    }
                }
            }
            let (&from, targets) = self.outer.next()?;
            self.cur = Some((from, targets.iter()));
        }
    }
}

impl SequenceGraph for HashGraph {
    type NodeIter<'a>
        = std::iter::Copied<hash_map::Keys<'a, NodeId, String>>
    where
        Self: 'a;
    type EdgeIter<'a>
        = HashGraphEdges<'a>
    where
        Self: 'a;

    fn node_count(&self) -> usize {
        self.sequences.len()
    }

    fn has_node(&self, id: NodeId) -> bool {
        self.sequences.contains_key(&id)
    }

    fn node_len(&self, id: NodeId) -> usize {
        self.sequences[&id].len()
    }

    fn node_ids(&self) -> Self::NodeIter<'_> {
        self.sequences.keys().copied()
    }

    fn edges(&self) -> Self::EdgeIter<'_> {
        HashGraphEdges {
            outer: self.edges_from.iter(),
            cur: None,
        }
    }
}
