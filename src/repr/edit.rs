//! The edit vocabulary: how callers describe graph edits and how the graph
//! reports the node-space changes an edit caused.

use crate::handle::NodeId;

/// One step of an [`EditPath`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditOp {
    /// Keep the named node unchanged along the edited walk.
    Match { node: NodeId },
    /// Insert novel sequence after `offset` bases of the named node.
    Insert {
        node: NodeId,
        offset: usize,
        seq: String,
    },
}

impl EditOp {
    /// The id of the existing node this operation touches.
    pub fn node(&self) -> NodeId {
        match self {
            EditOp::Match { node } | EditOp::Insert { node, .. } => *node,
        }
    }
}

/// An edit against an embedded path: a sequence of operations over nodes
/// the path traverses.
#[derive(Debug, Clone)]
pub struct EditPath {
    /// Name of the embedded path the edit belongs to.
    pub path: String,
    pub ops: Vec<EditOp>,
}

impl EditPath {
    pub fn new(path: impl Into<String>, ops: Vec<EditOp>) -> Self {
        Self {
            path: path.into(),
            ops,
        }
    }
}

/// One mapping inside a [`Translation`]: a node id, the offset at which the
/// mapped material starts on that node, and the mapped sequence itself.
///
/// Carrying the sequence makes translation replay self-contained: a cached
/// path index can rebuild its sequence without consulting the graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransMapping {
    pub node: NodeId,
    pub offset: usize,
    pub is_reverse: bool,
    pub seq: String,
}

impl TransMapping {
    pub fn forward(node: NodeId, seq: impl Into<String>) -> Self {
        Self {
            node,
            offset: 0,
            is_reverse: false,
            seq: seq.into(),
        }
    }
}

/// A record of how a walk through the old graph is replaced by a walk
/// through the edited graph.
///
/// Division translations carry no path scope and apply to every embedded
/// path; insertion translations are scoped to the edited path, because only
/// that path picks up the novel material.
#[derive(Debug, Clone)]
pub struct Translation {
    /// Name of the path this translation is restricted to, if any.
    pub path: Option<String>,
    /// The replaced walk, in terms of old node ids.
    pub from: Vec<TransMapping>,
    /// The replacement walk, in terms of post-edit node ids.
    pub to: Vec<TransMapping>,
}

impl Translation {
    /// The node ids of the replacement walk.
    pub fn to_node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.to.iter().map(|m| m.node)
    }
}
