//! Cached per-path indexes: offset-to-node lookup and translation replay.

use crate::{handle::*, ops::SequenceGraph, repr::*};

use crate::repr::revcomp;

/// One step of an indexed path: where it starts on the path, how many
/// bases it contributes, and the oriented node it traverses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct IndexedStep {
    start: usize,
    len: usize,
    handle: Handle,
}

/// An index over one embedded path: maps path offsets to node sides and
/// keeps the path's sequence, if requested, for cheap retrieval.
///
/// Indexes are built once and then patched in place with
/// [`PathIndex::apply_translations`] whenever the graph is edited, so they
/// stay valid across node divisions and insertions without rebuilding.
pub struct PathIndex {
    path_name: String,
    steps: Vec<IndexedStep>,
    sequence: Option<String>,
}

impl PathIndex {
    /// Builds the index for a named path of the graph.
    ///
    /// **Panics if the path does not exist.**
    pub fn new(graph: &HashGraph, path_name: &str, include_sequence: bool) -> Self {
        let steps_in = graph
            .path(path_name)
            .unwrap_or_else(|| panic!("unknown path {path_name:?}"));

        let mut steps = Vec::with_capacity(steps_in.len());
        let mut sequence = include_sequence.then(String::new);
        let mut start = 0;
        for &handle in steps_in {
            let len = graph.node_len(handle.id());
            steps.push(IndexedStep { start, len, handle });
            start += len;
            if let Some(seq) = &mut sequence {
                seq.push_str(&graph.handle_seq(handle));
            }
        }

        Self {
            path_name: path_name.to_owned(),
            steps,
            sequence,
        }
    }

    pub fn path_name(&self) -> &str {
        &self.path_name
    }

    /// Total path length in bases.
    pub fn len(&self) -> usize {
        self.steps.last().map_or(0, |s| s.start + s.len)
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// The path's sequence, if it was built with one.
    pub fn sequence(&self) -> Option<&str> {
        self.sequence.as_deref()
    }

    /// Maps a path base offset to the oriented node side covering it.
    ///
    /// **Panics if the offset is past the end of the path.**
    pub fn at_position(&self, offset: usize) -> Handle {
        assert!(offset < self.len(), "offset {offset} past end of path");
        let idx = self.steps.partition_point(|s| s.start <= offset) - 1;
        self.steps[idx].handle
    }

    /// Replays a batch of edit translations into the index in place.
    ///
    /// Unscoped translations (node divisions) replace every traversal of
    /// their from-walk; translations scoped to another path are skipped,
    /// and ones scoped to this path splice in at their first match.
    pub fn apply_translations(&mut self, translations: &[Translation]) {
        for t in translations {
            match &t.path {
                Some(scope) if *scope != self.path_name => continue,
                Some(_) => {
                    self.splice_first(t);
                }
                None => {
                    // A node-space change: every occurrence is affected.
                    while self.splice_first(t) {}
                }
            }
        }
    }

    /// Finds the first traversal of `t.from` and replaces it with `t.to`;
    /// returns whether a match was found.
    fn splice_first(&mut self, t: &Translation) -> bool {
        if t.from.is_empty() {
            return false;
        }

        if let Some(at) = self.find_forward(&t.from) {
            let replacement: Vec<IndexedStep> = t
                .to
                .iter()
                .map(|m| IndexedStep {
                    start: 0,
                    len: m.seq.len(),
                    handle: Handle::new(m.node, m.is_reverse),
                })
                .collect();
            let text: String = t.to.iter().map(|m| m.seq.as_str()).collect();
            self.splice(at, t.from.len(), replacement, &text);
            return true;
        }

        if let Some(at) = self.find_reverse(&t.from) {
            // The path crosses the from-walk backwards; splice the
            // replacement in reversed, with flipped orientations and
            // complemented sequence.
            let replacement: Vec<IndexedStep> = t
                .to
                .iter()
                .rev()
                .map(|m| IndexedStep {
                    start: 0,
                    len: m.seq.len(),
                    handle: Handle::new(m.node, !m.is_reverse),
                })
                .collect();
            let text: String = t.to.iter().rev().map(|m| revcomp(&m.seq)).collect();
            self.splice(at, t.from.len(), replacement, &text);
            return true;
        }

        false
    }

    fn find_forward(&self, from: &[TransMapping]) -> Option<usize> {
        self.steps.windows(from.len()).position(|w| {
            w.iter()
                .zip(from)
                .all(|(s, m)| s.handle == Handle::new(m.node, m.is_reverse))
        })
    }

    fn find_reverse(&self, from: &[TransMapping]) -> Option<usize> {
        self.steps.windows(from.len()).position(|w| {
            w.iter()
                .zip(from.iter().rev())
                .all(|(s, m)| s.handle == Handle::new(m.node, !m.is_reverse))
        })
    }

    fn splice(&mut self, at: usize, removed: usize, replacement: Vec<IndexedStep>, text: &str) {
        let win_start = self.steps[at].start;
        let win_end = {
            let last = &self.steps[at + removed - 1];
            last.start + last.len
        };

        if let Some(seq) = &mut self.sequence {
            seq.replace_range(win_start..win_end, text);
        }
        self.steps.splice(at..at + removed, replacement);

        let mut start = win_start;
        for step in &mut self.steps[at..] {
            step.start = start;
            start += step.len;
        }
    }
}
