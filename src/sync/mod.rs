/*!
# Graph Region Synchronizer

Hands out mutually exclusive ownership of contextual regions of a shared
mutable graph, while letting disjoint regions proceed in parallel and
keeping cached path indexes current across edits.

Three layers of coordination:

1. A reader/writer lock over the whole graph. Lock acquisition and path
   queries take the read side; the write side is held only while an edit
   is applied.
2. A reader/writer lock over the map of cached [`PathIndex`]es, with one
   more lock per index so indexes can be patched in place under a shared
   lease on the map.
3. A mutex plus condition variable guarding the set of currently locked
   node ids. [`RegionLock::lock`] sleeps on the condition variable until
   every node it needs is free; the availability check re-takes the graph
   read lease on every wake-up.

Lock ordering is locked-node set, then graph, then index map, everywhere.

```no_run
use vargraphs::prelude::*;
use vargraphs::sync::{GraphSynchronizer, RegionLock};

# fn build() -> HashGraph { HashGraph::new() }
let sync = GraphSynchronizer::new(build());
let mut lock = RegionLock::new(&sync, "ref", 100, 5, false);
lock.lock().unwrap();
let edit = EditPath::new("ref", vec![]);
let translations = lock.apply_edit(&edit).unwrap();
lock.unlock();
```
*/

use fxhash::{FxHashMap, FxHashSet};
use log::debug;
use parking_lot::{Condvar, Mutex, RwLock};
use thiserror::Error;

use crate::{handle::*, ops::SequenceGraph, repr::*};

mod path_index;

pub use path_index::PathIndex;

/// Errors surfaced by the synchronizer.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SyncError {
    /// An edit named a node the caller's lock does not cover.
    #[error("cannot edit unlocked node {0}")]
    EditOutsideLock(NodeId),
    /// The operation requires a held lock.
    #[error("no nodes are locked")]
    NotLocked,
    /// The named path is not embedded in the graph.
    #[error("unknown path {0:?}")]
    UnknownPath(String),
}

/// Coordinates shared access to one mutable graph.
pub struct GraphSynchronizer {
    graph: RwLock<HashGraph>,
    indexes: RwLock<FxHashMap<String, RwLock<PathIndex>>>,
    locked_nodes: Mutex<FxHashSet<NodeId>>,
    wait_for_region: Condvar,
}

impl GraphSynchronizer {
    /// Takes ownership of the graph to coordinate.
    pub fn new(graph: HashGraph) -> Self {
        Self {
            graph: RwLock::new(graph),
            indexes: RwLock::new(FxHashMap::default()),
            locked_nodes: Mutex::new(FxHashSet::default()),
            wait_for_region: Condvar::new(),
        }
    }

    /// Runs `f` under a read lease on the graph.
    pub fn with_graph<T>(&self, f: impl FnOnce(&HashGraph) -> T) -> T {
        f(&self.graph.read())
    }

    /// Returns a copy of the cached sequence of the named path, building
    /// its index on first use. Blocks writers while reading.
    pub fn get_path_sequence(&self, path_name: &str) -> Result<String, SyncError> {
        let graph = self.graph.read();
        self.with_path_index_under(&graph, path_name, |index| {
            index.sequence().unwrap_or_default().to_owned()
        })
    }

    /// Runs `f` against the cached index of the named path, building it on
    /// first use.
    pub fn with_path_index<T>(
        &self,
        path_name: &str,
        f: impl FnOnce(&PathIndex) -> T,
    ) -> Result<T, SyncError> {
        let graph = self.graph.read();
        self.with_path_index_under(&graph, path_name, f)
    }

    /// Double-checked index lookup: first under a shared lease on the map,
    /// then, on a miss, under an exclusive one to build the index. Built
    /// indexes live until the synchronizer is dropped.
    fn with_path_index_under<T>(
        &self,
        graph: &HashGraph,
        path_name: &str,
        f: impl FnOnce(&PathIndex) -> T,
    ) -> Result<T, SyncError> {
        {
            let indexes = self.indexes.read();
            if let Some(cell) = indexes.get(path_name) {
                return Ok(f(&cell.read()));
            }
        }

        let mut indexes = self.indexes.write();
        if !indexes.contains_key(path_name) {
            if !graph.has_path(path_name) {
                return Err(SyncError::UnknownPath(path_name.to_owned()));
            }
            debug!("building path index for {path_name:?}");
            indexes.insert(
                path_name.to_owned(),
                RwLock::new(PathIndex::new(graph, path_name, true)),
            );
        }
        let result = f(&indexes[path_name].read());
        Ok(result)
    }

    /// Replays edit translations into every cached index, in place.
    ///
    /// The caller holds the graph writer lease, which serializes all index
    /// mutation; a shared lease on the map is enough since each index has
    /// its own lock.
    fn update_path_indexes(&self, translations: &[Translation]) {
        let indexes = self.indexes.read();
        for cell in indexes.values() {
            cell.write().apply_translations(translations);
        }
    }
}

/// Exclusive ownership of the nodes around a path position.
///
/// Holds the context subgraph extracted at lock time, the periphery (node
/// ids adjacent to but outside the context), and the set of owned ids.
/// Unlocks on drop if still held.
pub struct RegionLock<'a> {
    synchronizer: &'a GraphSynchronizer,
    path_name: String,
    path_offset: usize,
    context_bases: usize,
    reflect: bool,
    locked_nodes: FxHashSet<NodeId>,
    subgraph: Option<HashGraph>,
    periphery: FxHashSet<NodeId>,
}

impl<'a> RegionLock<'a> {
    /// Describes the region to lock: `context_bases` of sequence around
    /// the node at `path_offset` on the named path. Nothing is locked
    /// until [`RegionLock::lock`] succeeds.
    pub fn new(
        synchronizer: &'a GraphSynchronizer,
        path_name: impl Into<String>,
        path_offset: usize,
        context_bases: usize,
        reflect: bool,
    ) -> Self {
        Self {
            synchronizer,
            path_name: path_name.into(),
            path_offset,
            context_bases,
            reflect,
            locked_nodes: FxHashSet::default(),
            subgraph: None,
            periphery: FxHashSet::default(),
        }
    }

    /// Blocks until every node in the region (context and periphery) is
    /// free, then reserves them all atomically. A no-op when already
    /// locked. No two live locks ever share a node id.
    pub fn lock(&mut self) -> Result<(), SyncError> {
        if !self.locked_nodes.is_empty() {
            return Ok(());
        }
        let sync = self.synchronizer;
        let mut taken = sync.locked_nodes.lock();

        loop {
            // The availability check runs under a fresh graph read lease
            // each time around, so it sees all edits committed since the
            // last wake-up.
            let attempt = {
                let graph = sync.graph.read();
                let center = sync.with_path_index_under(&graph, &self.path_name, |index| {
                    index.at_position(self.path_offset)
                })?;
                let (context, periphery) =
                    graph.context_subgraph(center.id(), self.context_bases, self.reflect);

                let mut wanted: FxHashSet<NodeId> = context.node_ids().collect();
                wanted.extend(periphery.iter().copied());
                if wanted.iter().any(|id| taken.contains(id)) {
                    None
                } else {
                    Some((context, periphery, wanted))
                }
            };

            match attempt {
                Some((context, periphery, wanted)) => {
                    debug!(
                        "locking {} nodes around {}:{}",
                        wanted.len(),
                        self.path_name,
                        self.path_offset
                    );
                    taken.extend(wanted.iter().copied());
                    self.locked_nodes = wanted;
                    self.subgraph = Some(context);
                    self.periphery = periphery;
                    return Ok(());
                }
                None => sync.wait_for_region.wait(&mut taken),
            }
        }
    }

    /// Releases every owned node id and wakes all waiters so they can
    /// re-evaluate their regions.
    pub fn unlock(&mut self) {
        if self.locked_nodes.is_empty() {
            return;
        }
        let sync = self.synchronizer;
        {
            let mut taken = sync.locked_nodes.lock();
            for id in self.locked_nodes.drain() {
                taken.remove(&id);
            }
        }
        self.subgraph = None;
        self.periphery.clear();
        sync.wait_for_region.notify_all();
    }

    /// The context subgraph extracted when the lock was taken.
    pub fn subgraph(&self) -> Result<&HashGraph, SyncError> {
        self.subgraph.as_ref().ok_or(SyncError::NotLocked)
    }

    /// Node ids adjacent to the context but not inside it.
    pub fn periphery(&self) -> &FxHashSet<NodeId> {
        &self.periphery
    }

    /// All node ids this lock owns.
    pub fn locked_node_ids(&self) -> &FxHashSet<NodeId> {
        &self.locked_nodes
    }

    /// Applies an edit under the graph writer lease.
    ///
    /// Every node the edit names must be covered by this lock. Node ids
    /// created by the edit are added to the lock, and all cached path
    /// indexes are patched with the resulting translations before the
    /// writer lease is released.
    pub fn apply_edit(&mut self, edit: &EditPath) -> Result<Vec<Translation>, SyncError> {
        if self.locked_nodes.is_empty() {
            return Err(SyncError::NotLocked);
        }
        let sync = self.synchronizer;

        let mut taken = sync.locked_nodes.lock();
        let mut graph = sync.graph.write();

        for op in &edit.ops {
            let node = op.node();
            if !self.locked_nodes.contains(&node) {
                return Err(SyncError::EditOutsideLock(node));
            }
        }

        let translations = graph.apply_edit(edit);

        // The translations' to-walks name every node the edit produced;
        // extend the lock over the fresh ones.
        for t in &translations {
            for id in t.to_node_ids() {
                if self.locked_nodes.insert(id) {
                    taken.insert(id);
                }
            }
        }

        sync.update_path_indexes(&translations);

        Ok(translations)
    }
}

impl Drop for RegionLock<'_> {
    fn drop(&mut self) {
        self.unlock();
    }
}
