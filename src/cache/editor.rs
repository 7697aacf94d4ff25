use std::sync::Arc;

use rustc_hash::FxHashMap;
use tracing::{debug, info, warn};

use crate::cache::config::CacheConfig;
use crate::cache::node::NodeRecord;
use crate::cache::path_set::deep_set;
use crate::cache::snapshot::Snapshot;
use crate::cache::walker::{self, ReferenceEdit};
use crate::cache::{orphan, rebuild};
use crate::error::{CacheError, Result};
use crate::model::{NodeId, NodeIdSet, Path, PathStep};
use crate::query::WriteQuery;
use crate::value::{value_at, Value};

/// Output of a committed transaction: the new snapshot plus every id whose
/// value content changed, deletions included.
#[derive(Debug)]
pub struct CommitResult {
    pub snapshot: Snapshot,
    pub edited: NodeIdSet,
}

/// Aggregate counters captured while a transaction runs.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct EditorStats {
    /// Scalar and array-shape writes applied during payload walks.
    pub value_writes: u64,
    /// Reference edits applied by the bookkeeper.
    pub reference_edits: u64,
    /// Holder values republished because an embedded child changed.
    pub republished: u64,
    /// Records deleted by the orphan sweep.
    pub orphaned: u64,
}

/// A single write transaction staged over a parent snapshot.
///
/// All mutation is confined to the private new-node table; parent records and
/// their value trees are never touched, so the parent snapshot stays valid
/// for concurrent readers whether or not the transaction commits.
pub struct Editor {
    config: Arc<CacheConfig>,
    parent: Arc<Snapshot>,
    new_nodes: FxHashMap<NodeId, Option<NodeRecord>>,
    edited: NodeIdSet,
    pub(crate) stats: EditorStats,
}

impl Editor {
    pub fn new(config: Arc<CacheConfig>, parent: Arc<Snapshot>) -> Self {
        debug!(parent_nodes = parent.len(), "Cache transaction opened");
        Self {
            config,
            parent,
            new_nodes: FxHashMap::default(),
            edited: NodeIdSet::default(),
            stats: EditorStats::default(),
        }
    }

    pub fn stats(&self) -> EditorStats {
        self.stats
    }

    /// Merges one payload into the staged state, in four ordered phases:
    /// payload walk (scalar writes + reference collection), reference edit
    /// application, inbound republication, orphan collection.
    ///
    /// An error leaves the editor poisoned; the host discards it and the
    /// parent snapshot is unaffected.
    pub fn merge(&mut self, query: &WriteQuery, payload: impl Into<Value>) -> Result<()> {
        let payload = Arc::new(payload.into());
        debug!(root = %query.root_id, "Merge started");

        let edits = walker::walk_merge(self, query, payload)?;
        let mut orphans = self.apply_reference_edits(edits)?;
        rebuild::rebuild_inbound(self);
        // Staged records that never gained an inbound edge (for example an
        // entity whose reference edit was superseded) are unreachable too.
        for (id, staged) in &self.new_nodes {
            if let Some(record) = staged {
                if record.inbound.is_empty() && !self.config.is_root(id) {
                    orphans.insert(id.clone());
                }
            }
        }
        orphan::collect(self, orphans)?;

        debug!(
            value_writes = self.stats.value_writes,
            reference_edits = self.stats.reference_edits,
            "Merge completed"
        );
        Ok(())
    }

    /// Seals the transaction: overlays the staged records on the parent's
    /// node table, dropping tombstones, and publishes the result.
    pub fn commit(self) -> CommitResult {
        let mut nodes = self.parent.nodes().clone();
        for (id, staged) in self.new_nodes {
            match staged {
                Some(record) => {
                    nodes.insert(id, Arc::new(record));
                }
                None => {
                    nodes.remove(&id);
                }
            }
        }
        info!(
            nodes = nodes.len(),
            edited = self.edited.len(),
            "Cache transaction committed"
        );
        CommitResult {
            snapshot: Snapshot::from_nodes(nodes),
            edited: self.edited,
        }
    }

    pub(crate) fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub(crate) fn edited_ids(&self) -> impl Iterator<Item = &NodeId> {
        self.edited.iter()
    }

    /// Staged record if present (tombstones read as absent), else the
    /// parent's.
    pub(crate) fn current_record(&self, id: &NodeId) -> Option<&NodeRecord> {
        match self.new_nodes.get(id) {
            Some(staged) => staged.as_ref(),
            None => self.parent.node(id).map(Arc::as_ref),
        }
    }

    pub(crate) fn current_value(&self, id: &NodeId) -> Option<&Arc<Value>> {
        self.current_record(id).and_then(|record| record.value.as_ref())
    }

    pub(crate) fn current_value_at(&self, id: &NodeId, path: &[PathStep]) -> Option<&Arc<Value>> {
        value_at(self.current_value(id), path)
    }

    pub(crate) fn outbound_ref_at(&self, id: &NodeId, path: &[PathStep]) -> Option<NodeId> {
        self.current_record(id)?
            .outbound_at(path)
            .map(|edge| edge.id.clone())
    }

    /// Promotes a record into the staged table, cloning the parent's on first
    /// touch. A tombstoned id promotes to a fresh empty record.
    fn staged_mut(&mut self, id: &NodeId) -> &mut NodeRecord {
        let parent = &self.parent;
        let slot = self.new_nodes.entry(id.clone()).or_insert_with(|| {
            Some(
                parent
                    .node(id)
                    .map(|record| NodeRecord::clone(record))
                    .unwrap_or_default(),
            )
        });
        slot.get_or_insert_with(NodeRecord::default)
    }

    /// Deep-sets `leaf` at `path` inside the staged value of `id`. `is_edit`
    /// distinguishes content changes (which join the edited set) from
    /// republication-only identity changes.
    pub(crate) fn set_value_at(
        &mut self,
        id: &NodeId,
        path: &[PathStep],
        leaf: Option<Arc<Value>>,
        is_edit: bool,
    ) {
        let record = self.staged_mut(id);
        record.value = deep_set(record.value.take(), path, leaf);
        if is_edit {
            self.edited.insert(id.clone());
        }
    }

    /// Idempotently adds the parameterized edge pair `container -> child`
    /// with no value projection. Edge-only changes do not join the edited
    /// set.
    pub(crate) fn ensure_parameterized_edge(&mut self, container: &NodeId, child: &NodeId) {
        let exists = self
            .current_record(container)
            .is_some_and(|record| record.has_parameterized_edge(child));
        if exists {
            return;
        }
        self.staged_mut(container).add_outbound(child.clone(), None);
        self.staged_mut(child).add_inbound(container.clone(), None);
    }

    /// Removes one inbound edge occurrence from `target`, reporting whether
    /// the inbound list emptied (an orphan candidate).
    pub(crate) fn remove_inbound_edge(
        &mut self,
        target: &NodeId,
        holder: &NodeId,
        path: &Option<Path>,
    ) -> Result<bool> {
        match self.staged_mut(target).remove_inbound(holder, path) {
            Some(now_empty) => Ok(now_empty),
            None => {
                self.tolerate_edge_violation(format!(
                    "missing inbound edge {holder} -> {target}"
                ))?;
                Ok(false)
            }
        }
    }

    /// Marks `id` deleted and observable as such through the edited set.
    pub(crate) fn tombstone(&mut self, id: &NodeId) {
        debug!(node = %id, "Orphan collected");
        self.new_nodes.insert(id.clone(), None);
        self.edited.insert(id.clone());
        self.stats.orphaned += 1;
    }

    /// Raises in strict mode, tolerates with a warning otherwise.
    pub(crate) fn tolerate_edge_violation(&self, detail: String) -> Result<()> {
        if self.config.is_strict() {
            return Err(CacheError::EdgeCorruption(detail));
        }
        warn!(detail = %detail, "Edge bookkeeping violation tolerated");
        Ok(())
    }

    /// Phase 2: applies the reference edits collected by the walk, keeping
    /// inbound/outbound lists symmetric and flagging orphan candidates.
    fn apply_reference_edits(&mut self, edits: Vec<ReferenceEdit>) -> Result<NodeIdSet> {
        let mut orphans = NodeIdSet::default();
        for edit in edits {
            self.stats.reference_edits += 1;
            let ReferenceEdit {
                container,
                path,
                prev,
                next,
                write_target,
            } = edit;
            let stored_path = Some(path.clone());

            if write_target {
                let leaf = match &next {
                    Some(id) => self.current_value(id).cloned(),
                    None => Some(Arc::new(Value::Null)),
                };
                self.set_value_at(&container, &path, leaf, true);
            }

            if let Some(prev_id) = prev {
                if self
                    .staged_mut(&container)
                    .remove_outbound(&prev_id, &stored_path)
                    .is_none()
                {
                    self.tolerate_edge_violation(format!(
                        "missing outbound edge {container} -> {prev_id}"
                    ))?;
                }
                if self.remove_inbound_edge(&prev_id, &container, &stored_path)? {
                    orphans.insert(prev_id);
                }
            }

            if let Some(next_id) = next {
                self.staged_mut(&container)
                    .add_outbound(next_id.clone(), stored_path.clone());
                self.staged_mut(&next_id)
                    .add_inbound(container.clone(), stored_path);
                orphans.remove(&next_id);
            }
        }
        Ok(orphans)
    }
}
