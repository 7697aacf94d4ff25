use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::cache::node::NodeRecord;
use crate::model::NodeId;
use crate::value::Value;

/// Immutable mapping from node id to node record, published by
/// [`Editor::commit`](crate::cache::Editor::commit).
///
/// Records of nodes untouched by a transaction are shared with the parent
/// snapshot by pointer, so holding an old snapshot stays cheap and safe while
/// new ones are produced.
#[derive(Clone, Debug, Default)]
pub struct Snapshot {
    nodes: FxHashMap<NodeId, Arc<NodeRecord>>,
}

impl Snapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    pub(crate) fn from_nodes(nodes: FxHashMap<NodeId, Arc<NodeRecord>>) -> Self {
        Self { nodes }
    }

    /// Returns the full record for `id`: value plus edge lists.
    pub fn node(&self, id: &NodeId) -> Option<&Arc<NodeRecord>> {
        self.nodes.get(id)
    }

    /// Returns just the value tree for `id`.
    pub fn get(&self, id: &NodeId) -> Option<&Arc<Value>> {
        self.nodes.get(id).and_then(|record| record.value.as_ref())
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &NodeId> {
        self.nodes.keys()
    }

    pub(crate) fn nodes(&self) -> &FxHashMap<NodeId, Arc<NodeRecord>> {
        &self.nodes
    }
}
