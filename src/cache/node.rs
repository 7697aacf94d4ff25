use std::sync::Arc;

use smallvec::SmallVec;

use crate::model::{EdgeRef, NodeId, Path, PathStep};
use crate::value::Value;

/// A single node in the normalized graph: its value tree plus the inbound
/// and outbound edge lists that keep the reference graph bidirectional.
///
/// Edge lists are unordered multisets; an edge appears the same number of
/// times on the holder's outbound list and the target's inbound list.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NodeRecord {
    pub value: Option<Arc<Value>>,
    pub inbound: SmallVec<[EdgeRef; 4]>,
    pub outbound: SmallVec<[EdgeRef; 4]>,
}

impl NodeRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn add_inbound(&mut self, holder: NodeId, path: Option<Path>) {
        self.inbound.push(EdgeRef::new(holder, path));
    }

    pub(crate) fn add_outbound(&mut self, target: NodeId, path: Option<Path>) {
        self.outbound.push(EdgeRef::new(target, path));
    }

    /// Removes one occurrence of the inbound edge `{holder, path}`. Returns
    /// `Some(now_empty)` when an occurrence was removed, `None` when the edge
    /// was not present.
    pub(crate) fn remove_inbound(&mut self, holder: &NodeId, path: &Option<Path>) -> Option<bool> {
        remove_edge(&mut self.inbound, holder, path)
    }

    /// Removes one occurrence of the outbound edge `{target, path}`, with the
    /// same contract as [`NodeRecord::remove_inbound`].
    pub(crate) fn remove_outbound(&mut self, target: &NodeId, path: &Option<Path>) -> Option<bool> {
        remove_edge(&mut self.outbound, target, path)
    }

    /// Finds the outbound reference projected at `path`, if any.
    pub(crate) fn outbound_at(&self, path: &[PathStep]) -> Option<&EdgeRef> {
        self.outbound
            .iter()
            .find(|edge| edge.path.as_ref().is_some_and(|p| p.as_slice() == path))
    }

    /// True when the outbound list already carries a parameterized edge to
    /// `target`.
    pub(crate) fn has_parameterized_edge(&self, target: &NodeId) -> bool {
        self.outbound
            .iter()
            .any(|edge| edge.path.is_none() && edge.id == *target)
    }
}

fn remove_edge(
    edges: &mut SmallVec<[EdgeRef; 4]>,
    id: &NodeId,
    path: &Option<Path>,
) -> Option<bool> {
    let position = edges
        .iter()
        .position(|edge| edge.id == *id && edge.path == *path)?;
    edges.remove(position);
    Some(edges.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use smallvec::smallvec;

    fn path(steps: &[&str]) -> Option<Path> {
        Some(steps.iter().map(|s| (*s).into()).collect())
    }

    #[test]
    fn removal_respects_multiplicity() {
        let mut record = NodeRecord::new();
        record.add_inbound(NodeId::new("h"), path(&["a"]));
        record.add_inbound(NodeId::new("h"), path(&["a"]));

        assert_eq!(record.remove_inbound(&NodeId::new("h"), &path(&["a"])), Some(false));
        assert_eq!(record.remove_inbound(&NodeId::new("h"), &path(&["a"])), Some(true));
        assert_eq!(record.remove_inbound(&NodeId::new("h"), &path(&["a"])), None);
    }

    #[test]
    fn outbound_lookup_matches_exact_path() {
        let mut record = NodeRecord::new();
        record.add_outbound(NodeId::new("t"), path(&["viewer"]));
        record.add_outbound(NodeId::new("p"), None);

        let steps: Path = smallvec![PathStep::Field("viewer".into())];
        assert_eq!(record.outbound_at(&steps).map(|e| e.id.as_str()), Some("t"));
        assert!(record.outbound_at(&[]).is_none());
        assert!(record.has_parameterized_edge(&NodeId::new("p")));
        assert!(!record.has_parameterized_edge(&NodeId::new("t")));
    }
}
