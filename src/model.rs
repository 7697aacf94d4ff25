use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashSet;
use serde::Serialize;
use smallvec::SmallVec;

/// Opaque node identifier. Entity ids are produced by the configured
/// [`EntityIdentifier`](crate::cache::EntityIdentifier), parameterized-value
/// ids by [`parameterized_id`](crate::query::parameterized_id), and root ids
/// are well known.
#[derive(Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct NodeId(Arc<str>);

impl NodeId {
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(Arc::from(id.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

impl From<&str> for NodeId {
    fn from(id: &str) -> Self {
        NodeId::new(id)
    }
}

impl From<String> for NodeId {
    fn from(id: String) -> Self {
        NodeId::new(id)
    }
}

pub const QUERY_ROOT: &str = "QueryRoot";
pub const MUTATION_ROOT: &str = "MutationRoot";
pub const SUBSCRIPTION_ROOT: &str = "SubscriptionRoot";

/// The well-known root ids a fresh cache starts with.
pub fn default_root_ids() -> Vec<NodeId> {
    vec![
        NodeId::new(QUERY_ROOT),
        NodeId::new(MUTATION_ROOT),
        NodeId::new(SUBSCRIPTION_ROOT),
    ]
}

/// One step inside a node's value tree. Serializes as a bare string or
/// integer so paths embed directly into parameterized ids.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize)]
#[serde(untagged)]
pub enum PathStep {
    Field(String),
    Index(usize),
}

impl fmt::Display for PathStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathStep::Field(name) => f.write_str(name),
            PathStep::Index(index) => write!(f, "{index}"),
        }
    }
}

impl From<&str> for PathStep {
    fn from(name: &str) -> Self {
        PathStep::Field(name.to_owned())
    }
}

impl From<usize> for PathStep {
    fn from(index: usize) -> Self {
        PathStep::Index(index)
    }
}

/// A position inside a holder's value, from its root.
pub type Path = SmallVec<[PathStep; 4]>;

/// Set of node ids, hashed with the same fast hasher used across the cache.
pub type NodeIdSet = FxHashSet<NodeId>;

pub(crate) fn format_path(path: &[PathStep]) -> String {
    let mut out = String::new();
    for (i, step) in path.iter().enumerate() {
        if i > 0 {
            out.push('.');
        }
        out.push_str(&step.to_string());
    }
    out
}

/// A directed edge entry as stored on a node record.
///
/// On an inbound list `id` names the holder; on an outbound list it names the
/// target. `path: None` marks a parameterized-value edge: the child has no
/// projection into the holder's own value and is reachable only through the
/// edge itself.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct EdgeRef {
    pub id: NodeId,
    pub path: Option<Path>,
}

impl EdgeRef {
    pub fn new(id: NodeId, path: Option<Path>) -> Self {
        Self { id, path }
    }
}
