use std::collections::BTreeMap;

use crate::model::NodeId;
use crate::query::EdgeMap;
use crate::value::Value;

/// A write operation against the cache: the parsed edge map for the query
/// document, the bound variable values, and the root the payload applies to.
#[derive(Clone, Debug)]
pub struct WriteQuery {
    pub root_id: NodeId,
    pub edge_map: EdgeMap,
    pub variables: BTreeMap<String, Value>,
}

impl WriteQuery {
    pub fn new(root_id: impl Into<NodeId>, edge_map: EdgeMap) -> Self {
        Self {
            root_id: root_id.into(),
            edge_map,
            variables: BTreeMap::new(),
        }
    }

    pub fn with_variable(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.variables.insert(name.into(), value.into());
        self
    }
}
