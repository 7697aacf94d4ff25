use std::fmt;
use std::sync::Arc;

use crate::model::{default_root_ids, NodeId};
use crate::value::Value;

/// Resolves the entity identity of a mapping value.
///
/// Returning `Some` makes the value a first-class node with that id;
/// returning `None` leaves it inline inside its container's value tree.
pub trait EntityIdentifier: Send + Sync {
    fn entity_id(&self, value: &Value) -> Option<NodeId>;
}

impl<F> EntityIdentifier for F
where
    F: Fn(&Value) -> Option<NodeId> + Send + Sync,
{
    fn entity_id(&self, value: &Value) -> Option<NodeId> {
        self(value)
    }
}

/// Identifier that reads a single scalar id field (string or integer) from
/// mapping values, the common schema convention.
#[derive(Clone, Debug)]
pub struct FieldIdentifier {
    field: String,
}

impl FieldIdentifier {
    pub fn new(field: impl Into<String>) -> Self {
        Self { field: field.into() }
    }
}

impl EntityIdentifier for FieldIdentifier {
    fn entity_id(&self, value: &Value) -> Option<NodeId> {
        let fields = value.as_map()?;
        match fields.get(self.field.as_str()).map(Arc::as_ref) {
            Some(Value::String(id)) => Some(NodeId::new(id)),
            Some(Value::Int(id)) => Some(NodeId::new(id.to_string())),
            _ => None,
        }
    }
}

/// Cache-wide configuration handed to every editor.
#[derive(Clone)]
pub struct CacheConfig {
    identifier: Arc<dyn EntityIdentifier>,
    strict: bool,
    root_ids: Vec<NodeId>,
}

impl CacheConfig {
    /// Opens a configuration around the one required capability: entity
    /// identity resolution.
    pub fn new(identifier: Arc<dyn EntityIdentifier>) -> Self {
        Self {
            identifier,
            strict: false,
            root_ids: default_root_ids(),
        }
    }

    /// When strict, bookkeeping violations raise instead of being tolerated.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Replaces the well-known root set.
    pub fn root_ids(mut self, root_ids: Vec<NodeId>) -> Self {
        self.root_ids = root_ids;
        self
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.root_ids
    }

    pub(crate) fn is_root(&self, id: &NodeId) -> bool {
        self.root_ids.contains(id)
    }

    pub(crate) fn entity_id(&self, value: &Value) -> Option<NodeId> {
        self.identifier.entity_id(value)
    }
}

impl fmt::Debug for CacheConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheConfig")
            .field("strict", &self.strict)
            .field("root_ids", &self.root_ids)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn field_identifier_reads_string_and_int_ids() {
        let identifier = FieldIdentifier::new("id");
        let by_string = Value::from(json!({"id": "abc"}));
        let by_int = Value::from(json!({"id": 42}));
        let inline = Value::from(json!({"name": "no id"}));

        assert_eq!(identifier.entity_id(&by_string), Some(NodeId::new("abc")));
        assert_eq!(identifier.entity_id(&by_int), Some(NodeId::new("42")));
        assert_eq!(identifier.entity_id(&inline), None);
        assert_eq!(identifier.entity_id(&Value::Int(7)), None);
    }

    #[test]
    fn closures_act_as_identifiers() {
        let config = CacheConfig::new(Arc::new(|value: &Value| {
            value.as_map()?.get("key")?.as_str().map(NodeId::new)
        }));
        let value = Value::from(json!({"key": "k1"}));
        assert_eq!(config.entity_id(&value), Some(NodeId::new("k1")));
    }
}
