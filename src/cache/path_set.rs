//! Copy-on-write deep set over shared value trees.
//!
//! Prefixes of the target path that still alias the parent snapshot are
//! shallow-cloned; prefixes already cloned during the current transaction are
//! unique behind their `Arc` and mutate in place. Subtrees off the path keep
//! their pointers, so everything not written stays shared with the input.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::model::PathStep;
use crate::value::Value;

/// Reassigns `path` inside `current` to `leaf`, returning the new root.
///
/// Intermediate containers are created to match the step kind (field step =>
/// map, index step => array). A `None` leaf removes a map key, but leaves a
/// hole at an array index rather than shortening the array.
pub(crate) fn deep_set(
    current: Option<Arc<Value>>,
    path: &[PathStep],
    leaf: Option<Arc<Value>>,
) -> Option<Arc<Value>> {
    let Some((step, rest)) = path.split_first() else {
        return leaf;
    };

    let mut node = match current {
        Some(value) if kind_matches(&value, step) => value,
        _ => Arc::new(empty_container(step)),
    };

    match (Arc::make_mut(&mut node), step) {
        (Value::Map(fields), PathStep::Field(name)) => {
            if let Some(child) = deep_set(fields.remove(name.as_str()), rest, leaf) {
                fields.insert(name.clone(), child);
            }
        }
        (Value::Array(items), PathStep::Index(index)) => {
            if items.len() <= *index {
                items.resize(*index + 1, None);
            }
            items[*index] = deep_set(items[*index].take(), rest, leaf);
        }
        // `node` was normalized to the step kind above.
        _ => {}
    }
    Some(node)
}

fn kind_matches(value: &Value, step: &PathStep) -> bool {
    matches!(
        (value, step),
        (Value::Map(_), PathStep::Field(_)) | (Value::Array(_), PathStep::Index(_))
    )
}

fn empty_container(step: &PathStep) -> Value {
    match step {
        PathStep::Field(_) => Value::Map(BTreeMap::new()),
        PathStep::Index(_) => Value::Array(Vec::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn steps(raw: &[&str]) -> Vec<PathStep> {
        raw.iter().map(|s| (*s).into()).collect()
    }

    #[test]
    fn set_creates_intermediate_containers() {
        let path = [
            PathStep::Field("one".into()),
            PathStep::Index(1),
            PathStep::Field("two".into()),
        ];
        let root = deep_set(None, &path, Some(Arc::new(Value::Int(7)))).expect("root");

        let two = crate::value::value_at(Some(&root), &path).expect("two");
        assert_eq!(two.as_ref(), &Value::Int(7));
        let one = crate::value::value_at(Some(&root), &steps(&["one"]))
            .expect("one")
            .as_array()
            .expect("array")
            .to_vec();
        assert_eq!(one.len(), 2);
        assert!(one[0].is_none());
    }

    #[test]
    fn untouched_siblings_keep_their_pointers() {
        let shared = Arc::new(Value::from(json!({"a": {"x": 1}, "b": {"y": 2}})));
        let sibling = crate::value::value_at(Some(&shared), &steps(&["b"]))
            .expect("sibling")
            .clone();

        let updated = deep_set(
            Some(shared.clone()),
            &steps(&["a", "x"]),
            Some(Arc::new(Value::Int(9))),
        )
        .expect("root");

        // The original tree is untouched; the new tree shares the sibling.
        assert_eq!(shared.as_ref(), &Value::from(json!({"a": {"x": 1}, "b": {"y": 2}})));
        let new_sibling =
            crate::value::value_at(Some(&updated), &steps(&["b"])).expect("sibling");
        assert!(Arc::ptr_eq(new_sibling, &sibling));
        assert_eq!(updated.as_ref(), &Value::from(json!({"a": {"x": 9}, "b": {"y": 2}})));
    }

    #[test]
    fn transaction_private_prefixes_mutate_in_place() {
        let first = deep_set(None, &steps(&["a", "x"]), Some(Arc::new(Value::Int(1))))
            .expect("root");
        let before = Arc::as_ptr(&first);
        let second = deep_set(Some(first), &steps(&["a", "y"]), Some(Arc::new(Value::Int(2))))
            .expect("root");
        assert_eq!(Arc::as_ptr(&second), before);
        assert_eq!(second.as_ref(), &Value::from(json!({"a": {"x": 1, "y": 2}})));
    }

    #[test]
    fn unsetting_an_array_slot_leaves_a_hole() {
        let root = deep_set(
            None,
            &[PathStep::Field("list".into()), PathStep::Index(2)],
            Some(Arc::new(Value::Bool(true))),
        )
        .expect("root");
        let root = deep_set(Some(root), &[PathStep::Field("list".into()), PathStep::Index(2)], None)
            .expect("root");

        let list = crate::value::value_at(Some(&root), &steps(&["list"]))
            .expect("list")
            .as_array()
            .expect("array")
            .to_vec();
        assert_eq!(list.len(), 3);
        assert!(list.iter().all(|slot| slot.is_none()));
    }

    #[test]
    fn unsetting_a_map_key_removes_it() {
        let root = deep_set(
            Some(Arc::new(Value::from(json!({"keep": 1, "drop": 2})))),
            &steps(&["drop"]),
            None,
        )
        .expect("root");
        assert_eq!(root.as_ref(), &Value::from(json!({"keep": 1})));
    }

    #[test]
    fn mismatched_container_kind_is_replaced() {
        let root = deep_set(
            Some(Arc::new(Value::from(json!({"slot": "scalar"})))),
            &[PathStep::Field("slot".into()), PathStep::Index(0)],
            Some(Arc::new(Value::Int(5))),
        )
        .expect("root");
        assert_eq!(root.as_ref(), &Value::from(json!({"slot": [5]})));
    }

    #[test]
    fn empty_path_replaces_the_whole_value() {
        let leaf = Arc::new(Value::Int(3));
        let out = deep_set(Some(Arc::new(Value::Null)), &[], Some(leaf.clone()));
        assert!(out.is_some_and(|v| Arc::ptr_eq(&v, &leaf)));
        assert!(deep_set(Some(Arc::new(Value::Null)), &[], None).is_none());
    }
}
