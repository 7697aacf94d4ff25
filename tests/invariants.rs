use std::sync::Arc;

use graft::{
    check_snapshot, ArgExpr, CacheConfig, EdgeMap, EdgeMapNode, Editor, FieldIdentifier, NodeId,
    ParameterizedEdge, Snapshot, Value, WriteQuery, QUERY_ROOT,
};
use proptest::prelude::*;
use serde_json::json;

#[derive(Debug, Clone)]
struct EntitySpec {
    id: u8,
    name: String,
    extra: bool,
    friend: Option<u8>,
    tags: Vec<i64>,
}

fn arb_entity() -> impl Strategy<Value = EntitySpec> {
    (
        0u8..6,
        "[a-z]{1,6}",
        any::<bool>(),
        prop::option::of(0u8..6),
        prop::collection::vec(-100i64..100, 0..3),
    )
        .prop_map(|(id, name, extra, friend, tags)| EntitySpec {
            id,
            name,
            extra,
            friend,
            tags,
        })
}

/// One write's worth of entities. Duplicate ids are dropped so payloads stay
/// internally consistent (a conflicting duplicate is a different scenario,
/// covered by the strict-mode tests).
fn arb_write() -> impl Strategy<Value = Vec<EntitySpec>> {
    prop::collection::vec(arb_entity(), 0..5).prop_map(|mut entities| {
        entities.sort_by_key(|entity| entity.id);
        entities.dedup_by_key(|entity| entity.id);
        entities
    })
}

fn items_payload(entities: &[EntitySpec]) -> serde_json::Value {
    let items: Vec<serde_json::Value> = entities
        .iter()
        .map(|entity| {
            json!({
                "id": entity.id,
                "name": entity.name,
                "extra": entity.extra,
                "friend": entity.friend.map(|friend| json!({"id": friend})),
                "tags": entity.tags,
            })
        })
        .collect();
    json!({ "items": items })
}

fn plain_items_query() -> WriteQuery {
    WriteQuery::new(
        QUERY_ROOT,
        EdgeMap::new(EdgeMapNode::default().with_child("items", EdgeMapNode::default())),
    )
}

fn parameterized_items_query() -> WriteQuery {
    let items = EdgeMapNode::parameterized(ParameterizedEdge::new([(
        "first",
        ArgExpr::Variable("first".into()),
    )]));
    WriteQuery::new(
        QUERY_ROOT,
        EdgeMap::new(EdgeMapNode::default().with_child("items", items)),
    )
    .with_variable("first", 10i64)
}

fn entity_config() -> Arc<CacheConfig> {
    Arc::new(CacheConfig::new(Arc::new(FieldIdentifier::new("id"))))
}

/// Canonical serialization of every node value, for before/after comparisons
/// of snapshots that must not be disturbed.
fn fingerprint(snapshot: &Snapshot) -> Vec<(NodeId, String)> {
    let mut entries: Vec<(NodeId, String)> = snapshot
        .ids()
        .map(|id| {
            let value = snapshot.get(id).map(Arc::as_ref).unwrap_or(&Value::Null);
            let json = serde_json::to_string(value).expect("serializable value");
            (id.clone(), json)
        })
        .collect();
    entries.sort();
    entries
}

proptest! {
    #[test]
    fn prop_committed_snapshots_hold_invariants(
        writes in prop::collection::vec(arb_write(), 1..4),
        parameterized in any::<bool>(),
    ) {
        let config = entity_config();
        let query = if parameterized {
            parameterized_items_query()
        } else {
            plain_items_query()
        };

        let mut parent = Arc::new(Snapshot::empty());
        for write in &writes {
            let before = fingerprint(&parent);

            let mut editor = Editor::new(config.clone(), parent.clone());
            editor.merge(&query, items_payload(write)).expect("merge");
            let result = editor.commit();

            // The parent snapshot is untouched by the transaction.
            prop_assert_eq!(before, fingerprint(&parent));

            // Symmetry, endpoint existence, and reachability hold after
            // every commit.
            let report = check_snapshot(&result.snapshot, &config);
            prop_assert!(report.is_clean(), "violations: {:?}", report.violations);

            parent = Arc::new(result.snapshot);
        }

        // Remerging the final payload is a no-op: no edits, and every record
        // is shared with the previous snapshot by pointer.
        let last = writes.last().expect("at least one write");
        let mut editor = Editor::new(config.clone(), parent.clone());
        editor.merge(&query, items_payload(last)).expect("remerge");
        let result = editor.commit();

        prop_assert!(result.edited.is_empty(), "unexpected edits: {:?}", result.edited);
        prop_assert_eq!(result.snapshot.len(), parent.len());
        for id in parent.ids() {
            let original = parent.node(id).expect("parent record");
            let remerged = result.snapshot.node(id).expect("remerged record");
            prop_assert!(Arc::ptr_eq(original, remerged), "record {} was rebuilt", id);
        }
    }

    #[test]
    fn prop_two_merges_equal_one(write in arb_write(), parameterized in any::<bool>()) {
        let config = entity_config();
        let query = if parameterized {
            parameterized_items_query()
        } else {
            plain_items_query()
        };
        let payload = items_payload(&write);

        let mut single = Editor::new(config.clone(), Arc::new(Snapshot::empty()));
        single.merge(&query, payload.clone()).expect("single merge");
        let single = single.commit();

        let mut double = Editor::new(config.clone(), Arc::new(Snapshot::empty()));
        double.merge(&query, payload.clone()).expect("first merge");
        double.merge(&query, payload).expect("second merge");
        let double = double.commit();

        prop_assert_eq!(&single.edited, &double.edited);
        prop_assert_eq!(fingerprint(&single.snapshot), fingerprint(&double.snapshot));
    }
}
