//! Phase 3: inbound republication.
//!
//! Every holder that transitively embeds a changed value gets a new value
//! object with the child's current value deep-set at the recorded path.
//! Holders are processed after the children they embed (iterative DFS over
//! the staged outbound lists); in-progress marks break reference cycles, so
//! a cyclic entity pair republishes with one side embedding the other's
//! pre-finalization value.

use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::cache::editor::Editor;
use crate::model::{NodeId, Path};

#[derive(Clone, Copy, Eq, PartialEq)]
enum VisitState {
    InProgress,
    Done,
}

pub(crate) fn rebuild_inbound(editor: &mut Editor) {
    // Closure of the edited set over inbound edges with defined paths.
    // Parameterized edges carry no projection, so they do not propagate.
    let mut order: Vec<NodeId> = editor.edited_ids().cloned().collect();
    let mut members: FxHashSet<NodeId> = order.iter().cloned().collect();
    let mut cursor = 0;
    while cursor < order.len() {
        let id = order[cursor].clone();
        cursor += 1;
        let holders: Vec<NodeId> = editor
            .current_record(&id)
            .map(|record| {
                record
                    .inbound
                    .iter()
                    .filter(|edge| edge.path.is_some())
                    .map(|edge| edge.id.clone())
                    .collect()
            })
            .unwrap_or_default();
        for holder in holders {
            if members.insert(holder.clone()) {
                order.push(holder);
            }
        }
    }

    let mut states: FxHashMap<NodeId, VisitState> = FxHashMap::default();
    for root in &order {
        if !states.contains_key(root) {
            embed_from(editor, root.clone(), &members, &mut states);
        }
    }
}

struct DfsFrame {
    id: NodeId,
    deps: Vec<(NodeId, Path)>,
    next: usize,
}

/// Finalizes `root` and every changed child it embeds, children first.
fn embed_from(
    editor: &mut Editor,
    root: NodeId,
    members: &FxHashSet<NodeId>,
    states: &mut FxHashMap<NodeId, VisitState>,
) {
    states.insert(root.clone(), VisitState::InProgress);
    let mut stack = vec![DfsFrame {
        deps: member_deps(editor, &root, members),
        id: root,
        next: 0,
    }];

    loop {
        let Some(top) = stack.last_mut() else { break };
        if top.next < top.deps.len() {
            let dep = top.deps[top.next].0.clone();
            top.next += 1;
            if !states.contains_key(&dep) {
                states.insert(dep.clone(), VisitState::InProgress);
                let deps = member_deps(editor, &dep, members);
                stack.push(DfsFrame { id: dep, deps, next: 0 });
            }
            continue;
        }
        let Some(frame) = stack.pop() else { break };
        for (target, path) in &frame.deps {
            embed_child(editor, &frame.id, target, path);
        }
        states.insert(frame.id, VisitState::Done);
    }
}

/// The changed children `id` embeds through defined-path outbound edges.
fn member_deps(
    editor: &Editor,
    id: &NodeId,
    members: &FxHashSet<NodeId>,
) -> Vec<(NodeId, Path)> {
    editor
        .current_record(id)
        .map(|record| {
            record
                .outbound
                .iter()
                .filter_map(|edge| {
                    let path = edge.path.clone()?;
                    members
                        .contains(&edge.id)
                        .then(|| (edge.id.clone(), path))
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Deep-sets the target's current value at the holder's recorded path. The
/// holder's value did not semantically change, so this is not an edit; the
/// pointer-equality guard keeps no-op merges free of republication.
fn embed_child(editor: &mut Editor, holder: &NodeId, target: &NodeId, path: &Path) {
    let target_value = editor.current_value(target).cloned();
    let current = editor.current_value_at(holder, path);
    let unchanged = match (current, &target_value) {
        (Some(a), Some(b)) => Arc::ptr_eq(a, b),
        (None, None) => true,
        _ => false,
    };
    if unchanged {
        return;
    }
    editor.set_value_at(holder, path, target_value, false);
    editor.stats.republished += 1;
}
