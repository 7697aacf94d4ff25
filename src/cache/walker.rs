//! Structural co-traversal of an incoming payload against the current node
//! values.
//!
//! The walk classifies every position in priority order: parameterized edge,
//! entity reference, array, scalar, plain mapping. Scalar and array-shape
//! changes are written immediately; reference changes are collected as edits
//! for the bookkeeper. Nested node walks go through an explicit queue so deep
//! payloads never recurse unboundedly.

use std::collections::VecDeque;
use std::sync::Arc;

use rustc_hash::FxHashMap;
use tracing::warn;

use crate::cache::editor::Editor;
use crate::error::{CacheError, Result};
use crate::model::{format_path, NodeId, Path, PathStep};
use crate::query::{expand_args, parameterized_id, EdgeMapNode, WriteQuery};
use crate::value::Value;

/// A staged change of the reference projected at one `(container, path)`
/// position.
#[derive(Clone, Debug)]
pub(crate) struct ReferenceEdit {
    pub container: NodeId,
    pub path: Path,
    pub prev: Option<NodeId>,
    pub next: Option<NodeId>,
    /// False when the walk already wrote a non-reference value at this
    /// position and only the edge pair needs updating.
    pub write_target: bool,
}

struct PendingWalk<'q> {
    container: NodeId,
    payload: Arc<Value>,
    edge_tree: Option<&'q EdgeMapNode>,
    visit_root: bool,
}

struct Frame<'q> {
    path: Path,
    payload: Arc<Value>,
    edge_tree: Option<&'q EdgeMapNode>,
    is_root: bool,
    /// True once the edge-map node's parameterized marker has fired for this
    /// position. Index steps stay on the same node and inherit the flag;
    /// field steps move to a child node and reset it.
    param_consumed: bool,
}

/// Phase 1: walks the payload, applying value writes to the staged state and
/// returning the reference edits to apply, deduplicated per position with the
/// last walk-order edit winning.
pub(crate) fn walk_merge(
    editor: &mut Editor,
    query: &WriteQuery,
    payload: Arc<Value>,
) -> Result<Vec<ReferenceEdit>> {
    let mut queue = VecDeque::new();
    queue.push_back(PendingWalk {
        container: query.root_id.clone(),
        payload,
        edge_tree: Some(&query.edge_map.root),
        visit_root: false,
    });

    let mut edits = EditLog::default();
    while let Some(walk) = queue.pop_front() {
        walk_node(editor, query, walk, &mut queue, &mut edits)?;
    }
    Ok(edits.into_edits())
}

fn walk_node<'q>(
    editor: &mut Editor,
    query: &'q WriteQuery,
    walk: PendingWalk<'q>,
    queue: &mut VecDeque<PendingWalk<'q>>,
    edits: &mut EditLog,
) -> Result<()> {
    let mut stack = vec![Frame {
        path: Path::new(),
        payload: walk.payload.clone(),
        edge_tree: walk.edge_tree,
        is_root: true,
        param_consumed: true,
    }];

    while let Some(frame) = stack.pop() {
        if frame.is_root && !walk.visit_root {
            descend(&mut stack, &frame);
            continue;
        }

        // Parameterized edge: mint the child id, keep the edge pair, and walk
        // the payload as that child. The marker fires once per field
        // position; the nested walk may immediately reclassify the payload
        // as an entity.
        if !frame.param_consumed {
            if let Some(edge) = frame.edge_tree.and_then(|tree| tree.parameterized.as_ref()) {
                let args = expand_args(
                    &edge.args,
                    &query.variables,
                    &query.edge_map.variable_defaults,
                );
                let child = parameterized_id(&walk.container, &frame.path, &args)?;
                editor.ensure_parameterized_edge(&walk.container, &child);
                queue.push_back(PendingWalk {
                    container: child,
                    payload: frame.payload.clone(),
                    edge_tree: frame.edge_tree,
                    visit_root: true,
                });
                continue;
            }
        }

        let is_map = matches!(frame.payload.as_ref(), Value::Map(_));
        let next = if is_map {
            editor.config().entity_id(&frame.payload)
        } else {
            None
        };
        let prev = editor.outbound_ref_at(&walk.container, &frame.path);

        // Entity reference: a mapping carrying its own id, or a mapping
        // merged into the entity the position already references.
        if is_map && (next.is_some() || prev.is_some()) {
            if let Some(next_id) = next.or_else(|| prev.clone()) {
                if prev.as_ref() != Some(&next_id) {
                    edits.record(
                        editor.config().is_strict(),
                        ReferenceEdit {
                            container: walk.container.clone(),
                            path: frame.path.clone(),
                            prev,
                            next: Some(next_id.clone()),
                            write_target: true,
                        },
                    )?;
                }
                queue.push_back(PendingWalk {
                    container: next_id,
                    payload: frame.payload.clone(),
                    edge_tree: frame.edge_tree,
                    visit_root: false,
                });
            }
            continue;
        }

        // The position stops being a reference: null clears it through the
        // bookkeeper, any other payload overwrites it below.
        if let Some(prev_id) = prev {
            let replaced_by_value = !matches!(frame.payload.as_ref(), Value::Null);
            edits.record(
                editor.config().is_strict(),
                ReferenceEdit {
                    container: walk.container.clone(),
                    path: frame.path.clone(),
                    prev: Some(prev_id),
                    next: None,
                    write_target: !replaced_by_value,
                },
            )?;
            if !replaced_by_value {
                continue;
            }
        }

        if let Value::Array(items) = frame.payload.as_ref() {
            let current_items = editor
                .current_value_at(&walk.container, &frame.path)
                .and_then(|value| value.as_array())
                .map(<[_]>::to_vec);
            let same_len = current_items
                .as_ref()
                .is_some_and(|current| current.len() == items.len());
            if !same_len {
                // Replacing a non-array drops every nested reference; a
                // reshaped array only drops the truncated tail.
                let keep_len = current_items.as_ref().map(|_| items.len());
                sweep_stale_refs(editor, &walk.container, &frame.path, keep_len, edits)?;
                let mut prefix = current_items.unwrap_or_default();
                prefix.truncate(items.len());
                prefix.resize(items.len(), None);
                editor.set_value_at(
                    &walk.container,
                    &frame.path,
                    Some(Arc::new(Value::Array(prefix))),
                    true,
                );
                editor.stats.value_writes += 1;
            }
            descend(&mut stack, &frame);
            continue;
        }

        if frame.payload.is_scalar() {
            let changed = editor
                .current_value_at(&walk.container, &frame.path)
                .map_or(true, |value| value.as_ref() != frame.payload.as_ref());
            if changed {
                sweep_stale_refs(editor, &walk.container, &frame.path, None, edits)?;
                editor.set_value_at(
                    &walk.container,
                    &frame.path,
                    Some(frame.payload.clone()),
                    true,
                );
                editor.stats.value_writes += 1;
            }
            continue;
        }

        // Plain mapping with no identity: its fields live inline in the
        // container's value.
        descend(&mut stack, &frame);
    }
    Ok(())
}

/// Records removal edits for references the container holds below an
/// overwritten position: everything under it for a scalar write, the dropped
/// tail (and anything nested beneath it) for an array reshape. Without the
/// sweep those edges would dangle after the value they project into is gone.
fn sweep_stale_refs(
    editor: &Editor,
    container: &NodeId,
    base: &Path,
    keep_len: Option<usize>,
    edits: &mut EditLog,
) -> Result<()> {
    let Some(record) = editor.current_record(container) else {
        return Ok(());
    };
    let stale: Vec<(NodeId, Path)> = record
        .outbound
        .iter()
        .filter_map(|edge| {
            let path = edge.path.as_ref()?;
            if path.len() <= base.len() || !path.starts_with(base) {
                return None;
            }
            if let Some(keep_len) = keep_len {
                match &path[base.len()] {
                    PathStep::Index(index) if *index >= keep_len => {}
                    _ => return None,
                }
            }
            Some((edge.id.clone(), path.clone()))
        })
        .collect();
    for (prev, path) in stale {
        edits.record(
            editor.config().is_strict(),
            ReferenceEdit {
                container: container.clone(),
                path,
                prev: Some(prev),
                next: None,
                write_target: false,
            },
        )?;
    }
    Ok(())
}

/// Pushes the payload's children, reversed so the pop order matches the
/// natural field/index order. Field steps descend the edge map and re-arm
/// the parameterized marker; index steps stay on the same edge-map node and
/// keep its consumed state.
fn descend<'q>(stack: &mut Vec<Frame<'q>>, frame: &Frame<'q>) {
    match frame.payload.as_ref() {
        Value::Map(fields) => {
            for (name, child) in fields.iter().rev() {
                let mut path = frame.path.clone();
                path.push(PathStep::Field(name.clone()));
                stack.push(Frame {
                    path,
                    payload: child.clone(),
                    edge_tree: frame
                        .edge_tree
                        .and_then(|tree| tree.children.get(name.as_str())),
                    is_root: false,
                    param_consumed: false,
                });
            }
        }
        Value::Array(items) => {
            for (index, item) in items.iter().enumerate().rev() {
                if let Some(item) = item {
                    let mut path = frame.path.clone();
                    path.push(PathStep::Index(index));
                    stack.push(Frame {
                        path,
                        payload: item.clone(),
                        edge_tree: frame.edge_tree,
                        is_root: false,
                        param_consumed: frame.param_consumed,
                    });
                }
            }
        }
        _ => {}
    }
}

#[derive(Default)]
struct EditLog {
    edits: Vec<ReferenceEdit>,
    index: FxHashMap<(NodeId, Path), usize>,
}

impl EditLog {
    fn record(&mut self, strict: bool, edit: ReferenceEdit) -> Result<()> {
        let key = (edit.container.clone(), edit.path.clone());
        if let Some(&slot) = self.index.get(&key) {
            if self.edits[slot].next != edit.next {
                let detail = format!(
                    "{} and {} both written at {}.{}",
                    describe(&self.edits[slot].next),
                    describe(&edit.next),
                    edit.container,
                    format_path(&edit.path),
                );
                if strict {
                    return Err(CacheError::IdentityConflict(detail));
                }
                warn!(detail = %detail, "Conflicting reference edits; last write wins");
            }
            self.edits[slot] = edit;
        } else {
            self.index.insert(key, self.edits.len());
            self.edits.push(edit);
        }
        Ok(())
    }

    fn into_edits(self) -> Vec<ReferenceEdit> {
        self.edits
    }
}

fn describe(id: &Option<NodeId>) -> &str {
    id.as_ref().map_or("null", NodeId::as_str)
}
