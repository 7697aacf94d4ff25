//! Phase 4: orphan collection.
//!
//! Nodes flagged by the bookkeeper as having lost their last inbound edge are
//! tombstoned, and their outbound edges removed from the targets' inbound
//! lists; a removal that empties a target's list cascades.

use std::collections::VecDeque;

use crate::cache::editor::Editor;
use crate::error::Result;
use crate::model::{EdgeRef, NodeId, NodeIdSet};

pub(crate) fn collect(editor: &mut Editor, orphans: NodeIdSet) -> Result<()> {
    let mut queue: VecDeque<NodeId> = orphans.into_iter().collect();
    while let Some(id) = queue.pop_front() {
        if editor.config().is_root(&id) {
            continue;
        }
        let Some(record) = editor.current_record(&id) else {
            continue;
        };
        if !record.inbound.is_empty() {
            continue;
        }

        let outbound: Vec<EdgeRef> = record.outbound.to_vec();
        editor.tombstone(&id);
        for edge in outbound {
            if editor.current_record(&edge.id).is_none() {
                continue;
            }
            if editor.remove_inbound_edge(&edge.id, &id, &edge.path)? {
                queue.push_back(edge.id);
            }
        }
    }
    Ok(())
}
