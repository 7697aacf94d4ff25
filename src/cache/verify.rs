//! Structural integrity checking for committed snapshots.

use std::collections::VecDeque;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::cache::config::CacheConfig;
use crate::cache::snapshot::Snapshot;
use crate::model::{format_path, NodeId, Path};

/// Result of checking a snapshot against the structural invariants.
#[derive(Clone, Debug, Default)]
pub struct IntegrityReport {
    pub violations: Vec<String>,
}

impl IntegrityReport {
    pub fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }
}

/// Validates bidirectional edge symmetry (with multiplicity), edge endpoint
/// existence, and reachability of every record from the root set.
pub fn check_snapshot(snapshot: &Snapshot, config: &CacheConfig) -> IntegrityReport {
    let mut report = IntegrityReport::default();

    let mut counts: FxHashMap<(NodeId, NodeId, Option<Path>), (usize, usize)> =
        FxHashMap::default();
    for (id, record) in snapshot.nodes() {
        for edge in &record.outbound {
            if !snapshot.contains(&edge.id) {
                report
                    .violations
                    .push(format!("dangling outbound edge {id} -> {}", edge.id));
            }
            counts
                .entry((id.clone(), edge.id.clone(), edge.path.clone()))
                .or_default()
                .0 += 1;
        }
        for edge in &record.inbound {
            if !snapshot.contains(&edge.id) {
                report
                    .violations
                    .push(format!("dangling inbound edge {} -> {id}", edge.id));
            }
            counts
                .entry((edge.id.clone(), id.clone(), edge.path.clone()))
                .or_default()
                .1 += 1;
        }
    }
    for ((holder, target, path), (outbound, inbound)) in &counts {
        if outbound != inbound {
            let position = path
                .as_ref()
                .map_or_else(|| "<parameterized>".to_owned(), |p| format_path(p));
            report.violations.push(format!(
                "asymmetric edge {holder} -> {target} at {position}: \
                 {outbound} outbound vs {inbound} inbound"
            ));
        }
    }

    let mut reached: FxHashSet<NodeId> = FxHashSet::default();
    let mut queue: VecDeque<NodeId> = config
        .roots()
        .iter()
        .filter(|id| snapshot.contains(id))
        .cloned()
        .collect();
    reached.extend(queue.iter().cloned());
    while let Some(id) = queue.pop_front() {
        if let Some(record) = snapshot.node(&id) {
            for edge in &record.outbound {
                if snapshot.contains(&edge.id) && reached.insert(edge.id.clone()) {
                    queue.push_back(edge.id.clone());
                }
            }
        }
    }
    for id in snapshot.ids() {
        if !reached.contains(id) {
            report.violations.push(format!("unreachable node {id}"));
        }
    }

    report
}
