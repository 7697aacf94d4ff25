use std::sync::Arc;

use parking_lot::RwLock;

use crate::cache::config::CacheConfig;
use crate::cache::editor::Editor;
use crate::cache::snapshot::Snapshot;
use crate::error::Result;
use crate::model::NodeIdSet;
use crate::query::WriteQuery;
use crate::value::Value;

/// The cache front: owns the configuration and the currently published
/// snapshot, and serializes write transactions against it.
///
/// Readers hold snapshots across writes freely; a published snapshot is never
/// mutated.
pub struct GraphCache {
    config: Arc<CacheConfig>,
    current: RwLock<Arc<Snapshot>>,
}

impl GraphCache {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config: Arc::new(config),
            current: RwLock::new(Arc::new(Snapshot::empty())),
        }
    }

    pub fn config(&self) -> &Arc<CacheConfig> {
        &self.config
    }

    /// Hands out the currently published snapshot.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.current.read().clone()
    }

    /// Runs a write transaction and publishes its snapshot, returning the
    /// edited id set. An error from the closure discards the staged state and
    /// leaves the published snapshot untouched.
    pub fn transact<F>(&self, build: F) -> Result<NodeIdSet>
    where
        F: FnOnce(&mut Editor) -> Result<()>,
    {
        let mut current = self.current.write();
        let mut editor = Editor::new(self.config.clone(), current.clone());
        build(&mut editor)?;
        let result = editor.commit();
        *current = Arc::new(result.snapshot);
        Ok(result.edited)
    }

    /// Merges a single payload in its own transaction.
    pub fn merge(
        &self,
        query: &WriteQuery,
        payload: impl Into<Value>,
    ) -> Result<NodeIdSet> {
        self.transact(|editor| editor.merge(query, payload))
    }
}
