pub mod cache;
pub mod error;
pub mod model;
pub mod query;
pub mod value;

pub use crate::cache::{
    check_snapshot, CacheConfig, CommitResult, Editor, EditorStats, EntityIdentifier,
    FieldIdentifier, GraphCache, IntegrityReport, NodeRecord, Snapshot,
};
pub use crate::error::{CacheError, Result};
pub use crate::model::{
    default_root_ids, EdgeRef, NodeId, NodeIdSet, Path, PathStep, MUTATION_ROOT, QUERY_ROOT,
    SUBSCRIPTION_ROOT,
};
pub use crate::query::{
    parameterized_id, ArgExpr, EdgeMap, EdgeMapNode, ParameterizedEdge, WriteQuery,
};
pub use crate::value::{value_at, Value};
