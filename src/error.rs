use thiserror::Error;

pub type Result<T> = std::result::Result<T, CacheError>;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("conflicting entity id: {0}")]
    IdentityConflict(String),
    #[error("edge bookkeeping corruption: {0}")]
    EdgeCorruption(String),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
