use poolcfg_merge::MergeError;
use poolcfg_store::StoreError;
use thiserror::Error;

/// Errors surfaced by the scoped configuration engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The input is not usable as a configuration record.
    #[error("validation error: {0}")]
    Validation(String),

    /// The store failed, or reported a missing document where one is required.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// A field could not be merged.
    #[error("merge error: {0}")]
    Merge(#[from] MergeError),

    /// A record could not be encoded into or decoded from a document.
    #[error("codec error: {0}")]
    Codec(String),

    /// Engine configuration is invalid or unreadable.
    #[error("configuration error: {0}")]
    Config(String),
}

impl EngineError {
    /// Whether the underlying store reported a missing document.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Store(e) if e.is_not_found())
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
