use thiserror::Error;

/// Errors from version registry operations.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The requested key has no record.
    #[error("no registry entry under key {key:?}")]
    NotFound { key: String },

    /// A persisted key or value does not parse back into a record.
    #[error("corrupt registry entry {key:?}: {reason}")]
    Corrupt { key: String, reason: String },

    /// Failure in the underlying ordered store.
    #[error("store error: {0}")]
    Store(#[from] depot_store::StoreError),
}

/// Result alias for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;
