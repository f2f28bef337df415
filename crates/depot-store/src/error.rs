/// Errors from ordered store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Failure inside the embedded engine (I/O, corruption, lock held by
    /// another process).
    #[error("storage engine error: {0}")]
    Engine(#[from] sled::Error),

    /// The store handle is already held by another process.
    #[error("store at {path} is locked by another process")]
    LeaseHeld { path: String },
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
