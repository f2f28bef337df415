use thiserror::Error;

/// Errors from patch generation, application, and verification.
#[derive(Debug, Error)]
pub enum PatchError {
    /// Binary diff computation failed.
    #[error("diff computation failed: {0}")]
    Diff(std::io::Error),

    /// Applying a patch to its source bytes failed.
    #[error("patch application failed: {0}")]
    Apply(std::io::Error),

    /// Reading or writing a snapshot or patch artifact failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Registry lookup or update failed.
    #[error("registry error: {0}")]
    Registry(#[from] depot_registry::RegistryError),

    /// No ingestion cycle has completed, so there is no current version.
    #[error("registry has no last-download marker; nothing has been ingested")]
    NoCurrentVersion,
}

/// Result alias for patch operations.
pub type PatchResult<T> = Result<T, PatchError>;
