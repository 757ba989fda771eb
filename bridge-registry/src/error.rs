//! Error types for the bridge-registry crate.

use crate::path::IdentityPath;

/// Errors raised by registry mutations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// A live handle already exists for this path
    #[error("Entity already observed: {0}")]
    AlreadyObserved(IdentityPath),

    /// The configured capacity has been reached
    #[error("Registry is full (max entries: {max_entries})")]
    RegistryFull {
        /// The configured limit
        max_entries: usize,
    },
}

/// Convenience type alias for registry results.
pub type RegistryResult<T> = std::result::Result<T, RegistryError>;
