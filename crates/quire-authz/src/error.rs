//! Error types for the authorization module.

use quire_core::Id;
use thiserror::Error;

/// Errors that can occur while walking principal hierarchies.
#[derive(Debug, Error)]
pub enum AuthzError {
    /// A parent link points at a user that does not exist.
    #[error("unknown principal: {0}")]
    UnknownPrincipal(Id),

    /// A parent or membership link points at a group that does not exist.
    #[error("unknown group: {0}")]
    UnknownGroup(Id),
}

/// Result type for authorization operations.
pub type Result<T> = std::result::Result<T, AuthzError>;
