//! Error types for the Engine.

use quire_authz::AuthzError;
use quire_core::{CoreError, IdentityError};
use quire_store::StoreError;
use thiserror::Error;

use crate::blob::BlobError;

/// Errors that can occur during Engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Caller credential could not be read.
    #[error("identity error: {0}")]
    Identity(#[from] IdentityError),

    /// Storage error.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// Blob backend error.
    #[error("blob error: {0}")]
    Blob(#[from] BlobError),

    /// Hierarchy walk hit a dangling reference.
    #[error("authorization error: {0}")]
    Authz(#[from] AuthzError),

    #[error("core error: {0}")]
    Core(#[from] CoreError),

    /// A commit failed and undoing its applied steps failed too.
    #[error("{cause}; {} compensation step(s) failed: {}", .failures.len(), .failures.join("; "))]
    Compensation {
        cause: Box<EngineError>,
        failures: Vec<String>,
    },
}

/// Coarse error taxonomy exposed to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    AlreadyExists,
    PermissionDenied,
    InvalidArgument,
    /// A store, blob or credential collaborator failed.
    Collaborator,
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::AlreadyExists(_) => ErrorKind::AlreadyExists,
            Self::PermissionDenied(_) => ErrorKind::PermissionDenied,
            Self::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Self::Core(err) => match err {
                CoreError::ReservedSeparator(_)
                | CoreError::InvalidAccessCode(_)
                | CoreError::InvalidEntryKind(_)
                | CoreError::InvalidId(_) => ErrorKind::InvalidArgument,
                CoreError::EntryPresent { .. } => ErrorKind::AlreadyExists,
                CoreError::EntryMissing { .. } => ErrorKind::NotFound,
                _ => ErrorKind::Collaborator,
            },
            Self::Store(StoreError::InvalidToken(_)) => ErrorKind::InvalidArgument,
            Self::Store(StoreError::Core(CoreError::ReservedSeparator(_))) => {
                ErrorKind::InvalidArgument
            }
            Self::Authz(AuthzError::UnknownPrincipal(_) | AuthzError::UnknownGroup(_)) => {
                ErrorKind::NotFound
            }
            Self::Identity(_) | Self::Store(_) | Self::Blob(_) => ErrorKind::Collaborator,
            Self::Compensation { cause, .. } => cause.kind(),
        }
    }

    pub(crate) fn denied(what: impl std::fmt::Display) -> Self {
        Self::PermissionDenied(what.to_string())
    }
}

/// Result type for Engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;
