//! Error types for Quire Core.

use thiserror::Error;

use crate::acl::EntryKind;
use crate::types::Id;

/// Core errors: key encoding, record codec, and value validation.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("key segment contains a reserved separator: {0:?}")]
    ReservedSeparator(String),

    #[error("malformed state key: {0}")]
    MalformedKey(String),

    #[error("unknown record kind: {0}")]
    UnknownRecordKind(String),

    #[error("encoding error: {0}")]
    EncodingError(String),

    #[error("decoding error: {0}")]
    DecodingError(String),

    #[error("access code {0} is out of range")]
    InvalidAccessCode(u32),

    #[error("entry kind code {0} is out of range")]
    InvalidEntryKind(u32),

    #[error("invalid identifier: {0}")]
    InvalidId(String),

    #[error("{kind:?} {id} is already in the acl")]
    EntryPresent { kind: EntryKind, id: Id },

    #[error("{kind:?} {id} is not in the acl")]
    EntryMissing { kind: EntryKind, id: Id },
}

/// Failure to read the ambient caller credential.
#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("failed to read issuer from credential: {0}")]
    Issuer(String),

    #[error("failed to read attribute from credential: {0}")]
    Attribute(String),

    #[error("failed to read unique id from credential: {0}")]
    UniqueId(String),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
