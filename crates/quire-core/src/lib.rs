//! # Quire Core
//!
//! Pure primitives for Quire: identifiers, permission bits, structured state
//! keys, principal and object records, ACL templates.
//!
//! This crate contains no I/O and no storage. Everything here is data plus
//! the rules that operate on data alone.
//!
//! ## Key Types
//!
//! - [`Id`] - Deterministic 32-byte identifier (Blake3 derive)
//! - [`StateKey`] - Record kind plus segments, NUL-framed for prefix scans
//! - [`User`], [`Group`] - Hierarchical principals with per-bucket links
//! - [`AclTemplate`] / [`AclSnapshot`] - Editable ACLs and their frozen copies
//! - [`Object`], [`Bucket`], [`IndexRecord`] - Storage-side records
//! - [`Credential`] - Host-supplied caller identity
//!
//! ## Encoding
//!
//! Records are stored as CBOR. See the [`codec`] module.

pub mod acl;
pub mod codec;
pub mod crypto;
pub mod error;
pub mod identity;
pub mod key;
pub mod perms;
pub mod records;
pub mod types;

pub use acl::{AclEntry, AclSnapshot, AclTemplate, EntryKind, SnapshotEntry};
pub use crypto::{Ed25519PublicKey, Keypair};
pub use error::{CoreError, IdentityError, Result};
pub use identity::{resolve_uid, Credential, KeyCredential, UID_ATTRIBUTE};
pub use key::{RecordKind, StateKey};
pub use perms::{access, sys, AccessKind};
pub use records::{
    seed_map, Bucket, DeleteRecord, Group, IndexRecord, ListingObject, Object,
    ObjectFlags, ObjectListing, PermissionMap, Record, SubGroup, SubUser, User,
};
pub use types::Id;

/// Current time in Unix milliseconds.
pub fn now_millis() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
