//! # Quire
//!
//! Hierarchical authorization and secondary indexing for a ledger-backed
//! object store.
//!
//! ## Overview
//!
//! Quire decides who may do what to buckets and objects whose bytes live in
//! a blob store while all bookkeeping lives in an ordered key-value ledger:
//!
//! - **Principals**: users form a tree of sub-users; each link narrows what
//!   the parent inherits over the child, per bucket
//! - **Groups**: named, owned, with members and a tree of subgroups
//! - **ACL templates**: editable user/group grants, snapshotted by value onto
//!   buckets and objects
//! - **Indexes**: per-owner lookups of objects by a metadata value
//! - **Objects**: created through presigned uploads, listed, queried and
//!   removed into delete records
//!
//! ## Key Concepts
//!
//! - **Effective permission**: the AND of every link grant between a
//!   principal and one of its ancestors. The walk stops at the first link
//!   that grants nothing.
//! - **Access test**: an ACL allows an access kind when any entry carrying
//!   that bit matches the caller's inherited user or group rights. There is
//!   no deny.
//! - **Atomic operations**: every operation buffers its writes and commits
//!   them as a compensating saga.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use quire::{Engine, EngineConfig, MemoryBlobStore, NewObject};
//! use quire::core::{sys, KeyCredential, Keypair, UID_ATTRIBUTE};
//! use quire::store::SqliteStore;
//!
//! async fn example() -> quire::Result<()> {
//!     let store = SqliteStore::open("quire.db")?;
//!     let engine = Engine::new(store, MemoryBlobStore::new(), EngineConfig::default());
//!
//!     let admin = KeyCredential::new("org1", &Keypair::generate())
//!         .with_attribute(UID_ATTRIBUTE, "admin");
//!     engine.init_ledger(&admin).await?;
//!     engine.add_bucket(&admin, "photos").await?;
//!
//!     let upload_url = engine
//!         .create_object(&admin, "photos", NewObject::new("cat.png").content(1024, "9f86d0"))
//!         .await?;
//!     // PUT the bytes to `upload_url`, then:
//!     engine.commit_object(&admin, "photos", "cat.png").await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `quire::core` - Records, keys, identifiers and permission bits
//! - `quire::store` - Storage abstraction, in-memory and SQLite backends
//! - `quire::authz` - Permission aggregation and the access predicate

pub mod acl;
pub mod blob;
pub mod engine;
pub mod error;
pub mod objects;

mod buckets;
mod groups;
mod index;
mod inherit;
mod saga;
mod txn;
mod users;

pub use quire_authz as authz;
pub use quire_core as core;
pub use quire_store as store;

pub use acl::AclTest;
pub use blob::{BlobError, BlobStore, MemoryBlobStore};
pub use engine::{Engine, EngineConfig};
pub use error::{EngineError, ErrorKind, Result};
pub use objects::NewObject;

pub use quire_core::{
    AccessKind, AclSnapshot, AclTemplate, Bucket, Credential, DeleteRecord, EntryKind, Group, Id,
    IndexRecord, KeyCredential, Keypair, Object, ObjectListing, PermissionMap, User,
};
