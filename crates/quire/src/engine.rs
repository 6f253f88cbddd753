//! The Engine: entry point for every authorization and storage operation.
//!
//! Operations are split across modules by component (`users`, `groups`,
//! `acl`, `index`, `buckets`, `objects`); each adds an `impl` block to
//! [`Engine`]. This module holds the shared plumbing: configuration, caller
//! resolution, transactions, and the access check every component uses.

use std::sync::Arc;
use std::time::Duration;

use quire_authz::Aggregator;
use quire_core::{
    resolve_uid, sys, AccessKind, AclSnapshot, Credential, Group, Id, RecordKind, StateKey,
    User,
};
use quire_store::Store;
use tracing::{debug, info};

use crate::blob::BlobStore;
use crate::error::{EngineError, Result};
use crate::saga;
use crate::txn::Txn;

/// Configuration for the Engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Upper bound on listing page sizes; a requested size of 0 means this.
    pub max_page_size: usize,
    /// Lifetime of presigned blob URLs.
    pub presign_ttl: Duration,
    /// Digest recorded for index-only objects (MD5 of no bytes).
    pub digest_for_empty: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_page_size: 1000,
            presign_ttl: Duration::from_secs(10),
            digest_for_empty: "d41d8cd98f00b204e9800998ecf8427e".to_string(),
        }
    }
}

/// The main Engine struct.
///
/// Provides a unified API for:
/// - Registering users, sub-users, groups and subgroups
/// - Managing ACL templates and testing access
/// - Declaring secondary indexes over object metadata
/// - Creating, reading, listing and removing buckets and objects
pub struct Engine<S: Store, B: BlobStore> {
    store: Arc<S>,
    blobs: Arc<B>,
    config: EngineConfig,
}

impl<S: Store, B: BlobStore> Engine<S, B> {
    /// Create a new engine instance.
    pub fn new(store: S, blobs: B, config: EngineConfig) -> Self {
        Self::from_shared(Arc::new(store), Arc::new(blobs), config)
    }

    /// Create an engine over backends shared with other owners.
    pub fn from_shared(store: Arc<S>, blobs: Arc<B>, config: EngineConfig) -> Self {
        Self {
            store,
            blobs,
            config,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn blobs(&self) -> &B {
        &self.blobs
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Plumbing
    // ─────────────────────────────────────────────────────────────────────────

    pub(crate) fn begin(&self) -> Txn<'_, S> {
        Txn::new(&*self.store)
    }

    pub(crate) async fn commit(&self, txn: Txn<'_, S>) -> Result<()> {
        if txn.is_empty() {
            return Ok(());
        }
        saga::run(&*self.store, &*self.blobs, txn.into_steps()).await
    }

    /// Load the registered user behind a credential.
    pub(crate) async fn caller(&self, txn: &Txn<'_, S>, credential: &dyn Credential) -> Result<User> {
        let uid = resolve_uid(credential)?;
        self.load_user(txn, &uid).await
    }

    pub(crate) async fn load_user(&self, txn: &Txn<'_, S>, uid: &str) -> Result<User> {
        txn.get_record(&StateKey::user(&User::derive_id(uid)))
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("user {}", uid)))
    }

    pub(crate) async fn load_group(&self, txn: &Txn<'_, S>, name: &str) -> Result<Group> {
        txn.get_record(&StateKey::group(&group_id(name)))
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("group {}", name)))
    }

    /// Clamp a requested page size; 0 means the maximum.
    pub(crate) fn page_size(&self, requested: usize) -> usize {
        if requested == 0 || requested > self.config.max_page_size {
            self.config.max_page_size
        } else {
            requested
        }
    }

    /// Test `user` against an applied ACL. A missing or empty ACL grants
    /// nothing.
    pub(crate) async fn acl_allows(
        &self,
        txn: &Txn<'_, S>,
        acl: Option<&AclSnapshot>,
        user: &User,
        bucket: &str,
        access: AccessKind,
    ) -> Result<bool> {
        let Some(acl) = acl.filter(|acl| !acl.is_empty()) else {
            return Ok(false);
        };
        let allowed = Aggregator::new(txn).check(acl, user, bucket, access).await?;
        if !allowed {
            debug!(uid = %user.uid, bucket, ?access, "acl denies access");
        }
        Ok(allowed)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Ledger
    // ─────────────────────────────────────────────────────────────────────────

    /// Bootstrap an empty ledger.
    ///
    /// Registers the caller as a root user holding every system bit and
    /// writes the reserved `none` group. Fails once the ledger holds the
    /// `none` group or any user.
    pub async fn init_ledger(&self, credential: &dyn Credential) -> Result<User> {
        let uid = resolve_uid(credential)?;
        let mut txn = self.begin();

        let any_user = txn.scan_prefix(&StateKey::new(RecordKind::User), 1, None).await?;
        if txn.exists(&StateKey::group(&Id::NONE_GROUP)).await? || !any_user.is_empty() {
            return Err(EngineError::AlreadyExists("ledger already initialized".into()));
        }

        let admin = User::new(uid.clone(), sys::ALL, None);

        txn.put_record(&admin)?;
        txn.put_record(&Group::none())?;
        self.commit(txn).await?;

        info!(uid = %admin.uid, id = %admin.id, "ledger initialized");
        Ok(admin)
    }

    /// The caller's own user record.
    pub async fn whoami(&self, credential: &dyn Credential) -> Result<User> {
        let txn = self.begin();
        self.caller(&txn, credential).await
    }

}

/// Group IDs derive from names, except the reserved `none` group.
pub(crate) fn group_id(name: &str) -> Id {
    if name == Group::NONE {
        Id::NONE_GROUP
    } else {
        Group::derive_id(name)
    }
}
