//! User and sub-user management.

use std::collections::BTreeMap;

use quire_core::{sys, Credential, Id, RecordKind, StateKey, SubUser, User};
use quire_store::Store;
use tracing::info;

use crate::blob::BlobStore;
use crate::engine::Engine;
use crate::error::{EngineError, Result};

/// System bits a sub-user may never hold.
const SUB_USER_FORBIDDEN: u32 = sys::ADD_USERS | sys::ADD_GROUPS;

impl<S: Store, B: BlobStore> Engine<S, B> {
    /// Register a new root user. Requires `ADD_USERS`.
    pub async fn add_user(
        &self,
        credential: &dyn Credential,
        uid: &str,
        sys_perms: u32,
    ) -> Result<Id> {
        let mut txn = self.begin();
        let me = self.caller(&txn, credential).await?;
        if !me.can(sys::ADD_USERS) {
            return Err(EngineError::denied("adding users"));
        }

        let user = User::new(uid, sys_perms, None);
        if txn.exists(&StateKey::user(&user.id)).await? {
            return Err(EngineError::AlreadyExists(format!("user {}", uid)));
        }

        txn.put_record(&user)?;
        self.commit(txn).await?;

        info!(uid, id = %user.id, by = %me.uid, "user added");
        Ok(user.id)
    }

    /// Register a sub-user below the caller and link it with `perms`.
    ///
    /// The new user and the caller's updated link list commit together.
    pub async fn add_sub_user(
        &self,
        credential: &dyn Credential,
        uid: &str,
        perms: BTreeMap<String, u32>,
        sys_perms: u32,
    ) -> Result<Id> {
        if sys_perms & SUB_USER_FORBIDDEN != 0 {
            return Err(EngineError::InvalidArgument(format!(
                "sub-users may not hold system bits {:#x}",
                sys_perms & SUB_USER_FORBIDDEN
            )));
        }

        let mut txn = self.begin();
        let mut me = self.caller(&txn, credential).await?;
        if !me.can(sys::ADD_SUB_USERS) {
            return Err(EngineError::denied("adding sub-users"));
        }

        let child = User::new(uid, sys_perms, Some(me.id));
        if txn.exists(&StateKey::user(&child.id)).await? {
            return Err(EngineError::AlreadyExists(format!("user {}", uid)));
        }

        me.sub_users.push(SubUser {
            id: child.id,
            uid: child.uid.clone(),
            perms,
        });
        txn.put_record(&child)?;
        txn.put_record(&me)?;
        self.commit(txn).await?;

        info!(uid, id = %child.id, parent = %me.uid, "sub-user added");
        Ok(child.id)
    }

    /// Set the bits the caller grants a sub-user on `bucket` (or `"*"`).
    pub async fn set_sub_user_permission(
        &self,
        credential: &dyn Credential,
        uid: &str,
        bucket: &str,
        bits: u32,
    ) -> Result<()> {
        let mut txn = self.begin();
        let mut me = self.caller(&txn, credential).await?;
        let link = me
            .sub_user_by_uid_mut(uid)
            .ok_or_else(|| EngineError::NotFound(format!("sub-user {}", uid)))?;
        link.perms.insert(bucket.to_string(), bits);

        txn.put_record(&me)?;
        self.commit(txn).await
    }

    /// Drop the caller's grant to a sub-user on `bucket`.
    ///
    /// Revoking a bucket the link never named succeeds.
    pub async fn revoke_sub_user_permission(
        &self,
        credential: &dyn Credential,
        uid: &str,
        bucket: &str,
    ) -> Result<()> {
        let mut txn = self.begin();
        let mut me = self.caller(&txn, credential).await?;
        let link = me
            .sub_user_by_uid_mut(uid)
            .ok_or_else(|| EngineError::NotFound(format!("sub-user {}", uid)))?;
        if link.perms.remove(bucket).is_none() {
            return Ok(());
        }

        txn.put_record(&me)?;
        self.commit(txn).await
    }

    /// Whether `uid` sits anywhere below the caller in the user tree.
    pub async fn is_descendant(&self, credential: &dyn Credential, uid: &str) -> Result<bool> {
        let txn = self.begin();
        let me = self.caller(&txn, credential).await?;
        let mut user = self.load_user(&txn, uid).await?;

        while let Some(parent) = user.parent {
            if parent == me.id {
                return Ok(true);
            }
            user = txn
                .get_record(&StateKey::user(&parent))
                .await?
                .ok_or_else(|| EngineError::NotFound(format!("user {}", parent)))?;
        }
        Ok(false)
    }

    pub async fn user_by_id(&self, id: &Id) -> Result<User> {
        self.begin()
            .get_record(&StateKey::user(id))
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("user {}", id)))
    }

    pub async fn user_by_uid(&self, uid: &str) -> Result<User> {
        self.load_user(&self.begin(), uid).await
    }

    pub async fn all_users(&self) -> Result<Vec<User>> {
        self.begin()
            .scan_records(&StateKey::new(RecordKind::User))
            .await
    }
}
