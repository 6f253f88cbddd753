//! Groups, subgroups and membership.

use std::collections::BTreeMap;

use quire_authz::Directory;
use quire_core::{sys, Credential, Group, Id, RecordKind, StateKey, SubGroup, User};
use quire_store::{Selector, Store};
use tracing::info;

use crate::blob::BlobStore;
use crate::engine::{group_id, Engine};
use crate::error::{EngineError, Result};
use crate::txn::Txn;

impl<S: Store, B: BlobStore> Engine<S, B> {
    /// Create a top-level group owned by the caller. Requires `ADD_GROUPS`.
    pub async fn add_group(
        &self,
        credential: &dyn Credential,
        name: &str,
        add_self: bool,
    ) -> Result<Id> {
        let mut txn = self.begin();
        let me = self.caller(&txn, credential).await?;
        if !me.can(sys::ADD_GROUPS) {
            return Err(EngineError::denied("adding groups"));
        }

        let group = self.new_group(&txn, &me, name, None, add_self).await?;
        txn.put_record(&group)?;
        self.commit(txn).await?;

        info!(name, id = %group.id, owner = %me.uid, "group added");
        Ok(group.id)
    }

    /// Create a subgroup below a group the caller owns, linked with `perms`.
    pub async fn add_sub_group(
        &self,
        credential: &dyn Credential,
        parent_name: &str,
        name: &str,
        perms: BTreeMap<String, u32>,
        add_self: bool,
    ) -> Result<Id> {
        let mut txn = self.begin();
        let me = self.caller(&txn, credential).await?;
        if !me.can(sys::ADD_GROUPS) {
            return Err(EngineError::denied("adding groups"));
        }

        let mut parent = self.owned_group(&txn, &me, parent_name).await?;
        let group = self
            .new_group(&txn, &me, name, Some(parent.id), add_self)
            .await?;
        parent.sub_groups.push(SubGroup {
            id: group.id,
            name: group.name.clone(),
            perms,
        });

        txn.put_record(&group)?;
        txn.put_record(&parent)?;
        self.commit(txn).await?;

        info!(name, id = %group.id, parent = parent_name, "subgroup added");
        Ok(group.id)
    }

    pub async fn set_sub_group_permission(
        &self,
        credential: &dyn Credential,
        parent_name: &str,
        name: &str,
        bucket: &str,
        bits: u32,
    ) -> Result<()> {
        let mut txn = self.begin();
        let me = self.caller(&txn, credential).await?;
        let mut parent = self.owned_group(&txn, &me, parent_name).await?;
        let link = parent
            .sub_group_by_name_mut(name)
            .ok_or_else(|| EngineError::NotFound(format!("subgroup {}", name)))?;
        link.perms.insert(bucket.to_string(), bits);

        txn.put_record(&parent)?;
        self.commit(txn).await
    }

    /// Drop a subgroup's grant on `bucket`; a grant never set is not an error.
    pub async fn revoke_sub_group_permission(
        &self,
        credential: &dyn Credential,
        parent_name: &str,
        name: &str,
        bucket: &str,
    ) -> Result<()> {
        let mut txn = self.begin();
        let me = self.caller(&txn, credential).await?;
        let mut parent = self.owned_group(&txn, &me, parent_name).await?;
        let link = parent
            .sub_group_by_name_mut(name)
            .ok_or_else(|| EngineError::NotFound(format!("subgroup {}", name)))?;
        if link.perms.remove(bucket).is_none() {
            return Ok(());
        }

        txn.put_record(&parent)?;
        self.commit(txn).await
    }

    pub async fn add_user_to_group(
        &self,
        credential: &dyn Credential,
        name: &str,
        uid: &str,
    ) -> Result<()> {
        let mut txn = self.begin();
        let me = self.caller(&txn, credential).await?;
        let mut group = self.owned_group(&txn, &me, name).await?;
        let user = self.load_user(&txn, uid).await?;

        if group.has_member(&user.id) {
            return Err(EngineError::AlreadyExists(format!(
                "{} in group {}",
                uid, name
            )));
        }
        group.members.push(user.id);

        txn.put_record(&group)?;
        self.commit(txn).await
    }

    pub async fn remove_user_from_group(
        &self,
        credential: &dyn Credential,
        name: &str,
        uid: &str,
    ) -> Result<()> {
        let mut txn = self.begin();
        let me = self.caller(&txn, credential).await?;
        let mut group = self.owned_group(&txn, &me, name).await?;
        let user = self.load_user(&txn, uid).await?;

        let Some(at) = group.members.iter().position(|m| *m == user.id) else {
            return Err(EngineError::NotFound(format!("{} in group {}", uid, name)));
        };
        group.members.remove(at);

        txn.put_record(&group)?;
        self.commit(txn).await
    }

    pub async fn group_by_id(&self, id: &Id) -> Result<Group> {
        self.begin()
            .get_record(&StateKey::group(id))
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("group {}", id)))
    }

    pub async fn group_by_name(&self, name: &str) -> Result<Group> {
        self.load_group(&self.begin(), name).await
    }

    pub async fn all_groups(&self) -> Result<Vec<Group>> {
        self.begin()
            .scan_records(&StateKey::new(RecordKind::Group))
            .await
    }

    /// Groups `uid` is a direct member of.
    pub async fn member_groups(&self, uid: &str) -> Result<Vec<Group>> {
        let txn = self.begin();
        let user = self.load_user(&txn, uid).await?;
        txn.groups_of(&user.id).await
    }

    /// Groups owned by `uid`.
    pub async fn owned_groups(&self, uid: &str) -> Result<Vec<Group>> {
        let txn = self.begin();
        let user = self.load_user(&txn, uid).await?;
        let selector =
            Selector::new(StateKey::new(RecordKind::Group)).eq(&["owner"], user.id.to_hex());
        txn.query_records(&selector).await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Internal
    // ─────────────────────────────────────────────────────────────────────────

    async fn new_group(
        &self,
        txn: &Txn<'_, S>,
        owner: &User,
        name: &str,
        parent: Option<Id>,
        add_owner: bool,
    ) -> Result<Group> {
        if txn.exists(&StateKey::group(&group_id(name))).await? {
            return Err(EngineError::AlreadyExists(format!("group {}", name)));
        }

        let mut group = Group::new(name, owner.id, parent);
        if add_owner {
            group.members.push(owner.id);
        }
        Ok(group)
    }

    async fn owned_group(&self, txn: &Txn<'_, S>, owner: &User, name: &str) -> Result<Group> {
        let group = self.load_group(txn, name).await?;
        if !group.is_owned_by(&owner.id) {
            return Err(EngineError::denied(format!("group {} is not yours", name)));
        }
        Ok(group)
    }
}
