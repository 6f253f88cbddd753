//! ACL templates and access tests.
//!
//! Templates are owned, named and editable. Buckets and objects never
//! reference a template; they carry the snapshot taken when it was applied.

use std::collections::BTreeMap;

use quire_authz::Aggregator;
use quire_core::{
    AccessKind, AclEntry, AclSnapshot, AclTemplate, Credential, EntryKind, Id, RecordKind,
    StateKey, User,
};
use quire_store::{Selector, Store};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::blob::BlobStore;
use crate::engine::Engine;
use crate::error::{EngineError, Result};
use crate::txn::Txn;

/// An access question phrased with an integer access code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AclTest {
    pub uid: String,
    pub bucket: String,
    /// 0 Read, 1 Create, 2 Overwrite, 3 Delete, 4 List.
    pub access: u32,
}

impl<S: Store, B: BlobStore> Engine<S, B> {
    /// Create a template owned by the caller.
    ///
    /// Group entries come first, then user entries, each in name order.
    pub async fn create_template(
        &self,
        credential: &dyn Credential,
        name: &str,
        user_grants: &BTreeMap<String, u32>,
        group_grants: &BTreeMap<String, u32>,
    ) -> Result<Id> {
        let mut txn = self.begin();
        let me = self.caller(&txn, credential).await?;
        if txn
            .exists(&StateKey::acl(&AclTemplate::derive_id(&me.id, name)))
            .await?
        {
            return Err(EngineError::AlreadyExists(format!("acl {}", name)));
        }

        let mut entries = Vec::with_capacity(user_grants.len() + group_grants.len());
        for (entity, bits) in group_grants {
            entries.push(self.resolve_entry(&txn, EntryKind::Group, entity, *bits).await?);
        }
        for (entity, bits) in user_grants {
            entries.push(self.resolve_entry(&txn, EntryKind::User, entity, *bits).await?);
        }

        let template = AclTemplate::new(me.id, name, entries);
        txn.put_record(&template)?;
        self.commit(txn).await?;

        info!(name, id = %template.id, owner = %me.uid, "acl template created");
        Ok(template.id)
    }

    pub async fn add_entry(
        &self,
        credential: &dyn Credential,
        name: &str,
        kind: EntryKind,
        entity: &str,
        bits: u32,
    ) -> Result<()> {
        let mut txn = self.begin();
        let mut template = self.own_template(&txn, credential, name).await?;
        let entry = self.resolve_entry(&txn, kind, entity, bits).await?;
        template.add_entry(entry)?;

        txn.put_record(&template)?;
        self.commit(txn).await
    }

    pub async fn edit_entry(
        &self,
        credential: &dyn Credential,
        name: &str,
        kind: EntryKind,
        entity: &str,
        bits: u32,
    ) -> Result<()> {
        let mut txn = self.begin();
        let mut template = self.own_template(&txn, credential, name).await?;
        let id = self.resolve_entity(&txn, kind, entity).await?;
        template.edit_entry(kind, &id, bits)?;

        txn.put_record(&template)?;
        self.commit(txn).await
    }

    pub async fn remove_entry(
        &self,
        credential: &dyn Credential,
        name: &str,
        kind: EntryKind,
        entity: &str,
    ) -> Result<AclEntry> {
        let mut txn = self.begin();
        let mut template = self.own_template(&txn, credential, name).await?;
        let id = self.resolve_entity(&txn, kind, entity).await?;
        let removed = template.remove_entry(kind, &id)?;

        txn.put_record(&template)?;
        self.commit(txn).await?;
        Ok(removed)
    }

    pub async fn template_by_id(&self, id: &Id) -> Result<AclTemplate> {
        self.begin()
            .get_record(&StateKey::acl(id))
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("acl {}", id)))
    }

    /// The caller's template named `name`.
    pub async fn my_template(&self, credential: &dyn Credential, name: &str) -> Result<AclTemplate> {
        self.own_template(&self.begin(), credential, name).await
    }

    /// The template `uid` owns under `name`.
    pub async fn user_template(&self, uid: &str, name: &str) -> Result<AclTemplate> {
        let txn = self.begin();
        let owner = self.load_user(&txn, uid).await?;
        self.template_of(&txn, &owner, name).await
    }

    pub async fn all_templates(&self) -> Result<Vec<AclTemplate>> {
        self.begin()
            .scan_records(&StateKey::new(RecordKind::Acl))
            .await
    }

    pub async fn my_templates(&self, credential: &dyn Credential) -> Result<Vec<AclTemplate>> {
        let txn = self.begin();
        let me = self.caller(&txn, credential).await?;
        let selector =
            Selector::new(StateKey::new(RecordKind::Acl)).eq(&["owner"], me.id.to_hex());
        txn.query_records(&selector).await
    }

    pub async fn template_exists(&self, id: &Id) -> Result<bool> {
        self.begin().exists(&StateKey::acl(id)).await
    }

    pub async fn delete_my_template(&self, credential: &dyn Credential, name: &str) -> Result<()> {
        let mut txn = self.begin();
        let template = self.own_template(&txn, credential, name).await?;
        txn.delete(StateKey::acl(&template.id));
        self.commit(txn).await?;

        info!(name, id = %template.id, "acl template deleted");
        Ok(())
    }

    /// Delete a template by ID. Only its owner may.
    pub async fn delete_template(&self, credential: &dyn Credential, id: &Id) -> Result<()> {
        let mut txn = self.begin();
        let me = self.caller(&txn, credential).await?;
        let template: AclTemplate = txn
            .get_record(&StateKey::acl(id))
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("acl {}", id)))?;
        if template.owner != me.id {
            return Err(EngineError::denied(format!("acl {} is not yours", id)));
        }

        txn.delete(StateKey::acl(id));
        self.commit(txn).await?;

        info!(name = %template.name, %id, "acl template deleted");
        Ok(())
    }

    /// Whether `uid` holds `access` on `bucket` under `acl`.
    pub async fn test_access(
        &self,
        acl: &AclSnapshot,
        uid: &str,
        bucket: &str,
        access: AccessKind,
    ) -> Result<bool> {
        let txn = self.begin();
        let user = self.load_user(&txn, uid).await?;
        let allowed = Aggregator::new(&txn).check(acl, &user, bucket, access).await?;
        debug!(uid, bucket, ?access, allowed, "access tested");
        Ok(allowed)
    }

    /// Test one of the caller's templates against an integer-coded question.
    pub async fn test_acl_access(
        &self,
        credential: &dyn Credential,
        template: &str,
        test: &AclTest,
    ) -> Result<bool> {
        let access = AccessKind::from_code(test.access)?;
        let snapshot = self
            .own_template(&self.begin(), credential, template)
            .await?
            .snapshot();
        self.test_access(&snapshot, &test.uid, &test.bucket, access)
            .await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Internal
    // ─────────────────────────────────────────────────────────────────────────

    pub(crate) async fn own_template(
        &self,
        txn: &Txn<'_, S>,
        credential: &dyn Credential,
        name: &str,
    ) -> Result<AclTemplate> {
        let me = self.caller(txn, credential).await?;
        self.template_of(txn, &me, name).await
    }

    async fn template_of(&self, txn: &Txn<'_, S>, owner: &User, name: &str) -> Result<AclTemplate> {
        txn.get_record(&StateKey::acl(&AclTemplate::derive_id(&owner.id, name)))
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("acl {} of {}", name, owner.uid)))
    }

    async fn resolve_entity(&self, txn: &Txn<'_, S>, kind: EntryKind, entity: &str) -> Result<Id> {
        Ok(match kind {
            EntryKind::User => self.load_user(txn, entity).await?.id,
            EntryKind::Group => self.load_group(txn, entity).await?.id,
        })
    }

    async fn resolve_entry(
        &self,
        txn: &Txn<'_, S>,
        kind: EntryKind,
        entity: &str,
        bits: u32,
    ) -> Result<AclEntry> {
        Ok(AclEntry {
            id: self.resolve_entity(txn, kind, entity).await?,
            kind,
            bits,
            entity: entity.to_string(),
        })
    }
}
