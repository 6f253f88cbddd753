//! Bucket lifecycle.

use std::collections::BTreeMap;

use quire_core::{now_millis, sys, Bucket, Credential, RecordKind, StateKey, User};
use quire_store::{Selector, Store};
use tracing::info;

use crate::blob::BlobStore;
use crate::engine::Engine;
use crate::error::{EngineError, Result};
use crate::txn::Txn;

impl<S: Store, B: BlobStore> Engine<S, B> {
    /// Create a bucket owned by the caller. Requires `ADD_BUCKETS`.
    pub async fn add_bucket(&self, credential: &dyn Credential, name: &str) -> Result<Bucket> {
        let mut txn = self.begin();
        let me = self.caller(&txn, credential).await?;
        if !me.can(sys::ADD_BUCKETS) {
            return Err(EngineError::denied("adding buckets"));
        }
        if txn.exists(&StateKey::bucket(name)?).await? {
            return Err(EngineError::AlreadyExists(format!("bucket {}", name)));
        }

        let bucket = Bucket {
            name: name.to_string(),
            owner: me.id,
            acl: None,
            metadata: BTreeMap::new(),
            created_at: now_millis(),
        };
        txn.put_record(&bucket)?;
        self.commit(txn).await?;

        info!(bucket = name, owner = %me.uid, "bucket added");
        Ok(bucket)
    }

    /// Remove an empty bucket. Only its owner may.
    pub async fn remove_bucket(&self, credential: &dyn Credential, name: &str) -> Result<()> {
        let mut txn = self.begin();
        let me = self.caller(&txn, credential).await?;
        let bucket = self.owned_bucket(&txn, &me, name).await?;

        let first = txn.scan_prefix(&StateKey::objects_in(name)?, 1, None).await?;
        if !first.is_empty() {
            return Err(EngineError::InvalidArgument(format!(
                "bucket {} is not empty",
                name
            )));
        }

        txn.delete(StateKey::bucket(&bucket.name)?);
        self.commit(txn).await?;

        info!(bucket = name, "bucket removed");
        Ok(())
    }

    pub async fn bucket(&self, name: &str) -> Result<Bucket> {
        self.load_bucket(&self.begin(), name).await
    }

    pub async fn my_buckets(&self, credential: &dyn Credential) -> Result<Vec<Bucket>> {
        let txn = self.begin();
        let me = self.caller(&txn, credential).await?;
        self.buckets_of(&txn, &me).await
    }

    pub async fn user_buckets(&self, uid: &str) -> Result<Vec<Bucket>> {
        let txn = self.begin();
        let user = self.load_user(&txn, uid).await?;
        self.buckets_of(&txn, &user).await
    }

    /// Snapshot one of the caller's templates onto a bucket the caller owns.
    pub async fn set_bucket_acl_from_template(
        &self,
        credential: &dyn Credential,
        bucket: &str,
        template: &str,
    ) -> Result<()> {
        let mut txn = self.begin();
        let me = self.caller(&txn, credential).await?;
        let mut record = self.owned_bucket(&txn, &me, bucket).await?;
        let template = self.own_template(&txn, credential, template).await?;

        record.acl = Some(template.snapshot());
        txn.put_record(&record)?;
        self.commit(txn).await?;

        info!(bucket, template = %template.name, "bucket acl applied");
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Internal
    // ─────────────────────────────────────────────────────────────────────────

    pub(crate) async fn load_bucket(&self, txn: &Txn<'_, S>, name: &str) -> Result<Bucket> {
        txn.get_record(&StateKey::bucket(name)?)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("bucket {}", name)))
    }

    async fn owned_bucket(&self, txn: &Txn<'_, S>, owner: &User, name: &str) -> Result<Bucket> {
        let bucket = self.load_bucket(txn, name).await?;
        if bucket.owner != owner.id {
            return Err(EngineError::denied(format!("bucket {} is not yours", name)));
        }
        Ok(bucket)
    }

    async fn buckets_of(&self, txn: &Txn<'_, S>, owner: &User) -> Result<Vec<Bucket>> {
        let selector =
            Selector::new(StateKey::new(RecordKind::Bucket)).eq(&["owner"], owner.id.to_hex());
        txn.query_records(&selector).await
    }
}
