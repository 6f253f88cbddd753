//! Secondary indexes over object metadata.
//!
//! An index is declared per (owner, bucket, field). Each indexed object
//! contributes one empty-valued entry keyed `(index ID, value, object key)`,
//! so a lookup is a prefix scan over `(index ID, value)`.
//!
//! Entries change in the same transaction as the object write they describe.

use std::collections::BTreeMap;

use quire_core::{Credential, Id, IndexRecord, Object, StateKey};
use quire_store::Store;
use tracing::{debug, info};

use crate::blob::BlobStore;
use crate::engine::Engine;
use crate::error::{EngineError, Result};
use crate::txn::Txn;

impl<S: Store, B: BlobStore> Engine<S, B> {
    /// Declare an index on `field` over the caller's objects in `bucket`.
    ///
    /// Objects written before the declaration are not backfilled.
    pub async fn create_index(
        &self,
        credential: &dyn Credential,
        field: &str,
        bucket: &str,
    ) -> Result<Id> {
        let mut txn = self.begin();
        let me = self.caller(&txn, credential).await?;

        let index = IndexRecord::new(me.id, bucket, field);
        if txn.exists(&StateKey::index(&me.id, bucket, field)?).await? {
            return Err(EngineError::AlreadyExists(format!(
                "index {} on {}",
                field, bucket
            )));
        }

        txn.put_record(&index)?;
        self.commit(txn).await?;

        info!(field, bucket, id = %index.id, owner = %me.uid, "index created");
        Ok(index.id)
    }

    /// Drop the caller's index and every entry under it.
    pub async fn remove_index(
        &self,
        credential: &dyn Credential,
        field: &str,
        bucket: &str,
    ) -> Result<()> {
        let mut txn = self.begin();
        let me = self.caller(&txn, credential).await?;
        let index = self.index_of(&txn, &me.id, field, bucket).await?;

        let entries = txn
            .scan_prefix(&StateKey::index_entries(&index.id), 0, None)
            .await?;
        let dropped = entries.len();
        for (key, _) in entries.entries {
            txn.delete(key);
        }
        txn.delete(StateKey::index(&me.id, bucket, field)?);
        self.commit(txn).await?;

        info!(field, bucket, id = %index.id, dropped, "index removed");
        Ok(())
    }

    /// The caller's index declaration on `field` in `bucket`.
    pub async fn index(
        &self,
        credential: &dyn Credential,
        field: &str,
        bucket: &str,
    ) -> Result<IndexRecord> {
        let txn = self.begin();
        let me = self.caller(&txn, credential).await?;
        self.index_of(&txn, &me.id, field, bucket).await
    }

    /// Keys of objects whose `field` equals `value` under `uid`'s index.
    pub async fn lookup(
        &self,
        uid: &str,
        bucket: &str,
        field: &str,
        value: &str,
    ) -> Result<Vec<String>> {
        let txn = self.begin();
        let owner = self.load_user(&txn, uid).await?;
        self.lookup_keys(&txn, &owner.id, bucket, field, value).await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Internal
    // ─────────────────────────────────────────────────────────────────────────

    pub(crate) async fn index_of(
        &self,
        txn: &Txn<'_, S>,
        owner: &Id,
        field: &str,
        bucket: &str,
    ) -> Result<IndexRecord> {
        txn.get_record(&StateKey::index(owner, bucket, field)?)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("index {} on {}", field, bucket)))
    }

    pub(crate) async fn lookup_keys(
        &self,
        txn: &Txn<'_, S>,
        owner: &Id,
        bucket: &str,
        field: &str,
        value: &str,
    ) -> Result<Vec<String>> {
        let index = self.index_of(txn, owner, field, bucket).await?;
        let page = txn
            .scan_prefix(&StateKey::index_value(&index.id, value)?, 0, None)
            .await?;
        Ok(page
            .entries
            .into_iter()
            .filter_map(|(key, _)| key.last().map(str::to_string))
            .collect())
    }

    /// Stage the index entry changes for replacing `old` with `new`.
    ///
    /// Entries of `old` are computed under its owner's indexes and entries of
    /// `new` under its owner's; only the difference is written.
    pub(crate) async fn reindex(
        &self,
        txn: &mut Txn<'_, S>,
        old: Option<&Object>,
        new: Option<&Object>,
    ) -> Result<()> {
        let mut stale = match old {
            Some(object) => self.entries_for(txn, object).await?,
            None => BTreeMap::new(),
        };
        let fresh = match new {
            Some(object) => self.entries_for(txn, object).await?,
            None => BTreeMap::new(),
        };

        for (encoded, key) in fresh {
            if stale.remove(&encoded).is_none() {
                txn.put(key, Vec::new());
            }
        }
        for key in stale.into_values() {
            txn.delete(key);
        }
        Ok(())
    }

    async fn entries_for(
        &self,
        txn: &Txn<'_, S>,
        object: &Object,
    ) -> Result<BTreeMap<Vec<u8>, StateKey>> {
        let indexes: Vec<IndexRecord> = txn
            .scan_records(&StateKey::indexes_of(&object.owner, &object.bucket)?)
            .await?;

        let mut entries = BTreeMap::new();
        for index in indexes {
            let Some(value) = object.metadata.get(&index.field) else {
                debug!(field = %index.field, key = %object.key, "object lacks indexed field");
                continue;
            };
            let key = StateKey::index_entry(&index.id, value, &object.key)?;
            entries.insert(key.encode(), key);
        }
        Ok(entries)
    }
}
