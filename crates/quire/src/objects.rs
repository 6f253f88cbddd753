//! Object lifecycle and listings.
//!
//! Authorization follows one rule throughout. The object's owner (or, for
//! listings and fresh creation, the bucket's owner) is always allowed.
//! Anyone else needs the access bit under the object's ACL snapshot when it
//! has a non-empty one, else under the bucket's, else is denied.

use std::collections::BTreeMap;

use quire_core::{
    now_millis, AccessKind, AclSnapshot, Bucket, Credential, DeleteRecord, Id, ListingObject,
    Object, ObjectFlags, ObjectListing, StateKey, User,
};
use quire_store::{decode_page, Page, Selector, Store};
use tracing::{debug, info};

use crate::blob::BlobStore;
use crate::engine::Engine;
use crate::error::{EngineError, Result};
use crate::txn::Txn;

/// Description of an object write.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewObject {
    pub key: String,
    pub size: u64,
    /// Hex content digest; ignored for index-only objects.
    pub digest: String,
    pub metadata: BTreeMap<String, String>,
    pub tags: Vec<String>,
    /// Name of one of the writer's ACL templates to snapshot onto the object.
    pub template: Option<String>,
    /// Replace an existing object at `key` instead of failing.
    pub overwrite: bool,
}

impl NewObject {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Self::default()
        }
    }

    pub fn content(mut self, size: u64, digest: impl Into<String>) -> Self {
        self.size = size;
        self.digest = digest.into();
        self
    }

    pub fn meta(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(field.into(), value.into());
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn template(mut self, name: impl Into<String>) -> Self {
        self.template = Some(name.into());
        self
    }

    pub fn overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }
}

impl<S: Store, B: BlobStore> Engine<S, B> {
    // ─────────────────────────────────────────────────────────────────────────
    // Writes
    // ─────────────────────────────────────────────────────────────────────────

    /// Record a staged object and return a presigned URL for uploading it.
    pub async fn create_object(
        &self,
        credential: &dyn Credential,
        bucket: &str,
        request: NewObject,
    ) -> Result<String> {
        let key = request.key.clone();
        self.write_object(credential, bucket, request, ObjectFlags::STAGED)
            .await?;
        Ok(self
            .blobs()
            .presigned_put_url(bucket, &key, self.config().presign_ttl)
            .await?)
    }

    /// Record an object that exists only as metadata and index entries.
    pub async fn create_empty_object(
        &self,
        credential: &dyn Credential,
        bucket: &str,
        mut request: NewObject,
    ) -> Result<Object> {
        request.size = 0;
        request.digest = self.config().digest_for_empty.clone();
        self.write_object(credential, bucket, request, ObjectFlags::INDEX_ONLY)
            .await
    }

    /// Mark a staged object's upload as complete.
    pub async fn commit_object(
        &self,
        credential: &dyn Credential,
        bucket: &str,
        key: &str,
    ) -> Result<()> {
        let mut txn = self.begin();
        let me = self.caller(&txn, credential).await?;
        let record = self.load_bucket(&txn, bucket).await?;
        let mut object = self.load_object(&txn, bucket, key).await?;
        self.authorize_object(&txn, &me, &record, &object, AccessKind::Overwrite)
            .await?;

        if !object.is_staged() {
            return Ok(());
        }
        object.flags.remove(ObjectFlags::STAGED);
        txn.put_record(&object)?;
        self.commit(txn).await?;

        debug!(bucket, key, "object committed");
        Ok(())
    }

    /// Delete an object, keeping a delete record in its place.
    pub async fn remove_object(
        &self,
        credential: &dyn Credential,
        bucket: &str,
        key: &str,
    ) -> Result<DeleteRecord> {
        let mut txn = self.begin();
        let me = self.caller(&txn, credential).await?;
        let record = self.load_bucket(&txn, bucket).await?;
        let object = self.load_object(&txn, bucket, key).await?;
        self.authorize_object(&txn, &me, &record, &object, AccessKind::Delete)
            .await?;

        self.reindex(&mut txn, Some(&object), None).await?;
        txn.delete(StateKey::object(bucket, key)?);
        if !object.is_index_only() {
            txn.remove_blob(bucket, key);
        }
        let tombstone_key = StateKey::deleted(bucket, &object.id)?;
        if txn.exists(&tombstone_key).await? {
            return Err(EngineError::AlreadyExists(format!(
                "delete record {}/{}",
                bucket, object.id
            )));
        }
        let tombstone = DeleteRecord {
            object,
            deleter: me.id,
            deleted_at: now_millis(),
        };
        txn.put_record(&tombstone)?;
        self.commit(txn).await?;

        info!(bucket, key, id = %tombstone.object.id, by = %me.uid, "object removed");
        Ok(tombstone)
    }

    /// A delete record, visible to the deleted object's owner only.
    pub async fn delete_record(
        &self,
        credential: &dyn Credential,
        bucket: &str,
        id: &Id,
    ) -> Result<DeleteRecord> {
        let txn = self.begin();
        let me = self.caller(&txn, credential).await?;
        self.owned_tombstone(&txn, &me, bucket, id).await
    }

    /// Purge a delete record. Only the deleted object's owner may.
    pub async fn remove_delete_record(
        &self,
        credential: &dyn Credential,
        bucket: &str,
        id: &Id,
    ) -> Result<()> {
        let mut txn = self.begin();
        let me = self.caller(&txn, credential).await?;
        self.owned_tombstone(&txn, &me, bucket, id).await?;

        txn.delete(StateKey::deleted(bucket, id)?);
        self.commit(txn).await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Reads
    // ─────────────────────────────────────────────────────────────────────────

    /// The object record at `bucket/key`. Requires Read.
    pub async fn object(
        &self,
        credential: &dyn Credential,
        bucket: &str,
        key: &str,
    ) -> Result<Object> {
        let txn = self.begin();
        let me = self.caller(&txn, credential).await?;
        let record = self.load_bucket(&txn, bucket).await?;
        let object = self.load_object(&txn, bucket, key).await?;
        self.authorize_object(&txn, &me, &record, &object, AccessKind::Read)
            .await?;
        Ok(object)
    }

    /// A presigned URL for downloading the object's bytes. Requires Read.
    pub async fn read_object(
        &self,
        credential: &dyn Credential,
        bucket: &str,
        key: &str,
    ) -> Result<String> {
        let object = self.object(credential, bucket, key).await?;
        if object.is_index_only() {
            return Err(EngineError::NotFound(format!(
                "content of index-only object {}/{}",
                bucket, key
            )));
        }
        Ok(self
            .blobs()
            .presigned_get_url(bucket, key, self.config().presign_ttl)
            .await?)
    }

    /// A page of the objects in `bucket`, in key order. Requires List.
    pub async fn list_objects(
        &self,
        credential: &dyn Credential,
        bucket: &str,
        page_size: usize,
        include_meta: bool,
        token: Option<&str>,
    ) -> Result<ObjectListing> {
        let txn = self.begin();
        self.authorize_listing(&txn, credential, bucket).await?;
        let page = txn
            .scan_prefix(&StateKey::objects_in(bucket)?, self.page_size(page_size), token)
            .await?;
        listing::<Object>(bucket, page, include_meta)
    }

    /// A page of the objects whose metadata equals every pair in `query`.
    pub async fn query_objects(
        &self,
        credential: &dyn Credential,
        bucket: &str,
        query: &BTreeMap<String, String>,
        page_size: usize,
        include_meta: bool,
        token: Option<&str>,
    ) -> Result<ObjectListing> {
        let txn = self.begin();
        self.authorize_listing(&txn, credential, bucket).await?;
        let selector = metadata_selector(StateKey::objects_in(bucket)?, &[], query);
        let page = txn
            .rich_query(&selector, self.page_size(page_size), token)
            .await?;
        listing::<Object>(bucket, page, include_meta)
    }

    /// A page of the delete records kept for `bucket`. Requires List.
    pub async fn list_deleted_objects(
        &self,
        credential: &dyn Credential,
        bucket: &str,
        page_size: usize,
        include_meta: bool,
        token: Option<&str>,
    ) -> Result<ObjectListing> {
        let txn = self.begin();
        self.authorize_listing(&txn, credential, bucket).await?;
        let page = txn
            .scan_prefix(&StateKey::deleted_in(bucket)?, self.page_size(page_size), token)
            .await?;
        listing::<DeleteRecord>(bucket, page, include_meta)
    }

    /// Delete records whose object metadata equals every pair in `query`.
    pub async fn query_delete_records(
        &self,
        credential: &dyn Credential,
        bucket: &str,
        query: &BTreeMap<String, String>,
        page_size: usize,
        include_meta: bool,
        token: Option<&str>,
    ) -> Result<ObjectListing> {
        let txn = self.begin();
        self.authorize_listing(&txn, credential, bucket).await?;
        let selector = metadata_selector(StateKey::deleted_in(bucket)?, &["object"], query);
        let page = txn
            .rich_query(&selector, self.page_size(page_size), token)
            .await?;
        listing::<DeleteRecord>(bucket, page, include_meta)
    }

    /// Objects found through the caller's index on `field`.
    ///
    /// The index scan is not paged: the result is cut at `page_size` and
    /// carries no token.
    pub async fn query_objects_by_index(
        &self,
        credential: &dyn Credential,
        bucket: &str,
        field: &str,
        value: &str,
        page_size: usize,
        include_meta: bool,
    ) -> Result<ObjectListing> {
        let txn = self.begin();
        let me = self.authorize_listing(&txn, credential, bucket).await?;
        let keys = self.lookup_keys(&txn, &me.id, bucket, field, value).await?;

        let mut objects = Vec::new();
        for key in keys.iter().take(self.page_size(page_size)) {
            match txn.get_record::<Object>(&StateKey::object(bucket, key)?).await? {
                Some(object) => objects.push(ListingObject::from_object(&object, include_meta)),
                None => debug!(bucket, key = %key, "index entry names a missing object"),
            }
        }

        Ok(ObjectListing {
            bucket: bucket.to_string(),
            count: objects.len(),
            token: None,
            objects,
        })
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Internal
    // ─────────────────────────────────────────────────────────────────────────

    async fn write_object(
        &self,
        credential: &dyn Credential,
        bucket: &str,
        request: NewObject,
        flags: ObjectFlags,
    ) -> Result<Object> {
        let mut txn = self.begin();
        let me = self.caller(&txn, credential).await?;
        let record = self.load_bucket(&txn, bucket).await?;
        let acl = match &request.template {
            Some(name) => Some(self.own_template(&txn, credential, name).await?.snapshot()),
            None => None,
        };

        let existing: Option<Object> = txn
            .get_record(&StateKey::object(bucket, &request.key)?)
            .await?;
        match &existing {
            Some(_) if !request.overwrite => {
                return Err(EngineError::AlreadyExists(format!(
                    "object {}/{}",
                    bucket, request.key
                )));
            }
            Some(old) => {
                self.authorize_object(&txn, &me, &record, old, AccessKind::Overwrite)
                    .await?;
            }
            None => {
                self.authorize_bucket(&txn, &me, &record, AccessKind::Create)
                    .await?;
            }
        }

        let created_at = now_millis();
        let id = self
            .fresh_object_id(&txn, bucket, &request.key, &me.id, created_at, &request.digest)
            .await?;
        let object = Object {
            id,
            bucket: bucket.to_string(),
            key: request.key,
            owner: me.id,
            acl,
            digest: request.digest,
            size: request.size,
            metadata: request.metadata,
            tags: request.tags,
            created_at,
            flags,
        };

        self.reindex(&mut txn, existing.as_ref(), Some(&object)).await?;
        txn.put_record(&object)?;
        if let Some(old) = &existing {
            // Bytes of a replaced object are orphaned once the new one has none.
            if !old.is_index_only() && object.is_index_only() {
                txn.remove_blob(bucket, &object.key);
            }
        }
        self.commit(txn).await?;

        info!(
            bucket,
            key = %object.key,
            id = %object.id,
            owner = %me.uid,
            replaced = existing.is_some(),
            "object written"
        );
        Ok(object)
    }

    /// First object ID for this write whose delete-record slot is free.
    async fn fresh_object_id(
        &self,
        txn: &Txn<'_, S>,
        bucket: &str,
        key: &str,
        owner: &Id,
        created_at: i64,
        digest: &str,
    ) -> Result<Id> {
        let mut generation = 0;
        loop {
            let id = Object::derive_id(bucket, key, owner, created_at, digest, generation);
            if !txn.exists(&StateKey::deleted(bucket, &id)?).await? {
                return Ok(id);
            }
            generation += 1;
        }
    }

    async fn load_object(&self, txn: &Txn<'_, S>, bucket: &str, key: &str) -> Result<Object> {
        txn.get_record(&StateKey::object(bucket, key)?)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("object {}/{}", bucket, key)))
    }

    async fn owned_tombstone(
        &self,
        txn: &Txn<'_, S>,
        me: &User,
        bucket: &str,
        id: &Id,
    ) -> Result<DeleteRecord> {
        let tombstone: DeleteRecord = txn
            .get_record(&StateKey::deleted(bucket, id)?)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("delete record {}/{}", bucket, id)))?;
        if tombstone.object.owner != me.id {
            return Err(EngineError::denied(format!(
                "delete record {}/{} is not yours",
                bucket, id
            )));
        }
        Ok(tombstone)
    }

    async fn authorize_object(
        &self,
        txn: &Txn<'_, S>,
        me: &User,
        bucket: &Bucket,
        object: &Object,
        access: AccessKind,
    ) -> Result<()> {
        if object.owner == me.id {
            return Ok(());
        }
        let acl = effective_acl(object.acl.as_ref(), bucket.acl.as_ref());
        if self.acl_allows(txn, acl, me, &bucket.name, access).await? {
            return Ok(());
        }
        Err(EngineError::denied(format!(
            "{:?} on {}/{}",
            access, bucket.name, object.key
        )))
    }

    async fn authorize_bucket(
        &self,
        txn: &Txn<'_, S>,
        me: &User,
        bucket: &Bucket,
        access: AccessKind,
    ) -> Result<()> {
        if bucket.owner == me.id {
            return Ok(());
        }
        if self
            .acl_allows(txn, bucket.acl.as_ref(), me, &bucket.name, access)
            .await?
        {
            return Ok(());
        }
        Err(EngineError::denied(format!("{:?} on {}", access, bucket.name)))
    }

    async fn authorize_listing(
        &self,
        txn: &Txn<'_, S>,
        credential: &dyn Credential,
        bucket: &str,
    ) -> Result<User> {
        let me = self.caller(txn, credential).await?;
        let record = self.load_bucket(txn, bucket).await?;
        self.authorize_bucket(txn, &me, &record, AccessKind::List)
            .await?;
        Ok(me)
    }
}

/// The object's ACL when it has entries, else the bucket's.
fn effective_acl<'a>(
    object: Option<&'a AclSnapshot>,
    bucket: Option<&'a AclSnapshot>,
) -> Option<&'a AclSnapshot> {
    object.filter(|acl| !acl.is_empty()).or(bucket)
}

fn metadata_selector(
    scope: StateKey,
    base: &[&str],
    query: &BTreeMap<String, String>,
) -> Selector {
    query.iter().fold(Selector::new(scope), |selector, (field, value)| {
        let mut path = base.to_vec();
        path.push("metadata");
        path.push(field.as_str());
        selector.eq(&path, value.clone())
    })
}

/// A stored row that can appear in an object listing.
trait Listed: serde::de::DeserializeOwned {
    fn object(&self) -> &Object;
}

impl Listed for Object {
    fn object(&self) -> &Object {
        self
    }
}

impl Listed for DeleteRecord {
    fn object(&self) -> &Object {
        &self.object
    }
}

fn listing<T: Listed>(bucket: &str, page: Page, include_meta: bool) -> Result<ObjectListing> {
    let token = page.token.clone();
    let rows: Vec<T> = decode_page(page)?;
    let objects: Vec<ListingObject> = rows
        .iter()
        .map(|row| ListingObject::from_object(row.object(), include_meta))
        .collect();

    Ok(ObjectListing {
        bucket: bucket.to_string(),
        count: objects.len(),
        token,
        objects,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob::MemoryBlobStore;
    use crate::engine::EngineConfig;
    use crate::ErrorKind;
    use quire_core::{access, sys, KeyCredential, Keypair, UID_ATTRIBUTE};
    use quire_store::MemoryStore;

    fn cred(uid: &str) -> KeyCredential {
        KeyCredential::new("org1", &Keypair::from_seed(&[19; 32])).with_attribute(UID_ATTRIBUTE, uid)
    }

    async fn ledger() -> Engine<MemoryStore, MemoryBlobStore> {
        let engine = Engine::new(MemoryStore::new(), MemoryBlobStore::new(), EngineConfig::default());
        engine.init_ledger(&cred("admin")).await.unwrap();
        engine.add_user(&cred("admin"), "org1##bob", 0).await.unwrap();
        engine.add_bucket(&cred("admin"), "photos").await.unwrap();
        engine
    }

    async fn share_with_bob(engine: &Engine<MemoryStore, MemoryBlobStore>, bits: u32) {
        engine
            .create_template(
                &cred("admin"),
                "share",
                &BTreeMap::from([("org1##bob".to_string(), bits)]),
                &BTreeMap::new(),
            )
            .await
            .unwrap();
        engine
            .set_bucket_acl_from_template(&cred("admin"), "photos", "share")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_create_stages_and_commit_clears() {
        let engine = ledger().await;
        let url = engine
            .create_object(&cred("admin"), "photos", NewObject::new("a.png").content(3, "abc"))
            .await
            .unwrap();
        assert!(url.starts_with("memory://photos/a.png?method=PUT"));

        let object = engine.object(&cred("admin"), "photos", "a.png").await.unwrap();
        assert!(object.is_staged());

        engine.commit_object(&cred("admin"), "photos", "a.png").await.unwrap();
        let object = engine.object(&cred("admin"), "photos", "a.png").await.unwrap();
        assert!(!object.is_staged());
    }

    #[tokio::test]
    async fn test_existing_key_needs_overwrite_flag() {
        let engine = ledger().await;
        let request = NewObject::new("a.png").content(3, "abc");
        engine
            .create_object(&cred("admin"), "photos", request.clone())
            .await
            .unwrap();

        let err = engine
            .create_object(&cred("admin"), "photos", request.clone())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyExists);

        engine
            .create_object(&cred("admin"), "photos", request.content(4, "abcd").overwrite(true))
            .await
            .unwrap();
        let object = engine.object(&cred("admin"), "photos", "a.png").await.unwrap();
        assert_eq!(object.size, 4);
    }

    #[tokio::test]
    async fn test_non_owner_needs_bucket_grant() {
        let engine = ledger().await;
        let err = engine
            .create_object(&cred("bob"), "photos", NewObject::new("b.png"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PermissionDenied);

        share_with_bob(&engine, access::CREATE | access::LIST).await;
        engine
            .create_object(&cred("bob"), "photos", NewObject::new("b.png"))
            .await
            .unwrap();

        // Bob holds no Read, but owns the object.
        engine.object(&cred("bob"), "photos", "b.png").await.unwrap();
        engine
            .create_object(&cred("admin"), "photos", NewObject::new("c.png"))
            .await
            .unwrap();
        let err = engine.object(&cred("bob"), "photos", "c.png").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PermissionDenied);
    }

    #[tokio::test]
    async fn test_object_acl_overrides_bucket_acl() {
        let engine = ledger().await;
        share_with_bob(&engine, access::READ).await;
        engine
            .create_template(&cred("admin"), "private", &BTreeMap::new(), &BTreeMap::from([(
                "none".to_string(),
                access::READ,
            )]))
            .await
            .unwrap();
        engine
            .create_object(&cred("admin"), "photos", NewObject::new("open.png"))
            .await
            .unwrap();
        engine
            .create_object(&cred("admin"), "photos", NewObject::new("shut.png").template("private"))
            .await
            .unwrap();

        engine.read_object(&cred("bob"), "photos", "open.png").await.unwrap();
        let err = engine
            .read_object(&cred("bob"), "photos", "shut.png")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PermissionDenied);
    }

    #[tokio::test]
    async fn test_remove_keeps_tombstone_and_drops_blob() {
        let engine = ledger().await;
        engine
            .create_object(&cred("admin"), "photos", NewObject::new("a.png").meta("k", "v"))
            .await
            .unwrap();
        engine
            .create_empty_object(&cred("admin"), "photos", NewObject::new("note"))
            .await
            .unwrap();

        let tombstone = engine.remove_object(&cred("admin"), "photos", "a.png").await.unwrap();
        engine.remove_object(&cred("admin"), "photos", "note").await.unwrap();
        assert_eq!(
            engine.blobs().removed(),
            vec![("photos".to_string(), "a.png".to_string())]
        );

        let err = engine.object(&cred("admin"), "photos", "a.png").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let id = tombstone.object.id;
        let kept = engine.delete_record(&cred("admin"), "photos", &id).await.unwrap();
        assert_eq!(kept.object.metadata["k"], "v");

        let deleted = engine
            .list_deleted_objects(&cred("admin"), "photos", 0, true, None)
            .await
            .unwrap();
        assert_eq!(deleted.count, 2);

        engine
            .remove_delete_record(&cred("admin"), "photos", &id)
            .await
            .unwrap();
        let err = engine
            .delete_record(&cred("admin"), "photos", &id)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_index_only_objects_have_no_content() {
        let engine = ledger().await;
        let object = engine
            .create_empty_object(&cred("admin"), "photos", NewObject::new("note").content(9, "ff"))
            .await
            .unwrap();
        assert!(object.is_index_only());
        assert_eq!(object.size, 0);
        assert_eq!(object.digest, "d41d8cd98f00b204e9800998ecf8427e");

        let err = engine.read_object(&cred("admin"), "photos", "note").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_listing_pages_with_token() {
        let engine = ledger().await;
        for key in ["a", "b", "c"] {
            engine
                .create_empty_object(&cred("admin"), "photos", NewObject::new(key))
                .await
                .unwrap();
        }

        let first = engine
            .list_objects(&cred("admin"), "photos", 2, false, None)
            .await
            .unwrap();
        assert_eq!(first.count, 2);
        assert!(first.objects[0].metadata.is_none());
        let token = first.token.expect("more objects remain");

        let rest = engine
            .list_objects(&cred("admin"), "photos", 2, false, Some(&token))
            .await
            .unwrap();
        let keys: Vec<_> = rest.objects.iter().map(|o| o.key.as_str()).collect();
        assert_eq!(keys, ["c"]);
        assert!(rest.token.is_none());
    }

    #[tokio::test]
    async fn test_listing_requires_list_access() {
        let engine = ledger().await;
        let err = engine
            .list_objects(&cred("bob"), "photos", 0, false, None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PermissionDenied);

        share_with_bob(&engine, access::LIST).await;
        engine
            .list_objects(&cred("bob"), "photos", 0, false, None)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_query_objects_by_metadata() {
        let engine = ledger().await;
        for (key, camera) in [("a", "x100"), ("b", "gr3"), ("c", "x100")] {
            engine
                .create_empty_object(&cred("admin"), "photos", NewObject::new(key).meta("camera", camera))
                .await
                .unwrap();
        }

        let query = BTreeMap::from([("camera".to_string(), "x100".to_string())]);
        let found = engine
            .query_objects(&cred("admin"), "photos", &query, 0, true, None)
            .await
            .unwrap();
        let keys: Vec<_> = found.objects.iter().map(|o| o.key.as_str()).collect();
        assert_eq!(keys, ["a", "c"]);

        engine.remove_object(&cred("admin"), "photos", "a").await.unwrap();
        let gone = engine
            .query_delete_records(&cred("admin"), "photos", &query, 0, false, None)
            .await
            .unwrap();
        assert_eq!(gone.count, 1);
        assert_eq!(gone.objects[0].key, "a");
    }

    #[tokio::test]
    async fn test_query_by_index_is_capped() {
        let engine = ledger().await;
        engine.create_index(&cred("admin"), "camera", "photos").await.unwrap();
        for key in ["a", "b", "c"] {
            engine
                .create_empty_object(&cred("admin"), "photos", NewObject::new(key).meta("camera", "x100"))
                .await
                .unwrap();
        }

        let found = engine
            .query_objects_by_index(&cred("admin"), "photos", "camera", "x100", 2, false)
            .await
            .unwrap();
        assert_eq!(found.count, 2);
        assert!(found.token.is_none());
    }

    #[tokio::test]
    async fn test_remove_bucket_requires_empty() {
        let engine = ledger().await;
        engine
            .add_user(&cred("admin"), "org1##maker", sys::ADD_BUCKETS)
            .await
            .unwrap();
        engine.add_bucket(&cred("maker"), "scratch").await.unwrap();
        engine
            .create_empty_object(&cred("maker"), "scratch", NewObject::new("x"))
            .await
            .unwrap();

        let err = engine.remove_bucket(&cred("maker"), "scratch").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);

        engine.remove_object(&cred("maker"), "scratch", "x").await.unwrap();
        engine.remove_bucket(&cred("maker"), "scratch").await.unwrap();
    }
}
