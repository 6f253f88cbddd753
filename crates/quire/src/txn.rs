//! Per-operation write buffer.
//!
//! Every engine operation stages its writes in a [`Txn`] and commits them
//! together. Point reads see the operation's own staged writes; scans and
//! rich queries see committed state only, the way ledger range queries do.

use std::collections::BTreeMap;

use async_trait::async_trait;
use quire_authz::Directory;
use quire_core::{codec, Group, Id, Record, RecordKind, StateKey, User};
use quire_store::{decode_page, Page, Selector, Store};
use serde::de::DeserializeOwned;

use crate::error::{EngineError, Result};
use crate::saga::Step;

enum Pending {
    Put(Vec<u8>),
    Delete,
}

/// Buffered writes over a store.
pub struct Txn<'a, S: Store + ?Sized> {
    store: &'a S,
    writes: BTreeMap<Vec<u8>, (StateKey, Pending)>,
    blob_removals: Vec<(String, String)>,
}

impl<'a, S: Store + ?Sized> Txn<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self {
            store,
            writes: BTreeMap::new(),
            blob_removals: Vec::new(),
        }
    }

    pub async fn get(&self, key: &StateKey) -> Result<Option<Vec<u8>>> {
        match self.writes.get(&key.encode()) {
            Some((_, Pending::Put(value))) => Ok(Some(value.clone())),
            Some((_, Pending::Delete)) => Ok(None),
            None => Ok(self.store.get(key).await?),
        }
    }

    pub async fn get_record<T: DeserializeOwned>(&self, key: &StateKey) -> Result<Option<T>> {
        match self.get(key).await? {
            Some(bytes) => Ok(Some(codec::decode(&bytes)?)),
            None => Ok(None),
        }
    }

    pub async fn exists(&self, key: &StateKey) -> Result<bool> {
        Ok(self.get(key).await?.is_some())
    }

    pub fn put(&mut self, key: StateKey, value: Vec<u8>) {
        self.writes.insert(key.encode(), (key, Pending::Put(value)));
    }

    pub fn put_record<T: Record>(&mut self, record: &T) -> Result<()> {
        let key = record.key()?;
        self.put(key, codec::encode(record)?);
        Ok(())
    }

    pub fn delete(&mut self, key: StateKey) {
        self.writes.insert(key.encode(), (key, Pending::Delete));
    }

    /// Schedule removal of an object's bytes, after every state write.
    pub fn remove_blob(&mut self, bucket: impl Into<String>, key: impl Into<String>) {
        self.blob_removals.push((bucket.into(), key.into()));
    }

    pub async fn scan_prefix(
        &self,
        prefix: &StateKey,
        page_size: usize,
        token: Option<&str>,
    ) -> Result<Page> {
        Ok(self.store.scan_prefix(prefix, page_size, token).await?)
    }

    pub async fn rich_query(
        &self,
        selector: &Selector,
        page_size: usize,
        token: Option<&str>,
    ) -> Result<Page> {
        Ok(self.store.rich_query(selector, page_size, token).await?)
    }

    pub async fn scan_records<T: DeserializeOwned>(&self, prefix: &StateKey) -> Result<Vec<T>> {
        Ok(decode_page(self.scan_prefix(prefix, 0, None).await?)?)
    }

    pub async fn query_records<T: DeserializeOwned>(&self, selector: &Selector) -> Result<Vec<T>> {
        Ok(decode_page(self.rich_query(selector, 0, None).await?)?)
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty() && self.blob_removals.is_empty()
    }

    /// State writes in key order, then blob removals.
    pub(crate) fn into_steps(self) -> Vec<Step> {
        let mut steps: Vec<Step> = self
            .writes
            .into_values()
            .map(|(key, pending)| match pending {
                Pending::Put(value) => Step::Put { key, value },
                Pending::Delete => Step::Delete { key },
            })
            .collect();
        steps.extend(
            self.blob_removals
                .into_iter()
                .map(|(bucket, key)| Step::RemoveBlob { bucket, key }),
        );
        steps
    }
}

#[async_trait]
impl<'a, S: Store + ?Sized> Directory for Txn<'a, S> {
    type Error = EngineError;

    async fn user(&self, id: &Id) -> Result<Option<User>> {
        self.get_record(&StateKey::user(id)).await
    }

    async fn group(&self, id: &Id) -> Result<Option<Group>> {
        self.get_record(&StateKey::group(id)).await
    }

    async fn groups_of(&self, member: &Id) -> Result<Vec<Group>> {
        let selector =
            Selector::new(StateKey::new(RecordKind::Group)).contains(&["members"], member.to_hex());
        let page = self.rich_query(&selector, 0, None).await?;

        let mut groups = BTreeMap::new();
        for (key, bytes) in page.entries {
            groups.insert(key.encode(), codec::decode::<Group>(&bytes)?);
        }

        // Staged group writes override committed membership.
        for (encoded, (key, pending)) in &self.writes {
            if key.kind() != RecordKind::Group {
                continue;
            }
            match pending {
                Pending::Put(bytes) => {
                    let group: Group = codec::decode(bytes)?;
                    if group.has_member(member) {
                        groups.insert(encoded.clone(), group);
                    } else {
                        groups.remove(encoded);
                    }
                }
                Pending::Delete => {
                    groups.remove(encoded);
                }
            }
        }

        Ok(groups.into_values().collect())
    }
}
