//! In-memory implementation of the Store trait.
//!
//! An ordered map from encoded key to value. Same ordering and paging
//! semantics as SQLite, no persistence.

use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::RwLock;

use async_trait::async_trait;
use quire_core::StateKey;

use crate::error::{Result, StoreError};
use crate::query::Selector;
use crate::traits::{decode_token, encode_token, prefix_end, Page, Store};

/// In-memory store implementation.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock.
pub struct MemoryStore {
    inner: RwLock<BTreeMap<Vec<u8>, Vec<u8>>>,
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(BTreeMap::new()),
        }
    }

    /// Number of stored entries.
    pub fn len(&self) -> Result<usize> {
        Ok(self.read()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, BTreeMap<Vec<u8>, Vec<u8>>>> {
        self.inner
            .read()
            .map_err(|e| StoreError::Poisoned(e.to_string()))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, BTreeMap<Vec<u8>, Vec<u8>>>> {
        self.inner
            .write()
            .map_err(|e| StoreError::Poisoned(e.to_string()))
    }

    /// Walk the range under `prefix`, resuming after `token`, keeping entries
    /// accepted by `filter` until the page is full.
    fn scan<F>(
        &self,
        prefix: &StateKey,
        page_size: usize,
        token: Option<&str>,
        filter: F,
    ) -> Result<Page>
    where
        F: Fn(&[u8]) -> bool,
    {
        let start_bytes = prefix.encode();
        let end = prefix_end(&start_bytes);
        let start = match token {
            Some(token) => Bound::Excluded(decode_token(token, &start_bytes)?),
            None => Bound::Included(start_bytes),
        };

        let map = self.read()?;
        let mut page = Page::default();
        let mut last: Option<&Vec<u8>> = None;

        for (key, value) in map.range((start, Bound::Excluded(end))) {
            if !filter(value) {
                continue;
            }
            if page_size > 0 && page.entries.len() == page_size {
                // One more match exists past the full page.
                page.token = last.map(|k| encode_token(k));
                break;
            }
            page.entries.push((StateKey::decode(key)?, value.clone()));
            last = Some(key);
        }

        Ok(page)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get(&self, key: &StateKey) -> Result<Option<Vec<u8>>> {
        Ok(self.read()?.get(&key.encode()).cloned())
    }

    async fn put(&self, key: &StateKey, value: Vec<u8>) -> Result<()> {
        self.write()?.insert(key.encode(), value);
        Ok(())
    }

    async fn delete(&self, key: &StateKey) -> Result<()> {
        self.write()?.remove(&key.encode());
        Ok(())
    }

    async fn scan_prefix(
        &self,
        prefix: &StateKey,
        page_size: usize,
        token: Option<&str>,
    ) -> Result<Page> {
        self.scan(prefix, page_size, token, |_| true)
    }

    async fn rich_query(
        &self,
        selector: &Selector,
        page_size: usize,
        token: Option<&str>,
    ) -> Result<Page> {
        self.scan(selector.scope(), page_size, token, |value| {
            selector.matches_bytes(value)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::StoreExt;
    use quire_core::{Bucket, Id, RecordKind};
    use std::collections::BTreeMap as Map;

    fn key(bucket: &str, name: &str) -> StateKey {
        StateKey::object(bucket, name).unwrap()
    }

    #[tokio::test]
    async fn test_put_get_delete() {
        let store = MemoryStore::new();
        let k = key("b", "x");
        store.put(&k, b"v".to_vec()).await.unwrap();
        assert_eq!(store.get(&k).await.unwrap(), Some(b"v".to_vec()));

        store.delete(&k).await.unwrap();
        assert_eq!(store.get(&k).await.unwrap(), None);
        // Absent delete is fine.
        store.delete(&k).await.unwrap();
    }

    #[tokio::test]
    async fn test_scan_prefix_pages() {
        let store = MemoryStore::new();
        for name in ["a", "b", "c", "d", "e"] {
            store.put(&key("b", name), vec![]).await.unwrap();
        }
        store.put(&key("b2", "a"), vec![]).await.unwrap();

        let prefix = StateKey::objects_in("b").unwrap();
        let first = store.scan_prefix(&prefix, 2, None).await.unwrap();
        assert_eq!(first.len(), 2);
        assert_eq!(first.entries[0].0.last(), Some("a"));
        let token = first.token.clone().unwrap();

        let second = store.scan_prefix(&prefix, 2, Some(&token)).await.unwrap();
        assert_eq!(second.entries[0].0.last(), Some("c"));

        let third = store
            .scan_prefix(&prefix, 2, second.token.as_deref())
            .await
            .unwrap();
        assert_eq!(third.len(), 1);
        assert_eq!(third.entries[0].0.last(), Some("e"));
        assert!(third.token.is_none());
    }

    #[tokio::test]
    async fn test_exact_page_has_no_token() {
        let store = MemoryStore::new();
        for name in ["a", "b"] {
            store.put(&key("b", name), vec![]).await.unwrap();
        }
        let page = store
            .scan_prefix(&StateKey::objects_in("b").unwrap(), 2, None)
            .await
            .unwrap();
        assert_eq!(page.len(), 2);
        assert!(page.token.is_none());
    }

    #[tokio::test]
    async fn test_foreign_token_rejected() {
        let store = MemoryStore::new();
        let token = encode_token(&StateKey::new(RecordKind::User).encode());
        let err = store
            .scan_prefix(&StateKey::objects_in("b").unwrap(), 1, Some(&token))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidToken(_)));
    }

    #[tokio::test]
    async fn test_rich_query_filters_records() {
        let store = MemoryStore::new();
        let alice = Id::from_bytes([1; 32]);
        let bob = Id::from_bytes([2; 32]);
        for (name, owner) in [("a", alice), ("b", bob), ("c", alice)] {
            let bucket = Bucket {
                name: name.into(),
                owner,
                acl: None,
                metadata: Map::new(),
                created_at: 0,
            };
            store.put_record(&bucket).await.unwrap();
        }

        let selector =
            Selector::new(StateKey::new(RecordKind::Bucket)).eq(&["owner"], alice.to_hex());
        let mine: Vec<Bucket> = store.query_records(&selector).await.unwrap();
        let names: Vec<_> = mine.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, ["a", "c"]);

        let page = store.rich_query(&selector, 1, None).await.unwrap();
        assert_eq!(page.len(), 1);
        let rest = store
            .rich_query(&selector, 1, page.token.as_deref())
            .await
            .unwrap();
        assert_eq!(rest.entries[0].0.last(), Some("c"));
        assert!(rest.token.is_none());
    }
}
