//! Store trait: the abstract interface to ledger world state.
//!
//! The engine sees state only through exact-key get/put/delete, paged
//! prefix scans and paged rich queries. Implementations include an ordered
//! in-memory map and a SQLite table.

use async_trait::async_trait;
use quire_core::{codec, Record, StateKey};
use serde::de::DeserializeOwned;

use crate::error::{Result, StoreError};
use crate::query::Selector;

/// One page of a scan or query, in ascending key order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Page {
    pub entries: Vec<(StateKey, Vec<u8>)>,
    /// Continuation token; `None` when no further entries match.
    pub token: Option<String>,
}

impl Page {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

/// The Store trait: async interface to the ordered key-value state.
///
/// # Paging
///
/// `page_size == 0` means unbounded. A returned token resumes strictly after
/// the last key of the page; tokens are only valid for the scan (same prefix
/// or selector scope) that produced them.
#[async_trait]
pub trait Store: Send + Sync {
    // ─────────────────────────────────────────────────────────────────────────
    // Point Operations
    // ─────────────────────────────────────────────────────────────────────────

    async fn get(&self, key: &StateKey) -> Result<Option<Vec<u8>>>;

    async fn put(&self, key: &StateKey, value: Vec<u8>) -> Result<()>;

    /// Delete a key. Deleting an absent key is not an error.
    async fn delete(&self, key: &StateKey) -> Result<()>;

    // ─────────────────────────────────────────────────────────────────────────
    // Range Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Entries whose key extends `prefix`.
    async fn scan_prefix(
        &self,
        prefix: &StateKey,
        page_size: usize,
        token: Option<&str>,
    ) -> Result<Page>;

    /// Entries under the selector's scope whose decoded record matches it.
    async fn rich_query(
        &self,
        selector: &Selector,
        page_size: usize,
        token: Option<&str>,
    ) -> Result<Page>;
}

/// Typed record access on top of [`Store`].
#[async_trait]
pub trait StoreExt: Store {
    async fn get_record<T>(&self, key: &StateKey) -> Result<Option<T>>
    where
        T: DeserializeOwned + Send,
    {
        match self.get(key).await? {
            Some(bytes) => Ok(Some(codec::decode(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn put_record<T>(&self, record: &T) -> Result<()>
    where
        T: Record + Sync,
    {
        let key = record.key()?;
        self.put(&key, codec::encode(record)?).await
    }

    /// Every record under `prefix`, unpaged.
    async fn scan_records<T>(&self, prefix: &StateKey) -> Result<Vec<T>>
    where
        T: DeserializeOwned + Send,
    {
        decode_page(self.scan_prefix(prefix, 0, None).await?)
    }

    /// Every record matching `selector`, unpaged.
    async fn query_records<T>(&self, selector: &Selector) -> Result<Vec<T>>
    where
        T: DeserializeOwned + Send,
    {
        decode_page(self.rich_query(selector, 0, None).await?)
    }
}

impl<S: Store + ?Sized> StoreExt for S {}

/// Decode every value of a page.
pub fn decode_page<T: DeserializeOwned>(page: Page) -> Result<Vec<T>> {
    page.entries
        .iter()
        .map(|(_, bytes)| codec::decode(bytes).map_err(StoreError::from))
        .collect()
}

/// Exclusive upper bound of the byte range covered by an encoded prefix.
///
/// Encoded keys always end in the `0x00` separator, so bumping that byte to
/// `0x01` bounds every extension of the prefix.
pub fn prefix_end(prefix: &[u8]) -> Vec<u8> {
    let mut end = prefix.to_vec();
    match end.last_mut() {
        Some(last) => *last += 1,
        None => end.push(0x00),
    }
    end
}

/// Encode a continuation token for the last key of a page.
pub fn encode_token(last: &[u8]) -> String {
    hex::encode(last)
}

/// Decode a token and check it belongs to the scan over `prefix`.
pub fn decode_token(token: &str, prefix: &[u8]) -> Result<Vec<u8>> {
    let bytes = hex::decode(token).map_err(|e| StoreError::InvalidToken(e.to_string()))?;
    if !bytes.starts_with(prefix) {
        return Err(StoreError::InvalidToken(format!(
            "token {} is outside the scanned range",
            token
        )));
    }
    Ok(bytes)
}
