//! SQLite implementation of the Store trait.
//!
//! A single `state` table keyed by the encoded [`StateKey`]. SQLite compares
//! BLOBs with memcmp, so `ORDER BY key` matches the in-memory map's order.
//! Calls run on the blocking pool via `tokio::task::spawn_blocking`.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};

use quire_core::{now_millis, StateKey};

use crate::error::{Result, StoreError};
use crate::migration;
use crate::query::Selector;
use crate::traits::{decode_token, encode_token, prefix_end, Page, Store};

/// Ledger state in one SQLite table, shared behind a mutex.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open (creating if needed) the database file at `path` and bring its
    /// schema up to date.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::with_connection(Connection::open(path)?)
    }

    /// A private database living only as long as the store.
    pub fn open_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(mut conn: Connection) -> Result<Self> {
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `f` against the connection on the blocking pool.
    async fn blocking<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();

        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().map_err(|e| {
                StoreError::Database(rusqlite::Error::SqliteFailure(
                    rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_LOCKED),
                    Some(format!("mutex poisoned: {}", e)),
                ))
            })?;
            f(&conn)
        })
        .await
        .map_err(|e| {
            StoreError::Database(rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_ERROR),
                Some(format!("spawn_blocking failed: {}", e)),
            ))
        })?
    }
}

/// Walk the rows under `prefix` in key order, resuming after `token`.
fn scan_rows<F>(
    conn: &Connection,
    prefix: &StateKey,
    page_size: usize,
    token: Option<&str>,
    filter: F,
) -> Result<Page>
where
    F: Fn(&[u8]) -> bool,
{
    let start = prefix.encode();
    let end = prefix_end(&start);
    let (sql, lower) = match token {
        Some(token) => (
            "SELECT key, value FROM state WHERE key > ?1 AND key < ?2 ORDER BY key",
            decode_token(token, &start)?,
        ),
        None => (
            "SELECT key, value FROM state WHERE key >= ?1 AND key < ?2 ORDER BY key",
            start,
        ),
    };

    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query(params![lower, end])?;
    let mut page = Page::default();
    let mut last: Option<Vec<u8>> = None;

    while let Some(row) = rows.next()? {
        let key: Vec<u8> = row.get(0)?;
        let value: Vec<u8> = row.get(1)?;
        if !filter(&value) {
            continue;
        }
        if page_size > 0 && page.entries.len() == page_size {
            page.token = last.as_deref().map(encode_token);
            break;
        }
        page.entries.push((StateKey::decode(&key)?, value));
        last = Some(key);
    }

    Ok(page)
}

#[async_trait]
impl Store for SqliteStore {
    async fn get(&self, key: &StateKey) -> Result<Option<Vec<u8>>> {
        let key = key.encode();

        self.blocking(move |conn| {
            conn.query_row(
                "SELECT value FROM state WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()
            .map_err(StoreError::from)
        })
        .await
    }

    async fn put(&self, key: &StateKey, value: Vec<u8>) -> Result<()> {
        let key = key.encode();

        self.blocking(move |conn| {
            conn.execute(
                "INSERT INTO state (key, value, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value,
                                                updated_at = excluded.updated_at",
                params![key, value, now_millis()],
            )?;
            Ok(())
        })
        .await
    }

    async fn delete(&self, key: &StateKey) -> Result<()> {
        let key = key.encode();

        self.blocking(move |conn| {
            conn.execute("DELETE FROM state WHERE key = ?1", params![key])?;
            Ok(())
        })
        .await
    }

    async fn scan_prefix(
        &self,
        prefix: &StateKey,
        page_size: usize,
        token: Option<&str>,
    ) -> Result<Page> {
        let prefix = prefix.clone();
        let token = token.map(str::to_string);

        self.blocking(move |conn| scan_rows(conn, &prefix, page_size, token.as_deref(), |_| true))
            .await
    }

    async fn rich_query(
        &self,
        selector: &Selector,
        page_size: usize,
        token: Option<&str>,
    ) -> Result<Page> {
        let selector = selector.clone();
        let token = token.map(str::to_string);

        self.blocking(move |conn| {
            scan_rows(conn, selector.scope(), page_size, token.as_deref(), |value| {
                selector.matches_bytes(value)
            })
        })
        .await
    }
}
