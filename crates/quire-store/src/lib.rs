//! # Quire Store
//!
//! Storage abstraction for Quire. The engine reaches ledger world state only
//! through the [`Store`] trait: exact-key get/put/delete, paged prefix scans
//! and paged rich queries.
//!
//! ## Key Types
//!
//! - [`Store`] - The async trait for all state access
//! - [`StoreExt`] - Typed record helpers over CBOR
//! - [`Selector`] - Scope plus equality/containment conditions
//! - [`Page`] - A page of entries plus continuation token
//! - [`MemoryStore`] - Ordered in-memory map
//! - [`SqliteStore`] - SQLite-backed table
//!
//! ## Usage
//!
//! ```rust,no_run
//! use quire_core::StateKey;
//! use quire_store::{SqliteStore, Store};
//!
//! async fn example() -> quire_store::Result<()> {
//!     let store = SqliteStore::open("state.db")?;
//!     let prefix = StateKey::objects_in("photos")?;
//!     let page = store.scan_prefix(&prefix, 100, None).await?;
//!     for (key, _value) in &page.entries {
//!         println!("{:?}", key);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **Ordering**: both backends order by encoded key bytes
//! - **Tokens**: hex of the last key returned, scoped to the scan's prefix
//! - **Rich queries**: evaluated over decoded CBOR, never over raw bytes

pub mod error;
pub mod memory;
pub mod migration;
pub mod query;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use query::{Condition, Selector};
pub use sqlite::SqliteStore;
pub use traits::{decode_page, Page, Store, StoreExt};
