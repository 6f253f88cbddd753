//! SQLite schema versioning.
//!
//! The schema version lives in `PRAGMA user_version`. `MIGRATIONS[i]` moves
//! the schema from version `i` to `i + 1`; all pending steps run inside one
//! transaction.

use rusqlite::Connection;
use tracing::{debug, info};

use crate::error::{Result, StoreError};

/// Ordered schema steps.
const MIGRATIONS: &[&str] = &[
    // v1: world state. Keys are NUL-framed StateKeys compared bytewise.
    r#"
    CREATE TABLE state (
        key BLOB PRIMARY KEY,
        value BLOB NOT NULL,        -- CBOR record, empty for index entries
        updated_at INTEGER NOT NULL -- local write time (Unix ms)
    ) WITHOUT ROWID;
    "#,
];

/// Schema version this build writes.
pub const SCHEMA_VERSION: u32 = MIGRATIONS.len() as u32;

fn schema_version(conn: &Connection) -> Result<u32> {
    Ok(conn.pragma_query_value(None, "user_version", |row| row.get(0))?)
}

/// Bring the schema up to [`SCHEMA_VERSION`]. Safe to call on every open.
pub fn migrate(conn: &mut Connection) -> Result<()> {
    let found = schema_version(conn)?;
    if found > SCHEMA_VERSION {
        return Err(StoreError::Migration(format!(
            "schema version {} is newer than this build ({})",
            found, SCHEMA_VERSION
        )));
    }
    if found == SCHEMA_VERSION {
        return Ok(());
    }

    let tx = conn.transaction()?;
    for (step, sql) in MIGRATIONS.iter().enumerate().skip(found as usize) {
        debug!(to = step + 1, "running schema step");
        tx.execute_batch(sql)?;
    }
    tx.pragma_update(None, "user_version", SCHEMA_VERSION)?;
    tx.commit()?;

    info!(from = found, to = SCHEMA_VERSION, "schema migrated");
    Ok(())
}
