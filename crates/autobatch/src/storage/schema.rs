//! Local store schema.
//!
//! The store holds a single key-value table; its version is kept in
//! SQLite's `user_version` pragma.

use rusqlite::Connection;

use crate::error::StorageError;

pub(crate) const SCHEMA_VERSION: u32 = 1;

const CREATE_LOCAL_STORAGE: &str = "CREATE TABLE IF NOT EXISTS local_storage (
    key TEXT PRIMARY KEY NOT NULL,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL
);";

/// Creates the key-value table unless the database is already at `SCHEMA_VERSION`.
pub fn ensure_schema(conn: &Connection) -> Result<(), StorageError> {
    let version: u32 = conn.pragma_query_value(None, "user_version", |r| r.get(0))?;
    if version >= SCHEMA_VERSION {
        return Ok(());
    }

    log::info!("Upgrading local store schema v{} -> v{}", version, SCHEMA_VERSION);
    let failed = |e: rusqlite::Error| StorageError::Migration {
        version: SCHEMA_VERSION,
        reason: e.to_string(),
    };

    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(CREATE_LOCAL_STORAGE).map_err(failed)?;
    tx.pragma_update(None, "user_version", SCHEMA_VERSION).map_err(failed)?;
    tx.commit()?;
    Ok(())
}
