use rusqlite::Connection;

use crate::{Error, Result};

// Schema version (increment when changing table definitions, and add the
// step that upgrades from the previous version to `migration`)
pub const SCHEMA_VERSION: i32 = 1;

// NOTE: Storage layout
//
// One `records` table for every model:
// - field sets differ per model, so fields live in a JSON document (schema-on-read)
// - `model` + `parent_id` is the only access path the form engine needs
// - parent integrity is enforced by the save protocol, not by SQLite, because
//   the parent of a row depends on its model
//
// The file is the only copy of the records, so tables are never dropped:
// version 0 is a fresh file, older versions are upgraded step by step, and a
// newer version is refused.

pub fn init_schema(conn: &Connection) -> Result<()> {
    let current_version: i32 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;

    if current_version > SCHEMA_VERSION {
        return Err(Error::SchemaVersion {
            found: current_version,
            supported: SCHEMA_VERSION,
        });
    }

    if current_version == SCHEMA_VERSION {
        return Ok(());
    }

    let tx = conn.unchecked_transaction()?;
    for version in (current_version + 1)..=SCHEMA_VERSION {
        tracing::info!(from = version - 1, to = version, "migrating record store");
        tx.execute_batch(migration(version))?;
    }
    tx.execute_batch(&format!("PRAGMA user_version = {}", SCHEMA_VERSION))?;
    tx.commit()?;

    Ok(())
}

/// Statements that upgrade a store from `version - 1` to `version`.
fn migration(version: i32) -> &'static str {
    match version {
        // Plain CREATE TABLE: an unversioned file that already holds a
        // `records` table of unknown layout fails here instead of being reused.
        1 => {
            r#"
            CREATE TABLE records (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                model TEXT NOT NULL,
                parent_id INTEGER,
                fields TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX idx_records_model ON records(model);
            CREATE INDEX idx_records_parent ON records(model, parent_id);
            "#
        }
        _ => "",
    }
}
